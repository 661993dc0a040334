//! PDF document writer.
//!
//! [`PdfWriter`] owns the object store of one document: it hands out object
//! numbers, keeps track of placeholders and object streams, and serializes
//! everything into a complete file: header, body, cross-reference section and
//! trailer.

use super::object_serializer::ObjectSerializer;
use super::object_stream::{ObjectStream, ObjectStreamHandle};
use super::trailer::{DocumentIdPair, Trailer};
use super::update_tracker::{NoopTracker, UpdateTracker};
use super::xref::{write_xref_table, PositionMap, XRefStream, XrefPosition};
use crate::encryption::SecurityHandler;
use crate::error::{Error, Result};
use crate::object::{Dict, DocumentId, Object, ObjectRef};
use crate::resolver::ObjectResolver;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;

/// What [`PdfWriter::get_object`] returns for a placeholder that has not been populated yet.
static PENDING_PLACEHOLDER: Object = Object::Null;

/// Binary marker comment following the header line (ISO 32000-1:2008, Section 7.5.2).
const BINARY_MARKER: &[u8] = b"%\xc2\xa5\xc2\xb1\xc3\xab\n";

/// Configuration for PDF generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// PDF version declared in the header, as (major, minor)
    pub version: (u8, u8),
    /// Write a cross-reference stream instead of a classic xref table
    pub stream_xrefs: bool,
    /// Flate-compress the cross-reference stream
    pub compress_xref_stream: bool,
    /// Object numbers are allocated starting right after this value
    pub obj_id_start: u32,
    /// Create an empty page tree under the catalog
    pub init_page_tree: bool,
    /// `/Producer` entry of the document information dictionary
    pub producer: Option<String>,
    /// Add a `/CreationDate` entry to the document information dictionary
    pub creation_date: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            version: (1, 7),
            stream_xrefs: true,
            compress_xref_stream: true,
            obj_id_start: 0,
            init_page_tree: true,
            producer: Some("pdf_forge".to_string()),
            creation_date: false,
        }
    }
}

impl WriterConfig {
    /// Set the output PDF version.
    pub fn with_version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major, minor);
        self
    }

    /// Choose between a cross-reference stream and a classic xref table.
    pub fn with_stream_xrefs(mut self, stream_xrefs: bool) -> Self {
        self.stream_xrefs = stream_xrefs;
        self
    }

    /// Enable or disable compression of the cross-reference stream.
    pub fn with_compress_xref_stream(mut self, compress: bool) -> Self {
        self.compress_xref_stream = compress;
        self
    }

    /// Start allocating object numbers after `start`.
    pub fn with_obj_id_start(mut self, start: u32) -> Self {
        self.obj_id_start = start;
        self
    }

    /// Enable or disable creation of an empty page tree.
    pub fn with_page_tree(mut self, init: bool) -> Self {
        self.init_page_tree = init;
        self
    }

    /// Set the `/Producer` entry (or drop it with `None`).
    pub fn with_producer(mut self, producer: Option<String>) -> Self {
        self.producer = producer;
        self
    }

    /// Enable or disable the `/CreationDate` entry.
    pub fn with_creation_date(mut self, enable: bool) -> Self {
        self.creation_date = enable;
        self
    }
}

/// Output sink that keeps track of the number of bytes written.
pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    offset: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, offset: 0 }
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// PDF document writer.
///
/// Every object number lives in exactly one of three places: the direct
/// object map, an object stream, or the set of pending placeholders.
pub struct PdfWriter<T: UpdateTracker = NoopTracker> {
    doc: DocumentId,
    config: WriterConfig,
    /// Directly written objects, keyed by (generation, object number)
    objects: BTreeMap<(u16, u32), Object>,
    object_streams: Vec<ObjectStream>,
    /// Object number -> index of the object stream holding it
    objects_in_streams: HashMap<u32, usize>,
    placeholders: BTreeSet<u32>,
    last_obj_id: u32,
    root: ObjectRef,
    info: Option<ObjectRef>,
    encrypt: Option<ObjectRef>,
    security_handler: Option<Box<dyn SecurityHandler>>,
    file_id: DocumentIdPair,
    tracker: T,
}

impl PdfWriter<NoopTracker> {
    /// Create a new PDF writer with default config.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    /// Create a PDF writer with custom config.
    pub fn with_config(config: WriterConfig) -> Self {
        Self::with_tracker(config, NoopTracker)
    }
}

impl Default for PdfWriter<NoopTracker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: UpdateTracker> PdfWriter<T> {
    /// Create a PDF writer that reports in-place modifications to `tracker`.
    ///
    /// The catalog is registered first, then the information dictionary, then
    /// (if enabled) the page tree root.
    pub fn with_tracker(config: WriterConfig, tracker: T) -> Self {
        let doc = DocumentId::new();
        let mut writer = Self {
            doc,
            last_obj_id: config.obj_id_start,
            config,
            objects: BTreeMap::new(),
            object_streams: Vec::new(),
            objects_in_streams: HashMap::new(),
            placeholders: BTreeSet::new(),
            // replaced right below
            root: ObjectRef::new(0, 0, doc),
            info: None,
            encrypt: None,
            security_handler: None,
            file_id: DocumentIdPair::generate(),
            tracker,
        };

        let catalog = ObjectSerializer::dict(vec![("Type", ObjectSerializer::name("Catalog"))]);
        writer.root = writer.insert_new(catalog);

        let mut info = Dict::new();
        if let Some(producer) = &writer.config.producer {
            info.insert("Producer".to_string(), ObjectSerializer::string(producer));
        }
        if writer.config.creation_date {
            let date = chrono::Utc::now().format("D:%Y%m%d%H%M%S+00'00'").to_string();
            info.insert("CreationDate".to_string(), ObjectSerializer::string(&date));
        }
        writer.info = Some(writer.insert_new(Object::Dictionary(info)));

        if writer.config.init_page_tree {
            let pages = ObjectSerializer::dict(vec![
                ("Type", ObjectSerializer::name("Pages")),
                ("Count", ObjectSerializer::integer(0)),
                ("Kids", ObjectSerializer::array(vec![])),
            ]);
            let pages_ref = writer.insert_new(pages);
            if let Some(Object::Dictionary(catalog)) =
                writer.objects.get_mut(&(writer.root.gen, writer.root.id))
            {
                catalog.insert("Pages".to_string(), Object::Reference(pages_ref));
            }
        }

        log::debug!(
            "Created PDF writer (root {}, first object number {})",
            writer.root,
            writer.config.obj_id_start + 1
        );
        writer
    }

    /// Store a direct object under a fresh number; infallible.
    fn insert_new(&mut self, obj: Object) -> ObjectRef {
        self.last_obj_id += 1;
        self.objects.insert((0, self.last_obj_id), obj);
        ObjectRef::new(self.last_obj_id, 0, self.doc)
    }

    /// Writer configuration.
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Switch between a cross-reference stream and a classic table.
    ///
    /// Object streams cannot be combined with a classic table; writing will
    /// fail if any are in use.
    pub fn set_stream_xrefs(&mut self, stream_xrefs: bool) {
        self.config.stream_xrefs = stream_xrefs;
    }

    /// Reference to the document catalog.
    pub fn root_ref(&self) -> ObjectRef {
        self.root
    }

    /// Reference to the document information dictionary, if any.
    pub fn info_ref(&self) -> Option<ObjectRef> {
        self.info
    }

    /// Reference to the `/Encrypt` dictionary, if a security handler is attached.
    pub fn encrypt_ref(&self) -> Option<ObjectRef> {
        self.encrypt
    }

    /// File identifiers written as `/ID`.
    pub fn file_identifiers(&self) -> &DocumentIdPair {
        &self.file_id
    }

    /// Replace the file identifiers.
    pub fn set_file_identifiers(&mut self, id: DocumentIdPair) {
        self.file_id = id;
    }

    /// Highest object number handed out so far.
    pub fn last_obj_id(&self) -> u32 {
        self.last_obj_id
    }

    /// The update tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Mutable access to the update tracker.
    pub fn tracker_mut(&mut self) -> &mut T {
        &mut self.tracker
    }

    /// Set the `/Info` entry of the trailer.
    ///
    /// A reference is used as is (it must belong to this writer); any other
    /// object is added to the writer first. `None` removes the entry.
    pub fn set_info(&mut self, info: Option<Object>) -> Result<Option<ObjectRef>> {
        self.info = match info {
            None => None,
            Some(Object::Reference(r)) => {
                self.check_owner(&r)?;
                Some(r)
            },
            Some(obj) => Some(self.add_object(obj)?),
        };
        Ok(self.info)
    }

    /// Attach a security handler and register its `/Encrypt` dictionary.
    pub fn set_security_handler(&mut self, handler: Box<dyn SecurityHandler>) -> Result<ObjectRef> {
        let encrypt = self.add_object(handler.as_stored_object())?;
        log::debug!("Attached security handler, /Encrypt is {}", encrypt);
        self.security_handler = Some(handler);
        self.encrypt = Some(encrypt);
        Ok(encrypt)
    }

    fn check_owner(&self, obj_ref: &ObjectRef) -> Result<()> {
        if obj_ref.doc != self.doc {
            return Err(Error::ForeignReference(*obj_ref));
        }
        Ok(())
    }

    /// Reserve an object number to populate later with [`PdfWriter::add_object_with`].
    ///
    /// Until then, [`PdfWriter::get_object`] returns `null` for it.
    pub fn allocate_placeholder(&mut self) -> ObjectRef {
        self.last_obj_id += 1;
        self.placeholders.insert(self.last_obj_id);
        log::trace!("Allocated placeholder {}", self.last_obj_id);
        ObjectRef::new(self.last_obj_id, 0, self.doc)
    }

    /// Whether `obj_ref` is a placeholder that has not been populated yet.
    pub fn is_pending(&self, obj_ref: &ObjectRef) -> bool {
        obj_ref.doc == self.doc && obj_ref.gen == 0 && self.placeholders.contains(&obj_ref.id)
    }

    /// Add a new object to this writer.
    pub fn add_object(&mut self, obj: Object) -> Result<ObjectRef> {
        self.add_object_with(obj, None, None)
    }

    /// Add a new object, optionally into an object stream and/or under a
    /// previously allocated placeholder number.
    ///
    /// Nothing is modified if any of the arguments is rejected.
    pub fn add_object_with(
        &mut self,
        obj: Object,
        obj_stream: Option<ObjectStreamHandle>,
        idnum: Option<u32>,
    ) -> Result<ObjectRef> {
        let idnum = match idnum {
            Some(id) if !self.placeholders.contains(&id) => {
                return Err(Error::PlaceholderNotAllocated(id))
            },
            Some(id) => id,
            None => self.last_obj_id + 1,
        };

        match obj_stream {
            None => {
                self.objects.insert((0, idnum), obj);
            },
            Some(handle) => {
                let index = self.object_stream_index(handle)?;
                if !self.config.stream_xrefs {
                    return Err(Error::ObjectStreamsRequireXrefStream);
                }
                let stream = &mut self.object_streams[index];
                if stream.sealed_as().is_some() {
                    return Err(Error::ObjectStreamSealed(index));
                }
                stream.add_object(idnum, obj)?;
                self.objects_in_streams.insert(idnum, index);
            },
        }

        if !self.placeholders.remove(&idnum) {
            self.last_obj_id = idnum;
        }
        log::trace!("Added object {} 0 R", idnum);
        Ok(ObjectRef::new(idnum, 0, self.doc))
    }

    /// Forget objects and placeholders allocated under `ids`, wherever they
    /// were stored. Their numbers are left unused.
    pub(crate) fn discard_objects(&mut self, ids: impl IntoIterator<Item = u32>) {
        for idnum in ids {
            self.placeholders.remove(&idnum);
            self.objects.remove(&(0, idnum));
            if let Some(index) = self.objects_in_streams.remove(&idnum) {
                self.object_streams[index].remove(idnum);
            }
            log::trace!("Discarded object {}", idnum);
        }
    }

    fn object_stream_index(&self, handle: ObjectStreamHandle) -> Result<usize> {
        if handle.owner != self.doc || handle.index >= self.object_streams.len() {
            return Err(Error::UnknownObjectStream(handle.index));
        }
        Ok(handle.index)
    }

    /// Look up an object owned by this writer.
    ///
    /// Pending placeholders resolve to `null`.
    pub fn get_object(&self, obj_ref: &ObjectRef) -> Result<&Object> {
        self.check_owner(obj_ref)?;
        if let Some(obj) = self.objects.get(&(obj_ref.gen, obj_ref.id)) {
            return Ok(obj);
        }
        if obj_ref.gen == 0 {
            if self.placeholders.contains(&obj_ref.id) {
                return Ok(&PENDING_PLACEHOLDER);
            }
            if let Some(obj) = self
                .objects_in_streams
                .get(&obj_ref.id)
                .and_then(|&ix| self.object_streams[ix].get(obj_ref.id))
            {
                return Ok(obj);
            }
        }
        Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    /// Mutable access to an object owned by this writer.
    ///
    /// Pending placeholders have no value to modify and are reported as
    /// [`Error::UnpopulatedPlaceholder`].
    pub fn get_object_mut(&mut self, obj_ref: &ObjectRef) -> Result<&mut Object> {
        self.check_owner(obj_ref)?;
        if obj_ref.gen == 0 && self.placeholders.contains(&obj_ref.id) {
            return Err(Error::UnpopulatedPlaceholder(obj_ref.id));
        }
        if let Some(obj) = self.objects.get_mut(&(obj_ref.gen, obj_ref.id)) {
            return Ok(obj);
        }
        if obj_ref.gen == 0 {
            if let Some(&ix) = self.objects_in_streams.get(&obj_ref.id) {
                if let Some(obj) = self.object_streams[ix].get_mut(obj_ref.id) {
                    return Ok(obj);
                }
            }
        }
        Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    /// Prepare a new object stream.
    pub fn prepare_object_stream(&mut self, compress: bool) -> Result<ObjectStreamHandle> {
        if !self.config.stream_xrefs {
            return Err(Error::ObjectStreamsRequireXrefStream);
        }
        self.object_streams.push(ObjectStream::new(compress));
        Ok(ObjectStreamHandle {
            owner: self.doc,
            index: self.object_streams.len() - 1,
        })
    }

    /// Inspect an object stream registered with this writer.
    pub fn object_stream(&self, handle: ObjectStreamHandle) -> Result<&ObjectStream> {
        let index = self.object_stream_index(handle)?;
        Ok(&self.object_streams[index])
    }

    /// Notify the update tracker that an object was modified.
    pub fn mark_update(&mut self, obj_ref: ObjectRef) {
        self.tracker.mark_update(obj_ref);
    }

    /// Notify the update tracker that the indirect object `container` must be rewritten.
    pub fn update_container(&mut self, container: ObjectRef) {
        self.tracker.update_container(container);
    }

    fn trailer(&self) -> Trailer {
        Trailer {
            root: self.root,
            info: self.info,
            encrypt: self.encrypt,
            id: self.file_id.clone(),
        }
    }

    /// The trailer dictionary as it stands (without `/Size`).
    pub fn trailer_view(&self) -> Object {
        let mut dict = Dict::new();
        self.trailer().populate(&mut dict);
        Object::Dictionary(dict)
    }

    /// Write the complete document to `sink`.
    pub fn write<W: Write>(&mut self, sink: W) -> Result<()> {
        self.write_with_options(sink, false).map(|_| ())
    }

    /// Write the document, optionally without the `%PDF-` header.
    ///
    /// Returns the byte offset of the cross-reference section.
    pub fn write_with_options<W: Write>(&mut self, sink: W, skip_header: bool) -> Result<u64> {
        if let Some(&pending) = self.placeholders.iter().next() {
            return Err(Error::UnpopulatedPlaceholder(pending));
        }
        if !self.config.stream_xrefs && !self.objects_in_streams.is_empty() {
            return Err(Error::ObjectStreamsRequireXrefStream);
        }

        let mut out = CountingWriter::new(sink);
        let mut positions = PositionMap::new();

        // object streams first, so that they get registered as regular objects
        // and a rejected member fails the write before anything reaches the sink
        self.flush_object_streams(&mut positions)?;

        if !skip_header {
            self.write_header(&mut out)?;
        }
        let trailer = self.trailer();
        let mut xref_stream = self
            .config
            .stream_xrefs
            .then(|| XRefStream::new(self.config.compress_xref_stream));
        if let Some(xref_stream) = xref_stream.as_mut() {
            trailer.populate(xref_stream.dict_mut());
        }

        self.write_objects(&mut out, &mut positions)?;

        let xref_location = out.offset();
        let serializer = ObjectSerializer::compact();
        match xref_stream {
            Some(mut xref_stream) => {
                let xref_id = self.last_obj_id + 1;
                positions.insert(xref_id, 0, XrefPosition::Offset(xref_location));
                xref_stream
                    .dict_mut()
                    .insert("Size".to_string(), Object::Integer(xref_id as i64 + 1));
                let stream = xref_stream.encode(&positions)?;
                serializer.write_indirect(&mut out, xref_id, 0, &stream)?;
            },
            None => {
                write_xref_table(&mut out, &positions)?;
                let mut dict = Dict::new();
                trailer.populate(&mut dict);
                dict.insert("Size".to_string(), Object::Integer(self.last_obj_id as i64 + 1));
                out.write_all(b"trailer\n")?;
                serializer.write_object(&mut out, &Object::Dictionary(dict))?;
            },
        }

        write!(out, "\nstartxref\n{}\n%%EOF\n", xref_location)?;
        out.flush()?;
        log::debug!(
            "Wrote {} objects, xref at {}, {} bytes total",
            positions.len(),
            xref_location,
            out.offset()
        );
        Ok(xref_location)
    }

    fn write_header<W: Write>(&self, out: &mut W) -> Result<()> {
        let (major, minor) = self.config.version;
        writeln!(out, "%PDF-{}.{}", major, minor)?;
        out.write_all(BINARY_MARKER)?;
        Ok(())
    }

    /// Render every non-empty object stream as a stream object and record the
    /// in-stream position of each member.
    ///
    /// A stream is registered under a new object number the first time it is
    /// written and sealed; later passes re-render it under the same number.
    fn flush_object_streams(&mut self, positions: &mut PositionMap) -> Result<()> {
        for index in 0..self.object_streams.len() {
            if self.object_streams[index].is_empty() {
                continue;
            }
            let rendered = self.object_streams[index].as_pdf_object()?;
            let stream_id = match self.object_streams[index].sealed_as() {
                Some(stream_id) => {
                    self.objects.insert((0, stream_id), rendered);
                    stream_id
                },
                None => {
                    let stream_ref = self.add_object(rendered)?;
                    self.object_streams[index].seal(stream_ref.id);
                    stream_ref.id
                },
            };

            let stream = &self.object_streams[index];
            log::debug!("Object stream {} 0 R holds {} objects", stream_id, stream.len());
            for (ix, idnum) in stream.object_ids().enumerate() {
                let ix = u16::try_from(ix).map_err(|_| {
                    Error::InvalidArgument(format!(
                        "object stream {} holds more than {} objects",
                        stream_id,
                        u16::MAX
                    ))
                })?;
                positions.insert(
                    idnum,
                    0,
                    XrefPosition::InStream {
                        stream_id,
                        index: ix,
                    },
                );
            }
        }
        Ok(())
    }

    fn write_objects<W: Write>(
        &self,
        out: &mut CountingWriter<W>,
        positions: &mut PositionMap,
    ) -> Result<()> {
        let serializer = ObjectSerializer::compact();
        let encrypt_id = self.encrypt.map(|r| r.id);

        for (&(gen, idnum), obj) in &self.objects {
            positions.insert(idnum, gen, XrefPosition::Offset(out.offset()));
            match &self.security_handler {
                Some(handler) if Some(idnum) != encrypt_id => {
                    let encrypted = handler.transform(obj, idnum, gen)?;
                    serializer.write_indirect(out, idnum, gen, &encrypted)?;
                },
                _ => serializer.write_indirect(out, idnum, gen, obj)?,
            }
        }
        Ok(())
    }

    /// Serialize the document into a byte vector.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Save the PDF to a file.
    pub fn save(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(std::io::BufWriter::new(file))
    }
}

impl<T: UpdateTracker> ObjectResolver for PdfWriter<T> {
    fn document_id(&self) -> DocumentId {
        self.doc
    }

    fn resolve(&self, obj_ref: &ObjectRef) -> Result<Object> {
        self.get_object(obj_ref).cloned()
    }

    fn root_ref(&self) -> ObjectRef {
        self.root
    }
}
