//! Object stream assembly (PDF 1.5+).
//!
//! Object streams (`/Type /ObjStm`) let several non-stream objects share one
//! compressed stream. They can only be used in files whose cross-reference
//! section is itself a stream, see ISO 32000-1:2008, Section 7.5.7.
//!
//! # Format
//!
//! ```text
//! << /Type /ObjStm /N 2 /First 10 >>
//! stream
//! 10 0 11 3 42 /Test
//! endstream
//! ```
//!
//! The header holds `N` pairs `(object number, offset relative to /First)`,
//! followed by the serialized objects themselves.

use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::object::{DocumentId, Object};
use indexmap::IndexMap;
use std::io::Write;

/// Handle to an object stream registered with a [`PdfWriter`].
///
/// Handles are only meaningful to the writer that produced them.
///
/// [`PdfWriter`]: super::PdfWriter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectStreamHandle {
    pub(crate) owner: DocumentId,
    pub(crate) index: usize,
}

/// Collects objects to be written together into one object stream.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    objects: IndexMap<u32, Object>,
    compress: bool,
    /// Object number the rendered stream was registered under, once written.
    sealed_as: Option<u32>,
}

impl ObjectStream {
    /// Create an empty object stream.
    pub fn new(compress: bool) -> Self {
        Self {
            objects: IndexMap::new(),
            compress,
            sealed_as: None,
        }
    }

    /// Add an object. Objects in object streams always have generation 0.
    ///
    /// Stream objects and bare references cannot be embedded and are rejected.
    pub fn add_object(&mut self, idnum: u32, obj: Object) -> Result<()> {
        if !Self::accepts(&obj) {
            return Err(Error::ObjectStreamForbidden(obj.type_name()));
        }
        self.objects.insert(idnum, obj);
        Ok(())
    }

    /// Whether `obj` could legally be placed in an object stream.
    pub fn accepts(obj: &Object) -> bool {
        !matches!(obj, Object::Stream { .. } | Object::Reference(_))
    }

    /// Number of objects collected so far.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects have been added.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up a collected object.
    pub fn get(&self, idnum: u32) -> Option<&Object> {
        self.objects.get(&idnum)
    }

    /// Mutable variant of [`ObjectStream::get`].
    pub fn get_mut(&mut self, idnum: u32) -> Option<&mut Object> {
        self.objects.get_mut(&idnum)
    }

    pub(crate) fn remove(&mut self, idnum: u32) -> Option<Object> {
        self.objects.shift_remove(&idnum)
    }

    /// Object numbers in stream order.
    pub fn object_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.objects.keys().copied()
    }

    /// Object number of the stream object, once the stream has been written.
    pub fn sealed_as(&self) -> Option<u32> {
        self.sealed_as
    }

    pub(crate) fn seal(&mut self, stream_id: u32) {
        self.sealed_as = Some(stream_id);
    }

    /// Render the collected objects into a `/Type /ObjStm` stream object.
    ///
    /// Members are checked again here since [`ObjectStream::get_mut`] can
    /// replace them after they were added.
    pub fn as_pdf_object(&self) -> Result<Object> {
        let serializer = ObjectSerializer::compact();
        let mut header = Vec::new();
        let mut body = Vec::new();
        for (idnum, obj) in &self.objects {
            if !Self::accepts(obj) {
                log::error!("Object {} in object stream became a {}", idnum, obj.type_name());
                return Err(Error::ObjectStreamForbidden(obj.type_name()));
            }
            write!(header, "{} {} ", idnum, body.len())?;
            serializer.write_object(&mut body, obj)?;
            // keep objects apart so adjacent tokens cannot run together
            body.push(b'\n');
        }

        let first = header.len();
        header.extend_from_slice(&body);
        let dict = ObjectSerializer::dict_entries(vec![
            ("Type", ObjectSerializer::name("ObjStm")),
            ("N", ObjectSerializer::integer(self.objects.len() as i64)),
            ("First", ObjectSerializer::integer(first as i64)),
        ]);
        let mut stream = Object::stream(dict, header);
        if self.compress {
            stream.compress()?;
        }
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectRef;

    #[test]
    fn test_render_uncompressed() {
        let mut objstm = ObjectStream::new(false);
        objstm.add_object(10, Object::Integer(42)).unwrap();
        objstm.add_object(11, ObjectSerializer::name("Test")).unwrap();

        let stream = objstm.as_pdf_object().unwrap();
        assert_eq!(stream.get("Type").and_then(|t| t.as_name()), Some("ObjStm"));
        assert_eq!(stream.get("N").and_then(|n| n.as_integer()), Some(2));
        assert_eq!(stream.get("First").and_then(|n| n.as_integer()), Some(10));
        assert_eq!(stream.encoded_data().unwrap().as_ref(), b"10 0 11 3 42\n/Test\n");
    }

    #[test]
    fn test_render_compressed() {
        let mut objstm = ObjectStream::new(true);
        objstm.add_object(5, Object::Boolean(true)).unwrap();

        let stream = objstm.as_pdf_object().unwrap();
        assert_eq!(stream.get("Filter").and_then(|f| f.as_name()), Some("FlateDecode"));
        assert_eq!(stream.decode_stream_data().unwrap(), b"5 0 true\n");
    }

    #[test]
    fn test_rejects_streams_and_references() {
        let mut objstm = ObjectStream::new(true);
        let stream = Object::stream(Default::default(), &b"x"[..]);
        assert!(matches!(
            objstm.add_object(1, stream),
            Err(Error::ObjectStreamForbidden("Stream"))
        ));

        let r = Object::Reference(ObjectRef::new(1, 0, DocumentId::new()));
        assert!(matches!(objstm.add_object(2, r), Err(Error::ObjectStreamForbidden("Reference"))));
        assert!(objstm.is_empty());
    }

    #[test]
    fn test_render_rejects_member_replaced_in_place() {
        let mut objstm = ObjectStream::new(false);
        objstm.add_object(4, Object::Integer(1)).unwrap();
        *objstm.get_mut(4).unwrap() = Object::stream(Default::default(), &b"xx"[..]);
        assert!(matches!(objstm.as_pdf_object(), Err(Error::ObjectStreamForbidden("Stream"))));
    }

    #[test]
    fn test_keeps_insertion_order() {
        let mut objstm = ObjectStream::new(false);
        objstm.add_object(9, Object::Null).unwrap();
        objstm.add_object(3, Object::Null).unwrap();
        assert_eq!(objstm.object_ids().collect::<Vec<_>>(), vec![9, 3]);
    }
}
