//! Deep copy of object graphs between documents.
//!
//! References are remapped through a table that lives for one import call.
//! A placeholder is allocated for every foreign reference before the
//! referenced object is visited, so shared and cyclic structures are copied
//! exactly once and recursion always terminates.

use super::object_stream::{ObjectStream, ObjectStreamHandle};
use super::page_tree::{find_page_for_modification, inherited_attribute};
use super::pdf_writer::PdfWriter;
use super::update_tracker::UpdateTracker;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::resolver::ObjectResolver;
use bytes::Bytes;
use std::collections::HashMap;

/// Foreign reference -> reference to the copy in this writer.
type ReferenceMap = HashMap<ObjectRef, ObjectRef>;

impl<T: UpdateTracker> PdfWriter<T> {
    /// Deep-copy an object into this writer, resolving indirect references
    /// through `source`.
    ///
    /// Every object reachable from `obj` is added to this writer once, even if
    /// it is reachable along several paths or through a cycle. References this
    /// writer already owns are kept as they are; references owned by neither
    /// this writer nor `source` are rejected.
    ///
    /// Imported objects go into `obj_stream` when one is given, except for
    /// streams and bare references, which are never allowed inside object
    /// streams and are written directly instead.
    ///
    /// On error every object this call added is removed again, so the writer
    /// stays writable.
    pub fn import_object(
        &mut self,
        obj: &Object,
        source: &dyn ObjectResolver,
        obj_stream: Option<ObjectStreamHandle>,
    ) -> Result<Object> {
        let mut reference_map = ReferenceMap::new();
        match self.import_inner(obj, source, &mut reference_map, obj_stream) {
            Ok(imported) => {
                log::debug!("Imported {} indirect objects", reference_map.len());
                Ok(imported)
            },
            Err(e) => {
                // nothing from a failed import may stay behind
                log::debug!("Import failed, discarding {} objects: {}", reference_map.len(), e);
                self.discard_objects(reference_map.into_values().map(|r| r.id));
                Err(e)
            },
        }
    }

    fn import_inner(
        &mut self,
        obj: &Object,
        source: &dyn ObjectResolver,
        reference_map: &mut ReferenceMap,
        obj_stream: Option<ObjectStreamHandle>,
    ) -> Result<Object> {
        match obj {
            Object::Reference(r) => {
                if let Some(new_ref) = reference_map.get(r) {
                    return Ok(Object::Reference(*new_ref));
                }
                if r.doc == self.document_id() {
                    return Ok(obj.clone());
                }
                if r.doc != source.document_id() {
                    return Err(Error::ForeignReference(*r));
                }

                let referenced = source.resolve(r)?;
                // reserve the number first: the object may refer back to itself
                let placeholder = self.allocate_placeholder();
                reference_map.insert(*r, placeholder);
                let imported = self.import_inner(&referenced, source, reference_map, obj_stream)?;

                let target = match obj_stream {
                    Some(_) if !ObjectStream::accepts(&imported) => {
                        log::warn!(
                            "{} object imported from {} cannot go into an object stream, \
                             writing it directly",
                            imported.type_name(),
                            r
                        );
                        None
                    },
                    other => other,
                };
                log::trace!("Importing {} as {}", r, placeholder);
                self.add_object_with(imported, target, Some(placeholder.id))?;
                Ok(Object::Reference(placeholder))
            },
            Object::Dictionary(dict) => Ok(Object::Dictionary(
                self.import_dict(dict, source, reference_map, obj_stream)?,
            )),
            // the payload stays encoded; no need to decode and re-encode it
            Object::Stream { dict, data } => Ok(Object::Stream {
                dict: self.import_dict(dict, source, reference_map, obj_stream)?,
                data: data.clone(),
            }),
            Object::Array(items) => items
                .iter()
                .map(|item| self.import_inner(item, source, reference_map, obj_stream))
                .collect::<Result<Vec<_>>>()
                .map(Object::Array),
            other => Ok(other.clone()),
        }
    }

    fn import_dict(
        &mut self,
        dict: &Dict,
        source: &dyn ObjectResolver,
        reference_map: &mut ReferenceMap,
        obj_stream: Option<ObjectStreamHandle>,
    ) -> Result<Dict> {
        let mut imported = Dict::with_capacity(dict.len());
        for (key, value) in dict {
            let value = self.import_inner(value, source, reference_map, obj_stream)?;
            imported.insert(key.clone(), value);
        }
        Ok(imported)
    }

    fn xobject_dict(
        &mut self,
        source: &dyn ObjectResolver,
        media_box: &Object,
        resources: &Object,
        filters: Option<(&Object, Option<&Object>)>,
        reference_map: &mut ReferenceMap,
    ) -> Result<Dict> {
        let mut dict = Dict::new();
        let media_box = self.import_inner(media_box, source, reference_map, None)?;
        dict.insert("BBox".to_string(), media_box);
        let resources = self.import_inner(resources, source, reference_map, None)?;
        dict.insert("Resources".to_string(), resources);
        dict.insert("Type".to_string(), Object::Name("XObject".to_string()));
        dict.insert("Subtype".to_string(), Object::Name("Form".to_string()));
        if let Some((filters, params)) = filters {
            let filters = self.import_inner(filters, source, reference_map, None)?;
            dict.insert("Filter".to_string(), filters);
            if let Some(params) = params {
                let params = self.import_inner(params, source, reference_map, None)?;
                dict.insert("DecodeParms".to_string(), params);
            }
        }
        Ok(dict)
    }

    /// Import a page of another document as a form XObject.
    ///
    /// `/MediaBox` and `/Resources` are looked up on the page and, failing
    /// that, on its ancestors. When the page has several content streams,
    /// `content_stream` selects one. With `inherit_filters` the content stream
    /// keeps its encoding; otherwise it is decoded.
    pub fn import_page_as_xobject(
        &mut self,
        source: &dyn ObjectResolver,
        page_ix: usize,
        content_stream: usize,
        inherit_filters: bool,
    ) -> Result<ObjectRef> {
        let (page_ref, resources) = find_page_for_modification(source, page_ix)?;
        let page = source.resolve(&page_ref)?;
        let media_box = inherited_attribute(source, &page, "MediaBox")?.ok_or_else(|| {
            Error::InvalidPageTree(format!("Page {} does not have a /MediaBox", page_ix))
        })?;

        let contents = page
            .get("Contents")
            .ok_or_else(|| Error::InvalidPageTree(format!("Page {} has no /Contents", page_ix)))?;
        let command_stream = match source.resolve_deep(contents)? {
            Object::Array(streams) => {
                let selected = streams.get(content_stream).ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "Page {} has {} content streams, requested #{}",
                        page_ix,
                        streams.len(),
                        content_stream
                    ))
                })?;
                source.resolve_deep(selected)?
            },
            other => other,
        };
        let (stream_dict, encoded) = match &command_stream {
            Object::Stream { dict, data } => (dict, data),
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };

        let filters = stream_dict.get("Filter").filter(|_| inherit_filters);
        let data = match filters {
            Some(_) => encoded.clone(),
            None => Bytes::from(command_stream.decode_stream_data()?),
        };

        let mut reference_map = ReferenceMap::new();
        let dict = match self.xobject_dict(
            source,
            &media_box,
            &resources,
            filters.map(|f| (f, stream_dict.get("DecodeParms"))),
            &mut reference_map,
        ) {
            Ok(dict) => dict,
            Err(e) => {
                self.discard_objects(reference_map.into_values().map(|r| r.id));
                return Err(e);
            },
        };

        let xobject = self.add_object(Object::stream(dict, data))?;
        log::debug!("Imported page {} from {} as form XObject {}", page_ix, page_ref, xobject);
        Ok(xobject)
    }
}
