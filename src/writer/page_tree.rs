//! Page tree maintenance.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.7.3 (page tree).
//!
//! Every intermediate node (`/Type /Pages`) carries a `/Kids` array and a
//! `/Count` equal to the number of pages below it. Nodes point back up through
//! `/Parent`; all of these links are plain references resolved through the
//! writer, so the tree never holds structural back-pointers.

use super::object_serializer::ObjectSerializer;
use super::pdf_writer::PdfWriter;
use super::update_tracker::UpdateTracker;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::resolver::ObjectResolver;
use bytes::Bytes;

/// Page trees deeper than this are treated as cyclic.
const MAX_TREE_DEPTH: usize = 256;

/// Where [`PdfWriter::insert_page`] puts a new page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePosition {
    /// Before all existing pages
    Start,
    /// Right after the page with this (zero-based) index
    After(usize),
    /// After the last page
    End,
}

/// Location of a page inside the page tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLocation {
    /// The `/Pages` node whose `/Kids` holds the page
    pub container: ObjectRef,
    /// Index of the page within the container's `/Kids`
    pub index: usize,
    /// The page itself
    pub page: ObjectRef,
}

/// Reference to the page tree root of a document.
pub fn pages_root<R: ObjectResolver + ?Sized>(resolver: &R) -> Result<ObjectRef> {
    let catalog = resolver.resolve(&resolver.root_ref())?;
    catalog
        .get("Pages")
        .and_then(|p| p.as_reference())
        .ok_or_else(|| Error::InvalidPageTree("catalog has no /Pages reference".to_string()))
}

/// Number of pages in a document, read from the root's `/Count`.
pub fn page_count<R: ObjectResolver + ?Sized>(resolver: &R) -> Result<usize> {
    let root = resolver.resolve(&pages_root(resolver)?)?;
    node_count(&root)
}

fn node_count(node: &Object) -> Result<usize> {
    node.get("Count")
        .and_then(|c| c.as_integer())
        .and_then(|c| usize::try_from(c).ok())
        .ok_or_else(|| Error::InvalidPageTree("/Pages node without a valid /Count".to_string()))
}

fn resolve_kids<R: ObjectResolver + ?Sized>(resolver: &R, node: &Object) -> Result<Vec<Object>> {
    let kids = node
        .get("Kids")
        .ok_or_else(|| Error::InvalidPageTree("/Pages must have /Kids".to_string()))?;
    match resolver.resolve_deep(kids)? {
        Object::Array(kids) => Ok(kids),
        other => Err(Error::InvalidObjectType {
            expected: "Array".to_string(),
            found: other.type_name().to_string(),
        }),
    }
}

/// Find the `/Pages` node holding the page with index `page_ix`.
///
/// Subtrees are skipped using their `/Count`, so only the nodes on the path to
/// the page are resolved.
pub fn find_page_container<R: ObjectResolver + ?Sized>(
    resolver: &R,
    page_ix: usize,
) -> Result<PageLocation> {
    let root_ref = pages_root(resolver)?;
    let root = resolver.resolve(&root_ref)?;
    let total = node_count(&root)?;
    if page_ix >= total {
        return Err(Error::PageIndexOutOfRange {
            index: page_ix,
            count: total,
        });
    }

    let mut remaining = page_ix;
    let mut node_ref = root_ref;
    let mut node = root;
    'descend: for _ in 0..MAX_TREE_DEPTH {
        for (index, kid) in resolve_kids(resolver, &node)?.into_iter().enumerate() {
            let kid_ref = kid.as_reference().ok_or_else(|| {
                Error::InvalidPageTree("/Kids entry is not a reference".to_string())
            })?;
            let kid_obj = resolver.resolve(&kid_ref)?;
            match kid_obj.get("Type").and_then(|t| t.as_name()) {
                Some("Pages") => {
                    let count = node_count(&kid_obj)?;
                    if remaining < count {
                        node_ref = kid_ref;
                        node = kid_obj;
                        continue 'descend;
                    }
                    remaining -= count;
                },
                Some("Page") => {
                    if remaining == 0 {
                        return Ok(PageLocation {
                            container: node_ref,
                            index,
                            page: kid_ref,
                        });
                    }
                    remaining -= 1;
                },
                _ => {
                    return Err(Error::InvalidPageTree(format!(
                        "{} is neither a page nor a page tree node",
                        kid_ref
                    )))
                },
            }
        }
        // /Count promised more pages than /Kids delivered
        return Err(Error::InvalidPageTree(format!("{} has an inconsistent /Count", node_ref)));
    }
    Err(Error::InvalidPageTree("page tree is too deep".to_string()))
}

/// Look up an attribute on a page, falling back to its ancestors.
///
/// Used for the inheritable attributes `/Resources`, `/MediaBox`, `/CropBox`
/// and `/Rotate`.
pub fn inherited_attribute<R: ObjectResolver + ?Sized>(
    resolver: &R,
    page: &Object,
    key: &str,
) -> Result<Option<Object>> {
    let mut node = page.clone();
    for _ in 0..MAX_TREE_DEPTH {
        if let Some(value) = node.get(key) {
            return Ok(Some(value.clone()));
        }
        match node.get("Parent").and_then(|p| p.as_reference()) {
            Some(parent) => node = resolver.resolve(&parent)?,
            None => return Ok(None),
        }
    }
    Err(Error::InvalidPageTree("/Parent chain is too long".to_string()))
}

/// Locate a page and its (possibly inherited) `/Resources`.
pub fn find_page_for_modification<R: ObjectResolver + ?Sized>(
    resolver: &R,
    page_ix: usize,
) -> Result<(ObjectRef, Object)> {
    let location = find_page_container(resolver, page_ix)?;
    let page = resolver.resolve(&location.page)?;
    let resources = inherited_attribute(resolver, &page, "Resources")?
        .unwrap_or_else(|| Object::Dictionary(Dict::new()));
    Ok((location.page, resources))
}

impl<T: UpdateTracker> PdfWriter<T> {
    /// Insert a page object into the page tree.
    ///
    /// The page must be a `/Type /Page` dictionary without a `/Parent`. It is
    /// added to the writer, linked into the `/Kids` of the node that holds the
    /// page it follows, and `/Count` is incremented on every ancestor. All
    /// checks happen before anything is modified.
    pub fn insert_page(&mut self, new_page: Object, position: PagePosition) -> Result<ObjectRef> {
        let mut page = match new_page {
            Object::Dictionary(dict) => dict,
            _ => return Err(Error::NotAPage),
        };
        if page.get("Type").and_then(|t| t.as_name()) != Some("Page") {
            return Err(Error::NotAPage);
        }
        if page.contains_key("Parent") {
            return Err(Error::ParentAlreadySet);
        }

        let root_ref = pages_root(&*self)?;
        let count = node_count(self.get_object(&root_ref)?)?;
        let after = match position {
            PagePosition::Start => None,
            PagePosition::End => count.checked_sub(1),
            PagePosition::After(ix) if ix >= count => {
                return Err(Error::PageIndexOutOfRange { index: ix, count })
            },
            PagePosition::After(ix) => Some(ix),
        };
        let (container_ref, kid_ix) = match after {
            None => (root_ref, 0),
            Some(ix) => {
                let location = find_page_container(&*self, ix)?;
                (location.container, location.index + 1)
            },
        };

        let kids_ref = match self.get_object(&container_ref)?.get("Kids") {
            Some(Object::Array(_)) => None,
            Some(Object::Reference(r)) => {
                let r = *r;
                if self.get_object(&r)?.as_array().is_none() {
                    return Err(Error::InvalidPageTree(format!(
                        "/Kids of {} is not an array",
                        container_ref
                    )));
                }
                Some(r)
            },
            _ => return Err(Error::InvalidPageTree("/Pages must have /Kids".to_string())),
        };
        let ancestors = self.ancestors(container_ref)?;

        for ancestor in &ancestors {
            if let Some(node) = self.get_object_mut(ancestor)?.as_dict_mut() {
                let count = node.get("Count").and_then(|c| c.as_integer()).unwrap_or(0);
                node.insert("Count".to_string(), Object::Integer(count + 1));
            }
        }
        page.insert("Parent".to_string(), Object::Reference(container_ref));
        let page_ref = self.add_object(Object::Dictionary(page))?;

        let kids_holder = kids_ref.unwrap_or(container_ref);
        let kids = match self.get_object_mut(&kids_holder)? {
            Object::Array(kids) => Some(kids),
            other => other
                .as_dict_mut()
                .and_then(|d| d.get_mut("Kids"))
                .and_then(|k| k.as_array_mut()),
        };
        if let Some(kids) = kids {
            kids.insert(kid_ix, Object::Reference(page_ref));
        }

        for ancestor in ancestors {
            self.update_container(ancestor);
        }
        if let Some(kids_ref) = kids_ref {
            self.update_container(kids_ref);
        }
        log::debug!("Inserted page {} into {} at /Kids index {}", page_ref, container_ref, kid_ix);
        Ok(page_ref)
    }

    /// The node itself followed by its `/Parent` chain, each checked for a `/Count`.
    fn ancestors(&self, node_ref: ObjectRef) -> Result<Vec<ObjectRef>> {
        let mut chain = Vec::new();
        let mut current = Some(node_ref);
        while let Some(r) = current {
            if chain.len() >= MAX_TREE_DEPTH || chain.contains(&r) {
                return Err(Error::InvalidPageTree(format!("/Parent chain of {} loops", node_ref)));
            }
            let node = self.get_object(&r)?;
            node_count(node)?;
            chain.push(r);
            current = node.get("Parent").and_then(|p| p.as_reference());
        }
        Ok(chain)
    }

    /// Append an annotation to a page's `/Annots`, creating the array if needed.
    ///
    /// If `/Annots` is an indirect array only that array is marked as updated;
    /// otherwise the page itself is.
    pub fn register_annotation(&mut self, page_ref: ObjectRef, annot_ref: ObjectRef) -> Result<()> {
        let page = self.get_object(&page_ref)?;
        if page.as_dict().is_none() {
            return Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: page.type_name().to_string(),
            });
        }
        let annots_ref = match page.get("Annots") {
            Some(Object::Reference(r)) => Some(*r),
            Some(Object::Array(_)) | None => None,
            Some(other) => {
                return Err(Error::InvalidObjectType {
                    expected: "Array".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };

        match annots_ref {
            Some(annots_ref) => {
                let annots = self.get_object_mut(&annots_ref)?;
                let found = annots.type_name();
                annots
                    .as_array_mut()
                    .ok_or_else(|| Error::InvalidObjectType {
                        expected: "Array".to_string(),
                        found: found.to_string(),
                    })?
                    .push(Object::Reference(annot_ref));
                self.mark_update(annots_ref);
            },
            None => {
                if let Some(page) = self.get_object_mut(&page_ref)?.as_dict_mut() {
                    let annots = page
                        .entry("Annots".to_string())
                        .or_insert_with(|| Object::Array(Vec::new()));
                    if let Some(annots) = annots.as_array_mut() {
                        annots.push(Object::Reference(annot_ref));
                    }
                }
                self.mark_update(page_ref);
            },
        }
        Ok(())
    }

    /// Locate the page with index `page_ix` in this writer's page tree.
    pub fn find_page_container(&self, page_ix: usize) -> Result<PageLocation> {
        find_page_container(self, page_ix)
    }

    /// Number of pages in this writer's page tree.
    pub fn page_count(&self) -> Result<usize> {
        page_count(self)
    }
}

/// Builder for `/Type /Page` dictionaries.
#[derive(Debug, Clone)]
pub struct PageObject {
    contents: Object,
    media_box: [f64; 4],
    resources: Dict,
}

impl PageObject {
    /// Start a page with the given content stream(s) and media box.
    ///
    /// `contents` must be a reference to a content stream or an array of such
    /// references, and the media box must consist of exactly 4 numbers.
    pub fn new(contents: Object, media_box: &[f64]) -> Result<Self> {
        match &contents {
            Object::Reference(_) => {},
            Object::Array(items) if items.iter().all(|o| o.as_reference().is_some()) => {},
            Object::Array(_) => {
                return Err(Error::InvalidArgument(
                    "Contents array must consist of indirect references".to_string(),
                ))
            },
            _ => {
                return Err(Error::InvalidArgument(
                    "Contents must be either an indirect reference or an array".to_string(),
                ))
            },
        }
        let media_box: [f64; 4] = media_box.try_into().map_err(|_| {
            Error::InvalidArgument("Media box must consist of 4 coordinates".to_string())
        })?;
        Ok(Self {
            contents,
            media_box,
            resources: Dict::new(),
        })
    }

    /// Set the resource dictionary.
    pub fn with_resources(mut self, resources: Dict) -> Self {
        self.resources = resources;
        self
    }

    /// Build the page dictionary.
    pub fn into_object(self) -> Object {
        ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Page")),
            (
                "MediaBox",
                ObjectSerializer::array(
                    self.media_box.iter().map(|&v| ObjectSerializer::real(v)).collect(),
                ),
            ),
            ("Resources", Object::Dictionary(self.resources)),
            ("Contents", self.contents),
        ])
    }
}

/// Create a form XObject from a content stream.
pub fn init_xobject_dictionary(
    command_stream: impl Into<Bytes>,
    box_width: f64,
    box_height: f64,
    resources: Option<Dict>,
) -> Object {
    let dict = ObjectSerializer::dict_entries(vec![
        (
            "BBox",
            ObjectSerializer::array(vec![
                ObjectSerializer::real(0.0),
                ObjectSerializer::real(box_height),
                ObjectSerializer::real(box_width),
                ObjectSerializer::real(0.0),
            ]),
        ),
        ("Resources", Object::Dictionary(resources.unwrap_or_default())),
        ("Type", ObjectSerializer::name("XObject")),
        ("Subtype", ObjectSerializer::name("Form")),
    ]);
    Object::stream(dict, command_stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::{RecordingTracker, WriterConfig};

    fn content_ref<T: UpdateTracker>(writer: &mut PdfWriter<T>) -> ObjectRef {
        writer
            .add_object(Object::stream(Dict::new(), &b"0 0 m"[..]))
            .unwrap()
    }

    fn blank_page<T: UpdateTracker>(writer: &mut PdfWriter<T>) -> Object {
        let contents = Object::Reference(content_ref(writer));
        PageObject::new(contents, &[0.0, 0.0, 612.0, 792.0])
            .unwrap()
            .into_object()
    }

    #[test]
    fn test_insert_first_page() {
        let mut writer = PdfWriter::new();
        let page = blank_page(&mut writer);
        let page_ref = writer.insert_page(page, PagePosition::End).unwrap();

        assert_eq!(writer.page_count().unwrap(), 1);
        let location = writer.find_page_container(0).unwrap();
        assert_eq!(location.page, page_ref);
        assert_eq!(location.index, 0);

        let parent = writer.get_object(&page_ref).unwrap().get("Parent").cloned();
        assert_eq!(parent, Some(Object::Reference(location.container)));
    }

    #[test]
    fn test_insert_positions() {
        let mut writer = PdfWriter::new();
        let a = blank_page(&mut writer);
        let a = writer.insert_page(a, PagePosition::End).unwrap();
        let b = blank_page(&mut writer);
        let b = writer.insert_page(b, PagePosition::Start).unwrap();
        let c = blank_page(&mut writer);
        let c = writer.insert_page(c, PagePosition::After(0)).unwrap();

        let order: Vec<_> = (0..3)
            .map(|ix| writer.find_page_container(ix).unwrap().page)
            .collect();
        assert_eq!(order, vec![b, c, a]);
    }

    #[test]
    fn test_rejects_non_page_without_mutation() {
        let mut writer = PdfWriter::new();
        let not_a_page = ObjectSerializer::dict(vec![("Type", ObjectSerializer::name("Annot"))]);
        let before = writer.last_obj_id();
        assert!(matches!(writer.insert_page(not_a_page, PagePosition::End), Err(Error::NotAPage)));
        assert_eq!(writer.last_obj_id(), before);
        assert_eq!(writer.page_count().unwrap(), 0);
    }

    #[test]
    fn test_rejects_page_with_parent() {
        let mut writer = PdfWriter::new();
        let mut page = blank_page(&mut writer);
        let root = writer.root_ref();
        page.as_dict_mut()
            .unwrap()
            .insert("Parent".to_string(), Object::Reference(root));
        assert!(matches!(
            writer.insert_page(page, PagePosition::End),
            Err(Error::ParentAlreadySet)
        ));
    }

    #[test]
    fn test_after_out_of_range() {
        let mut writer = PdfWriter::new();
        let page = blank_page(&mut writer);
        assert!(matches!(
            writer.insert_page(page, PagePosition::After(0)),
            Err(Error::PageIndexOutOfRange { index: 0, count: 0 })
        ));
    }

    #[test]
    fn test_insert_notifies_tracker() {
        let mut writer =
            PdfWriter::with_tracker(WriterConfig::default(), RecordingTracker::default());
        let page = blank_page(&mut writer);
        writer.insert_page(page, PagePosition::End).unwrap();
        let root = pages_root(&writer).unwrap();
        assert_eq!(writer.tracker().containers, vec![root]);
    }

    #[test]
    fn test_register_annotation_direct_and_indirect() {
        let mut writer =
            PdfWriter::with_tracker(WriterConfig::default(), RecordingTracker::default());
        let page = blank_page(&mut writer);
        let page_ref = writer.insert_page(page, PagePosition::End).unwrap();
        let annot = writer
            .add_object(ObjectSerializer::dict(vec![("Type", ObjectSerializer::name("Annot"))]))
            .unwrap();

        writer.register_annotation(page_ref, annot).unwrap();
        assert_eq!(writer.tracker().marked, vec![page_ref]);
        let annots = writer.get_object(&page_ref).unwrap().get("Annots").cloned();
        assert_eq!(annots, Some(Object::Array(vec![Object::Reference(annot)])));

        // switch to an indirect /Annots array
        let annots_ref = writer.add_object(Object::Array(vec![])).unwrap();
        writer
            .get_object_mut(&page_ref)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .insert("Annots".to_string(), Object::Reference(annots_ref));
        writer.register_annotation(page_ref, annot).unwrap();
        assert_eq!(writer.tracker().marked, vec![page_ref, annots_ref]);
        assert_eq!(
            writer.get_object(&annots_ref).unwrap(),
            &Object::Array(vec![Object::Reference(annot)])
        );
    }

    #[test]
    fn test_page_object_validation() {
        let doc = crate::object::DocumentId::new();
        let r = Object::Reference(ObjectRef::new(5, 0, doc));
        assert!(PageObject::new(r.clone(), &[0.0, 0.0, 10.0]).is_err());
        assert!(PageObject::new(Object::Integer(1), &[0.0, 0.0, 10.0, 10.0]).is_err());
        assert!(PageObject::new(Object::Array(vec![Object::Null]), &[0.0, 0.0, 1.0, 1.0]).is_err());
        assert!(PageObject::new(Object::Array(vec![r]), &[0.0, 0.0, 1.0, 1.0]).is_ok());
    }

    #[test]
    fn test_xobject_dictionary() {
        let xobj = init_xobject_dictionary(&b"q Q"[..], 100.0, 50.0, None);
        let s = ObjectSerializer::compact().serialize_to_string(&xobj).unwrap();
        assert!(s.starts_with(
            "<</BBox [0 50 100 0]/Resources <<>>/Type /XObject/Subtype /Form/Length 3>>"
        ));
        assert!(s.ends_with("stream\nq Q\nendstream"));
    }
}
