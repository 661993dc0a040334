//! Tests for importing object graphs from other documents.

use pdf_forge::error::{Error, Result};
use pdf_forge::object::{Dict, DocumentId, Object, ObjectRef};
use pdf_forge::resolver::ObjectResolver;
use pdf_forge::writer::{ObjectSerializer, PagePosition, PageObject, PdfWriter, WriterConfig};
use std::collections::HashMap;

/// Minimal stand-in for a parsed document.
struct InMemoryDocument {
    id: DocumentId,
    objects: HashMap<u32, Object>,
    root: u32,
}

impl InMemoryDocument {
    fn new() -> Self {
        Self {
            id: DocumentId::new(),
            objects: HashMap::new(),
            root: 1,
        }
    }

    fn reference(&self, id: u32) -> ObjectRef {
        ObjectRef::new(id, 0, self.id)
    }

    fn insert(&mut self, id: u32, obj: Object) -> ObjectRef {
        self.objects.insert(id, obj);
        self.reference(id)
    }
}

impl ObjectResolver for InMemoryDocument {
    fn document_id(&self) -> DocumentId {
        self.id
    }

    fn resolve(&self, obj_ref: &ObjectRef) -> Result<Object> {
        if obj_ref.doc != self.id {
            return Err(Error::ForeignReference(*obj_ref));
        }
        self.objects
            .get(&obj_ref.id)
            .cloned()
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))
    }

    fn root_ref(&self) -> ObjectRef {
        self.reference(self.root)
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_import_mutual_references() {
    init_logging();
    let mut source = InMemoryDocument::new();
    let a = source.reference(10);
    let b = source.reference(11);
    source.insert(10, ObjectSerializer::dict(vec![("Next", Object::Reference(b))]));
    source.insert(11, ObjectSerializer::dict(vec![("Next", Object::Reference(a))]));

    let mut dest = PdfWriter::new();
    let before = dest.last_obj_id();
    let imported = dest.import_object(&Object::Reference(a), &source, None).unwrap();
    assert_eq!(dest.last_obj_id(), before + 2);

    let new_a = imported.as_reference().unwrap();
    let new_b = dest
        .get_object(&new_a)
        .unwrap()
        .get("Next")
        .and_then(|n| n.as_reference())
        .unwrap();
    assert_ne!(new_a, new_b);
    assert_eq!(
        dest.get_object(&new_b).unwrap().get("Next"),
        Some(&Object::Reference(new_a))
    );

    // every placeholder got populated
    dest.to_bytes().unwrap();
}

#[test]
fn test_separate_imports_copy_again() {
    let mut source = InMemoryDocument::new();
    let r = source.insert(3, Object::Integer(42));

    let mut dest = PdfWriter::new();
    let first = dest.import_object(&Object::Reference(r), &source, None).unwrap();
    let second = dest.import_object(&Object::Reference(r), &source, None).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_import_missing_object_fails() {
    let source = InMemoryDocument::new();
    let mut dest = PdfWriter::new();
    let dangling = Object::Reference(source.reference(77));
    assert!(matches!(
        dest.import_object(&dangling, &source, None),
        Err(Error::ObjectNotFound(77, 0))
    ));
}

#[test]
fn test_failed_import_leaves_writer_writable() {
    init_logging();
    let mut source = InMemoryDocument::new();
    let present = source.insert(11, Object::Integer(7));
    let missing = source.reference(99);
    let holder = source.insert(
        10,
        ObjectSerializer::dict(vec![
            ("A", Object::Reference(present)),
            ("B", Object::Reference(missing)),
        ]),
    );

    let mut dest = PdfWriter::new();
    let handle = dest.prepare_object_stream(false).unwrap();
    let before = dest.last_obj_id();
    assert!(matches!(
        dest.import_object(&Object::Reference(holder), &source, Some(handle)),
        Err(Error::ObjectNotFound(99, 0))
    ));

    // the holder placeholder and the integer already copied are both gone
    for id in [before + 1, before + 2] {
        let r = ObjectRef::new(id, 0, dest.document_id());
        assert!(!dest.is_pending(&r));
        assert!(matches!(dest.get_object(&r), Err(Error::ObjectNotFound(_, 0))));
    }
    assert!(dest.object_stream(handle).unwrap().is_empty());

    let pdf = dest.to_bytes().unwrap();
    assert!(pdf.ends_with(b"%%EOF\n"));
}

#[test]
fn test_import_into_sealed_object_stream_rolls_back() {
    let mut source = InMemoryDocument::new();
    let r = source.insert(3, ObjectSerializer::dict(vec![("K", Object::Integer(1))]));

    let mut dest = PdfWriter::new();
    let handle = dest.prepare_object_stream(false).unwrap();
    dest.add_object_with(Object::Integer(5), Some(handle), None).unwrap();
    dest.to_bytes().unwrap();

    assert!(matches!(
        dest.import_object(&Object::Reference(r), &source, Some(handle)),
        Err(Error::ObjectStreamSealed(0))
    ));
    dest.to_bytes().unwrap();
}

#[test]
fn test_failed_page_import_leaves_writer_writable() {
    let mut source = InMemoryDocument::new();
    let pages = source.reference(2);
    let page = source.reference(3);
    let media_box = source.reference(8);
    let missing = source.reference(9);
    let content = source.insert(5, Object::stream(Dict::new(), &b"q Q"[..]));
    source.insert(1, ObjectSerializer::dict(vec![("Pages", Object::Reference(pages))]));
    source.insert(
        2,
        ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Count", ObjectSerializer::integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page)])),
        ]),
    );
    source.insert(
        3,
        ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Page")),
            ("Parent", Object::Reference(pages)),
            ("MediaBox", Object::Reference(media_box)),
            ("Resources", Object::Dictionary(Dict::new())),
            ("Contents", Object::Reference(content)),
        ]),
    );
    source.insert(8, Object::Array(vec![Object::Reference(missing)]));

    let mut dest = PdfWriter::new();
    let before = dest.last_obj_id();
    assert!(matches!(
        dest.import_page_as_xobject(&source, 0, 0, true),
        Err(Error::ObjectNotFound(9, 0))
    ));
    let copied = ObjectRef::new(before + 1, 0, dest.document_id());
    assert!(matches!(dest.get_object(&copied), Err(Error::ObjectNotFound(_, 0))));
    dest.to_bytes().unwrap();
}

#[test]
fn test_reference_to_reference_stays_out_of_object_stream() {
    let mut source = InMemoryDocument::new();
    let target = source.insert(5, Object::Integer(1));
    let alias = source.insert(6, Object::Reference(target));
    let holder = source.insert(7, Object::Array(vec![Object::Reference(alias)]));

    let mut dest = PdfWriter::new();
    let handle = dest.prepare_object_stream(false).unwrap();
    let imported = dest
        .import_object(&Object::Reference(holder), &source, Some(handle))
        .unwrap();

    let objstm = dest.object_stream(handle).unwrap();
    let members: Vec<u32> = objstm.object_ids().collect();
    // the holder array and the integer go in; the bare reference does not
    assert_eq!(members.len(), 2);
    assert!(members.contains(&imported.as_reference().unwrap().id));

    let pdf = dest.to_bytes().unwrap();
    assert!(pdf.windows(6).any(|w| w == b"/ObjStm"));
}

#[test]
fn test_import_between_writers_then_write() {
    let mut source = PdfWriter::with_config(WriterConfig::default().with_stream_xrefs(false));
    let font = source
        .add_object(ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Font")),
            ("BaseFont", ObjectSerializer::name("Helvetica")),
        ]))
        .unwrap();
    let resources = ObjectSerializer::dict(vec![(
        "Font",
        ObjectSerializer::dict(vec![("F1", Object::Reference(font))]),
    )]);

    let mut dest = PdfWriter::with_config(WriterConfig::default().with_stream_xrefs(false));
    let imported = dest.import_object(&resources, &source, None).unwrap();
    let new_font = imported
        .get("Font")
        .and_then(|f| f.get("F1"))
        .and_then(|f| f.as_reference())
        .unwrap();
    assert_eq!(new_font.doc, dest.document_id());

    let text = String::from_utf8_lossy(&dest.to_bytes().unwrap()).to_string();
    assert!(text.contains(&format!("{} 0 obj\n<</Type /Font/BaseFont /Helvetica>>", new_font.id)));
}

#[test]
fn test_import_page_with_inherited_attributes() {
    let mut source = InMemoryDocument::new();
    let pages = source.reference(2);
    let page = source.reference(3);
    let font = source.insert(
        9,
        ObjectSerializer::dict(vec![("Type", ObjectSerializer::name("Font"))]),
    );
    let mut content = Object::stream(Dict::new(), &b"BT /F1 10 Tf (hi) Tj ET"[..]);
    content.compress().unwrap();
    let c1 = source.insert(5, Object::stream(Dict::new(), &b"q"[..]));
    let c2 = source.insert(6, content);

    source.insert(1, ObjectSerializer::dict(vec![("Pages", Object::Reference(pages))]));
    source.insert(
        2,
        ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Pages")),
            ("Count", ObjectSerializer::integer(1)),
            ("Kids", Object::Array(vec![Object::Reference(page)])),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(300),
                    Object::Integer(400),
                ]),
            ),
            (
                "Resources",
                ObjectSerializer::dict(vec![(
                    "Font",
                    ObjectSerializer::dict(vec![("F1", Object::Reference(font))]),
                )]),
            ),
        ]),
    );
    source.insert(
        3,
        ObjectSerializer::dict(vec![
            ("Type", ObjectSerializer::name("Page")),
            ("Parent", Object::Reference(pages)),
            ("Contents", Object::Array(vec![Object::Reference(c1), Object::Reference(c2)])),
        ]),
    );

    let mut dest = PdfWriter::new();
    let xobject = dest.import_page_as_xobject(&source, 0, 1, false).unwrap();
    let xobject = dest.get_object(&xobject).unwrap().clone();

    assert_eq!(xobject.encoded_data().unwrap().as_ref(), b"BT /F1 10 Tf (hi) Tj ET");
    assert_eq!(xobject.get("BBox").and_then(|b| b.as_array()).map(|b| b.len()), Some(4));
    let new_font = xobject
        .get("Resources")
        .and_then(|r| r.get("Font"))
        .and_then(|f| f.get("F1"))
        .and_then(|f| f.as_reference())
        .unwrap();
    assert_eq!(new_font.doc, dest.document_id());

    assert!(matches!(
        dest.import_page_as_xobject(&source, 0, 2, true),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_imported_xobject_can_be_placed_on_a_page() {
    let mut source = PdfWriter::new();
    let content = source
        .add_object(Object::stream(Dict::new(), &b"0 0 10 10 re f"[..]))
        .unwrap();
    let page = PageObject::new(Object::Reference(content), &[0.0, 0.0, 10.0, 10.0]).unwrap();
    source.insert_page(page.into_object(), PagePosition::End).unwrap();

    let mut dest = PdfWriter::new();
    let xobject = dest.import_page_as_xobject(&source, 0, 0, true).unwrap();
    let draw = dest
        .add_object(Object::stream(Dict::new(), &b"q /X0 Do Q"[..]))
        .unwrap();
    let mut resources = Dict::new();
    resources.insert(
        "XObject".to_string(),
        ObjectSerializer::dict(vec![("X0", Object::Reference(xobject))]),
    );
    let page = PageObject::new(Object::Reference(draw), &[0.0, 0.0, 10.0, 10.0])
        .unwrap()
        .with_resources(resources);
    dest.insert_page(page.into_object(), PagePosition::End).unwrap();

    assert_eq!(dest.page_count().unwrap(), 1);
    dest.to_bytes().unwrap();
}
