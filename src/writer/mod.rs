//! PDF writing module.
//!
//! ## Architecture
//!
//! ```text
//! Object graph (objects, placeholders, imported subgraphs)
//!     ↓
//! [PdfWriter] (object store, page tree, import)
//!     ↓
//! [ObjectStream] (optional batching of small objects)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects, recording offsets)
//!     ↓
//! [PositionMap] → xref table or [XRefStream], trailer
//!     ↓
//! PDF bytes
//! ```
//!
//! ## Example
//!
//! ```
//! use pdf_forge::object::{Dict, Object};
//! use pdf_forge::writer::{PageObject, PagePosition, PdfWriter};
//!
//! let mut writer = PdfWriter::new();
//! let content = writer.add_object(Object::stream(Dict::new(), &b"0 0 m 100 100 l S"[..]))?;
//! let page = PageObject::new(Object::Reference(content), &[0.0, 0.0, 612.0, 792.0])?;
//! writer.insert_page(page.into_object(), PagePosition::End)?;
//!
//! let bytes = writer.to_bytes()?;
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! # Ok::<(), pdf_forge::error::Error>(())
//! ```

mod import;
mod object_serializer;
mod object_stream;
mod page_tree;
mod pdf_writer;
mod trailer;
mod update_tracker;
mod xref;

pub use object_serializer::ObjectSerializer;
pub use object_stream::{ObjectStream, ObjectStreamHandle};
pub use page_tree::{
    find_page_container, find_page_for_modification, inherited_attribute, init_xobject_dictionary,
    page_count, pages_root, PageLocation, PageObject, PagePosition,
};
pub use pdf_writer::{PdfWriter, WriterConfig};
pub use trailer::{DocumentIdPair, Trailer};
pub use update_tracker::{NoopTracker, RecordingTracker, UpdateTracker};
pub use xref::{
    write_xref_table, PositionMap, Subsection, XRefStream, XrefPosition, XREF_STREAM_WIDTHS,
};
