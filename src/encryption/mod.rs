//! Security handler contract for writing encrypted PDFs.
//!
//! The writer does not implement any encryption algorithm itself. A security
//! handler is attached to a [`PdfWriter`], contributes its `/Encrypt`
//! dictionary to the document, and is then invoked once per indirect object
//! while the body is serialized. It is never applied to its own `/Encrypt`
//! dictionary, nor to the cross-reference stream.
//!
//! Handlers receive `&self` only and cannot reach the object store.
//!
//! [`PdfWriter`]: crate::writer::PdfWriter

use crate::error::Result;
use crate::object::Object;

mod write_handler;

pub use write_handler::encrypt_object;

/// Per-object encryption transform used during serialization.
pub trait SecurityHandler {
    /// The `/Encrypt` dictionary to register in the document.
    fn as_stored_object(&self) -> Object;

    /// Encrypt a string belonging to object `obj_num`/`gen_num`.
    fn encrypt_string(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>>;

    /// Encrypt the (already filter-encoded) payload of a stream.
    fn encrypt_stream(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        self.encrypt_string(data, obj_num, gen_num)
    }

    /// Transform an indirect object before it is written.
    ///
    /// The default walks the object and encrypts every string and stream
    /// payload; names, numbers and references are left alone.
    fn transform(&self, obj: &Object, obj_num: u32, gen_num: u16) -> Result<Object> {
        encrypt_object(self, obj, obj_num, gen_num)
    }
}
