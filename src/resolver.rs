//! Read access to a document's object graph.
//!
//! The import engine copies objects out of any document that can resolve its
//! own references. A PDF reader would implement this trait; [`PdfWriter`]
//! implements it as well, so object graphs can be moved between writers.
//!
//! [`PdfWriter`]: crate::writer::PdfWriter

use crate::error::Result;
use crate::object::{DocumentId, Object, ObjectRef};

const MAX_REFERENCE_CHAIN: usize = 64;

/// A document whose indirect references can be resolved.
pub trait ObjectResolver {
    /// Identity stamped on every reference this document hands out.
    fn document_id(&self) -> DocumentId;

    /// Resolve a reference owned by this document.
    ///
    /// Implementations must fail with [`Error::ForeignReference`] for
    /// references owned by another document.
    ///
    /// [`Error::ForeignReference`]: crate::error::Error::ForeignReference
    fn resolve(&self, obj_ref: &ObjectRef) -> Result<Object>;

    /// Reference to the document catalog.
    fn root_ref(&self) -> ObjectRef;

    /// Follow a chain of references until a direct object is reached.
    fn resolve_deep(&self, obj: &Object) -> Result<Object> {
        let mut current = obj.clone();
        // Reference chains that loop resolve to null.
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(r) => current = self.resolve(&r)?,
                other => return Ok(other),
            }
        }
        Ok(Object::Null)
    }
}
