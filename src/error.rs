//! Error types for the PDF writer.
//!
//! Every failure in this crate is a usage or I/O error surfaced synchronously to
//! the caller. Nothing is retried; a failed write pass must be started over.

use crate::object::ObjectRef;

/// Result type alias for writer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while assembling or writing a PDF.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Object streams (or an in-stream xref entry) used while writing a classic xref table
    #[error("Object streams require xref streams to be enabled")]
    ObjectStreamsRequireXrefStream,

    /// Manual object number that was never handed out by `allocate_placeholder()`
    #[error(
        "Object number {0} was not allocated as a placeholder; manually specifying an object \
         number is only allowed for placeholders"
    )]
    PlaceholderNotAllocated(u32),

    /// A placeholder was still pending when the document was written
    #[error("Placeholder for object {0} was never populated")]
    UnpopulatedPlaceholder(u32),

    /// Object stream handle that was not produced by this writer
    #[error("Object stream #{0} is unknown to this PDF writer")]
    UnknownObjectStream(usize),

    /// Object stream that has already been flushed to output
    #[error("Object stream #{0} has already been written and cannot accept new objects")]
    ObjectStreamSealed(usize),

    /// Stream objects and bare references cannot live inside an object stream
    #[error("{0} objects cannot be embedded into object streams")]
    ObjectStreamForbidden(&'static str),

    /// Reference owned by a different document
    #[error("Reference {0} has no relation to this PDF writer")]
    ForeignReference(ObjectRef),

    /// Referenced object does not exist
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Page tree is missing a required entry or is otherwise malformed
    #[error("Invalid page tree: {0}")]
    InvalidPageTree(String),

    /// Object handed to `insert_page` is not a `/Type /Page` dictionary
    #[error("Not a page object")]
    NotAPage,

    /// Page handed to `insert_page` already declares a `/Parent`
    #[error("/Parent must not be set on a page that is being inserted")]
    ParentAlreadySet,

    /// Page index past the end of the page tree
    #[error("Page index {index} out of range (document has {count} pages)")]
    PageIndexOutOfRange {
        /// Requested page index
        index: usize,
        /// Number of pages in the tree
        count: usize,
    },

    /// Invalid argument passed to a builder
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream encoding/decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Failure reported by a security handler
    #[error("Encryption error: {0}")]
    Encryption(String),
}
