//! Stream filters used by the writer.
//!
//! Only FlateDecode is needed on the write side: object streams and xref
//! streams are compressed with it, and imported page content is inflated with
//! it when filters are not inherited. Decoding data under any other filter
//! fails with [`Error::UnsupportedFilter`]; streams that are copied or written
//! without being decoded are not affected.

use crate::error::{Error, Result};

mod flate;

pub use flate::{flate_encode, FlateDecoder};

/// Trait for PDF stream decoders.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Decode stream data using a filter pipeline.
///
/// Filters are applied in the order they are listed in `/Filter`.
pub fn decode_stream(data: &[u8], filters: &[String]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for filter_name in filters {
        let decoder: Box<dyn StreamDecoder> = match filter_name.as_str() {
            "FlateDecode" | "Fl" => Box::new(FlateDecoder),
            _ => return Err(Error::UnsupportedFilter(filter_name.clone())),
        };
        current = decoder.decode(&current)?;
        log::trace!("{} produced {} bytes", decoder.name(), current.len());
    }

    Ok(current)
}
