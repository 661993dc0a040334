//! PDF object types.
//!
//! The value model handled by the writer: a closed set of PDF object variants.
//! Dictionaries keep insertion order so that output is byte-for-byte
//! reproducible. Indirect references carry the identity of the document that
//! owns them, which is what lets a writer tell its own references apart from
//! foreign ones during import.

use crate::decoders;
use crate::error::{Error, Result};
use bytes::Bytes;
use indexmap::IndexMap;

/// Ordered PDF dictionary (keys are names without the leading `/`).
pub type Dict = IndexMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dict),
    /// Stream (dictionary + encoded data)
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Stream data, encoded according to `/Filter`
        data: Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Identity of the document (writer or reader) that owns a set of objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(uuid::Uuid);

impl DocumentId {
    /// Create a fresh, globally unique document identity.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
    /// Document the object number belongs to
    pub doc: DocumentId,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16, doc: DocumentId) -> Self {
        Self { id, gen, doc }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Build a stream object from a dictionary and unencoded data.
    pub fn stream(dict: Dict, data: impl Into<Bytes>) -> Self {
        Object::Stream {
            dict,
            data: data.into(),
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Mutable variant of [`Object::as_dict`].
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Mutable variant of [`Object::as_array`].
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Look up a key in a dictionary or stream dictionary.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Encoded stream payload, exactly as it will be written.
    pub fn encoded_data(&self) -> Option<&Bytes> {
        match self {
            Object::Stream { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Decode stream data using the filters listed in the stream dictionary.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let filters = dict
                    .get("Filter")
                    .map(extract_filter_names)
                    .unwrap_or_default();
                decoders::decode_stream(data, &filters)
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }

    /// Apply FlateDecode on top of whatever encoding the stream already has.
    ///
    /// The new filter is prepended to `/Filter` since it is the outermost
    /// encoding now; an existing `/DecodeParms` array gets a matching `null`.
    pub fn compress(&mut self) -> Result<()> {
        let (dict, data) = match self {
            Object::Stream { dict, data } => (dict, data),
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };

        let compressed = decoders::flate_encode(data)?;
        let flate = Object::Name("FlateDecode".to_string());
        let filter = match dict.shift_remove("Filter") {
            None => flate,
            Some(Object::Array(mut existing)) => {
                existing.insert(0, flate);
                Object::Array(existing)
            },
            Some(existing) => Object::Array(vec![flate, existing]),
        };
        dict.insert("Filter".to_string(), filter);

        if let Some(params) = dict.get_mut("DecodeParms") {
            let previous = std::mem::replace(params, Object::Null);
            *params = match previous {
                Object::Array(mut existing) => {
                    existing.insert(0, Object::Null);
                    Object::Array(existing)
                },
                single => Object::Array(vec![Object::Null, single]),
            };
        }

        log::trace!("Compressed stream: {} -> {} bytes", data.len(), compressed.len());
        *data = Bytes::from(compressed);
        Ok(())
    }
}

/// Extract filter names from a Filter object.
///
/// The Filter entry can be either a single Name or an Array of Names.
fn extract_filter_names(filter_obj: &Object) -> Vec<String> {
    match filter_obj {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    }
}
