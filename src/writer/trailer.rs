//! Trailer entries and file identifiers.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.5.5 (file trailer) and
//! Section 14.4 (file identifiers).

use crate::object::{Dict, Object, ObjectRef};
use md5::{Digest, Md5};

/// The `/ID` pair: permanent identifier and changing identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdPair {
    /// Permanent identifier, fixed at creation
    pub permanent: Vec<u8>,
    /// Identifier of this particular revision
    pub changing: Vec<u8>,
}

impl DocumentIdPair {
    /// Wrap an existing identifier pair.
    pub fn new(permanent: Vec<u8>, changing: Vec<u8>) -> Self {
        Self {
            permanent,
            changing,
        }
    }

    /// Generate a fresh pair of 16-byte identifiers.
    pub fn generate() -> Self {
        Self {
            permanent: random_identifier(),
            changing: random_identifier(),
        }
    }

    /// The `/ID` array as written into the trailer.
    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::String(self.permanent.clone()),
            Object::String(self.changing.clone()),
        ])
    }
}

/// MD5 over a random UUID and the current time.
fn random_identifier() -> Vec<u8> {
    let uuid = uuid::Uuid::new_v4();
    let mut hasher = Md5::new();
    hasher.update(uuid.as_bytes());

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    hasher.update(now.as_nanos().to_le_bytes());

    hasher.finalize().to_vec()
}

/// References and identifiers carried by the trailer.
#[derive(Debug, Clone)]
pub struct Trailer {
    /// Document catalog
    pub root: ObjectRef,
    /// Document information dictionary
    pub info: Option<ObjectRef>,
    /// Encryption dictionary
    pub encrypt: Option<ObjectRef>,
    /// File identifiers
    pub id: DocumentIdPair,
}

impl Trailer {
    /// Add `/Root`, `/Info`, `/Encrypt` and `/ID` to a trailer dictionary
    /// (or to the dictionary of a cross-reference stream).
    pub fn populate(&self, dict: &mut Dict) {
        dict.insert("Root".to_string(), Object::Reference(self.root));
        if let Some(info) = self.info {
            dict.insert("Info".to_string(), Object::Reference(info));
        }
        if let Some(encrypt) = self.encrypt {
            dict.insert("Encrypt".to_string(), Object::Reference(encrypt));
        }
        dict.insert("ID".to_string(), self.id.to_object());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::DocumentId;

    #[test]
    fn test_generated_ids_differ() {
        let pair = DocumentIdPair::generate();
        assert_eq!(pair.permanent.len(), 16);
        assert_eq!(pair.changing.len(), 16);
        assert_ne!(pair.permanent, pair.changing);
    }

    #[test]
    fn test_populate_optional_entries() {
        let doc = DocumentId::new();
        let trailer = Trailer {
            root: ObjectRef::new(1, 0, doc),
            info: None,
            encrypt: Some(ObjectRef::new(4, 0, doc)),
            id: DocumentIdPair::new(vec![1], vec![2]),
        };
        let mut dict = Dict::new();
        trailer.populate(&mut dict);

        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Root", "Encrypt", "ID"]);
        assert_eq!(
            dict["ID"],
            Object::Array(vec![Object::String(vec![1]), Object::String(vec![2])])
        );
    }
}
