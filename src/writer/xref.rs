//! Cross-reference section encoding.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.5.4 (cross-reference table) and
//! Section 7.5.8 (cross-reference streams).
//!
//! Both encodings are driven by the same [`PositionMap`] and split it into the
//! same subsections: maximal runs of consecutive object numbers in ascending
//! order. Object 0 is always written as the head of the free list.

use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::Write;

/// Classic xref entry for object 0, the head of the free list.
const FREE_LIST_HEAD: &[u8] = b"0000000000 65535 f \n";

/// Field widths of a cross-reference stream entry: type, field 2, field 3.
pub const XREF_STREAM_WIDTHS: [i64; 3] = [1, 8, 2];

/// Where an object ended up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefPosition {
    /// Byte offset of a directly written object
    Offset(u64),
    /// Object stored inside an object stream
    InStream {
        /// Object number of the containing object stream
        stream_id: u32,
        /// Index of the object within the stream
        index: u16,
    },
}

/// Object number → (generation, position) for one write pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionMap {
    entries: BTreeMap<u32, (u16, XrefPosition)>,
}

/// A run of consecutive object numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Subsection {
    /// First object number in the run
    pub first_id: u32,
    /// `(position, generation)` for each object in the run
    pub entries: Vec<(XrefPosition, u16)>,
}

impl PositionMap {
    /// Create an empty position map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the position of object `id`.
    pub fn insert(&mut self, id: u32, gen: u16, position: XrefPosition) {
        self.entries.insert(id, (gen, position));
    }

    /// Look up the position of object `id`.
    pub fn get(&self, id: u32) -> Option<(u16, XrefPosition)> {
        self.entries.get(&id).copied()
    }

    /// Number of recorded objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest recorded object number.
    pub fn max_id(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    /// Split the map into runs of consecutive object numbers.
    pub fn subsections(&self) -> Vec<Subsection> {
        let mut subsections: Vec<Subsection> = Vec::new();
        let mut previous: Option<u32> = None;
        for (&id, &(gen, position)) in &self.entries {
            let extends_run = previous.and_then(|prev| prev.checked_add(1)) == Some(id);
            previous = Some(id);
            match subsections.last_mut() {
                Some(current) if extends_run => current.entries.push((position, gen)),
                _ => subsections.push(Subsection {
                    first_id: id,
                    entries: vec![(position, gen)],
                }),
            }
        }
        subsections
    }
}

/// Write a classic `xref` table.
///
/// The free-list head for object 0 is merged into the first subsection when
/// that subsection starts at object 1, and gets a `0 1` subsection of its own
/// otherwise.
pub fn write_xref_table<W: Write>(w: &mut W, positions: &PositionMap) -> Result<()> {
    w.write_all(b"xref\n")?;
    let mut subsections = positions.subsections().into_iter();

    match subsections.next() {
        Some(first) if first.first_id == 1 => {
            writeln!(w, "0 {}", first.entries.len() + 1)?;
            w.write_all(FREE_LIST_HEAD)?;
            write_table_entries(w, &first.entries)?;
        },
        Some(first) => {
            w.write_all(b"0 1\n")?;
            w.write_all(FREE_LIST_HEAD)?;
            writeln!(w, "{} {}", first.first_id, first.entries.len())?;
            write_table_entries(w, &first.entries)?;
        },
        None => {
            w.write_all(b"0 1\n")?;
            w.write_all(FREE_LIST_HEAD)?;
        },
    }

    for subsection in subsections {
        writeln!(w, "{} {}", subsection.first_id, subsection.entries.len())?;
        write_table_entries(w, &subsection.entries)?;
    }
    Ok(())
}

fn write_table_entries<W: Write>(w: &mut W, entries: &[(XrefPosition, u16)]) -> Result<()> {
    for (position, gen) in entries {
        match position {
            XrefPosition::Offset(offset) => write!(w, "{:010} {:05} n \n", offset, gen)?,
            XrefPosition::InStream { .. } => return Err(Error::ObjectStreamsRequireXrefStream),
        }
    }
    Ok(())
}

/// A cross-reference stream (`/Type /XRef`) under construction.
///
/// Holds the trailer entries that go into the stream dictionary. The caller
/// must record the stream's own position in the map before calling
/// [`XRefStream::encode`], since the stream indexes itself.
#[derive(Debug, Clone)]
pub struct XRefStream {
    dict: Dict,
    compress: bool,
}

impl XRefStream {
    /// Create a cross-reference stream dictionary skeleton.
    pub fn new(compress: bool) -> Self {
        let dict = ObjectSerializer::dict_entries(vec![
            ("Type", ObjectSerializer::name("XRef")),
            (
                "W",
                Object::Array(XREF_STREAM_WIDTHS.iter().map(|w| Object::Integer(*w)).collect()),
            ),
        ]);
        Self { dict, compress }
    }

    /// The stream dictionary; trailer entries are added here.
    pub fn dict_mut(&mut self) -> &mut Dict {
        &mut self.dict
    }

    /// Encode the position map into a finished stream object.
    pub fn encode(&self, positions: &PositionMap) -> Result<Object> {
        let mut index = vec![Object::Integer(0), Object::Integer(1)];
        let mut data = Vec::with_capacity((positions.len() + 1) * 11);
        // object 0: free, next free object 0, generation 65535
        data.write_u8(0)?;
        data.write_u64::<BigEndian>(0)?;
        data.write_u16::<BigEndian>(0xFFFF)?;

        for subsection in positions.subsections() {
            index.push(Object::Integer(subsection.first_id as i64));
            index.push(Object::Integer(subsection.entries.len() as i64));
            for (position, gen) in subsection.entries {
                match position {
                    XrefPosition::Offset(offset) => {
                        data.write_u8(1)?;
                        data.write_u64::<BigEndian>(offset)?;
                        data.write_u16::<BigEndian>(gen)?;
                    },
                    XrefPosition::InStream { stream_id, index } => {
                        debug_assert_eq!(gen, 0);
                        data.write_u8(2)?;
                        data.write_u64::<BigEndian>(stream_id as u64)?;
                        data.write_u16::<BigEndian>(index)?;
                    },
                }
            }
        }

        let mut dict = self.dict.clone();
        dict.insert("Index".to_string(), Object::Array(index));
        let mut stream = Object::stream(dict, data);
        if self.compress {
            stream.compress()?;
        }
        Ok(stream)
    }
}
