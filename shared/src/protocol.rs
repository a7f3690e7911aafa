//! # Record Format
//!
//! FlightGear's generic protocol and the cockpit firmware both exchange state
//! as plain text snapshots:
//!
//! ```text
//! ┌─────────┬───┬─────────┬───┬─────┬───┬─────────┬────┐
//! │ field 0 │ , │ field 1 │ , │ ... │ , │ field n │ \n │
//! └─────────┴───┴─────────┴───┴─────┴───┴─────────┴────┘
//! ```
//!
//! There is no escaping, length prefix, version tag or checksum. A field is
//! identified only by its position in the record.

use std::borrow::Cow;

/// Separator between the fields of a record
pub const FIELD_SEPARATOR: char = ',';

/// Terminator of a record on the serial line
pub const RECORD_TERMINATOR: u8 = b'\n';

/// One line of comma-separated field values, terminator stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: String,
}

impl Record {
    /// Create a record from a line that no longer carries its terminator
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }

    /// Decode a raw payload as a record
    ///
    /// Used for datagrams, which are compared as they arrive: a trailing
    /// terminator, if any, stays part of the last field.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(decode_text(bytes))
    }

    /// The record text
    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// Iterate over the fields, position 0 first
    ///
    /// An empty record yields a single empty field.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.line.split(FIELD_SEPARATOR)
    }
}

/// Decode bytes as text for comparison
///
/// The wire format is ASCII; anything else is replaced rather than rejected.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Last seen value for every field position of one direction
///
/// Positions are created on first sight and never removed: a record with
/// fewer fields leaves the higher positions untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldVector {
    values: Vec<String>,
}

impl FieldVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions observed so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value stored at `index`, if that position exists
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Make sure position `index` exists, filling new slots with empty values
    pub fn ensure_index(&mut self, index: usize) {
        if self.values.len() <= index {
            self.values.resize(index + 1, String::new());
        }
    }

    /// Create the positions of `fields` without storing their values
    pub fn prime<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        if let Some(last) = fields.into_iter().count().checked_sub(1) {
            self.ensure_index(last);
        }
    }

    /// Store every field that differs from the value at its position
    ///
    /// Returns `true` if at least one position changed.
    pub fn apply<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        let mut changed = false;
        for (index, field) in fields.into_iter().enumerate() {
            self.ensure_index(index);
            let slot = &mut self.values[index];
            if slot.as_str() != field {
                slot.clear();
                slot.push_str(field);
                changed = true;
            }
        }
        changed
    }

    /// Encode every stored position as one terminated record
    pub fn encode_record(&self) -> Vec<u8> {
        let mut separator = [0u8; 4];
        let mut line = self.values.join(&*FIELD_SEPARATOR.encode_utf8(&mut separator));
        line.push(RECORD_TERMINATOR as char);
        line.into_bytes()
    }

    /// Length `encode_record` would return once `fields` were applied
    ///
    /// Every field of `fields` counts at its own length, changed or not, so
    /// the result is an upper bound for the vector after `apply`.
    pub fn encoded_len_with(&self, fields: &[&str]) -> usize {
        let positions = self.values.len().max(fields.len());
        let text: usize = (0..positions)
            .map(|index| match fields.get(index) {
                Some(field) => field.len(),
                None => self.values[index].len(),
            })
            .sum();
        text + positions.saturating_sub(1) * FIELD_SEPARATOR.len_utf8() + 1
    }
}
