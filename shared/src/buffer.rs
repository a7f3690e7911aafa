//! # Serial Record Buffer
//!
//! The serial line delivers an unbounded byte stream in arbitrary chunks. The
//! [`RecordBuffer`] accumulates those chunks and hands out complete,
//! newline-terminated records, keeping the unterminated tail for the next
//! read.
//!
//! ```text
//!   read 1        read 2           read 3
//! ┌────────┐  ┌─────────────┐  ┌──────────┐
//! │ "1,2," │  │ "3\n4,5,6\n7"│  │ ",8,9\n" │
//! └────────┘  └─────────────┘  └──────────┘
//!      │             │               │
//!      ▼             ▼               ▼
//!   (none)     "1,2,3", "4,5,6"   "7,8,9"
//! ```
//!
//! Bytes are kept raw until a record is complete so that a multi-byte
//! character split across two reads decodes correctly.

use crate::protocol::{decode_text, Record, RECORD_TERMINATOR};

/// Accumulator for not-yet-terminated serial input
///
/// Owned by the serial reading loop only.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: Vec<u8>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Number of bytes waiting for a terminator
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return the oldest complete record, if any
    pub fn next_record(&mut self) -> Option<Record> {
        let end = self.pending.iter().position(|&b| b == RECORD_TERMINATOR)?;
        let record = Record::new(decode_text(&self.pending[..end]));
        self.pending.drain(..=end);
        Some(record)
    }

    /// Remove every complete record, oldest first
    pub fn drain_records(&mut self) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record() {
            records.push(record);
        }
        records
    }
}
