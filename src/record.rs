//! `ByteStreamRecord` — the unit every decoding stage consumes and produces.
//!
//! Ported from the `(data, starting_offset, ending_offset, newline,
//! expanded_index)` tuples yielded throughout `storage/decorator.py`.

/// Line terminator a record was split on. Kept as an explicit enum (rather
/// than raw bytes) because the newline choice also has to be re-emitted
/// downstream byte-for-byte — see `by_lines` and the JSON collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    None,
    Lf,
    CrLf,
}

impl Newline {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Newline::None => b"",
            Newline::Lf => b"\n",
            Newline::CrLf => b"\r\n",
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Newline::None)
    }
}

/// One decoded logical record flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStreamRecord {
    pub payload: Vec<u8>,
    pub starting_offset: u64,
    pub ending_offset: u64,
    pub newline: Newline,
    /// Ordinal within an exploded array field, when the event-list expander
    /// produced this record from one element of a JSON array.
    pub expanded_index: Option<usize>,
}

impl ByteStreamRecord {
    pub fn new(
        payload: Vec<u8>,
        starting_offset: u64,
        ending_offset: u64,
        newline: Newline,
    ) -> Self {
        Self {
            payload,
            starting_offset,
            ending_offset,
            newline,
            expanded_index: None,
        }
    }

    pub fn with_expanded_index(mut self, index: usize) -> Self {
        self.expanded_index = Some(index);
        self
    }

    pub fn payload_as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }
}
