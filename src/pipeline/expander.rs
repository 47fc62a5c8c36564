//! Event-list expander — an injected capability that explodes a JSON array
//! field of an already-collected object into one sub-record per element.
//! The field to explode and how to rebuild an element's bytes is
//! caller-specific, so this stays a trait rather than a fixed
//! implementation, same as [`crate::pipeline::json_parser::JsonParser`].

use crate::record::Newline;

/// One element pulled out of the exploded array field, ready to be wrapped
/// into a [`crate::record::ByteStreamRecord`] by the JSON collector.
/// `starting_offset`/`ending_offset` are this element's own sub-span within
/// the parent object's offset range — distinct per element, not the
/// parent's span repeated, since the document `_id` is derived from offset
/// and two elements sharing one offset would collide.
pub struct ExpandedElement {
    pub payload: Vec<u8>,
    pub starting_offset: u64,
    pub ending_offset: u64,
    pub index: usize,
}

pub trait EventListExpander: Send + Sync {
    /// `payload` is the full collected JSON object's bytes (pre-trim, as
    /// produced by the collector); `parsed` is the same object already
    /// decoded; `starting_offset`/`ending_offset` are the parent object's
    /// own span, to be divided up across the returned elements. Returns
    /// `None` when the configured field is absent (the object passes
    /// through as a single record), `Some(elements)` otherwise — including
    /// `Some(vec![])` if the field is present but empty, which yields zero
    /// records for that object.
    fn expand(
        &self,
        payload: &[u8],
        parsed: &serde_json::Value,
        starting_offset: u64,
        ending_offset: u64,
    ) -> Option<Vec<ExpandedElement>>;
}

/// Explodes a named top-level array field, re-serializing each element back
/// to its own JSON bytes. This is the common case: a collected object
/// wraps a batch of sub-events under one array field.
pub struct FieldExpander {
    pub field: String,
}

impl FieldExpander {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

impl EventListExpander for FieldExpander {
    fn expand(
        &self,
        _payload: &[u8],
        parsed: &serde_json::Value,
        starting_offset: u64,
        ending_offset: u64,
    ) -> Option<Vec<ExpandedElement>> {
        let array = parsed.get(&self.field)?.as_array()?;
        let serialized: Vec<Vec<u8>> =
            array.iter().map(|element| serde_json::to_vec(element).unwrap_or_default()).collect();

        // Divide the parent span proportionally by each element's
        // re-serialized byte length, so elements get distinct, non-
        // overlapping sub-offsets instead of all sharing the parent's span.
        let span = ending_offset.saturating_sub(starting_offset);
        let total_len: u64 = serialized.iter().map(|bytes| bytes.len() as u64).sum();
        let count = serialized.len();

        let mut cursor = starting_offset;
        let mut elements = Vec::with_capacity(count);
        for (index, payload) in serialized.into_iter().enumerate() {
            let sub_start = cursor;
            let sub_end = if index + 1 == count {
                ending_offset
            } else if total_len == 0 {
                (cursor + span / count as u64).min(ending_offset)
            } else {
                (cursor + span * payload.len() as u64 / total_len).min(ending_offset)
            };
            cursor = sub_end;
            elements.push(ExpandedElement {
                payload,
                starting_offset: sub_start,
                ending_offset: sub_end,
                index,
            });
        }
        Some(elements)
    }
}

/// The newline to stamp on every sub-record an expander produces — the
/// original attaches the *source* object's own newline to each exploded
/// element rather than inventing one.
pub fn expanded_newline(source_newline: Newline) -> Newline {
    source_newline
}
