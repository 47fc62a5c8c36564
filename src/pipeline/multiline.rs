//! Multiline grouper (`multi_line`).
//!
//! The grouping *algorithm* (pattern matching, start/end markers, timeouts)
//! is out of scope here — this module only defines the feed/drain/flush
//! protocol and the pass-through behavior when no processor is installed.
//! Ported from `storage/decorator.py::multi_line`.

use std::collections::VecDeque;

use crate::error::DecodeError;
use crate::record::{ByteStreamRecord, Newline};

/// Authoritative about byte spans, opaque about content: a processor
/// consumes line-level records and decides how many of them belong to one
/// logical group, but does not get to invent offsets — those are derived
/// by summing the consumed lines' lengths, same as the Python source's
/// `multiline_processor.collect()` contract.
pub trait MultilineProcessor: Send {
    /// Feed the next upstream line into the processor's internal state.
    fn feed(&mut self, payload: &[u8], newline: Newline);

    /// Drain any complete groups the processor has accumulated so far.
    /// Each group is `(payload, group_ending_length, newline)`: `payload` is
    /// the concatenation of every line's bytes (newlines re-inserted as they
    /// originally appeared), `group_ending_length` is the total number of
    /// raw upstream bytes (line content plus each line's own newline) that
    /// went into the group, and `newline` is the terminator of the group's
    /// last consumed line. `group_ending_length` is authoritative for
    /// offset accounting even when it does not equal `payload.len()` — a
    /// processor may consume more or fewer raw bytes than it re-emits.
    fn drain_ready(&mut self) -> Vec<(Vec<u8>, u64, Newline)>;

    /// Called once upstream is exhausted; flush whatever partial group
    /// remains.
    fn flush(&mut self) -> Vec<(Vec<u8>, u64, Newline)>;
}

pub struct MultiLine<S> {
    upstream: S,
    processor: Option<Box<dyn MultilineProcessor>>,
    ending_offset: u64,
    pending: VecDeque<(Vec<u8>, u64, Newline)>,
    upstream_done: bool,
}

impl<S> MultiLine<S>
where
    S: Iterator<Item = Result<ByteStreamRecord, DecodeError>>,
{
    pub fn new(upstream: S, processor: Option<Box<dyn MultilineProcessor>>, range_start: u64) -> Self {
        Self {
            upstream,
            processor,
            ending_offset: range_start,
            pending: VecDeque::new(),
            upstream_done: false,
        }
    }

    fn emit(&mut self, payload: Vec<u8>, group_ending_length: u64, newline: Newline) -> ByteStreamRecord {
        let starting_offset = self.ending_offset;
        self.ending_offset = starting_offset + group_ending_length;
        ByteStreamRecord::new(payload, starting_offset, self.ending_offset, newline)
    }
}

impl<S> Iterator for MultiLine<S>
where
    S: Iterator<Item = Result<ByteStreamRecord, DecodeError>>,
{
    type Item = Result<ByteStreamRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        // No processor installed: pure pass-through, upstream offsets are
        // already correct.
        if self.processor.is_none() {
            return self.upstream.next();
        }

        loop {
            if let Some((payload, group_ending_length, newline)) = self.pending.pop_front() {
                return Some(Ok(self.emit(payload, group_ending_length, newline)));
            }

            if self.upstream_done {
                let flushed = self.processor.as_mut().unwrap().flush();
                if flushed.is_empty() {
                    return None;
                }
                self.pending.extend(flushed);
                continue;
            }

            match self.upstream.next() {
                Some(Ok(record)) => {
                    let processor = self.processor.as_mut().unwrap();
                    processor.feed(&record.payload, record.newline);
                    let ready = processor.drain_ready();
                    self.pending.extend(ready);
                }
                Some(Err(e)) => return Some(Err(e)),
                None => self.upstream_done = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_record(payload: &str, newline: Newline) -> Result<ByteStreamRecord, DecodeError> {
        Ok(ByteStreamRecord::new(payload.as_bytes().to_vec(), 0, 0, newline))
    }

    #[test]
    fn passthrough_without_processor_keeps_upstream_records() {
        let upstream = vec![ok_record("a", Newline::Lf), ok_record("b", Newline::None)].into_iter();
        let out: Vec<_> = MultiLine::new(upstream, None, 0).map(|r| r.unwrap().payload).collect();
        assert_eq!(out, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    /// A trivial processor that groups every two lines into one, used only
    /// to exercise the feed/drain/flush protocol end to end. Tracks the raw
    /// bytes consumed separately from the re-emitted payload, since the two
    /// diverge whenever a separator's length doesn't match a dropped
    /// newline's.
    struct PairGrouper {
        held: Option<(Vec<u8>, Newline)>,
        held_raw_len: u64,
    }

    impl MultilineProcessor for PairGrouper {
        fn feed(&mut self, payload: &[u8], newline: Newline) {
            self.held_raw_len += payload.len() as u64 + newline.len() as u64;
            match self.held.take() {
                None => self.held = Some((payload.to_vec(), newline)),
                Some((mut first, _)) => {
                    first.extend_from_slice(b"\x1e");
                    first.extend_from_slice(payload);
                    self.held = Some((first, newline));
                }
            }
        }

        fn drain_ready(&mut self) -> Vec<(Vec<u8>, u64, Newline)> {
            Vec::new()
        }

        fn flush(&mut self) -> Vec<(Vec<u8>, u64, Newline)> {
            let raw_len = std::mem::take(&mut self.held_raw_len);
            self.held.take().into_iter().map(|(payload, newline)| (payload, raw_len, newline)).collect()
        }
    }

    #[test]
    fn processor_controls_grouping_and_offsets() {
        // "one" is terminated by a CRLF (2 raw bytes) but the grouper
        // joins it to "two" with a 1-byte separator, so the grouped
        // payload's own length (7) differs from the raw bytes actually
        // consumed (3+2 + 3+1 = 9). Offsets must follow the latter.
        let upstream = vec![
            ok_record("one", Newline::CrLf),
            ok_record("two", Newline::Lf),
            ok_record("three", Newline::None),
        ]
        .into_iter();
        let mut stage = MultiLine::new(upstream, Some(Box::new(PairGrouper { held: None, held_raw_len: 0 })), 0);
        let first = stage.next().unwrap().unwrap();
        assert_eq!(first.payload, b"one\x1etwo".to_vec());
        assert_eq!(first.payload.len(), 7);
        assert_eq!(first.starting_offset, 0);
        assert_eq!(first.ending_offset, 9);
        let second = stage.next().unwrap().unwrap();
        assert_eq!(second.payload, b"three".to_vec());
        assert_eq!(second.starting_offset, first.ending_offset);
        assert!(stage.next().is_none());
    }
}
