//! JSON collector — reassembles (possibly pretty-printed, multi-line) JSON
//! objects out of a line stream, with a bounded-lookahead circuit breaker
//! that gives up and falls back to raw line passthrough when the input
//! turns out not to be JSON after all.
//!
//! Ported from `storage/decorator.py::json_collector`. The accumulating
//! cursor (`starting_offset`/`ending_offset` on [`CollectorState`]) is
//! independent of the upstream records' own offsets — it is re-derived
//! from scratch by summing consumed bytes, exactly like the Python
//! `_handle_offset` helper.

use std::collections::VecDeque;

use crate::error::DecodeError;
use crate::pipeline::by_lines;
use crate::pipeline::expander::EventListExpander;
use crate::pipeline::json_parser::JsonParser;
use crate::record::{ByteStreamRecord, Newline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonContentType {
    Disabled,
    Single,
    Ndjson,
}

struct CollectorState {
    buffer: Vec<u8>,
    has_object_start: bool,
    is_a_json_object: bool,
    circuit_broken: bool,
    circuit_breaker: i64,
    starting_offset: u64,
    ending_offset: u64,
}

impl CollectorState {
    fn new(range_start: u64) -> Self {
        Self {
            buffer: Vec::new(),
            has_object_start: false,
            is_a_json_object: false,
            circuit_broken: false,
            circuit_breaker: 0,
            starting_offset: range_start,
            ending_offset: range_start,
        }
    }

    fn handle_offset(&mut self, skew: u64) {
        self.starting_offset = self.ending_offset;
        self.ending_offset += skew;
    }
}

/// Circuit breaker threshold: after this many consecutive failed parse
/// attempts the collector gives up on the current run of "maybe-JSON"
/// input and falls back to raw lines.
const CIRCUIT_BREAKER_THRESHOLD: i64 = 1000;

/// Strip any number of leading/trailing `\r`/`\n` bytes — not a literal
/// prefix/suffix strip, a charset trim (matches the Python `.strip(b"\r\n")`
/// calls, which really do mean "any of these bytes").
fn trim_newline_chars(buf: &[u8]) -> Vec<u8> {
    let is_nl = |b: &u8| *b == b'\r' || *b == b'\n';
    let start = buf.iter().position(|b| !is_nl(b)).unwrap_or(buf.len());
    let end = buf.iter().rposition(|b| !is_nl(b)).map(|i| i + 1).unwrap_or(0);
    if start >= end {
        Vec::new()
    } else {
        buf[start..end].to_vec()
    }
}

enum CollectOutcome {
    None,
    Placeholder,
    Parsed(Vec<u8>, serde_json::Value),
}

pub struct JsonCollector<S> {
    upstream: S,
    content_type: JsonContentType,
    parser: Box<dyn JsonParser>,
    expander: Option<Box<dyn EventListExpander>>,
    state: CollectorState,
    pending: VecDeque<ByteStreamRecord>,
    upstream_done: bool,
    final_fallback_done: bool,
    single_mode_drained: bool,
}

impl<S> JsonCollector<S>
where
    S: Iterator<Item = Result<ByteStreamRecord, DecodeError>>,
{
    pub fn new(
        upstream: S,
        content_type: JsonContentType,
        parser: Box<dyn JsonParser>,
        expander: Option<Box<dyn EventListExpander>>,
        range_start: u64,
    ) -> Self {
        Self {
            upstream,
            content_type,
            parser,
            expander,
            state: CollectorState::new(range_start),
            pending: VecDeque::new(),
            upstream_done: false,
            final_fallback_done: false,
            single_mode_drained: false,
        }
    }

    /// `single` mode without a field expander is not streaming: the whole
    /// object spans the entire input, so every upstream line must be seen
    /// before anything can be yielded.
    fn uses_streaming_collector(&self) -> bool {
        !(self.content_type == JsonContentType::Single && self.expander.is_none())
    }

    fn push(&mut self, payload: Vec<u8>, newline: Newline) {
        self.pending.push_back(ByteStreamRecord::new(
            payload,
            self.state.starting_offset,
            self.state.ending_offset,
            newline,
        ));
    }

    fn push_expanded(
        &mut self,
        payload: Vec<u8>,
        newline: Newline,
        starting_offset: u64,
        ending_offset: u64,
        index: usize,
    ) {
        self.pending.push_back(
            ByteStreamRecord::new(payload, starting_offset, ending_offset, newline).with_expanded_index(index),
        );
    }

    fn try_collect(&mut self, data: &[u8], newline: Newline) -> CollectOutcome {
        self.state.buffer.extend_from_slice(data);
        self.state.buffer.extend_from_slice(newline.as_bytes());

        match self.parser.parse(&self.state.buffer) {
            Ok(value) => {
                let raw = std::mem::take(&mut self.state.buffer);
                let skew = raw.len() as u64;
                self.state.handle_offset(skew);

                let newline_count = raw.iter().filter(|&&b| b == b'\n').count() as i64;
                self.state.circuit_breaker -= if newline_count > 0 { newline_count - 1 } else { 1 };

                let trimmed = trim_newline_chars(&raw);
                self.state.is_a_json_object = true;
                CollectOutcome::Parsed(trimmed, value)
            }
            Err(_) => {
                if self.state.is_a_json_object && trim_newline_chars(&self.state.buffer).is_empty() {
                    let skew = newline.len() as u64;
                    self.state.handle_offset(skew);
                    self.state.buffer.clear();
                    CollectOutcome::Placeholder
                } else {
                    self.state.circuit_breaker += 1;
                    if self.state.circuit_breaker > CIRCUIT_BREAKER_THRESHOLD {
                        self.state.circuit_broken = true;
                    }
                    CollectOutcome::None
                }
            }
        }
    }

    /// Re-runs the buffered, not-actually-JSON bytes through the plain line
    /// splitter and re-arms the collector for another attempt, same as
    /// `_by_lines_fallback` in the Python source.
    fn drain_fallback(&mut self) {
        let buffer = std::mem::take(&mut self.state.buffer);
        for (payload, newline) in by_lines::split_complete(&buffer) {
            let skew = payload.len() as u64 + newline.len() as u64;
            self.state.handle_offset(skew);
            self.push(payload, newline);
        }
        self.state.has_object_start = false;
        self.state.circuit_broken = false;
        self.state.circuit_breaker = 0;
    }

    fn process_record(&mut self, record: ByteStreamRecord) -> Result<(), DecodeError> {
        let ByteStreamRecord { payload, newline, .. } = record;

        if !self.state.has_object_start {
            let trimmed_start = payload.iter().position(|&b| b != b' ' && b != b'\t');
            let starts_with_brace = matches!(trimmed_start, Some(i) if payload[i] == b'{');
            if starts_with_brace {
                self.state.has_object_start = true;
            }
            if !self.state.has_object_start {
                let skew = payload.len() as u64 + newline.len() as u64;
                self.state.handle_offset(skew);
                self.push(payload, newline);
                return Ok(());
            }
        }

        match self.try_collect(&payload, newline) {
            CollectOutcome::None => {}
            CollectOutcome::Placeholder => self.push(Vec::new(), newline),
            CollectOutcome::Parsed(trimmed, value) => {
                if let Some(expander) = &self.expander {
                    let span = (self.state.starting_offset, self.state.ending_offset);
                    if let Some(elements) = expander.expand(&trimmed, &value, span.0, span.1) {
                        for element in elements {
                            self.push_expanded(
                                element.payload,
                                newline,
                                element.starting_offset,
                                element.ending_offset,
                                element.index,
                            );
                        }
                    } else {
                        self.push(trimmed, newline);
                    }
                } else {
                    self.push(trimmed, newline);
                }
            }
        }

        if self.state.circuit_broken {
            self.drain_fallback();
        }

        Ok(())
    }

    fn drain_single_mode(&mut self) -> Option<ByteStreamRecord> {
        self.single_mode_drained = true;
        let mut lines = Vec::new();
        loop {
            match self.upstream.next() {
                Some(Ok(record)) => lines.push(record),
                Some(Err(e)) => {
                    self.pending.clear();
                    tracing::error!(error = %e, "json collector: upstream error while draining single-document mode");
                    return None;
                }
                None => break,
            }
        }
        if lines.is_empty() {
            return None;
        }
        let newline = lines[0].newline;
        let starting_offset = lines[0].starting_offset;
        let ending_offset = lines.last().unwrap().ending_offset;
        let mut payload = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                payload.extend_from_slice(newline.as_bytes());
            }
            payload.extend_from_slice(&line.payload);
        }
        Some(ByteStreamRecord::new(payload, starting_offset, ending_offset, newline))
    }
}

impl<S> Iterator for JsonCollector<S>
where
    S: Iterator<Item = Result<ByteStreamRecord, DecodeError>>,
{
    type Item = Result<ByteStreamRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.content_type == JsonContentType::Disabled {
            return self.upstream.next();
        }

        if !self.uses_streaming_collector() {
            if self.single_mode_drained {
                return None;
            }
            return self.drain_single_mode().map(Ok);
        }

        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }

            if self.upstream_done {
                if !self.final_fallback_done {
                    self.final_fallback_done = true;
                    if !self.state.is_a_json_object {
                        self.drain_fallback();
                        continue;
                    }
                }
                return None;
            }

            match self.upstream.next() {
                Some(Ok(record)) => {
                    if let Err(e) = self.process_record(record) {
                        return Some(Err(e));
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => self.upstream_done = true,
            }
        }
    }
}
