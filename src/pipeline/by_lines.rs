//! Line splitter (`by_lines`).
//!
//! Ported from `storage/decorator.py::by_lines`, but re-derives the newline
//! terminator **per line** instead of once per upstream chunk: the original
//! Python picks a single newline style for an entire chunk (whichever of
//! `\r\n`/`\n` appears anywhere in the buffered bytes) and applies it to
//! every line yielded from that chunk, which produces wrong offsets for
//! mixed-newline input within one chunk (e.g. `b"a\nbb\r\nccc"` must yield
//! a `\n`-terminated line followed by a `\r\n`-terminated one). Detecting
//! the terminator at each newline position instead keeps the
//! offset-accounting invariant exact in every case.

use crate::error::DecodeError;
use crate::record::{ByteStreamRecord, Newline};

/// Scan `buf` for complete lines. Returns the parsed lines (payload minus
/// terminator, plus which terminator it was) and the unconsumed remainder
/// (bytes after the last terminator found, if any).
fn scan_lines(buf: &[u8]) -> (Vec<(Vec<u8>, Newline)>, Vec<u8>) {
    let mut lines = Vec::new();
    let mut pos = 0usize;

    loop {
        match buf[pos..].iter().position(|&b| b == b'\n') {
            None => break,
            Some(rel) => {
                let nl_pos = pos + rel;
                let (line_end, newline) = if nl_pos > pos && buf[nl_pos - 1] == b'\r' {
                    (nl_pos - 1, Newline::CrLf)
                } else {
                    (nl_pos, Newline::Lf)
                };
                lines.push((buf[pos..line_end].to_vec(), newline));
                pos = nl_pos + 1;
            }
        }
    }

    (lines, buf[pos..].to_vec())
}

/// Run `by_lines` to completion over a single in-memory buffer, including
/// the end-of-stream flush of any trailing partial line. Used both as the
/// standalone stage (incrementally, see [`ByLines`]) and by the JSON
/// collector's fallback, which always has the whole buffer at once.
pub fn split_complete(buf: &[u8]) -> Vec<(Vec<u8>, Newline)> {
    let (mut lines, remainder) = scan_lines(buf);
    if !remainder.is_empty() {
        lines.push((remainder, Newline::None));
    }
    lines
}

/// Incremental line splitter over a chunk stream, maintaining a rolling
/// buffer across `next()` calls and exact offset bookkeeping.
pub struct ByLines<S> {
    upstream: S,
    buffer: Vec<u8>,
    ending_offset: u64,
    pending: std::collections::VecDeque<(Vec<u8>, Newline)>,
    upstream_done: bool,
}

impl<S> ByLines<S>
where
    S: Iterator<Item = Result<Vec<u8>, DecodeError>>,
{
    pub fn new(upstream: S, range_start: u64) -> Self {
        Self {
            upstream,
            buffer: Vec::new(),
            ending_offset: range_start,
            pending: std::collections::VecDeque::new(),
            upstream_done: false,
        }
    }

    fn emit(&mut self, payload: Vec<u8>, newline: Newline) -> ByteStreamRecord {
        let starting_offset = self.ending_offset;
        self.ending_offset = starting_offset + payload.len() as u64 + newline.len() as u64;
        ByteStreamRecord::new(payload, starting_offset, self.ending_offset, newline)
    }
}

impl<S> Iterator for ByLines<S>
where
    S: Iterator<Item = Result<Vec<u8>, DecodeError>>,
{
    type Item = Result<ByteStreamRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((payload, newline)) = self.pending.pop_front() {
                return Some(Ok(self.emit(payload, newline)));
            }

            if self.upstream_done {
                if !self.buffer.is_empty() {
                    let remainder = std::mem::take(&mut self.buffer);
                    return Some(Ok(self.emit(remainder, Newline::None)));
                }
                return None;
            }

            match self.upstream.next() {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                    let (lines, remainder) = scan_lines(&self.buffer);
                    self.buffer = remainder;
                    self.pending.extend(lines);
                }
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.upstream_done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn chunks(data: &[&[u8]]) -> impl Iterator<Item = Result<Vec<u8>, DecodeError>> {
        data.iter().map(|d| Ok(d.to_vec())).collect::<Vec<_>>().into_iter()
    }

    fn records(it: impl Iterator<Item = Result<ByteStreamRecord, DecodeError>>) -> Vec<(String, u64, u64, Newline)> {
        it.map(|r| {
            let r = r.unwrap();
            (
                String::from_utf8(r.payload).unwrap(),
                r.starting_offset,
                r.ending_offset,
                r.newline,
            )
        })
        .collect()
    }

    #[test]
    fn boundary_scenario_1_mixed_newlines() {
        let upstream = chunks(&[b"a\nbb\r\nccc"]);
        let out = records(ByLines::new(upstream, 0));
        assert_eq!(
            out,
            vec![
                ("a".to_string(), 0, 2, Newline::Lf),
                ("bb".to_string(), 2, 6, Newline::CrLf),
                ("ccc".to_string(), 6, 9, Newline::None),
            ]
        );
    }

    #[test]
    fn splits_across_chunk_boundaries() {
        let upstream = chunks(&[b"hel", b"lo\nwor", b"ld\n"]);
        let out = records(ByLines::new(upstream, 0));
        assert_eq!(
            out,
            vec![
                ("hello".to_string(), 0, 6, Newline::Lf),
                ("world".to_string(), 6, 10, Newline::Lf),
            ]
        );
    }

    #[test]
    fn cr_only_is_not_a_line_terminator() {
        let upstream = chunks(&[b"a\rb\n"]);
        let out = records(ByLines::new(upstream, 0));
        assert_eq!(out, vec![("a\rb".to_string(), 0, 4, Newline::Lf)]);
    }

    #[test]
    fn no_trailing_empty_line_after_final_newline() {
        let upstream = chunks(&[b"only\n"]);
        let out = records(ByLines::new(upstream, 0));
        assert_eq!(out, vec![("only".to_string(), 0, 5, Newline::Lf)]);
    }

    #[test]
    fn resumes_from_range_start() {
        let upstream = chunks(&[b"tail\n"]);
        let out = records(ByLines::new(upstream, 100));
        assert_eq!(out, vec![("tail".to_string(), 100, 105, Newline::Lf)]);
    }

    #[test]
    fn offsets_sum_to_stream_length() {
        let data: &[u8] = b"one\ntwo\r\nthree\nfour";
        let upstream = chunks(&[data]);
        let out: Vec<_> = ByLines::new(upstream, 0).map(|r| r.unwrap()).collect();
        let total: u64 = out
            .iter()
            .map(|r| (r.payload.len() + r.newline.len()) as u64)
            .sum();
        assert_eq!(total, data.len() as u64);
        for w in out.windows(2) {
            assert!(w[0].ending_offset <= w[1].starting_offset + 1);
            assert_eq!(w[0].ending_offset, w[1].starting_offset);
        }
    }
}
