//! Gzip inflate stage.
//!
//! Ported from `storage/decorator.py::inflate`: wraps the raw object body,
//! transparently decompresses it if gzipped, and supports resuming from a
//! byte offset into the *decompressed* stream by discarding leading bytes
//! after decompression starts (gzip has no random access; this is the same
//! linear skip-forward `GzipFile.seek()` does in the original).
//!
//! Chunk offsets here are meaningless placeholders — the real byte
//! accounting happens in [`crate::pipeline::by_lines`], same as upstream.

use std::io::Read;

use flate2::read::MultiGzDecoder;

use crate::error::DecodeError;

/// Decompressed (or passed-through) chunks, fixed at 64 KiB like the
/// original's `CHUNK_SIZE`.
const CHUNK_SIZE: usize = 64 * 1024;

pub struct Inflate<R> {
    reader: Box<dyn Read + Send>,
    done: bool,
    _marker: std::marker::PhantomData<R>,
}

impl<R: Read + Send + 'static> Inflate<R> {
    /// `range_start` is a byte offset into the *decompressed* stream. For a
    /// gzipped body this is achieved by decompressing and discarding bytes
    /// up to that point before the first real chunk is yielded; for a plain
    /// body the caller is expected to have already positioned `body`
    /// correctly (e.g. via an HTTP range request), matching the Python
    /// source, which treats `range_start` purely as the gzip-seek target.
    pub fn new(body: R, is_gzipped: bool, range_start: u64) -> Result<Self, DecodeError> {
        let mut reader: Box<dyn Read + Send> = if is_gzipped {
            Box::new(MultiGzDecoder::new(body))
        } else {
            Box::new(body)
        };

        if is_gzipped && range_start > 0 {
            discard(&mut reader, range_start)?;
        }

        Ok(Self {
            reader,
            done: false,
            _marker: std::marker::PhantomData,
        })
    }
}

fn discard(reader: &mut Box<dyn Read + Send>, mut remaining: u64) -> Result<(), DecodeError> {
    let mut sink = [0u8; CHUNK_SIZE];
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = reader.read(&mut sink[..want])?;
        if n == 0 {
            break;
        }
        remaining -= n as u64;
    }
    Ok(())
}

impl<R: Read + Send + 'static> Iterator for Inflate<R> {
    type Item = Result<Vec<u8>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; CHUNK_SIZE];
        match self.reader.read(&mut buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(DecodeError::Gzip(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn passthrough_for_non_gzipped_body() {
        let data = b"plain text, not gzipped".to_vec();
        let chunks: Vec<u8> = Inflate::new(Cursor::new(data.clone()), false, 0)
            .unwrap()
            .flat_map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks, data);
    }

    #[test]
    fn decompresses_gzipped_body() {
        let data = b"hello world, this will be gzipped".to_vec();
        let compressed = gzip(&data);
        let chunks: Vec<u8> = Inflate::new(Cursor::new(compressed), true, 0)
            .unwrap()
            .flat_map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks, data);
    }

    #[test]
    fn resumes_gzipped_body_from_offset() {
        let data = b"0123456789abcdefghijklmnopqrstuvwxyz".to_vec();
        let compressed = gzip(&data);
        let chunks: Vec<u8> = Inflate::new(Cursor::new(compressed), true, 10)
            .unwrap()
            .flat_map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks, data[10..]);
    }

    #[test]
    fn large_body_splits_into_chunk_size_pieces() {
        let data = vec![b'x'; CHUNK_SIZE * 2 + 10];
        let compressed = gzip(&data);
        let sizes: Vec<usize> = Inflate::new(Cursor::new(compressed), true, 0)
            .unwrap()
            .map(|c| c.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![CHUNK_SIZE, CHUNK_SIZE, 10]);
    }
}
