//! Storage Reader — the external contract an object-storage connector
//! (S3, in practice) must satisfy to feed the decoding stack. Fetching
//! bytes from the actual cloud SDK is out of scope; this module only
//! defines the contract and provides a concrete, file/byte-backed
//! implementation used by the CLI and the test suite.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};

use crate::error::DecodeError;
use crate::pipeline::{self, DecodeCapabilities};
use crate::record::ByteStreamRecord;

/// A storage handle ready to be decoded. `open` must return a reader
/// positioned at the start of the object; resuming from `range_start` is
/// the decoding stack's job (see [`crate::pipeline::inflate`]), not the
/// reader's.
pub trait StorageReader {
    type Body: Read + Send + 'static;

    fn open(&self) -> std::io::Result<Self::Body>;
    fn capabilities(&self) -> DecodeCapabilities;

    /// `get_by_lines(range_start)` — the single operation every storage
    /// handle exposes to the rest of the system.
    fn get_by_lines(
        &self,
        range_start: u64,
    ) -> std::io::Result<Box<dyn Iterator<Item = Result<ByteStreamRecord, DecodeError>>>> {
        let body = self.open()?;
        pipeline::get_by_lines(body, range_start, self.capabilities())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// An object already fully resident in memory — what a prior S3 `GetObject`
/// call into a `Vec<u8>` looks like.
pub struct BytesObject {
    pub bytes: Vec<u8>,
    pub is_gzipped: bool,
    pub capabilities: fn() -> DecodeCapabilities,
}

impl BytesObject {
    pub fn new(bytes: Vec<u8>, is_gzipped: bool) -> Self {
        Self {
            bytes,
            is_gzipped,
            capabilities: DecodeCapabilities::plain,
        }
    }
}

impl StorageReader for BytesObject {
    type Body = Cursor<Vec<u8>>;

    fn open(&self) -> std::io::Result<Self::Body> {
        Ok(Cursor::new(self.bytes.clone()))
    }

    fn capabilities(&self) -> DecodeCapabilities {
        let mut caps = (self.capabilities)();
        caps.is_gzipped = self.is_gzipped;
        caps
    }
}

/// A plain file on disk, for the CLI's `decode` subcommand.
pub struct FileObject {
    pub path: std::path::PathBuf,
    pub is_gzipped: bool,
}

impl StorageReader for FileObject {
    type Body = BufReader<File>;

    fn open(&self) -> std::io::Result<Self::Body> {
        Ok(BufReader::new(File::open(&self.path)?))
    }

    fn capabilities(&self) -> DecodeCapabilities {
        let mut caps = DecodeCapabilities::plain();
        caps.is_gzipped = self.is_gzipped;
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_object_round_trips_through_get_by_lines() {
        let obj = BytesObject::new(b"one\ntwo\n".to_vec(), false);
        let out: Vec<_> = obj.get_by_lines(0).unwrap().map(|r| r.unwrap().payload).collect();
        assert_eq!(out, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn file_object_round_trips_through_get_by_lines() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"alpha\nbeta\n").unwrap();
        let obj = FileObject { path: file.path().to_path_buf(), is_gzipped: false };
        let out: Vec<_> = obj.get_by_lines(0).unwrap().map(|r| r.unwrap().payload).collect();
        assert_eq!(out, vec![b"alpha".to_vec(), b"beta".to_vec()]);
    }
}
