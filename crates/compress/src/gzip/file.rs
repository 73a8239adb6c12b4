//! File-level gzip access.
//!
//! [`GzipFile`] opens a path either for reading every gzip member it contains
//! or for writing a single member. Unlike the streaming adapters it holds no
//! staging buffer of its own and delegates to flate2's file readers and
//! writers.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::backend::{self, Backend};
use crate::codec::Direction;
use crate::error::{Error, Result};
use crate::level::CompressionLevel;
use crate::trace;

const DISPOSED: &str = "gzip file";

/// How a [`GzipFile`] is opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileAccess {
    /// Decompress an existing file.
    Read,
    /// Create or truncate a file and compress into it.
    Write,
    /// Not supported by gzip files.
    ReadWrite,
}

enum Handle {
    Reader(MultiGzDecoder<File>),
    Writer(GzEncoder<File>),
}

/// A gzip file opened for reading or writing.
pub struct GzipFile {
    handle: Option<Handle>,
    path: PathBuf,
}

impl GzipFile {
    /// Opens `path`, compressing at [`CompressionLevel::Best`] when writing.
    pub fn open(path: impl AsRef<Path>, access: FileAccess) -> Result<Self> {
        Self::open_with_level(path, access, CompressionLevel::Best)
    }

    /// Opens `path`, compressing at `level` when writing.
    pub fn open_with_level(
        path: impl AsRef<Path>,
        access: FileAccess,
        level: CompressionLevel,
    ) -> Result<Self> {
        let path = path.as_ref();
        backend::load(Backend::Deflate)?;
        let handle = match access {
            FileAccess::Read => Handle::Reader(MultiGzDecoder::new(File::open(path)?)),
            FileAccess::Write => Handle::Writer(GzEncoder::new(
                File::create(path)?,
                Compression::new(level.numeric()),
            )),
            FileAccess::ReadWrite => {
                return Err(Error::invalid_argument(
                    "gzip files cannot be opened for reading and writing at once",
                ));
            }
        };
        Ok(Self {
            handle: Some(handle),
            path: path.to_path_buf(),
        })
    }

    /// Path the file was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when the file was opened for reading and is still open.
    pub const fn can_read(&self) -> bool {
        matches!(self.handle, Some(Handle::Reader(_)))
    }

    /// Returns `true` when the file was opened for writing and is still open.
    pub const fn can_write(&self) -> bool {
        matches!(self.handle, Some(Handle::Writer(_)))
    }

    /// Returns `true` once the file has been closed.
    pub const fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Reads one decompressed byte, or `None` at the end of the file.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.read_into(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(Error::Io(err)) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Writes one byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        let mut pending: &[u8] = &[byte];
        while !pending.is_empty() {
            let written = self.write_from(pending)?;
            pending = &pending[written..];
        }
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.handle.as_mut() {
            None => Err(Error::ObjectDisposed(DISPOSED)),
            Some(Handle::Writer(_)) => Err(Error::UnsupportedOperation(
                "read on a gzip file opened for writing",
            )),
            Some(Handle::Reader(reader)) => Ok(reader.read(buf)?),
        }
    }

    fn write_from(&mut self, buf: &[u8]) -> Result<usize> {
        match self.handle.as_mut() {
            None => Err(Error::ObjectDisposed(DISPOSED)),
            Some(Handle::Reader(_)) => Err(Error::UnsupportedOperation(
                "write on a gzip file opened for reading",
            )),
            Some(Handle::Writer(writer)) => Ok(writer.write(buf)?),
        }
    }

    /// Finishes the member when writing and closes the file. Calling `close`
    /// again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(Handle::Writer(writer)) => {
                writer.finish()?.sync_all()?;
                Ok(())
            }
            Some(Handle::Reader(_)) | None => Ok(()),
        }
    }
}

impl Read for GzipFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::from)
    }
}

impl Write for GzipFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_from(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for GzipFile {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            trace::drop_error(Backend::Deflate, Direction::Compress, &err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_access_is_rejected() {
        let dir = std::env::temp_dir();
        let err = GzipFile::open(dir.join("unused.gz"), FileAccess::ReadWrite)
            .err()
            .expect("read-write rejected");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err = GzipFile::open("/nonexistent/dir/missing.gz", FileAccess::Read)
            .err()
            .expect("missing file");
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }
}
