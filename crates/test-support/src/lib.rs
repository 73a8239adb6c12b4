//! Shared fixtures for the codec-streams test suites.
//!
//! Readers and writers here misbehave in controlled ways (short reads,
//! interrupted calls, failing writes) so the adapters' loops can be exercised
//! without real pipes or sockets.

use std::io::{self, Read, Write};

use tempfile::TempDir;

/// Reader that returns at most `max` bytes per call.
#[derive(Debug)]
pub struct ChunkedReader<R> {
    inner: R,
    max: usize,
    calls: usize,
}

impl<R: Read> ChunkedReader<R> {
    /// Wraps `inner`, capping every read at `max` bytes (at least one).
    pub fn new(inner: R, max: usize) -> Self {
        Self {
            inner,
            max: max.max(1),
            calls: 0,
        }
    }

    /// Number of `read` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls += 1;
        let len = buf.len().min(self.max);
        self.inner.read(&mut buf[..len])
    }
}

/// Reader that fails every other call with [`io::ErrorKind::Interrupted`].
#[derive(Debug)]
pub struct InterruptingReader<R> {
    inner: R,
    interrupt_next: bool,
}

impl<R: Read> InterruptingReader<R> {
    /// Wraps `inner`; the first call is interrupted.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            interrupt_next: true,
        }
    }
}

impl<R: Read> Read for InterruptingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if std::mem::take(&mut self.interrupt_next) {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        self.interrupt_next = true;
        self.inner.read(buf)
    }
}

/// Writer that accepts `limit` bytes and then fails with `BrokenPipe`.
#[derive(Debug, Default)]
pub struct FailingWriter {
    accepted: Vec<u8>,
    limit: usize,
    flushes: usize,
}

impl FailingWriter {
    /// Fails once more than `limit` bytes would have been written.
    pub fn new(limit: usize) -> Self {
        Self {
            accepted: Vec::new(),
            limit,
            flushes: 0,
        }
    }

    /// Bytes accepted before the failure.
    pub fn accepted(&self) -> &[u8] {
        &self.accepted
    }

    /// Number of successful `flush` calls.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.accepted.len());
        if room == 0 && !buf.is_empty() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink refused data"));
        }
        let n = buf.len().min(room);
        self.accepted.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Writer that records how many times it was flushed.
#[derive(Debug, Default)]
pub struct FlushCounter {
    /// Bytes written so far.
    pub data: Vec<u8>,
    /// Number of `flush` calls.
    pub flushes: usize,
}

impl Write for FlushCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Deterministic pseudo-random bytes; identical `seed`s give identical output.
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Highly compressible text of exactly `len` bytes.
pub fn compressible(len: usize) -> Vec<u8> {
    const TEXT: &[u8] = b"The quick brown fox jumps over the lazy dog. ";
    TEXT.iter().copied().cycle().take(len).collect()
}

/// Fresh temporary directory removed when the returned guard drops.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("create temporary directory")
}
