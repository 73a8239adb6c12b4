//! Fixed-capacity staging buffer shared between an adapter and its codec.
//!
//! The buffer tracks two offsets over its storage: `consumed_offset` marks how
//! much valid data has already been handed out and `available_to_read` marks
//! the end of valid data. `consumed_offset <= available_to_read <= capacity`
//! holds after every operation.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Owned staging region with read and write cursors.
#[derive(Debug)]
pub struct NativeBuffer {
    storage: Box<[u8]>,
    consumed: usize,
    available: usize,
}

impl NativeBuffer {
    /// Reserves a buffer of exactly `size` bytes.
    ///
    /// Fails with [`Error::InvalidArgument`] for a zero size and with
    /// [`Error::Allocation`] when the reservation cannot be satisfied.
    pub fn allocate(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_argument("buffer size must be non-zero"));
        }
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(size)
            .map_err(|_| Error::Allocation { size })?;
        storage.resize(size, 0);
        Ok(Self {
            storage: storage.into_boxed_slice(),
            consumed: 0,
            available: 0,
        })
    }

    /// Total capacity in bytes; zero after [`release`](Self::release).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Offset of the first byte that has not been handed out yet.
    #[must_use]
    pub const fn consumed_offset(&self) -> usize {
        self.consumed
    }

    /// Offset one past the last valid byte.
    #[must_use]
    pub const fn available_to_read(&self) -> usize {
        self.available
    }

    /// Returns `true` when every valid byte has been consumed.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.consumed >= self.available
    }

    /// Moves both cursors back to the start without touching the storage.
    pub fn reset(&mut self) {
        self.consumed = 0;
        self.available = 0;
    }

    /// Valid bytes that have not been consumed.
    #[must_use]
    pub fn readable(&self) -> &[u8] {
        &self.storage[self.consumed..self.available]
    }

    /// Free space after the valid data.
    pub fn writable(&mut self) -> &mut [u8] {
        &mut self.storage[self.available..]
    }

    /// Marks `n` bytes of [`writable`](Self::writable) as valid.
    pub fn commit(&mut self, n: usize) {
        debug_assert!(n <= self.storage.len() - self.available);
        self.available = self.available.saturating_add(n).min(self.storage.len());
    }

    /// Marks `n` readable bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available - self.consumed);
        self.consumed = self.consumed.saturating_add(n).min(self.available);
    }

    /// Resets the cursors and performs a single read into the free space.
    ///
    /// Returns the number of bytes read; `0` means the reader is at EOF.
    /// Interrupted reads are retried.
    pub fn fill_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.reset();
        loop {
            match reader.read(self.writable()) {
                Ok(n) => {
                    self.commit(n);
                    return Ok(n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Writes every readable byte to `writer` and resets the cursors.
    pub fn drain_into<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<()> {
        if !self.is_exhausted() {
            writer.write_all(self.readable())?;
        }
        self.reset();
        Ok(())
    }

    /// Frees the storage. The buffer reports a capacity of zero afterwards.
    pub fn release(&mut self) {
        self.storage = Box::default();
        self.reset();
    }
}
