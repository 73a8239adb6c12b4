//! # Overview
//!
//! The codec capability: the narrow push/pull contract every backend session
//! implements so the streaming adapters in [`crate::stream`] can drive it
//! without knowing which library sits underneath.
//!
//! # Design
//!
//! A session is created by a backend option struct implementing
//! [`CodecOptions`] and advanced with [`Codec::step`]. Each step receives an
//! input slice and an output slice and reports how much of each it used. The
//! codec may consume less than all input and produce less than the space it was
//! given; callers keep stepping until the input is gone or, for finishing
//! flushes, until [`StepStatus::StreamEnd`].
//!
//! Backend conventions that differ (liblzma wanting `Finish` repeated, zlib
//! reporting `BufError` when no progress is possible, LZ4 having distinct
//! header/update/end calls) are normalised inside each implementation.
//!
//! # Invariants
//!
//! - `Step::consumed <= input.len()` and `Step::produced <= output.len()`.
//! - After [`Codec::end`] every [`Codec::step`] and [`Codec::reset`] fails with
//!   [`Error::ObjectDisposed`](crate::Error::ObjectDisposed). `end` itself is
//!   idempotent.

use std::fmt;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::stream::StreamOptions;

/// Direction of a codec session or adapter.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Raw bytes in, compressed bytes out.
    Compress,
    /// Compressed bytes in, raw bytes out.
    Decompress,
}

impl Direction {
    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compress => "compress",
            Self::Decompress => "decompress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flush behaviour requested from a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FlushMode {
    /// Let the codec buffer as it likes.
    None,
    /// Emit everything fed so far on a byte boundary.
    Sync,
    /// Like [`FlushMode::Sync`], also resetting the compression state.
    Full,
    /// Terminate the member or frame.
    Finish,
}

/// Whether the member or frame ended during a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StepStatus {
    /// More work may follow.
    Continue,
    /// The member or frame is complete.
    StreamEnd,
}

/// Progress reported by [`Codec::step`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Step {
    /// Input bytes used.
    pub consumed: usize,
    /// Output bytes written.
    pub produced: usize,
    /// Whether the member or frame ended.
    pub status: StepStatus,
}

impl Step {
    /// A step that ended the member.
    #[must_use]
    pub const fn end(consumed: usize, produced: usize) -> Self {
        Self {
            consumed,
            produced,
            status: StepStatus::StreamEnd,
        }
    }

    /// A step after which more work may follow.
    #[must_use]
    pub const fn cont(consumed: usize, produced: usize) -> Self {
        Self {
            consumed,
            produced,
            status: StepStatus::Continue,
        }
    }

    /// Returns `true` when the step ended the member or frame.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self.status, StepStatus::StreamEnd)
    }

    /// Returns `true` when the step consumed or produced anything.
    #[must_use]
    pub const fn made_progress(&self) -> bool {
        self.consumed > 0 || self.produced > 0
    }
}

/// A backend session driven by the streaming adapters.
pub trait Codec {
    /// Backend implementing this session.
    fn backend(&self) -> Backend;

    /// Direction fixed at construction.
    fn direction(&self) -> Direction;

    /// Advances the codec over `input`, writing into `output`.
    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Step>;

    /// Reinitialises the session for a fresh member or frame.
    fn reset(&mut self) -> Result<()>;

    /// Releases backend state. Calling it again is a no-op.
    fn end(&mut self);

    /// Returns `true` once [`Codec::end`] ran.
    fn is_ended(&self) -> bool;
}

/// Backend option set able to create sessions.
pub trait CodecOptions {
    /// Session type produced by this option set.
    type Codec: Codec;

    /// Creates a compressing session.
    fn init_compress(&self) -> Result<Self::Codec>;

    /// Creates a decompressing session.
    fn init_decompress(&self) -> Result<Self::Codec>;

    /// Staging buffer size the backend prefers for `direction`.
    fn buffer_size(&self, direction: Direction) -> usize;

    /// Smallest staging buffer the backend can make progress with.
    ///
    /// Overrides below this are refused when an adapter is built.
    fn min_buffer_size(&self, _direction: Direction) -> usize {
        1
    }

    /// Adapter-level options embedded in the backend options.
    fn stream_options(&self) -> &StreamOptions;

    /// Creates a session for `direction`.
    fn init(&self, direction: Direction) -> Result<Self::Codec> {
        match direction {
            Direction::Compress => self.init_compress(),
            Direction::Decompress => self.init_decompress(),
        }
    }

    /// Buffer size after applying the [`StreamOptions`] override.
    fn effective_buffer_size(&self, direction: Direction) -> usize {
        self.stream_options()
            .buffer_size()
            .unwrap_or_else(|| self.buffer_size(direction))
    }

    /// [`effective_buffer_size`](Self::effective_buffer_size), refusing
    /// overrides below [`min_buffer_size`](Self::min_buffer_size).
    fn checked_buffer_size(&self, direction: Direction) -> Result<usize> {
        self.stream_options().validate()?;
        let size = self.effective_buffer_size(direction);
        let min = self.min_buffer_size(direction);
        if size < min {
            return Err(Error::invalid_argument(format!(
                "{direction} buffer size {size} is below the minimum of {min}"
            )));
        }
        Ok(size)
    }
}
