//! # Overview
//!
//! LZ4 frame sessions: a compressing session built on [`lz4_flex`]'s frame
//! encoder and a decompressing session over an incremental frame parser, so
//! the adapters can push arbitrary slices at either side.
//!
//! # Design
//!
//! Compression stages the blocks produced by the frame encoder and hands them
//! out as output space permits. The frame header goes out with the first
//! block, each step feeds at most one block of input, and finishing emits the
//! end mark and the optional content checksum.
//!
//! The defaults are independent blocks of up to 4 MiB with a content checksum
//! and no block checksums. Skippable frames end a member of their own.
//!
//! # Errors
//!
//! Malformed frames surface as [`Error::Codec`] carrying the matching
//! `LZ4F_*` code; input ending inside a frame is [`Error::Truncated`].

mod frame;

use std::io::{Read, Write};

use lz4_flex::frame::{BlockMode, BlockSize, FrameInfo};

use crate::backend::{self, Backend};
use crate::codec::{Codec, CodecOptions, Direction, FlushMode, Step};
use crate::error::{Error, Result};
use crate::level::CompressionLevel;
use crate::stream::{CodecStream, Decoder, Encoder, StreamOptions};

use self::frame::{FrameReader, FrameWriter};

pub use self::frame::{
    FRAME_MAGIC, LZ4F_BLOCK_CHECKSUM_INVALID, LZ4F_CONTENT_CHECKSUM_INVALID,
    LZ4F_DECOMPRESSION_FAILED, LZ4F_FRAME_SIZE_WRONG, LZ4F_FRAME_TYPE_UNKNOWN, LZ4F_GENERIC,
    LZ4F_HEADER_CHECKSUM_INVALID, LZ4F_HEADER_VERSION_WRONG, LZ4F_MAX_BLOCK_SIZE_INVALID,
    LZ4F_RESERVED_FLAG_SET, SKIPPABLE_MAGIC,
};

/// Staging buffer size used when no override is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Compressing LZ4 frame adapter.
pub type Lz4Encoder<W> = Encoder<W, Lz4Codec>;
/// Decompressing LZ4 frame adapter.
pub type Lz4Decoder<R> = Decoder<R, Lz4Codec>;
/// Direction-erased LZ4 frame adapter.
pub type Lz4Stream<S> = CodecStream<S, Lz4Codec>;

/// Maximum uncompressed size of one block.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lz4BlockSize {
    /// 64 KiB.
    Max64Kb,
    /// 256 KiB.
    Max256Kb,
    /// 1 MiB.
    Max1Mb,
    /// 4 MiB.
    #[default]
    Max4Mb,
}

impl Lz4BlockSize {
    /// Size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Max64Kb => 64 * 1024,
            Self::Max256Kb => 256 * 1024,
            Self::Max1Mb => 1024 * 1024,
            Self::Max4Mb => 4 * 1024 * 1024,
        }
    }

    /// Block size chosen for a compression level when none is configured.
    pub const fn for_level(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::None | CompressionLevel::Fast => Self::Max64Kb,
            CompressionLevel::Default => Self::Max256Kb,
            CompressionLevel::Best => Self::Max4Mb,
            CompressionLevel::Precise(value) => match value.get() {
                1..=3 => Self::Max64Kb,
                4..=6 => Self::Max256Kb,
                7..=8 => Self::Max1Mb,
                _ => Self::Max4Mb,
            },
        }
    }
}

impl From<Lz4BlockSize> for BlockSize {
    fn from(size: Lz4BlockSize) -> Self {
        match size {
            Lz4BlockSize::Max64Kb => Self::Max64KB,
            Lz4BlockSize::Max256Kb => Self::Max256KB,
            Lz4BlockSize::Max1Mb => Self::Max1MB,
            Lz4BlockSize::Max4Mb => Self::Max4MB,
        }
    }
}

/// Whether blocks may reference data from earlier blocks.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lz4BlockMode {
    /// Every block decodes on its own.
    #[default]
    Independent,
    /// Blocks may reference the previous 64 KiB.
    Linked,
}

/// Options for LZ4 frame sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Lz4Options {
    block_size: Option<Lz4BlockSize>,
    block_mode: Lz4BlockMode,
    content_checksum: bool,
    block_checksum: bool,
    level: CompressionLevel,
    stream: StreamOptions,
}

impl Default for Lz4Options {
    fn default() -> Self {
        Self {
            block_size: Some(Lz4BlockSize::Max4Mb),
            block_mode: Lz4BlockMode::Independent,
            content_checksum: true,
            block_checksum: false,
            level: CompressionLevel::Default,
            stream: StreamOptions::default(),
        }
    }
}

impl Lz4Options {
    /// Independent 4 MiB blocks with a content checksum.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block size explicitly.
    pub fn with_block_size(mut self, size: Lz4BlockSize) -> Self {
        self.block_size = Some(size);
        self
    }

    /// Derives the block size from `level` instead of a fixed size.
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self.block_size = None;
        self
    }

    /// Sets the block mode.
    pub fn with_block_mode(mut self, mode: Lz4BlockMode) -> Self {
        self.block_mode = mode;
        self
    }

    /// Enables or disables the content checksum.
    pub fn with_content_checksum(mut self, enabled: bool) -> Self {
        self.content_checksum = enabled;
        self
    }

    /// Enables or disables per-block checksums.
    pub fn with_block_checksum(mut self, enabled: bool) -> Self {
        self.block_checksum = enabled;
        self
    }

    /// Overrides the staging buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.stream = self.stream.with_buffer_size(size);
        self
    }

    /// Chooses whether closing the adapter drops the sink.
    pub fn with_close_underlying(mut self, close: bool) -> Self {
        self.stream = self.stream.with_close_underlying(close);
        self
    }

    /// Effective block size.
    pub const fn block_size(&self) -> Lz4BlockSize {
        match self.block_size {
            Some(size) => size,
            None => Lz4BlockSize::for_level(self.level),
        }
    }

    /// Block mode.
    pub const fn block_mode(&self) -> Lz4BlockMode {
        self.block_mode
    }

    /// Whether the content checksum is written.
    pub const fn content_checksum(&self) -> bool {
        self.content_checksum
    }

    /// Whether block checksums are written.
    pub const fn block_checksum(&self) -> bool {
        self.block_checksum
    }

    fn frame_info(&self) -> FrameInfo {
        let mode = match self.block_mode {
            Lz4BlockMode::Independent => BlockMode::Independent,
            Lz4BlockMode::Linked => BlockMode::Linked,
        };
        FrameInfo::new()
            .block_mode(mode)
            .block_size(self.block_size().into())
            .content_checksum(self.content_checksum)
            .block_checksums(self.block_checksum)
    }
}

impl CodecOptions for Lz4Options {
    type Codec = Lz4Codec;

    fn init_compress(&self) -> Result<Lz4Codec> {
        backend::load(Backend::Lz4)?;
        let writer = FrameWriter::new(self.frame_info(), self.block_size().bytes());
        Ok(Lz4Codec {
            state: Some(State::Compress(Box::new(writer))),
            direction: Direction::Compress,
        })
    }

    fn init_decompress(&self) -> Result<Lz4Codec> {
        backend::load(Backend::Lz4)?;
        Ok(Lz4Codec {
            state: Some(State::Decompress(Box::new(FrameReader::new()))),
            direction: Direction::Decompress,
        })
    }

    fn buffer_size(&self, _direction: Direction) -> usize {
        DEFAULT_BUFFER_SIZE
    }

    fn stream_options(&self) -> &StreamOptions {
        &self.stream
    }
}

enum State {
    Compress(Box<FrameWriter>),
    Decompress(Box<FrameReader>),
}

/// LZ4 frame session driven by the streaming adapters.
pub struct Lz4Codec {
    state: Option<State>,
    direction: Direction,
}

impl Codec for Lz4Codec {
    fn backend(&self) -> Backend {
        Backend::Lz4
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Step> {
        match self.state.as_mut() {
            None => Err(Error::ObjectDisposed("lz4 session")),
            Some(State::Compress(writer)) => writer.step(input, output, flush),
            Some(State::Decompress(reader)) => reader.step(input, output),
        }
    }

    fn reset(&mut self) -> Result<()> {
        match self.state.as_mut() {
            None => Err(Error::ObjectDisposed("lz4 session")),
            Some(State::Compress(writer)) => {
                writer.reset();
                Ok(())
            }
            Some(State::Decompress(reader)) => {
                reader.reset();
                Ok(())
            }
        }
    }

    fn end(&mut self) {
        self.state = None;
    }

    fn is_ended(&self) -> bool {
        self.state.is_none()
    }
}

/// Compresses `input` into a new LZ4 frame using the block size for `level`.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let options = Lz4Options::new().with_level(level);
    let mut encoder = Lz4Encoder::new(Vec::new(), &options)?;
    encoder.write_all(input)?;
    encoder.into_inner()
}

/// Decompresses every LZ4 frame in `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = Lz4Decoder::new(input, &Lz4Options::new())?;
    let mut output = Vec::new();
    loop {
        decoder.read_to_end(&mut output)?;
        if !decoder.is_member_finished() {
            break;
        }
        decoder.reset()?;
    }
    Ok(output)
}
