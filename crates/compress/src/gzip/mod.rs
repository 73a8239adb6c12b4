//! # Overview
//!
//! Deflate sessions with gzip, zlib or raw framing, built on
//! [`flate2`](https://docs.rs/flate2)'s low-level [`Compress`] and
//! [`Decompress`] state machines, plus the [`GzipEncoder`]/[`GzipDecoder`]
//! adapters and one-shot helpers.
//!
//! # Design
//!
//! flate2 reports progress through monotonically increasing `total_in` and
//! `total_out` counters, so each step records them before calling into zlib
//! and derives the consumed/produced counts from the difference. zlib's
//! `Z_BUF_ERROR` (no progress possible) is reported as a step that made no
//! progress rather than as an error.
//!
//! Resetting a decompressor recreates it: flate2's own reset only knows about
//! zlib headers and would drop the gzip window configuration.
//!
//! # Errors
//!
//! Rejected options surface as [`Error::CodecInit`] with `Z_STREAM_ERROR`,
//! corrupt input as [`Error::Codec`] with `Z_DATA_ERROR`, and a stream that
//! needs a preset dictionary as [`Error::Codec`] with `Z_NEED_DICT`.
//!
//! # Examples
//!
//! ```
//! use compress::gzip::{compress_to_vec, decompress_to_vec};
//! use compress::CompressionLevel;
//!
//! let data = b"highly compressible payload";
//! let compressed = compress_to_vec(data, CompressionLevel::Best).unwrap();
//! assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
//! let decoded = decompress_to_vec(&compressed).unwrap();
//! assert_eq!(decoded, data);
//! ```

pub mod file;

use std::io::{Read, Write};

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::backend::{self, Backend};
use crate::codec::{Codec, CodecOptions, Direction, FlushMode, Step};
use crate::error::{Error, Result};
use crate::level::CompressionLevel;
use crate::stream::{CodecStream, Decoder, Encoder, StreamOptions};

/// zlib's `Z_NEED_DICT`.
pub const Z_NEED_DICT: i32 = 2;
/// zlib's `Z_STREAM_ERROR`.
pub const Z_STREAM_ERROR: i32 = -2;
/// zlib's `Z_DATA_ERROR`.
pub const Z_DATA_ERROR: i32 = -3;

/// Staging buffer size used when no override is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Smallest compression staging buffer.
///
/// zlib needs more than six bytes of output space to emit a complete sync
/// marker in one call; with less it keeps writing fresh markers.
pub const MIN_COMPRESS_BUFFER_SIZE: usize = 8;

/// Largest (and default) base-two logarithm of the history window.
pub const MAX_WINDOW_BITS: u8 = 15;
/// Smallest accepted window size.
pub const MIN_WINDOW_BITS: u8 = 9;

/// Compressing gzip adapter.
pub type GzipEncoder<W> = Encoder<W, DeflateCodec>;
/// Decompressing gzip adapter.
pub type GzipDecoder<R> = Decoder<R, DeflateCodec>;
/// Direction-erased gzip adapter.
pub type GzipStream<S> = CodecStream<S, DeflateCodec>;

/// Container wrapped around the deflate data.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GzipFormat {
    /// RFC 1952 gzip header and CRC-32 trailer.
    #[default]
    Gzip,
    /// RFC 1950 zlib header and Adler-32 trailer.
    Zlib,
    /// Bare RFC 1951 deflate data.
    Raw,
}

/// Options for deflate sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GzipOptions {
    level: CompressionLevel,
    window_bits: u8,
    format: GzipFormat,
    stream: StreamOptions,
}

impl Default for GzipOptions {
    fn default() -> Self {
        Self {
            level: CompressionLevel::Default,
            window_bits: MAX_WINDOW_BITS,
            format: GzipFormat::Gzip,
            stream: StreamOptions::default(),
        }
    }
}

impl GzipOptions {
    /// Gzip framing, default level, 32 KiB window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression level.
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    /// Sets the window size as a base-two logarithm.
    pub fn with_window_bits(mut self, bits: u8) -> Self {
        self.window_bits = bits;
        self
    }

    /// Sets the container format.
    pub fn with_format(mut self, format: GzipFormat) -> Self {
        self.format = format;
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

    /// Replaces the adapter-level options.
    pub fn with_stream_options(mut self, stream: StreamOptions) -> Self {
        self.stream = stream;
        self
    }

    /// Compression level.
    pub const fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Window size as a base-two logarithm.
    pub const fn window_bits(&self) -> u8 {
        self.window_bits
    }

    /// Container format.
    pub const fn format(&self) -> GzipFormat {
        self.format
    }

    fn checked_window_bits(&self) -> Result<u8> {
        if (MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            Ok(self.window_bits)
        } else {
            Err(Error::codec_init(
                Backend::Deflate,
                Z_STREAM_ERROR,
                format!(
                    "window bits {} outside {MIN_WINDOW_BITS}..={MAX_WINDOW_BITS}",
                    self.window_bits
                ),
            ))
        }
    }
}

impl CodecOptions for GzipOptions {
    type Codec = DeflateCodec;

    fn init_compress(&self) -> Result<DeflateCodec> {
        backend::load(Backend::Deflate)?;
        let bits = self.checked_window_bits()?;
        Ok(DeflateCodec {
            state: Some(State::Compress(new_compress(self.level, self.format, bits))),
            direction: Direction::Compress,
            level: self.level,
            format: self.format,
            window_bits: bits,
        })
    }

    fn init_decompress(&self) -> Result<DeflateCodec> {
        backend::load(Backend::Deflate)?;
        let bits = self.checked_window_bits()?;
        Ok(DeflateCodec {
            state: Some(State::Decompress(new_decompress(self.format, bits))),
            direction: Direction::Decompress,
            level: self.level,
            format: self.format,
            window_bits: bits,
        })
    }

    fn buffer_size(&self, _direction: Direction) -> usize {
        DEFAULT_BUFFER_SIZE
    }

    fn min_buffer_size(&self, direction: Direction) -> usize {
        match direction {
            Direction::Compress => MIN_COMPRESS_BUFFER_SIZE,
            Direction::Decompress => 1,
        }
    }

    fn stream_options(&self) -> &StreamOptions {
        &self.stream
    }
}

enum State {
    Compress(Compress),
    Decompress(Decompress),
}

/// Deflate session driven by the streaming adapters.
pub struct DeflateCodec {
    state: Option<State>,
    direction: Direction,
    level: CompressionLevel,
    format: GzipFormat,
    window_bits: u8,
}

fn new_compress(level: CompressionLevel, format: GzipFormat, bits: u8) -> Compress {
    let level = Compression::new(level.numeric());
    match format {
        GzipFormat::Gzip => Compress::new_gzip(level, bits),
        GzipFormat::Zlib => Compress::new_with_window_bits(level, true, bits),
        GzipFormat::Raw => Compress::new_with_window_bits(level, false, bits),
    }
}

fn new_decompress(format: GzipFormat, bits: u8) -> Decompress {
    match format {
        GzipFormat::Gzip => Decompress::new_gzip(bits),
        GzipFormat::Zlib => Decompress::new_with_window_bits(true, bits),
        GzipFormat::Raw => Decompress::new_with_window_bits(false, bits),
    }
}

impl DeflateCodec {
    /// Container format of the session.
    pub const fn format(&self) -> GzipFormat {
        self.format
    }
}

impl Codec for DeflateCodec {
    fn backend(&self) -> Backend {
        Backend::Deflate
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Step> {
        match self.state.as_mut() {
            None => Err(Error::ObjectDisposed("deflate session")),
            Some(State::Compress(compress)) => {
                let before_in = compress.total_in();
                let before_out = compress.total_out();
                let mode = match flush {
                    FlushMode::None => FlushCompress::None,
                    FlushMode::Sync => FlushCompress::Sync,
                    FlushMode::Full => FlushCompress::Full,
                    FlushMode::Finish => FlushCompress::Finish,
                };
                let status = compress
                    .compress(input, output, mode)
                    .map_err(|err| Error::codec(Backend::Deflate, Z_STREAM_ERROR, err.to_string()))?;
                let consumed = (compress.total_in() - before_in) as usize;
                let produced = (compress.total_out() - before_out) as usize;
                Ok(match status {
                    Status::StreamEnd => Step::end(consumed, produced),
                    Status::Ok | Status::BufError => Step::cont(consumed, produced),
                })
            }
            Some(State::Decompress(decompress)) => {
                let before_in = decompress.total_in();
                let before_out = decompress.total_out();
                let mode = match flush {
                    FlushMode::None => FlushDecompress::None,
                    FlushMode::Sync | FlushMode::Full => FlushDecompress::Sync,
                    FlushMode::Finish => FlushDecompress::Finish,
                };
                let status = decompress.decompress(input, output, mode).map_err(|err| {
                    if err.needs_dictionary().is_some() {
                        Error::codec(Backend::Deflate, Z_NEED_DICT, "preset dictionary required")
                    } else {
                        Error::codec(Backend::Deflate, Z_DATA_ERROR, err.to_string())
                    }
                })?;
                let consumed = (decompress.total_in() - before_in) as usize;
                let produced = (decompress.total_out() - before_out) as usize;
                Ok(match status {
                    Status::StreamEnd => Step::end(consumed, produced),
                    Status::Ok | Status::BufError => Step::cont(consumed, produced),
                })
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        match self.state.as_mut() {
            None => Err(Error::ObjectDisposed("deflate session")),
            Some(State::Compress(compress)) => {
                compress.reset();
                Ok(())
            }
            Some(state @ State::Decompress(_)) => {
                *state = State::Decompress(new_decompress(self.format, self.window_bits));
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

impl std::fmt::Debug for DeflateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateCodec")
            .field("direction", &self.direction)
            .field("level", &self.level)
            .field("format", &self.format)
            .field("window_bits", &self.window_bits)
            .field("ended", &self.state.is_none())
            .finish()
    }
}

/// Compresses `input` into a new gzip member.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let options = GzipOptions::new().with_level(level);
    let mut encoder = GzipEncoder::new(Vec::new(), &options)?;
    encoder.write_all(input)?;
    encoder.into_inner()
}

/// Decompresses every gzip member in `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzipDecoder::new(input, &GzipOptions::new())?;
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
