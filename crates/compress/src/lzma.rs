//! # Overview
//!
//! LZMA sessions over liblzma through [`xz2`](https://docs.rs/xz2): `.xz`
//! streams with an optional branch-converter filter, legacy `.lzma` streams,
//! and an auto-detecting decoder for both.
//!
//! # Design
//!
//! liblzma exposes cumulative `total_in`/`total_out` counters, so each step
//! derives its progress from their difference. `LZMA_FINISH` has to be repeated
//! until `LZMA_STREAM_END`; the adapters already loop that way. xz2 reports
//! `LZMA_BUF_ERROR` (no progress possible) as [`Status::MemNeeded`]; it is
//! treated as a step without progress.
//!
//! Legacy `.lzma` encoders do not support sync or full flushes, so those
//! requests run as plain steps for [`LzmaFormat::Lzma`].
//!
//! # Errors
//!
//! Option errors surface as [`Error::CodecInit`] with `LZMA_OPTIONS_ERROR`,
//! memory exhaustion and memory-limit hits as [`Error::OutOfMemory`] and
//! everything else as [`Error::Codec`] carrying the liblzma return code.

use std::io::{Read, Write};

use xz2::stream::{
    Action, Check, Error as XzError, Filters, LzmaOptions as PresetOptions, Status, Stream,
};

use crate::backend::{self, Backend};
use crate::codec::{Codec, CodecOptions, Direction, FlushMode, Step};
use crate::error::{Error, Result};
use crate::level::CompressionLevel;
use crate::stream::{CodecStream, Decoder, Encoder, StreamOptions};

/// liblzma's `LZMA_NO_CHECK` status.
pub const LZMA_NO_CHECK: i32 = 2;
/// liblzma's `LZMA_UNSUPPORTED_CHECK` status.
pub const LZMA_UNSUPPORTED_CHECK: i32 = 3;
/// liblzma's `LZMA_MEM_ERROR` status.
pub const LZMA_MEM_ERROR: i32 = 5;
/// liblzma's `LZMA_MEMLIMIT_ERROR` status.
pub const LZMA_MEMLIMIT_ERROR: i32 = 6;
/// liblzma's `LZMA_FORMAT_ERROR` status.
pub const LZMA_FORMAT_ERROR: i32 = 7;
/// liblzma's `LZMA_OPTIONS_ERROR` status.
pub const LZMA_OPTIONS_ERROR: i32 = 8;
/// liblzma's `LZMA_DATA_ERROR` status.
pub const LZMA_DATA_ERROR: i32 = 9;
/// liblzma's `LZMA_BUF_ERROR` status.
pub const LZMA_BUF_ERROR: i32 = 10;
/// liblzma's `LZMA_PROG_ERROR` status.
pub const LZMA_PROG_ERROR: i32 = 11;

/// Staging buffer size used when no override is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
/// Default preset, matching `xz -6`.
pub const DEFAULT_PRESET: u32 = 6;
/// Decoder memory limit used by the streaming adapters.
pub const DEFAULT_MEMLIMIT: u64 = 1 << 30;
/// Decoder memory limit used by [`decompress_buffer`].
pub const BUFFER_MEMLIMIT: u64 = 80 * 1024 * 1024;

const PRESET_EXTREME: u32 = 1 << 31;

/// Compressing xz adapter.
pub type LzmaEncoder<W> = Encoder<W, LzmaCodec>;
/// Decompressing xz adapter.
pub type LzmaDecoder<R> = Decoder<R, LzmaCodec>;
/// Direction-erased xz adapter.
pub type LzmaStream<S> = CodecStream<S, LzmaCodec>;

/// Container produced by the encoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LzmaFormat {
    /// `.xz` stream with integrity check.
    #[default]
    Xz,
    /// Legacy `.lzma` (LZMA_Alone) stream.
    Lzma,
}

/// Integrity check stored in `.xz` streams.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LzmaCheck {
    /// No check.
    None,
    /// CRC-32.
    Crc32,
    /// CRC-64.
    #[default]
    Crc64,
    /// SHA-256.
    Sha256,
}

impl From<LzmaCheck> for Check {
    fn from(check: LzmaCheck) -> Self {
        match check {
            LzmaCheck::None => Self::None,
            LzmaCheck::Crc32 => Self::Crc32,
            LzmaCheck::Crc64 => Self::Crc64,
            LzmaCheck::Sha256 => Self::Sha256,
        }
    }
}

/// Branch-converter filter placed before LZMA2 in `.xz` streams.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BranchFilter {
    /// LZMA2 only.
    #[default]
    None,
    /// x86 BCJ.
    X86,
    /// ARM BCJ.
    Arm,
    /// ARM-Thumb BCJ.
    ArmThumb,
    /// PowerPC BCJ.
    PowerPc,
    /// IA-64 BCJ.
    Ia64,
    /// SPARC BCJ.
    Sparc,
}

/// Options for LZMA sessions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LzmaOptions {
    preset: u32,
    extreme: bool,
    check: LzmaCheck,
    format: LzmaFormat,
    filter: BranchFilter,
    memlimit: u64,
    stream: StreamOptions,
}

impl Default for LzmaOptions {
    fn default() -> Self {
        Self {
            preset: DEFAULT_PRESET,
            extreme: false,
            check: LzmaCheck::Crc64,
            format: LzmaFormat::Xz,
            filter: BranchFilter::None,
            memlimit: DEFAULT_MEMLIMIT,
            stream: StreamOptions::default(),
        }
    }
}

impl LzmaOptions {
    /// `.xz`, preset 6, CRC-64, 1 GiB decoder memory limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preset (`0..=9`).
    pub fn with_preset(mut self, preset: u32) -> Self {
        self.preset = preset;
        self
    }

    /// Sets the preset from a [`CompressionLevel`].
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.preset = level.numeric();
        self
    }

    /// Enables the slower "extreme" variant of the preset.
    pub fn with_extreme(mut self, extreme: bool) -> Self {
        self.extreme = extreme;
        self
    }

    /// Sets the integrity check.
    pub fn with_check(mut self, check: LzmaCheck) -> Self {
        self.check = check;
        self
    }

    /// Sets the container format.
    pub fn with_format(mut self, format: LzmaFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the branch-converter filter.
    pub fn with_filter(mut self, filter: BranchFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the decoder memory limit in bytes.
    pub fn with_memlimit(mut self, memlimit: u64) -> Self {
        self.memlimit = memlimit;
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

    /// Preset number.
    pub const fn preset(&self) -> u32 {
        self.preset
    }

    /// Container format.
    pub const fn format(&self) -> LzmaFormat {
        self.format
    }

    /// Integrity check.
    pub const fn check(&self) -> LzmaCheck {
        self.check
    }

    /// Branch-converter filter.
    pub const fn filter(&self) -> BranchFilter {
        self.filter
    }

    /// Decoder memory limit in bytes.
    pub const fn memlimit(&self) -> u64 {
        self.memlimit
    }

    fn preset_value(&self) -> Result<u32> {
        if self.preset > 9 {
            return Err(Error::codec_init(
                Backend::Lzma,
                LZMA_OPTIONS_ERROR,
                format!("preset {} outside 0..=9", self.preset),
            ));
        }
        Ok(if self.extreme {
            self.preset | PRESET_EXTREME
        } else {
            self.preset
        })
    }

    fn new_encoder(&self) -> Result<Stream> {
        let preset = self.preset_value()?;
        let stream = match (self.format, self.filter) {
            (LzmaFormat::Xz, BranchFilter::None) => {
                Stream::new_easy_encoder(preset, self.check.into())
            }
            (LzmaFormat::Xz, filter) => {
                let lzma2 = PresetOptions::new_preset(preset).map_err(init_error)?;
                let mut filters = Filters::new();
                match filter {
                    BranchFilter::X86 => filters.x86(),
                    BranchFilter::Arm => filters.arm(),
                    BranchFilter::ArmThumb => filters.arm_thumb(),
                    BranchFilter::PowerPc => filters.powerpc(),
                    BranchFilter::Ia64 => filters.ia64(),
                    BranchFilter::Sparc => filters.sparc(),
                    BranchFilter::None => &mut filters,
                };
                filters.lzma2(&lzma2);
                Stream::new_stream_encoder(&filters, self.check.into())
            }
            (LzmaFormat::Lzma, BranchFilter::None) => {
                let lzma1 = PresetOptions::new_preset(preset).map_err(init_error)?;
                Stream::new_lzma_encoder(&lzma1)
            }
            (LzmaFormat::Lzma, _) => {
                return Err(Error::codec_init(
                    Backend::Lzma,
                    LZMA_OPTIONS_ERROR,
                    "branch filters require the xz format",
                ));
            }
        };
        stream.map_err(init_error)
    }
}

impl CodecOptions for LzmaOptions {
    type Codec = LzmaCodec;

    fn init_compress(&self) -> Result<LzmaCodec> {
        backend::load(Backend::Lzma)?;
        let stream = self.new_encoder()?;
        Ok(LzmaCodec {
            stream: Some(stream),
            direction: Direction::Compress,
            options: *self,
        })
    }

    fn init_decompress(&self) -> Result<LzmaCodec> {
        backend::load(Backend::Lzma)?;
        let stream = Stream::new_auto_decoder(self.memlimit, 0).map_err(init_error)?;
        Ok(LzmaCodec {
            stream: Some(stream),
            direction: Direction::Decompress,
            options: *self,
        })
    }

    fn buffer_size(&self, _direction: Direction) -> usize {
        DEFAULT_BUFFER_SIZE
    }

    fn stream_options(&self) -> &StreamOptions {
        &self.stream
    }
}

/// LZMA session driven by the streaming adapters.
pub struct LzmaCodec {
    stream: Option<Stream>,
    direction: Direction,
    options: LzmaOptions,
}

impl LzmaCodec {
    fn action(&self, flush: FlushMode) -> Action {
        let legacy = self.direction == Direction::Compress && self.options.format == LzmaFormat::Lzma;
        match flush {
            FlushMode::None => Action::Run,
            FlushMode::Sync | FlushMode::Full if legacy => Action::Run,
            FlushMode::Sync => Action::SyncFlush,
            FlushMode::Full => Action::FullFlush,
            FlushMode::Finish => Action::Finish,
        }
    }
}

impl Codec for LzmaCodec {
    fn backend(&self) -> Backend {
        Backend::Lzma
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Step> {
        let action = self.action(flush);
        let stream = self
            .stream
            .as_mut()
            .ok_or(Error::ObjectDisposed("lzma session"))?;
        let before_in = stream.total_in();
        let before_out = stream.total_out();
        let status = stream.process(input, output, action);
        let consumed = (stream.total_in() - before_in) as usize;
        let produced = (stream.total_out() - before_out) as usize;
        match status {
            // liblzma reports a completed sync/full flush as stream end.
            Ok(Status::StreamEnd) if matches!(flush, FlushMode::Sync | FlushMode::Full) => {
                Ok(Step::cont(consumed, produced))
            }
            Ok(Status::StreamEnd) => Ok(Step::end(consumed, produced)),
            Ok(Status::Ok | Status::GetCheck | Status::MemNeeded) => {
                Ok(Step::cont(consumed, produced))
            }
            Err(err) => Err(codec_error(err)),
        }
    }

    fn reset(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::ObjectDisposed("lzma session"));
        }
        let fresh = match self.direction {
            Direction::Compress => self.options.new_encoder()?,
            Direction::Decompress => {
                Stream::new_auto_decoder(self.options.memlimit, 0).map_err(init_error)?
            }
        };
        self.stream = Some(fresh);
        Ok(())
    }

    fn end(&mut self) {
        self.stream = None;
    }

    fn is_ended(&self) -> bool {
        self.stream.is_none()
    }
}

const fn error_code(err: &XzError) -> i32 {
    match err {
        XzError::Data => LZMA_DATA_ERROR,
        XzError::Options => LZMA_OPTIONS_ERROR,
        XzError::Format => LZMA_FORMAT_ERROR,
        XzError::MemLimit => LZMA_MEMLIMIT_ERROR,
        XzError::Mem => LZMA_MEM_ERROR,
        XzError::Program => LZMA_PROG_ERROR,
        XzError::NoCheck => LZMA_NO_CHECK,
        XzError::UnsupportedCheck => LZMA_UNSUPPORTED_CHECK,
    }
}

fn codec_error(err: XzError) -> Error {
    match err {
        XzError::Mem | XzError::MemLimit => Error::OutOfMemory {
            backend: Backend::Lzma,
            code: error_code(&err),
        },
        other => Error::codec(Backend::Lzma, error_code(&other), other.to_string()),
    }
}

fn init_error(err: XzError) -> Error {
    match err {
        XzError::Mem | XzError::MemLimit => Error::OutOfMemory {
            backend: Backend::Lzma,
            code: error_code(&err),
        },
        other => Error::codec_init(Backend::Lzma, error_code(&other), other.to_string()),
    }
}

fn buf_error(message: &str) -> Error {
    Error::codec(Backend::Lzma, LZMA_BUF_ERROR, message)
}

/// Compresses `input` into a new `.xz` stream.
pub fn compress_to_vec(input: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let options = LzmaOptions::new().with_level(level);
    let mut encoder = LzmaEncoder::new(Vec::new(), &options)?;
    encoder.write_all(input)?;
    encoder.into_inner()
}

/// Decompresses every `.xz`/`.lzma` stream in `input` into a new [`Vec`].
pub fn decompress_to_vec(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = LzmaDecoder::new(input, &LzmaOptions::new())?;
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

/// Compresses `input` into the caller-provided `output` as one `.xz` stream
/// with a CRC-64 check, returning the number of bytes written.
///
/// Fails with `LZMA_BUF_ERROR` when `output` is too small.
pub fn compress_buffer(input: &[u8], output: &mut [u8], preset: u32) -> Result<usize> {
    backend::load(Backend::Lzma)?;
    let options = LzmaOptions::new().with_preset(preset);
    let mut stream = options.new_encoder()?;
    loop {
        let in_pos = stream.total_in() as usize;
        let out_pos = stream.total_out() as usize;
        let status = stream
            .process(&input[in_pos..], &mut output[out_pos..], Action::Finish)
            .map_err(codec_error)?;
        match status {
            Status::StreamEnd => return Ok(stream.total_out() as usize),
            Status::Ok | Status::GetCheck | Status::MemNeeded => {
                let stalled = stream.total_in() as usize == in_pos
                    && stream.total_out() as usize == out_pos;
                if stream.total_out() as usize == output.len() || stalled {
                    return Err(buf_error("output buffer too small"));
                }
            }
        }
    }
}

/// Decompresses one `.xz` or `.lzma` stream from `input` into the
/// caller-provided `output` with an 80 MiB memory limit.
///
/// Returns `(consumed, produced)`. Fails with `LZMA_BUF_ERROR` when `output`
/// is too small and with `LZMA_DATA_ERROR` when `input` ends early.
pub fn decompress_buffer(input: &[u8], output: &mut [u8]) -> Result<(usize, usize)> {
    backend::load(Backend::Lzma)?;
    let mut stream = Stream::new_auto_decoder(BUFFER_MEMLIMIT, 0).map_err(init_error)?;
    loop {
        let in_pos = stream.total_in() as usize;
        let out_pos = stream.total_out() as usize;
        let status = stream
            .process(&input[in_pos..], &mut output[out_pos..], Action::Finish)
            .map_err(codec_error)?;
        let consumed = stream.total_in() as usize;
        let produced = stream.total_out() as usize;
        match status {
            Status::StreamEnd => return Ok((consumed, produced)),
            Status::Ok | Status::GetCheck | Status::MemNeeded => {
                if consumed == in_pos && produced == out_pos {
                    if consumed < input.len() && produced == output.len() {
                        return Err(buf_error("output buffer too small"));
                    }
                    return Err(Error::codec(
                        Backend::Lzma,
                        LZMA_DATA_ERROR,
                        "input ended before the end of the stream",
                    ));
                }
            }
        }
    }
}
