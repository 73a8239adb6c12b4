//! Incremental LZ4 frame writer and reader.
//!
//! [`FrameWriter`] drives `lz4_flex`'s frame encoder one block at a time and
//! stages whatever it emits until the caller provides output space.
//! [`FrameReader`] is a push-style frame parser: it accepts arbitrary input
//! slices, gathers each header field or block until it is complete and
//! decodes blocks with the `lz4_flex` block decoder.

use std::io::Write;

use lz4_flex::block;
use lz4_flex::frame::{FrameEncoder, FrameInfo};
use xxhash_rust::xxh32::{Xxh32, xxh32};

use crate::backend::Backend;
use crate::codec::{FlushMode, Step};
use crate::error::{Error, Result};

/// LZ4F `ERROR_GENERIC`.
pub const LZ4F_GENERIC: i32 = 1;
/// LZ4F `ERROR_maxBlockSize_invalid`.
pub const LZ4F_MAX_BLOCK_SIZE_INVALID: i32 = 2;
/// LZ4F `ERROR_headerVersion_wrong`.
pub const LZ4F_HEADER_VERSION_WRONG: i32 = 6;
/// LZ4F `ERROR_blockChecksum_invalid`.
pub const LZ4F_BLOCK_CHECKSUM_INVALID: i32 = 7;
/// LZ4F `ERROR_reservedFlag_set`.
pub const LZ4F_RESERVED_FLAG_SET: i32 = 8;
/// LZ4F `ERROR_frameType_unknown`.
pub const LZ4F_FRAME_TYPE_UNKNOWN: i32 = 13;
/// LZ4F `ERROR_frameSize_wrong`.
pub const LZ4F_FRAME_SIZE_WRONG: i32 = 14;
/// LZ4F `ERROR_decompressionFailed`.
pub const LZ4F_DECOMPRESSION_FAILED: i32 = 16;
/// LZ4F `ERROR_headerChecksum_invalid`.
pub const LZ4F_HEADER_CHECKSUM_INVALID: i32 = 17;
/// LZ4F `ERROR_contentChecksum_invalid`.
pub const LZ4F_CONTENT_CHECKSUM_INVALID: i32 = 18;

/// Magic number opening every LZ4 frame.
pub const FRAME_MAGIC: u32 = 0x184D_2204;
/// Skippable frames use magics `0x184D2A50..=0x184D2A5F`.
pub const SKIPPABLE_MAGIC: u32 = 0x184D_2A50;
const SKIPPABLE_MASK: u32 = 0xFFFF_FFF0;

const WINDOW: usize = 64 * 1024;
const UNCOMPRESSED_BIT: u32 = 0x8000_0000;

fn lz4_error(code: i32, message: impl Into<String>) -> Error {
    Error::codec(Backend::Lz4, code, message)
}

/// Compressing side: one frame per session, one block per step.
pub(crate) struct FrameWriter {
    info: FrameInfo,
    block_size: usize,
    encoder: Option<FrameEncoder<Vec<u8>>>,
    staged: Vec<u8>,
    staged_pos: usize,
    closed: bool,
}

impl FrameWriter {
    pub(crate) fn new(info: FrameInfo, block_size: usize) -> Self {
        Self {
            info,
            block_size,
            encoder: None,
            staged: Vec::new(),
            staged_pos: 0,
            closed: false,
        }
    }

    fn has_staged(&self) -> bool {
        self.staged_pos < self.staged.len()
    }

    // Copies staged bytes out, pulling more from the encoder once the stage is empty.
    fn hand_out(&mut self, output: &mut [u8]) -> usize {
        if !self.has_staged() {
            self.staged.clear();
            self.staged_pos = 0;
            if let Some(encoder) = self.encoder.as_mut() {
                std::mem::swap(&mut self.staged, encoder.get_mut());
            }
        }
        let n = output.len().min(self.staged.len() - self.staged_pos);
        output[..n].copy_from_slice(&self.staged[self.staged_pos..self.staged_pos + n]);
        self.staged_pos += n;
        n
    }

    fn encoder(&mut self) -> &mut FrameEncoder<Vec<u8>> {
        let info = self.info.clone();
        self.encoder
            .get_or_insert_with(|| FrameEncoder::with_frame_info(info, Vec::new()))
    }

    pub(crate) fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<Step> {
        let mut produced = self.hand_out(output);
        if self.has_staged() {
            return Ok(Step::cont(0, produced));
        }
        if self.closed {
            return Ok(if flush == FlushMode::Finish {
                Step::end(0, produced)
            } else {
                Step::cont(0, produced)
            });
        }

        let mut consumed = 0;
        if !input.is_empty() {
            let chunk = &input[..input.len().min(self.block_size)];
            consumed = self
                .encoder()
                .write(chunk)
                .map_err(|err| lz4_error(LZ4F_GENERIC, err.to_string()))?;
            produced += self.hand_out(&mut output[produced..]);
            if self.has_staged() || consumed < input.len() {
                return Ok(Step::cont(consumed, produced));
            }
        }

        match flush {
            FlushMode::None => {}
            FlushMode::Sync | FlushMode::Full => {
                if let Some(encoder) = self.encoder.as_mut() {
                    encoder
                        .flush()
                        .map_err(|err| lz4_error(LZ4F_GENERIC, err.to_string()))?;
                    produced += self.hand_out(&mut output[produced..]);
                }
            }
            FlushMode::Finish => {
                let encoder = match self.encoder.take() {
                    Some(encoder) => encoder,
                    None => FrameEncoder::with_frame_info(self.info.clone(), Vec::new()),
                };
                let tail = encoder
                    .finish()
                    .map_err(|err| lz4_error(LZ4F_GENERIC, err.to_string()))?;
                self.closed = true;
                self.staged = tail;
                self.staged_pos = 0;
                produced += self.hand_out(&mut output[produced..]);
                if !self.has_staged() {
                    return Ok(Step::end(consumed, produced));
                }
            }
        }
        Ok(Step::cont(consumed, produced))
    }

    pub(crate) fn reset(&mut self) {
        self.encoder = None;
        self.staged.clear();
        self.staged_pos = 0;
        self.closed = false;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Stage {
    Magic,
    SkipSize,
    Skip,
    Descriptor,
    DescriptorTail,
    BlockHeader,
    BlockBody,
    ContentChecksum,
    Done,
}

#[derive(Clone, Copy, Debug, Default)]
struct Descriptor {
    linked: bool,
    block_checksum: bool,
    content_checksum: bool,
    content_size: Option<u64>,
    dict_id: bool,
    block_max: usize,
    tail_len: usize,
}

/// Decompressing side: a push parser over the LZ4 frame format.
pub(crate) struct FrameReader {
    stage: Stage,
    field: Vec<u8>,
    field_len: usize,
    descriptor: Descriptor,
    block_uncompressed: bool,
    skip_remaining: u32,
    decoded: Vec<u8>,
    decoded_pos: usize,
    history: Vec<u8>,
    hasher: Xxh32,
    content_len: u64,
}

impl FrameReader {
    pub(crate) fn new() -> Self {
        Self {
            stage: Stage::Magic,
            field: Vec::new(),
            field_len: 4,
            descriptor: Descriptor::default(),
            block_uncompressed: false,
            skip_remaining: 0,
            decoded: Vec::new(),
            decoded_pos: 0,
            history: Vec::new(),
            hasher: Xxh32::new(0),
            content_len: 0,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.stage = Stage::Magic;
        self.field.clear();
        self.field_len = 4;
        self.descriptor = Descriptor::default();
        self.block_uncompressed = false;
        self.skip_remaining = 0;
        self.decoded.clear();
        self.decoded_pos = 0;
        self.history.clear();
        self.hasher = Xxh32::new(0);
        self.content_len = 0;
    }

    fn expect(&mut self, stage: Stage, len: usize) {
        self.stage = stage;
        self.field.clear();
        self.field_len = len;
    }

    // Appends input to the current field; returns the bytes taken.
    fn gather(&mut self, input: &[u8]) -> usize {
        let take = self.field_len.saturating_sub(self.field.len()).min(input.len());
        self.field.extend_from_slice(&input[..take]);
        take
    }

    fn field_complete(&self) -> bool {
        self.field.len() >= self.field_len
    }

    fn field_u32(&self, at: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.field[at..at + 4]);
        u32::from_le_bytes(bytes)
    }

    pub(crate) fn step(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step> {
        let mut consumed = 0;
        let mut produced = 0;
        loop {
            if self.decoded_pos < self.decoded.len() {
                let n = (output.len() - produced).min(self.decoded.len() - self.decoded_pos);
                output[produced..produced + n]
                    .copy_from_slice(&self.decoded[self.decoded_pos..self.decoded_pos + n]);
                self.decoded_pos += n;
                produced += n;
                if self.decoded_pos < self.decoded.len() {
                    return Ok(Step::cont(consumed, produced));
                }
            }
            if self.stage == Stage::Done {
                return Ok(Step::end(consumed, produced));
            }
            if consumed == input.len() {
                return Ok(Step::cont(consumed, produced));
            }

            let rest = &input[consumed..];
            if self.stage == Stage::Skip {
                let n = rest.len().min(self.skip_remaining as usize);
                consumed += n;
                self.skip_remaining -= n as u32;
                if self.skip_remaining == 0 {
                    self.stage = Stage::Done;
                }
                continue;
            }

            consumed += self.gather(rest);
            if !self.field_complete() {
                return Ok(Step::cont(consumed, produced));
            }
            self.advance()?;
        }
    }

    // Handles a completed field and moves to the next stage.
    fn advance(&mut self) -> Result<()> {
        match self.stage {
            Stage::Magic => {
                let magic = self.field_u32(0);
                if magic & SKIPPABLE_MASK == SKIPPABLE_MAGIC {
                    self.expect(Stage::SkipSize, 4);
                } else if magic == FRAME_MAGIC {
                    self.expect(Stage::Descriptor, 2);
                } else {
                    return Err(lz4_error(
                        LZ4F_FRAME_TYPE_UNKNOWN,
                        format!("unknown frame magic {magic:#010x}"),
                    ));
                }
            }
            Stage::SkipSize => {
                self.skip_remaining = self.field_u32(0);
                if self.skip_remaining == 0 {
                    self.stage = Stage::Done;
                } else {
                    self.stage = Stage::Skip;
                }
            }
            Stage::Descriptor => {
                self.descriptor = parse_descriptor(self.field[0], self.field[1])?;
                // FLG and BD stay in `field` so the header checksum covers them.
                self.stage = Stage::DescriptorTail;
                self.field_len = 2 + self.descriptor.tail_len;
            }
            Stage::DescriptorTail => self.finish_descriptor()?,
            Stage::BlockHeader => {
                let word = self.field_u32(0);
                if word == 0 {
                    if self.descriptor.content_checksum {
                        self.expect(Stage::ContentChecksum, 4);
                    } else {
                        self.check_content_size()?;
                        self.stage = Stage::Done;
                    }
                } else {
                    let len = (word & !UNCOMPRESSED_BIT) as usize;
                    if len > self.descriptor.block_max {
                        return Err(lz4_error(
                            LZ4F_MAX_BLOCK_SIZE_INVALID,
                            format!(
                                "block of {len} bytes exceeds the {}-byte maximum",
                                self.descriptor.block_max
                            ),
                        ));
                    }
                    self.block_uncompressed = word & UNCOMPRESSED_BIT != 0;
                    let checksum = if self.descriptor.block_checksum { 4 } else { 0 };
                    self.expect(Stage::BlockBody, len + checksum);
                }
            }
            Stage::BlockBody => {
                self.decode_block()?;
                self.expect(Stage::BlockHeader, 4);
            }
            Stage::ContentChecksum => {
                let stored = self.field_u32(0);
                let computed = self.hasher.digest();
                if stored != computed {
                    return Err(lz4_error(
                        LZ4F_CONTENT_CHECKSUM_INVALID,
                        format!("content checksum {computed:#010x} != {stored:#010x}"),
                    ));
                }
                self.check_content_size()?;
                self.stage = Stage::Done;
            }
            Stage::Skip | Stage::Done => {}
        }
        Ok(())
    }

    fn finish_descriptor(&mut self) -> Result<()> {
        let header = &self.field[..self.field.len() - 1];
        let stored = self.field[self.field.len() - 1];
        let computed = ((xxh32(header, 0) >> 8) & 0xFF) as u8;
        if stored != computed {
            return Err(lz4_error(
                LZ4F_HEADER_CHECKSUM_INVALID,
                format!("header checksum {computed:#04x} != {stored:#04x}"),
            ));
        }
        if self.descriptor.content_size.is_some() {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&self.field[2..10]);
            self.descriptor.content_size = Some(u64::from_le_bytes(bytes));
        }
        if self.descriptor.dict_id {
            return Err(lz4_error(
                LZ4F_GENERIC,
                "frames that reference an external dictionary are not supported",
            ));
        }
        self.expect(Stage::BlockHeader, 4);
        Ok(())
    }

    fn decode_block(&mut self) -> Result<()> {
        let data_len = self.field.len() - if self.descriptor.block_checksum { 4 } else { 0 };
        let data = &self.field[..data_len];
        if self.descriptor.block_checksum {
            let stored = self.field_u32(data_len);
            let computed = xxh32(data, 0);
            if stored != computed {
                return Err(lz4_error(
                    LZ4F_BLOCK_CHECKSUM_INVALID,
                    format!("block checksum {computed:#010x} != {stored:#010x}"),
                ));
            }
        }

        self.decoded.clear();
        self.decoded_pos = 0;
        if self.block_uncompressed {
            self.decoded.extend_from_slice(data);
        } else {
            self.decoded.resize(self.descriptor.block_max, 0);
            let decoded = if self.descriptor.linked && !self.history.is_empty() {
                block::decompress_into_with_dict(data, &mut self.decoded, &self.history)
            } else {
                block::decompress_into(data, &mut self.decoded)
            }
            .map_err(|err| lz4_error(LZ4F_DECOMPRESSION_FAILED, err.to_string()))?;
            self.decoded.truncate(decoded);
        }

        if self.descriptor.content_checksum {
            self.hasher.update(&self.decoded);
        }
        self.content_len += self.decoded.len() as u64;
        if self.descriptor.linked {
            self.history.extend_from_slice(&self.decoded);
            if self.history.len() > WINDOW {
                let excess = self.history.len() - WINDOW;
                self.history.drain(..excess);
            }
        }
        Ok(())
    }

    fn check_content_size(&self) -> Result<()> {
        match self.descriptor.content_size {
            Some(expected) if expected != self.content_len => Err(lz4_error(
                LZ4F_FRAME_SIZE_WRONG,
                format!(
                    "frame declares {expected} bytes but {} were decoded",
                    self.content_len
                ),
            )),
            _ => Ok(()),
        }
    }
}

fn parse_descriptor(flg: u8, bd: u8) -> Result<Descriptor> {
    if flg >> 6 != 0x01 {
        return Err(lz4_error(
            LZ4F_HEADER_VERSION_WRONG,
            format!("unsupported frame version {}", flg >> 6),
        ));
    }
    if flg & 0x02 != 0 || bd & 0x8F != 0 {
        return Err(lz4_error(LZ4F_RESERVED_FLAG_SET, "reserved descriptor bit set"));
    }
    let block_max = match (bd >> 4) & 0x07 {
        4 => 64 * 1024,
        5 => 256 * 1024,
        6 => 1024 * 1024,
        7 => 4 * 1024 * 1024,
        other => {
            return Err(lz4_error(
                LZ4F_MAX_BLOCK_SIZE_INVALID,
                format!("invalid block size id {other}"),
            ));
        }
    };
    let has_content_size = flg & 0x08 != 0;
    let dict_id = flg & 0x01 != 0;
    Ok(Descriptor {
        linked: flg & 0x20 == 0,
        block_checksum: flg & 0x10 != 0,
        content_checksum: flg & 0x04 != 0,
        content_size: has_content_size.then_some(0),
        dict_id,
        block_max,
        tail_len: usize::from(has_content_size) * 8 + usize::from(dict_id) * 4 + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(flg: u8, bd: u8) -> Vec<u8> {
        let mut frame = FRAME_MAGIC.to_le_bytes().to_vec();
        frame.push(flg);
        frame.push(bd);
        frame.push(((xxh32(&[flg, bd], 0) >> 8) & 0xFF) as u8);
        frame
    }

    fn decode_all(frame: &[u8]) -> Result<Vec<u8>> {
        let mut reader = FrameReader::new();
        let mut out = vec![0u8; 1024];
        let step = reader.step(frame, &mut out)?;
        assert!(step.is_end(), "frame did not end");
        out.truncate(step.produced);
        Ok(out)
    }

    #[test]
    fn stored_block_frame_decodes() {
        // version 01, independent blocks, 64 KiB maximum
        let mut frame = header(0x60, 0x40);
        frame.extend_from_slice(&(5u32 | UNCOMPRESSED_BIT).to_le_bytes());
        frame.extend_from_slice(b"hello");
        frame.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode_all(&frame).expect("decode"), b"hello");
    }

    #[test]
    fn content_checksum_is_verified() {
        let mut frame = header(0x64, 0x40);
        frame.extend_from_slice(&(3u32 | UNCOMPRESSED_BIT).to_le_bytes());
        frame.extend_from_slice(b"abc");
        frame.extend_from_slice(&0u32.to_le_bytes());
        frame.extend_from_slice(&xxh32(b"abc", 0).to_le_bytes());
        assert_eq!(decode_all(&frame).expect("decode"), b"abc");

        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let err = decode_all(&frame).expect_err("bad checksum");
        assert_eq!(err.code(), Some(LZ4F_CONTENT_CHECKSUM_INVALID));
    }

    #[test]
    fn header_checksum_mismatch_is_rejected() {
        let mut frame = header(0x60, 0x40);
        frame[6] ^= 0x01;
        let err = decode_all(&frame).expect_err("bad header checksum");
        assert_eq!(err.code(), Some(LZ4F_HEADER_CHECKSUM_INVALID));
    }

    #[test]
    fn unknown_magic_is_rejected() {
        let err = decode_all(b"\x00\x01\x02\x03").expect_err("bad magic");
        assert_eq!(err.code(), Some(LZ4F_FRAME_TYPE_UNKNOWN));
    }

    #[test]
    fn wrong_version_and_reserved_bits_are_rejected() {
        let err = decode_all(&header(0x20, 0x40)).expect_err("version 00");
        assert_eq!(err.code(), Some(LZ4F_HEADER_VERSION_WRONG));
        let err = decode_all(&header(0x62, 0x40)).expect_err("reserved flag");
        assert_eq!(err.code(), Some(LZ4F_RESERVED_FLAG_SET));
        let err = decode_all(&header(0x60, 0x30)).expect_err("block size id 3");
        assert_eq!(err.code(), Some(LZ4F_MAX_BLOCK_SIZE_INVALID));
    }

    #[test]
    fn content_size_mismatch_is_rejected() {
        let flg = 0x68;
        let bd = 0x40;
        let mut descriptor = vec![flg, bd];
        descriptor.extend_from_slice(&10u64.to_le_bytes());
        let mut frame = FRAME_MAGIC.to_le_bytes().to_vec();
        frame.extend_from_slice(&descriptor);
        frame.push(((xxh32(&descriptor, 0) >> 8) & 0xFF) as u8);
        frame.extend_from_slice(&(2u32 | UNCOMPRESSED_BIT).to_le_bytes());
        frame.extend_from_slice(b"hi");
        frame.extend_from_slice(&0u32.to_le_bytes());
        let err = decode_all(&frame).expect_err("size mismatch");
        assert_eq!(err.code(), Some(LZ4F_FRAME_SIZE_WRONG));
    }

    #[test]
    fn skippable_frame_ends_without_output() {
        let mut frame = (SKIPPABLE_MAGIC + 3).to_le_bytes().to_vec();
        frame.extend_from_slice(&4u32.to_le_bytes());
        frame.extend_from_slice(b"skip");
        assert!(decode_all(&frame).expect("skip").is_empty());
    }

    #[test]
    fn byte_at_a_time_input_is_accepted() {
        let mut frame = header(0x70, 0x40);
        frame.extend_from_slice(&(4u32 | UNCOMPRESSED_BIT).to_le_bytes());
        frame.extend_from_slice(b"data");
        frame.extend_from_slice(&xxh32(b"data", 0).to_le_bytes());
        frame.extend_from_slice(&0u32.to_le_bytes());

        let mut reader = FrameReader::new();
        let mut out = [0u8; 16];
        let mut produced = 0;
        let mut ended = false;
        for byte in &frame {
            let step = reader
                .step(std::slice::from_ref(byte), &mut out[produced..])
                .expect("step");
            assert_eq!(step.consumed, 1);
            produced += step.produced;
            ended = step.is_end();
        }
        assert!(ended);
        assert_eq!(&out[..produced], b"data");
    }

    #[test]
    fn block_checksum_mismatch_is_rejected() {
        let mut frame = header(0x70, 0x40);
        frame.extend_from_slice(&(4u32 | UNCOMPRESSED_BIT).to_le_bytes());
        frame.extend_from_slice(b"data");
        frame.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let err = decode_all(&frame).expect_err("bad block checksum");
        assert_eq!(err.code(), Some(LZ4F_BLOCK_CHECKSUM_INVALID));
    }

    #[test]
    fn writer_output_is_readable_with_small_output_slices() {
        let info = FrameInfo::new().content_checksum(true);
        let mut writer = FrameWriter::new(info, 64 * 1024);
        let payload = b"small slices small slices small slices".repeat(20);
        let mut compressed = Vec::new();
        let mut consumed = 0;
        let mut out = [0u8; 7];
        loop {
            let step = writer
                .step(&payload[consumed..], &mut out, FlushMode::Finish)
                .expect("step");
            consumed += step.consumed;
            compressed.extend_from_slice(&out[..step.produced]);
            if step.is_end() {
                break;
            }
        }
        assert_eq!(consumed, payload.len());
        assert_eq!(&compressed[..4], &FRAME_MAGIC.to_le_bytes());

        let mut reader = FrameReader::new();
        let mut decoded = vec![0u8; payload.len()];
        let step = reader.step(&compressed, &mut decoded).expect("decode");
        assert!(step.is_end());
        assert_eq!(decoded, payload);
    }
}
