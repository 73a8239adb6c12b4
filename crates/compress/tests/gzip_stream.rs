//! Comprehensive tests for the deflate adapters.
//!
//! This test suite focuses on:
//! 1. Round trips through gzip, zlib and raw framing
//! 2. Multi-member streams walked with `reset`
//! 3. Interoperability with plain `flate2` readers and writers
//! 4. Error reporting for corrupt and truncated input

#![cfg(feature = "gzip")]

use std::io::{Cursor, Read, Write};

use compress::gzip::{
    GzipDecoder, GzipEncoder, GzipFormat, GzipOptions, GzipStream, MIN_COMPRESS_BUFFER_SIZE,
    Z_DATA_ERROR, Z_STREAM_ERROR, compress_to_vec, decompress_to_vec,
};
use compress::{Backend, CompressionLevel, Direction, Error};
use proptest::prelude::*;
use test_support::{ChunkedReader, InterruptingReader, compressible, payload};

const TEXT: &[u8] = b"Just some test string to compress";

fn encode(options: &GzipOptions, data: &[u8]) -> Vec<u8> {
    let mut encoder = GzipEncoder::new(Vec::new(), options).expect("encoder");
    encoder.write_all(data).expect("write");
    encoder.into_inner().expect("finish")
}

fn decode(options: &GzipOptions, data: &[u8]) -> Vec<u8> {
    let mut decoder = GzipDecoder::new(data, options).expect("decoder");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    out
}

// =============================================================================
// SECTION 1: Round Trips
// =============================================================================

#[test]
fn gzip_round_trip_default_options() {
    let options = GzipOptions::default();
    let data = compressible(100_000);
    let compressed = encode(&options, &data);
    assert!(compressed.len() < data.len() / 10);
    assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    assert_eq!(decode(&options, &compressed), data);
}

#[test]
fn zlib_and_raw_framings_round_trip() {
    let data = payload(20_000, 3);
    for format in [GzipFormat::Zlib, GzipFormat::Raw] {
        let options = GzipOptions::new().with_format(format);
        let compressed = encode(&options, &data);
        assert_eq!(decode(&options, &compressed), data, "{format:?}");
    }
}

#[test]
fn every_level_round_trips() {
    let data = compressible(8_192);
    for level in 0..=9 {
        let level = CompressionLevel::from_numeric(level).expect("valid level");
        let options = GzipOptions::new().with_level(level);
        assert_eq!(decode(&options, &encode(&options, &data)), data);
    }
}

#[test]
fn small_window_round_trips() {
    let options = GzipOptions::new()
        .with_format(GzipFormat::Zlib)
        .with_window_bits(9);
    let data = compressible(50_000);
    assert_eq!(decode(&options, &encode(&options, &data)), data);
}

#[test]
fn window_bits_out_of_range_are_rejected() {
    for bits in [0, 8, 16] {
        let options = GzipOptions::new().with_window_bits(bits);
        let err = GzipEncoder::new(Vec::new(), &options).err().expect("refused");
        assert!(
            matches!(err, Error::CodecInit { code: Z_STREAM_ERROR, .. }),
            "{bits}: {err}"
        );
    }
}

#[test]
fn tiny_buffers_still_round_trip() {
    let writer = GzipOptions::new().with_buffer_size(MIN_COMPRESS_BUFFER_SIZE);
    let reader = GzipOptions::new().with_buffer_size(1);
    let data = payload(4_000, 11);
    assert_eq!(decode(&reader, &encode(&writer, &data)), data);
}

#[test]
fn compress_buffer_below_minimum_is_rejected() {
    for size in 1..MIN_COMPRESS_BUFFER_SIZE {
        let options = GzipOptions::new().with_buffer_size(size);
        let err = GzipEncoder::new(Vec::new(), &options).err().expect("rejected");
        assert!(matches!(err, Error::InvalidArgument(_)), "{size}: {err}");
        GzipDecoder::new(&b""[..], &options).expect("decoder accepts any size");
    }
}

#[test]
fn one_byte_reads_from_source() {
    let options = GzipOptions::default();
    let data = compressible(10_000);
    let compressed = encode(&options, &data);
    let source = ChunkedReader::new(Cursor::new(compressed), 1);
    let mut decoder = GzipDecoder::new(source, &options).expect("decoder");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    assert_eq!(out, data);
}

#[test]
fn interrupted_source_is_retried() {
    let options = GzipOptions::default();
    let compressed = encode(&options, b"interrupted but intact");
    let mut decoder =
        GzipDecoder::new(InterruptingReader::new(&compressed[..]), &options).expect("decoder");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    assert_eq!(out, b"interrupted but intact");
}

#[test]
fn empty_input_produces_empty_output() {
    let options = GzipOptions::default();
    let compressed = encode(&options, b"");
    assert!(compressed.is_empty());
    assert!(decode(&options, &compressed).is_empty());
}

// =============================================================================
// SECTION 2: Members and Flushing
// =============================================================================

#[test]
fn reset_writes_separate_members() {
    let options = GzipOptions::default();
    let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    encoder.write_all(b"first member").expect("write");
    encoder.reset().expect("reset");
    encoder.write_all(b"second member").expect("write");
    let compressed = encoder.into_inner().expect("finish");

    let mut decoder = GzipDecoder::new(&compressed[..], &options).expect("decoder");
    let mut first = Vec::new();
    decoder.read_to_end(&mut first).expect("first");
    assert_eq!(first, b"first member");
    assert!(decoder.is_member_finished());

    decoder.reset().expect("reset");
    let mut second = Vec::new();
    decoder.read_to_end(&mut second).expect("second");
    assert_eq!(second, b"second member");

    decoder.reset().expect("reset");
    let mut rest = Vec::new();
    assert_eq!(decoder.read_to_end(&mut rest).expect("rest"), 0);

    assert_eq!(decompress_to_vec(&compressed).expect("all"), b"first membersecond member");
}

#[test]
fn reset_without_writes_emits_nothing() {
    let options = GzipOptions::default();
    let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    encoder.reset().expect("reset");
    encoder.reset().expect("reset");
    assert!(encoder.into_inner().expect("finish").is_empty());
}

#[test]
fn flush_makes_written_data_decodable() {
    let options = GzipOptions::new().with_format(GzipFormat::Raw);
    let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    encoder.write_all(b"visible after flush").expect("write");
    encoder.flush().expect("flush");
    let partial = encoder.get_ref().expect("sink").clone();

    let mut inflater = flate2::Decompress::new(false);
    let mut out = Vec::with_capacity(64);
    inflater
        .decompress_vec(&partial, &mut out, flate2::FlushDecompress::Sync)
        .expect("inflate flushed data");
    assert_eq!(out, b"visible after flush");
}

#[test]
fn flush_with_smallest_buffer_emits_one_marker() {
    let flushed = |options: &GzipOptions| {
        let mut encoder = GzipEncoder::new(Vec::new(), options).expect("encoder");
        encoder.write_all(TEXT).expect("write");
        encoder.flush().expect("flush");
        let after_flush = encoder.total_out();
        let compressed = encoder.into_inner().expect("finish");
        assert_eq!(decompress_to_vec(&compressed).expect("decode"), TEXT);
        after_flush
    };
    let smallest = GzipOptions::new().with_buffer_size(MIN_COMPRESS_BUFFER_SIZE);
    assert_eq!(flushed(&smallest), flushed(&GzipOptions::default()));
}

#[test]
fn empty_write_does_not_start_a_member() {
    let mut encoder = GzipEncoder::new(Vec::new(), &GzipOptions::default()).expect("encoder");
    assert_eq!(encoder.write(&[]).expect("empty write"), 0);
    encoder.flush().expect("flush");
    assert!(encoder.into_inner().expect("finish").is_empty());
}

#[test]
fn reset_skips_unread_remainder_of_member() {
    let options = GzipOptions::default();
    let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    encoder.write_all(&compressible(30_000)).expect("write");
    encoder.reset().expect("reset");
    encoder.write_all(b"tail").expect("write");
    let compressed = encoder.into_inner().expect("finish");

    let mut decoder = GzipDecoder::new(&compressed[..], &options).expect("decoder");
    let mut head = [0u8; 10];
    decoder.read_exact(&mut head).expect("head");
    decoder.reset().expect("reset");
    let mut tail = Vec::new();
    decoder.read_to_end(&mut tail).expect("tail");
    assert_eq!(tail, b"tail");
}

// =============================================================================
// SECTION 3: Interoperability
// =============================================================================

#[test]
fn output_is_readable_by_flate2() {
    let data = payload(12_345, 5);
    let compressed = encode(&GzipOptions::default(), &data);
    let mut out = Vec::new();
    flate2::read::GzDecoder::new(&compressed[..])
        .read_to_end(&mut out)
        .expect("flate2 decode");
    assert_eq!(out, data);
}

#[test]
fn decodes_flate2_output() {
    let data = compressible(9_000);
    let mut writer = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    writer.write_all(&data).expect("write");
    let compressed = writer.finish().expect("finish");
    let options = GzipOptions::new().with_format(GzipFormat::Zlib);
    assert_eq!(decode(&options, &compressed), data);
}

#[test]
fn duplex_stream_round_trip() {
    let options = GzipOptions::default();
    let mut stream =
        GzipStream::new(Cursor::new(Vec::new()), Direction::Compress, &options).expect("stream");
    assert_eq!(stream.backend(), Backend::Deflate);
    stream.write_all(b"duplex payload").expect("write");
    let compressed = stream.into_inner().expect("finish").into_inner();

    let mut stream =
        GzipStream::new(Cursor::new(compressed), Direction::Decompress, &options).expect("stream");
    let mut out = Vec::new();
    stream.read_to_end(&mut out).expect("read");
    assert_eq!(out, b"duplex payload");
}

// =============================================================================
// SECTION 4: Errors
// =============================================================================

#[test]
fn corrupt_input_reports_data_error() {
    let options = GzipOptions::new().with_format(GzipFormat::Zlib);
    let mut compressed = encode(&options, &compressible(1_000));
    compressed[0] ^= 0xff;
    let mut decoder = GzipDecoder::new(&compressed[..], &options).expect("decoder");
    let mut out = Vec::new();
    let err = decoder.read_to_end(&mut out).expect_err("corrupt header");
    let typed = Error::from_io(&err).expect("typed error");
    assert_eq!(typed.code(), Some(Z_DATA_ERROR));
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
}

#[test]
fn truncated_member_is_reported() {
    let options = GzipOptions::default();
    let compressed = encode(&options, &payload(5_000, 9));
    let cut = &compressed[..compressed.len() - 6];
    let mut decoder = GzipDecoder::new(cut, &options).expect("decoder");
    let mut out = Vec::new();
    let err = decoder.read_to_end(&mut out).expect_err("truncated");
    assert!(matches!(
        Error::from_io(&err),
        Some(Error::Truncated {
            backend: Backend::Deflate
        })
    ));
}

#[test]
fn one_shot_helpers_agree_with_adapters() {
    let data = compressible(4_096);
    let compressed = compress_to_vec(&data, CompressionLevel::Best).expect("compress");
    assert_eq!(decode(&GzipOptions::default(), &compressed), data);
}

// =============================================================================
// SECTION 5: Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn arbitrary_data_round_trips(data in prop::collection::vec(any::<u8>(), 0..4096), chunk in 1usize..512) {
        let options = GzipOptions::new().with_buffer_size(257);
        let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
        for piece in data.chunks(chunk) {
            encoder.write_all(piece).expect("write");
        }
        let compressed = encoder.into_inner().expect("finish");

        let source = ChunkedReader::new(&compressed[..], chunk);
        let mut decoder = GzipDecoder::new(source, &options).expect("decoder");
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).expect("read");
        prop_assert_eq!(out, data);
    }
}
