//! Comprehensive tests for adapter lifecycle and state transitions.
//!
//! This test suite focuses on:
//! 1. Close, drop and `into_inner` ordering
//! 2. Use-after-close guards
//! 3. Direction guards on `CodecStream`
//! 4. Sink and source failures surfacing through the adapters

#![cfg(feature = "gzip")]

use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};

use compress::gzip::{GzipDecoder, GzipEncoder, GzipOptions, GzipStream, decompress_to_vec};
use compress::{Capabilities, Direction, Error, StreamOptions};
use test_support::{FailingWriter, FlushCounter, compressible};

// =============================================================================
// SECTION 1: Close and Drop
// =============================================================================

#[test]
fn close_is_idempotent() {
    let mut encoder = GzipEncoder::new(Vec::new(), &GzipOptions::default()).expect("encoder");
    encoder.write_all(b"payload").expect("write");
    encoder.close().expect("close");
    encoder.close().expect("second close");
    assert!(encoder.is_closed());

    let compressed = compressible(10);
    let mut decoder =
        GzipDecoder::new(&compressed[..], &GzipOptions::default()).expect("decoder");
    decoder.close().expect("close");
    decoder.close().expect("second close");
    assert!(decoder.is_closed());
}

#[test]
fn close_drops_sink_by_default() {
    let mut encoder = GzipEncoder::new(Vec::new(), &GzipOptions::default()).expect("encoder");
    encoder.write_all(b"payload").expect("write");
    encoder.close().expect("close");
    assert!(encoder.get_ref().is_none());
}

#[test]
fn leave_open_keeps_sink_after_close() {
    let options = GzipOptions::new().with_close_underlying(false);
    let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    encoder.write_all(b"kept sink").expect("write");
    encoder.close().expect("close");
    let compressed = encoder.get_ref().expect("sink kept").clone();
    assert_eq!(decompress_to_vec(&compressed).expect("decode"), b"kept sink");
}

#[test]
fn close_without_writes_emits_nothing() {
    let options = GzipOptions::new().with_close_underlying(false);
    let mut encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    encoder.close().expect("close");
    assert!(encoder.get_ref().expect("sink").is_empty());
    assert_eq!(encoder.total_out(), 0);
}

#[test]
fn drop_finishes_the_member() {
    let mut sink = Vec::new();
    {
        let mut encoder = GzipEncoder::new(&mut sink, &GzipOptions::default()).expect("encoder");
        encoder.write_all(b"finished on drop").expect("write");
    }
    assert_eq!(decompress_to_vec(&sink).expect("decode"), b"finished on drop");
}

#[test]
fn into_inner_returns_finished_sink() {
    let mut encoder = GzipEncoder::new(Cursor::new(Vec::new()), &GzipOptions::default())
        .expect("encoder");
    encoder.write_all(b"cursor sink").expect("write");
    let cursor = encoder.into_inner().expect("finish");
    assert_eq!(decompress_to_vec(cursor.get_ref()).expect("decode"), b"cursor sink");
}

#[test]
fn decoder_into_inner_returns_source() {
    let compressed = compress::gzip::compress_to_vec(b"abc", compress::CompressionLevel::Fast)
        .expect("compress");
    let mut decoder =
        GzipDecoder::new(Cursor::new(compressed), &GzipOptions::default()).expect("decoder");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    let source = decoder.into_inner().expect("source");
    assert_eq!(source.position(), source.get_ref().len() as u64);
}

// =============================================================================
// SECTION 2: Use After Close
// =============================================================================

#[test]
fn encoder_rejects_use_after_close() {
    let mut encoder = GzipEncoder::new(Vec::new(), &GzipOptions::default()).expect("encoder");
    encoder.close().expect("close");
    assert!(matches!(encoder.write_bytes(b"x"), Err(Error::ObjectDisposed(_))));
    assert!(matches!(encoder.flush_stream(), Err(Error::ObjectDisposed(_))));
    assert!(matches!(encoder.reset(), Err(Error::ObjectDisposed(_))));
    let err = encoder.write(b"x").expect_err("io write");
    assert!(matches!(Error::from_io(&err), Some(Error::ObjectDisposed(_))));
}

#[test]
fn decoder_rejects_use_after_close() {
    let mut decoder = GzipDecoder::new(&b""[..], &GzipOptions::default()).expect("decoder");
    decoder.close().expect("close");
    let mut buf = [0u8; 8];
    assert!(matches!(decoder.read_bytes(&mut buf), Err(Error::ObjectDisposed(_))));
    assert!(matches!(decoder.reset(), Err(Error::ObjectDisposed(_))));
}

// =============================================================================
// SECTION 3: Reads at Member Boundaries
// =============================================================================

#[test]
fn reads_after_member_end_return_zero() {
    let compressed = compress::gzip::compress_to_vec(b"once", compress::CompressionLevel::Fast)
        .expect("compress");
    let mut decoder =
        GzipDecoder::new(&compressed[..], &GzipOptions::default()).expect("decoder");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    let mut buf = [0u8; 16];
    assert_eq!(decoder.read(&mut buf).expect("after end"), 0);
    assert_eq!(decoder.read(&mut buf).expect("again"), 0);
}

#[test]
fn empty_read_buffer_returns_zero() {
    let compressed = compress::gzip::compress_to_vec(b"data", compress::CompressionLevel::Fast)
        .expect("compress");
    let mut decoder =
        GzipDecoder::new(&compressed[..], &GzipOptions::default()).expect("decoder");
    assert_eq!(decoder.read(&mut []).expect("empty"), 0);
    assert_eq!(decoder.total_in(), 0);
}

#[test]
fn empty_source_reads_zero() {
    let mut decoder = GzipDecoder::new(&b""[..], &GzipOptions::default()).expect("decoder");
    let mut buf = [0u8; 8];
    assert_eq!(decoder.read(&mut buf).expect("empty source"), 0);
    assert!(!decoder.is_member_finished());
}

#[test]
fn counters_track_both_sides() {
    let data = compressible(20_000);
    let mut encoder = GzipEncoder::new(Vec::new(), &GzipOptions::default()).expect("encoder");
    encoder.write_all(&data).expect("write");
    encoder.close().expect("close");
    assert_eq!(encoder.total_in(), data.len() as u64);
    let written = encoder.total_out();
    assert!(written > 0);

    let compressed = compress::gzip::compress_to_vec(&data, compress::CompressionLevel::Default)
        .expect("compress");
    let mut decoder =
        GzipDecoder::new(&compressed[..], &GzipOptions::default()).expect("decoder");
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).expect("read");
    assert_eq!(decoder.total_in(), compressed.len() as u64);
    assert_eq!(decoder.total_out(), data.len() as u64);
}

// =============================================================================
// SECTION 4: CodecStream
// =============================================================================

#[test]
fn capabilities_follow_direction_and_state() {
    let options = GzipOptions::default();
    let mut compress =
        GzipStream::new(Cursor::new(Vec::new()), Direction::Compress, &options).expect("stream");
    assert_eq!(compress.direction(), Direction::Compress);
    assert_eq!(
        compress.capabilities(),
        Capabilities {
            can_read: false,
            can_write: true,
            can_seek: false
        }
    );
    compress.close().expect("close");
    assert_eq!(compress.capabilities(), Capabilities::default());

    let mut decompress =
        GzipStream::new(Cursor::new(Vec::new()), Direction::Decompress, &options).expect("stream");
    assert!(decompress.capabilities().can_read);
    assert!(!decompress.capabilities().can_write);
    decompress.close().expect("close");
    assert!(!decompress.capabilities().can_read);
}

#[test]
fn direction_mismatch_is_unsupported() {
    let options = GzipOptions::default();
    let mut compress =
        GzipStream::new(Cursor::new(Vec::new()), Direction::Compress, &options).expect("stream");
    let mut buf = [0u8; 4];
    let err = compress.read(&mut buf).expect_err("read");
    assert_eq!(err.kind(), ErrorKind::Unsupported);

    let mut decompress =
        GzipStream::new(Cursor::new(Vec::new()), Direction::Decompress, &options).expect("stream");
    let err = decompress.write(b"data").expect_err("write");
    assert!(matches!(Error::from_io(&err), Some(Error::UnsupportedOperation(_))));
    decompress.flush().expect("flush is a no-op when decompressing");
}

#[test]
fn seek_is_never_supported() {
    let mut stream = GzipStream::new(
        Cursor::new(Vec::new()),
        Direction::Compress,
        &GzipOptions::default(),
    )
    .expect("stream");
    let err = stream.seek(SeekFrom::Start(0)).expect_err("seek");
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

#[test]
fn flush_on_closed_decompressing_stream_is_disposed() {
    let mut stream = GzipStream::new(
        Cursor::new(Vec::new()),
        Direction::Decompress,
        &GzipOptions::default(),
    )
    .expect("stream");
    stream.close().expect("close");
    let err = stream.flush().expect_err("flush after close");
    assert!(matches!(Error::from_io(&err), Some(Error::ObjectDisposed(_))));
}

// =============================================================================
// SECTION 5: Options and Sink Failures
// =============================================================================

#[test]
fn zero_buffer_size_is_invalid() {
    let options = GzipOptions::new().with_stream_options(StreamOptions::new().with_buffer_size(0));
    let err = GzipEncoder::new(Vec::new(), &options).err().expect("rejected");
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn buffer_size_override_is_used() {
    let options = GzipOptions::new().with_buffer_size(123);
    let encoder = GzipEncoder::new(Vec::new(), &options).expect("encoder");
    assert_eq!(encoder.buffer_capacity(), 123);
    let decoder = GzipDecoder::new(&b""[..], &GzipOptions::default()).expect("decoder");
    assert_eq!(decoder.buffer_capacity(), compress::gzip::DEFAULT_BUFFER_SIZE);
}

#[test]
fn sink_failure_surfaces_as_io_error() {
    let options = GzipOptions::new().with_buffer_size(64);
    let mut encoder = GzipEncoder::new(FailingWriter::new(16), &options).expect("encoder");
    let data = test_support::payload(200_000, 1);
    let err = encoder.write_all(&data).expect_err("sink fails");
    assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    assert!(Error::from_io(&err).is_none());
}

#[test]
fn flush_reaches_the_sink() {
    let mut encoder = GzipEncoder::new(FlushCounter::default(), &GzipOptions::default())
        .expect("encoder");
    encoder.write_all(b"flushed").expect("write");
    encoder.flush().expect("flush");
    let sink = encoder.get_ref().expect("sink");
    assert_eq!(sink.flushes, 1);
    assert!(!sink.data.is_empty());
}
