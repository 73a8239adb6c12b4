//! # Overview
//!
//! Error taxonomy shared by every adapter and codec session in the crate.
//!
//! # Design
//!
//! [`Error`] is the single error type returned by fallible constructors and
//! lifecycle methods. The [`std::io::Read`]/[`std::io::Write`] implementations
//! have to return [`std::io::Error`], so `From<Error> for io::Error` wraps the
//! typed value with a matching [`io::ErrorKind`]. [`Error::from_io`] recovers
//! the typed error again on the caller side.
//!
//! # Errors
//!
//! | Variant | `io::ErrorKind` |
//! |---------|-----------------|
//! | [`Error::InvalidArgument`] | `InvalidInput` |
//! | [`Error::ObjectDisposed`] | `Other` |
//! | [`Error::UnsupportedOperation`] | `Unsupported` |
//! | [`Error::Allocation`], [`Error::OutOfMemory`] | `OutOfMemory` |
//! | [`Error::CodecInit`], [`Error::BackendLoad`] | `Other` |
//! | [`Error::Codec`] | `InvalidData` |
//! | [`Error::Truncated`] | `UnexpectedEof` |
//! | [`Error::Io`] | unwrapped unchanged |

use std::io;

use crate::backend::Backend;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by codec sessions, adapters and the backend registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller supplied a parameter outside its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The adapter or session was used after it was closed.
    #[error("cannot access a closed {0}")]
    ObjectDisposed(&'static str),

    /// The operation does not apply to the adapter's direction or kind.
    #[error("operation not supported: {0}")]
    UnsupportedOperation(&'static str),

    /// A staging buffer could not be reserved.
    #[error("failed to allocate a {size}-byte buffer")]
    Allocation {
        /// Requested capacity in bytes.
        size: usize,
    },

    /// The backend rejected the options used to create a session.
    #[error("{backend} codec initialisation failed ({code}): {message}")]
    CodecInit {
        /// Backend that refused the options.
        backend: Backend,
        /// Backend-native status code.
        code: i32,
        /// Human readable description.
        message: String,
    },

    /// The backend reported an error while processing data.
    #[error("{backend} codec error ({code}): {message}")]
    Codec {
        /// Backend that failed.
        backend: Backend,
        /// Backend-native status code.
        code: i32,
        /// Human readable description.
        message: String,
    },

    /// The backend ran out of memory or hit its memory limit.
    #[error("{backend} codec ran out of memory ({code})")]
    OutOfMemory {
        /// Backend that failed.
        backend: Backend,
        /// Backend-native status code.
        code: i32,
    },

    /// The backend is not available in this process.
    #[error("{backend} backend is unavailable: {reason}")]
    BackendLoad {
        /// Backend that could not be loaded.
        backend: Backend,
        /// Why the registry refused it.
        reason: String,
    },

    /// The source ended in the middle of a member or frame.
    #[error("unexpected end of {backend} stream")]
    Truncated {
        /// Backend whose stream was cut short.
        backend: Backend,
    },

    /// The sink or source failed.
    #[error(transparent)]
    Io(io::Error),
}

impl Error {
    /// Builds an [`Error::Codec`] value.
    pub(crate) fn codec(backend: Backend, code: i32, message: impl Into<String>) -> Self {
        Self::Codec {
            backend,
            code,
            message: message.into(),
        }
    }

    /// Builds an [`Error::CodecInit`] value.
    pub(crate) fn codec_init(backend: Backend, code: i32, message: impl Into<String>) -> Self {
        Self::CodecInit {
            backend,
            code,
            message: message.into(),
        }
    }

    /// Builds an [`Error::InvalidArgument`] value.
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns the [`io::ErrorKind`] this error maps to.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            Self::UnsupportedOperation(_) => io::ErrorKind::Unsupported,
            Self::Allocation { .. } | Self::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            Self::Codec { .. } => io::ErrorKind::InvalidData,
            Self::Truncated { .. } => io::ErrorKind::UnexpectedEof,
            Self::ObjectDisposed(_) | Self::CodecInit { .. } | Self::BackendLoad { .. } => {
                io::ErrorKind::Other
            }
            Self::Io(err) => err.kind(),
        }
    }

    /// Recovers the typed error carried by an [`io::Error`] produced by this crate.
    ///
    /// Returns `None` for I/O errors that originate from the sink or source.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Option<&Self> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Self>())
    }

    /// Returns the backend-native status code when the error carries one.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::CodecInit { code, .. } | Self::Codec { code, .. } | Self::OutOfMemory { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Unwraps errors that already carry an [`Error`] so typed values survive
    /// a round trip through [`std::io::Read`]/[`std::io::Write`].
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            return Self::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(typed)) => *typed,
            Some(Err(other)) => Self::Io(io::Error::new(kind, other)),
            None => Self::Io(io::Error::from(kind)),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(inner) => inner,
            other => Self::new(other.kind(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_conversion_preserves_kind_and_payload() {
        let err = Error::Truncated {
            backend: Backend::Deflate,
        };
        let io_err = io::Error::from(err);
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
        let typed = Error::from_io(&io_err).expect("typed payload");
        assert!(matches!(typed, Error::Truncated { backend: Backend::Deflate }));
    }

    #[test]
    fn io_variant_unwraps_without_boxing() {
        let original = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let io_err = io::Error::from(Error::Io(original));
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);
        assert!(Error::from_io(&io_err).is_none());
    }

    #[test]
    fn typed_error_survives_io_round_trip() {
        let io_err = io::Error::from(Error::ObjectDisposed("stream"));
        let back = Error::from(io_err);
        assert!(matches!(back, Error::ObjectDisposed("stream")));

        let plain = Error::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert!(matches!(plain, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn kinds_follow_the_mapping_table() {
        assert_eq!(
            Error::invalid_argument("x").kind(),
            io::ErrorKind::InvalidInput
        );
        assert_eq!(
            Error::UnsupportedOperation("seek").kind(),
            io::ErrorKind::Unsupported
        );
        assert_eq!(
            Error::Allocation { size: 1 }.kind(),
            io::ErrorKind::OutOfMemory
        );
        assert_eq!(
            Error::OutOfMemory {
                backend: Backend::Lzma,
                code: 5
            }
            .kind(),
            io::ErrorKind::OutOfMemory
        );
        assert_eq!(
            Error::codec(Backend::Lz4, 16, "bad block").kind(),
            io::ErrorKind::InvalidData
        );
        assert_eq!(
            Error::ObjectDisposed("stream").kind(),
            io::ErrorKind::Other
        );
    }

    #[test]
    fn code_is_exposed_for_backend_errors() {
        assert_eq!(Error::codec(Backend::Deflate, -3, "bad").code(), Some(-3));
        assert_eq!(
            Error::codec_init(Backend::Lzma, 8, "preset").code(),
            Some(8)
        );
        assert_eq!(Error::ObjectDisposed("stream").code(), None);
    }

    #[test]
    fn display_names_the_backend() {
        let err = Error::codec(Backend::Lzma, 9, "corrupt input");
        assert_eq!(err.to_string(), "lzma codec error (9): corrupt input");
    }
}
