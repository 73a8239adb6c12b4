//! Backend identity and the process-wide availability registry.
//!
//! Codecs are linked at build time, so "loading" a backend means checking that
//! its cargo feature is compiled in and that the environment does not disable
//! it. The outcome is computed once per backend and cached for the lifetime of
//! the process.
//!
//! Two environment variables are consulted per backend, with `<NAME>` being the
//! upper-cased canonical name (`ZLIB`, `LZMA`, `LZ4`, `LZO`):
//!
//! - `CODEC_STREAMS_DISABLE_<NAME>`: any non-empty value refuses the backend.
//! - `CODEC_STREAMS_NATIVE_<NAME>`: recorded in [`BackendInfo::search_path`]
//!   for diagnostics.

use core::fmt;
use core::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::trace;

/// Prefix of the variable that refuses a backend.
pub const DISABLE_ENV_PREFIX: &str = "CODEC_STREAMS_DISABLE_";
/// Prefix of the variable that records a native search path override.
pub const NATIVE_ENV_PREFIX: &str = "CODEC_STREAMS_NATIVE_";

/// Compression backends known to the crate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Backend {
    /// Deflate with gzip, zlib or raw framing.
    Deflate,
    /// LZMA2 in `.xz` containers or legacy `.lzma` streams.
    Lzma,
    /// LZ4 frame format.
    Lz4,
    /// LZO1X blocks.
    Lzo,
}

impl Backend {
    /// Every backend, in registry order.
    pub const ALL: [Self; 4] = [Self::Deflate, Self::Lzma, Self::Lz4, Self::Lzo];

    /// Returns the canonical name used for environment variables and diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "zlib",
            Self::Lzma => "lzma",
            Self::Lz4 => "lz4",
            Self::Lzo => "lzo",
        }
    }

    /// Returns `true` when the backend's cargo feature is compiled in.
    #[must_use]
    pub const fn is_compiled(self) -> bool {
        match self {
            Self::Deflate => cfg!(feature = "gzip"),
            Self::Lzma => cfg!(feature = "lzma"),
            Self::Lz4 => cfg!(feature = "lz4"),
            Self::Lzo => cfg!(feature = "lzo"),
        }
    }

    /// Returns the backends compiled into the current build.
    #[must_use]
    pub fn compiled() -> Vec<Self> {
        Self::ALL.into_iter().filter(|b| b.is_compiled()).collect()
    }

    const fn index(self) -> usize {
        match self {
            Self::Deflate => 0,
            Self::Lzma => 1,
            Self::Lz4 => 2,
            Self::Lzo => 3,
        }
    }

    fn env_suffix(self) -> String {
        self.name().to_ascii_uppercase()
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when attempting to parse an unknown backend name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackendParseError {
    input: String,
}

impl BackendParseError {
    /// Returns the rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for BackendParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown compression backend: {}", self.input)
    }
}

impl std::error::Error for BackendParseError {}

impl FromStr for Backend {
    type Err = BackendParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zlib" | "gzip" | "deflate" => Ok(Self::Deflate),
            "lzma" | "xz" => Ok(Self::Lzma),
            "lz4" => Ok(Self::Lz4),
            "lzo" | "lzo2" => Ok(Self::Lzo),
            other => Err(BackendParseError {
                input: other.to_string(),
            }),
        }
    }
}

/// Description of a loaded backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackendInfo {
    backend: Backend,
    arch_dir: Option<&'static str>,
    search_path: Option<String>,
}

impl BackendInfo {
    /// The backend this entry describes.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Architecture directory name for the running target (`x64`, `x86`, `arm`).
    #[must_use]
    pub const fn arch_dir(&self) -> Option<&'static str> {
        self.arch_dir
    }

    /// Search path override taken from `CODEC_STREAMS_NATIVE_<NAME>`.
    #[must_use]
    pub fn search_path(&self) -> Option<&str> {
        self.search_path.as_deref()
    }
}

/// Architecture directory name for the compilation target.
#[must_use]
pub const fn arch_dir() -> Option<&'static str> {
    if cfg!(target_arch = "x86_64") {
        Some("x64")
    } else if cfg!(target_arch = "x86") {
        Some("x86")
    } else if cfg!(any(target_arch = "arm", target_arch = "aarch64")) {
        Some("arm")
    } else {
        None
    }
}

/// Decides whether `backend` is available, reading variables through `lookup`.
///
/// [`load`] calls this with the process environment; tests can pass a closure
/// over a fixed table instead.
pub fn resolve<F>(backend: Backend, lookup: F) -> Result<BackendInfo, String>
where
    F: Fn(&str) -> Option<String>,
{
    if !backend.is_compiled() {
        return Err(format!(
            "the `{}` feature is not compiled into this build",
            feature_name(backend)
        ));
    }

    let suffix = backend.env_suffix();
    let disable_var = format!("{DISABLE_ENV_PREFIX}{suffix}");
    if lookup(&disable_var).is_some_and(|value| !value.is_empty()) {
        return Err(format!("disabled by {disable_var}"));
    }

    let search_path = lookup(&format!("{NATIVE_ENV_PREFIX}{suffix}")).filter(|v| !v.is_empty());
    Ok(BackendInfo {
        backend,
        arch_dir: arch_dir(),
        search_path,
    })
}

/// Loads `backend` once per process and returns the cached description.
pub fn load(backend: Backend) -> Result<&'static BackendInfo> {
    static REGISTRY: [OnceLock<Result<BackendInfo, String>>; 4] =
        [const { OnceLock::new() }; 4];

    let entry = REGISTRY[backend.index()].get_or_init(|| {
        let outcome = resolve(backend, |name| std::env::var(name).ok());
        match &outcome {
            Ok(info) => trace::backend_loaded(backend, info.search_path()),
            Err(reason) => trace::backend_refused(backend, reason),
        }
        outcome
    });

    entry.as_ref().map_err(|reason| Error::BackendLoad {
        backend,
        reason: reason.clone(),
    })
}

const fn feature_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Deflate => "gzip",
        Backend::Lzma => "lzma",
        Backend::Lz4 => "lz4",
        Backend::Lzo => "lzo",
    }
}
