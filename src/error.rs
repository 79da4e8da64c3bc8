//! Error types, result handling, and failure classification.
//!
//! This module defines the error handling system used throughout Hakken.
//! All operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.
//!
//! # Failure classification
//!
//! Every error carries a [`FailureKind`]: `Transient` failures (network
//! timeouts, refused connections, 5xx responses, rate limiting) are safe to
//! retry; `Permanent` failures (malformed URLs, unrecognized pages, 4xx
//! responses, parse errors) are not. The [`RetryPolicy`](crate::retry::RetryPolicy)
//! and the download layer both consult [`Error::kind`] so that the whole
//! crate shares one classification table. Anything without an explicit
//! classification is treated as permanent: failing fast beats retry-storming
//! an unknown failure mode.
//!
//! # Examples
//!
//! ```rust
//! use hakken::{Error, FailureKind};
//!
//! let err = Error::transient("hianime", "connection reset");
//! assert_eq!(err.kind(), FailureKind::Transient);
//!
//! let err = Error::parse("episode list markup changed");
//! assert_eq!(err.kind(), FailureKind::Permanent);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Quality;

/// Type alias for Results with Hakken errors.
///
/// All public APIs in Hakken return this Result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Whether a failure is worth retrying.
///
/// This is the stable, shared enumeration consumed by the retry policy and
/// by the download transfer layer. Adapters classify their own errors when
/// constructing [`Error::Source`] values; everything else is classified by
/// [`Error::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Retryable: network-level failures, timeouts, 5xx-equivalent responses.
    Transient,
    /// Not retryable: malformed input, unsupported operations, 4xx-equivalent
    /// responses, parse failures.
    Permanent,
}

/// Error type for all Hakken operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Network-related errors from HTTP operations.
    ///
    /// Wraps errors from the underlying HTTP client: connection timeouts,
    /// DNS resolution failures, TLS errors. Classified transient unless the
    /// request could not even be built (a malformed URL is permanent).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A per-source operation exceeded its deadline.
    ///
    /// Produced by the retry policy when the per-source timeout elapses.
    /// Deliberately distinct from [`Error::Source`] so callers can tell a
    /// slow source from a broken one.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The whole query was cancelled by the caller.
    ///
    /// A cancelled query produces no results; partial outcomes collected
    /// before the cancellation are discarded.
    #[error("query cancelled")]
    Cancelled,

    /// HTML/JSON parsing and data format errors.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hakken::Error;
    ///
    /// let error = Error::parse("missing title field in response");
    /// ```
    #[error("parse error: {0}")]
    Parse(String),

    /// Source-specific errors, classified by the adapter that raised them.
    ///
    /// # Fields
    ///
    /// * `src` - Name of the source that encountered the error
    /// * `kind` - Whether the failure is retryable
    /// * `message` - Descriptive error message
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hakken::Error;
    ///
    /// let error = Error::transient("animetsu", "backend returned 502");
    /// let error = Error::permanent("hianime", "unrecognized title URL");
    /// ```
    #[error("source error [{src}]: {message}")]
    Source {
        src: String,
        kind: FailureKind,
        message: String,
    },

    /// An adapter failed to construct from its configuration.
    ///
    /// The registry excludes the adapter and continues with the remainder;
    /// this error is only surfaced through explicit registry inspection.
    #[error("source [{src}] failed to register: {message}")]
    Registration { src: String, message: String },

    /// Resource not found errors.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hakken::Error;
    ///
    /// let error = Error::not_found("source: ghost");
    /// ```
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested quality tier is not available for an episode.
    #[error("quality {quality} unavailable for episode {episode}")]
    QualityUnavailable { quality: Quality, episode: u32 },

    /// Rate limiting responses from a source.
    ///
    /// Optionally carries the number of seconds to wait, taken from the
    /// source's `Retry-After` header.
    #[error("rate limited, retry after {retry_after:?} seconds")]
    RateLimit { retry_after: Option<u64> },

    /// File system and IO operation errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization and deserialization errors.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error messages.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a parse error with the given message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Creates a retryable source error.
    ///
    /// Use for failures the source may recover from on its own: dropped
    /// connections, upstream 5xx responses, flaky CDN edges.
    pub fn transient(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Source {
            src: src.into(),
            kind: FailureKind::Transient,
            message: msg.into(),
        }
    }

    /// Creates a non-retryable source error.
    ///
    /// Use for failures that will not go away by asking again: unrecognized
    /// URLs, removed pages, markup the parser no longer understands.
    pub fn permanent(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Source {
            src: src.into(),
            kind: FailureKind::Permanent,
            message: msg.into(),
        }
    }

    /// Creates a registration error for an adapter that failed to construct.
    pub fn registration(src: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Registration {
            src: src.into(),
            message: msg.into(),
        }
    }

    /// Creates a not found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a rate limit error with optional retry-after time.
    pub fn rate_limit(retry_after: Option<u64>) -> Self {
        Error::RateLimit { retry_after }
    }

    /// Returns the failure classification for this error.
    ///
    /// Unclassified variants default to [`FailureKind::Permanent`].
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Network(e) if e.is_builder() => FailureKind::Permanent,
            Error::Network(_) => FailureKind::Transient,
            Error::Timeout(_) => FailureKind::Transient,
            Error::RateLimit { .. } => FailureKind::Transient,
            Error::Io(_) => FailureKind::Transient,
            Error::Source { kind, .. } => *kind,
            _ => FailureKind::Permanent,
        }
    }

    /// Returns `true` if this error is safe to retry.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }

    /// Returns `true` if this is a per-source timeout outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns `true` if this is a whole-query cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
