//! Error types for admission control.

use std::fmt;
use std::time::Duration;

/// Invalid limiter or profile settings, raised at construction time.
///
/// A misconfigured limiter refuses to construct rather than silently falling
/// back to defaults; the caller should treat this as fatal for the affected
/// route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Capacity must admit at least one request per window.
    #[error("limiter capacity must be greater than zero")]
    ZeroCapacity,

    /// The window duration must be non-zero.
    #[error("limiter window must be greater than zero")]
    ZeroWindow,

    /// An environment variable was present but unparseable.
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidEnvVar { name: String, value: String },
}

/// Error surfaced by the tower admission middleware.
#[derive(Debug, Clone)]
pub enum AdmissionError<E> {
    /// The limiter rejected the request. Recoverable by the caller via
    /// backoff; no retry is attempted server-side.
    RateLimited {
        /// Time until the key's window ends and the bucket refills.
        retry_after: Duration,
    },
    /// The wrapped service failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for AdmissionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { retry_after } => {
                write!(f, "rate limit exceeded (retry after {:?})", retry_after)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AdmissionError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited { .. } => None,
        }
    }
}

impl<E> AdmissionError<E> {
    /// Check if this error is a limiter rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Time until the bucket refills, if this is a rejection.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            Self::Inner(_) => None,
        }
    }

    /// Check if this error wraps an inner service error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Get the inner error if this is an Inner variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited { .. } => None,
        }
    }

    /// Borrow the inner error if present.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::RateLimited { .. } => None,
        }
    }
}
