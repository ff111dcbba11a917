#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Turnstile
//!
//! Keyed request admission control: fixed-window rate limiting with pluggable
//! key extraction and HTTP middleware.
//!
//! ## Features
//!
//! - **Fixed-window limiter** with lazy per-key buckets and explicit refill
//!   semantics, safe under concurrent use
//! - **Tower middleware** that guards any service behind a limiter
//! - **Axum adapter** answering HTTP 429 with a JSON body and `Retry-After`
//! - **Named profiles** (guest / auth / user) sourced from the environment
//! - **Injectable clock** for deterministic window-expiry tests
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use turnstile::{Limiter, LimiterConfig};
//!
//! # fn main() -> Result<(), turnstile::ConfigError> {
//! let limiter = Limiter::new(LimiterConfig::new(3, Duration::from_secs(60))?);
//!
//! for _ in 0..3 {
//!     assert!(limiter.consume("1.2.3.4").is_admitted());
//! }
//! assert!(!limiter.consume("1.2.3.4").is_admitted());
//! # Ok(())
//! # }
//! ```

mod bucket;

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod middleware;

// Re-exports
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Profile, ProfileSet, ProfileSettings};
pub use error::{AdmissionError, ConfigError};
pub use http::{KeyStrategy, Principal, RouteGuard};
pub use limiter::{Limiter, LimiterConfig, Outcome};
pub use middleware::{AdmissionLayer, AdmissionService, KeyExtractor};
