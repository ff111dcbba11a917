//! Axum adapter: per-route admission guards answering HTTP 429.
//!
//! A [`RouteGuard`] pairs a shared [`Limiter`] with the key strategy for one
//! route group. Wire it in front of protected handlers with
//! [`axum::middleware::from_fn_with_state`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use axum::{middleware, routing::get, Router};
//! use turnstile::{http, KeyStrategy, Limiter, LimiterConfig, RouteGuard};
//!
//! # fn main() -> Result<(), turnstile::ConfigError> {
//! let limiter = Arc::new(Limiter::new(LimiterConfig::new(50, Duration::from_secs(60))?));
//! let guard = RouteGuard::new(limiter, KeyStrategy::Ip);
//!
//! let app: Router = Router::new()
//!     .route("/api/courses", get(|| async { "ok" }))
//!     .layer(middleware::from_fn_with_state(guard, http::admit));
//! # Ok(())
//! # }
//! ```

use crate::limiter::{Limiter, Outcome};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Message body sent with every 429.
pub const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";

/// Bucket key used when no remote address is resolvable. All such requests
/// share one bucket, which is the safe direction to fail in.
const UNKNOWN_KEY: &str = "unknown";

#[derive(Debug, Serialize)]
struct RejectionBody {
    message: &'static str,
}

/// Authenticated principal identifier.
///
/// An upstream auth layer inserts this into the request extensions; the
/// [`KeyStrategy::PrincipalOrIp`] strategy reads it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

/// How the admission key is derived from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Remote IP address.
    Ip,
    /// Authenticated principal, falling back to the remote IP when absent.
    ///
    /// The fallback means unauthenticated requests routed through a
    /// principal-keyed guard are tracked per IP, so callers behind one NAT
    /// share a bucket. Accepted trade-off in the absence of identity.
    PrincipalOrIp,
}

/// Shared state for [`admit`]: one limiter plus its key strategy.
///
/// Each guard tracks its own bucket population; construct one per profile and
/// inject it into the router explicitly rather than via process-wide
/// singletons.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    limiter: Arc<Limiter>,
    strategy: KeyStrategy,
    trust_proxy: bool,
}

impl RouteGuard {
    /// Create a guard. Forwarded headers are ignored until
    /// [`RouteGuard::trust_proxy`] is called.
    pub fn new(limiter: Arc<Limiter>, strategy: KeyStrategy) -> Self {
        Self { limiter, strategy, trust_proxy: false }
    }

    /// Honor `X-Forwarded-For` from the upstream proxy.
    ///
    /// Only enable this when the server is reachable exclusively through a
    /// proxy it trusts; otherwise clients can spoof their bucket key.
    pub fn trust_proxy(mut self) -> Self {
        self.trust_proxy = true;
        self
    }

    /// The limiter backing this guard.
    pub fn limiter(&self) -> &Arc<Limiter> {
        &self.limiter
    }

    fn key_for(&self, req: &Request) -> String {
        match self.strategy {
            KeyStrategy::Ip => client_ip(req, self.trust_proxy),
            KeyStrategy::PrincipalOrIp => req
                .extensions()
                .get::<Principal>()
                .map(|p| p.0.clone())
                .unwrap_or_else(|| client_ip(req, self.trust_proxy)),
        }
    }
}

/// Admission middleware for [`axum::middleware::from_fn_with_state`].
///
/// Admitted requests continue to the next stage unchanged. Rejected requests
/// short-circuit with status 429, a JSON body carrying [`REJECTION_MESSAGE`],
/// and a `Retry-After` header; retry is the caller's responsibility.
pub async fn admit(State(guard): State<RouteGuard>, req: Request, next: Next) -> Response {
    let key = guard.key_for(&req);
    match guard.limiter.consume(&key) {
        Outcome::Admitted { .. } => next.run(req).await,
        Outcome::Rejected { retry_after } => {
            tracing::warn!(%key, path = %req.uri().path(), "rate limit exceeded");
            let retry_secs = retry_after.as_secs().max(1);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_secs.to_string())],
                Json(RejectionBody { message: REJECTION_MESSAGE }),
            )
                .into_response()
        }
    }
}

/// Resolve the client address for keying.
///
/// The resolved remote address wins unless the guard explicitly trusts its
/// upstream proxy, in which case the first `X-Forwarded-For` entry is used.
fn client_ip(req: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(forwarded) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
        {
            if let Some(first) = forwarded.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_owned();
                }
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_KEY.to_owned())
}
