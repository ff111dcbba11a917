//! Tower middleware that guards a service behind a [`Limiter`].
//!
//! The layer doesn't know how requests are keyed; a [`KeyExtractor`] supplied
//! by the caller derives the identity string from each request. On admission
//! the request passes through unchanged; on rejection the call short-circuits
//! with [`AdmissionError::RateLimited`] and the inner service is never
//! invoked. Mapping the rejection to a transport response (HTTP 429, a gRPC
//! status, ...) is the caller's concern; the [`crate::http`] module does it
//! for axum.

use crate::error::AdmissionError;
use crate::limiter::{Limiter, Outcome};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Derives the admission key for a request.
///
/// Implemented for any `Fn(&Req) -> String` closure. Keys must be non-empty;
/// requests mapping to the same key share one bucket.
pub trait KeyExtractor<Req>: Send + Sync {
    fn key(&self, req: &Req) -> String;
}

impl<Req, F> KeyExtractor<Req> for F
where
    F: Fn(&Req) -> String + Send + Sync,
{
    fn key(&self, req: &Req) -> String {
        self(req)
    }
}

/// A layer that enforces admission control using a [`Limiter`].
#[derive(Debug)]
pub struct AdmissionLayer<K> {
    limiter: Arc<Limiter>,
    key_fn: Arc<K>,
}

impl<K> AdmissionLayer<K> {
    /// Create a new admission layer around a shared limiter.
    pub fn new(limiter: Arc<Limiter>, key_fn: K) -> Self {
        Self { limiter, key_fn: Arc::new(key_fn) }
    }
}

impl<K> Clone for AdmissionLayer<K> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), key_fn: self.key_fn.clone() }
    }
}

impl<S, K> Layer<S> for AdmissionLayer<K> {
    type Service = AdmissionService<S, K>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

/// Middleware service that enforces admission control.
#[derive(Debug)]
pub struct AdmissionService<S, K> {
    inner: S,
    limiter: Arc<Limiter>,
    key_fn: Arc<K>,
}

impl<S: Clone, K> Clone for AdmissionService<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<S, K, Req> Service<Req> for AdmissionService<S, K>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    K: KeyExtractor<Req>,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = AdmissionError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AdmissionError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = self.key_fn.key(&req);

        // The limiter is synchronous, so decide before entering the future.
        match self.limiter.consume(&key) {
            Outcome::Admitted { .. } => {
                let mut inner = self.inner.clone();
                Box::pin(async move { inner.call(req).await.map_err(AdmissionError::Inner) })
            }
            Outcome::Rejected { retry_after } => {
                tracing::warn!(%key, "admission rejected");
                Box::pin(async move { Err(AdmissionError::RateLimited { retry_after }) })
            }
        }
    }
}
