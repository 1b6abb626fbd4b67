//! HTTP transport trait.
//!
//! [`HttpClient`] executes a concrete [`Request`] and hands back a
//! [`Response`] whose body has not been read yet. Implement it directly for
//! custom transports or scripted test clients.

use std::future::Future;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Core HTTP client trait.
///
/// Implementations should be async-first and support connection pooling.
/// The returned body is owned by the caller, which is responsible for
/// reading or closing it.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(&self, request: Request<Bytes>) -> impl Future<Output = Result<Response>> + Send;
}

impl<C: HttpClient> HttpClient for std::sync::Arc<C> {
    fn execute(&self, request: Request<Bytes>) -> impl Future<Output = Result<Response>> + Send {
        (**self).execute(request)
    }
}
