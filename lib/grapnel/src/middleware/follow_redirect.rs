//! Follow redirect middleware.
//!
//! Follows 301, 302, 303, 307 and 308 responses that carry a `Location`
//! header. Each intermediate response body is closed before the next hop.
//! A request can override the layer settings with a [`RedirectOptions`]
//! request option.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION};
use tower::{Layer, Service};
use tracing::debug;
use url::Url;

use crate::{Error, Method, Request, Response, Result};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Per-request redirect settings.
///
/// Attach it with [`crate::RequestInformation::add_option`]; it travels in
/// the request extensions and takes precedence over the layer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectOptions {
    max_redirects: usize,
    follow: bool,
}

impl Default for RedirectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl RedirectOptions {
    /// Follow up to [`DEFAULT_MAX_REDIRECTS`] redirects.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            follow: true,
        }
    }

    /// Follow up to `max_redirects` redirects.
    #[must_use]
    pub const fn with_max_redirects(max_redirects: usize) -> Self {
        Self {
            max_redirects,
            follow: true,
        }
    }

    /// Hand redirect responses back to the caller unchanged.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_redirects: 0,
            follow: false,
        }
    }

    /// Maximum number of hops.
    #[must_use]
    pub const fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Whether redirects are followed at all.
    #[must_use]
    pub const fn follows(&self) -> bool {
        self.follow
    }
}

/// Layer that follows HTTP redirects.
///
/// # Example
///
/// ```ignore
/// use grapnel::HyperClient;
/// use grapnel::middleware::FollowRedirectLayer;
///
/// let client = HyperClient::builder()
///     .layer(FollowRedirectLayer::with_max_redirects(3))
///     .build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowRedirectLayer {
    options: RedirectOptions,
}

impl FollowRedirectLayer {
    /// Create a follow redirect layer with [`DEFAULT_MAX_REDIRECTS`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a follow redirect layer with a custom limit.
    #[must_use]
    pub const fn with_max_redirects(max_redirects: usize) -> Self {
        Self {
            options: RedirectOptions::with_max_redirects(max_redirects),
        }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            options: self.options,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    options: RedirectOptions,
}

impl<S> FollowRedirect<S> {
    /// Create a follow redirect service wrapping the given service.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            options: RedirectOptions::new(),
        }
    }
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Builds the next hop.
///
/// 303 switches to a body-less GET; the other codes keep method and body.
/// Credentials are dropped when the origin (scheme, host, port) changes.
fn redirected(request: Request<Bytes>, status: u16, location: Url) -> Request<Bytes> {
    let (method, previous, mut headers, mut body, extensions) = request.into_parts();

    let method = if status == 303 {
        body = None;
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        Method::Get
    } else {
        method
    };

    if previous.origin() != location.origin() {
        headers.remove(AUTHORIZATION);
        headers.remove(COOKIE);
    }

    Request::from_parts(method, location, headers, body, extensions)
}

impl<S> Service<Request<Bytes>> for FollowRedirect<S>
where
    S: Service<Request<Bytes>, Response = Response, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let options = request
            .extensions()
            .get::<RedirectOptions>()
            .copied()
            .unwrap_or(self.options);
        let inner = self.inner.clone();

        Box::pin(follow(inner, request, options))
    }
}

async fn follow<S>(mut inner: S, request: Request<Bytes>, options: RedirectOptions) -> Result<Response>
where
    S: Service<Request<Bytes>, Response = Response, Error = Error>,
{
    let mut current = request;
    let mut redirects = 0;

    loop {
        let response = inner.call(current.clone()).await?;
        let status = response.status();

        if !options.follows() || !is_redirect(status) || redirects >= options.max_redirects() {
            return Ok(response);
        }
        let Some(location) = response.header(LOCATION.as_str()) else {
            return Ok(response);
        };

        let next = current.url().join(location)?;
        response.close();
        redirects += 1;
        debug!(status, from = %current.url(), to = %next, redirects, "following redirect");

        current = redirected(current, status, next);
    }
}
