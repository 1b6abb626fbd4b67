//! Tower middleware layers for the [`crate::HyperClient`] transport.
//!
//! Layers wrap the type-erased transport service and are composed with
//! [`crate::HyperClientBuilder::layer`].
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-logging` | `.with_logging()` helper |
//! | `middleware-concurrency` | `.with_concurrency_limit()` helper |
//! | `middleware-follow-redirect` | `.with_follow_redirect()` helper |
//! | `middleware-full` | All middleware helpers |
//!
//! # Available Layers
//!
//! - [`LoggingLayer`] - Logs requests/responses using `tracing`
//! - [`ConcurrencyLimitLayer`] - Limits concurrent requests
//! - [`FollowRedirectLayer`] - Follows 3xx redirects, per-request [`RedirectOptions`]
//!
//! # Example
//!
//! ```ignore
//! use grapnel::HyperClient;
//! use grapnel::middleware::{ConcurrencyLimitLayer, LoggingLayer};
//!
//! let client = HyperClient::builder()
//!     .layer(LoggingLayer::new())
//!     .layer(ConcurrencyLimitLayer::new(8))
//!     .build();
//! ```

mod follow_redirect;
mod logging;

pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer, RedirectOptions};
pub use logging::{LogLevel, Logging, LoggingLayer};

pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
