//! Async request adapter for generated HTTP API clients.
//!
//! A [`RequestAdapter`] takes a transport-agnostic [`RequestInformation`],
//! authenticates it, sends it over an [`HttpClient`], answers a claims
//! challenge once, and turns the response into a typed value or a typed
//! error.
//!
//! # Example
//!
//! ```ignore
//! use grapnel::prelude::*;
//!
//! #[derive(Debug)]
//! pub struct User {
//!     id: String,
//! }
//!
//! impl Parsable for User {
//!     fn from_parse_node(node: &dyn ParseNode) -> grapnel::Result<Self> {
//!         let id = node.child_string("id")?.unwrap_or_default();
//!         Ok(Self { id })
//!     }
//! }
//!
//! let adapter = RequestAdapter::builder(AnonymousAuthenticationProvider, HyperClient::new())
//!     .base_url("https://api.example.com")
//!     .build();
//!
//! let mapping = ErrorMapping::new()
//!     .with("404", |node: &dyn ParseNode| Ok(ApiError::new(node.child_string("message")?.unwrap_or_default())));
//!
//! let mut request = RequestInformation::new(Method::Get, "{+baseurl}/users/{id}");
//! request.path_parameter("id", "42");
//! let user = adapter
//!     .send_object(request, User::from_parse_node, None, Some(&mapping))
//!     .await?;
//! ```

mod adapter;
mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;

pub use adapter::{RequestAdapter, RequestAdapterBuilder};
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use grapnel_core::{
    AccessTokenProvider, AnonymousAuthenticationProvider, ApiError, AuthContext,
    AuthenticationProvider, BASE_URL_PARAMETER, BearerTokenAuthenticationProvider, CLAIMS_KEY,
    CLIENT_ERROR_KEY, ClaimsState, ContentType, Decimal, Error, ErrorMapping, Extracted,
    HandlerFuture, HttpClient, JsonParseNode, JsonParseNodeFactory, Method, Parsable,
    ParsableFactory, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry, Primitive,
    PrimitiveKind, PrimitiveValue, Request, RequestContent, RequestInformation, Response,
    ResponseBody, ResponseHandler, Result, SERVER_ERROR_KEY, StaticTokenProvider, StreamingBody,
    TargetShape, TextParseNode, TextParseNodeFactory, claims_from_response, dispatch,
    ensure_success, format_duration, from_json, parse_claims_challenge, parse_duration, to_json,
};

// Re-export http types for status codes and headers
pub use grapnel_core::{StatusCode, header};

// Re-export crates used in public signatures
pub use url;
