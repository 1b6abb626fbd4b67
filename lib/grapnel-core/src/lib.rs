//! Core types and traits for the grapnel request adapter.
//!
//! This crate provides the transport-agnostic building blocks:
//! - [`RequestInformation`] and [`Request`] - abstract and transport requests
//! - [`Response`] and [`ResponseBody`] - response with a close-once body
//! - [`Error`], [`ApiError`] and [`Result`] - Error handling
//! - [`HttpClient`] - Core client trait for HTTP execution
//! - [`AuthenticationProvider`] - request authentication, with bearer tokens
//! - [`ParseNode`] and [`ParseNodeFactoryRegistry`] - payload decoding (JSON, plain text)
//! - [`Primitive`] and [`PrimitiveKind`] - scalar payload values
//! - [`ErrorMapping`] and [`ensure_success`] - classification of non-2xx responses
//! - [`ClaimsState`] and [`claims_from_response`] - claims challenge detection
//! - [`TargetShape`] and [`dispatch`] - typed extraction of successful responses
//! - [`ResponseHandler`] - caller-supplied response processing
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod auth;
mod body;
mod challenge;
mod client;
mod error;
mod error_mapping;
mod handler;
mod json;
mod method;
mod parse_node;
pub mod prelude;
mod primitive;
mod request;
mod response;
mod shape;
mod text;

pub use auth::{
    AccessTokenProvider, AnonymousAuthenticationProvider, AuthContext, AuthenticationProvider,
    BearerTokenAuthenticationProvider, CLAIMS_KEY, StaticTokenProvider,
};
pub use body::{ContentType, RequestContent, ResponseBody, StreamingBody, from_json, to_json};
pub use challenge::{ClaimsState, claims_from_response, parse_claims_challenge};
pub use client::HttpClient;
pub use error::{ApiError, Error, Result};
pub use error_mapping::{CLIENT_ERROR_KEY, ErrorMapping, SERVER_ERROR_KEY, ensure_success};
pub use handler::{HandlerFuture, ResponseHandler};
pub use json::{JsonParseNode, JsonParseNodeFactory};
pub use method::Method;
pub use parse_node::{Parsable, ParsableFactory, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry};
pub use primitive::{
    Decimal, Primitive, PrimitiveKind, PrimitiveValue, format_duration, parse_duration,
};
pub use request::{BASE_URL_PARAMETER, Request, RequestInformation};
pub use response::Response;
pub use shape::{Extracted, TargetShape, dispatch};
pub use text::{TextParseNode, TextParseNodeFactory};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
