//! Classification of non-success responses.
//!
//! An [`ErrorMapping`] associates status code keys with error factories.
//! [`ensure_success`] passes 2xx responses through and turns any other
//! response into an [`Error`], building a typed [`ApiError`] when a factory
//! is registered for the status.
//!
//! # Example
//!
//! ```
//! use grapnel_core::{ApiError, ErrorMapping};
//!
//! let mapping = ErrorMapping::new()
//!     .with("404", |node| {
//!         Ok(ApiError::new(node.child_string("message")?.unwrap_or_default()))
//!     })
//!     .with("5xx", |_node| Ok(ApiError::new("server error")));
//!
//! assert_eq!(mapping.resolve_key(404), Some("404"));
//! assert_eq!(mapping.resolve_key(403), None);
//! assert_eq!(mapping.resolve_key(503), Some("5XX"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::{ApiError, Error, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry, Response, Result};

/// Wildcard key for 400-499 responses.
pub const CLIENT_ERROR_KEY: &str = "4XX";
/// Wildcard key for 500-599 responses.
pub const SERVER_ERROR_KEY: &str = "5XX";

type ErrorFactory = Box<dyn Fn(&dyn ParseNode) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

struct Entry {
    factory: ErrorFactory,
    type_name: &'static str,
}

/// Status code keys mapped to error factories.
///
/// Keys are exact codes (`"404"`) or the wildcards `"4XX"` and `"5XX"`
/// (case-insensitive). A factory is expected to produce an [`ApiError`];
/// any other model is reported as [`Error::InvalidErrorType`].
#[derive(Default)]
pub struct ErrorMapping {
    entries: HashMap<String, Entry>,
}

impl ErrorMapping {
    /// An empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for a key, replacing a previous one.
    pub fn insert<M, F>(&mut self, key: &str, factory: F) -> &mut Self
    where
        M: Any + Send + Sync,
        F: Fn(&dyn ParseNode) -> Result<M> + Send + Sync + 'static,
    {
        let factory: ErrorFactory = Box::new(move |node: &dyn ParseNode| {
            factory(node).map(|model| Box::new(model) as Box<dyn Any + Send + Sync>)
        });
        self.entries.insert(
            key.trim().to_ascii_uppercase(),
            Entry {
                factory,
                type_name: std::any::type_name::<M>(),
            },
        );
        self
    }

    /// Registers a factory for a key (builder style).
    #[must_use]
    pub fn with<M, F>(mut self, key: &str, factory: F) -> Self
    where
        M: Any + Send + Sync,
        F: Fn(&dyn ParseNode) -> Result<M> + Send + Sync + 'static,
    {
        self.insert(key, factory);
        self
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key whose factory handles `status`: the exact code, then `4XX` for
    /// 400-499, then `5XX` for 500-599.
    #[must_use]
    pub fn resolve_key(&self, status: u16) -> Option<&str> {
        let exact = status.to_string();
        if let Some((key, _)) = self.entries.get_key_value(&exact) {
            return Some(key);
        }
        let wildcard = match status {
            400..=499 => CLIENT_ERROR_KEY,
            500..=599 => SERVER_ERROR_KEY,
            _ => return None,
        };
        self.entries
            .get_key_value(wildcard)
            .map(|(key, _)| key.as_str())
    }

    fn resolve(&self, status: u16) -> Option<&Entry> {
        self.resolve_key(status).and_then(|key| self.entries.get(key))
    }
}

impl fmt::Debug for ErrorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.type_name))
            .collect();
        keys.sort_unstable();
        f.debug_struct("ErrorMapping").field("entries", &keys).finish()
    }
}

/// Passes a 2xx response through, or turns it into an error.
///
/// Without a matching factory the body is closed and
/// [`Error::UnexpectedStatus`] is returned. With one, the body is decoded
/// with the parse node factory of its content type and handed to the
/// factory. The resulting [`ApiError`] receives the status code and the
/// response headers.
///
/// # Errors
///
/// Returns an error for every non-2xx response:
/// - [`Error::UnexpectedStatus`] when no factory matches
/// - [`Error::Api`] with the typed error built by the factory
/// - [`Error::InvalidErrorType`] when the factory built something else
/// - [`Error::PayloadRead`] when the error payload cannot be read or decoded
pub async fn ensure_success(
    response: Response,
    mapping: Option<&ErrorMapping>,
    registry: &ParseNodeFactoryRegistry,
) -> Result<Response> {
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status();
    let Some(entry) = mapping.and_then(|m| m.resolve(status)) else {
        response.close();
        return Err(Error::UnexpectedStatus { status });
    };

    let content_type = response.content_type();
    let (_, headers, body) = response.into_parts();
    let content = body.bytes().await.map_err(Error::payload_read)?;
    let content_type = content_type.ok_or_else(|| Error::payload_read(Error::MissingContentType))?;
    let root = registry
        .root_node(&content_type, content)
        .map_err(Error::payload_read)?;
    let model = (entry.factory)(root.as_ref()).map_err(Error::payload_read)?;

    match model.downcast::<ApiError>() {
        Ok(api) => Err(Error::Api(api.with_response(status, headers))),
        Err(_) => Err(Error::InvalidErrorType {
            status,
            type_name: entry.type_name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use http::{HeaderMap, HeaderValue};

    use super::*;
    use crate::ResponseBody;

    #[derive(Debug, PartialEq)]
    struct NotFound {
        message: String,
    }

    fn not_found(node: &dyn ParseNode) -> Result<ApiError> {
        let message = node.child_string("message")?.unwrap_or_default();
        Ok(ApiError::new(message.clone()).with_details(NotFound { message }))
    }

    fn json_response(status: u16, body: &'static str) -> (Response, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        let hook = Arc::clone(&closed);
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-request-id", HeaderValue::from_static("r-1"));
        let body = ResponseBody::from_bytes(body).on_close(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        });
        (Response::new(status, headers, body), closed)
    }

    fn counting_factory(
        calls: &Arc<AtomicUsize>,
    ) -> impl Fn(&dyn ParseNode) -> Result<ApiError> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move |_node: &dyn ParseNode| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ApiError::new("boom"))
        }
    }

    #[test]
    fn resolve_order() {
        let mapping = ErrorMapping::new()
            .with("404", not_found)
            .with("4xx", not_found)
            .with("5XX", not_found);

        check!(mapping.resolve_key(404) == Some("404"));
        check!(mapping.resolve_key(401) == Some("4XX"));
        check!(mapping.resolve_key(599) == Some("5XX"));
        check!(mapping.resolve_key(302) == None);
        check!(mapping.resolve_key(600) == None);
        check!(mapping.len() == 3);
    }

    #[tokio::test]
    async fn success_never_invokes_a_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mapping = ErrorMapping::new()
            .with("200", counting_factory(&calls))
            .with("4XX", counting_factory(&calls));
        let (response, _) = json_response(200, "{}");

        let response = ensure_success(response, Some(&mapping), &ParseNodeFactoryRegistry::default())
            .await
            .expect("success");
        check!(response.status() == 200);
        check!(calls.load(Ordering::SeqCst) == 0);
    }

    #[tokio::test]
    async fn exact_mapping_builds_typed_error() {
        let mapping = ErrorMapping::new()
            .with("404", not_found)
            .with("4XX", |_node| Ok(ApiError::new("generic")));
        let (response, closed) = json_response(404, r#"{"message":"missing"}"#);

        let result = ensure_success(response, Some(&mapping), &ParseNodeFactoryRegistry::default()).await;

        let_assert!(Err(Error::Api(api)) = result);
        check!(api.message() == "missing");
        check!(api.status() == Some(404));
        check!(api.headers()["x-request-id"] == "r-1");
        check!(
            api.details::<NotFound>()
                == Some(&NotFound {
                    message: "missing".to_string()
                })
        );
        check!(closed.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn wildcard_mappings() {
        let mapping = ErrorMapping::new()
            .with("4XX", |_node| Ok(ApiError::new("client")))
            .with("5XX", |node| {
                Ok(ApiError::new(node.child_string("error")?.unwrap_or_default()))
            });
        let registry = ParseNodeFactoryRegistry::default();

        let (response, _) = json_response(409, "{}");
        let result = ensure_success(response, Some(&mapping), &registry).await;
        let_assert!(Err(Error::Api(api)) = result);
        check!(api.message() == "client");

        let (response, _) = json_response(503, r#"{"error":"unavailable"}"#);
        let result = ensure_success(response, Some(&mapping), &registry).await;
        let_assert!(Err(Error::Api(api)) = result);
        check!(api.message() == "unavailable");
        check!(api.status() == Some(503));
    }

    #[tokio::test]
    async fn unmapped_status_closes_body() {
        let registry = ParseNodeFactoryRegistry::default();

        let (response, closed) = json_response(418, "{}");
        let result = ensure_success(response, None, &registry).await;
        let_assert!(Err(Error::UnexpectedStatus { status: 418 }) = result);
        check!(closed.load(Ordering::SeqCst) == 1);

        let mapping = ErrorMapping::new().with("5XX", not_found);
        let (response, closed) = json_response(404, "{}");
        let result = ensure_success(response, Some(&mapping), &registry).await;
        let_assert!(Err(Error::UnexpectedStatus { status: 404 }) = result);
        check!(closed.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn factory_producing_another_type() {
        let mapping = ErrorMapping::new().with("400", |node| {
            Ok(NotFound {
                message: node.child_string("message")?.unwrap_or_default(),
            })
        });
        let (response, _) = json_response(400, "{}");

        let result = ensure_success(response, Some(&mapping), &ParseNodeFactoryRegistry::default()).await;
        let_assert!(Err(Error::InvalidErrorType { status: 400, type_name }) = result);
        check!(type_name.ends_with("NotFound"));
    }

    #[tokio::test]
    async fn undecodable_error_payload() {
        let mapping = ErrorMapping::new().with("500", not_found);
        let registry = ParseNodeFactoryRegistry::default();

        let (response, closed) = json_response(500, "not json");
        let result = ensure_success(response, Some(&mapping), &registry).await;
        let_assert!(Err(Error::PayloadRead(_)) = result);
        check!(closed.load(Ordering::SeqCst) == 1);

        let response = Response::new(500, HeaderMap::new(), ResponseBody::from_bytes("{}"));
        let result = ensure_success(response, Some(&mapping), &registry).await;
        let_assert!(Err(Error::PayloadRead(cause)) = result);
        check!(matches!(*cause, Error::MissingContentType));
    }
}
