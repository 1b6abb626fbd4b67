//! Error types for grapnel.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use derive_more::{Display, Error, From};
use http::HeaderMap;

// ============================================================================
// API Error
// ============================================================================

/// Failure value produced by a registered error factory.
///
/// Error factories in an [`crate::ErrorMapping`] build an `ApiError` from the
/// response payload. A typed model (for example a generated `NotFound`
/// type) can be attached with [`ApiError::with_details`] and recovered with
/// [`ApiError::details`].
///
/// The response status code and headers are stamped on the error by the
/// classifier, after the factory ran.
///
/// # Example
///
/// ```
/// use grapnel_core::ApiError;
///
/// #[derive(Debug, PartialEq)]
/// struct NotFound {
///     message: String,
/// }
///
/// let error = ApiError::new("missing").with_details(NotFound {
///     message: "missing".to_string(),
/// });
/// assert_eq!(error.message(), "missing");
/// assert!(error.details::<NotFound>().is_some());
/// ```
#[derive(Clone, Default)]
pub struct ApiError {
    message: String,
    status: Option<u16>,
    headers: HeaderMap,
    details: Option<Arc<dyn Any + Send + Sync>>,
}

impl ApiError {
    /// Create an API error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach a typed details model.
    #[must_use]
    pub fn with_details<M: Any + Send + Sync>(mut self, details: M) -> Self {
        self.details = Some(Arc::new(details));
        self
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code of the response this error was built from.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Headers of the response this error was built from.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Typed details model, if one of type `M` was attached.
    #[must_use]
    pub fn details<M: Any + Send + Sync>(&self) -> Option<&M> {
        self.details.as_deref()?.downcast_ref::<M>()
    }

    pub(crate) fn with_response(mut self, status: u16, headers: HeaderMap) -> Self {
        self.status = Some(status);
        self.headers = headers;
        self
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("message", &self.message)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_details", &self.details.is_some())
            .finish()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "API error {status}: {}", self.message),
            None => write!(f, "API error: {}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for grapnel operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The server answered with a non-2xx status and no error factory is
    /// registered for it.
    #[display(
        "the server returned an unexpected status code and no error type is registered for this code {status}"
    )]
    #[from(skip)]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// Typed error built by a registered error factory.
    #[display("{_0}")]
    #[from]
    Api(ApiError),

    /// A registered error factory produced a value that is not an [`ApiError`].
    #[display("unexpected error type {type_name} for status code {status}")]
    #[from(skip)]
    InvalidErrorType {
        /// HTTP status code.
        status: u16,
        /// Rust type name of the produced model.
        type_name: &'static str,
    },

    /// The response payload could not be read or decoded.
    #[display("failed to read the response body: {_0}")]
    #[from(skip)]
    PayloadRead(#[error(source)] Box<Error>),

    /// Decoding error with path context.
    #[display("deserialization error at '{path}': {message}")]
    #[from(skip)]
    Deserialization {
        /// Path to the failing value (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// The response has no content type to pick a decoder from.
    #[display("no response content type found for deserialization")]
    #[from(skip)]
    MissingContentType,

    /// No parse node factory is registered for the content type.
    #[display("content type {_0} does not have a factory registered to be parsed")]
    #[from(skip)]
    UnsupportedContentType(#[error(not(source))] String),

    /// A primitive target type cannot be produced from its declared kind.
    #[display("unexpected payload type {type_name}")]
    #[from(skip)]
    UnsupportedPrimitive {
        /// Rust type name of the requested primitive.
        type_name: &'static str,
    },

    /// Authentication provider failure.
    #[display("authentication error: {_0}")]
    #[from(skip)]
    Authentication(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a deserialization error with path context.
    #[must_use]
    pub fn deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap an error as a payload read failure.
    ///
    /// Already wrapped errors are returned unchanged.
    #[must_use]
    pub fn payload_read(cause: Self) -> Self {
        match cause {
            Self::PayloadRead(_) => cause,
            other => Self::PayloadRead(Box::new(other)),
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the payload could not be read or decoded.
    #[must_use]
    pub const fn is_payload_read(&self) -> bool {
        matches!(self, Self::PayloadRead(_))
    }

    /// Returns the HTTP status code if this error comes from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status } | Self::InvalidErrorType { status, .. } => {
                Some(*status)
            }
            Self::Api(api) => api.status(),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the typed API error, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnexpectedStatus { status: 418 };
        assert_eq!(
            err.to_string(),
            "the server returned an unexpected status code and no error type is registered for this code 418"
        );

        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::payload_read(Error::deserialization("user.address.city", "missing"));
        assert_eq!(
            err.to_string(),
            "failed to read the response body: deserialization error at 'user.address.city': missing"
        );
    }

    #[test]
    fn payload_read_exposes_its_cause() {
        use std::error::Error as _;

        let err = Error::payload_read(Error::deserialization("user.id", "expected a string"));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "deserialization error at 'user.id': expected a string");
        assert!(matches!(
            source.downcast_ref::<Error>(),
            Some(Error::Deserialization { path, .. }) if path == "user.id"
        ));
    }

    #[test]
    fn payload_read_is_not_nested() {
        let err = Error::payload_read(Error::payload_read(Error::MissingContentType));
        let Error::PayloadRead(inner) = err else {
            panic!("expected payload read error");
        };
        assert!(matches!(*inner, Error::MissingContentType));
    }

    #[test]
    fn error_status() {
        let err = Error::UnexpectedStatus { status: 404 };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = Error::InvalidErrorType {
            status: 503,
            type_name: "Foo",
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.is_server_error());

        let err = Error::Timeout;
        assert_eq!(err.status(), None);
        assert!(!err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn api_error_status_comes_from_response() {
        let err = Error::from(ApiError::new("boom"));
        assert_eq!(err.status(), None);

        let api = ApiError::new("boom").with_response(502, HeaderMap::new());
        let err = Error::from(api);
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "API error 502: boom");
    }

    #[test]
    fn api_error_details() {
        #[derive(Debug, PartialEq)]
        struct NotFound {
            message: String,
        }

        let api = ApiError::new("missing").with_details(NotFound {
            message: "missing".to_string(),
        });

        assert_eq!(
            api.details::<NotFound>(),
            Some(&NotFound {
                message: "missing".to_string()
            })
        );
        assert!(api.details::<String>().is_none());
        assert!(ApiError::new("plain").details::<NotFound>().is_none());
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(Error::connection("failed").is_connection());
        assert!(Error::payload_read(Error::MissingContentType).is_payload_read());
        assert!(!Error::MissingContentType.is_payload_read());
        assert!(Error::from(ApiError::new("x")).api_error().is_some());
        assert!(Error::Timeout.api_error().is_none());
    }
}
