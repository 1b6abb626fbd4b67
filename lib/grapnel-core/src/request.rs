//! Abstract and transport HTTP requests.
//!
//! - [`RequestInformation`] - transport-agnostic description of a call, built by API surfaces
//! - [`Request`] - concrete request handed to an [`crate::HttpClient`]
//!
//! # Example
//!
//! ```
//! use grapnel_core::{Method, RequestInformation};
//!
//! let mut request = RequestInformation::new(Method::Get, "{+baseurl}/users/{id}");
//! request.path_parameter("baseurl", "https://api.example.com");
//! request.path_parameter("id", "42");
//! request.header("Accept", "application/json").expect("valid header");
//!
//! assert_eq!(
//!     request.uri().expect("valid uri").as_str(),
//!     "https://api.example.com/users/42"
//! );
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{Extensions, HeaderMap};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::{ContentType, Error, Method, RequestContent, Result};

/// Path parameter holding the adapter base URL.
pub const BASE_URL_PARAMETER: &str = "baseurl";

/// Characters left as-is by simple template expansion (RFC 6570 unreserved).
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ============================================================================
// Request Information
// ============================================================================

/// Transport-agnostic description of an HTTP call.
///
/// The target URI comes from a URL template expanded with path parameters,
/// unless an explicit URI was set with [`RequestInformation::set_uri`].
/// Request options are stored by type and travel to the transport in the
/// request extensions.
#[derive(Debug)]
pub struct RequestInformation {
    method: Method,
    url_template: String,
    path_parameters: HashMap<String, String>,
    uri: Option<Url>,
    headers: HeaderMap,
    options: Extensions,
    content: Option<RequestContent>,
}

impl RequestInformation {
    /// Creates a request description for a URL template.
    #[must_use]
    pub fn new(method: Method, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            path_parameters: HashMap::new(),
            uri: None,
            headers: HeaderMap::new(),
            options: Extensions::new(),
            content: None,
        }
    }

    /// Creates a request description targeting an explicit URI.
    #[must_use]
    pub fn with_uri(method: Method, uri: Url) -> Self {
        let mut request = Self::new(method, String::new());
        request.uri = Some(uri);
        request
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// URL template.
    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Path parameters used to expand the URL template.
    #[must_use]
    pub fn path_parameters(&self) -> &HashMap<String, String> {
        &self.path_parameters
    }

    /// Sets a path parameter.
    pub fn path_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.path_parameters.insert(name.into(), value.into());
        self
    }

    /// Overrides the URI; the URL template is ignored from then on.
    pub fn set_uri(&mut self, uri: Url) -> &mut Self {
        self.uri = Some(uri);
        self
    }

    /// Resolves the target URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the template uses an unsupported expression or
    /// the expansion is not a valid absolute URL.
    pub fn uri(&self) -> Result<Url> {
        if let Some(uri) = &self.uri {
            return Ok(uri.clone());
        }
        let expanded = expand_template(&self.url_template, &self.path_parameters)?;
        Url::parse(&expanded).map_err(Error::InvalidUrl)
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing previous values.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or the value is not a valid header.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_request(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_request(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Adds a request option, replacing a previous option of the same type.
    pub fn add_option<T: Clone + Send + Sync + 'static>(&mut self, option: T) -> &mut Self {
        self.options.insert(option);
        self
    }

    /// Request option of type `T`.
    #[must_use]
    pub fn option<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.options.get::<T>()
    }

    /// All request options.
    #[must_use]
    pub fn options(&self) -> &Extensions {
        &self.options
    }

    /// Request content.
    #[must_use]
    pub const fn content(&self) -> Option<&RequestContent> {
        self.content.as_ref()
    }

    /// Mutable access to the request content.
    #[must_use]
    pub fn content_mut(&mut self) -> Option<&mut RequestContent> {
        self.content.as_mut()
    }

    /// Sets the content and its `Content-Type` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not a valid header value.
    pub fn set_content(&mut self, content: RequestContent, content_type: &str) -> Result<&mut Self> {
        self.header(CONTENT_TYPE.as_str(), content_type)?;
        self.content = Some(content);
        Ok(self)
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn set_json_content<T: serde::Serialize>(&mut self, value: &T) -> Result<&mut Self> {
        let body = crate::to_json(value)?;
        self.set_content(RequestContent::buffered(body), ContentType::Json.as_str())
    }

    /// Returns `true` if sending the request again would resend the same content.
    #[must_use]
    pub fn is_replayable(&self) -> bool {
        self.content
            .as_ref()
            .is_none_or(RequestContent::is_rewindable)
    }

    /// Rewinds the content, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be rewound.
    pub fn rewind_content(&mut self) -> Result<()> {
        self.content.as_mut().map_or(Ok(()), RequestContent::rewind)
    }

    /// Builds the transport request: resolves the URI and reads the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI cannot be resolved or the content cannot be read.
    pub async fn to_request(&mut self) -> Result<Request<Bytes>> {
        let url = self.uri()?;
        let body = match self.content.as_mut() {
            Some(content) => Some(content.read().await?),
            None => None,
        };
        Ok(Request {
            method: self.method,
            url,
            headers: self.headers.clone(),
            body,
            extensions: self.options.clone(),
        })
    }
}

/// Expands `{name}` (percent-encoded) and `{+name}` (verbatim) expressions.
fn expand_template(template: &str, parameters: &HashMap<String, String>) -> Result<String> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;

    while let Some((literal, after)) = rest.split_once('{') {
        expanded.push_str(literal);
        let (expression, remainder) = after.split_once('}').ok_or_else(|| {
            Error::invalid_request(format!("unclosed expression in URL template {template}"))
        })?;

        let (reserved, name) = match expression.strip_prefix('+') {
            Some(name) => (true, name),
            None => (false, expression),
        };
        if name.is_empty()
            || name.starts_with(['#', '.', '/', ';', '?', '&', '=', ',', '!', '@', '|'])
        {
            return Err(Error::invalid_request(format!(
                "unsupported expression {{{expression}}} in URL template"
            )));
        }

        if let Some(value) = parameters.get(name) {
            if reserved {
                expanded.push_str(value);
            } else {
                let _ = write!(expanded, "{}", utf8_percent_encode(value, UNRESERVED));
            }
        }
        rest = remainder;
    }
    expanded.push_str(rest);

    Ok(expanded)
}

// ============================================================================
// Transport Request
// ============================================================================

/// A concrete HTTP request with method, URL, headers, optional body and extensions.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<B>,
    extensions: Extensions,
}

impl<B> Request<B> {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            extensions: Extensions::new(),
        }
    }

    /// Reassemble a request from its parts.
    #[must_use]
    pub fn from_parts(
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<B>,
        extensions: Extensions,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
            extensions,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Request extensions (request options).
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Consume into (method, url, headers, body, extensions).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<B>, Extensions) {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.extensions,
        )
    }
}
