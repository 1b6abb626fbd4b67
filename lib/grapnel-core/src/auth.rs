//! Request authentication.
//!
//! An [`AuthenticationProvider`] decorates a [`RequestInformation`] with
//! credentials before it is turned into a transport request. The
//! [`AuthContext`] passed along carries extra hints, such as the claims of a
//! claims challenge when the adapter retries a call.
//!
//! # Example
//!
//! ```ignore
//! use grapnel_core::{BearerTokenAuthenticationProvider, StaticTokenProvider};
//!
//! let provider = BearerTokenAuthenticationProvider::new(
//!     StaticTokenProvider::new("secret").allowed_hosts(["api.example.com"]),
//! );
//! provider.authenticate_request(&mut request, &AuthContext::default()).await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use http::header::{AUTHORIZATION, HeaderValue};
use url::Url;

use crate::{Error, RequestInformation, Result};

/// Context key under which claims of a claims challenge are stored.
pub const CLAIMS_KEY: &str = "claims";

/// Additional hints handed to an [`AuthenticationProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    values: HashMap<String, String>,
}

impl AuthContext {
    /// A context carrying the claims of a claims challenge.
    ///
    /// Empty claims leave the context empty.
    #[must_use]
    pub fn with_claims(claims: &str) -> Self {
        let mut context = Self::default();
        if !claims.is_empty() {
            context.insert(CLAIMS_KEY, claims);
        }
        context
    }

    /// Stores a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Claims of a claims challenge, if any.
    #[must_use]
    pub fn claims(&self) -> Option<&str> {
        self.get(CLAIMS_KEY)
    }

    /// Returns `true` if no value is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Adds credentials to a request.
pub trait AuthenticationProvider: Send + Sync {
    /// Authenticate the request, typically by setting the `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials cannot be obtained.
    fn authenticate_request(
        &self,
        request: &mut RequestInformation,
        context: &AuthContext,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<P: AuthenticationProvider> AuthenticationProvider for Arc<P> {
    fn authenticate_request(
        &self,
        request: &mut RequestInformation,
        context: &AuthContext,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).authenticate_request(request, context)
    }
}

/// Provider that leaves requests untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticationProvider;

impl AuthenticationProvider for AnonymousAuthenticationProvider {
    async fn authenticate_request(
        &self,
        _request: &mut RequestInformation,
        _context: &AuthContext,
    ) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Bearer tokens
// ============================================================================

/// Source of access tokens.
pub trait AccessTokenProvider: Send + Sync {
    /// Token for a request to `uri`.
    ///
    /// An empty token means no token applies to this URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be acquired.
    fn get_authorization_token(
        &self,
        uri: &Url,
        context: &AuthContext,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Provider that sets `Authorization: Bearer <token>`.
///
/// When the context carries claims, a previously set `Authorization` header
/// is dropped so that a fresh token is requested with those claims.
#[derive(Debug, Clone)]
pub struct BearerTokenAuthenticationProvider<P> {
    token_provider: P,
}

impl<P: AccessTokenProvider> BearerTokenAuthenticationProvider<P> {
    /// Wraps an access token provider.
    #[must_use]
    pub const fn new(token_provider: P) -> Self {
        Self { token_provider }
    }

    /// The wrapped access token provider.
    #[must_use]
    pub const fn token_provider(&self) -> &P {
        &self.token_provider
    }
}

impl<P: AccessTokenProvider> AuthenticationProvider for BearerTokenAuthenticationProvider<P> {
    async fn authenticate_request(
        &self,
        request: &mut RequestInformation,
        context: &AuthContext,
    ) -> Result<()> {
        if context.claims().is_some() {
            request.headers_mut().remove(AUTHORIZATION);
        }
        if request.headers().contains_key(AUTHORIZATION) {
            return Ok(());
        }

        let uri = request.uri()?;
        let token = self
            .token_provider
            .get_authorization_token(&uri, context)
            .await?;
        if token.is_empty() {
            return Ok(());
        }

        let value = HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|e| Error::authentication(format!("invalid access token: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Access token provider returning a fixed token.
///
/// With an allowed-hosts list, the token is only handed out for those hosts.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Arc<str>,
    allowed_hosts: HashSet<String>,
}

impl StaticTokenProvider {
    /// A provider for `token`, valid for every host.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
            allowed_hosts: HashSet::new(),
        }
    }

    /// Restricts the token to the given hosts (case-insensitive).
    #[must_use]
    pub fn allowed_hosts<I, H>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: AsRef<str>,
    {
        self.allowed_hosts = hosts
            .into_iter()
            .map(|h| h.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    /// Returns `true` if the token may be sent to `uri`.
    #[must_use]
    pub fn is_allowed(&self, uri: &Url) -> bool {
        self.allowed_hosts.is_empty()
            || uri
                .host_str()
                .is_some_and(|host| self.allowed_hosts.contains(&host.to_ascii_lowercase()))
    }
}

impl AccessTokenProvider for StaticTokenProvider {
    async fn get_authorization_token(&self, uri: &Url, _context: &AuthContext) -> Result<String> {
        if self.is_allowed(uri) {
            Ok(self.token.to_string())
        } else {
            Ok(String::new())
        }
    }
}
