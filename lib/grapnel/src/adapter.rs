//! The request adapter: authenticate, transmit, answer claims challenges,
//! classify and decode.

use std::fmt;

use tracing::{debug, info};

use crate::{
    AuthenticationProvider, BASE_URL_PARAMETER, ClaimsState, ErrorMapping, Extracted,
    HttpClient, ParsableFactory, ParseNodeFactoryRegistry, Primitive, RequestInformation,
    Response, ResponseBody, ResponseHandler, Result, TargetShape, claims_from_response, dispatch,
    ensure_success,
};

/// Executes [`RequestInformation`]s and turns responses into typed values.
///
/// Each send operation runs the same pipeline:
/// 1. the `baseurl` path parameter is set from the adapter base URL
/// 2. the authentication provider decorates the request
/// 3. the request is transmitted
/// 4. a `401` carrying a claims challenge is answered once: the content is
///    rewound and the request is authenticated again with the claims
/// 5. a supplied [`ResponseHandler`] takes the final response as-is;
///    otherwise the response is classified with the error mapping and its
///    payload extracted
///
/// Failures to build the request are returned before anything is sent.
///
/// # Example
///
/// ```ignore
/// use grapnel::{AnonymousAuthenticationProvider, HyperClient, Method, RequestAdapter, RequestInformation};
///
/// let adapter = RequestAdapter::builder(AnonymousAuthenticationProvider, HyperClient::new())
///     .base_url("https://api.example.com")
///     .build();
///
/// let mut request = RequestInformation::new(Method::Get, "{+baseurl}/users/{id}");
/// request.path_parameter("id", "42");
/// let user = adapter.send_object(request, User::from_parse_node, None, None).await?;
/// ```
pub struct RequestAdapter<A, C> {
    authentication: A,
    client: C,
    base_url: String,
    registry: ParseNodeFactoryRegistry,
}

impl<A, C> fmt::Debug for RequestAdapter<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAdapter")
            .field("base_url", &self.base_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<A, C> RequestAdapter<A, C>
where
    A: AuthenticationProvider,
    C: HttpClient,
{
    /// Create an adapter without base URL, with the default parse node factories.
    #[must_use]
    pub fn new(authentication: A, client: C) -> Self {
        Self::builder(authentication, client).build()
    }

    /// Create an adapter builder.
    #[must_use]
    pub fn builder(authentication: A, client: C) -> RequestAdapterBuilder<A, C> {
        RequestAdapterBuilder {
            authentication,
            client,
            base_url: None,
            registry: None,
        }
    }

    /// Base URL substituted for `{+baseurl}` in URL templates.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the base URL.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Parse node factories used to decode payloads.
    #[must_use]
    pub const fn parse_node_factory(&self) -> &ParseNodeFactoryRegistry {
        &self.registry
    }

    /// Authentication provider.
    #[must_use]
    pub const fn authentication_provider(&self) -> &A {
        &self.authentication
    }

    /// Transport.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    // ========================================================================
    // Send operations
    // ========================================================================

    /// Send the request and build a model from the payload.
    ///
    /// Returns `None` for a `204 No Content` response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or sent, if the
    /// response status is not 2xx (see [`ensure_success`]), or if the payload
    /// cannot be decoded ([`crate::Error::PayloadRead`]).
    pub async fn send_object<T>(
        &self,
        request: RequestInformation,
        factory: ParsableFactory<T>,
        handler: Option<&dyn ResponseHandler<Option<T>>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<T>> {
        self.process(
            request,
            TargetShape::Object(factory),
            handler,
            error_mapping,
            |extracted| Ok(extracted.into_object()),
        )
        .await
    }

    /// Send the request and build a model for each element of the payload.
    ///
    /// # Errors
    ///
    /// Same as [`RequestAdapter::send_object`].
    pub async fn send_collection<T>(
        &self,
        request: RequestInformation,
        factory: ParsableFactory<T>,
        handler: Option<&dyn ResponseHandler<Option<Vec<T>>>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<Vec<T>>> {
        self.process(
            request,
            TargetShape::ObjectCollection(factory),
            handler,
            error_mapping,
            |extracted| Ok(extracted.into_objects()),
        )
        .await
    }

    /// Send the request and decode a scalar payload.
    ///
    /// # Errors
    ///
    /// Same as [`RequestAdapter::send_object`], and
    /// [`crate::Error::UnsupportedPrimitive`] if `T` rejects a value of its own kind.
    pub async fn send_primitive<T: Primitive>(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<Option<T>>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<T>> {
        self.process(
            request,
            TargetShape::<()>::Scalar(T::KIND),
            handler,
            error_mapping,
            |extracted| extracted.into_scalar().map(T::try_from_value).transpose(),
        )
        .await
    }

    /// Send the request and decode a collection of scalars; null elements are skipped.
    ///
    /// # Errors
    ///
    /// Same as [`RequestAdapter::send_primitive`].
    pub async fn send_primitive_collection<T: Primitive>(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<Option<Vec<T>>>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<Vec<T>>> {
        self.process(
            request,
            TargetShape::<()>::ScalarCollection(T::KIND),
            handler,
            error_mapping,
            |extracted| {
                extracted
                    .into_scalars()
                    .map(|values| {
                        values
                            .into_iter()
                            .map(T::try_from_value)
                            .collect::<Result<Vec<_>>>()
                    })
                    .transpose()
            },
        )
        .await
    }

    /// Send the request and hand over the response body unread.
    ///
    /// Returns `None` for a `204 No Content` response. The caller owns the
    /// body and closes it by dropping it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or sent, or if the
    /// response status is not 2xx.
    pub async fn send_stream(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<Option<ResponseBody>>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<ResponseBody>> {
        self.process(
            request,
            TargetShape::<()>::RawStream,
            handler,
            error_mapping,
            |extracted| Ok(extracted.into_stream()),
        )
        .await
    }

    /// Send the request, ignoring any payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or sent, or if the
    /// response status is not 2xx.
    pub async fn send_no_content(
        &self,
        request: RequestInformation,
        handler: Option<&dyn ResponseHandler<()>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<()> {
        self.process(
            request,
            TargetShape::<()>::Void,
            handler,
            error_mapping,
            |_| Ok(()),
        )
        .await
    }

    /// Send the request and extract the payload with an explicit shape.
    ///
    /// # Errors
    ///
    /// Same as [`RequestAdapter::send_object`].
    pub async fn send<T>(
        &self,
        request: RequestInformation,
        shape: TargetShape<T>,
        handler: Option<&dyn ResponseHandler<Extracted<T>>>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Extracted<T>> {
        self.process(request, shape, handler, error_mapping, Ok).await
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    async fn process<T, O>(
        &self,
        mut request: RequestInformation,
        shape: TargetShape<T>,
        handler: Option<&dyn ResponseHandler<O>>,
        error_mapping: Option<&ErrorMapping>,
        finish: impl FnOnce(Extracted<T>) -> Result<O>,
    ) -> Result<O> {
        let response = self.get_response(&mut request).await?;

        if let Some(handler) = handler {
            return handler.handle_response(response, error_mapping).await;
        }

        let response = ensure_success(response, error_mapping, &self.registry)
            .await
            .inspect_err(|err| debug!(error = %err, "response classified as failure"))?;
        let extracted = dispatch(response, shape, &self.registry)
            .await
            .inspect_err(|err| debug!(error = %err, "payload extraction failed"))?;

        finish(extracted)
    }

    /// Transmits the request, answering at most one claims challenge.
    async fn get_response(&self, request: &mut RequestInformation) -> Result<Response> {
        let mut claims = ClaimsState::Absent;

        loop {
            request.path_parameter(BASE_URL_PARAMETER, self.base_url.as_str());
            self.authentication
                .authenticate_request(request, &claims.auth_context())
                .await?;

            let transport_request = request.to_request().await?;
            debug!(
                method = %transport_request.method(),
                url = %transport_request.url(),
                with_claims = !claims.is_absent(),
                "sending request"
            );

            let response = self
                .client
                .execute(transport_request)
                .await
                .inspect_err(|err| debug!(error = %err, "transport failed"))?;

            let Some(token) = claims_from_response(&response, request, &claims) else {
                return Ok(response);
            };

            info!(status = response.status(), "claims challenge received, retrying with claims");
            response.close();
            request.rewind_content()?;
            claims = ClaimsState::Populated(token);
        }
    }
}

/// Builder for [`RequestAdapter`].
pub struct RequestAdapterBuilder<A, C> {
    authentication: A,
    client: C,
    base_url: Option<String>,
    registry: Option<ParseNodeFactoryRegistry>,
}

impl<A, C> fmt::Debug for RequestAdapterBuilder<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAdapterBuilder")
            .field("base_url", &self.base_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<A, C> RequestAdapterBuilder<A, C>
where
    A: AuthenticationProvider,
    C: HttpClient,
{
    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Replace the parse node factories.
    #[must_use]
    pub fn parse_node_factory(mut self, registry: ParseNodeFactoryRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the adapter.
    #[must_use]
    pub fn build(self) -> RequestAdapter<A, C> {
        RequestAdapter {
            authentication: self.authentication,
            client: self.client,
            base_url: self.base_url.unwrap_or_default(),
            registry: self.registry.unwrap_or_default(),
        }
    }
}
