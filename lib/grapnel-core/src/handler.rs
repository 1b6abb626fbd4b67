//! Caller-supplied response processing.

use std::future::Future;
use std::pin::Pin;

use crate::{ErrorMapping, Response, Result};

/// Boxed future returned by a [`ResponseHandler`].
pub type HandlerFuture<'a, O> = Pin<Box<dyn Future<Output = Result<O>> + Send + 'a>>;

/// Takes over the processing of a raw response.
///
/// When a handler is supplied to a send operation, the built-in
/// classification and extraction are skipped: the handler receives the
/// response as it came from the transport (after any claims retry) together
/// with the error mapping of the call, and its output becomes the result of
/// the operation. The handler owns the body and must read or drop it.
///
/// # Example
///
/// ```
/// use grapnel_core::{ErrorMapping, HandlerFuture, Response, ResponseHandler};
///
/// /// Yields the status code, ignoring the payload.
/// struct StatusOnly;
///
/// impl ResponseHandler<u16> for StatusOnly {
///     fn handle_response<'a>(
///         &'a self,
///         response: Response,
///         _error_mapping: Option<&'a ErrorMapping>,
///     ) -> HandlerFuture<'a, u16> {
///         Box::pin(async move { Ok(response.status()) })
///     }
/// }
/// ```
pub trait ResponseHandler<O>: Send + Sync {
    /// Processes the response.
    fn handle_response<'a>(
        &'a self,
        response: Response,
        error_mapping: Option<&'a ErrorMapping>,
    ) -> HandlerFuture<'a, O>;
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;

    use super::*;
    use crate::{ParseNodeFactoryRegistry, ResponseBody, ensure_success};

    /// Classifies with the mapping, then returns the body as text.
    struct TextHandler {
        registry: ParseNodeFactoryRegistry,
    }

    impl ResponseHandler<String> for TextHandler {
        fn handle_response<'a>(
            &'a self,
            response: Response,
            error_mapping: Option<&'a ErrorMapping>,
        ) -> HandlerFuture<'a, String> {
            Box::pin(async move {
                let response = ensure_success(response, error_mapping, &self.registry).await?;
                response.text().await
            })
        }
    }

    #[tokio::test]
    async fn handler_owns_the_response() {
        let handler = TextHandler {
            registry: ParseNodeFactoryRegistry::default(),
        };

        let ok = Response::new(200, HeaderMap::new(), ResponseBody::from_bytes("pong"));
        let text = handler.handle_response(ok, None).await.expect("text");
        assert_eq!(text, "pong");

        let failed = Response::new(500, HeaderMap::new(), ResponseBody::empty());
        let err = handler
            .handle_response(failed, None)
            .await
            .expect_err("unmapped status");
        assert_eq!(err.status(), Some(500));
    }
}
