//! Prelude module for convenient imports.
//!
//! ```ignore
//! use grapnel::prelude::*;
//! ```

pub use crate::{
    AnonymousAuthenticationProvider, ApiError, AuthContext, AuthenticationProvider,
    BearerTokenAuthenticationProvider, ClientConfig, Error, ErrorMapping, HttpClient, HyperClient,
    Method, Parsable, ParseNode, Primitive, RequestAdapter, RequestContent, RequestInformation,
    Response, ResponseBody, ResponseHandler, Result, StaticTokenProvider, StatusCode, TargetShape,
    header,
};
pub use crate::middleware::RedirectOptions;
