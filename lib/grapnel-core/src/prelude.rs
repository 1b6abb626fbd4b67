//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use grapnel_core::prelude::*;
//! ```

pub use crate::{
    ApiError, AuthContext, AuthenticationProvider, Error, ErrorMapping, HttpClient, Method,
    Parsable, ParseNode, Primitive, RequestContent, RequestInformation, Response, ResponseBody,
    ResponseHandler, Result, TargetShape,
};
