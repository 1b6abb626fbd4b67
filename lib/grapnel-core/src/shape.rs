//! Typed extraction of successful responses.
//!
//! A [`TargetShape`] names what the caller expects from a successful
//! response; [`dispatch`] reads the payload accordingly and produces an
//! [`Extracted`] value.

use std::fmt;

use crate::{
    Error, ParsableFactory, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry, PrimitiveKind,
    PrimitiveValue, Response, ResponseBody, Result,
};

/// Expected shape of a successful payload.
pub enum TargetShape<T> {
    /// No payload; the body is not read.
    Void,
    /// The raw body, handed over unread.
    RawStream,
    /// A single scalar.
    Scalar(PrimitiveKind),
    /// A collection of scalars.
    ScalarCollection(PrimitiveKind),
    /// A single model.
    Object(ParsableFactory<T>),
    /// A collection of models.
    ObjectCollection(ParsableFactory<T>),
}

impl<T> TargetShape<T> {
    /// Result of this shape for a response without content.
    #[must_use]
    pub const fn none(&self) -> Extracted<T> {
        match self {
            Self::Void | Self::RawStream => Extracted::Empty,
            Self::Scalar(_) => Extracted::Scalar(None),
            Self::ScalarCollection(_) => Extracted::Scalars(None),
            Self::Object(_) => Extracted::Object(None),
            Self::ObjectCollection(_) => Extracted::Objects(None),
        }
    }
}

impl<T> fmt::Debug for TargetShape<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("Void"),
            Self::RawStream => f.write_str("RawStream"),
            Self::Scalar(kind) => f.debug_tuple("Scalar").field(kind).finish(),
            Self::ScalarCollection(kind) => f.debug_tuple("ScalarCollection").field(kind).finish(),
            Self::Object(_) => f.write_str("Object"),
            Self::ObjectCollection(_) => f.write_str("ObjectCollection"),
        }
    }
}

/// Value extracted from a successful response.
#[derive(Debug)]
pub enum Extracted<T> {
    /// Nothing.
    Empty,
    /// The raw body; the caller owns it from now on.
    Stream(ResponseBody),
    /// A scalar, `None` for a null payload.
    Scalar(Option<PrimitiveValue>),
    /// Scalars, `None` for a null payload.
    Scalars(Option<Vec<PrimitiveValue>>),
    /// A model.
    Object(Option<T>),
    /// Models, `None` for a null payload.
    Objects(Option<Vec<T>>),
}

impl<T> Extracted<T> {
    /// Returns `true` for [`Extracted::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The raw body, if any.
    #[must_use]
    pub fn into_stream(self) -> Option<ResponseBody> {
        match self {
            Self::Stream(body) => Some(body),
            _ => None,
        }
    }

    /// The scalar, if any.
    #[must_use]
    pub fn into_scalar(self) -> Option<PrimitiveValue> {
        match self {
            Self::Scalar(value) => value,
            _ => None,
        }
    }

    /// The scalars, if any.
    #[must_use]
    pub fn into_scalars(self) -> Option<Vec<PrimitiveValue>> {
        match self {
            Self::Scalars(values) => values,
            _ => None,
        }
    }

    /// The model, if any.
    #[must_use]
    pub fn into_object(self) -> Option<T> {
        match self {
            Self::Object(value) => value,
            _ => None,
        }
    }

    /// The models, if any.
    #[must_use]
    pub fn into_objects(self) -> Option<Vec<T>> {
        match self {
            Self::Objects(values) => values,
            _ => None,
        }
    }
}

/// Extracts the value of a successful response.
///
/// - [`TargetShape::Void`] closes the body and yields [`Extracted::Empty`]
/// - a 204 response yields the empty value of the shape, see [`TargetShape::none`]
/// - [`TargetShape::RawStream`] hands the body over unread
/// - other shapes read the body and decode it with the parse node factory
///   of the response content type; null collection elements are skipped
///
/// The body is closed before returning, except when handed over.
///
/// # Errors
///
/// Returns [`Error::PayloadRead`] if the body cannot be read, the content
/// type is missing or unsupported, or the payload does not decode to the
/// shape.
pub async fn dispatch<T>(
    response: Response,
    shape: TargetShape<T>,
    registry: &ParseNodeFactoryRegistry,
) -> Result<Extracted<T>> {
    if matches!(shape, TargetShape::Void) || response.is_no_content() {
        response.close();
        return Ok(shape.none());
    }
    if matches!(shape, TargetShape::RawStream) {
        return Ok(Extracted::Stream(response.into_body()));
    }

    let content_type = response.content_type();
    let content = response.into_body().bytes().await.map_err(Error::payload_read)?;
    let content_type = content_type.ok_or_else(|| Error::payload_read(Error::MissingContentType))?;
    let root = registry
        .root_node(&content_type, content)
        .map_err(Error::payload_read)?;

    extract(root.as_ref(), shape).map_err(Error::payload_read)
}

fn extract<T>(root: &dyn ParseNode, shape: TargetShape<T>) -> Result<Extracted<T>> {
    let extracted = match shape {
        TargetShape::Void | TargetShape::RawStream => Extracted::Empty,
        TargetShape::Scalar(kind) => Extracted::Scalar(PrimitiveValue::read(root, kind)?),
        TargetShape::ScalarCollection(kind) => {
            let values = root
                .collection_nodes()?
                .map(|nodes| {
                    nodes
                        .iter()
                        .filter_map(|node| PrimitiveValue::read(node.as_ref(), kind).transpose())
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?;
            Extracted::Scalars(values)
        }
        TargetShape::Object(_) if root.is_null() => Extracted::Object(None),
        TargetShape::Object(factory) => Extracted::Object(Some(factory(root)?)),
        TargetShape::ObjectCollection(factory) => {
            let values = root
                .collection_nodes()?
                .map(|nodes| {
                    nodes
                        .iter()
                        .map(|node| factory(node.as_ref()))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?;
            Extracted::Objects(values)
        }
    };
    Ok(extracted)
}
