//! Serialization boundary.
//!
//! - [`ParseNode`] - navigable view over a decoded payload
//! - [`ParseNodeFactory`] - builds the root node of a payload for one content type
//! - [`ParseNodeFactoryRegistry`] - picks a factory from a response content type
//! - [`Parsable`] - a model that can be built from a parse node
//!
//! # Example
//!
//! ```
//! use grapnel_core::{Parsable, ParseNode, ParseNodeFactory, ParseNodeFactoryRegistry, Result};
//!
//! #[derive(Debug, PartialEq)]
//! struct User {
//!     id: Option<String>,
//! }
//!
//! impl Parsable for User {
//!     fn from_parse_node(node: &dyn ParseNode) -> Result<Self> {
//!         Ok(Self { id: node.child_string("id")? })
//!     }
//! }
//!
//! let registry = ParseNodeFactoryRegistry::default();
//! let root = registry
//!     .root_node("application/json", br#"{"id":"1"}"#.as_slice().into())
//!     .expect("root node");
//! let user = User::from_parse_node(&*root).expect("user");
//! assert_eq!(user, User { id: Some("1".to_string()) });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use uuid::Uuid;

use crate::primitive::{
    decode_bytes, decode_date, decode_date_time, decode_duration, decode_time, decode_uuid,
};
use crate::{Decimal, Error, JsonParseNodeFactory, Result, TextParseNodeFactory};

/// A navigable view over a decoded payload.
///
/// Getters return `Ok(None)` for a null value and an error for a value of
/// another shape. Textual kinds (uuid, dates, duration, bytes) are decoded
/// from [`ParseNode::string_value`] by default.
pub trait ParseNode: Send + Sync {
    /// Location of this node in the payload, for error messages.
    fn path(&self) -> &str {
        ""
    }

    /// Child node for a property, `None` if absent.
    fn child_node(&self, name: &str) -> Option<Box<dyn ParseNode + '_>>;

    /// Element nodes of a collection, `None` if null.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a collection.
    fn collection_nodes(&self) -> Result<Option<Vec<Box<dyn ParseNode + '_>>>>;

    /// Whether this node holds an explicit null.
    fn is_null(&self) -> bool {
        false
    }

    /// String value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a string.
    fn string_value(&self) -> Result<Option<String>>;

    /// Boolean value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a boolean.
    fn bool_value(&self) -> Result<Option<bool>>;

    /// 64-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not an integer.
    fn long_value(&self) -> Result<Option<i64>>;

    /// 64-bit float value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a number.
    fn double_value(&self) -> Result<Option<f64>>;

    /// Decimal value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a number.
    fn decimal_value(&self) -> Result<Option<Decimal>>;

    /// 8-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not an integer in range.
    fn byte_value(&self) -> Result<Option<i8>> {
        narrow(self.path(), self.long_value()?)
    }

    /// 16-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not an integer in range.
    fn short_value(&self) -> Result<Option<i16>> {
        narrow(self.path(), self.long_value()?)
    }

    /// 32-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not an integer in range.
    fn int_value(&self) -> Result<Option<i32>> {
        narrow(self.path(), self.long_value()?)
    }

    /// 32-bit float value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a number.
    #[allow(clippy::cast_possible_truncation)]
    fn float_value(&self) -> Result<Option<f32>> {
        Ok(self.double_value()?.map(|v| v as f32))
    }

    /// UUID value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a UUID string.
    fn uuid_value(&self) -> Result<Option<Uuid>> {
        self.string_value()?
            .map(|s| decode_uuid(self.path(), &s))
            .transpose()
    }

    /// Date value (`YYYY-MM-DD`).
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a date string.
    fn date_value(&self) -> Result<Option<NaiveDate>> {
        self.string_value()?
            .map(|s| decode_date(self.path(), &s))
            .transpose()
    }

    /// Time of day value (`HH:MM:SS[.fff]`).
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a time string.
    fn time_value(&self) -> Result<Option<NaiveTime>> {
        self.string_value()?
            .map(|s| decode_time(self.path(), &s))
            .transpose()
    }

    /// RFC 3339 date-time value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a date-time string.
    fn date_time_value(&self) -> Result<Option<DateTime<FixedOffset>>> {
        self.string_value()?
            .map(|s| decode_date_time(self.path(), &s))
            .transpose()
    }

    /// ISO 8601 duration value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a duration string.
    fn duration_value(&self) -> Result<Option<TimeDelta>> {
        self.string_value()?
            .map(|s| decode_duration(self.path(), &s))
            .transpose()
    }

    /// Base64 byte array value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not a base64 string.
    fn bytes_value(&self) -> Result<Option<Vec<u8>>> {
        self.string_value()?
            .map(|s| decode_bytes(self.path(), &s))
            .transpose()
    }

    /// String value of a child property, `None` if absent or null.
    ///
    /// # Errors
    ///
    /// Returns an error if the child is not a string.
    fn child_string(&self, name: &str) -> Result<Option<String>> {
        self.child_node(name)
            .map_or(Ok(None), |child| child.string_value())
    }
}

fn narrow<T: TryFrom<i64>>(path: &str, value: Option<i64>) -> Result<Option<T>> {
    value
        .map(|v| {
            T::try_from(v).map_err(|_| {
                Error::deserialization(
                    path,
                    format!("{v} is out of range for {}", std::any::type_name::<T>()),
                )
            })
        })
        .transpose()
}

/// A model that can be built from a parse node.
pub trait Parsable: Sized {
    /// Builds the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not describe a valid model.
    fn from_parse_node(node: &dyn ParseNode) -> Result<Self>;
}

/// Builds a model from a parse node; `T::from_parse_node` for a [`Parsable`] `T`.
pub type ParsableFactory<T> = fn(&dyn ParseNode) -> Result<T>;

// ============================================================================
// Factories
// ============================================================================

/// Builds the root parse node of a payload.
pub trait ParseNodeFactory: Send + Sync {
    /// Content type this factory handles, e.g. `application/json`.
    fn valid_content_type(&self) -> &str;

    /// Builds the root node.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded.
    fn root_node(&self, content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>>;
}

/// Parse node factories keyed by content type.
///
/// The default registry handles `application/json` and `text/plain`.
/// Vendor types with a structured suffix, such as
/// `application/vnd.acme+json`, resolve to their suffix type.
#[derive(Clone)]
pub struct ParseNodeFactoryRegistry {
    factories: HashMap<String, Arc<dyn ParseNodeFactory>>,
}

impl ParseNodeFactoryRegistry {
    /// A registry without any factory.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory under its content type, replacing a previous one.
    pub fn register(&mut self, factory: impl ParseNodeFactory + 'static) -> &mut Self {
        let content_type = factory.valid_content_type().to_ascii_lowercase();
        self.factories.insert(content_type, Arc::new(factory));
        self
    }

    /// Registers a factory (builder style).
    #[must_use]
    pub fn with(mut self, factory: impl ParseNodeFactory + 'static) -> Self {
        self.register(factory);
        self
    }

    /// Returns `true` if a factory handles the content type.
    #[must_use]
    pub fn supports(&self, content_type: &str) -> bool {
        self.factories.contains_key(&vendor_neutral(content_type))
    }
}

impl Default for ParseNodeFactoryRegistry {
    fn default() -> Self {
        Self::empty()
            .with(JsonParseNodeFactory)
            .with(TextParseNodeFactory)
    }
}

impl fmt::Debug for ParseNodeFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut content_types: Vec<_> = self.factories.keys().collect();
        content_types.sort();
        f.debug_struct("ParseNodeFactoryRegistry")
            .field("content_types", &content_types)
            .finish()
    }
}

impl ParseNodeFactory for ParseNodeFactoryRegistry {
    fn valid_content_type(&self) -> &str {
        "*/*"
    }

    fn root_node(&self, content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>> {
        if content_type.trim().is_empty() {
            return Err(Error::MissingContentType);
        }
        let key = vendor_neutral(content_type);
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| Error::UnsupportedContentType(key.clone()))?;
        factory.root_node(&key, content)
    }
}

/// Lower-cases, drops parameters and resolves `type/vnd.x+suffix` to `type/suffix`.
fn vendor_neutral(content_type: &str) -> String {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match media_type.split_once('/') {
        Some((kind, subtype)) => match subtype.rsplit_once('+') {
            Some((_, suffix)) if !suffix.is_empty() => format!("{kind}/{suffix}"),
            _ => media_type.clone(),
        },
        None => media_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_types_are_neutralised() {
        assert_eq!(vendor_neutral("application/json"), "application/json");
        assert_eq!(
            vendor_neutral("Application/VND.Acme.User+JSON; charset=utf-8"),
            "application/json"
        );
        assert_eq!(vendor_neutral("text/plain"), "text/plain");
        assert_eq!(vendor_neutral("application/x+"), "application/x+");
    }

    #[test]
    fn default_registry_supports_json_and_text() {
        let registry = ParseNodeFactoryRegistry::default();
        assert!(registry.supports("application/json"));
        assert!(registry.supports("application/problem+json"));
        assert!(registry.supports("text/plain"));
        assert!(!registry.supports("application/xml"));
    }

    #[test]
    fn unsupported_and_missing_content_types() {
        let registry = ParseNodeFactoryRegistry::default();

        let err = registry
            .root_node("application/xml", Bytes::from_static(b"<a/>"))
            .err()
            .expect("unsupported");
        assert!(matches!(err, Error::UnsupportedContentType(ref ct) if ct == "application/xml"));

        let err = registry
            .root_node("", Bytes::new())
            .err()
            .expect("missing");
        assert!(matches!(err, Error::MissingContentType));

        let err = ParseNodeFactoryRegistry::empty()
            .root_node("application/json", Bytes::from_static(b"{}"))
            .err()
            .expect("empty registry");
        assert!(matches!(err, Error::UnsupportedContentType(_)));
    }

    #[test]
    fn narrowing_checks_range() {
        assert_eq!(narrow::<i8>("", Some(-128)).expect("in range"), Some(-128));
        assert_eq!(narrow::<i16>("", None).expect("null"), None);
        let err = narrow::<i8>("size", Some(300)).expect_err("out of range");
        assert!(matches!(err, Error::Deserialization { ref path, .. } if path == "size"));
    }
}
