//! JSON parse nodes backed by `serde_json`.
//!
//! Numbers keep their textual form, so decimals are read without loss of
//! precision.

use std::borrow::Cow;

use bytes::Bytes;
use serde_json::Value;

use crate::primitive::decode_decimal;
use crate::{Decimal, Error, ParseNode, ParseNodeFactory, Result};

/// Parse node over a JSON value.
///
/// Child and element nodes borrow from their parent and track their path
/// (e.g. `users[2].address.city`) for error messages.
#[derive(Debug, Clone)]
pub struct JsonParseNode<'a> {
    value: Cow<'a, Value>,
    path: String,
}

impl JsonParseNode<'static> {
    /// Root node over an owned value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self {
            value: Cow::Owned(value),
            path: String::new(),
        }
    }

    /// Decodes a JSON payload into a root node.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid JSON.
    pub fn from_slice(content: &[u8]) -> Result<Self> {
        crate::from_json::<Value>(content).map(Self::new)
    }
}

impl<'a> JsonParseNode<'a> {
    fn borrowed(value: &'a Value, path: String) -> Self {
        Self {
            value: Cow::Borrowed(value),
            path,
        }
    }

    /// The underlying JSON value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    fn mismatch(&self, expected: &str) -> Error {
        let found = match self.value.as_ref() {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        };
        Error::deserialization(&self.path, format!("expected {expected}, found {found}"))
    }
}

impl ParseNode for JsonParseNode<'_> {
    fn path(&self) -> &str {
        &self.path
    }

    fn child_node(&self, name: &str) -> Option<Box<dyn ParseNode + '_>> {
        let child = self.value.as_object()?.get(name)?;
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        };
        Some(Box::new(JsonParseNode::borrowed(child, path)))
    }

    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn collection_nodes(&self) -> Result<Option<Vec<Box<dyn ParseNode + '_>>>> {
        match self.value.as_ref() {
            Value::Null => Ok(None),
            Value::Array(items) => Ok(Some(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let path = format!("{}[{index}]", self.path);
                        Box::new(JsonParseNode::borrowed(item, path)) as Box<dyn ParseNode + '_>
                    })
                    .collect(),
            )),
            _ => Err(self.mismatch("an array")),
        }
    }

    fn string_value(&self) -> Result<Option<String>> {
        match self.value.as_ref() {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(self.mismatch("a string")),
        }
    }

    fn bool_value(&self) -> Result<Option<bool>> {
        match self.value.as_ref() {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(*b)),
            _ => Err(self.mismatch("a boolean")),
        }
    }

    fn long_value(&self) -> Result<Option<i64>> {
        match self.value.as_ref() {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.mismatch("an integer")),
            _ => Err(self.mismatch("an integer")),
        }
    }

    fn double_value(&self) -> Result<Option<f64>> {
        match self.value.as_ref() {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.mismatch("a number")),
            _ => Err(self.mismatch("a number")),
        }
    }

    fn decimal_value(&self) -> Result<Option<Decimal>> {
        match self.value.as_ref() {
            Value::Null => Ok(None),
            Value::Number(n) => decode_decimal(&self.path, &n.to_string()).map(Some),
            Value::String(s) => decode_decimal(&self.path, s).map(Some),
            _ => Err(self.mismatch("a number")),
        }
    }
}

/// Factory for `application/json` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParseNodeFactory;

impl ParseNodeFactory for JsonParseNodeFactory {
    fn valid_content_type(&self) -> &str {
        "application/json"
    }

    fn root_node(&self, _content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>> {
        Ok(Box::new(JsonParseNode::from_slice(&content)?))
    }
}
