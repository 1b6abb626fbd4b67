//! Plain text parse nodes.

use bytes::Bytes;

use crate::primitive::decode_decimal;
use crate::{Decimal, Error, ParseNode, ParseNodeFactory, Result};

/// Parse node over a `text/plain` payload holding a single scalar.
///
/// Surrounding whitespace and double quotes are ignored. Text has no
/// structure: it has no children and is not a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParseNode {
    text: String,
}

impl TextParseNode {
    /// Node over a text payload.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let trimmed = text.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(trimmed);
        Self {
            text: unquoted.to_string(),
        }
    }

    /// The text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    fn parse<T: std::str::FromStr>(&self, expected: &str) -> Result<Option<T>> {
        self.text.parse().map(Some).map_err(|_| {
            Error::deserialization("", format!("expected {expected}, found {:?}", self.text))
        })
    }
}

impl ParseNode for TextParseNode {
    fn child_node(&self, _name: &str) -> Option<Box<dyn ParseNode + '_>> {
        None
    }

    fn collection_nodes(&self) -> Result<Option<Vec<Box<dyn ParseNode + '_>>>> {
        Err(Error::deserialization(
            "",
            "text does not support collections",
        ))
    }

    fn string_value(&self) -> Result<Option<String>> {
        Ok(Some(self.text.clone()))
    }

    fn bool_value(&self) -> Result<Option<bool>> {
        self.parse("a boolean")
    }

    fn long_value(&self) -> Result<Option<i64>> {
        self.parse("an integer")
    }

    fn double_value(&self) -> Result<Option<f64>> {
        self.parse("a number")
    }

    fn decimal_value(&self) -> Result<Option<Decimal>> {
        decode_decimal("", &self.text).map(Some)
    }
}

/// Factory for `text/plain` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParseNodeFactory;

impl ParseNodeFactory for TextParseNodeFactory {
    fn valid_content_type(&self) -> &str {
        "text/plain"
    }

    fn root_node(&self, _content_type: &str, content: Bytes) -> Result<Box<dyn ParseNode>> {
        let text = std::str::from_utf8(&content)
            .map_err(|e| Error::deserialization("", format!("text payload is not UTF-8: {e}")))?;
        Ok(Box::new(TextParseNode::new(text)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    #[test]
    fn scalars_from_text() {
        assert_eq!(TextParseNode::new("42\n").int_value().expect("int"), Some(42));
        assert_eq!(TextParseNode::new("true").bool_value().expect("bool"), Some(true));
        assert_eq!(TextParseNode::new("2.5").double_value().expect("double"), Some(2.5));
        assert_eq!(
            TextParseNode::new("\"hello\"").string_value().expect("string"),
            Some("hello".to_string())
        );
        assert_eq!(
            TextParseNode::new("10:30:00").time_value().expect("time"),
            NaiveTime::from_hms_opt(10, 30, 0)
        );
    }

    #[test]
    fn mismatches_and_structure() {
        assert!(TextParseNode::new("yes").bool_value().is_err());
        assert!(TextParseNode::new("1.5").long_value().is_err());
        assert!(TextParseNode::new("x").child_node("a").is_none());
        assert!(TextParseNode::new("x").collection_nodes().is_err());
    }

    #[test]
    fn factory_rejects_invalid_utf8() {
        assert!(
            TextParseNodeFactory
                .root_node("text/plain", Bytes::from_static(&[0xff, 0xfe]))
                .is_err()
        );
        let node = TextParseNodeFactory
            .root_node("text/plain", Bytes::from_static(b"-7"))
            .expect("text");
        assert_eq!(node.byte_value().expect("byte"), Some(-7));
    }
}
