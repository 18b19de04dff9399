//! Provenance-preserving decoding over `marked_yaml` nodes.
//!
//! Records implement [`Decode`] by opening their mapping with [`Fields::of`],
//! which rejects keys the record does not know, and by stamping the node's
//! position via [`attach_position`]. Fields that accept several shapes go
//! through [`decode_shapes`], which tries each [`Shape`] in a fixed order.

use indexmap::IndexMap;
use marked_yaml::types::{MarkedMappingNode, MarkedScalarNode};
use marked_yaml::Node;
use thiserror::Error;

use super::position::{attach_position, FileContext};

/// What went wrong while decoding a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The document is not well-formed YAML.
    Syntax,
    /// A mapping carries a key its record does not define.
    UnknownField,
    /// A value cannot be represented by the target record.
    Invalid,
}

/// A decode failure with the position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    pub message: String,
    pub position: FileContext,
}

impl DecodeError {
    /// Malformed YAML; always reported at the start of the file.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::Syntax,
            message: message.into(),
            position: FileContext::default(),
        }
    }

    pub fn unknown_field(position: FileContext, message: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::UnknownField,
            message: message.into(),
            position,
        }
    }

    pub fn invalid(position: FileContext, message: impl Into<String>) -> Self {
        Self {
            kind: DecodeErrorKind::Invalid,
            message: message.into(),
            position,
        }
    }
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// A record that can be decoded from a YAML node.
pub trait Decode: Sized {
    fn decode(node: &Node) -> DecodeResult<Self>;
}

impl Decode for String {
    fn decode(node: &Node) -> DecodeResult<Self> {
        scalar_str(node, "value").map(str::to_string)
    }
}

/// Whether a node stands for an absent value (`key:`, `~` or `null`).
///
/// Only plain scalars are nulls; `'null'` and `''` are strings.
pub fn is_null(node: &Node) -> bool {
    node.as_scalar().is_some_and(|s| {
        s.may_coerce() && matches!(s.as_str(), "" | "~" | "null" | "Null" | "NULL")
    })
}

/// Borrow the text of a scalar node.
pub fn scalar_str<'n>(node: &'n Node, what: &str) -> DecodeResult<&'n str> {
    node.as_scalar()
        .map(MarkedScalarNode::as_str)
        .ok_or_else(|| DecodeError::invalid(attach_position(node), format!("{what}: expected a string")))
}

/// Parse a scalar node as a 32-bit integer.
pub fn scalar_int(node: &Node, what: &str) -> DecodeResult<i32> {
    let text = node.as_scalar().map(MarkedScalarNode::as_str).ok_or_else(|| {
        DecodeError::invalid(attach_position(node), format!("{what}: expected an integer"))
    })?;
    text.trim().parse::<i32>().map_err(|_| {
        DecodeError::invalid(
            attach_position(node),
            format!("{what}: `{text}` is not an integer"),
        )
    })
}

/// Field accessor for a record's mapping node.
pub struct Fields<'n> {
    record: &'static str,
    map: &'n MarkedMappingNode,
}

impl<'n> Fields<'n> {
    /// Open a mapping node, rejecting any key outside `allowed`.
    pub fn of(node: &'n Node, record: &'static str, allowed: &[&str]) -> DecodeResult<Self> {
        let map = node.as_mapping().ok_or_else(|| {
            DecodeError::invalid(attach_position(node), format!("{record}: expected a mapping"))
        })?;

        for (key, _) in map.iter() {
            if !allowed.contains(&key.as_str()) {
                return Err(DecodeError::unknown_field(
                    FileContext::from(key.span()),
                    format!("{record}: unknown field `{}`", key.as_str()),
                ));
            }
        }

        Ok(Self { record, map })
    }

    /// The node stored under `key`, treating explicit nulls as absent.
    pub fn node(&self, key: &str) -> Option<&'n Node> {
        self.map.get_node(key).filter(|node| !is_null(node))
    }

    fn what(&self, key: &str) -> String {
        format!("{}.{}", self.record, key)
    }

    /// A string field; absent values decode as the empty string.
    pub fn string(&self, key: &str) -> DecodeResult<String> {
        match self.node(key) {
            Some(node) => Ok(scalar_str(node, &self.what(key))?.to_string()),
            None => Ok(String::new()),
        }
    }

    /// An integer field; absent values decode as zero.
    pub fn int(&self, key: &str) -> DecodeResult<i32> {
        match self.node(key) {
            Some(node) => scalar_int(node, &self.what(key)),
            None => Ok(0),
        }
    }

    /// An optional nested record.
    pub fn decode<T: Decode>(&self, key: &str) -> DecodeResult<Option<T>> {
        self.node(key).map(T::decode).transpose()
    }

    /// A sequence of records; absent values decode as an empty list.
    pub fn list<T: Decode>(&self, key: &str) -> DecodeResult<Vec<T>> {
        let Some(node) = self.node(key) else {
            return Ok(Vec::new());
        };
        let seq = node.as_sequence().ok_or_else(|| {
            DecodeError::invalid(
                attach_position(node),
                format!("{}: expected a sequence", self.what(key)),
            )
        })?;
        seq.iter().map(T::decode).collect()
    }

    /// A mapping of string keys to string values, in document order.
    pub fn string_map(&self, key: &str) -> DecodeResult<IndexMap<String, String>> {
        let Some(node) = self.node(key) else {
            return Ok(IndexMap::new());
        };
        let what = self.what(key);
        let map = node.as_mapping().ok_or_else(|| {
            DecodeError::invalid(attach_position(node), format!("{what}: expected a mapping"))
        })?;
        map.iter()
            .map(|(k, v)| {
                let value = if is_null(v) { "" } else { scalar_str(v, &what)? };
                Ok((k.as_str().to_string(), value.to_string()))
            })
            .collect()
    }

    /// A keyword from a closed set, decoded through `parse`.
    pub fn keyword<T>(
        &self,
        key: &str,
        parse: fn(&str) -> Option<T>,
        keywords: &[&str],
    ) -> DecodeResult<Option<T>> {
        let Some(node) = self.node(key) else {
            return Ok(None);
        };
        let what = self.what(key);
        let text = scalar_str(node, &what)?;
        parse(text).map(Some).ok_or_else(|| {
            DecodeError::invalid(
                attach_position(node),
                format!("{what}: `{text}` is not one of {}", keywords.join(", ")),
            )
        })
    }
}

/// Structural shape of a YAML node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Bare,
    Seq,
    Map,
}

impl Shape {
    pub fn of(node: &Node) -> Self {
        match node {
            Node::Scalar(_) => Shape::Bare,
            Node::Sequence(_) => Shape::Seq,
            Node::Mapping(_) => Shape::Map,
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Bare => write!(f, "scalar"),
            Shape::Seq => write!(f, "sequence"),
            Shape::Map => write!(f, "mapping"),
        }
    }
}

/// One candidate shape for a polymorphic field.
pub struct Attempt<T> {
    pub shape: Shape,
    pub label: &'static str,
    pub decode: fn(&Node) -> DecodeResult<T>,
}

/// Decode a polymorphic field by trying each attempt in order.
///
/// Attempts whose shape does not match the node are skipped. The first
/// successful decode wins. When all fail, an unknown-field error from any
/// attempt takes precedence; otherwise the error lists every attempt.
pub fn decode_shapes<T>(node: &Node, field: &str, attempts: &[Attempt<T>]) -> DecodeResult<T> {
    let actual = Shape::of(node);
    let mut tried = Vec::with_capacity(attempts.len());
    let mut unknown = None;

    for attempt in attempts {
        if attempt.shape != actual {
            tried.push(format!("{}: got a {}", attempt.label, actual));
            continue;
        }
        match (attempt.decode)(node) {
            Ok(value) => return Ok(value),
            Err(err) => {
                tried.push(format!("{}: {}", attempt.label, err.message));
                if err.kind == DecodeErrorKind::UnknownField && unknown.is_none() {
                    unknown = Some(err);
                }
            }
        }
    }

    if let Some(err) = unknown {
        return Err(err);
    }
    Err(DecodeError::invalid(
        attach_position(node),
        format!("{field}: no accepted shape matched ({})", tried.join("; ")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(text: &str) -> Node {
        marked_yaml::parse_yaml(0, text).unwrap()
    }

    #[test]
    fn fields_reject_unknown_keys() {
        let node = load("uid: a\nbogus: b\n");
        let err = Fields::of(&node, "policy", &["uid"]).err().unwrap();
        assert_eq!(err.kind, DecodeErrorKind::UnknownField);
        assert!(err.message.contains("bogus"));
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn missing_and_null_strings_are_empty() {
        let node = load("a: ~\nb:\nc: text\n");
        let fields = Fields::of(&node, "record", &["a", "b", "c", "d"]).unwrap();
        assert_eq!(fields.string("a").unwrap(), "");
        assert_eq!(fields.string("b").unwrap(), "");
        assert_eq!(fields.string("c").unwrap(), "text");
        assert_eq!(fields.string("d").unwrap(), "");
    }

    #[test]
    fn quoted_null_is_a_string() {
        let node = load("a: 'null'\nb: \"~\"\nc: null\n");
        let fields = Fields::of(&node, "record", &["a", "b", "c"]).unwrap();
        assert_eq!(fields.string("a").unwrap(), "null");
        assert_eq!(fields.string("b").unwrap(), "~");
        assert!(fields.node("c").is_none());
        assert!(fields.node("a").is_some());
    }

    #[test]
    fn string_rejects_mapping() {
        let node = load("a:\n  b: c\n");
        let fields = Fields::of(&node, "record", &["a"]).unwrap();
        let err = fields.string("a").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::Invalid);
        assert!(err.message.contains("record.a"));
    }

    #[test]
    fn int_parses_and_rejects() {
        let node = load("good: 42\nbad: forty\n");
        let fields = Fields::of(&node, "record", &["good", "bad"]).unwrap();
        assert_eq!(fields.int("good").unwrap(), 42);
        assert!(fields.int("bad").is_err());
    }

    #[test]
    fn string_map_keeps_document_order() {
        let node = load("tags:\n  z: 1\n  a: 2\n");
        let fields = Fields::of(&node, "record", &["tags"]).unwrap();
        let tags = fields.string_map("tags").unwrap();
        let keys: Vec<_> = tags.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn keyword_lists_accepted_values() {
        let node = load("kind: purple\n");
        let fields = Fields::of(&node, "record", &["kind"]).unwrap();
        let err = fields
            .keyword("kind", |s| (s == "red").then_some(()), &["red"])
            .unwrap_err();
        assert!(err.message.contains("not one of red"));
    }

    #[test]
    fn first_matching_shape_wins() {
        let attempts: [Attempt<&'static str>; 2] = [
            Attempt {
                shape: Shape::Bare,
                label: "string",
                decode: |_| Ok("bare"),
            },
            Attempt {
                shape: Shape::Seq,
                label: "sequence",
                decode: |_| Ok("seq"),
            },
        ];
        let node = load("v: [a]\n");
        let value = node.as_mapping().unwrap().get_node("v").unwrap();
        assert_eq!(decode_shapes(value, "v", &attempts).unwrap(), "seq");
    }

    #[test]
    fn failed_shapes_are_accumulated() {
        let attempts: [Attempt<()>; 2] = [
            Attempt {
                shape: Shape::Bare,
                label: "string",
                decode: |_| Ok(()),
            },
            Attempt {
                shape: Shape::Map,
                label: "record",
                decode: |n| Err(DecodeError::invalid(attach_position(n), "nope")),
            },
        ];
        let node = load("v:\n  k: 1\n");
        let value = node.as_mapping().unwrap().get_node("v").unwrap();
        let err = decode_shapes(value, "v", &attempts).unwrap_err();
        assert!(err.message.contains("string: got a mapping"));
        assert!(err.message.contains("record: nope"));
    }
}
