//! JSON values and response paths.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Whether the value can be coerced to a GraphQL `Int`.
    fn is_valid_int_input(&self) -> bool;

    /// Whether the value can be coerced to a GraphQL `Float`.
    fn is_valid_float_input(&self) -> bool;

    /// A short name for the kind of value, used in error messages.
    fn kind(&self) -> &'static str;
}

impl ValueExt for Value {
    // https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
    fn is_valid_int_input(&self) -> bool {
        self.as_i64().and_then(|x| i32::try_from(x).ok()).is_some()
    }

    // https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
    fn is_valid_float_input(&self) -> bool {
        self.as_f64().map(f64::is_finite).unwrap_or_default()
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "float",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "object",
        }
    }
}

/// A GraphQL path element that is composed of strings or numbers.
/// e.g `/tutorial/comments/0/body`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => f.write_str(key),
        }
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

/// A path into the result document.
///
/// Serializes as a list of keys and indexes, as GraphQL error paths do.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element)
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    pub fn join(&self, element: impl Into<PathElement>) -> Self {
        let mut elements = self.0.clone();
        elements.push(element.into());
        Path(elements)
    }
}

impl<T> From<T> for Path
where
    T: AsRef<str>,
{
    fn from(s: T) -> Self {
        Self(
            s.as_ref()
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.parse::<usize>() {
                    Ok(index) => PathElement::Index(index),
                    Err(_) => PathElement::Key(s.to_string()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;

    #[test]
    fn path_display_and_parse() {
        let path = Path::from("/tutorial/Comments/0/body");
        assert_eq!(
            path.0,
            vec![
                PathElement::Key("tutorial".to_string()),
                PathElement::Key("Comments".to_string()),
                PathElement::Index(0),
                PathElement::Key("body".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "/tutorial/Comments/0/body");
    }

    #[test]
    fn path_serializes_as_a_list() {
        let path = Path::empty().join("list").join(2usize).join("Title");
        assert_eq!(
            serde_json::to_value(&path).unwrap(),
            serde_json::json!(["list", 2, "Title"])
        );
    }

    #[test]
    fn int_input_is_bounded_to_32_bits() {
        assert!(json!(1).is_valid_int_input());
        assert!(json!(i32::MIN).is_valid_int_input());
        assert!(!json!(i64::from(i32::MAX) + 1).is_valid_int_input());
        assert!(!json!(1.5).is_valid_int_input());
        assert!(!json!("1").is_valid_int_input());
        assert!(json!(1).is_valid_float_input());
        assert!(json!(1.5).is_valid_float_input());
        assert!(!json!(true).is_valid_float_input());
    }
}
