use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;

use crate::graphql::Error;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// A GraphQL response: the resolved `data` and the errors collected while producing it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data, `null` when the query could not be parsed or validated.
    #[serde(default)]
    pub data: Option<Value>,

    /// The optional graphql errors encountered.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>) -> Self {
        Self { data, errors }
    }

    /// Renders a resolved result tree along with the errors recorded while resolving it.
    pub fn from_result(result: ResultNode, errors: Vec<Error>) -> Self {
        Self {
            data: Some(result.into_value()),
            errors,
        }
    }

    /// Whether any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Serializes the response as compact JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the response as indented JSON.
    pub fn to_json_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// The result of resolving one field, shaped like the validated selection it answers.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultNode {
    /// A resolved leaf value.
    Value(Value),
    /// An object, keyed by response key in selection order.
    Object(Vec<(String, ResultNode)>),
    /// A list, in source order.
    List(Vec<ResultNode>),
    /// A resolver returned no value.
    Null,
    /// Resolution failed; the index points into the response errors.
    Error(usize),
}

impl ResultNode {
    /// Converts the tree into JSON. Failed fields render as `null`.
    pub fn into_value(self) -> Value {
        match self {
            ResultNode::Value(value) => value,
            ResultNode::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, node)| (ByteString::from(key), node.into_value()))
                    .collect::<Object>(),
            ),
            ResultNode::List(items) => {
                Value::Array(items.into_iter().map(ResultNode::into_value).collect())
            }
            ResultNode::Null | ResultNode::Error(_) => Value::Null,
        }
    }
}
