use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;

/// A GraphQL `Request`: a query document and its optional variable bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL query document.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,

    /// The (optional) GraphQL operation name.
    ///
    /// When specified, this name must match the name of an operation in the
    /// GraphQL document. When excluded, there must exist only a single
    /// operation in the GraphQL document.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    ///
    /// When specified, these variables can be referred to in the `query` by
    /// using `$variableName` syntax, where `{"variableName": "value"}` has been
    /// specified as this `variables` value.
    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Object,
}

// NOTE: this deserialize helper is used to transform `null` to Default::default()
fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    /// This is the constructor (or builder) to use when constructing a GraphQL
    /// `Request`.
    fn new(
        query: Option<String>,
        operation_name: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        variables: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serde_json_bytes::json as bjson;
    use test_log::test;

    use super::*;

    #[test]
    fn test_request() {
        let data = json!(
        {
          "query": "query aTest($id: Int) { tutorial(id: $id) { Title } }",
          "operationName": "aTest",
          "variables": { "id": 1 },
        });
        let result = serde_json::from_value::<Request>(data);
        assert_eq!(
            result.unwrap(),
            Request::builder()
                .query("query aTest($id: Int) { tutorial(id: $id) { Title } }".to_owned())
                .operation_name("aTest")
                .variables(bjson!({ "id": 1 }).as_object().unwrap().clone())
                .build()
        );
    }

    #[test]
    fn test_no_variables() {
        let result = serde_json::from_value::<Request>(json!(
        {
          "query": "{ list { ID } }",
        }))
        .unwrap();
        assert_eq!(
            result,
            Request::builder()
                .query("{ list { ID } }".to_owned())
                .build()
        );
    }

    #[test]
    // `null` variables read as no variables
    fn test_variables_is_null() {
        let result = serde_json::from_value::<Request>(json!(
        {
          "query": "{ list { ID } }",
          "variables": null,
        }))
        .unwrap();
        assert_eq!(result.variables, Object::new());
    }

    #[test]
    fn test_single_variable() {
        let request = Request::builder()
            .query("query($id: Int) { tutorial(id: $id) { ID } }")
            .variable("id", 1)
            .build();
        assert_eq!(request.variables.get("id"), Some(&Value::from(1)));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "query": "query($id: Int) { tutorial(id: $id) { ID } }",
                "variables": { "id": 1 },
            })
        );
    }
}
