//! Query execution: a query document goes through parsing and validation, then its fields are
//! resolved depth-first, left to right.

use displaydoc::Display;

use crate::configuration::Configuration;
use crate::error::FieldError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::graphql::ResultNode;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::resolver::Resolved;
use crate::spec::FieldType;
use crate::spec::ObjectType;
use crate::spec::Query;
use crate::spec::QueryNode;
use crate::spec::Schema;
use crate::spec::SpecError;
use crate::spec::TYPENAME;

/// The phases of one execution.
///
/// `Parsed → Validating → Resolving → Done`; a parsing or validation error moves straight to
/// `Failed` and nothing gets resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    /// parsed
    Parsed,
    /// validating
    Validating,
    /// resolving
    Resolving,
    /// done
    Done,
    /// failed
    Failed,
}

impl Phase {
    fn transition(&mut self, next: Phase) {
        tracing::debug!(from = %self, to = %next, "execution phase");
        *self = next;
    }
}

/// Executes requests against a schema.
///
/// An executor holds no per-request state: every call to [`Executor::execute`] starts afresh.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    schema: &'a Schema,
    configuration: &'a Configuration,
}

impl<'a> Executor<'a> {
    pub fn new(schema: &'a Schema, configuration: &'a Configuration) -> Self {
        Self {
            schema,
            configuration,
        }
    }

    /// Runs a request to completion.
    ///
    /// Parsing and validation errors come back with `null` data. Resolution errors null the
    /// field they were raised for and are listed in the response errors.
    pub fn execute(&self, request: Request) -> Response {
        self.run(request).1
    }

    #[tracing::instrument(skip_all, level = "debug", fields(operation_name = request.operation_name.as_deref()))]
    pub(crate) fn run(&self, request: Request) -> (Phase, Response) {
        let Some(query) = request.query.as_deref() else {
            return failed(vec![SpecError::MissingQuery.to_graphql_error(None, None)]);
        };

        let query = match Query::parse(query, self.configuration) {
            Ok(query) => query,
            Err(error) => {
                let location = match &error {
                    SpecError::ParsingError { location, .. } => *location,
                    _ => None,
                };
                return failed(vec![error.to_graphql_error(location, None)]);
            }
        };
        let mut phase = Phase::Parsed;

        phase.transition(Phase::Validating);
        let selection_set = match query.validate(
            self.schema,
            request.operation_name.as_deref(),
            &request.variables,
            self.configuration,
        ) {
            Ok(selection_set) => selection_set,
            Err(errors) => {
                phase.transition(Phase::Failed);
                return (phase, Response::builder().errors(errors).build());
            }
        };

        phase.transition(Phase::Resolving);
        let mut resolution = Resolution {
            schema: self.schema,
            path: Path::empty(),
            errors: Vec::new(),
        };
        let data =
            resolution.resolve_selection_set(&selection_set, self.schema.query_type(), &Resolved::Null);

        phase.transition(Phase::Done);
        (phase, Response::from_result(data, resolution.errors))
    }
}

fn failed(errors: Vec<Error>) -> (Phase, Response) {
    tracing::debug!(to = %Phase::Failed, "execution phase");
    (Phase::Failed, Response::builder().errors(errors).build())
}

/// Executes `request` against `schema`.
pub fn execute(schema: &Schema, request: Request, configuration: &Configuration) -> Response {
    Executor::new(schema, configuration).execute(request)
}

/// State of the resolution of one validated query.
struct Resolution<'a> {
    schema: &'a Schema,
    path: Path,
    errors: Vec<Error>,
}

impl<'a> Resolution<'a> {
    fn resolve_selection_set(
        &mut self,
        selection_set: &[QueryNode],
        object_type: &ObjectType,
        parent: &Resolved,
    ) -> ResultNode {
        ResultNode::Object(
            selection_set
                .iter()
                .map(|node| {
                    self.path.push(PathElement::Key(node.response_key.clone()));
                    let result = self.resolve_field(node, object_type, parent);
                    self.path.pop();
                    (node.response_key.clone(), result)
                })
                .collect(),
        )
    }

    fn resolve_field(
        &mut self,
        node: &QueryNode,
        object_type: &ObjectType,
        parent: &Resolved,
    ) -> ResultNode {
        if node.field_name == TYPENAME {
            return ResultNode::Value(Value::from(object_type.name.as_str()));
        }

        let resolved = match object_type
            .field(&node.field_name)
            .and_then(|field| field.resolver.as_ref())
        {
            Some(resolver) => resolver.resolve(parent, &node.arguments),
            None => Err(FieldError::Resolver(format!(
                "no resolver for field '{}.{}'",
                object_type.name, node.field_name
            ))),
        };

        match resolved {
            Ok(resolved) => self.complete_value(node, &node.field_type, resolved),
            Err(error) => self.field_error(node, error),
        }
    }

    fn field_error(&mut self, node: &QueryNode, error: FieldError) -> ResultNode {
        tracing::debug!(path = %self.path, %error, "field resolution failed");
        self.errors
            .push(error.to_graphql_error(Some(node.location), Some(self.path.clone())));
        ResultNode::Error(self.errors.len() - 1)
    }

    fn complete_value(
        &mut self,
        node: &QueryNode,
        field_type: &FieldType,
        resolved: Resolved,
    ) -> ResultNode {
        let schema = self.schema;
        match (field_type, resolved) {
            (_, Resolved::Null) => ResultNode::Null,
            (FieldType::List(inner), Resolved::List(items)) => self.complete_list(node, inner, items),
            (FieldType::List(inner), Resolved::Leaf(Value::Array(values))) => self.complete_list(
                node,
                inner,
                values.into_iter().map(Resolved::from).collect(),
            ),
            (FieldType::Named(type_name), resolved @ Resolved::Record(_)) => {
                match schema.object_type(type_name) {
                    Some(object_type) => {
                        self.resolve_selection_set(&node.selection_set, object_type, &resolved)
                    }
                    None => self.invalid_value(node, field_type, &resolved),
                }
            }
            (ty, Resolved::Leaf(value)) if ty.is_builtin_scalar() => {
                match ty.coerce_leaf_value(&value) {
                    Ok(value) => ResultNode::Value(value),
                    Err(_) => self.invalid_value(node, field_type, &Resolved::Leaf(value)),
                }
            }
            (_, resolved) => self.invalid_value(node, field_type, &resolved),
        }
    }

    fn complete_list(
        &mut self,
        node: &QueryNode,
        inner: &FieldType,
        items: Vec<Resolved>,
    ) -> ResultNode {
        ResultNode::List(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    self.path.push(PathElement::Index(index));
                    let result = self.complete_value(node, inner, item);
                    self.path.pop();
                    result
                })
                .collect(),
        )
    }

    fn invalid_value(
        &mut self,
        node: &QueryNode,
        field_type: &FieldType,
        resolved: &Resolved,
    ) -> ResultNode {
        let kind = match resolved {
            Resolved::Leaf(value) => value.kind(),
            other => other.kind(),
        };
        self.field_error(
            node,
            FieldError::InvalidValue {
                field_type: field_type.to_string(),
                kind: kind.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;
    use crate::json_ext::Object;
    use crate::spec::ArgumentDefinition;
    use crate::spec::RootField;

    struct Book {
        title: &'static str,
    }

    fn schema() -> Schema {
        let book = ObjectType::builder::<Book>("Book")
            .field("title", FieldType::String, |book: &Book| book.title.into())
            .field("pages", FieldType::Int, |_: &Book| "many".into())
            .build();
        Schema::builder()
            .object_type(book)
            .root_field(
                RootField::new("books", FieldType::list(FieldType::named("Book"))).resolve_with(
                    |_, _| {
                        Ok(Resolved::list(vec![
                            Resolved::record(Book { title: "a" }),
                            Resolved::Null,
                            Resolved::record(Book { title: "b" }),
                        ]))
                    },
                ),
            )
            .root_field(
                RootField::new("broken", FieldType::named("Book"))
                    .resolve_with(|_, _| Err(FieldError::Resolver("boom".to_string()))),
            )
            .root_field(
                RootField::new("echo", FieldType::list(FieldType::Int))
                    .argument(ArgumentDefinition::new("values", FieldType::list(FieldType::Int)))
                    .resolve_with(|_, arguments: &Object| {
                        Ok(arguments.get("values").cloned().unwrap_or_default().into())
                    }),
            )
            .build()
            .unwrap()
    }

    fn run(query: &str) -> (Phase, Response) {
        let schema = schema();
        let configuration = Configuration::default();
        Executor::new(&schema, &configuration).run(Request::builder().query(query).build())
    }

    #[test]
    fn resolves_lists_in_order() {
        let (phase, response) = run("{ books { title __typename } __typename }");
        assert_eq!(phase, Phase::Done);
        assert_eq!(
            serde_json_bytes::to_value(&response).unwrap(),
            json!({
                "data": {
                    "books": [
                        { "title": "a", "__typename": "Book" },
                        null,
                        { "title": "b", "__typename": "Book" }
                    ],
                    "__typename": "Query"
                }
            })
        );
    }

    #[test]
    fn resolver_errors_null_only_their_field() {
        let (phase, response) = run("{ broken { title } books { title } }");
        assert_eq!(phase, Phase::Done);
        insta::assert_json_snapshot!(response, @r###"
        {
          "data": {
            "broken": null,
            "books": [
              {
                "title": "a"
              },
              null,
              {
                "title": "b"
              }
            ]
          },
          "errors": [
            {
              "message": "boom",
              "locations": [
                {
                  "line": 1,
                  "column": 3
                }
              ],
              "path": [
                "broken"
              ],
              "extensions": {
                "code": "RESOLVER_ERROR"
              }
            }
          ]
        }
        "###);
    }

    #[test]
    fn leaf_values_must_match_their_type() {
        let (_, response) = run("{ books { pages } }");
        assert_eq!(
            response.data,
            Some(json!({ "books": [{ "pages": null }, null, { "pages": null }] }))
        );
        let paths = response
            .errors
            .iter()
            .map(|error| error.path.as_ref().map(ToString::to_string))
            .collect::<Vec<_>>();
        assert_eq!(
            paths,
            vec![
                Some("/books/0/pages".to_string()),
                Some("/books/2/pages".to_string())
            ]
        );
        assert_eq!(
            response.errors[0].message,
            "'Int' cannot represent a string value"
        );
    }

    #[test]
    fn scalar_lists() {
        let (_, response) = run("{ echo(values: [1, 2]) one: echo(values: 3) }");
        assert_eq!(
            response.data,
            Some(json!({ "echo": [1, 2], "one": [3] }))
        );
        assert!(!response.has_errors());
    }

    #[test]
    fn parse_errors_fail_the_execution() {
        let (phase, response) = run("{ books { title }");
        assert_eq!(phase, Phase::Failed);
        assert_eq!(response.data, None);
        assert_eq!(
            response.errors[0].extension_code().as_deref(),
            Some("GRAPHQL_PARSE_FAILED")
        );
        assert!(!response.errors[0].locations.is_empty());
    }

    #[test]
    fn validation_errors_fail_the_execution() {
        let (phase, response) = run("{ books { title } missing }");
        assert_eq!(phase, Phase::Failed);
        assert_eq!(
            response.to_json_string().unwrap(),
            r#"{"data":null,"errors":[{"message":"cannot query field 'missing' on type 'Query'","locations":[{"line":1,"column":19}],"path":["missing"],"extensions":{"code":"GRAPHQL_VALIDATION_FAILED","type":"Query","field":"missing"}}]}"#
        );
    }

    #[test]
    fn missing_query() {
        let schema = schema();
        let response = execute(&schema, Request::default(), &Configuration::default());
        assert_eq!(response.data, None);
        assert_eq!(response.errors[0].message, "must provide query string");
    }
}
