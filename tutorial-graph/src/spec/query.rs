//! Query documents: parsing and operation lookup.
//!
//! Validation against a [`Schema`](crate::spec::Schema) lives in the `validate` submodule.

use apollo_parser::cst;
use displaydoc::Display;
use indexmap::IndexMap;

use crate::configuration::Configuration;
use crate::graphql::Location;
use crate::spec::location_of;
use crate::spec::parse_selection_set;
use crate::spec::FieldType;
use crate::spec::Fragments;
use crate::spec::InputValue;
use crate::spec::Selection;
use crate::spec::SpecError;

mod validate;

/// The meta field every object type answers with its own name.
pub const TYPENAME: &str = "__typename";

/// A parsed query document.
///
/// Parsing only checks the syntax: the document is checked against a schema by
/// [`Query::validate`].
#[derive(Debug)]
pub struct Query {
    fragments: Fragments,
    operations: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum OperationKind {
    /// query
    Query,
    /// mutation
    Mutation,
    /// subscription
    Subscription,
}

#[derive(Debug)]
pub(crate) struct Operation {
    pub(crate) name: Option<String>,
    pub(crate) kind: OperationKind,
    pub(crate) variables: IndexMap<String, VariableDefinition>,
    pub(crate) selection_set: Vec<Selection>,
    pub(crate) location: Location,
}

#[derive(Debug)]
pub(crate) struct VariableDefinition {
    pub(crate) ty: FieldType,
    pub(crate) default_value: Option<InputValue>,
    pub(crate) location: Location,
}

impl Query {
    /// Parses a query document.
    ///
    /// Fails with [`SpecError::ParsingError`] on any syntax error: no partial document is kept.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn parse(query: impl Into<String>, configuration: &Configuration) -> Result<Self, SpecError> {
        let string = query.into();

        let parser = apollo_parser::Parser::new(string.as_str())
            .recursion_limit(configuration.limits.parser_recursion_limit)
            .token_limit(configuration.limits.parser_token_limit);
        let tree = parser.parse();

        // Trace log recursion limit data
        let recursion_limit = tree.recursion_limit();
        tracing::trace!(?recursion_limit, "recursion limit data");

        let errors = tree.errors().collect::<Vec<_>>();
        if let Some(first) = errors.first() {
            let location = Location::from_offset(&string, first.index());
            let message = errors
                .iter()
                .map(|error| error.message().to_string())
                .collect::<Vec<_>>()
                .join("; ");
            failfast_debug!("parsing error(s): {}", message);
            return Err(SpecError::ParsingError {
                message,
                location: Some(location),
            });
        }

        let document = tree.document();
        let fragments = Fragments::from_cst(&document, &string)?;

        let operations = document
            .definitions()
            .filter_map(|definition| {
                if let cst::Definition::OperationDefinition(operation) = definition {
                    Some(operation)
                } else {
                    None
                }
            })
            .map(|operation| Operation::from_cst(operation, &string))
            .collect::<Result<Vec<_>, SpecError>>()?;

        tracing::debug!(
            operations = operations.len(),
            fragments = fragments.len(),
            "query parsed"
        );
        Ok(Query {
            fragments,
            operations,
        })
    }

    /// Selects the operation to run.
    ///
    /// Without a name the document must hold exactly one operation.
    pub(crate) fn operation(&self, operation_name: Option<&str>) -> Result<&Operation, SpecError> {
        match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|operation| operation.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string())),
            None => match self.operations.as_slice() {
                [] => Err(SpecError::NoOperation),
                [operation] => Ok(operation),
                _ => Err(SpecError::AmbiguousOperation),
            },
        }
    }
}

impl Operation {
    // Spec: https://spec.graphql.org/draft/#sec-Language.Operations
    fn from_cst(operation: cst::OperationDefinition, source: &str) -> Result<Self, SpecError> {
        let location = location_of(&operation, source);
        let name = operation.name().map(|name| name.text().to_string());

        let kind = operation
            .operation_type()
            .and_then(|op| {
                op.query_token()
                    .map(|_| OperationKind::Query)
                    .or_else(|| op.mutation_token().map(|_| OperationKind::Mutation))
                    .or_else(|| op.subscription_token().map(|_| OperationKind::Subscription))
            })
            .unwrap_or(OperationKind::Query);

        let variables = operation
            .variable_definitions()
            .iter()
            .flat_map(|definitions| definitions.variable_definitions())
            .map(|definition| {
                let location = location_of(&definition, source);
                let name = definition
                    .variable()
                    .and_then(|variable| variable.name())
                    .map(|name| name.text().to_string())
                    .ok_or_else(|| SpecError::ParsingError {
                        message: "variable definitions require a name".to_string(),
                        location: Some(location),
                    })?;
                let ty: FieldType = definition
                    .ty()
                    .ok_or_else(|| {
                        SpecError::InvalidType(format!("variable '${name}' requires a type"))
                    })?
                    .try_into()?;
                let default_value = definition
                    .default_value()
                    .and_then(|default_value| default_value.value())
                    .map(InputValue::from_cst)
                    .transpose()?;
                Ok((
                    name,
                    VariableDefinition {
                        ty,
                        default_value,
                        location,
                    },
                ))
            })
            .collect::<Result<IndexMap<_, _>, SpecError>>()?;

        let selection_set = parse_selection_set(operation.selection_set(), source)?;

        Ok(Operation {
            name,
            kind,
            variables,
            selection_set,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;

    fn parse(query: &str) -> Result<Query, SpecError> {
        Query::parse(query, &Configuration::default())
    }

    #[test]
    fn parses_anonymous_query() {
        let query = parse("{ tutorial(id: 1) { Title } }").unwrap();
        let operation = query.operation(None).unwrap();
        assert_eq!(operation.name, None);
        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.selection_set.len(), 1);
        assert_eq!(operation.location, Location { line: 1, column: 1 });
    }

    #[test]
    fn parse_error_has_a_location() {
        let error = parse("{\n  tutorial(id: 1) { Title }").unwrap_err();
        match error {
            SpecError::ParsingError { location, .. } => {
                assert_eq!(location.map(|location| location.line), Some(2));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn token_limit() {
        let configuration = Configuration::builder()
            .limits(
                crate::configuration::Limits::builder()
                    .parser_token_limit(5)
                    .build(),
            )
            .build();
        assert!(matches!(
            Query::parse("{ tutorial(id: 1) { Title } }", &configuration),
            Err(SpecError::ParsingError { .. })
        ));
    }

    #[test]
    fn operation_selection() {
        let query = parse("query A { list { ID } } query B { list { Title } }").unwrap();
        assert_eq!(
            query.operation(None).unwrap_err(),
            SpecError::AmbiguousOperation
        );
        assert_eq!(query.operation(Some("B")).unwrap().name.as_deref(), Some("B"));
        assert_eq!(
            query.operation(Some("C")).unwrap_err(),
            SpecError::UnknownOperation("C".to_string())
        );

        let query = parse("fragment F on Tutorial { ID }").unwrap();
        assert_eq!(query.operation(None).unwrap_err(), SpecError::NoOperation);
    }

    #[test]
    fn operation_kinds() {
        let query = parse("mutation M { list { ID } } subscription S { list { ID } }").unwrap();
        assert_eq!(
            query.operation(Some("M")).unwrap().kind,
            OperationKind::Mutation
        );
        assert_eq!(
            query.operation(Some("S")).unwrap().kind.to_string(),
            "subscription"
        );
    }

    #[test]
    fn variable_definitions() {
        let query = parse("query Q($id: Int! = 1, $tags: [String]) { tutorial(id: $id) { ID } }")
            .unwrap();
        let operation = query.operation(Some("Q")).unwrap();
        let variables = operation
            .variables
            .iter()
            .map(|(name, definition)| (name.as_str(), definition.ty.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            variables,
            vec![
                ("id", FieldType::Int),
                ("tags", FieldType::list(FieldType::String))
            ]
        );
        assert_eq!(
            operation.variables["id"].default_value,
            Some(InputValue::Constant(json!(1)))
        );
        assert_eq!(operation.variables["tags"].default_value, None);
    }
}
