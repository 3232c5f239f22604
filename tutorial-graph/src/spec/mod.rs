//! GraphQL schema and query documents.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod field_type;
mod fragments;
pub(crate) mod query;
mod schema;
mod selection;

use displaydoc::Display;
pub use field_type::FieldType;
pub(crate) use field_type::InvalidValue;
pub(crate) use fragments::Fragments;
pub use query::Query;
pub use query::TYPENAME;
pub use schema::ArgumentDefinition;
pub use schema::FieldDefinition;
pub use schema::ObjectType;
pub use schema::ObjectTypeBuilder;
pub use schema::RootField;
pub use schema::Schema;
pub use schema::SchemaBuilder;
pub use schema::TypeRegistry;
pub use schema::DEFAULT_QUERY_TYPE;
pub(crate) use selection::location_of;
pub(crate) use selection::parse_selection_set;
pub(crate) use selection::Condition;
pub(crate) use selection::IncludeSkip;
pub(crate) use selection::InputValue;
pub use selection::QueryNode;
pub(crate) use selection::Selection;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::graphql::Location;
use crate::json_ext::Object;

/// GraphQL parsing and validation errors.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpecError {
    /// must provide query string
    MissingQuery,
    /// parsing error: {message}
    ParsingError {
        /// The parser diagnostics.
        message: String,
        /// Where the first diagnostic points at.
        location: Option<Location>,
    },
    /// invalid type error: {0}
    InvalidType(String),
    /// directive '@{0}' requires an 'if' argument
    MissingDirectiveArgument(String),
    /// argument 'if' of directive '@{0}' has an invalid value, expected type 'Boolean'
    InvalidDirectiveArgument(String),
    /// selection processing recursion limit exceeded
    RecursionLimitExceeded,
    /// document does not contain any operation
    NoOperation,
    /// must provide operation name if query contains multiple operations
    AmbiguousOperation,
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// {0} operations are not supported
    UnsupportedOperation(String),
    /// cannot query field '{0}' on type '{1}'
    InvalidField(String, String),
    /// unknown argument '{argument}' on field '{type_name}.{field}'
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },
    /// argument '{argument}' on field '{type_name}.{field}' has an invalid value, expected type '{expected}'
    InvalidArgument {
        type_name: String,
        field: String,
        argument: String,
        expected: String,
    },
    /// field '{field}' of type '{field_type}' must have a selection of subfields
    MissingSelectionSet { field: String, field_type: String },
    /// field '{field}' must not have a selection since type '{field_type}' has no subfields
    UnexpectedSelectionSet { field: String, field_type: String },
    /// variable '${0}' is not defined
    UndefinedVariable(String),
    /// variable '${name}' has an invalid value, expected type '{expected}'
    InvalidVariable { name: String, expected: String },
    /// variable '${name}' cannot be of non-input type '{variable_type}'
    NonInputVariable { name: String, variable_type: String },
    /// unknown type '{0}'
    UnknownType(String),
    /// unknown fragment '{0}'
    UnknownFragment(String),
    /// fragment cannot be spread here as objects of type '{parent}' can never be of type '{type_condition}'
    InvalidFragmentSpread {
        type_condition: String,
        parent: String,
    },
    /// fragment '{0}' cannot spread itself
    FragmentCycle(String),
    /// there can be only one fragment named '{0}'
    DuplicateFragment(String),
    /// fields '{0}' conflict because they have differing names or arguments
    FieldConflict(String),
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::ParsingError { .. } | SpecError::InvalidType(_) => "GRAPHQL_PARSE_FAILED",
            SpecError::RecursionLimitExceeded => "RECURSION_LIMIT_EXCEEDED",
            SpecError::InvalidArgument { .. }
            | SpecError::InvalidVariable { .. }
            | SpecError::InvalidDirectiveArgument(_) => "ARGUMENT_TYPE_ERROR",
            SpecError::UnknownOperation(_) => "GRAPHQL_UNKNOWN_OPERATION_NAME",
            SpecError::MissingQuery
            | SpecError::MissingDirectiveArgument(_)
            | SpecError::NoOperation
            | SpecError::AmbiguousOperation
            | SpecError::UnsupportedOperation(_)
            | SpecError::InvalidField(_, _)
            | SpecError::UnknownArgument { .. }
            | SpecError::MissingSelectionSet { .. }
            | SpecError::UnexpectedSelectionSet { .. }
            | SpecError::UndefinedVariable(_)
            | SpecError::NonInputVariable { .. }
            | SpecError::UnknownType(_)
            | SpecError::UnknownFragment(_)
            | SpecError::InvalidFragmentSpread { .. }
            | SpecError::FragmentCycle(_)
            | SpecError::DuplicateFragment(_)
            | SpecError::FieldConflict(_) => "GRAPHQL_VALIDATION_FAILED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        match self {
            SpecError::InvalidField(field, ty) => {
                obj.insert("type", ty.clone().into());
                obj.insert("field", field.clone().into());
            }
            SpecError::InvalidArgument {
                argument, expected, ..
            } => {
                obj.insert("argument", argument.clone().into());
                obj.insert("type", expected.clone().into());
            }
            SpecError::InvalidVariable { name, expected } => {
                obj.insert("variable", name.clone().into());
                obj.insert("type", expected.clone().into());
            }
            _ => (),
        }

        (!obj.is_empty()).then_some(obj)
    }
}
