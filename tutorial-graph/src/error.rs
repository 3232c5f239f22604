//! Schema, data source and resolution errors.
use displaydoc::Display;
use thiserror::Error;

pub use crate::configuration::ConfigurationError;
pub use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
pub use crate::spec::SpecError;

/// Errors raised while building a [`crate::Schema`].
///
/// They are all construction-time errors: a schema that builds never fails a query because of
/// its own shape.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// type '{0}' is already registered
    DuplicateType(String),

    /// unknown type '{0}'
    UnknownType(String),

    /// field '{field}' of type '{type_name}' references unknown type '{referenced}'
    UnknownFieldType {
        /// The type declaring the field.
        type_name: String,
        /// The field name.
        field: String,
        /// The missing type.
        referenced: String,
    },

    /// field '{field}' is declared more than once on type '{type_name}'
    DuplicateField {
        /// The type declaring the field.
        type_name: String,
        /// The field name.
        field: String,
    },

    /// root field '{0}' is declared more than once
    DuplicateRootField(String),

    /// argument '{argument}' is declared more than once on field '{type_name}.{field}'
    DuplicateArgument {
        /// The type declaring the field.
        type_name: String,
        /// The field name.
        field: String,
        /// The argument name.
        argument: String,
    },

    /// field '{type_name}.{field}' has no resolver
    MissingResolver {
        /// The type declaring the field.
        type_name: String,
        /// The field name.
        field: String,
    },

    /// argument '{argument}' of field '{type_name}.{field}' must be an input type, found '{argument_type}'
    InvalidArgumentType {
        /// The type declaring the field.
        type_name: String,
        /// The field name.
        field: String,
        /// The argument name.
        argument: String,
        /// The declared argument type.
        argument_type: String,
    },

    /// default value of argument '{argument}' of field '{type_name}.{field}' is not a valid '{argument_type}'
    InvalidDefaultValue {
        /// The type declaring the field.
        type_name: String,
        /// The field name.
        field: String,
        /// The argument name.
        argument: String,
        /// The declared argument type.
        argument_type: String,
    },

    /// name '{0}' is reserved for introspection
    ReservedName(String),
}

/// Errors returned by a [`crate::DataSource`].
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DataSourceError {
    /// no entity with id {id} in collection '{collection}'
    NotFound {
        /// The collection that was searched.
        collection: String,
        /// The requested id.
        id: i64,
    },

    /// unknown collection '{0}'
    UnknownCollection(String),

    /// collection '{0}' is already registered
    DuplicateCollection(String),
}

/// Errors returned by resolvers.
///
/// A field error only nulls the field it was raised for; sibling fields keep resolving.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldError {
    /// {0}
    DataSource(#[from] DataSourceError),

    /// missing argument '{0}'
    MissingArgument(String),

    /// parent value is not a '{expected}'
    InvalidParent {
        /// The record type the resolver expected.
        expected: String,
    },

    /// '{field_type}' cannot represent a {kind} value
    InvalidValue {
        /// The declared field type.
        field_type: String,
        /// The kind of value the resolver produced.
        kind: String,
    },

    /// {0}
    Resolver(String),
}

impl ErrorExtension for FieldError {
    fn extension_code(&self) -> String {
        match self {
            FieldError::DataSource(DataSourceError::NotFound { .. }) => "NOT_FOUND",
            FieldError::MissingArgument(_) => "MISSING_ARGUMENT",
            FieldError::InvalidValue { .. } => "INVALID_VALUE",
            FieldError::DataSource(_) | FieldError::InvalidParent { .. } | FieldError::Resolver(_) => {
                "RESOLVER_ERROR"
            }
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        if let FieldError::DataSource(DataSourceError::NotFound { collection, id }) = self {
            obj.insert("collection", collection.clone().into());
            obj.insert("id", (*id).into());
        }
        (!obj.is_empty()).then_some(obj)
    }
}
