use apollo_parser::cst;

use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::SpecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InvalidValue;

/// The type of a field or argument.
///
/// Primitives are taken from scalars: https://spec.graphql.org/draft/#sec-Scalars
/// Every type is nullable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Int
    Int,
    /// Float
    Float,
    /// String
    String,
    /// Boolean
    Boolean,
    /// Named object type {0}
    Named(String),
    /// List type {0}
    List(Box<FieldType>),
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Boolean => write!(f, "Boolean"),
        }
    }
}

impl FieldType {
    /// A reference to the object type `name`.
    pub fn named(name: impl Into<String>) -> Self {
        FieldType::Named(name.into())
    }

    /// A list of `inner`.
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    fn from_name(name: String) -> Self {
        match name.as_str() {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "Boolean" => Self::Boolean,
            _ => Self::Named(name),
        }
    }

    /// return the name of the type on which selections happen
    ///
    /// Example if we get the field `list: [Tutorial]`, it will return "Tutorial"
    pub(crate) fn inner_type_name(&self) -> Option<&str> {
        match self {
            FieldType::Named(name) => Some(name.as_str()),
            FieldType::List(inner) => inner.inner_type_name(),
            FieldType::String | FieldType::Int | FieldType::Float | FieldType::Boolean => None,
        }
    }

    pub(crate) fn is_builtin_scalar(&self) -> bool {
        match self {
            FieldType::Named(_) | FieldType::List(_) => false,
            FieldType::String | FieldType::Int | FieldType::Float | FieldType::Boolean => true,
        }
    }

    /// Arguments and variables may only use scalars and lists of scalars.
    pub(crate) fn is_input_type(&self) -> bool {
        match self {
            FieldType::List(inner) => inner.is_input_type(),
            ty => ty.is_builtin_scalar(),
        }
    }

    // This function coerces input values according to the graphql specification.
    // Each of the values are checked against the "input coercion" rules.
    pub(crate) fn coerce_input_value(&self, value: &Value) -> Result<Value, InvalidValue> {
        match (self, value) {
            // NOTE: graphql's types are all optional by default
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::String, Value::String(_)) => Ok(value.clone()),
            // Spec: https://spec.graphql.org/June2018/#sec-Int
            (FieldType::Int, maybe_int) if maybe_int.is_valid_int_input() => Ok(value.clone()),
            // Spec: https://spec.graphql.org/draft/#sec-Float.Input-Coercion
            (FieldType::Float, maybe_float) if maybe_float.is_valid_float_input() => {
                Ok(value.clone())
            }
            (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (FieldType::List(inner_ty), Value::Array(values)) => values
                .iter()
                .map(|value| inner_ty.coerce_input_value(value))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // For coercion from single value to list
            (FieldType::List(inner_ty), value) => inner_ty
                .coerce_input_value(value)
                .map(|value| Value::Array(vec![value])),
            _ => Err(InvalidValue),
        }
    }

    // Result coercion for leaf values produced by resolvers.
    // Spec: https://spec.graphql.org/October2021/#sec-Scalars.Result-Coercion-and-Serialization
    pub(crate) fn coerce_leaf_value(&self, value: &Value) -> Result<Value, InvalidValue> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::String, Value::String(_)) => Ok(value.clone()),
            (FieldType::Int, maybe_int) if maybe_int.is_valid_int_input() => Ok(value.clone()),
            (FieldType::Float, maybe_float) if maybe_float.is_valid_float_input() => {
                Ok(value.clone())
            }
            (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            _ => Err(InvalidValue),
        }
    }
}

impl TryFrom<cst::Type> for FieldType {
    type Error = SpecError;
    // Spec: https://spec.graphql.org/draft/#sec-Type-References
    fn try_from(ty: cst::Type) -> Result<Self, Self::Error> {
        match ty {
            cst::Type::NamedType(named) => named.try_into(),
            cst::Type::ListType(list) => list.try_into(),
            cst::Type::NonNullType(non_null) => non_null.try_into(),
        }
    }
}

impl TryFrom<cst::NamedType> for FieldType {
    type Error = SpecError;
    // Spec: https://spec.graphql.org/draft/#NamedType
    fn try_from(named: cst::NamedType) -> Result<Self, Self::Error> {
        let name = named
            .name()
            .ok_or_else(|| SpecError::InvalidType("the node Name is not optional".to_string()))?
            .text()
            .to_string();
        Ok(Self::from_name(name))
    }
}

impl TryFrom<cst::ListType> for FieldType {
    type Error = SpecError;

    // Spec: https://spec.graphql.org/draft/#ListType
    fn try_from(list: cst::ListType) -> Result<Self, Self::Error> {
        Ok(Self::List(Box::new(
            list.ty()
                .ok_or_else(|| SpecError::InvalidType("the node Type is not optional".to_string()))?
                .try_into()?,
        )))
    }
}

impl TryFrom<cst::NonNullType> for FieldType {
    type Error = SpecError;

    // Non-null wrappers are accepted and ignored: every type is nullable.
    fn try_from(non_null: cst::NonNullType) -> Result<Self, Self::Error> {
        if let Some(list) = non_null.list_type() {
            list.try_into()
        } else if let Some(named) = non_null.named_type() {
            named.try_into()
        } else {
            Err(SpecError::InvalidType(
                "either the NamedType node is provided, either the ListType node".to_string(),
            ))
        }
    }
}
