//! GraphQL schema: object types, their fields and the root query type.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use derivative::Derivative;
use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::resolver::Accessor;
use crate::resolver::FieldError;
use crate::resolver::Resolved;
use crate::resolver::Resolver;
use crate::spec::FieldType;

/// The root type name used when none is configured.
pub const DEFAULT_QUERY_TYPE: &str = "Query";

/// An argument accepted by a field.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentDefinition {
    pub(crate) name: String,
    pub(crate) ty: FieldType,
    pub(crate) default_value: Option<Value>,
    pub(crate) description: Option<String>,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        ArgumentDefinition {
            name: name.into(),
            ty,
            default_value: None,
            description: None,
        }
    }

    /// The value used when a query omits the argument.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }
}

impl fmt::Display for ArgumentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)?;
        if let Some(default_value) = &self.default_value {
            let literal = serde_json::to_string(default_value).map_err(|_| fmt::Error)?;
            write!(f, " = {literal}")?;
        }
        Ok(())
    }
}

/// A field of an object type: its name, arguments, type and resolver.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct FieldDefinition {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) ty: FieldType,
    pub(crate) arguments: Vec<ArgumentDefinition>,
    #[derivative(Debug = "ignore")]
    pub(crate) resolver: Option<Arc<dyn Resolver>>,
}

/// A named top-level field of the root query type.
///
/// Root fields are resolved with [`Resolved::Null`] as parent and usually read from a
/// [`crate::DataSource`].
pub type RootField = FieldDefinition;

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            description: None,
            ty,
            arguments: Vec::new(),
            resolver: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Sets the resolver of this field.
    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets the resolver of this field from a closure.
    pub fn resolve_with<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Resolved, &Object) -> Result<Resolved, FieldError> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub(crate) fn argument_definition(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|argument| argument.name == name)
    }
}

/// An object type (an entity): a named set of fields.
#[derive(Clone, Debug)]
pub struct ObjectType {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) fields: Vec<FieldDefinition>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Declares an object type backed by records of type `T`.
    ///
    /// Fields declared with [`ObjectTypeBuilder::field`] read their value off the parent record
    /// through an accessor, no reflection involved.
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> ObjectTypeBuilder<T> {
        ObjectTypeBuilder {
            object_type: ObjectType::new(name),
            record: PhantomData,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    fn validate(&self) -> Result<(), SchemaError> {
        check_name(&self.name)?;
        let mut seen = HashSet::new();
        for field in &self.fields {
            check_name(&field.name)?;
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.resolver.is_none() {
                return Err(SchemaError::MissingResolver {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            self.validate_arguments(field)?;
        }
        Ok(())
    }

    fn validate_arguments(&self, field: &FieldDefinition) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for argument in &field.arguments {
            check_name(&argument.name)?;
            if !seen.insert(argument.name.as_str()) {
                return Err(SchemaError::DuplicateArgument {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                    argument: argument.name.clone(),
                });
            }
            if !argument.ty.is_input_type() {
                return Err(SchemaError::InvalidArgumentType {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                    argument: argument.name.clone(),
                    argument_type: argument.ty.to_string(),
                });
            }
            if let Some(default_value) = &argument.default_value {
                if argument.ty.coerce_input_value(default_value).is_err() {
                    return Err(SchemaError::InvalidDefaultValue {
                        type_name: self.name.clone(),
                        field: field.name.clone(),
                        argument: argument.name.clone(),
                        argument_type: argument.ty.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), SchemaError> {
    if name.starts_with("__") {
        Err(SchemaError::ReservedName(name.to_string()))
    } else {
        Ok(())
    }
}

fn quote(description: &str) -> String {
    format!(
        "\"{}\"",
        description
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    )
}

/// Prints the type in SDL, fields in declaration order.
impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(description) = &self.description {
            writeln!(f, "{}", quote(description))?;
        }
        writeln!(f, "type {} {{", self.name)?;
        for field in &self.fields {
            if let Some(description) = &field.description {
                writeln!(f, "  {}", quote(description))?;
            }
            write!(f, "  {}", field.name)?;
            if !field.arguments.is_empty() {
                let arguments = field
                    .arguments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                write!(f, "({})", arguments.join(", "))?;
            }
            writeln!(f, ": {}", field.ty)?;
        }
        writeln!(f, "}}")
    }
}

/// Typed builder returned by [`ObjectType::builder`].
pub struct ObjectTypeBuilder<T> {
    object_type: ObjectType,
    record: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> ObjectTypeBuilder<T> {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.object_type.description = Some(description.into());
        self
    }

    /// Declares a field whose value is read off the parent `T` record.
    pub fn field<F>(self, name: impl Into<String>, ty: FieldType, accessor: F) -> Self
    where
        F: Fn(&T) -> Resolved + Send + Sync + 'static,
    {
        self.field_definition(FieldDefinition::new(name, ty).resolver(Accessor::new(accessor)))
    }

    /// Declares a field with its own resolver.
    pub fn field_definition(mut self, field: FieldDefinition) -> Self {
        self.object_type.fields.push(field);
        self
    }

    pub fn build(self) -> ObjectType {
        self.object_type
    }
}

/// The set of object types known to a schema.
///
/// Append-only: types are registered while the schema is built and never removed.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, ObjectType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object type made of `fields`.
    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        fields: impl IntoIterator<Item = FieldDefinition>,
    ) -> Result<(), SchemaError> {
        let mut object_type = ObjectType::new(type_name);
        object_type.fields.extend(fields);
        self.register_type(object_type)
    }

    /// Registers an object type.
    pub fn register_type(&mut self, object_type: ObjectType) -> Result<(), SchemaError> {
        if self.types.contains_key(&object_type.name) {
            return Err(SchemaError::DuplicateType(object_type.name));
        }
        object_type.validate()?;
        self.types.insert(object_type.name.clone(), object_type);
        Ok(())
    }

    /// Looks up a registered type.
    pub fn lookup(&self, type_name: &str) -> Result<&ObjectType, SchemaError> {
        self.get(type_name)
            .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))
    }

    pub fn get(&self, type_name: &str) -> Option<&ObjectType> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// The registered types, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A GraphQL schema: the root query type and the object types it reaches.
///
/// Immutable once built; share it through an `Arc` to execute queries from several places.
#[derive(Debug)]
pub struct Schema {
    query_type: ObjectType,
    types: TypeRegistry,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The root query type.
    pub fn query_type(&self) -> &ObjectType {
        &self.query_type
    }

    /// The registered object types.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Looks up an object type, the root type included.
    pub(crate) fn object_type(&self, name: &str) -> Option<&ObjectType> {
        if name == self.query_type.name {
            Some(&self.query_type)
        } else {
            self.types.get(name)
        }
    }

    /// Prints the schema in SDL. Types and fields keep their declaration order.
    pub fn to_sdl(&self) -> String {
        let mut sdl = String::new();
        if self.query_type.name != DEFAULT_QUERY_TYPE {
            sdl.push_str(&format!(
                "schema {{\n  query: {}\n}}\n\n",
                self.query_type.name
            ));
        }
        let types = std::iter::once(&self.query_type)
            .chain(self.types.iter())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        sdl.push_str(&types.join("\n"));
        sdl
    }
}

/// Builder for [`Schema`]. Every reference is checked by [`SchemaBuilder::build`].
pub struct SchemaBuilder {
    query_type_name: String,
    object_types: Vec<ObjectType>,
    root_fields: Vec<RootField>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        SchemaBuilder {
            query_type_name: DEFAULT_QUERY_TYPE.to_string(),
            object_types: Vec::new(),
            root_fields: Vec::new(),
        }
    }
}

impl SchemaBuilder {
    /// Names the root query type, `Query` by default.
    pub fn query_type_name(mut self, name: impl Into<String>) -> Self {
        self.query_type_name = name.into();
        self
    }

    pub fn object_type(mut self, object_type: ObjectType) -> Self {
        self.object_types.push(object_type);
        self
    }

    pub fn root_field(mut self, root_field: RootField) -> Self {
        self.root_fields.push(root_field);
        self
    }

    #[tracing::instrument(skip_all, level = "debug")]
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut types = TypeRegistry::new();
        for object_type in self.object_types {
            types.register_type(object_type)?;
        }

        check_name(&self.query_type_name)?;
        if types.contains(&self.query_type_name) {
            return Err(SchemaError::DuplicateType(self.query_type_name));
        }
        let mut seen = HashSet::new();
        for root_field in &self.root_fields {
            if !seen.insert(root_field.name.as_str()) {
                return Err(SchemaError::DuplicateRootField(root_field.name.clone()));
            }
        }
        let query_type = ObjectType {
            name: self.query_type_name,
            description: None,
            fields: self.root_fields,
        };
        query_type.validate()?;

        for object_type in std::iter::once(&query_type).chain(types.iter()) {
            for field in &object_type.fields {
                if let Some(referenced) = field.ty.inner_type_name() {
                    if referenced != query_type.name && !types.contains(referenced) {
                        return Err(SchemaError::UnknownFieldType {
                            type_name: object_type.name.clone(),
                            field: field.name.clone(),
                            referenced: referenced.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(
            query_type = %query_type.name,
            root_fields = query_type.fields.len(),
            types = types.len(),
            "schema built"
        );
        Ok(Schema { query_type, types })
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;

    struct Comment {
        body: String,
    }

    fn comment_type() -> ObjectType {
        ObjectType::builder::<Comment>("Comment")
            .field("body", FieldType::String, |comment: &Comment| {
                comment.body.as_str().into()
            })
            .build()
    }

    fn comments_root() -> RootField {
        RootField::new("comments", FieldType::list(FieldType::named("Comment"))).resolve_with(
            |_, _| {
                Ok(Resolved::list(vec![Resolved::record(Comment {
                    body: "First!".to_string(),
                })]))
            },
        )
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                "Author",
                vec![FieldDefinition::new("Name", FieldType::String)
                    .resolve_with(|_, _| Ok("Elliot Forbes".into()))],
            )
            .unwrap();
        assert_eq!(registry.lookup("Author").unwrap().name(), "Author");
        assert_eq!(
            registry.lookup("Tutorial").unwrap_err(),
            SchemaError::UnknownType("Tutorial".to_string())
        );
        assert_eq!(
            registry.register("Author", vec![]).unwrap_err(),
            SchemaError::DuplicateType("Author".to_string())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_field() {
        let mut registry = TypeRegistry::new();
        let error = registry
            .register_type(
                comment_type().with_field(
                    FieldDefinition::new("body", FieldType::String)
                        .resolve_with(|_, _| Ok(Resolved::Null)),
                ),
            )
            .unwrap_err();
        assert_eq!(
            error,
            SchemaError::DuplicateField {
                type_name: "Comment".to_string(),
                field: "body".to_string()
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_resolver() {
        let error = Schema::builder()
            .object_type(comment_type())
            .root_field(RootField::new("comments", FieldType::list(FieldType::named("Comment"))))
            .build()
            .unwrap_err();
        assert_eq!(
            error,
            SchemaError::MissingResolver {
                type_name: "Query".to_string(),
                field: "comments".to_string()
            }
        );
    }

    #[test]
    fn unknown_field_type_fails_at_build() {
        let error = Schema::builder()
            .root_field(comments_root())
            .build()
            .unwrap_err();
        assert_eq!(
            error,
            SchemaError::UnknownFieldType {
                type_name: "Query".to_string(),
                field: "comments".to_string(),
                referenced: "Comment".to_string()
            }
        );
    }

    #[test]
    fn duplicate_root_field() {
        let error = Schema::builder()
            .object_type(comment_type())
            .root_field(comments_root())
            .root_field(comments_root())
            .build()
            .unwrap_err();
        assert_eq!(error, SchemaError::DuplicateRootField("comments".to_string()));
    }

    #[test]
    fn root_type_name_must_be_free() {
        let error = Schema::builder()
            .query_type_name("Comment")
            .object_type(comment_type())
            .build()
            .unwrap_err();
        assert_eq!(error, SchemaError::DuplicateType("Comment".to_string()));
    }

    #[test]
    fn reserved_names() {
        let error = Schema::builder()
            .object_type(ObjectType::new("__Type"))
            .build()
            .unwrap_err();
        assert_eq!(error, SchemaError::ReservedName("__Type".to_string()));
    }

    #[test]
    fn object_typed_arguments_are_rejected() {
        let error = Schema::builder()
            .object_type(comment_type())
            .root_field(
                comments_root()
                    .argument(ArgumentDefinition::new("like", FieldType::named("Comment"))),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "argument 'like' of field 'Query.comments' must be an input type, found 'Comment'"
        );
    }

    #[test]
    fn default_values_must_match_their_type() {
        let error = Schema::builder()
            .object_type(comment_type())
            .root_field(
                comments_root().argument(
                    ArgumentDefinition::new("first", FieldType::Int).default_value("ten"),
                ),
            )
            .build()
            .unwrap_err();
        assert!(matches!(error, SchemaError::InvalidDefaultValue { .. }));
    }

    #[test]
    fn root_type_may_be_referenced() {
        let schema = Schema::builder()
            .root_field(
                RootField::new("query", FieldType::named("Query"))
                    .resolve_with(|_, _| Ok(Resolved::record(()))),
            )
            .build()
            .unwrap();
        assert_eq!(schema.object_type("Query").map(ObjectType::name), Some("Query"));
    }

    #[test]
    fn sdl_keeps_declaration_order() {
        let schema = Schema::builder()
            .query_type_name("RootQuery")
            .object_type(comment_type().with_description("A reader's comment"))
            .root_field(
                comments_root()
                    .description("All \"comments\"")
                    .argument(ArgumentDefinition::new("first", FieldType::Int).default_value(10))
                    .argument(ArgumentDefinition::new(
                        "tags",
                        FieldType::list(FieldType::String),
                    )),
            )
            .build()
            .unwrap();
        insta::assert_snapshot!(schema.to_sdl(), @r###"
        schema {
          query: RootQuery
        }

        type RootQuery {
          "All \"comments\""
          comments(first: Int = 10, tags: [String]): [Comment]
        }

        "A reader's comment"
        type Comment {
          body: String
        }
        "###);
        assert_eq!(
            schema.query_type().field("comments").map(|f| f.arguments[0].default_value.clone()),
            Some(Some(json!(10)))
        );
    }
}
