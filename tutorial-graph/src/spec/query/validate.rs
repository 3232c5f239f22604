use indexmap::IndexMap;

use super::OperationKind;
use super::Query;
use super::VariableDefinition;
use super::TYPENAME;
use crate::configuration::ArgumentCoercion;
use crate::configuration::Configuration;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::spec::Condition;
use crate::spec::FieldDefinition;
use crate::spec::FieldType;
use crate::spec::Fragments;
use crate::spec::IncludeSkip;
use crate::spec::InputValue;
use crate::spec::InvalidValue;
use crate::spec::ObjectType;
use crate::spec::QueryNode;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::SpecError;

impl Query {
    /// Checks the selected operation against `schema` and builds the tree of fields to resolve.
    ///
    /// Every error found in the document is returned, in document order. Arguments and variables
    /// are coerced to their declared types; how values that cannot be coerced are treated depends
    /// on [`ArgumentCoercion`].
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn validate(
        &self,
        schema: &Schema,
        operation_name: Option<&str>,
        variables: &Object,
        configuration: &Configuration,
    ) -> Result<Vec<QueryNode>, Vec<Error>> {
        let operation = self
            .operation(operation_name)
            .map_err(|error| vec![error.to_graphql_error(None, None)])?;
        if operation.kind != OperationKind::Query {
            return Err(vec![SpecError::UnsupportedOperation(
                operation.kind.to_string(),
            )
            .to_graphql_error(Some(operation.location), None)]);
        }

        let mut validator = Validator {
            schema,
            fragments: &self.fragments,
            variable_definitions: &operation.variables,
            variables: Object::new(),
            coercion: configuration.execution.argument_coercion,
            max_depth: configuration.limits.max_depth,
            depth_exceeded: false,
            path: Path::empty(),
            fragment_stack: Vec::new(),
            errors: Vec::new(),
        };
        validator.coerce_variables(variables);

        let mut nodes = Vec::new();
        validator.collect_fields(&operation.selection_set, schema.query_type(), 1, &mut nodes);
        for (name, location) in self.fragments.duplicates() {
            validator.report(SpecError::DuplicateFragment(name.clone()), *location);
        }

        if validator.errors.is_empty() {
            Ok(nodes)
        } else {
            tracing::debug!(errors = validator.errors.len(), "query validation failed");
            Err(validator.errors)
        }
    }
}

struct Validator<'a> {
    schema: &'a Schema,
    fragments: &'a Fragments,
    variable_definitions: &'a IndexMap<String, VariableDefinition>,
    /// Coerced variable values.
    variables: Object,
    coercion: ArgumentCoercion,
    max_depth: usize,
    depth_exceeded: bool,
    path: Path,
    fragment_stack: Vec<String>,
    errors: Vec<Error>,
}

impl<'a> Validator<'a> {
    fn report(&mut self, error: SpecError, location: Location) {
        let path = (!self.path.is_empty()).then(|| self.path.clone());
        self.errors.push(error.to_graphql_error(Some(location), path));
    }

    // Values that cannot be coerced are errors, unless coercion is lenient.
    fn reject_value(&mut self, error: SpecError, location: Location) {
        match self.coercion {
            ArgumentCoercion::Strict => self.report(error, location),
            ArgumentCoercion::Lenient => {
                tracing::warn!(%error, path = %self.path, "discarding a value that cannot be coerced")
            }
        }
    }

    fn coerce_variables(&mut self, provided: &Object) {
        let definitions = self.variable_definitions;
        for (name, definition) in definitions {
            if !definition.ty.is_input_type() {
                let error = match definition.ty.inner_type_name() {
                    Some(type_name) if self.schema.object_type(type_name).is_none() => {
                        SpecError::UnknownType(type_name.to_string())
                    }
                    _ => SpecError::NonInputVariable {
                        name: name.clone(),
                        variable_type: definition.ty.to_string(),
                    },
                };
                self.report(error, definition.location);
                continue;
            }

            let value = match provided.get(name.as_str()) {
                Some(value) => Ok(Some(value.clone())),
                None => definition
                    .default_value
                    .as_ref()
                    .map(|default_value| default_value.evaluate(&Object::new()))
                    .transpose()
                    .map(Option::flatten),
            };
            let coerced = value.and_then(|value| {
                value
                    .map(|value| definition.ty.coerce_input_value(&value))
                    .transpose()
            });
            match coerced {
                Ok(Some(value)) => {
                    self.variables.insert(name.as_str(), value);
                }
                Ok(None) => {}
                Err(InvalidValue) => self.reject_value(
                    SpecError::InvalidVariable {
                        name: name.clone(),
                        expected: definition.ty.to_string(),
                    },
                    definition.location,
                ),
            }
        }
    }

    fn undefined_variables<'v>(&self, used: impl IntoIterator<Item = &'v str>) -> Vec<String> {
        used.into_iter()
            .filter(|variable| !self.variable_definitions.contains_key(*variable))
            .map(str::to_string)
            .collect()
    }

    /// Evaluates `@skip` and `@include`. A condition that cannot be evaluated has no effect.
    fn skipped(&mut self, include_skip: &IncludeSkip, location: Location) -> bool {
        let mut skipped = false;
        for condition in include_skip.conditions() {
            if let Some(value) = self.condition(condition, location) {
                skipped |= value == condition.directive.skips_when();
            }
        }
        skipped
    }

    fn condition(&mut self, condition: &Condition, location: Location) -> Option<bool> {
        let directive = condition.directive.to_string();
        let Some(value) = &condition.value else {
            self.report(SpecError::MissingDirectiveArgument(directive), location);
            return None;
        };

        let undefined = self.undefined_variables(value.variables());
        if !undefined.is_empty() {
            for variable in undefined {
                self.report(SpecError::UndefinedVariable(variable), location);
            }
            return None;
        }

        // `if` is a non-null Boolean: variables must be declared as Boolean and hold a value
        let declared_boolean = value.variables().into_iter().all(|variable| {
            self.variable_definitions
                .get(variable)
                .is_some_and(|definition| definition.ty == FieldType::Boolean)
        });
        match value.evaluate(&self.variables) {
            Ok(Some(Value::Bool(value))) if declared_boolean => Some(value),
            _ => {
                self.reject_value(SpecError::InvalidDirectiveArgument(directive), location);
                None
            }
        }
    }

    fn collect_fields(
        &mut self,
        selection_set: &[Selection],
        parent: &ObjectType,
        depth: usize,
        nodes: &mut Vec<QueryNode>,
    ) {
        for selection in selection_set {
            match selection {
                Selection::Field {
                    alias,
                    name,
                    arguments,
                    selection_set,
                    include_skip,
                    location,
                } => {
                    let response_key = alias.clone().unwrap_or_else(|| name.clone());
                    self.path.push(PathElement::Key(response_key.clone()));
                    if !self.skipped(include_skip, *location) {
                        if let Some(node) = self.field(
                            parent,
                            response_key,
                            name,
                            arguments,
                            selection_set.as_deref(),
                            *location,
                            depth,
                        ) {
                            self.merge(nodes, node);
                        }
                    }
                    self.path.pop();
                }
                Selection::InlineFragment {
                    type_condition,
                    selection_set,
                    include_skip,
                    location,
                } => {
                    if self.skipped(include_skip, *location) {
                        continue;
                    }
                    if let Some(type_condition) = type_condition {
                        if !self.applies_to(type_condition, parent, *location, *location) {
                            continue;
                        }
                    }
                    self.collect_fields(selection_set, parent, depth, nodes);
                }
                Selection::FragmentSpread {
                    name,
                    include_skip,
                    location,
                } => {
                    if self.skipped(include_skip, *location) {
                        continue;
                    }
                    let fragments = self.fragments;
                    let Some(fragment) = fragments.get(name) else {
                        self.report(SpecError::UnknownFragment(name.clone()), *location);
                        continue;
                    };
                    if self.fragment_stack.contains(name) {
                        self.report(SpecError::FragmentCycle(name.clone()), *location);
                        continue;
                    }
                    if !self.applies_to(
                        &fragment.type_condition,
                        parent,
                        *location,
                        fragment.location,
                    ) {
                        continue;
                    }
                    self.fragment_stack.push(name.clone());
                    self.collect_fields(&fragment.selection_set, parent, depth, nodes);
                    self.fragment_stack.pop();
                }
            }
        }
    }

    /// Object types only match themselves: there are no interfaces nor unions.
    fn applies_to(
        &mut self,
        type_condition: &str,
        parent: &ObjectType,
        location: Location,
        condition_location: Location,
    ) -> bool {
        if type_condition == parent.name {
            return true;
        }
        if self.schema.object_type(type_condition).is_none() {
            self.report(
                SpecError::UnknownType(type_condition.to_string()),
                condition_location,
            );
        } else {
            self.report(
                SpecError::InvalidFragmentSpread {
                    type_condition: type_condition.to_string(),
                    parent: parent.name.clone(),
                },
                location,
            );
        }
        false
    }

    #[allow(clippy::too_many_arguments)]
    fn field(
        &mut self,
        parent: &ObjectType,
        response_key: String,
        name: &str,
        arguments: &[(String, InputValue)],
        selection_set: Option<&[Selection]>,
        location: Location,
        depth: usize,
    ) -> Option<QueryNode> {
        if name == TYPENAME {
            for (argument, _) in arguments {
                self.report(
                    SpecError::UnknownArgument {
                        type_name: parent.name.clone(),
                        field: TYPENAME.to_string(),
                        argument: argument.clone(),
                    },
                    location,
                );
            }
            if selection_set.is_some() {
                self.report(
                    SpecError::UnexpectedSelectionSet {
                        field: TYPENAME.to_string(),
                        field_type: FieldType::String.to_string(),
                    },
                    location,
                );
            }
            return Some(QueryNode {
                response_key,
                field_name: TYPENAME.to_string(),
                field_type: FieldType::String,
                arguments: Object::new(),
                selection_set: Vec::new(),
                location,
            });
        }

        let Some(definition) = parent.field(name) else {
            self.report(
                SpecError::InvalidField(name.to_string(), parent.name.clone()),
                location,
            );
            return None;
        };
        let arguments = self.coerce_arguments(parent, definition, arguments, location);

        let schema = self.schema;
        let selection_set = match (definition.ty.inner_type_name(), selection_set) {
            (None, None) => Vec::new(),
            (None, Some(_)) => {
                self.report(
                    SpecError::UnexpectedSelectionSet {
                        field: name.to_string(),
                        field_type: definition.ty.to_string(),
                    },
                    location,
                );
                Vec::new()
            }
            (Some(_), None) => {
                self.report(
                    SpecError::MissingSelectionSet {
                        field: name.to_string(),
                        field_type: definition.ty.to_string(),
                    },
                    location,
                );
                Vec::new()
            }
            (Some(type_name), Some(selection_set)) => match schema.object_type(type_name) {
                None => {
                    self.report(SpecError::UnknownType(type_name.to_string()), location);
                    Vec::new()
                }
                Some(_) if depth >= self.max_depth => {
                    if !self.depth_exceeded {
                        self.depth_exceeded = true;
                        self.report(SpecError::RecursionLimitExceeded, location);
                    }
                    Vec::new()
                }
                Some(object_type) => {
                    let mut children = Vec::new();
                    self.collect_fields(selection_set, object_type, depth + 1, &mut children);
                    children
                }
            },
        };

        Some(QueryNode {
            response_key,
            field_name: name.to_string(),
            field_type: definition.ty.clone(),
            arguments,
            selection_set,
            location,
        })
    }

    fn coerce_arguments(
        &mut self,
        parent: &ObjectType,
        definition: &FieldDefinition,
        arguments: &[(String, InputValue)],
        location: Location,
    ) -> Object {
        let mut coerced = Object::new();
        for (name, value) in arguments {
            let Some(argument) = definition.argument_definition(name) else {
                self.report(
                    SpecError::UnknownArgument {
                        type_name: parent.name.clone(),
                        field: definition.name.clone(),
                        argument: name.clone(),
                    },
                    location,
                );
                continue;
            };

            let undefined = self.undefined_variables(value.variables());
            if !undefined.is_empty() {
                for variable in undefined {
                    self.report(SpecError::UndefinedVariable(variable), location);
                }
                continue;
            }

            let value = value.evaluate(&self.variables).and_then(|value| {
                value
                    .map(|value| argument.ty.coerce_input_value(&value))
                    .transpose()
            });
            match value {
                Ok(Some(value)) => {
                    coerced.insert(name.as_str(), value);
                }
                // A variable without a value leaves the argument out
                Ok(None) => {}
                Err(InvalidValue) => self.reject_value(
                    SpecError::InvalidArgument {
                        type_name: parent.name.clone(),
                        field: definition.name.clone(),
                        argument: name.clone(),
                        expected: argument.ty.to_string(),
                    },
                    location,
                ),
            }
        }

        for argument in &definition.arguments {
            if coerced.contains_key(argument.name.as_str()) {
                continue;
            }
            if let Some(default_value) = &argument.default_value {
                if let Ok(value) = argument.ty.coerce_input_value(default_value) {
                    coerced.insert(argument.name.as_str(), value);
                }
            }
        }
        coerced
    }

    /// Merges `node` into the fields already collected under the same response key.
    fn merge(&mut self, nodes: &mut Vec<QueryNode>, node: QueryNode) {
        let Some(existing) = nodes
            .iter_mut()
            .find(|existing| existing.response_key == node.response_key)
        else {
            nodes.push(node);
            return;
        };
        if existing.field_name != node.field_name || existing.arguments != node.arguments {
            self.report(SpecError::FieldConflict(node.response_key), node.location);
            return;
        }
        for child in node.selection_set {
            self.path.push(PathElement::Key(child.response_key.clone()));
            self.merge(&mut existing.selection_set, child);
            self.path.pop();
        }
    }
}
