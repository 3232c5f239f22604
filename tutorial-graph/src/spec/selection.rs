use apollo_parser::cst;
use apollo_parser::cst::CstNode;
use displaydoc::Display;
use serde_json_bytes::ByteString;

use crate::graphql::Location;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::FieldType;
use crate::spec::InvalidValue;
use crate::spec::SpecError;

/// A selection as written in the query document, before validation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selection {
    Field {
        alias: Option<String>,
        name: String,
        arguments: Vec<(String, InputValue)>,
        selection_set: Option<Vec<Selection>>,
        include_skip: IncludeSkip,
        location: Location,
    },
    InlineFragment {
        type_condition: Option<String>,
        selection_set: Vec<Selection>,
        include_skip: IncludeSkip,
        location: Location,
    },
    FragmentSpread {
        name: String,
        include_skip: IncludeSkip,
        location: Location,
    },
}

pub(crate) fn location_of(node: &impl CstNode, source: &str) -> Location {
    Location::from_offset(source, usize::from(node.syntax().text_range().start()))
}

fn name_of(name: Option<cst::Name>, node: &str) -> Result<String, SpecError> {
    name.map(|name| name.text().to_string())
        .ok_or_else(|| SpecError::ParsingError {
            message: format!("the {node} node requires a name"),
            location: None,
        })
}

pub(crate) fn parse_selection_set(
    selection_set: Option<cst::SelectionSet>,
    source: &str,
) -> Result<Vec<Selection>, SpecError> {
    selection_set
        .map(|selection_set| {
            selection_set
                .selections()
                .map(|selection| Selection::from_cst(selection, source))
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

impl Selection {
    pub(crate) fn from_cst(selection: cst::Selection, source: &str) -> Result<Self, SpecError> {
        Ok(match selection {
            // Spec: https://spec.graphql.org/draft/#Field
            cst::Selection::Field(field) => {
                let location = location_of(&field, source);
                let alias = field
                    .alias()
                    .map(|alias| name_of(alias.name(), "Alias"))
                    .transpose()?;
                let name = name_of(field.name(), "Field")?;
                let arguments = field
                    .arguments()
                    .map(|arguments| {
                        arguments
                            .arguments()
                            .map(|argument| {
                                let name = name_of(argument.name(), "Argument")?;
                                let value = argument.value().ok_or_else(|| {
                                    SpecError::ParsingError {
                                        message: format!("argument '{name}' requires a value"),
                                        location: Some(location_of(&argument, source)),
                                    }
                                })?;
                                Ok((name, InputValue::from_cst(value)?))
                            })
                            .collect::<Result<Vec<_>, SpecError>>()
                    })
                    .transpose()?
                    .unwrap_or_default();
                let selection_set = match field.selection_set() {
                    Some(selection_set) => Some(parse_selection_set(Some(selection_set), source)?),
                    None => None,
                };
                Self::Field {
                    alias,
                    name,
                    arguments,
                    selection_set,
                    include_skip: IncludeSkip::parse(field.directives())?,
                    location,
                }
            }
            // Spec: https://spec.graphql.org/draft/#InlineFragment
            cst::Selection::InlineFragment(inline_fragment) => {
                let type_condition = inline_fragment
                    .type_condition()
                    .and_then(|type_condition| type_condition.named_type())
                    .map(|named_type| name_of(named_type.name(), "NamedType"))
                    .transpose()?;
                Self::InlineFragment {
                    type_condition,
                    selection_set: parse_selection_set(inline_fragment.selection_set(), source)?,
                    include_skip: IncludeSkip::parse(inline_fragment.directives())?,
                    location: location_of(&inline_fragment, source),
                }
            }
            // Spec: https://spec.graphql.org/draft/#FragmentSpread
            cst::Selection::FragmentSpread(fragment_spread) => Self::FragmentSpread {
                name: name_of(
                    fragment_spread
                        .fragment_name()
                        .and_then(|fragment_name| fragment_name.name()),
                    "FragmentName",
                )?,
                include_skip: IncludeSkip::parse(fragment_spread.directives())?,
                location: location_of(&fragment_spread, source),
            },
        })
    }
}

/// An argument value as written in the query document.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputValue {
    Variable(String),
    Constant(Value),
    Enum(String),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

impl InputValue {
    pub(crate) fn from_cst(value: cst::Value) -> Result<Self, SpecError> {
        let invalid = |message: String| SpecError::ParsingError {
            message: format!("invalid literal: {message}"),
            location: None,
        };
        Ok(match value {
            cst::Value::Variable(variable) => {
                InputValue::Variable(name_of(variable.name(), "Variable")?)
            }
            cst::Value::StringValue(string) => InputValue::Constant(String::from(&string).into()),
            cst::Value::FloatValue(float) => InputValue::Constant(
                f64::try_from(&float)
                    .map_err(|error| invalid(error.to_string()))?
                    .into(),
            ),
            cst::Value::IntValue(int) => match i32::try_from(&int) {
                Ok(int) => InputValue::Constant(int.into()),
                // Out of range integers are kept as floats so they fail Int coercion.
                Err(_) => InputValue::Constant(
                    f64::try_from(&int)
                        .map_err(|error| invalid(error.to_string()))?
                        .into(),
                ),
            },
            cst::Value::BooleanValue(boolean) => {
                InputValue::Constant(Value::Bool(boolean.true_token().is_some()))
            }
            cst::Value::NullValue(_) => InputValue::Constant(Value::Null),
            cst::Value::EnumValue(enum_value) => {
                InputValue::Enum(name_of(enum_value.name(), "EnumValue")?)
            }
            cst::Value::ListValue(list) => InputValue::List(
                list.values()
                    .map(InputValue::from_cst)
                    .collect::<Result<_, _>>()?,
            ),
            cst::Value::ObjectValue(object) => InputValue::Object(
                object
                    .object_fields()
                    .map(|field| {
                        let name = name_of(field.name(), "ObjectField")?;
                        let value = field.value().ok_or_else(|| invalid(name.clone()))?;
                        Ok((name, InputValue::from_cst(value)?))
                    })
                    .collect::<Result<_, SpecError>>()?,
            ),
        })
    }

    /// The variables this value refers to.
    pub(crate) fn variables(&self) -> Vec<&str> {
        match self {
            InputValue::Variable(name) => vec![name.as_str()],
            InputValue::Constant(_) | InputValue::Enum(_) => Vec::new(),
            InputValue::List(values) => values.iter().flat_map(InputValue::variables).collect(),
            InputValue::Object(fields) => fields
                .iter()
                .flat_map(|(_, value)| value.variables())
                .collect(),
        }
    }

    /// Substitutes variables.
    ///
    /// Returns `None` when the value is a variable without a value. Enum literals are rejected:
    /// this type system has no enum types.
    pub(crate) fn evaluate(&self, variables: &Object) -> Result<Option<Value>, InvalidValue> {
        Ok(match self {
            InputValue::Variable(name) => variables.get(name.as_str()).cloned(),
            InputValue::Constant(value) => Some(value.clone()),
            InputValue::Enum(_) => return Err(InvalidValue),
            InputValue::List(values) => Some(Value::Array(
                values
                    .iter()
                    .map(|value| Ok(value.evaluate(variables)?.unwrap_or_default()))
                    .collect::<Result<_, _>>()?,
            )),
            InputValue::Object(fields) => Some(Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| {
                        Ok((
                            ByteString::from(name.as_str()),
                            value.evaluate(variables)?.unwrap_or_default(),
                        ))
                    })
                    .collect::<Result<_, _>>()?,
            )),
        })
    }
}

/// The `@skip` and `@include` directives of a selection, with their `if` argument as written.
///
/// Conditions are evaluated during validation, once variables are coerced.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct IncludeSkip {
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    pub(crate) directive: Directive,
    /// `None` when the directive has no `if` argument.
    pub(crate) value: Option<InputValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum Directive {
    /// skip
    Skip,
    /// include
    Include,
}

impl Directive {
    /// The value of `if` leaving the selection out.
    pub(crate) fn skips_when(self) -> bool {
        matches!(self, Directive::Skip)
    }
}

impl IncludeSkip {
    pub(crate) fn parse(directives: Option<cst::Directives>) -> Result<Self, SpecError> {
        let mut conditions: Vec<Condition> = Vec::new();
        for directive in directives.iter().flat_map(|directives| directives.directives()) {
            let kind = match directive.name().map(|name| name.text().to_string()).as_deref() {
                Some("skip") => Directive::Skip,
                Some("include") => Directive::Include,
                _ => continue,
            };
            if conditions.iter().any(|condition| condition.directive == kind) {
                continue;
            }
            let value = directive
                .arguments()
                .iter()
                .flat_map(|arguments| arguments.arguments())
                .find(|argument| {
                    argument
                        .name()
                        .map(|name| name.text().to_string() == "if")
                        .unwrap_or_default()
                })
                .and_then(|argument| argument.value())
                .map(InputValue::from_cst)
                .transpose()?;
            conditions.push(Condition {
                directive: kind,
                value,
            });
        }
        Ok(Self { conditions })
    }

    pub(crate) fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// A validated field selection.
///
/// Arguments are coerced to their declared types, defaults applied, directives evaluated and
/// fragments inlined. Fields requested several times under one response key are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub(crate) response_key: String,
    pub(crate) field_name: String,
    pub(crate) field_type: FieldType,
    pub(crate) arguments: Object,
    pub(crate) selection_set: Vec<QueryNode>,
    pub(crate) location: Location,
}

impl QueryNode {
    /// The key of this field in the response: its alias, or its name.
    pub fn response_key(&self) -> &str {
        &self.response_key
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// The coerced arguments.
    pub fn arguments(&self) -> &Object {
        &self.arguments
    }

    pub fn selection_set(&self) -> &[QueryNode] {
        &self.selection_set
    }

    pub fn location(&self) -> Location {
        self.location
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;

    fn parse(query: &str) -> Vec<Selection> {
        let tree = apollo_parser::Parser::new(query).parse();
        assert_eq!(tree.errors().len(), 0);
        let operation = tree
            .document()
            .definitions()
            .find_map(|definition| match definition {
                cst::Definition::OperationDefinition(operation) => Some(operation),
                _ => None,
            })
            .unwrap();
        parse_selection_set(operation.selection_set(), query).unwrap()
    }

    #[test]
    fn field_with_alias_and_arguments() {
        let selections = parse("{ first: tutorial(id: 1, tags: [\"go\", $tag]) { Title } }");
        match &selections[0] {
            Selection::Field {
                alias,
                name,
                arguments,
                selection_set,
                location,
                ..
            } => {
                assert_eq!(alias.as_deref(), Some("first"));
                assert_eq!(name, "tutorial");
                assert_eq!(arguments[0], ("id".to_string(), InputValue::Constant(json!(1))));
                assert_eq!(
                    arguments[1].1,
                    InputValue::List(vec![
                        InputValue::Constant(json!("go")),
                        InputValue::Variable("tag".to_string())
                    ])
                );
                assert_eq!(arguments[1].1.variables(), vec!["tag"]);
                assert_eq!(selection_set.as_ref().map(Vec::len), Some(1));
                assert_eq!(*location, Location { line: 1, column: 3 });
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn fragments_and_directives() {
        let selections =
            parse("{ ...Details @include(if: $full) ... on Tutorial @skip(if: true) @skip(if: false) { ID } }");
        match &selections[0] {
            Selection::FragmentSpread {
                name, include_skip, ..
            } => {
                assert_eq!(name, "Details");
                assert_eq!(
                    include_skip.conditions(),
                    &[Condition {
                        directive: Directive::Include,
                        value: Some(InputValue::Variable("full".to_string())),
                    }]
                );
            }
            other => panic!("unexpected selection {other:?}"),
        }
        match &selections[1] {
            Selection::InlineFragment {
                type_condition,
                include_skip,
                ..
            } => {
                assert_eq!(type_condition.as_deref(), Some("Tutorial"));
                // only the first @skip counts
                assert_eq!(
                    include_skip.conditions(),
                    &[Condition {
                        directive: Directive::Skip,
                        value: Some(InputValue::Constant(json!(true))),
                    }]
                );
            }
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn directive_arguments_are_kept_as_written() {
        let selections = parse("{ ID @skip(if: 1) Title @include }");
        let conditions = selections
            .iter()
            .map(|selection| match selection {
                Selection::Field { include_skip, .. } => include_skip.conditions().to_vec(),
                other => panic!("unexpected selection {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_eq!(
            conditions,
            vec![
                vec![Condition {
                    directive: Directive::Skip,
                    value: Some(InputValue::Constant(json!(1))),
                }],
                vec![Condition {
                    directive: Directive::Include,
                    value: None,
                }],
            ]
        );
        assert!(Directive::Skip.skips_when());
        assert!(!Directive::Include.skips_when());
    }

    #[test]
    fn numbers() {
        let selections = parse("{ f(a: 2147483647, b: 2147483648, c: -1.5e3) }");
        let Selection::Field { arguments, .. } = &selections[0] else {
            panic!("expected a field");
        };
        assert_eq!(arguments[0].1, InputValue::Constant(json!(2147483647)));
        assert_eq!(arguments[1].1, InputValue::Constant(json!(2147483648.0)));
        assert_eq!(arguments[2].1, InputValue::Constant(json!(-1500.0)));
    }

    #[test]
    fn evaluate_substitutes_variables() {
        let mut variables = Object::new();
        variables.insert("id", 2.into());
        let value = InputValue::List(vec![
            InputValue::Constant(json!(1)),
            InputValue::Variable("id".to_string()),
            InputValue::Variable("missing".to_string()),
        ]);
        assert_eq!(value.evaluate(&variables), Ok(Some(json!([1, 2, null]))));
        assert_eq!(
            InputValue::Variable("missing".to_string()).evaluate(&variables),
            Ok(None)
        );
        assert_eq!(
            InputValue::Enum("RED".to_string()).evaluate(&variables),
            Err(InvalidValue)
        );
    }

    #[test]
    fn literals() {
        let selections =
            parse("{ f(a: \"say \\\"hi\\\"\", b: 1.5, c: false, d: null, e: RED, g: { x: 1 }) }");
        let Selection::Field { arguments, .. } = &selections[0] else {
            panic!("expected a field");
        };
        let values: Vec<_> = arguments.iter().map(|(_, value)| value.clone()).collect();
        assert_eq!(
            values,
            vec![
                InputValue::Constant(json!("say \"hi\"")),
                InputValue::Constant(json!(1.5)),
                InputValue::Constant(json!(false)),
                InputValue::Constant(json!(null)),
                InputValue::Enum("RED".to_string()),
                InputValue::Object(vec![("x".to_string(), InputValue::Constant(json!(1)))]),
            ]
        );
    }
}
