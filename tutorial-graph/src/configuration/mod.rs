//! Logic for loading configuration in to an object model

use std::path::Path;
use std::str::FromStr;

use displaydoc::Display;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file {path}: {error}
    CannotReadConfig {
        path: String,
        error: std::io::Error,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
}

/// The configuration of the query engine.
///
/// Can be created through `serde::Deserialize` from various formats, usually YAML through
/// [`Configuration::from_str`], or inline in Rust code with [`Configuration::builder`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Limits applied to query documents.
    pub(crate) limits: Limits,

    /// Query execution options.
    pub(crate) execution: Execution,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(limits: Option<Limits>, execution: Option<Execution>) -> Self {
        Self {
            limits: limits.unwrap_or_default(),
            execution: execution.unwrap_or_default(),
        }
    }

    /// Reads and validates a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| {
            ConfigurationError::CannotReadConfig {
                path: path.display().to_string(),
                error,
            }
        })?;
        raw.parse()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    fn validate(self) -> Result<Self, ConfigurationError> {
        if self.limits.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid limits.max_depth",
                error: "the selection depth limit must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // An empty file is the default configuration
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str::<Configuration>(s)
            .map_err(ConfigurationError::DeserializeConfigError)?
            .validate()
    }
}

/// Limits applied while parsing and validating query documents.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Maximum recursion depth of the query parser; defaults to 500
    pub(crate) parser_recursion_limit: usize,

    /// Maximum number of tokens in a query document; defaults to 15000
    pub(crate) parser_token_limit: usize,

    /// Maximum nesting of selection sets, root fields being at depth 1; defaults to 512
    pub(crate) max_depth: usize,
}

const DEFAULT_PARSER_RECURSION_LIMIT: usize = 500;
const DEFAULT_PARSER_TOKEN_LIMIT: usize = 15_000;
const DEFAULT_MAX_DEPTH: usize = 512;

#[buildstructor::buildstructor]
impl Limits {
    #[builder]
    pub fn new(
        parser_recursion_limit: Option<usize>,
        parser_token_limit: Option<usize>,
        max_depth: Option<usize>,
    ) -> Self {
        Self {
            parser_recursion_limit: parser_recursion_limit
                .unwrap_or(DEFAULT_PARSER_RECURSION_LIMIT),
            parser_token_limit: parser_token_limit.unwrap_or(DEFAULT_PARSER_TOKEN_LIMIT),
            max_depth: max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        }
    }

    pub fn parser_recursion_limit(&self) -> usize {
        self.parser_recursion_limit
    }

    pub fn parser_token_limit(&self) -> usize {
        self.parser_token_limit
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Query execution options.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Execution {
    /// What to do with argument and variable values that do not match their declared type
    pub(crate) argument_coercion: ArgumentCoercion,
}

#[buildstructor::buildstructor]
impl Execution {
    #[builder]
    pub fn new(argument_coercion: Option<ArgumentCoercion>) -> Self {
        Self {
            argument_coercion: argument_coercion.unwrap_or_default(),
        }
    }

    pub fn argument_coercion(&self) -> ArgumentCoercion {
        self.argument_coercion
    }
}

/// Handling of argument and variable values that cannot be coerced to their declared type.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentCoercion {
    /// The query fails validation with an `ARGUMENT_TYPE_ERROR`.
    #[default]
    Strict,
    /// The value is discarded with a warning and the argument is treated as absent.
    Lenient,
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    settings.into_generator().into_root_schema_for::<Configuration>()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn defaults() {
        let configuration = Configuration::default();
        assert_eq!(configuration.limits().parser_recursion_limit(), 500);
        assert_eq!(configuration.limits().parser_token_limit(), 15_000);
        assert_eq!(configuration.limits().max_depth(), 512);
        assert_eq!(
            configuration.execution().argument_coercion(),
            ArgumentCoercion::Strict
        );
        assert_eq!(Configuration::from_str("").unwrap(), configuration);
        assert_eq!(Configuration::builder().build(), configuration);
    }

    #[test]
    fn from_yaml() {
        let configuration = Configuration::from_str(
            r#"
limits:
  max_depth: 10
execution:
  argument_coercion: lenient
"#,
        )
        .unwrap();
        assert_eq!(configuration.limits().max_depth(), 10);
        assert_eq!(configuration.limits().parser_recursion_limit(), 500);
        assert_eq!(
            configuration.execution().argument_coercion(),
            ArgumentCoercion::Lenient
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = Configuration::from_str("limits:\n  max_dept: 10\n").unwrap_err();
        assert!(matches!(error, ConfigurationError::DeserializeConfigError(_)));
        assert!(Configuration::from_str("execution:\n  argument_coercion: loose\n").is_err());
    }

    #[test]
    fn max_depth_must_be_positive() {
        let error = Configuration::from_str("limits:\n  max_depth: 0\n").unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid limits.max_depth: the selection depth limit must be at least 1"
        );
    }

    #[test]
    fn missing_file() {
        let error = Configuration::from_file("does/not/exist.yaml").unwrap_err();
        assert!(matches!(error, ConfigurationError::CannotReadConfig { .. }));
    }

    #[test]
    fn config_schema() {
        let schema = serde_json::to_value(generate_config_schema()).unwrap();
        assert_eq!(schema["additionalProperties"], serde_json::json!(false));
        let mut sections = schema["properties"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        sections.sort();
        assert_eq!(sections, vec!["execution", "limits"]);
    }
}
