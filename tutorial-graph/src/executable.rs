//! Main entry point for the CLI command running a query against the tutorial catalogue.

use std::path::PathBuf;

use anyhow::bail;
use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::configuration::generate_config_schema;
use crate::configuration::Configuration;
use crate::demo;
use crate::execution::execute;
use crate::graphql::Request;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Options for the tutorial-graph command
#[derive(Parser, Debug)]
#[command(
    name = "tutorial-graph",
    about = "Runs GraphQL queries against an in-memory tutorial catalogue",
    version
)]
pub struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[arg(long = "log", default_value = "info", env = "TUTORIAL_GRAPH_LOG")]
    log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// The query document to run; defaults to the catalogue's sample query.
    #[arg(short, long, conflicts_with = "query_file")]
    query: Option<String>,

    /// Reads the query document from a file.
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// Variables of the query, as a JSON object.
    #[arg(long)]
    variables: Option<String>,

    /// The operation to run when the document holds several.
    #[arg(long)]
    operation_name: Option<String>,

    /// Configuration file (YAML).
    #[arg(short, long = "config", env = "TUTORIAL_GRAPH_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Indents the JSON response.
    #[arg(long)]
    pretty: bool,

    /// Prints the catalogue schema in SDL.
    #[arg(long)]
    print_schema: bool,

    /// Prints the configuration schema.
    #[arg(long)]
    schema: bool,
}

impl Opt {
    /// The request described by the command line.
    pub fn request(&self) -> Result<Request> {
        let query = match (&self.query, &self.query_file) {
            (Some(query), _) => query.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("could not read query file {}", path.display()))?,
            (None, None) => demo::DEFAULT_QUERY.to_string(),
        };
        let variables = match &self.variables {
            Some(raw) => match serde_json::from_str::<Value>(raw)
                .context("could not parse --variables")?
            {
                Value::Object(variables) => variables,
                Value::Null => Object::new(),
                _ => bail!("--variables must be a JSON object"),
            },
            None => Object::new(),
        };
        Ok(Request::builder()
            .query(query)
            .and_operation_name(self.operation_name.clone())
            .variables(variables)
            .build())
    }

    /// The configuration file, or the default configuration.
    pub fn configuration(&self) -> Result<Configuration> {
        match &self.config_path {
            Some(path) => Configuration::from_file(path)
                .with_context(|| format!("invalid configuration {}", path.display())),
            None => Ok(Configuration::default()),
        }
    }

    fn init_logging(&self) -> Result<()> {
        let builder = tracing_subscriber::fmt::fmt()
            .with_env_filter(EnvFilter::try_new(&self.log_level).context("could not parse log")?)
            .with_writer(std::io::stderr);
        match self.log_format {
            LogFormat::Text => builder.init(),
            LogFormat::Json => builder.json().init(),
        }
        Ok(())
    }
}

/// This is the main entrypoint.
///
/// Prints the response on stdout and fails when it holds errors.
pub fn main() -> Result<()> {
    let opt = Opt::parse();

    if opt.schema {
        let schema = generate_config_schema();
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    opt.init_logging()?;
    tracing::info!("Running GraphQL application");

    let configuration = opt.configuration()?;
    let schema = demo::schema().context("failed to create GraphQL schema")?;
    if opt.print_schema {
        print!("{}", schema.to_sdl());
        return Ok(());
    }

    let response = execute(&schema, opt.request()?, &configuration);
    let rendered = if opt.pretty {
        response.to_json_string_pretty()?
    } else {
        response.to_json_string()?
    };
    println!("{rendered}");

    ensure!(
        !response.has_errors(),
        "failed to execute GraphQL operation: {} error(s)",
        response.errors.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;
    use test_log::test;

    use super::*;

    fn opt(args: &[&str]) -> Opt {
        Opt::try_parse_from(std::iter::once("tutorial-graph").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn default_request_runs_the_sample_query() {
        let request = opt(&[]).request().unwrap();
        assert_eq!(request.query.as_deref(), Some(demo::DEFAULT_QUERY));
        assert!(request.variables.is_empty());
        assert_eq!(request.operation_name, None);
    }

    #[test]
    fn request_from_arguments() {
        let request = opt(&[
            "--query",
            "query Q($id: Int) { tutorial(id: $id) { ID } }",
            "--variables",
            r#"{"id": 1}"#,
            "--operation-name",
            "Q",
        ])
        .request()
        .unwrap();
        assert_eq!(request.operation_name.as_deref(), Some("Q"));
        assert_eq!(request.variables.get("id"), Some(&json!(1)));
    }

    #[test]
    fn variables_must_be_an_object() {
        let error = opt(&["--variables", "[1]"]).request().unwrap_err();
        assert_eq!(error.to_string(), "--variables must be a JSON object");
        assert!(opt(&["--variables", "{"]).request().is_err());
    }

    #[test]
    fn query_and_query_file_conflict() {
        assert!(Opt::try_parse_from([
            "tutorial-graph",
            "--query",
            "{ list { ID } }",
            "--query-file",
            "query.graphql"
        ])
        .is_err());
    }

    #[test]
    fn log_options() {
        let opt = opt(&["--log", "debug", "--log-format", "json"]);
        assert_eq!(opt.log_level, "debug");
        assert_eq!(opt.log_format, LogFormat::Json);
    }

    #[test]
    fn default_configuration() {
        assert_eq!(opt(&[]).configuration().unwrap(), Configuration::default());
        assert!(opt(&["--config", "does/not/exist.yaml"])
            .configuration()
            .is_err());
    }
}
