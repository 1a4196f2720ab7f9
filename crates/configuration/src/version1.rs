//! The version 1 configuration format.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ParseConfigurationError, WriteParsedConfigurationError};
use crate::values::{Backend, ConnectionUri, Secret};

const CURRENT_VERSION: u32 = 1;
pub const CONFIGURATION_FILENAME: &str = "configuration.json";
pub const CONFIGURATION_JSONSCHEMA_FILENAME: &str = "schema.json";
pub const DEFAULT_CONNECTION_URI_VARIABLE: &str = "ASYNQ_CONNECTION_URI";

/// Initial configuration, just enough to connect to a database and elaborate a full
/// 'Configuration'.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParsedConfiguration {
    // Which version of the configuration format are we using
    pub version: u32,
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub diagnostics: DiagnosticsSettings,
}

/// How to reach the database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub backend: Backend,
    pub connection_uri: ConnectionUri,
}

/// Tuning of every execution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
    /// How many rows to pre-allocate for when a query gives no hint.
    #[serde(default = "expected_count_default")]
    pub expected_count: usize,
    /// Integer columns whose name starts with this prefix are null tests.
    #[serde(default = "sentinel_prefix_default")]
    pub sentinel_prefix: String,
    /// Maximum number of cached mapping plans; unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_cache_capacity: Option<usize>,
    /// Maximum nesting of composites in a mapped type.
    #[serde(default = "max_plan_depth_default")]
    pub max_plan_depth: usize,
}

fn expected_count_default() -> usize {
    10
}

fn sentinel_prefix_default() -> String {
    "test".to_string()
}

fn max_plan_depth_default() -> usize {
    64
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        ExecutionSettings {
            expected_count: expected_count_default(),
            sentinel_prefix: sentinel_prefix_default(),
            plan_cache_capacity: None,
            max_plan_depth: max_plan_depth_default(),
        }
    }
}

/// What executions log about the queries they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSettings {
    /// Log the text and parameters of every query before it runs.
    #[serde(default)]
    pub log_queries: bool,
    /// Format logged queries over several lines.
    #[serde(default = "pretty_print_default")]
    pub pretty_print: bool,
}

fn pretty_print_default() -> bool {
    true
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        DiagnosticsSettings {
            log_queries: false,
            pretty_print: pretty_print_default(),
        }
    }
}

impl ParsedConfiguration {
    pub fn initial() -> Self {
        ParsedConfiguration::empty()
    }

    pub fn empty() -> Self {
        Self {
            version: CURRENT_VERSION,
            connection: ConnectionSettings {
                backend: Backend::Sqlite,
                connection_uri: ConnectionUri(Secret::FromEnvironment {
                    variable: DEFAULT_CONNECTION_URI_VARIABLE.into(),
                }),
            },
            execution: ExecutionSettings::default(),
            diagnostics: DiagnosticsSettings::default(),
        }
    }
}

/// Parse the configuration file found in the given directory.
pub async fn parse_configuration(
    configuration_dir: impl AsRef<Path>,
) -> Result<ParsedConfiguration, ParseConfigurationError> {
    let configuration_file = configuration_dir.as_ref().join(CONFIGURATION_FILENAME);

    let configuration_file_contents =
        fs::read_to_string(&configuration_file)
            .await
            .map_err(|err| {
                ParseConfigurationError::IoErrorButStringified(format!(
                    "{}: {}",
                    &configuration_file.display(),
                    err
                ))
            })?;

    let parse_error = |error: serde_json::Error| ParseConfigurationError::ParseError {
        file_path: configuration_file.clone(),
        line: error.line(),
        column: error.column(),
        message: error.to_string(),
    };

    let raw: serde_json::Value =
        serde_json::from_str(&configuration_file_contents).map_err(parse_error)?;
    match raw.get("version").and_then(serde_json::Value::as_u64) {
        Some(version) if version == u64::from(CURRENT_VERSION) => {}
        Some(version) => {
            return Err(ParseConfigurationError::UnableToParseAnyVersions(format!(
                "version {version} is not supported, expected {CURRENT_VERSION}"
            )))
        }
        None => {
            return Err(ParseConfigurationError::DidNotFindExpectedVersionTag(
                configuration_file.display().to_string(),
            ))
        }
    }

    let parsed_config: ParsedConfiguration =
        serde_json::from_str(&configuration_file_contents).map_err(parse_error)?;

    if parsed_config.connection.connection_uri.0 == Secret::Plain(String::new()) {
        return Err(ParseConfigurationError::EmptyConnectionUri {
            file_path: configuration_file,
        });
    }

    tracing::debug!(
        file = %configuration_file.display(),
        backend = %parsed_config.connection.backend,
        "parsed configuration"
    );
    Ok(parsed_config)
}

/// Write the configuration, and the JSON schema it follows, into the given directory.
pub async fn write_parsed_configuration(
    parsed_config: ParsedConfiguration,
    out_dir: impl AsRef<Path>,
) -> Result<(), WriteParsedConfigurationError> {
    let configuration_file = out_dir.as_ref().to_owned().join(CONFIGURATION_FILENAME);
    fs::create_dir_all(out_dir.as_ref()).await?;

    // create the configuration file
    fs::write(
        configuration_file,
        serde_json::to_string_pretty(&parsed_config)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    // create the jsonschema file
    let configuration_jsonschema_file_path = out_dir
        .as_ref()
        .to_owned()
        .join(CONFIGURATION_JSONSCHEMA_FILENAME);

    let output = schemars::schema_for!(ParsedConfiguration);
    fs::write(
        &configuration_jsonschema_file_path,
        serde_json::to_string_pretty(&output)
            .map_err(|e| WriteParsedConfigurationError::IoError(e.into()))?
            + "\n",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn configuration_dir(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIGURATION_FILENAME), contents)
            .await
            .unwrap();
        dir
    }

    #[test]
    fn initial_configuration_is_serialized_with_defaults() {
        let json = serde_json::to_string_pretty(&ParsedConfiguration::initial()).unwrap();
        insta::assert_snapshot!(json, @r###"
        {
          "version": 1,
          "connection": {
            "backend": "sqlite",
            "connectionUri": {
              "variable": "ASYNQ_CONNECTION_URI"
            }
          },
          "execution": {
            "expectedCount": 10,
            "sentinelPrefix": "test",
            "maxPlanDepth": 64
          },
          "diagnostics": {
            "logQueries": false,
            "prettyPrint": true
          }
        }
        "###);
    }

    #[tokio::test]
    async fn omitted_sections_take_their_defaults() {
        let dir = configuration_dir(
            r#"{
                "version": 1,
                "connection": { "backend": "sqliteSynchronous", "connectionUri": "school.sqlite" },
                "execution": { "planCacheCapacity": 32 }
            }"#,
        )
        .await;

        let parsed = parse_configuration(dir.path()).await.unwrap();

        assert_eq!(parsed.connection.backend, Backend::SqliteSynchronous);
        assert_eq!(parsed.connection.connection_uri, ConnectionUri::from("school.sqlite"));
        assert_eq!(
            parsed.execution,
            ExecutionSettings {
                plan_cache_capacity: Some(32),
                ..ExecutionSettings::default()
            }
        );
        assert_eq!(parsed.diagnostics, DiagnosticsSettings::default());
    }

    #[tokio::test]
    async fn written_configuration_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut configuration = ParsedConfiguration::initial();
        configuration.diagnostics.log_queries = true;

        write_parsed_configuration(configuration.clone(), dir.path())
            .await
            .unwrap();

        assert_eq!(parse_configuration(dir.path()).await.unwrap(), configuration);
        assert!(dir.path().join(CONFIGURATION_JSONSCHEMA_FILENAME).exists());
    }

    #[tokio::test]
    async fn a_missing_version_is_reported() {
        let dir = configuration_dir(r#"{ "connection": {} }"#).await;
        let err = parse_configuration(dir.path()).await.unwrap_err();
        assert!(matches!(err, ParseConfigurationError::DidNotFindExpectedVersionTag(_)));
    }

    #[tokio::test]
    async fn other_versions_are_rejected() {
        let dir = configuration_dir(r#"{ "version": 2 }"#).await;
        let err = parse_configuration(dir.path()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to parse any configuration versions: version 2 is not supported, expected 1"
        );
    }

    #[tokio::test]
    async fn parse_errors_carry_their_location() {
        let dir = configuration_dir("{\n  \"version\": 1,\n  \"connection\": 7\n}").await;
        let err = parse_configuration(dir.path()).await.unwrap_err();
        match err {
            ParseConfigurationError::ParseError { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn an_empty_connection_uri_is_rejected() {
        let dir = configuration_dir(
            r#"{ "version": 1, "connection": { "backend": "postgres", "connectionUri": "" } }"#,
        )
        .await;
        let err = parse_configuration(dir.path()).await.unwrap_err();
        assert!(matches!(err, ParseConfigurationError::EmptyConnectionUri { .. }));
    }

    #[tokio::test]
    async fn a_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_configuration(dir.path()).await.unwrap_err();
        assert!(matches!(err, ParseConfigurationError::IoErrorButStringified(_)));
    }
}
