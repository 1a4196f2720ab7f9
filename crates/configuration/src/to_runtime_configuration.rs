//! Convert a parsed configuration into a runtime one, resolving secrets.

use std::path::PathBuf;

use crate::configuration::{Configuration, Connection};
use crate::environment::Environment;
use crate::error::MakeRuntimeConfigurationError;
use crate::values::{ConnectionUri, Secret};
use crate::version1::{ParsedConfiguration, CONFIGURATION_FILENAME};

/// Elaborate the runtime configuration from the parsed one, reading secrets
/// from the given environment.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, MakeRuntimeConfigurationError> {
    let connection_uri = match parsed_config.connection.connection_uri {
        ConnectionUri(Secret::Plain(uri)) => Ok(uri),
        ConnectionUri(Secret::FromEnvironment { variable }) => environment
            .read(&variable)
            .map_err(|error| MakeRuntimeConfigurationError::MissingEnvironmentVariable {
                file_path: PathBuf::from(CONFIGURATION_FILENAME),
                message: error.to_string(),
            }),
    }?;

    let execution = parsed_config.execution;
    if execution.plan_cache_capacity == Some(0) {
        return Err(MakeRuntimeConfigurationError::InvalidValue {
            field: "execution.planCacheCapacity",
            message: "must be at least 1 when given".to_string(),
        });
    }
    if execution.max_plan_depth == 0 {
        return Err(MakeRuntimeConfigurationError::InvalidValue {
            field: "execution.maxPlanDepth",
            message: "must be at least 1".to_string(),
        });
    }

    Ok(Configuration {
        connection: Connection {
            backend: parsed_config.connection.backend,
            connection_uri,
        },
        execution,
        diagnostics: parsed_config.diagnostics,
    })
}
