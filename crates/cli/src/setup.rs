//! Turn a runtime configuration into the state executions share.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use asynq_configuration::environment::ProcessEnvironment;
use asynq_configuration::{make_runtime_configuration, parse_configuration, Configuration};
use query_engine_execution::metrics::Metrics;
use query_engine_execution::{Diagnostics, ExecutionEnvironment};
use query_engine_materialization::{BuilderSettings, PlanCache};

/// Read the configuration directory and resolve it against the process environment.
pub async fn load_configuration(configuration_dir: &Path) -> anyhow::Result<Configuration> {
    let parsed = parse_configuration(configuration_dir)
        .await
        .with_context(|| format!("reading configuration from {}", configuration_dir.display()))?;
    let configuration = make_runtime_configuration(parsed, ProcessEnvironment)?;
    tracing::info!(
        backend = %configuration.connection.backend,
        "loaded configuration"
    );
    Ok(configuration)
}

pub fn execution_environment(configuration: &Configuration, metrics: Metrics) -> ExecutionEnvironment {
    let execution = &configuration.execution;
    let settings = BuilderSettings {
        sentinel_prefix: execution.sentinel_prefix.clone(),
        max_depth: execution.max_plan_depth,
    };
    let plans = PlanCache::with_settings(
        settings,
        execution.plan_cache_capacity.and_then(NonZeroUsize::new),
    );

    ExecutionEnvironment::new(metrics)
        .with_plan_cache(Arc::new(plans))
        .with_diagnostics(Diagnostics {
            log_queries: configuration.diagnostics.log_queries,
            pretty_print: configuration.diagnostics.pretty_print,
        })
        .with_expected_count(execution.expected_count)
}

#[cfg(test)]
mod tests {
    use asynq_configuration::{Connection, DiagnosticsSettings, ExecutionSettings};
    use asynq_configuration::Backend;

    use super::*;

    #[test]
    fn settings_reach_the_plan_cache() {
        let configuration = Configuration {
            connection: Connection {
                backend: Backend::SqliteSynchronous,
                connection_uri: "school.sqlite".to_string(),
            },
            execution: ExecutionSettings {
                expected_count: 3,
                sentinel_prefix: "present".to_string(),
                plan_cache_capacity: Some(16),
                max_plan_depth: 8,
            },
            diagnostics: DiagnosticsSettings {
                log_queries: true,
                pretty_print: false,
            },
        };

        let environment = execution_environment(&configuration, Metrics::unregistered().unwrap());

        assert_eq!(environment.expected_count, 3);
        assert_eq!(environment.plans.settings().sentinel_prefix, "present");
        assert_eq!(environment.plans.settings().max_depth, 8);
        assert!(environment.diagnostics.log_queries);
        assert!(!environment.diagnostics.pretty_print);
    }
}
