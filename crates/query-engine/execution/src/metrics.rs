//! Metrics setup and update for query executions.

use prometheus::core::{AtomicU64, GenericCounter, GenericCounterVec};

use crate::error::Error;

/// The collection of all metrics exposed through the caller's registry.
#[derive(Debug, Clone)]
pub struct Metrics {
    pub query_total: GenericCounter<AtomicU64>,
    pub query_error_total: GenericCounterVec<AtomicU64>,
    pub rows_materialized_total: GenericCounter<AtomicU64>,
    pub plan_cache_hit_total: GenericCounter<AtomicU64>,
    pub plan_cache_miss_total: GenericCounter<AtomicU64>,
}

impl Metrics {
    /// Set up counters used to produce Prometheus metrics.
    pub fn initialize(metrics_registry: &mut prometheus::Registry) -> Result<Self, prometheus::Error> {
        let query_total = add_int_counter_metric(
            metrics_registry,
            "asynq_query_total",
            "Total successful query executions.",
        )?;

        let query_error_total = add_int_counter_vec_metric(
            metrics_registry,
            "asynq_query_error_total",
            "Total failed query executions, by failure kind.",
            &["kind"],
        )?;

        let rows_materialized_total = add_int_counter_metric(
            metrics_registry,
            "asynq_rows_materialized_total",
            "Total rows materialized and published by successful executions.",
        )?;

        let plan_cache_hit_total = add_int_counter_metric(
            metrics_registry,
            "asynq_plan_cache_hit_total",
            "Total mapping plan lookups served from the cache.",
        )?;

        let plan_cache_miss_total = add_int_counter_metric(
            metrics_registry,
            "asynq_plan_cache_miss_total",
            "Total mapping plan lookups that had to build a plan.",
        )?;

        Ok(Self {
            query_total,
            query_error_total,
            rows_materialized_total,
            plan_cache_hit_total,
            plan_cache_miss_total,
        })
    }

    /// Metrics registered into a throwaway registry, for callers that do not
    /// export them.
    pub fn unregistered() -> Result<Self, prometheus::Error> {
        Self::initialize(&mut prometheus::Registry::new())
    }

    pub(crate) fn record_success(&self, rows: usize) {
        self.query_total.inc();
        self.rows_materialized_total.inc_by(rows as u64);
    }

    pub(crate) fn record_error(&self, error: &Error) {
        self.query_error_total
            .with_label_values(&[error.kind()])
            .inc();
    }
}

/// Create a new int counter metric and register it with the provided Prometheus Registry.
fn add_int_counter_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
) -> Result<GenericCounter<AtomicU64>, prometheus::Error> {
    let int_counter =
        prometheus::IntCounter::with_opts(prometheus::Opts::new(metric_name, metric_description))?;
    metrics_registry.register(Box::new(int_counter.clone()))?;
    Ok(int_counter)
}

/// Create a new labelled int counter metric and register it with the provided Prometheus Registry.
fn add_int_counter_vec_metric(
    metrics_registry: &mut prometheus::Registry,
    metric_name: &str,
    metric_description: &str,
    labels: &[&str],
) -> Result<GenericCounterVec<AtomicU64>, prometheus::Error> {
    let int_counter_vec = prometheus::IntCounterVec::new(
        prometheus::Opts::new(metric_name, metric_description),
        labels,
    )?;
    metrics_registry.register(Box::new(int_counter_vec.clone()))?;
    Ok(int_counter_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;

    #[test]
    fn counters_are_exposed_through_the_registry() {
        let mut registry = prometheus::Registry::new();
        let metrics = Metrics::initialize(&mut registry).unwrap();

        metrics.record_success(3);
        metrics.record_error(&Error::Connection(ConnectionError::open("refused")));
        metrics.record_error(&Error::Abandoned);

        assert_eq!(metrics.query_total.get(), 1);
        assert_eq!(metrics.rows_materialized_total.get(), 3);
        assert_eq!(
            metrics.query_error_total.with_label_values(&["open"]).get(),
            1
        );

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"asynq_query_total".to_string()));
        assert!(names.contains(&"asynq_query_error_total".to_string()));
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = prometheus::Registry::new();
        Metrics::initialize(&mut registry).unwrap();
        assert!(Metrics::initialize(&mut registry).is_err());
    }
}
