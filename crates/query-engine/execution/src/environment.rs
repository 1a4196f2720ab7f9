//! State shared by every execution an executor runs.

use std::sync::Arc;

use query_engine_materialization::PlanCache;

use crate::metrics::Metrics;

/// Default pre-allocation for result lists when the caller gives no hint.
pub const DEFAULT_EXPECTED_COUNT: usize = 10;

/// Plan diagnostics, logged before execution when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub log_queries: bool,
    pub pretty_print: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            log_queries: false,
            pretty_print: true,
        }
    }
}

/// The plan cache, metrics and settings an executor hands to each execution.
#[derive(Debug, Clone)]
pub struct ExecutionEnvironment {
    pub plans: Arc<PlanCache>,
    pub metrics: Metrics,
    pub diagnostics: Diagnostics,
    pub expected_count: usize,
}

impl ExecutionEnvironment {
    pub fn new(metrics: Metrics) -> Self {
        ExecutionEnvironment {
            plans: Arc::new(PlanCache::new()),
            metrics,
            diagnostics: Diagnostics::default(),
            expected_count: DEFAULT_EXPECTED_COUNT,
        }
    }

    /// Share an existing plan cache, e.g. between an async and a sync executor.
    #[must_use]
    pub fn with_plan_cache(mut self, plans: Arc<PlanCache>) -> Self {
        self.plans = plans;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub fn with_expected_count(mut self, expected_count: usize) -> Self {
        self.expected_count = expected_count;
        self
    }
}
