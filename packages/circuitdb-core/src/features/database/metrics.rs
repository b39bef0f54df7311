//! Prometheus metrics for the database session

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Histogram, HistogramOpts, IntCounter, IntGauge, Opts,
    Registry,
};

use crate::errors::Result;

#[derive(Clone)]
pub struct DatabaseMetrics {
    pub commits: IntCounter,
    pub noop_commits: IntCounter,
    pub rejected_commits: IntCounter,
    pub memo_builds: IntCounter,
    pub undos: IntCounter,
    pub redos: IntCounter,
    pub undo_depth: IntGauge,
    pub commit_latency: Histogram,
}

impl DatabaseMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        Ok(Self {
            commits: register_int_counter_with_registry!(
                Opts::new("circuitdb_commits_total", "Published design snapshots"),
                registry
            )?,
            noop_commits: register_int_counter_with_registry!(
                Opts::new(
                    "circuitdb_noop_commits_total",
                    "Commits that changed nothing"
                ),
                registry
            )?,
            rejected_commits: register_int_counter_with_registry!(
                Opts::new(
                    "circuitdb_rejected_commits_total",
                    "Commits rejected by validation or the checker"
                ),
                registry
            )?,
            memo_builds: register_int_counter_with_registry!(
                Opts::new(
                    "circuitdb_memo_builds_total",
                    "Memoization tables built eagerly on commit"
                ),
                registry
            )?,
            undos: register_int_counter_with_registry!(
                Opts::new("circuitdb_undos_total", "Undo operations"),
                registry
            )?,
            redos: register_int_counter_with_registry!(
                Opts::new("circuitdb_redos_total", "Redo operations"),
                registry
            )?,
            undo_depth: register_int_gauge_with_registry!(
                Opts::new("circuitdb_undo_depth", "Retained undo frames"),
                registry
            )?,
            commit_latency: register_histogram_with_registry!(
                HistogramOpts::new("circuitdb_commit_seconds", "Commit latency")
                    .buckets(vec![0.0001, 0.001, 0.01, 0.1, 1.0]),
                registry
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_once_per_registry() {
        let registry = Registry::new();
        let metrics = DatabaseMetrics::new(&registry).unwrap();
        metrics.commits.inc();
        assert_eq!(metrics.commits.get(), 1);

        // same names on the same registry collide
        assert!(DatabaseMetrics::new(&registry).is_err());
        assert!(DatabaseMetrics::new(&Registry::new()).is_ok());
    }
}
