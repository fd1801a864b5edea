//! Aggregation of run outcomes into a sweep summary.

use crate::domain::RunOutcome;

/// Successful and failed outcomes of one sweep.
///
/// Both partitions are ordered by submission index, so the summary does not
/// depend on the order in which runs finished.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    pub successful: Vec<RunOutcome>,
    pub failed: Vec<RunOutcome>,
    pub total: usize,
}

impl SweepSummary {
    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn successful_deltas(&self) -> Vec<f64> {
        self.successful.iter().map(|o| o.delta_t).collect()
    }

    pub fn failed_deltas(&self) -> Vec<f64> {
        self.failed.iter().map(|o| o.delta_t).collect()
    }
}

/// Partition outcomes into successes and failures.
pub fn summarize(outcomes: &[RunOutcome]) -> SweepSummary {
    let (mut successful, mut failed): (Vec<RunOutcome>, Vec<RunOutcome>) =
        outcomes.iter().cloned().partition(|o| o.success);

    successful.sort_by_key(|o| o.index);
    failed.sort_by_key(|o| o.index);

    SweepSummary {
        successful,
        failed,
        total: outcomes.len(),
    }
}
