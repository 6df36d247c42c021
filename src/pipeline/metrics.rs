use super::state::{RunState, RunStatus, RunSummary};

pub fn compute_summary(state: &RunState, records: usize, total_duration_ms: u64) -> RunSummary {
    let processed_urls: usize = state.buckets.iter().map(|b| b.processed).sum();
    let failed_urls: usize = state.buckets.iter().map(|b| b.failed).sum();

    RunSummary {
        run_id: state.run_id.clone(),
        cve_id: state.cve_id.clone(),
        discovered_urls: state.discovered_urls,
        bucket_counts: state.bucket_counts.clone(),
        processed_urls,
        failed_urls,
        records,
        total_duration_ms,
        failed: state.status == RunStatus::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::state::BucketMetrics;

    #[test]
    fn test_summary_totals() {
        let mut state = RunState::new("CVE-2024-0001");
        state.discovered_urls = 5;
        state.buckets = vec![
            BucketMetrics { bucket: "commit".into(), urls: 3, processed: 2, failed: 1, records: 2, duration_ms: 10 },
            BucketMetrics { bucket: "pull".into(), urls: 1, processed: 1, failed: 0, records: 0, duration_ms: 5 },
        ];
        state.status = RunStatus::Completed;

        let summary = compute_summary(&state, 2, 42);
        assert_eq!(summary.processed_urls, 3);
        assert_eq!(summary.failed_urls, 1);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.total_duration_ms, 42);
        assert!(!summary.failed);
        assert_eq!(summary.run_id, state.run_id);
    }
}
