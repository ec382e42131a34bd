use std::collections::HashMap;
use log::{debug, warn};

use crate::storage::{AnalysisReport, PermutationRecord, RawMetricRecord, RecordId};
use super::metrics::ROW_ESTIMATE;

/// How much smaller `value` is than `baseline`, in percent, rounded to two
/// decimals. Zero when the baseline is zero.
pub fn improvement_percentage(baseline: f64, value: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    let percentage = (baseline - value) / baseline * 100.0;
    (percentage * 100.0).round() / 100.0
}

/// Index of the largest improvement. The first one wins a tie.
pub fn select_best(improvements: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, improvement) in improvements.iter().enumerate() {
        match best {
            Some(current) if *improvement <= improvements[current] => {}
            _ => best = Some(index),
        }
    }
    best
}

/// Compare every permutation against the baseline, metric by metric.
///
/// The baseline is the permutation named `baseline_name`. One report is
/// produced per metric that has both a baseline observation and at least one
/// other observation; metrics come out in the order they were first observed.
pub fn compare(
    analysis_id: RecordId,
    observations: &[RawMetricRecord],
    permutations: &[PermutationRecord],
    baseline_name: &str,
) -> Vec<AnalysisReport> {
    let names: HashMap<RecordId, &str> = permutations
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();
    let is_baseline = |observation: &RawMetricRecord| {
        names
            .get(&observation.permutation_id)
            .is_some_and(|name| name.eq_ignore_ascii_case(baseline_name))
    };

    let mut baseline_values: HashMap<&str, f64> = HashMap::new();
    let mut metric_order: Vec<&str> = Vec::new();
    let mut by_metric: HashMap<&str, Vec<&RawMetricRecord>> = HashMap::new();

    for observation in observations {
        if !names.contains_key(&observation.permutation_id) {
            warn!(
                "Permutation #{} of metric {} not found. Skipping it",
                observation.permutation_id, observation.metric
            );
            continue;
        }
        let metric = observation.metric.as_str();
        if is_baseline(observation) {
            baseline_values.entry(metric).or_insert(observation.value);
            continue;
        }
        if metric == ROW_ESTIMATE {
            continue;
        }
        by_metric
            .entry(metric)
            .or_insert_with(|| {
                metric_order.push(metric);
                Vec::new()
            })
            .push(observation);
    }

    let row_estimate = baseline_values.get(ROW_ESTIMATE).copied();
    let mut reports = Vec::new();

    for metric in metric_order {
        let Some(&baseline) = baseline_values.get(metric) else {
            warn!("No baseline observation for metric {}. Skipping it", metric);
            continue;
        };
        let candidates = &by_metric[metric];
        let improvements: Vec<f64> = candidates
            .iter()
            .map(|o| improvement_percentage(baseline, o.value))
            .collect();

        let Some(best) = select_best(&improvements) else {
            continue;
        };
        let winner = candidates[best];
        let best_permutation_name = names
            .get(&winner.permutation_id)
            .map(|name| name.to_string())
            .unwrap_or_default();

        debug!(
            "Best permutation for {} is {} ({}%)",
            metric, best_permutation_name, improvements[best]
        );
        reports.push(AnalysisReport {
            analysis_id,
            metric: metric.to_string(),
            best_permutation_name,
            improvement_percentage: improvements[best],
            baseline_value: baseline,
            best_value: winner.value,
            baseline_row_estimate: row_estimate,
        });
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permutation::PermutationKey;

    fn permutations() -> Vec<PermutationRecord> {
        let mut baseline = PermutationRecord::baseline(1, "orders");
        baseline.id = 10;
        let mut a = PermutationRecord::generated(1, PermutationKey::from("102"), "shop_102");
        a.id = 11;
        let mut b = PermutationRecord::generated(1, PermutationKey::from("210"), "shop_210");
        b.id = 12;
        vec![baseline, a, b]
    }

    fn observe(permutation_id: RecordId, metric: &str, value: f64) -> RawMetricRecord {
        RawMetricRecord::new(5, permutation_id, metric, value)
    }

    #[test]
    fn test_improvement_percentage() {
        assert_eq!(improvement_percentage(200.0, 100.0), 50.0);
        assert_eq!(improvement_percentage(0.0, 100.0), 0.0);
        assert_eq!(improvement_percentage(100.0, 125.0), -25.0);
        assert_eq!(improvement_percentage(3.0, 2.0), 33.33);
        assert_eq!(improvement_percentage(3.0, 1.0), 66.67);
    }

    #[test]
    fn test_select_best_prefers_first_of_ties() {
        assert_eq!(select_best(&[1.0, 5.0, 5.0, 2.0]), Some(1));
        assert_eq!(select_best(&[-3.0, -1.0]), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_best_is_chosen_per_metric() {
        let observations = vec![
            observe(10, "row_estimate", 1000.0),
            observe(10, "total_bytes", 16384.0),
            observe(10, "index_bytes", 4096.0),
            observe(11, "row_estimate", 1000.0),
            observe(11, "total_bytes", 8192.0),
            observe(11, "index_bytes", 4096.0),
            observe(12, "row_estimate", 1000.0),
            observe(12, "total_bytes", 12288.0),
            observe(12, "index_bytes", 2048.0),
        ];

        let reports = compare(5, &observations, &permutations(), "orders");
        assert_eq!(reports.len(), 2);

        assert_eq!(reports[0].metric, "total_bytes");
        assert_eq!(reports[0].best_permutation_name, "shop_102");
        assert_eq!(reports[0].improvement_percentage, 50.0);
        assert_eq!(reports[0].baseline_value, 16384.0);
        assert_eq!(reports[0].best_value, 8192.0);
        assert_eq!(reports[0].baseline_row_estimate, Some(1000.0));

        assert_eq!(reports[1].metric, "index_bytes");
        assert_eq!(reports[1].best_permutation_name, "shop_210");
        assert_eq!(reports[1].improvement_percentage, 50.0);
    }

    #[test]
    fn test_ties_go_to_first_seen_permutation() {
        let observations = vec![
            observe(10, "read_all", 2.0),
            observe(12, "read_all", 1.0),
            observe(11, "read_all", 1.0),
        ];
        let reports = compare(5, &observations, &permutations(), "orders");
        assert_eq!(reports[0].best_permutation_name, "shop_210");
        assert_eq!(reports[0].baseline_row_estimate, None);
    }

    #[test]
    fn test_metric_without_baseline_is_skipped() {
        let observations = vec![
            observe(10, "total_bytes", 100.0),
            observe(11, "total_bytes", 90.0),
            observe(11, "read_all", 1.0),
        ];
        let reports = compare(5, &observations, &permutations(), "orders");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].metric, "total_bytes");
        assert_eq!(reports[0].improvement_percentage, 10.0);
    }

    #[test]
    fn test_zero_baseline_reports_zero_improvement() {
        let observations = vec![observe(10, "toast_bytes", 0.0), observe(11, "toast_bytes", 0.0)];
        let reports = compare(5, &observations, &permutations(), "orders");
        assert_eq!(reports[0].improvement_percentage, 0.0);
        assert_eq!(reports[0].best_permutation_name, "shop_102");
    }

    #[test]
    fn test_only_baseline_gives_no_report() {
        let observations = vec![observe(10, "total_bytes", 100.0)];
        assert!(compare(5, &observations, &permutations(), "orders").is_empty());
    }
}
