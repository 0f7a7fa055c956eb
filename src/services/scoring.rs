//! Health scoring: bounded result history in, health snapshot out.
//!
//! Pure computation; persistence lives in `db::health`. The ingestor calls
//! this synchronously inside the batch transaction so health is never stale
//! relative to the last ingested result.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::entity::test_result;
use crate::models::{HealthSnapshot, ResultOutcome, Trend};

/// One final-attempt result in scoring order (newest first).
#[derive(Debug, Clone)]
pub struct HealthSample {
    pub outcome: ResultOutcome,
    pub status: String,
    pub duration_ms: i64,
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

impl HealthSample {
    /// Build a sample from a stored result row.
    ///
    /// Rows with an unknown outcome string are dropped by the caller; the
    /// ingestor only ever writes the four known outcomes.
    pub fn from_model(model: &test_result::Model) -> Option<Self> {
        Some(Self {
            outcome: ResultOutcome::parse(&model.outcome)?,
            status: model.status.clone(),
            duration_ms: model.duration_ms,
            run_id: model.run_id,
            recorded_at: model.start_time.unwrap_or(model.created_at),
        })
    }
}

/// Pass/flakiness rates over one window of samples.
#[derive(Debug, Clone, Copy, Default)]
struct WindowStats {
    passed: i32,
    failed: i32,
    skipped: i32,
    flaky: i32,
    pass_rate: f64,
    flakiness_rate: f64,
}

impl WindowStats {
    fn compute(samples: &[HealthSample]) -> Self {
        let mut stats = Self::default();
        for sample in samples {
            match sample.outcome {
                ResultOutcome::Expected => stats.passed += 1,
                ResultOutcome::Unexpected => stats.failed += 1,
                ResultOutcome::Skipped => stats.skipped += 1,
                ResultOutcome::Flaky => stats.flaky += 1,
            }
        }

        // Skipped results are excluded from the denominator
        let executed = stats.passed + stats.failed + stats.flaky;
        if executed > 0 {
            stats.pass_rate = f64::from(stats.passed) / f64::from(executed) * 100.0;
            stats.flakiness_rate = f64::from(stats.flaky) / f64::from(executed) * 100.0;
        }
        stats
    }
}

/// Compute a health snapshot from a final-attempt history ordered newest
/// first. Returns `None` for an empty history (no row is written then).
pub fn compute_health(samples: &[HealthSample], config: &ScoringConfig) -> Option<HealthSnapshot> {
    if samples.is_empty() {
        return None;
    }

    let overall_samples = &samples[..samples.len().min(config.overall_window)];
    let recent_samples = &overall_samples[..overall_samples.len().min(config.recent_window)];

    let overall = WindowStats::compute(overall_samples);
    let recent = WindowStats::compute(recent_samples);

    let w = config.recent_weight;
    let weighted_pass_rate = recent.pass_rate * w + overall.pass_rate * (1.0 - w);

    // Conservative: a test that just became flaky is penalized immediately
    let effective_flakiness = recent.flakiness_rate.max(overall.flakiness_rate);

    // Flakiness costs double what an equivalent pass-rate credit is worth
    let health_score = (weighted_pass_rate - 2.0 * effective_flakiness).round().max(0.0) as i32;

    let health_divergence = recent.pass_rate - overall.pass_rate;

    let (consecutive_passes, consecutive_failures) = streaks(overall_samples);

    let trend = classify_trend(
        health_score,
        consecutive_passes,
        consecutive_failures,
        health_divergence,
    );

    let executed_durations: Vec<i64> = overall_samples
        .iter()
        .filter(|s| s.outcome != ResultOutcome::Skipped)
        .map(|s| s.duration_ms)
        .collect();
    let avg_duration_ms = if executed_durations.is_empty() {
        0.0
    } else {
        executed_durations.iter().sum::<i64>() as f64 / executed_durations.len() as f64
    };

    let newest = &overall_samples[0];
    let last_passed_at = overall_samples
        .iter()
        .find(|s| s.outcome == ResultOutcome::Expected)
        .map(|s| s.recorded_at);
    let last_failed_at = overall_samples
        .iter()
        .find(|s| s.outcome == ResultOutcome::Unexpected)
        .map(|s| s.recorded_at);

    Some(HealthSnapshot {
        total_runs: overall_samples.len() as i32,
        passed_count: overall.passed,
        failed_count: overall.failed,
        skipped_count: overall.skipped,
        flaky_count: overall.flaky,
        overall_pass_rate: overall.pass_rate,
        recent_pass_rate: recent.pass_rate,
        overall_flakiness_rate: overall.flakiness_rate,
        recent_flakiness_rate: recent.flakiness_rate,
        health_divergence,
        avg_duration_ms,
        health_score,
        trend,
        consecutive_passes,
        consecutive_failures,
        last_status: Some(newest.status.clone()),
        last_run_id: Some(newest.run_id),
        last_run_at: Some(newest.recorded_at),
        last_passed_at,
        last_failed_at,
    })
}

/// Consecutive pass/fail streaks scanning newest to oldest.
///
/// An expected outcome extends the pass streak; an unexpected outcome
/// extends the fail streak. Flaky and skipped outcomes are transparent:
/// they neither extend nor break either streak. The scan stops at the first
/// outcome of the opposite kind once a streak has started - this tie-break
/// drives trend classification and must not change.
fn streaks(samples: &[HealthSample]) -> (i32, i32) {
    let mut passes = 0;
    let mut failures = 0;

    for sample in samples {
        match sample.outcome {
            ResultOutcome::Expected => {
                if failures > 0 {
                    break;
                }
                passes += 1;
            }
            ResultOutcome::Unexpected => {
                if passes > 0 {
                    break;
                }
                failures += 1;
            }
            ResultOutcome::Skipped | ResultOutcome::Flaky => {}
        }
    }

    (passes, failures)
}

/// Trend classification, checks applied in priority order with critical first.
fn classify_trend(
    health_score: i32,
    consecutive_passes: i32,
    consecutive_failures: i32,
    health_divergence: f64,
) -> Trend {
    if health_score < 50 {
        Trend::Critical
    } else if consecutive_failures >= 3 || health_divergence < -15.0 {
        Trend::Degrading
    } else if consecutive_passes >= 5 && health_score > 80 {
        Trend::Improving
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(outcome: ResultOutcome) -> HealthSample {
        HealthSample {
            outcome,
            status: match outcome {
                ResultOutcome::Expected => "passed".to_string(),
                ResultOutcome::Unexpected => "failed".to_string(),
                ResultOutcome::Skipped => "skipped".to_string(),
                ResultOutcome::Flaky => "passed".to_string(),
            },
            duration_ms: 100,
            run_id: Uuid::nil(),
            recorded_at: Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
        }
    }

    fn history(outcomes: &[ResultOutcome]) -> Vec<HealthSample> {
        outcomes.iter().copied().map(sample).collect()
    }

    fn config(overall: usize, recent: usize, weight: f64) -> ScoringConfig {
        ScoringConfig {
            overall_window: overall,
            recent_window: recent,
            recent_weight: weight,
        }
    }

    use ResultOutcome::{Expected as P, Flaky as FL, Skipped as S, Unexpected as F};

    #[test]
    fn test_empty_history_yields_no_snapshot() {
        assert!(compute_health(&[], &ScoringConfig::default()).is_none());
    }

    #[test]
    fn test_scenario_weighted_score_with_recency_bias() {
        // Newest to oldest: pass, pass, fail, pass, pass
        let samples = history(&[P, P, F, P, P]);
        let snapshot = compute_health(&samples, &config(5, 2, 0.6)).unwrap();

        assert_eq!(snapshot.recent_pass_rate, 100.0);
        assert_eq!(snapshot.overall_pass_rate, 80.0);
        assert_eq!(snapshot.health_score, 92);
        assert_eq!(snapshot.overall_flakiness_rate, 0.0);
        assert_eq!(snapshot.consecutive_passes, 2);
        assert_eq!(snapshot.consecutive_failures, 0);
        // Two consecutive passes are not enough for "improving"
        assert_eq!(snapshot.trend, Trend::Stable);
    }

    #[test]
    fn test_single_result_history() {
        let samples = history(&[P]);
        let snapshot = compute_health(&samples, &ScoringConfig::default()).unwrap();

        assert_eq!(snapshot.total_runs, 1);
        assert_eq!(snapshot.passed_count, 1);
        assert_eq!(snapshot.health_score, 100);
        assert_eq!(snapshot.consecutive_passes, 1);
    }

    #[test]
    fn test_skipped_excluded_from_denominator() {
        let samples = history(&[S, S, P, S]);
        let snapshot = compute_health(&samples, &ScoringConfig::default()).unwrap();

        assert_eq!(snapshot.overall_pass_rate, 100.0);
        assert_eq!(snapshot.skipped_count, 3);
        assert_eq!(snapshot.total_runs, 4);
    }

    #[test]
    fn test_all_skipped_rates_are_zero() {
        let samples = history(&[S, S]);
        let snapshot = compute_health(&samples, &ScoringConfig::default()).unwrap();

        assert_eq!(snapshot.overall_pass_rate, 0.0);
        assert_eq!(snapshot.overall_flakiness_rate, 0.0);
        assert_eq!(snapshot.avg_duration_ms, 0.0);
        assert_eq!(snapshot.health_score, 0);
    }

    #[test]
    fn test_flakiness_penalized_at_double_weight() {
        // 4 passes, 1 flaky: pass rate 80, flakiness 20 -> 80 - 40 = 40
        let samples = history(&[FL, P, P, P, P]);
        let snapshot = compute_health(&samples, &config(5, 5, 0.6)).unwrap();

        assert_eq!(snapshot.overall_pass_rate, 80.0);
        assert_eq!(snapshot.overall_flakiness_rate, 20.0);
        assert_eq!(snapshot.health_score, 40);
        assert_eq!(snapshot.trend, Trend::Critical);
    }

    #[test]
    fn test_effective_flakiness_takes_the_max_of_windows() {
        // Flaky only in the older part of the window: overall flakiness is
        // nonzero, recent is zero, and the max must still penalize.
        let samples = history(&[P, P, FL, FL, P, P, P, P, P, P]);
        let snapshot = compute_health(&samples, &config(10, 2, 0.6)).unwrap();

        assert_eq!(snapshot.recent_flakiness_rate, 0.0);
        assert!(snapshot.overall_flakiness_rate > 0.0);
        // weighted = 100*0.6 + 80*0.4 = 92; eff = 20 -> 92 - 40 = 52
        assert_eq!(snapshot.health_score, 52);
    }

    #[test]
    fn test_score_never_negative() {
        let samples = history(&[F, F, FL, FL, FL]);
        let snapshot = compute_health(&samples, &config(5, 5, 0.6)).unwrap();
        assert_eq!(snapshot.health_score, 0);
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let samples = history(&[P, FL, F, P, S, P, F, P]);
        let cfg = config(8, 3, 0.6);
        let first = compute_health(&samples, &cfg).unwrap();
        let second = compute_health(&samples, &cfg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_history_truncated_to_overall_window() {
        // Ten entries but window of 5: the older five failures are invisible
        let samples = history(&[P, P, P, P, P, F, F, F, F, F]);
        let snapshot = compute_health(&samples, &config(5, 2, 0.6)).unwrap();

        assert_eq!(snapshot.total_runs, 5);
        assert_eq!(snapshot.overall_pass_rate, 100.0);
        assert_eq!(snapshot.failed_count, 0);
    }

    #[test]
    fn test_score_monotone_in_pass_rate() {
        // Flakiness fixed at zero; more passes must never lower the score
        let cfg = config(10, 5, 0.6);
        let mut previous = -1;
        for passes in 0..=10 {
            let outcomes: Vec<ResultOutcome> = (0..10)
                .map(|i| if i < passes { P } else { F })
                .collect();
            let score = compute_health(&history(&outcomes), &cfg).unwrap().health_score;
            assert!(
                score >= previous,
                "score dropped from {} to {} at {} passes",
                previous,
                score,
                passes
            );
            previous = score;
        }
    }

    #[test]
    fn test_score_antitone_in_flakiness() {
        // Pass rate structure fixed; more flaky entries must never raise the score
        let cfg = config(10, 10, 0.6);
        let mut previous = 101;
        for flaky in 0..=10 {
            let outcomes: Vec<ResultOutcome> = (0..10)
                .map(|i| if i < flaky { FL } else { P })
                .collect();
            let score = compute_health(&history(&outcomes), &cfg).unwrap().health_score;
            assert!(
                score <= previous,
                "score rose from {} to {} at {} flaky",
                previous,
                score,
                flaky
            );
            previous = score;
        }
    }

    #[test]
    fn test_streaks_transparent_outcomes() {
        // Flaky and skipped neither extend nor break a pass streak
        let (passes, failures) = streaks(&history(&[P, FL, S, P, P, F]));
        assert_eq!(passes, 3);
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_streaks_stop_at_opposite_kind() {
        let (passes, failures) = streaks(&history(&[F, F, S, F, P, F]));
        assert_eq!(passes, 0);
        assert_eq!(failures, 3);

        let (passes, failures) = streaks(&history(&[P, P, F]));
        assert_eq!(passes, 2);
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_streaks_leading_transparent_outcomes() {
        let (passes, failures) = streaks(&history(&[S, FL, F, F]));
        assert_eq!(passes, 0);
        assert_eq!(failures, 2);
    }

    #[test]
    fn test_trend_critical_checked_first() {
        // Even with a long pass streak, a sub-50 score is critical
        assert_eq!(classify_trend(49, 10, 0, 0.0), Trend::Critical);
        assert_eq!(classify_trend(50, 0, 0, 0.0), Trend::Stable);
    }

    #[test]
    fn test_trend_degrading_on_fail_streak_or_divergence() {
        assert_eq!(classify_trend(90, 0, 3, 0.0), Trend::Degrading);
        assert_eq!(classify_trend(90, 0, 0, -15.1), Trend::Degrading);
        assert_eq!(classify_trend(90, 0, 2, -15.0), Trend::Stable);
    }

    #[test]
    fn test_trend_improving_needs_streak_and_score() {
        assert_eq!(classify_trend(81, 5, 0, 0.0), Trend::Improving);
        assert_eq!(classify_trend(80, 5, 0, 0.0), Trend::Stable);
        assert_eq!(classify_trend(81, 4, 0, 0.0), Trend::Stable);
    }

    #[test]
    fn test_regressing_history_classified_degrading() {
        // Old history solid, recent window failing: divergence drives the trend
        let samples = history(&[F, P, P, P, P, P, P, P, P, P]);
        let snapshot = compute_health(&samples, &config(10, 2, 0.5)).unwrap();

        assert!(snapshot.health_divergence < -15.0);
        assert!(snapshot.health_score >= 50);
        assert_eq!(snapshot.trend, Trend::Degrading);
    }

    #[test]
    fn test_last_seen_fields() {
        let mut samples = history(&[P, F, P]);
        samples[1].recorded_at = Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap();
        let snapshot = compute_health(&samples, &ScoringConfig::default()).unwrap();

        assert_eq!(snapshot.last_status.as_deref(), Some("passed"));
        assert_eq!(snapshot.last_passed_at, Some(samples[0].recorded_at));
        assert_eq!(snapshot.last_failed_at, Some(samples[1].recorded_at));
    }

    #[test]
    fn test_avg_duration_over_executed_samples() {
        let mut samples = history(&[P, S, F]);
        samples[0].duration_ms = 100;
        samples[1].duration_ms = 0;
        samples[2].duration_ms = 300;
        let snapshot = compute_health(&samples, &ScoringConfig::default()).unwrap();

        assert_eq!(snapshot.avg_duration_ms, 200.0);
    }
}
