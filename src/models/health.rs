//! Health snapshot produced by the scorer and its read-only API shape.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::status::Trend;
use crate::entity::test_health;

/// Fully derived health state for one test.
///
/// Replaces the test's single `test_health` row on every recomputation;
/// computing it twice from the same history yields an identical snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthSnapshot {
    pub total_runs: i32,
    pub passed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub flaky_count: i32,
    pub overall_pass_rate: f64,
    pub recent_pass_rate: f64,
    pub overall_flakiness_rate: f64,
    pub recent_flakiness_rate: f64,
    pub health_divergence: f64,
    pub avg_duration_ms: f64,
    pub health_score: i32,
    pub trend: Trend,
    pub consecutive_passes: i32,
    pub consecutive_failures: i32,
    pub last_status: Option<String>,
    pub last_run_id: Option<Uuid>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_passed_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
}

/// Read-only health record exposed per test.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestHealthResponse {
    pub test_case_id: Uuid,
    pub total_runs: i32,
    pub passed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub flaky_count: i32,
    pub overall_pass_rate: f64,
    pub recent_pass_rate: f64,
    pub overall_flakiness_rate: f64,
    pub recent_flakiness_rate: f64,
    pub health_divergence: f64,
    pub avg_duration_ms: f64,
    pub health_score: i32,
    pub trend: String,
    pub consecutive_passes: i32,
    pub consecutive_failures: i32,
    pub last_status: Option<String>,
    pub last_run_id: Option<Uuid>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_passed_at: Option<DateTime<Utc>>,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl From<test_health::Model> for TestHealthResponse {
    fn from(model: test_health::Model) -> Self {
        Self {
            test_case_id: model.test_case_id,
            total_runs: model.total_runs,
            passed_count: model.passed_count,
            failed_count: model.failed_count,
            skipped_count: model.skipped_count,
            flaky_count: model.flaky_count,
            overall_pass_rate: model.overall_pass_rate,
            recent_pass_rate: model.recent_pass_rate,
            overall_flakiness_rate: model.overall_flakiness_rate,
            recent_flakiness_rate: model.recent_flakiness_rate,
            health_divergence: model.health_divergence,
            avg_duration_ms: model.avg_duration_ms,
            health_score: model.health_score,
            trend: model.trend,
            consecutive_passes: model.consecutive_passes,
            consecutive_failures: model.consecutive_failures,
            last_status: model.last_status,
            last_run_id: model.last_run_id,
            last_run_at: model.last_run_at,
            last_passed_at: model.last_passed_at,
            last_failed_at: model.last_failed_at,
            updated_at: model.updated_at,
        }
    }
}
