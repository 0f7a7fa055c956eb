//! Wire format for the result-ingestion entrypoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use super::status::{ResultOutcome, RunStatus, TestStatus};

/// One ingestion batch: a CI run (or one shard of it) worth of results.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportBatch {
    /// Externally supplied run identifier, unique per logical CI run.
    pub run_external_id: String,
    pub metadata: RunMetadata,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Terminal status, supplied only by the final batch of a run.
    pub status: Option<RunStatus>,
    #[serde(default)]
    pub results: Vec<ReportedResult>,
}

/// Run-level metadata. `repository` is the only required field.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub ci_job_url: Option<String>,
    pub base_url: Option<String>,
    pub shard: Option<ShardInfo>,
}

/// Shard position for sharded CI reporting.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShardInfo {
    pub current: i32,
    pub total: i32,
}

/// Source location of a test within its file.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SourceLocation {
    pub file: String,
    pub line: i32,
    pub column: i32,
}

/// One reported execution attempt.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportedResult {
    pub file_path: String,
    pub title: String,
    pub project_name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub location: Option<SourceLocation>,
    pub status: TestStatus,
    pub expected_status: Option<TestStatus>,
    /// Milliseconds.
    pub duration: i64,
    #[serde(default)]
    pub retry: i32,
    /// Defaults to true when the reporter does not track retries.
    pub is_final_attempt: Option<bool>,
    pub worker_index: Option<i32>,
    pub parallel_index: Option<i32>,
    pub outcome: ResultOutcome,
    pub error: Option<JsonValue>,
    pub annotations: Option<JsonValue>,
    pub attachments: Option<JsonValue>,
    pub start_time: Option<DateTime<Utc>>,
    pub base_url: Option<String>,
}

impl ReportedResult {
    /// Whether this attempt counts toward run counters and health.
    pub fn is_final(&self) -> bool {
        self.is_final_attempt.unwrap_or(true)
    }

    /// Project name normalized for the identity tuple (empty when absent).
    pub fn project(&self) -> &str {
        self.project_name.as_deref().unwrap_or("")
    }
}

/// Per-outcome counter increments derived from the final attempts of a batch.
///
/// Added onto existing run counters, never assigned, so several batches for
/// one external run id converge to the sum across all of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounterDelta {
    pub total: i32,
    pub passed: i32,
    pub failed: i32,
    pub skipped: i32,
    pub flaky: i32,
}

impl RunCounterDelta {
    /// Tally the final attempts of a batch by outcome.
    pub fn from_results(results: &[ReportedResult]) -> Self {
        let mut delta = Self::default();
        for result in results.iter().filter(|r| r.is_final()) {
            delta.total += 1;
            match result.outcome {
                ResultOutcome::Expected => delta.passed += 1,
                ResultOutcome::Unexpected => delta.failed += 1,
                ResultOutcome::Skipped => delta.skipped += 1,
                ResultOutcome::Flaky => delta.flaky += 1,
            }
        }
        delta
    }
}

/// Response for a successful ingestion.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub run_id: Uuid,
    pub results_ingested: usize,
    /// Distinct tests whose health was recomputed.
    pub tests_scored: usize,
}
