//! Result ingestion: one batch in, run/test/result rows and fresh health out.
//!
//! The whole batch is one database transaction. A failure at any point -
//! run upsert, test upsert, result insert, or health recomputation - rolls
//! everything back; there is no partially ingested batch.
//!
//! Delivery is at-least-once: re-sending an already-processed batch for the
//! same external run id adds its counters again. Reporters must not replay
//! a batch the service has acknowledged.

use sea_orm::{DatabaseConnection, TransactionTrait};
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{IngestResponse, ReportBatch, RunCounterDelta};
use crate::services::scoring::{self, HealthSample};

/// Ingest one report batch.
///
/// Validation happens before the transaction opens, so a rejected batch has
/// no side effects at all.
pub async fn ingest_batch(
    conn: &DatabaseConnection,
    scoring_config: &ScoringConfig,
    batch: ReportBatch,
) -> AppResult<IngestResponse> {
    let repository = batch
        .metadata
        .repository
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::InvalidInput("metadata.repository is required".to_string()))?
        .to_string();

    let delta = RunCounterDelta::from_results(&batch.results);

    let txn = conn
        .begin()
        .await
        .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

    let run = db::runs::upsert_for_batch(&txn, &batch, &repository, &delta).await?;

    // BTreeSet keeps rescoring order deterministic across identical batches
    let mut touched: BTreeSet<Uuid> = BTreeSet::new();

    for result in &batch.results {
        let test = db::test_cases::resolve_or_create(&txn, &repository, result).await?;
        db::results::insert_result(&txn, run.id, test.id, result).await?;
        touched.insert(test.id);
    }

    // Score every touched test inside the same unit of work so health is
    // never stale relative to the results just written (read-your-writes)
    for &test_case_id in &touched {
        rescore_test(&txn, scoring_config, test_case_id).await?;
    }

    txn.commit()
        .await
        .map_err(|e| AppError::Database(format!("Failed to commit batch: {}", e)))?;

    info!(
        run_id = %run.id,
        external_id = %batch.run_external_id,
        results = batch.results.len(),
        tests_scored = touched.len(),
        "Batch ingested"
    );

    Ok(IngestResponse {
        run_id: run.id,
        results_ingested: batch.results.len(),
        tests_scored: touched.len(),
    })
}

/// Recompute health for one test from its stored final-attempt history.
///
/// A test with no final-attempt results gets no health row; a test with at
/// least one gets its single row fully replaced.
async fn rescore_test<C: sea_orm::ConnectionTrait>(
    conn: &C,
    scoring_config: &ScoringConfig,
    test_case_id: Uuid,
) -> AppResult<()> {
    let history =
        db::results::final_attempt_history(conn, test_case_id, scoring_config.overall_window)
            .await?;

    let samples: Vec<HealthSample> = history
        .iter()
        .filter_map(HealthSample::from_model)
        .collect();

    if let Some(snapshot) = scoring::compute_health(&samples, scoring_config) {
        db::health::upsert_snapshot(conn, test_case_id, &snapshot).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunMetadata, TestStatus};
    use chrono::Utc;

    fn batch_without_repository() -> ReportBatch {
        ReportBatch {
            run_external_id: "gh-1".to_string(),
            metadata: RunMetadata {
                repository: None,
                branch: None,
                commit_sha: None,
                ci_job_url: None,
                base_url: None,
                shard: None,
            },
            start_time: Utc::now(),
            end_time: None,
            status: None,
            results: Vec::new(),
        }
    }

    // Validation runs before the transaction opens; exercising it does not
    // need a live database because the connection is never touched.
    #[tokio::test]
    async fn test_missing_repository_rejected_before_any_mutation() {
        let conn = sea_orm::DatabaseConnection::default();
        let result = ingest_batch(&conn, &ScoringConfig::default(), batch_without_repository()).await;

        match result {
            Err(AppError::InvalidInput(msg)) => assert!(msg.contains("repository")),
            other => panic!("expected InvalidInput, got {:?}", other.map(|r| r.run_id)),
        }
    }

    #[tokio::test]
    async fn test_blank_repository_rejected() {
        let conn = sea_orm::DatabaseConnection::default();
        let mut batch = batch_without_repository();
        batch.metadata.repository = Some("   ".to_string());

        let result = ingest_batch(&conn, &ScoringConfig::default(), batch).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_counter_delta_only_counts_final_attempts() {
        use crate::models::{ReportedResult, ResultOutcome};

        let retry = ReportedResult {
            file_path: "a.spec.ts".to_string(),
            title: "t".to_string(),
            project_name: None,
            tags: None,
            location: None,
            status: TestStatus::Failed,
            expected_status: None,
            duration: 10,
            retry: 0,
            is_final_attempt: Some(false),
            worker_index: None,
            parallel_index: None,
            outcome: ResultOutcome::Unexpected,
            error: None,
            annotations: None,
            attachments: None,
            start_time: None,
            base_url: None,
        };
        let mut final_attempt = retry.clone();
        final_attempt.is_final_attempt = Some(true);
        final_attempt.outcome = ResultOutcome::Flaky;

        let delta = RunCounterDelta::from_results(&[retry, final_attempt]);
        assert_eq!(delta.total, 1);
        assert_eq!(delta.failed, 0);
        assert_eq!(delta.flaky, 1);
    }
}
