//! Database queries for runs.

use chrono::Utc;
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::run::{self, ActiveModel, Entity as Run};
use crate::error::{AppError, AppResult};
use crate::models::{ReportBatch, RunCounterDelta, RunStatus};

/// Find a run by its externally supplied id.
pub async fn find_by_external_id<C: ConnectionTrait>(
    conn: &C,
    external_id: &str,
) -> AppResult<Option<run::Model>> {
    let result = Run::find()
        .filter(run::Column::ExternalId.eq(external_id))
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to find run: {}", e)))?;

    Ok(result)
}

/// Upsert the run for a batch and accumulate its counters.
///
/// Counters are added onto existing values, never assigned, and the
/// addition happens inside the UPDATE itself so concurrent batches from
/// sharded reporters converge to the sum across all of them. The status
/// only moves off `running` when a batch carries an explicit one.
pub async fn upsert_for_batch<C: ConnectionTrait>(
    conn: &C,
    batch: &ReportBatch,
    repository: &str,
    delta: &RunCounterDelta,
) -> AppResult<run::Model> {
    let now = Utc::now();

    match find_by_external_id(conn, &batch.run_external_id).await? {
        Some(existing) => {
            let mut update = Run::update_many()
                .col_expr(
                    run::Column::TotalTests,
                    Expr::col(run::Column::TotalTests).add(delta.total),
                )
                .col_expr(
                    run::Column::PassedCount,
                    Expr::col(run::Column::PassedCount).add(delta.passed),
                )
                .col_expr(
                    run::Column::FailedCount,
                    Expr::col(run::Column::FailedCount).add(delta.failed),
                )
                .col_expr(
                    run::Column::SkippedCount,
                    Expr::col(run::Column::SkippedCount).add(delta.skipped),
                )
                .col_expr(
                    run::Column::FlakyCount,
                    Expr::col(run::Column::FlakyCount).add(delta.flaky),
                )
                .col_expr(run::Column::UpdatedAt, Expr::value(now))
                .filter(run::Column::Id.eq(existing.id));

            if let Some(status) = batch.status {
                update = update.col_expr(run::Column::Status, Expr::value(status.as_str()));
            }
            if let Some(end_time) = batch.end_time {
                update = update.col_expr(run::Column::EndTime, Expr::value(end_time));
            }

            update
                .exec(conn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to update run: {}", e)))?;

            find_by_external_id(conn, &batch.run_external_id)
                .await?
                .ok_or_else(|| {
                    AppError::Database(format!(
                        "Run {} vanished during update",
                        batch.run_external_id
                    ))
                })
        }
        None => {
            let status = batch.status.unwrap_or(RunStatus::Running);
            let (shard_current, shard_total) = match &batch.metadata.shard {
                Some(shard) => (Some(shard.current), Some(shard.total)),
                None => (None, None),
            };

            let model = ActiveModel {
                id: Set(Uuid::now_v7()),
                external_id: Set(batch.run_external_id.clone()),
                repository: Set(repository.to_string()),
                branch: Set(batch.metadata.branch.clone()),
                commit_sha: Set(batch.metadata.commit_sha.clone()),
                ci_job_url: Set(batch.metadata.ci_job_url.clone()),
                base_url: Set(batch.metadata.base_url.clone()),
                shard_current: Set(shard_current),
                shard_total: Set(shard_total),
                status: Set(status.as_str().to_string()),
                start_time: Set(batch.start_time),
                end_time: Set(batch.end_time),
                total_tests: Set(delta.total),
                passed_count: Set(delta.passed),
                failed_count: Set(delta.failed),
                skipped_count: Set(delta.skipped),
                flaky_count: Set(delta.flaky),
                created_at: Set(now),
                updated_at: Set(now),
            };

            let result = model
                .insert(conn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to insert run: {}", e)))?;

            Ok(result)
        }
    }
}
