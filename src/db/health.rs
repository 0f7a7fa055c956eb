//! Database queries for derived test health.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::test_health::{self, ActiveModel, Entity as TestHealth};
use crate::error::{AppError, AppResult};
use crate::models::HealthSnapshot;

/// Get the health row for a test.
pub async fn get_by_test_case_id<C: ConnectionTrait>(
    conn: &C,
    test_case_id: Uuid,
) -> AppResult<Option<test_health::Model>> {
    let result = TestHealth::find()
        .filter(test_health::Column::TestCaseId.eq(test_case_id))
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get test health: {}", e)))?;

    Ok(result)
}

/// Replace the single health row for a test with a freshly computed
/// snapshot. The row is fully derived; every field is overwritten.
pub async fn upsert_snapshot<C: ConnectionTrait>(
    conn: &C,
    test_case_id: Uuid,
    snapshot: &HealthSnapshot,
) -> AppResult<test_health::Model> {
    let now = Utc::now();

    let existing = get_by_test_case_id(conn, test_case_id).await?;
    let is_new = existing.is_none();

    let mut active = match existing {
        Some(model) => ActiveModel::from(model),
        None => ActiveModel {
            id: Set(Uuid::now_v7()),
            test_case_id: Set(test_case_id),
            ..Default::default()
        },
    };

    active.total_runs = Set(snapshot.total_runs);
    active.passed_count = Set(snapshot.passed_count);
    active.failed_count = Set(snapshot.failed_count);
    active.skipped_count = Set(snapshot.skipped_count);
    active.flaky_count = Set(snapshot.flaky_count);
    active.overall_pass_rate = Set(snapshot.overall_pass_rate);
    active.recent_pass_rate = Set(snapshot.recent_pass_rate);
    active.overall_flakiness_rate = Set(snapshot.overall_flakiness_rate);
    active.recent_flakiness_rate = Set(snapshot.recent_flakiness_rate);
    active.health_divergence = Set(snapshot.health_divergence);
    active.avg_duration_ms = Set(snapshot.avg_duration_ms);
    active.health_score = Set(snapshot.health_score);
    active.trend = Set(snapshot.trend.as_str().to_string());
    active.consecutive_passes = Set(snapshot.consecutive_passes);
    active.consecutive_failures = Set(snapshot.consecutive_failures);
    active.last_status = Set(snapshot.last_status.clone());
    active.last_run_id = Set(snapshot.last_run_id);
    active.last_run_at = Set(snapshot.last_run_at);
    active.last_passed_at = Set(snapshot.last_passed_at);
    active.last_failed_at = Set(snapshot.last_failed_at);
    active.updated_at = Set(now);

    // A fresh row already has its primary key set, so save() would route it
    // to an UPDATE matching nothing. Pick the statement explicitly.
    let model = if is_new {
        active
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert test health: {}", e)))?
    } else {
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update test health: {}", e)))?
    };

    Ok(model)
}
