//! Database queries for test results.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::test_result::{self, ActiveModel, Entity as TestResult};
use crate::error::{AppError, AppResult};
use crate::models::ReportedResult;

/// Insert one execution attempt verbatim. Result rows are immutable.
pub async fn insert_result<C: ConnectionTrait>(
    conn: &C,
    run_id: Uuid,
    test_case_id: Uuid,
    result: &ReportedResult,
) -> AppResult<test_result::Model> {
    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        test_case_id: Set(test_case_id),
        run_id: Set(run_id),
        status: Set(result.status.as_str().to_string()),
        expected_status: Set(result.expected_status.map(|s| s.as_str().to_string())),
        duration_ms: Set(result.duration),
        retry: Set(result.retry),
        is_final_attempt: Set(result.is_final()),
        worker_index: Set(result.worker_index),
        parallel_index: Set(result.parallel_index),
        outcome: Set(result.outcome.as_str().to_string()),
        error_json: Set(result.error.clone()),
        annotations: Set(result.annotations.clone()),
        attachments: Set(result.attachments.clone()),
        base_url: Set(result.base_url.clone()),
        start_time: Set(result.start_time),
        created_at: Set(Utc::now()),
    };

    let inserted = model
        .insert(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert test result: {}", e)))?;

    Ok(inserted)
}

/// Final-attempt history for one test, newest first, truncated to the
/// scorer's overall window.
pub async fn final_attempt_history<C: ConnectionTrait>(
    conn: &C,
    test_case_id: Uuid,
    limit: usize,
) -> AppResult<Vec<test_result::Model>> {
    let result = TestResult::find()
        .filter(test_result::Column::TestCaseId.eq(test_case_id))
        .filter(test_result::Column::IsFinalAttempt.eq(true))
        .order_by_desc(test_result::Column::CreatedAt)
        .order_by_desc(test_result::Column::Id) // UUIDv7 breaks created_at ties
        .limit(limit as u64)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to load result history: {}", e)))?;

    Ok(result)
}
