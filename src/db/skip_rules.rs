//! Database queries for skip rules.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::skip_rule::{self, ActiveModel, Entity as SkipRule};
use crate::error::{AppError, AppResult};
use crate::models::CreateSkipRuleRequest;

/// Insert a new skip rule for a test.
pub async fn insert_rule<C: ConnectionTrait>(
    conn: &C,
    test_case_id: Uuid,
    request: &CreateSkipRuleRequest,
) -> AppResult<skip_rule::Model> {
    let model = ActiveModel {
        id: Set(Uuid::now_v7()),
        test_case_id: Set(test_case_id),
        branch_pattern: Set(request.branch_pattern.clone()),
        env_pattern: Set(request.env_pattern.clone()),
        reason: Set(request.reason.clone()),
        created_at: Set(Utc::now()),
        deleted_at: Set(None),
    };

    let result = model
        .insert(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert skip rule: {}", e)))?;

    Ok(result)
}

/// Active rules for one test, in evaluation order (creation order).
pub async fn active_rules_for_test<C: ConnectionTrait>(
    conn: &C,
    test_case_id: Uuid,
) -> AppResult<Vec<skip_rule::Model>> {
    let result = SkipRule::find()
        .filter(skip_rule::Column::TestCaseId.eq(test_case_id))
        .filter(skip_rule::Column::DeletedAt.is_null())
        .order_by_asc(skip_rule::Column::CreatedAt)
        .order_by_asc(skip_rule::Column::Id)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get skip rules: {}", e)))?;

    Ok(result)
}

/// Active rules for a set of tests, in evaluation order per test.
///
/// The evaluation contract is first-match-wins in creation order, so the
/// ordering here is part of the API, not a storage accident.
pub async fn active_rules_for_tests<C: ConnectionTrait>(
    conn: &C,
    test_case_ids: &[Uuid],
) -> AppResult<Vec<skip_rule::Model>> {
    if test_case_ids.is_empty() {
        return Ok(Vec::new());
    }

    let result = SkipRule::find()
        .filter(skip_rule::Column::TestCaseId.is_in(test_case_ids.to_vec()))
        .filter(skip_rule::Column::DeletedAt.is_null())
        .order_by_asc(skip_rule::Column::CreatedAt)
        .order_by_asc(skip_rule::Column::Id)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get skip rules: {}", e)))?;

    Ok(result)
}

/// Soft-delete a rule. Returns the deleted rule, or None if absent or
/// already deleted.
pub async fn soft_delete_rule<C: ConnectionTrait>(
    conn: &C,
    rule_id: Uuid,
) -> AppResult<Option<skip_rule::Model>> {
    let existing = SkipRule::find_by_id(rule_id)
        .filter(skip_rule::Column::DeletedAt.is_null())
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to find skip rule: {}", e)))?;

    let Some(rule) = existing else {
        return Ok(None);
    };

    let mut active: ActiveModel = rule.into();
    active.deleted_at = Set(Some(Utc::now()));

    let result = active
        .update(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete skip rule: {}", e)))?;

    Ok(Some(result))
}
