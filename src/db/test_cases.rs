//! Database queries for test cases.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::test_case::{self, ActiveModel, Entity as TestCase};
use crate::error::{AppError, AppResult};
use crate::models::ReportedResult;

/// Build the lookup key runners use to check a test against one evaluation
/// response. Four-part identity minus the repository, which scopes the
/// whole response.
pub fn test_key(file_path: &str, project_name: &str, title: &str) -> String {
    format!("{}::{}::{}", file_path, project_name, title)
}

/// Find a test by its four-part identity, including soft-deleted rows.
pub async fn find_by_identity<C: ConnectionTrait>(
    conn: &C,
    repository: &str,
    file_path: &str,
    title: &str,
    project_name: &str,
) -> AppResult<Option<test_case::Model>> {
    let result = TestCase::find()
        .filter(test_case::Column::Repository.eq(repository))
        .filter(test_case::Column::FilePath.eq(file_path))
        .filter(test_case::Column::Title.eq(title))
        .filter(test_case::Column::ProjectName.eq(project_name))
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to find test case: {}", e)))?;

    Ok(result)
}

/// Get a test by primary key.
pub async fn get_by_id<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<Option<test_case::Model>> {
    let result = TestCase::find_by_id(id)
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get test case: {}", e)))?;

    Ok(result)
}

/// Resolve the test for a reported result, creating it on first sighting.
///
/// A soft-deleted test seen again is restored: recurrence implies it still
/// exists in the codebase. Tags, source location, and last-seen are
/// refreshed on every sighting.
pub async fn resolve_or_create<C: ConnectionTrait>(
    conn: &C,
    repository: &str,
    result: &ReportedResult,
) -> AppResult<test_case::Model> {
    let now = Utc::now();
    let tags_json = result
        .tags
        .as_ref()
        .map(|tags| serde_json::json!(tags));

    let existing = find_by_identity(
        conn,
        repository,
        &result.file_path,
        &result.title,
        result.project(),
    )
    .await?;

    match existing {
        Some(test) => {
            let mut active: ActiveModel = test.into();
            active.tags = Set(tags_json);
            if let Some(ref location) = result.location {
                active.source_file = Set(Some(location.file.clone()));
                active.source_line = Set(Some(location.line));
                active.source_column = Set(Some(location.column));
            }
            active.last_seen_at = Set(now);
            active.updated_at = Set(now);
            // Restore if previously soft-deleted
            active.deleted_at = Set(None);
            active.deleted_reason = Set(None);

            let updated = active
                .update(conn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to update test case: {}", e)))?;

            Ok(updated)
        }
        None => {
            let model = ActiveModel {
                id: Set(Uuid::now_v7()),
                repository: Set(repository.to_string()),
                file_path: Set(result.file_path.clone()),
                title: Set(result.title.clone()),
                project_name: Set(result.project().to_string()),
                tags: Set(tags_json),
                source_file: Set(result.location.as_ref().map(|l| l.file.clone())),
                source_line: Set(result.location.as_ref().map(|l| l.line)),
                source_column: Set(result.location.as_ref().map(|l| l.column)),
                first_seen_at: Set(now),
                last_seen_at: Set(now),
                created_at: Set(now),
                updated_at: Set(now),
                deleted_at: Set(None),
                deleted_reason: Set(None),
            };

            let inserted = model
                .insert(conn)
                .await
                .map_err(|e| AppError::Database(format!("Failed to insert test case: {}", e)))?;

            Ok(inserted)
        }
    }
}

/// Candidate tests for disablement evaluation: active tests of a
/// repository, optionally narrowed to an id list and a project.
pub async fn find_candidates<C: ConnectionTrait>(
    conn: &C,
    repository: &str,
    test_ids: Option<&[Uuid]>,
    project_name: Option<&str>,
) -> AppResult<Vec<test_case::Model>> {
    let mut select = TestCase::find()
        .filter(test_case::Column::Repository.eq(repository))
        .filter(test_case::Column::DeletedAt.is_null());

    if let Some(ids) = test_ids {
        select = select.filter(test_case::Column::Id.is_in(ids.to_vec()));
    }

    if let Some(project) = project_name {
        select = select.filter(test_case::Column::ProjectName.eq(project));
    }

    let result = select
        .all(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to find candidate tests: {}", e)))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(
            test_key("auth/login.spec.ts", "chromium", "logs in"),
            "auth/login.spec.ts::chromium::logs in"
        );
        // Empty project still produces a stable key
        assert_eq!(test_key("a.ts", "", "t"), "a.ts::::t");
    }
}
