//! Test result entity representing one execution attempt.
//!
//! Rows are immutable once written. Only final-attempt rows contribute to
//! run counters and health scoring.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub test_case_id: Uuid,
    pub run_id: Uuid,
    /// passed, failed, timedOut, skipped, interrupted
    pub status: String,
    pub expected_status: Option<String>,
    pub duration_ms: i64,
    pub retry: i32,
    pub is_final_attempt: bool,
    pub worker_index: Option<i32>,
    pub parallel_index: Option<i32>,
    /// expected, unexpected, skipped, flaky
    pub outcome: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub error_json: Option<JsonValue>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub annotations: Option<JsonValue>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub attachments: Option<JsonValue>,
    pub base_url: Option<String>,
    pub start_time: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::test_case::Entity",
        from = "Column::TestCaseId",
        to = "super::test_case::Column::Id",
        on_delete = "Cascade"
    )]
    TestCase,
    #[sea_orm(
        belongs_to = "super::run::Entity",
        from = "Column::RunId",
        to = "super::run::Column::Id",
        on_delete = "Cascade"
    )]
    Run,
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCase.def()
    }
}

impl Related<super::run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Run.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
