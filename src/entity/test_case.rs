//! Test case entity.
//!
//! Identity is the four-part tuple (repository, file_path, title,
//! project_name). A soft-deleted test seen again in a report is restored,
//! since recurrence implies it still exists in the codebase.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_cases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repository: String,
    pub file_path: String,
    pub title: String,
    /// Project/variant name; empty string when the framework reports none.
    pub project_name: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub tags: Option<JsonValue>,
    pub source_file: Option<String>,
    pub source_line: Option<i32>,
    pub source_column: Option<i32>,
    pub first_seen_at: DateTimeUtc,
    pub last_seen_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_result::Entity")]
    TestResults,
    #[sea_orm(has_one = "super::test_health::Entity")]
    TestHealth,
    #[sea_orm(has_many = "super::skip_rule::Entity")]
    SkipRules,
}

impl Related<super::test_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestResults.def()
    }
}

impl Related<super::test_health::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestHealth.def()
    }
}

impl Related<super::skip_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SkipRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
