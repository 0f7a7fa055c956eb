//! Skip rule entity.
//!
//! A condition under which a test is treated as disabled. Patterns use the
//! restricted glob syntax from `services::glob`. Evaluation order across a
//! test's rules is creation order (created_at, then id).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "skip_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub test_case_id: Uuid,
    /// Glob matched against the runner's branch; NULL means any branch.
    pub branch_pattern: Option<String>,
    /// Glob matched against the host of the runner's base URL; NULL means any host.
    pub env_pattern: Option<String>,
    pub reason: String,
    pub created_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
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
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
