//! Derived health entity, exactly one row per test case.
//!
//! Fully recomputed and overwritten by the scorer on every ingestion that
//! touches the test; never mutated independently.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_health")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub test_case_id: Uuid,
    pub total_runs: i32,
    pub passed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub flaky_count: i32,
    pub overall_pass_rate: f64,
    pub recent_pass_rate: f64,
    pub overall_flakiness_rate: f64,
    pub recent_flakiness_rate: f64,
    /// recent_pass_rate - overall_pass_rate; negative means regressing.
    pub health_divergence: f64,
    pub avg_duration_ms: f64,
    /// 0-100
    pub health_score: i32,
    /// stable, improving, degrading, critical
    pub trend: String,
    pub consecutive_passes: i32,
    pub consecutive_failures: i32,
    pub last_status: Option<String>,
    pub last_run_id: Option<Uuid>,
    pub last_run_at: Option<DateTimeUtc>,
    pub last_passed_at: Option<DateTimeUtc>,
    pub last_failed_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
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
