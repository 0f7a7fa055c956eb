//! Run entity representing one CI execution.
//!
//! A run is identified by a caller-supplied external id. Sharded reporting
//! may hit the same run several times; counters accumulate additively.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub external_id: String,
    pub repository: String,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub ci_job_url: Option<String>,
    pub base_url: Option<String>,
    pub shard_current: Option<i32>,
    pub shard_total: Option<i32>,
    /// running, passed, failed, interrupted
    pub status: String,
    pub start_time: DateTimeUtc,
    pub end_time: Option<DateTimeUtc>,
    /// Count of final-attempt results reported into this run.
    pub total_tests: i32,
    pub passed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub flaky_count: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_result::Entity")]
    TestResults,
}

impl Related<super::test_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
