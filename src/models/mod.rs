//! Domain models for the test health service.

pub mod health;
pub mod ingest;
pub mod skip_rule;
pub mod status;

// Re-export commonly used types
pub use health::{HealthSnapshot, TestHealthResponse};
pub use ingest::{
    IngestResponse, ReportBatch, ReportedResult, RunCounterDelta, RunMetadata, ShardInfo,
    SourceLocation,
};
pub use skip_rule::{
    CreateSkipRuleRequest, DisabledTest, DisabledTestsResponse, EvaluateDisabledRequest,
    SkipRuleResponse,
};
pub use status::{ResultOutcome, RunStatus, TestStatus, Trend};
