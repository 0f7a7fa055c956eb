//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Test Health Server",
        description = "Service for ingesting CI test results, scoring per-test health, and evaluating skip rules for runtime disablement"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Ingest
        api::ingest::ingest,
        // Disablement
        api::disablement::evaluate_disabled,
        // Test health
        api::test_health::get_test_health,
        // Skip rules
        api::skip_rules::create_skip_rule,
        api::skip_rules::list_skip_rules,
        api::skip_rules::delete_skip_rule,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Ingest
            models::ReportBatch,
            models::RunMetadata,
            models::ShardInfo,
            models::SourceLocation,
            models::ReportedResult,
            models::IngestResponse,
            models::TestStatus,
            models::ResultOutcome,
            models::RunStatus,
            // Test health
            models::TestHealthResponse,
            models::Trend,
            // Disablement and skip rules
            models::EvaluateDisabledRequest,
            models::DisabledTest,
            models::DisabledTestsResponse,
            models::CreateSkipRuleRequest,
            models::SkipRuleResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Ingest", description = "Test result ingestion"),
        (name = "Test Health", description = "Per-test health snapshots"),
        (name = "Disablement", description = "Runtime disablement evaluation"),
        (name = "Skip Rules", description = "Skip rule management")
    )
)]
pub struct ApiDoc;
