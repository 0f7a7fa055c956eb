//! Skip rule management endpoints.

use actix_web::{HttpResponse, web};
use tracing::info;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{CreateSkipRuleRequest, SkipRuleResponse};
use crate::services::glob::GlobPattern;

/// Validate a create request before it reaches the database.
///
/// Patterns are compiled here so a rule that can never match is rejected
/// at creation instead of silently evaluating to false later.
fn validate_request(request: &CreateSkipRuleRequest) -> AppResult<()> {
    if request.reason.trim().is_empty() {
        return Err(AppError::InvalidInput("reason is required".to_string()));
    }

    if let Some(ref pattern) = request.branch_pattern {
        GlobPattern::new(pattern)
            .map_err(|e| AppError::InvalidInput(format!("Invalid branch pattern: {e}")))?;
    }
    if let Some(ref pattern) = request.env_pattern {
        GlobPattern::new(pattern)
            .map_err(|e| AppError::InvalidInput(format!("Invalid environment pattern: {e}")))?;
    }

    Ok(())
}

/// Create a skip rule for a test.
#[utoipa::path(
    post,
    path = "/api/v1/tests/{test_id}/skip-rules",
    tag = "Skip Rules",
    params(
        ("test_id" = Uuid, Path, description = "Test case UUID")
    ),
    request_body = CreateSkipRuleRequest,
    responses(
        (status = 201, description = "Rule created", body = SkipRuleResponse),
        (status = 400, description = "Invalid rule", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown test", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_skip_rule(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    body: web::Json<CreateSkipRuleRequest>,
) -> AppResult<HttpResponse> {
    let test_id = path.into_inner();
    let request = body.into_inner();
    validate_request(&request)?;

    let conn = pool.connection();
    let test = db::test_cases::get_by_id(conn, test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test {test_id}")))?;

    let rule = db::skip_rules::insert_rule(conn, test.id, &request).await?;
    info!(
        rule_id = %rule.id,
        test_id = %test.id,
        branch_pattern = rule.branch_pattern.as_deref().unwrap_or("-"),
        env_pattern = rule.env_pattern.as_deref().unwrap_or("-"),
        "skip rule created"
    );

    Ok(HttpResponse::Created().json(SkipRuleResponse::from(rule)))
}

/// List the active skip rules for a test, in evaluation order.
#[utoipa::path(
    get,
    path = "/api/v1/tests/{test_id}/skip-rules",
    tag = "Skip Rules",
    params(
        ("test_id" = Uuid, Path, description = "Test case UUID")
    ),
    responses(
        (status = 200, description = "Active rules", body = Vec<SkipRuleResponse>),
        (status = 404, description = "Unknown test", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_skip_rules(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let test_id = path.into_inner();
    let conn = pool.connection();

    let test = db::test_cases::get_by_id(conn, test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test {test_id}")))?;

    let rules = db::skip_rules::active_rules_for_test(conn, test.id).await?;
    let response: Vec<SkipRuleResponse> = rules.into_iter().map(SkipRuleResponse::from).collect();

    Ok(HttpResponse::Ok().json(response))
}

/// Soft-delete a skip rule.
#[utoipa::path(
    delete,
    path = "/api/v1/skip-rules/{rule_id}",
    tag = "Skip Rules",
    params(
        ("rule_id" = Uuid, Path, description = "Skip rule UUID")
    ),
    responses(
        (status = 200, description = "Rule deleted", body = SkipRuleResponse),
        (status = 404, description = "Unknown or already deleted rule", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_skip_rule(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let rule_id = path.into_inner();

    let rule = db::skip_rules::soft_delete_rule(pool.connection(), rule_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Skip rule {rule_id}")))?;

    info!(rule_id = %rule.id, test_id = %rule.test_case_id, "skip rule deleted");
    Ok(HttpResponse::Ok().json(SkipRuleResponse::from(rule)))
}

/// Configure skip rule routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/tests/{test_id}/skip-rules")
            .route(web::post().to(create_skip_rule))
            .route(web::get().to(list_skip_rules)),
    )
    .service(web::resource("/skip-rules/{rule_id}").route(web::delete().to(delete_skip_rule)));
}
