//! Disablement evaluation endpoint.

use actix_web::{HttpResponse, web};
use tracing::debug;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{DisabledTestsResponse, EvaluateDisabledRequest};
use crate::services::disablement;

/// Evaluate which tests are disabled for a runtime context.
///
/// The response maps test keys to the first skip rule that matched; tests
/// with no matching rule are absent and should be run.
#[utoipa::path(
    post,
    path = "/api/v1/tests/disabled",
    tag = "Disablement",
    request_body = EvaluateDisabledRequest,
    responses(
        (status = 200, description = "Disabled tests for the context", body = DisabledTestsResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn evaluate_disabled(
    pool: web::Data<DbPool>,
    body: web::Json<EvaluateDisabledRequest>,
) -> AppResult<HttpResponse> {
    let request = body.into_inner();
    let response = disablement::evaluate_disabled(pool.connection(), &request).await?;
    debug!(
        disabled = response.disabled_tests.len(),
        branch = request.branch.as_deref().unwrap_or("-"),
        "evaluated disablement"
    );
    Ok(HttpResponse::Ok().json(response))
}

/// Configure disablement routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/tests/disabled").route(web::post().to(evaluate_disabled)));
}
