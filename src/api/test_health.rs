//! Test health query endpoint.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::TestHealthResponse;

/// Get the health snapshot for a test.
///
/// 404 until at least one final-attempt result has been ingested for it.
#[utoipa::path(
    get,
    path = "/api/v1/tests/{test_id}/health",
    tag = "Test Health",
    params(
        ("test_id" = Uuid, Path, description = "Test case UUID")
    ),
    responses(
        (status = 200, description = "Health snapshot", body = TestHealthResponse),
        (status = 404, description = "Unknown test or no health data yet", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_test_health(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let test_id = path.into_inner();
    let conn = pool.connection();

    let health = db::health::get_by_test_case_id(conn, test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Health data for test {test_id}")))?;

    Ok(HttpResponse::Ok().json(TestHealthResponse::from(health)))
}

/// Configure test health routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/tests/{test_id}/health").route(web::get().to(get_test_health)));
}
