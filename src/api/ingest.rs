//! Result ingestion endpoint.

use actix_web::{HttpResponse, web};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{IngestResponse, ReportBatch};
use crate::services::ingest;

/// Ingest a batch of test results for a run.
///
/// The run is created on first sight of its external id; later batches for
/// the same run (shards, retries on another worker) accumulate onto it.
/// The whole batch is applied in one transaction and health snapshots are
/// recomputed for every test the batch touched.
#[utoipa::path(
    post,
    path = "/api/v1/ingest",
    tag = "Ingest",
    request_body = ReportBatch,
    responses(
        (status = 200, description = "Batch ingested", body = IngestResponse),
        (status = 400, description = "Invalid batch", body = crate::error::ErrorResponse)
    )
)]
pub async fn ingest(
    pool: web::Data<DbPool>,
    scoring: web::Data<ScoringConfig>,
    body: web::Json<ReportBatch>,
) -> AppResult<HttpResponse> {
    let batch = body.into_inner();
    debug!(
        run_external_id = %batch.run_external_id,
        results = batch.results.len(),
        "received report batch"
    );

    let response = ingest::ingest_batch(pool.connection(), &scoring, batch).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Configure ingest routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ingest").route(web::post().to(ingest)));
}
