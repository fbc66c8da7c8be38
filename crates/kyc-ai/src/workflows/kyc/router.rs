use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{KycApplicationId, KycSubmission, ReviewDecision};
use super::intake::{DocumentIntake, IntakeError};
use super::repository::KycRepository;
use super::service::{KycServiceError, KycVerificationService};
use crate::error::failure_response;
use crate::workflows::governance::ComplianceLedger;

const DEFAULT_QUEUE_LIMIT: usize = 50;

/// Router builder exposing document upload, submission, verification and review.
pub fn kyc_router<R, L>(
    service: Arc<KycVerificationService<R, L>>,
    intake: Arc<DocumentIntake>,
) -> Router
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    let upload_limit = intake.max_upload_bytes().saturating_add(1);
    let uploads = Router::new()
        .route("/api/v1/kyc/documents", post(upload_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(intake);

    Router::new()
        .route("/api/v1/kyc/applications", post(submit_handler::<R, L>))
        .route(
            "/api/v1/kyc/applications/export",
            get(export_handler::<R, L>),
        )
        .route(
            "/api/v1/kyc/applications/:application_id",
            get(status_handler::<R, L>),
        )
        .route(
            "/api/v1/kyc/applications/:application_id/verify",
            post(verify_handler::<R, L>),
        )
        .route(
            "/api/v1/kyc/applications/:application_id/review",
            post(review_handler::<R, L>),
        )
        .route(
            "/api/v1/kyc/applications/:application_id/verification-logs",
            get(verification_logs_handler::<R, L>),
        )
        .route("/api/v1/kyc/review-queue", get(queue_handler::<R, L>))
        .with_state(service)
        .merge(uploads)
}

fn service_failure(error: KycServiceError) -> Response {
    failure_response(error.status_code(), error)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadParams {
    file_name: String,
    category: String,
}

pub(crate) async fn upload_handler(
    State(intake): State<Arc<DocumentIntake>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    match intake.accept(&params.file_name, &params.category, body.to_vec()) {
        Ok(stored) => {
            let payload = json!({ "success": true, "document": stored });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error @ IntakeError::TooLarge { .. }) => {
            failure_response(StatusCode::PAYLOAD_TOO_LARGE, error)
        }
        Err(error @ IntakeError::Storage(_)) => {
            failure_response(StatusCode::INTERNAL_SERVER_ERROR, error)
        }
        Err(error) => failure_response(StatusCode::UNPROCESSABLE_ENTITY, error),
    }
}

pub(crate) async fn submit_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
    axum::Json(submission): axum::Json<KycSubmission>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.submit(submission) {
        Ok(application) => {
            let payload = json!({
                "success": true,
                "application": application.status_view(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn status_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.get(&KycApplicationId(application_id)) {
        Ok(application) => {
            let payload = json!({ "success": true, "application": application });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn verify_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.verify(&KycApplicationId(application_id)).await {
        Ok(report) => {
            let payload = json!({ "success": true, "verification": report });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn review_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
    Path(application_id): Path<String>,
    axum::Json(decision): axum::Json<ReviewDecision>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service
        .review(&KycApplicationId(application_id), decision)
        .await
    {
        Ok(application) => {
            let payload = json!({
                "success": true,
                "application": application.status_view(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueParams {
    limit: Option<usize>,
}

pub(crate) async fn queue_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
    Query(params): Query<QueueParams>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    match service.review_queue(limit) {
        Ok(applications) => {
            let views: Vec<_> = applications.iter().map(|app| app.status_view()).collect();
            let payload = json!({ "success": true, "applications": views });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn export_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.export_csv() {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"kyc-applications.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn verification_logs_handler<R, L>(
    State(service): State<Arc<KycVerificationService<R, L>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.verification_logs(&KycApplicationId(application_id)) {
        Ok(logs) => {
            let payload = json!({ "success": true, "logs": logs });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}
