use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::domain::{LoanApplicationId, LoanDecisionRequest, LoanSubmission};
use super::reminders::EmiReminderScheduler;
use super::repository::{EmiRepository, LoanRepository};
use super::service::{LoanAssessmentService, LoanServiceError};
use crate::error::failure_response;
use crate::workflows::governance::ComplianceLedger;
use crate::workflows::kyc::KycRepository;

type SharedService<K, R, E, L> = Arc<LoanAssessmentService<K, R, E, L>>;

/// Router exposing loan intake, assessment and assessor decisions.
pub fn loan_router<K, R, E, L>(service: SharedService<K, R, E, L>) -> Router
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    Router::new()
        .route("/api/v1/loans", post(submit_handler::<K, R, E, L>))
        .route("/api/v1/loans/drafts", post(draft_handler::<K, R, E, L>))
        .route("/api/v1/loans/:loan_id", get(status_handler::<K, R, E, L>))
        .route(
            "/api/v1/loans/:loan_id/submit",
            post(submit_draft_handler::<K, R, E, L>),
        )
        .route(
            "/api/v1/loans/:loan_id/assess",
            post(assess_handler::<K, R, E, L>),
        )
        .route(
            "/api/v1/loans/:loan_id/decision",
            post(decision_handler::<K, R, E, L>),
        )
        .route(
            "/api/v1/loans/:loan_id/schedule",
            get(schedule_handler::<K, R, E, L>),
        )
        .with_state(service)
}

/// Router exposing the externally triggered EMI reminder sweep.
pub fn emi_router<E>(scheduler: Arc<EmiReminderScheduler<E>>) -> Router
where
    E: EmiRepository + 'static,
{
    Router::new()
        .route("/api/v1/emi/reminders/run", post(reminders_handler::<E>))
        .with_state(scheduler)
}

fn service_failure(error: LoanServiceError) -> Response {
    failure_response(error.status_code(), error)
}

pub(crate) async fn submit_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    axum::Json(submission): axum::Json<LoanSubmission>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.submit(submission) {
        Ok(application) => {
            let payload = json!({ "success": true, "loan": application.status_view() });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn draft_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    axum::Json(submission): axum::Json<LoanSubmission>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.save_draft(submission) {
        Ok(application) => {
            let payload = json!({ "success": true, "loan": application.status_view() });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn status_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    Path(loan_id): Path<String>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.get(&LoanApplicationId(loan_id)) {
        Ok(application) => {
            let payload = json!({ "success": true, "loan": application });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn submit_draft_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    Path(loan_id): Path<String>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.submit_draft(&LoanApplicationId(loan_id)) {
        Ok(application) => {
            let payload = json!({ "success": true, "loan": application.status_view() });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn assess_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    Path(loan_id): Path<String>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.assess(&LoanApplicationId(loan_id)) {
        Ok(report) => {
            let payload = json!({ "success": true, "assessment": report });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn decision_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    Path(loan_id): Path<String>,
    axum::Json(request): axum::Json<LoanDecisionRequest>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.decide(&LoanApplicationId(loan_id), request).await {
        Ok(application) => {
            let payload = json!({ "success": true, "loan": application.status_view() });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

pub(crate) async fn schedule_handler<K, R, E, L>(
    State(service): State<SharedService<K, R, E, L>>,
    Path(loan_id): Path<String>,
) -> Response
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    match service.schedule(&LoanApplicationId(loan_id)) {
        Ok(installments) => {
            let payload = json!({ "success": true, "installments": installments });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_failure(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SweepParams {
    today: Option<NaiveDate>,
}

pub(crate) async fn reminders_handler<E>(
    State(scheduler): State<Arc<EmiReminderScheduler<E>>>,
    Query(params): Query<SweepParams>,
) -> Response
where
    E: EmiRepository + 'static,
{
    let today = params.today.unwrap_or_else(|| Utc::now().date_naive());
    let report = scheduler.run(today).await;
    (StatusCode::OK, axum::Json(report)).into_response()
}
