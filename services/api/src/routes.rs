use crate::infra::{AppState, InMemoryNotificationLog, Platform};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use kyc_ai::error::failure_response;
use kyc_ai::workflows::governance::governance_router;
use kyc_ai::workflows::kyc::kyc_router;
use kyc_ai::workflows::loans::{emi_router, loan_router};
use kyc_ai::workflows::notifications::NotificationLog;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DEFAULT_NOTIFICATION_LIMIT: usize = 50;

pub(crate) fn with_workflow_routes(platform: &Platform) -> Router {
    let notifications = Router::new()
        .route("/api/v1/notifications", get(notifications_endpoint))
        .with_state(platform.notifications.clone());

    kyc_router(platform.kyc.clone(), platform.intake.clone())
        .merge(loan_router(platform.loans.clone()))
        .merge(emi_router(platform.reminders.clone()))
        .merge(governance_router(platform.ledger.clone()))
        .merge(notifications)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Deserialize)]
pub(crate) struct NotificationQuery {
    limit: Option<usize>,
}

/// Most recent delivery attempts first.
pub(crate) async fn notifications_endpoint(
    State(log): State<Arc<InMemoryNotificationLog>>,
    Query(query): Query<NotificationQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
    match log.recent(limit) {
        Ok(notifications) => {
            let payload = json!({ "success": true, "notifications": notifications });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => failure_response(StatusCode::INTERNAL_SERVER_ERROR, err),
    }
}
