use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::loans::{emi_router, loan_router, EmiReminderScheduler};
use crate::workflows::test_support::read_json_body;

fn app(harness: LoanHarness) -> Router {
    let scheduler = Arc::new(EmiReminderScheduler::new(
        harness.emis.clone(),
        harness.dispatcher.clone(),
    ));
    loan_router(Arc::new(harness.service)).merge(emi_router(scheduler))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn bare(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn loan_body(kyc_application_id: &str) -> Value {
    json!({
        "kyc_application_id": kyc_application_id,
        "loan_amount": 2_400_000.0,
        "tenure_months": 36,
        "interest_rate": 11.5,
        "monthly_income": 50_000.0,
        "existing_emi": 25_000.0,
        "credit_card_outstanding": 5_000.0,
        "credit_score": 600,
        "employment_type": "Self Employed"
    })
}

#[tokio::test]
async fn submit_and_assess_over_http() {
    let app = app(loan_harness());

    let created = app
        .clone()
        .oneshot(post_json("/api/v1/loans", loan_body(VERIFIED_KYC)))
        .await
        .expect("router responds");
    assert_eq!(created.status(), StatusCode::CREATED);
    let payload = read_json_body(created).await;
    assert_eq!(payload["loan"]["application_id"], json!("loan-000001"));
    assert_eq!(payload["loan"]["status"], json!("submitted"));
    assert_eq!(payload["loan"]["debt_to_income_ratio"], json!(60.0));

    let assessed = app
        .oneshot(bare("POST", "/api/v1/loans/loan-000001/assess"))
        .await
        .expect("router responds");
    assert_eq!(assessed.status(), StatusCode::OK);
    let payload = read_json_body(assessed).await;
    assert_eq!(payload["assessment"]["risk_score"], json!(85));
    assert_eq!(payload["assessment"]["risk_rating"], json!("high"));
    assert_eq!(
        payload["assessment"]["status"],
        json!("pending_governance_review")
    );
}

#[tokio::test]
async fn unverified_kyc_is_unprocessable() {
    let app = app(loan_harness());

    let response = app
        .oneshot(post_json("/api/v1/loans", loan_body(PENDING_KYC)))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert_eq!(
        payload["error"],
        json!("kyc application kyc-000200 is pending; a verified KYC is required")
    );
}

#[tokio::test]
async fn draft_is_promoted_through_submit_route() {
    let app = app(loan_harness());

    let draft = app
        .clone()
        .oneshot(post_json("/api/v1/loans/drafts", loan_body(VERIFIED_KYC)))
        .await
        .expect("router responds");
    assert_eq!(draft.status(), StatusCode::CREATED);
    let payload = read_json_body(draft).await;
    assert_eq!(payload["loan"]["status"], json!("draft"));

    let submitted = app
        .oneshot(bare("POST", "/api/v1/loans/loan-000001/submit"))
        .await
        .expect("router responds");
    assert_eq!(submitted.status(), StatusCode::OK);
    let payload = read_json_body(submitted).await;
    assert_eq!(payload["loan"]["status"], json!("submitted"));
}

#[tokio::test]
async fn out_of_order_decision_conflicts() {
    let app = app(loan_harness());
    app.clone()
        .oneshot(post_json("/api/v1/loans", loan_body(VERIFIED_KYC)))
        .await
        .expect("router responds");

    let response = app
        .oneshot(post_json(
            "/api/v1/loans/loan-000001/decision",
            json!({ "assessor": "credit-officer-3", "action": "disburse" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let app = app(loan_harness());

    let response = app
        .oneshot(bare("GET", "/api/v1/loans/loan-999999/schedule"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schedule_of_a_submitted_loan_is_not_found() {
    let app = app(loan_harness());
    app.clone()
        .oneshot(post_json("/api/v1/loans", loan_body(VERIFIED_KYC)))
        .await
        .expect("router responds");

    let response = app
        .oneshot(bare("GET", "/api/v1/loans/loan-000001/schedule"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert_eq!(
        payload["error"],
        json!("loan application loan-000001 has no EMI schedule")
    );
}

#[tokio::test]
async fn reminder_sweep_returns_its_report() {
    let app = app(loan_harness());

    let response = app
        .oneshot(bare("POST", "/api/v1/emi/reminders/run?today=2026-03-01"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload,
        json!({
            "success": true,
            "reminders_sent": 0,
            "overdue_notices": 0,
            "errors": []
        })
    );
}
