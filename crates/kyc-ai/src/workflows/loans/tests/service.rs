use axum::http::StatusCode;

use super::common::*;
use crate::workflows::governance::{AlertSeverity, ComplianceLedger};
use crate::workflows::kyc::{KycApplicationId, KycStatus};
use crate::workflows::loans::{
    LoanAction, LoanApplicationId, LoanDecisionRequest, LoanServiceError, LoanStatus, RiskRating,
};

fn decision(action: LoanAction) -> LoanDecisionRequest {
    LoanDecisionRequest {
        assessor: "credit-officer-3".to_string(),
        action,
        notes: None,
        disbursed_on: None,
    }
}

#[test]
fn submission_requires_a_verified_kyc() {
    let harness = loan_harness();

    let mut pending = low_risk_submission();
    pending.kyc_application_id = PENDING_KYC.to_string();
    let error = harness.service.submit(pending).expect_err("pending kyc");
    assert!(matches!(
        error,
        LoanServiceError::KycNotVerified { status: "pending", .. }
    ));
    assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut missing = low_risk_submission();
    missing.kyc_application_id = "kyc-999999".to_string();
    assert!(matches!(
        harness.service.submit(missing),
        Err(LoanServiceError::KycNotFound(_))
    ));
}

#[test]
fn submission_records_dti_and_an_audit_row() {
    let harness = loan_harness();

    let loan = harness
        .service
        .submit(low_risk_submission())
        .expect("submitted");

    assert_eq!(loan.id.0, "loan-000001");
    assert_eq!(loan.status, LoanStatus::Submitted);
    assert_eq!(loan.debt_to_income_ratio, 10.0);
    assert_eq!(loan.applicant.name, "Priya Sharma");
    let audits = harness.ledger.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].action, "loan_submitted");
}

#[test]
fn non_positive_amounts_are_rejected() {
    let harness = loan_harness();

    let mut no_income = low_risk_submission();
    no_income.monthly_income = 0.0;
    let mut no_tenure = low_risk_submission();
    no_tenure.tenure_months = 0;

    for submission in [no_income, no_tenure] {
        assert!(matches!(
            harness.service.submit(submission),
            Err(LoanServiceError::InvalidSubmission(_))
        ));
    }
    assert!(harness.ledger.audits().is_empty());
}

#[test]
fn high_risk_assessment_escalates_to_governance() {
    let harness = loan_harness();
    let loan = harness
        .service
        .submit(high_risk_submission())
        .expect("submitted");

    let report = harness.service.assess(&loan.id).expect("assessed");

    assert_eq!(report.risk_score, 85);
    assert_eq!(report.risk_rating, RiskRating::High);
    assert_eq!(report.debt_to_income_ratio, 60.0);
    assert_eq!(report.status, LoanStatus::PendingGovernanceReview);
    assert_eq!(report.components.len(), 4);

    let alerts = harness.ledger.all_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::High);
    assert_eq!(alerts[0].alert_type, "high_risk_loan");
    assert_eq!(alerts[0].loan_application_id.as_deref(), Some("loan-000001"));
    assert_eq!(report.alert_id.as_deref(), Some(alerts[0].id.as_str()));

    let stored = harness.service.get(&loan.id).expect("stored");
    assert_eq!(stored.ai_risk_score, Some(85));
    assert_eq!(
        stored.risk_factors,
        vec![
            "high_debt_to_income_ratio",
            "low_credit_score",
            "self_employed",
            "high_loan_to_income_ratio",
        ]
    );

    let assessed = harness
        .ledger
        .audit_trail(&loan.id.0)
        .expect("trail")
        .into_iter()
        .find(|row| row.action == "loan_risk_assessed")
        .expect("assessment audit");
    assert!(assessed.is_ai_action);
}

#[test]
fn moderate_risk_stays_with_the_assessor() {
    let harness = loan_harness();
    let mut submission = low_risk_submission();
    submission.existing_emi = 45_000.0;
    submission.credit_score = Some(680);
    let loan = harness.service.submit(submission).expect("submitted");

    let report = harness.service.assess(&loan.id).expect("assessed");

    assert_eq!(report.risk_score, 25);
    assert_eq!(report.risk_rating, RiskRating::Medium);
    assert_eq!(report.status, LoanStatus::UnderAssessment);
    assert!(report.alert_id.is_none());
    assert!(harness.ledger.all_alerts().is_empty());
}

#[test]
fn drafts_require_a_verified_kyc() {
    let harness = loan_harness();
    let mut pending = low_risk_submission();
    pending.kyc_application_id = PENDING_KYC.to_string();

    let error = harness.service.save_draft(pending).expect_err("pending kyc");
    assert!(matches!(
        error,
        LoanServiceError::KycNotVerified { status: "pending", .. }
    ));
    assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(harness.ledger.audits().is_empty());

    let draft = harness
        .service
        .save_draft(low_risk_submission())
        .expect("draft saved");
    assert_eq!(draft.status, LoanStatus::Draft);

    let submitted = harness.service.submit_draft(&draft.id).expect("promoted");
    assert_eq!(submitted.status, LoanStatus::Submitted);

    let error = harness
        .service
        .submit_draft(&draft.id)
        .expect_err("already submitted");
    assert_eq!(error.status_code(), StatusCode::CONFLICT);

    let actions: Vec<String> = harness
        .ledger
        .audit_trail(&draft.id.0)
        .expect("trail")
        .into_iter()
        .map(|row| row.action)
        .collect();
    assert_eq!(actions, vec!["loan_draft_saved", "loan_submitted"]);
}

#[test]
fn draft_cannot_be_submitted_after_kyc_is_withdrawn() {
    let harness = loan_harness();
    let draft = harness
        .service
        .save_draft(low_risk_submission())
        .expect("draft saved");
    harness.kyc.set_status(
        &KycApplicationId(VERIFIED_KYC.to_string()),
        KycStatus::Rejected,
    );

    assert!(matches!(
        harness.service.submit_draft(&draft.id),
        Err(LoanServiceError::KycNotVerified { status: "rejected", .. })
    ));
    assert_eq!(
        harness.service.get(&draft.id).expect("stored").status,
        LoanStatus::Draft
    );
}

#[tokio::test]
async fn decisions_follow_the_lifecycle() {
    let harness = loan_harness();
    let loan = harness
        .service
        .submit(low_risk_submission())
        .expect("submitted");

    let early = harness
        .service
        .decide(&loan.id, decision(LoanAction::Approve))
        .await
        .expect_err("not assessed yet");
    assert!(matches!(
        early,
        LoanServiceError::InvalidTransition {
            from: "submitted",
            to: "approved",
            ..
        }
    ));
    assert_eq!(early.status_code(), StatusCode::CONFLICT);

    let mut anonymous = decision(LoanAction::Approve);
    anonymous.assessor = " ".to_string();
    assert!(matches!(
        harness.service.decide(&loan.id, anonymous).await,
        Err(LoanServiceError::InvalidSubmission(_))
    ));

    harness.service.assess(&loan.id).expect("assessed");
    let approved = harness
        .service
        .decide(&loan.id, decision(LoanAction::Approve))
        .await
        .expect("approved");
    assert_eq!(approved.status, LoanStatus::Approved);
    assert_eq!(approved.assessed_by.as_deref(), Some("credit-officer-3"));

    let rows = harness.notifications.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].subject, "Loan approved");
}

#[tokio::test]
async fn disbursal_generates_the_emi_schedule() {
    let harness = loan_harness();
    let loan = harness
        .service
        .submit(low_risk_submission())
        .expect("submitted");
    harness.service.assess(&loan.id).expect("assessed");
    for action in [LoanAction::Approve, LoanAction::Sanction] {
        harness
            .service
            .decide(&loan.id, decision(action))
            .await
            .expect("decision applied");
    }

    let mut disburse = decision(LoanAction::Disburse);
    disburse.disbursed_on = Some(date("2026-01-15"));
    let disbursed = harness
        .service
        .decide(&loan.id, disburse)
        .await
        .expect("disbursed");
    assert_eq!(disbursed.status, LoanStatus::Disbursed);
    assert_eq!(disbursed.disbursed_on, Some(date("2026-01-15")));

    let schedule = harness.service.schedule(&loan.id).expect("schedule");
    assert_eq!(schedule.len(), 12);
    assert_eq!(schedule[0].due_date, date("2026-02-15"));
    assert_eq!(schedule[0].amount, 8884.88);
    assert_eq!(schedule[0].interest_component, 1000.0);
    assert_eq!(schedule[11].due_date, date("2027-01-15"));
    let principal: f64 = schedule.iter().map(|row| row.principal_component).sum();
    assert!((principal - 100_000.0).abs() < 0.01);

    assert!(matches!(
        harness
            .service
            .decide(&loan.id, decision(LoanAction::Disburse))
            .await,
        Err(LoanServiceError::InvalidTransition { .. })
    ));
}

#[test]
fn unknown_loans_are_not_found() {
    let harness = loan_harness();
    let missing = LoanApplicationId("loan-424242".to_string());

    let error = harness.service.assess(&missing).expect_err("missing");
    assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    assert!(matches!(
        harness.service.schedule(&missing),
        Err(LoanServiceError::NotFound(_))
    ));
}

#[test]
fn undisbursed_loan_has_no_schedule() {
    let harness = loan_harness();
    let loan = harness
        .service
        .submit(low_risk_submission())
        .expect("submitted");

    let error = harness.service.schedule(&loan.id).expect_err("no schedule yet");
    assert!(matches!(error, LoanServiceError::ScheduleNotFound(_)));
    assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
}
