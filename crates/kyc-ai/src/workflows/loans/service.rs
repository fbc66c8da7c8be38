use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::domain::{
    LoanAction, LoanApplication, LoanApplicationId, LoanDecisionRequest, LoanStatus,
    LoanSubmission,
};
use super::emi::{build_schedule, EmiInstallment};
use super::repository::{EmiRepository, LoanRepository};
use super::risk::{debt_to_income_ratio, score_risk, RiskComponent, RiskInputs, RiskRating};
use crate::workflows::governance::{
    AlertSeverity, ComplianceLedger, LedgerError, NewAlert, NewAuditEntry,
};
use crate::workflows::kyc::{KycApplicationId, KycRepository, KycStatus, RepositoryError};
use crate::workflows::notifications::{ContactDetails, NotificationContext, NotificationDispatcher};
use crate::workflows::IdSequence;

const ENTITY: &str = "loan_application";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanAssessmentReport {
    pub application_id: LoanApplicationId,
    pub status: LoanStatus,
    pub debt_to_income_ratio: f64,
    pub risk_score: u32,
    pub risk_rating: RiskRating,
    pub components: Vec<RiskComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
}

/// Loan intake, automated risk assessment, and the assessor decision flow.
pub struct LoanAssessmentService<K, R, E, L> {
    kyc: Arc<K>,
    loans: Arc<R>,
    emis: Arc<E>,
    ledger: Arc<L>,
    notifier: Arc<NotificationDispatcher>,
    loan_ids: IdSequence,
    emi_ids: IdSequence,
}

impl<K, R, E, L> LoanAssessmentService<K, R, E, L>
where
    K: KycRepository + 'static,
    R: LoanRepository + 'static,
    E: EmiRepository + 'static,
    L: ComplianceLedger + 'static,
{
    pub fn new(
        kyc: Arc<K>,
        loans: Arc<R>,
        emis: Arc<E>,
        ledger: Arc<L>,
        notifier: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            kyc,
            loans,
            emis,
            ledger,
            notifier,
            loan_ids: IdSequence::new("loan"),
            emi_ids: IdSequence::new("emi"),
        }
    }

    /// Store an application as a draft against a verified KYC.
    pub fn save_draft(&self, submission: LoanSubmission) -> Result<LoanApplication, LoanServiceError> {
        validate_amounts(&submission)?;
        let applicant = self.verified_contact(&submission.kyc_application_id)?;
        let application = self.build_application(submission, applicant, LoanStatus::Draft);
        let stored = self.loans.insert(application)?;
        self.ledger.append_audit(NewAuditEntry::human(
            &stored.applicant.name,
            "loan_draft_saved",
            ENTITY,
            &stored.id.0,
        ))?;
        Ok(stored)
    }

    /// Create an application directly in `submitted`.
    pub fn submit(&self, submission: LoanSubmission) -> Result<LoanApplication, LoanServiceError> {
        validate_amounts(&submission)?;
        let applicant = self.verified_contact(&submission.kyc_application_id)?;
        let application = self.build_application(submission, applicant, LoanStatus::Submitted);
        let stored = self.loans.insert(application)?;
        self.record_submission(&stored)?;
        Ok(stored)
    }

    /// Promote a draft; the referenced KYC must still be verified.
    pub fn submit_draft(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<LoanApplication, LoanServiceError> {
        let mut application = self.load(application_id)?;
        ensure_transition(&application, LoanStatus::Submitted)?;
        self.verified_contact(&application.kyc_application_id)?;

        application.status = LoanStatus::Submitted;
        application.updated_at = Utc::now();
        self.loans.update(application.clone())?;
        self.record_submission(&application)?;
        Ok(application)
    }

    fn record_submission(&self, application: &LoanApplication) -> Result<(), LoanServiceError> {
        self.ledger.append_audit(
            NewAuditEntry::human(
                &application.applicant.name,
                "loan_submitted",
                ENTITY,
                &application.id.0,
            )
            .with_details(json!({
                "loan_amount": application.loan_amount,
                "debt_to_income_ratio": application.debt_to_income_ratio,
            })),
        )?;
        info!(application_id = %application.id.0, "loan application submitted");
        Ok(())
    }

    /// Run the risk scorer over a submitted application.
    pub fn assess(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<LoanAssessmentReport, LoanServiceError> {
        let mut application = self.load(application_id)?;
        ensure_transition(&application, LoanStatus::UnderAssessment)?;
        application.status = LoanStatus::UnderAssessment;

        let assessment = score_risk(&RiskInputs::from(&application));
        application.debt_to_income_ratio = assessment.debt_to_income_ratio;
        application.ai_risk_score = Some(assessment.score);
        application.ai_risk_rating = Some(assessment.rating);
        application.risk_factors = assessment.factor_codes();
        if assessment.rating == RiskRating::High {
            application.status = LoanStatus::PendingGovernanceReview;
        }
        application.updated_at = Utc::now();
        self.loans.update(application.clone())?;

        self.ledger.append_audit(
            NewAuditEntry::ai("loan_risk_assessed", ENTITY, &application.id.0).with_details(
                json!({
                    "risk_score": assessment.score,
                    "risk_rating": assessment.rating.label(),
                    "risk_factors": application.risk_factors,
                }),
            ),
        )?;

        let alert_id = if assessment.rating == RiskRating::High {
            let alert = self.ledger.raise_alert(NewAlert {
                alert_type: "high_risk_loan".to_string(),
                severity: AlertSeverity::High,
                title: "High risk loan application".to_string(),
                description: format!(
                    "Loan {} scored {} ({})",
                    application.id.0,
                    assessment.score,
                    application.risk_factors.join(", ")
                ),
                kyc_application_id: Some(application.kyc_application_id.clone()),
                loan_application_id: Some(application.id.0.clone()),
                user_id: None,
            })?;
            Some(alert.id)
        } else {
            None
        };

        info!(
            application_id = %application.id.0,
            score = assessment.score,
            rating = assessment.rating.label(),
            "loan risk assessed"
        );

        Ok(LoanAssessmentReport {
            application_id: application.id,
            status: application.status,
            debt_to_income_ratio: assessment.debt_to_income_ratio,
            risk_score: assessment.score,
            risk_rating: assessment.rating,
            components: assessment.components,
            alert_id,
        })
    }

    /// Apply an assessor action. Disbursal generates the EMI schedule.
    pub async fn decide(
        &self,
        application_id: &LoanApplicationId,
        request: LoanDecisionRequest,
    ) -> Result<LoanApplication, LoanServiceError> {
        let assessor = request.assessor.trim();
        if assessor.is_empty() {
            return Err(LoanServiceError::InvalidSubmission(
                "assessor is required".to_string(),
            ));
        }

        let mut application = self.load(application_id)?;
        let target = request.action.target_status();
        ensure_transition(&application, target)?;

        application.status = target;
        application.assessed_by = Some(assessor.to_string());
        if request.notes.is_some() {
            application.assessor_notes = request.notes.clone();
        }

        let mut installments = 0;
        if request.action == LoanAction::Disburse {
            let disbursed_on = request
                .disbursed_on
                .unwrap_or_else(|| Utc::now().date_naive());
            application.disbursed_on = Some(disbursed_on);
            let schedule = build_schedule(&application, disbursed_on, &self.emi_ids);
            installments = schedule.len();
            self.emis.insert_schedule(schedule)?;
        }
        application.updated_at = Utc::now();
        self.loans.update(application.clone())?;

        self.ledger.append_audit(
            NewAuditEntry::human(assessor, request.action.audit_action(), ENTITY, &application.id.0)
                .with_details(json!({
                    "status": target.label(),
                    "notes": request.notes,
                    "installments": installments,
                })),
        )?;
        info!(
            application_id = %application.id.0,
            status = target.label(),
            assessor,
            "loan decision recorded"
        );

        let (subject, body) = decision_message(&application);
        let context = NotificationContext {
            kyc_application_id: Some(application.kyc_application_id.clone()),
            loan_application_id: Some(application.id.0.clone()),
            emi_id: None,
        };
        let delivery = self
            .notifier
            .notify_contact(&application.applicant, subject, &body, context)
            .await;
        if !delivery.failures.is_empty() {
            warn!(
                application_id = %application.id.0,
                failed_channels = delivery.failures.len(),
                "loan notification failed"
            );
        }

        Ok(application)
    }

    pub fn get(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<LoanApplication, LoanServiceError> {
        self.load(application_id)
    }

    pub fn schedule(
        &self,
        application_id: &LoanApplicationId,
    ) -> Result<Vec<EmiInstallment>, LoanServiceError> {
        self.load(application_id)?;
        let installments = self.emis.for_loan(application_id)?;
        if installments.is_empty() {
            return Err(LoanServiceError::ScheduleNotFound(application_id.0.clone()));
        }
        Ok(installments)
    }

    fn load(&self, application_id: &LoanApplicationId) -> Result<LoanApplication, LoanServiceError> {
        self.loans
            .fetch(application_id)?
            .ok_or_else(|| LoanServiceError::NotFound(application_id.0.clone()))
    }

    /// Contact details of the referenced KYC, which must be verified.
    fn verified_contact(&self, kyc_application_id: &str) -> Result<ContactDetails, LoanServiceError> {
        let kyc = self
            .kyc
            .fetch(&KycApplicationId(kyc_application_id.to_string()))?
            .ok_or_else(|| LoanServiceError::KycNotFound(kyc_application_id.to_string()))?;
        if kyc.status != KycStatus::Verified {
            return Err(LoanServiceError::KycNotVerified {
                id: kyc_application_id.to_string(),
                status: kyc.status.label(),
            });
        }
        Ok(kyc.customer)
    }

    fn build_application(
        &self,
        submission: LoanSubmission,
        applicant: ContactDetails,
        status: LoanStatus,
    ) -> LoanApplication {
        let now = Utc::now();
        LoanApplication {
            id: LoanApplicationId(self.loan_ids.next_id()),
            debt_to_income_ratio: debt_to_income_ratio(
                submission.existing_emi,
                submission.credit_card_outstanding,
                submission.monthly_income,
            ),
            kyc_application_id: submission.kyc_application_id,
            applicant,
            loan_type: submission.loan_type,
            loan_amount: submission.loan_amount,
            tenure_months: submission.tenure_months,
            interest_rate: submission.interest_rate,
            monthly_income: submission.monthly_income,
            existing_emi: submission.existing_emi,
            credit_card_outstanding: submission.credit_card_outstanding,
            credit_score: submission.credit_score,
            employment_type: submission.employment_type,
            purpose: submission.purpose,
            status,
            ai_risk_score: None,
            ai_risk_rating: None,
            risk_factors: Vec::new(),
            assessed_by: None,
            assessor_notes: None,
            disbursed_on: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn validate_amounts(submission: &LoanSubmission) -> Result<(), LoanServiceError> {
    let problem = if submission.monthly_income <= 0.0 {
        Some("monthly income must be greater than zero")
    } else if submission.loan_amount <= 0.0 {
        Some("loan amount must be greater than zero")
    } else if submission.tenure_months == 0 {
        Some("tenure must be at least one month")
    } else if submission.interest_rate < 0.0 {
        Some("interest rate cannot be negative")
    } else if submission.existing_emi < 0.0 || submission.credit_card_outstanding < 0.0 {
        Some("existing obligations cannot be negative")
    } else {
        None
    };

    match problem {
        Some(message) => Err(LoanServiceError::InvalidSubmission(message.to_string())),
        None => Ok(()),
    }
}

fn ensure_transition(application: &LoanApplication, next: LoanStatus) -> Result<(), LoanServiceError> {
    if application.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(LoanServiceError::InvalidTransition {
            id: application.id.0.clone(),
            from: application.status.label(),
            to: next.label(),
        })
    }
}

fn decision_message(application: &LoanApplication) -> (&'static str, String) {
    let id = &application.id.0;
    match application.status {
        LoanStatus::Approved => (
            "Loan approved",
            format!("your loan application {id} has been approved."),
        ),
        LoanStatus::Rejected => (
            "Loan application update",
            format!("we are unable to approve your loan application {id} at this time."),
        ),
        LoanStatus::Sanctioned => (
            "Loan sanctioned",
            format!(
                "your loan {id} of {:.2} has been sanctioned.",
                application.loan_amount
            ),
        ),
        LoanStatus::Disbursed => (
            "Loan disbursed",
            format!(
                "your loan {id} of {:.2} has been disbursed. Your EMI schedule is now active.",
                application.loan_amount
            ),
        ),
        other => (
            "Loan application update",
            format!("your loan application {id} is now {}.", other.label()),
        ),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoanServiceError {
    #[error("{0}")]
    InvalidSubmission(String),
    #[error("kyc application {0} not found")]
    KycNotFound(String),
    #[error("kyc application {id} is {status}; a verified KYC is required")]
    KycNotVerified { id: String, status: &'static str },
    #[error("loan application {0} not found")]
    NotFound(String),
    #[error("loan application {0} has no EMI schedule")]
    ScheduleNotFound(String),
    #[error("loan application {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl LoanServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LoanServiceError::InvalidSubmission(_)
            | LoanServiceError::KycNotFound(_)
            | LoanServiceError::KycNotVerified { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            LoanServiceError::NotFound(_)
            | LoanServiceError::ScheduleNotFound(_)
            | LoanServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            LoanServiceError::InvalidTransition { .. }
            | LoanServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            LoanServiceError::Repository(RepositoryError::Unavailable(_))
            | LoanServiceError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
