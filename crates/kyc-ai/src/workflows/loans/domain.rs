use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::risk::RiskRating;
use crate::workflows::notifications::ContactDetails;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanApplicationId(pub String);

/// Lifecycle of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Draft,
    Submitted,
    UnderAssessment,
    Approved,
    Rejected,
    PendingGovernanceReview,
    Sanctioned,
    Disbursed,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Draft => "draft",
            LoanStatus::Submitted => "submitted",
            LoanStatus::UnderAssessment => "under_assessment",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::PendingGovernanceReview => "pending_governance_review",
            LoanStatus::Sanctioned => "sanctioned",
            LoanStatus::Disbursed => "disbursed",
        }
    }

    pub const fn can_transition_to(self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, UnderAssessment)
                | (UnderAssessment, Approved)
                | (UnderAssessment, Rejected)
                | (UnderAssessment, PendingGovernanceReview)
                | (PendingGovernanceReview, Approved)
                | (PendingGovernanceReview, Rejected)
                | (Approved, Sanctioned)
                | (Sanctioned, Disbursed)
        )
    }
}

/// Inbound loan request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSubmission {
    pub kyc_application_id: String,
    #[serde(default = "default_loan_type")]
    pub loan_type: String,
    pub loan_amount: f64,
    pub tenure_months: u32,
    /// Annual rate in percent.
    pub interest_rate: f64,
    pub monthly_income: f64,
    #[serde(default)]
    pub existing_emi: f64,
    #[serde(default)]
    pub credit_card_outstanding: f64,
    #[serde(default)]
    pub credit_score: Option<u16>,
    pub employment_type: String,
    #[serde(default)]
    pub purpose: Option<String>,
}

fn default_loan_type() -> String {
    "personal".to_string()
}

/// Stored loan application row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: LoanApplicationId,
    pub kyc_application_id: String,
    pub applicant: ContactDetails,
    pub loan_type: String,
    pub loan_amount: f64,
    pub tenure_months: u32,
    pub interest_rate: f64,
    pub monthly_income: f64,
    pub existing_emi: f64,
    pub credit_card_outstanding: f64,
    pub credit_score: Option<u16>,
    pub employment_type: String,
    pub purpose: Option<String>,
    pub debt_to_income_ratio: f64,
    pub status: LoanStatus,
    pub ai_risk_score: Option<u32>,
    pub ai_risk_rating: Option<RiskRating>,
    pub risk_factors: Vec<String>,
    pub assessed_by: Option<String>,
    pub assessor_notes: Option<String>,
    pub disbursed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    pub fn status_view(&self) -> LoanStatusView {
        LoanStatusView {
            application_id: self.id.clone(),
            applicant_name: self.applicant.name.clone(),
            loan_amount: self.loan_amount,
            status: self.status.label(),
            debt_to_income_ratio: self.debt_to_income_ratio,
            ai_risk_score: self.ai_risk_score,
            ai_risk_rating: self.ai_risk_rating.map(RiskRating::label),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoanStatusView {
    pub application_id: LoanApplicationId,
    pub applicant_name: String,
    pub loan_amount: f64,
    pub status: &'static str,
    pub debt_to_income_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_risk_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_risk_rating: Option<&'static str>,
}

/// Assessor actions after the automated risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanAction {
    Approve,
    Reject,
    Sanction,
    Disburse,
}

impl LoanAction {
    pub const fn target_status(self) -> LoanStatus {
        match self {
            LoanAction::Approve => LoanStatus::Approved,
            LoanAction::Reject => LoanStatus::Rejected,
            LoanAction::Sanction => LoanStatus::Sanctioned,
            LoanAction::Disburse => LoanStatus::Disbursed,
        }
    }

    pub const fn audit_action(self) -> &'static str {
        match self {
            LoanAction::Approve => "loan_approved",
            LoanAction::Reject => "loan_rejected",
            LoanAction::Sanction => "loan_sanctioned",
            LoanAction::Disburse => "loan_disbursed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDecisionRequest {
    pub assessor: String,
    pub action: LoanAction,
    #[serde(default)]
    pub notes: Option<String>,
    /// Disbursal date; defaults to today.
    #[serde(default)]
    pub disbursed_on: Option<NaiveDate>,
}
