//! Loan intake, risk assessment, disbursal and EMI reminders.

pub mod domain;
pub mod emi;
pub mod reminders;
pub mod repository;
pub mod risk;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    LoanAction, LoanApplication, LoanApplicationId, LoanDecisionRequest, LoanStatus,
    LoanStatusView, LoanSubmission,
};
pub use emi::{build_schedule, monthly_installment, EmiInstallment, EmiStatus, ReminderHorizon};
pub use reminders::{EmiReminderScheduler, ReminderSweepReport};
pub use repository::{EmiRepository, LoanRepository};
pub use risk::{score_risk, RiskAssessment, RiskFactor, RiskInputs, RiskRating};
pub use router::{emi_router, loan_router};
pub use service::{LoanAssessmentReport, LoanAssessmentService, LoanServiceError};
