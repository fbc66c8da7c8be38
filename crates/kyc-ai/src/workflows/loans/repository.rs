use chrono::NaiveDate;

use super::domain::{LoanApplication, LoanApplicationId};
use super::emi::EmiInstallment;
use crate::workflows::kyc::RepositoryError;

pub trait LoanRepository: Send + Sync {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError>;
    fn update(&self, application: LoanApplication) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &LoanApplicationId) -> Result<Option<LoanApplication>, RepositoryError>;
}

/// Installment storage queried by the reminder sweep.
pub trait EmiRepository: Send + Sync {
    fn insert_schedule(&self, installments: Vec<EmiInstallment>) -> Result<(), RepositoryError>;
    fn update(&self, installment: EmiInstallment) -> Result<(), RepositoryError>;
    fn for_loan(&self, loan_id: &LoanApplicationId) -> Result<Vec<EmiInstallment>, RepositoryError>;
    /// Upcoming installments due exactly on `date`.
    fn upcoming_due_on(&self, date: NaiveDate) -> Result<Vec<EmiInstallment>, RepositoryError>;
    /// Upcoming installments due strictly before `today`.
    fn upcoming_overdue(&self, today: NaiveDate) -> Result<Vec<EmiInstallment>, RepositoryError>;
}
