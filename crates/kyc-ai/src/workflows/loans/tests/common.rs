use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};

use crate::workflows::kyc::{
    KycApplication, KycApplicationId, KycRepository, KycStatus, RepositoryError,
};
use crate::workflows::loans::{
    EmiInstallment, EmiRepository, EmiStatus, LoanApplication, LoanApplicationId,
    LoanAssessmentService, LoanRepository, LoanSubmission,
};
use crate::workflows::notifications::{
    ContactDetails, NotificationDispatcher, NotificationPreferences,
};
use crate::workflows::test_support::{
    mock_dispatcher, MemoryKycRepository, MemoryLedger, MemoryNotificationLog,
};

#[derive(Default)]
pub(super) struct MemoryLoanRepository {
    records: Mutex<BTreeMap<LoanApplicationId, LoanApplication>>,
}

impl LoanRepository for MemoryLoanRepository {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("loan mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: LoanApplication) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("loan mutex poisoned");
        guard.insert(application.id.clone(), application);
        Ok(())
    }

    fn fetch(&self, id: &LoanApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("loan mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryEmiRepository {
    rows: Mutex<BTreeMap<String, EmiInstallment>>,
}

impl MemoryEmiRepository {
    pub(super) fn mark_paid(&self, id: &str) {
        let mut guard = self.rows.lock().expect("emi mutex poisoned");
        if let Some(row) = guard.get_mut(id) {
            row.status = EmiStatus::Paid;
        }
    }

    fn matching(&self, keep: impl Fn(&EmiInstallment) -> bool) -> Vec<EmiInstallment> {
        let guard = self.rows.lock().expect("emi mutex poisoned");
        guard
            .values()
            .filter(|row| row.status == EmiStatus::Upcoming && keep(row))
            .cloned()
            .collect()
    }
}

impl EmiRepository for MemoryEmiRepository {
    fn insert_schedule(&self, installments: Vec<EmiInstallment>) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("emi mutex poisoned");
        for row in installments {
            guard.insert(row.id.clone(), row);
        }
        Ok(())
    }

    fn update(&self, installment: EmiInstallment) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("emi mutex poisoned");
        if !guard.contains_key(&installment.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(installment.id.clone(), installment);
        Ok(())
    }

    fn for_loan(&self, loan_id: &LoanApplicationId) -> Result<Vec<EmiInstallment>, RepositoryError> {
        let guard = self.rows.lock().expect("emi mutex poisoned");
        let mut rows: Vec<_> = guard
            .values()
            .filter(|row| &row.loan_application_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.installment_number);
        Ok(rows)
    }

    fn upcoming_due_on(&self, date: NaiveDate) -> Result<Vec<EmiInstallment>, RepositoryError> {
        Ok(self.matching(|row| row.due_date == date))
    }

    fn upcoming_overdue(&self, today: NaiveDate) -> Result<Vec<EmiInstallment>, RepositoryError> {
        Ok(self.matching(|row| row.due_date < today))
    }
}

pub(super) type TestLoanService =
    LoanAssessmentService<MemoryKycRepository, MemoryLoanRepository, MemoryEmiRepository, MemoryLedger>;

pub(super) struct LoanHarness {
    pub(super) service: TestLoanService,
    pub(super) kyc: Arc<MemoryKycRepository>,
    pub(super) emis: Arc<MemoryEmiRepository>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) notifications: Arc<MemoryNotificationLog>,
    pub(super) dispatcher: Arc<NotificationDispatcher>,
}

pub(super) const VERIFIED_KYC: &str = "kyc-000100";
pub(super) const PENDING_KYC: &str = "kyc-000200";

pub(super) fn email_only() -> NotificationPreferences {
    NotificationPreferences {
        email: true,
        sms: false,
        voice: false,
    }
}

fn kyc_record(id: &str, status: KycStatus) -> KycApplication {
    let now = Utc::now();
    KycApplication {
        id: KycApplicationId(id.to_string()),
        customer: ContactDetails {
            name: "Priya Sharma".to_string(),
            email: Some("priya@example.com".to_string()),
            phone: Some("+919800000002".to_string()),
            preferences: email_only(),
        },
        date_of_birth: Some("1988-03-12".to_string()),
        address: Some("7 Park Street, Kolkata 700016".to_string()),
        identity_document: None,
        address_document: None,
        pan_document: None,
        status,
        ai_confidence_score: Some(100.0),
        ai_verification_status: None,
        ai_risk_flags: Vec::new(),
        reviewed_by: None,
        reviewer_notes: None,
        created_at: now,
        updated_at: now,
    }
}

pub(super) fn loan_harness() -> LoanHarness {
    let (dispatcher, notifications) = mock_dispatcher();
    loan_harness_with(dispatcher, notifications)
}

pub(super) fn loan_harness_with(
    dispatcher: Arc<NotificationDispatcher>,
    notifications: Arc<MemoryNotificationLog>,
) -> LoanHarness {
    let kyc = Arc::new(MemoryKycRepository::default());
    kyc.insert(kyc_record(VERIFIED_KYC, KycStatus::Verified))
        .expect("seed verified kyc");
    kyc.insert(kyc_record(PENDING_KYC, KycStatus::Pending))
        .expect("seed pending kyc");

    let loans = Arc::new(MemoryLoanRepository::default());
    let emis = Arc::new(MemoryEmiRepository::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = LoanAssessmentService::new(
        kyc.clone(),
        loans,
        emis.clone(),
        ledger.clone(),
        dispatcher.clone(),
    );

    LoanHarness {
        service,
        kyc,
        emis,
        ledger,
        notifications,
        dispatcher,
    }
}

/// Salaried applicant with no risk factors.
pub(super) fn low_risk_submission() -> LoanSubmission {
    LoanSubmission {
        kyc_application_id: VERIFIED_KYC.to_string(),
        loan_type: "personal".to_string(),
        loan_amount: 100_000.0,
        tenure_months: 12,
        interest_rate: 12.0,
        monthly_income: 100_000.0,
        existing_emi: 10_000.0,
        credit_card_outstanding: 0.0,
        credit_score: Some(780),
        employment_type: "Salaried".to_string(),
        purpose: Some("home renovation".to_string()),
    }
}

/// Every risk rule fires: 30 + 25 + 10 + 20 = 85.
pub(super) fn high_risk_submission() -> LoanSubmission {
    LoanSubmission {
        loan_amount: 2_400_000.0,
        tenure_months: 36,
        monthly_income: 50_000.0,
        existing_emi: 25_000.0,
        credit_card_outstanding: 5_000.0,
        credit_score: Some(600),
        employment_type: "Self Employed".to_string(),
        ..low_risk_submission()
    }
}

pub(super) fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
}
