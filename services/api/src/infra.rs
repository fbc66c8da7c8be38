use chrono::{NaiveDate, Utc};
use kyc_ai::config::{
    AppConfig, AppEnvironment, DocumentConfig, OpenAiConfig, ProviderConfig, ResendConfig,
    ServerConfig, TelemetryConfig, TwilioConfig,
};
use kyc_ai::workflows::governance::{
    AuditLog, ComplianceLedger, GovernanceAlert, LedgerError, NewAlert, NewAuditEntry,
    NewVerificationLog, VerificationLog,
};
use kyc_ai::workflows::kyc::{
    ComplianceNarrator, DocumentIntake, DocumentStore, IntakeError, KycApplication,
    KycApplicationId, KycRepository, KycStatus, KycVerificationService, OpenAiChat,
    OpenAiComplianceAdvisor, OpenAiVisionExtractor, RepositoryError, ResilientExtractor,
};
use kyc_ai::workflows::loans::{
    EmiInstallment, EmiReminderScheduler, EmiRepository, EmiStatus, LoanApplication,
    LoanApplicationId, LoanAssessmentService, LoanRepository,
};
use kyc_ai::workflows::notifications::{
    DeliveryError, MessageTransport, MockTransport, Notification, NotificationDispatcher,
    NotificationLog, ResendEmailTransport, TwilioTransport,
};
use kyc_ai::workflows::IdSequence;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryKycRepository {
    records: Arc<Mutex<BTreeMap<KycApplicationId, KycApplication>>>,
}

impl KycRepository for InMemoryKycRepository {
    fn insert(&self, application: KycApplication) -> Result<KycApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: KycApplication) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &KycApplicationId) -> Result<Option<KycApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn with_status(
        &self,
        statuses: &[KycStatus],
        limit: usize,
    ) -> Result<Vec<KycApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| statuses.contains(&record.status))
            .take(limit)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<KycApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLoanRepository {
    records: Arc<Mutex<HashMap<LoanApplicationId, LoanApplication>>>,
}

impl LoanRepository for InMemoryLoanRepository {
    fn insert(&self, application: LoanApplication) -> Result<LoanApplication, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn update(&self, application: LoanApplication) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&application.id) {
            guard.insert(application.id.clone(), application);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LoanApplicationId) -> Result<Option<LoanApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEmiRepository {
    rows: Arc<Mutex<BTreeMap<String, EmiInstallment>>>,
}

impl InMemoryEmiRepository {
    fn upcoming_where(&self, keep: impl Fn(&EmiInstallment) -> bool) -> Vec<EmiInstallment> {
        let guard = self.rows.lock().expect("emi mutex poisoned");
        guard
            .values()
            .filter(|row| row.status == EmiStatus::Upcoming && keep(row))
            .cloned()
            .collect()
    }
}

impl EmiRepository for InMemoryEmiRepository {
    fn insert_schedule(&self, installments: Vec<EmiInstallment>) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("emi mutex poisoned");
        if installments.iter().any(|row| guard.contains_key(&row.id)) {
            return Err(RepositoryError::Conflict);
        }
        for row in installments {
            guard.insert(row.id.clone(), row);
        }
        Ok(())
    }

    fn update(&self, installment: EmiInstallment) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("emi mutex poisoned");
        if guard.contains_key(&installment.id) {
            guard.insert(installment.id.clone(), installment);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
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
        Ok(self.upcoming_where(|row| row.due_date == date))
    }

    fn upcoming_overdue(&self, today: NaiveDate) -> Result<Vec<EmiInstallment>, RepositoryError> {
        Ok(self.upcoming_where(|row| row.due_date < today))
    }
}

/// Append-only audit, verification and alert tables.
pub(crate) struct InMemoryLedger {
    audits: Mutex<Vec<AuditLog>>,
    verifications: Mutex<Vec<VerificationLog>>,
    alerts: Mutex<Vec<GovernanceAlert>>,
    audit_ids: IdSequence,
    verification_ids: IdSequence,
    alert_ids: IdSequence,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self {
            audits: Mutex::default(),
            verifications: Mutex::default(),
            alerts: Mutex::default(),
            audit_ids: IdSequence::new("aud"),
            verification_ids: IdSequence::new("vlog"),
            alert_ids: IdSequence::new("alert"),
        }
    }
}

impl ComplianceLedger for InMemoryLedger {
    fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLog, LedgerError> {
        let row = AuditLog {
            id: self.audit_ids.next_id(),
            actor: entry.actor,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            details: entry.details,
            is_ai_action: entry.is_ai_action,
            ai_confidence: entry.ai_confidence,
            created_at: Utc::now(),
        };
        let mut guard = self.audits.lock().expect("ledger mutex poisoned");
        guard.push(row.clone());
        Ok(row)
    }

    fn append_verification(
        &self,
        entry: NewVerificationLog,
    ) -> Result<VerificationLog, LedgerError> {
        let row = VerificationLog {
            id: self.verification_ids.next_id(),
            kyc_application_id: entry.kyc_application_id,
            document_category: entry.document_category,
            stage: entry.stage,
            decision: entry.decision,
            confidence: entry.confidence,
            reasoning: entry.reasoning,
            created_at: Utc::now(),
        };
        let mut guard = self.verifications.lock().expect("ledger mutex poisoned");
        guard.push(row.clone());
        Ok(row)
    }

    fn raise_alert(&self, alert: NewAlert) -> Result<GovernanceAlert, LedgerError> {
        let row = GovernanceAlert {
            id: self.alert_ids.next_id(),
            alert_type: alert.alert_type,
            severity: alert.severity,
            title: alert.title,
            description: alert.description,
            is_resolved: false,
            kyc_application_id: alert.kyc_application_id,
            loan_application_id: alert.loan_application_id,
            user_id: alert.user_id,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        };
        let mut guard = self.alerts.lock().expect("ledger mutex poisoned");
        guard.push(row.clone());
        Ok(row)
    }

    fn alerts(&self, unresolved_only: bool) -> Result<Vec<GovernanceAlert>, LedgerError> {
        let guard = self.alerts.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|alert| !unresolved_only || !alert.is_resolved)
            .cloned()
            .collect())
    }

    fn resolve_alert(&self, id: &str, resolved_by: &str) -> Result<GovernanceAlert, LedgerError> {
        let mut guard = self.alerts.lock().expect("ledger mutex poisoned");
        let alert = guard
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or_else(|| LedgerError::AlertNotFound(id.to_string()))?;
        if alert.is_resolved {
            return Err(LedgerError::AlreadyResolved(id.to_string()));
        }
        alert.is_resolved = true;
        alert.resolved_by = Some(resolved_by.to_string());
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }

    fn audit_trail(&self, entity_id: &str) -> Result<Vec<AuditLog>, LedgerError> {
        let guard = self.audits.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| row.entity_id == entity_id)
            .cloned()
            .collect())
    }

    fn verification_logs(
        &self,
        kyc_application_id: &str,
    ) -> Result<Vec<VerificationLog>, LedgerError> {
        let guard = self.verifications.lock().expect("ledger mutex poisoned");
        Ok(guard
            .iter()
            .filter(|row| row.kyc_application_id == kyc_application_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryNotificationLog {
    rows: Mutex<Vec<Notification>>,
}

impl NotificationLog for InMemoryNotificationLog {
    fn record(&self, notification: Notification) -> Result<(), DeliveryError> {
        let mut guard = self.rows.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Notification>, DeliveryError> {
        let guard = self.rows.lock().expect("notification mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

/// Keeps uploaded bytes in memory and hands back `<base_url>/<key>`.
pub(crate) struct InMemoryDocumentStore {
    base_url: String,
    blobs: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryDocumentStore {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            blobs: Mutex::default(),
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, IntakeError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|_| IntakeError::Storage("document store lock poisoned".to_string()))?;
        guard.insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(format!("{}/{key}", self.base_url))
    }
}

pub(crate) type KycService = KycVerificationService<InMemoryKycRepository, InMemoryLedger>;
pub(crate) type LoanService = LoanAssessmentService<
    InMemoryKycRepository,
    InMemoryLoanRepository,
    InMemoryEmiRepository,
    InMemoryLedger,
>;

/// Services wired against in-memory storage and whichever providers are
/// configured.
pub(crate) struct Platform {
    pub(crate) kyc: Arc<KycService>,
    pub(crate) loans: Arc<LoanService>,
    pub(crate) reminders: Arc<EmiReminderScheduler<InMemoryEmiRepository>>,
    pub(crate) ledger: Arc<InMemoryLedger>,
    pub(crate) intake: Arc<DocumentIntake>,
    pub(crate) notifications: Arc<InMemoryNotificationLog>,
}

impl Platform {
    pub(crate) fn build(config: &AppConfig) -> Self {
        let kyc_repository = Arc::new(InMemoryKycRepository::default());
        let loan_repository = Arc::new(InMemoryLoanRepository::default());
        let emi_repository = Arc::new(InMemoryEmiRepository::default());
        let ledger = Arc::new(InMemoryLedger::default());
        let notifications = Arc::new(InMemoryNotificationLog::default());

        let twilio = twilio_transport(config.providers.twilio.as_ref());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            email_transport(config.providers.resend.as_ref()),
            twilio.clone(),
            twilio,
            notifications.clone(),
        ));

        let (extractor, narrator) = ai_collaborators(config.providers.openai.as_ref());
        let kyc = Arc::new(
            KycVerificationService::new(kyc_repository.clone(), ledger.clone(), dispatcher.clone())
                .with_extractor(extractor)
                .with_narrator(narrator),
        );
        let loans = Arc::new(LoanAssessmentService::new(
            kyc_repository,
            loan_repository,
            emi_repository.clone(),
            ledger.clone(),
            dispatcher.clone(),
        ));
        let reminders = Arc::new(EmiReminderScheduler::new(emi_repository, dispatcher));

        let store = Arc::new(InMemoryDocumentStore::new(
            &config.documents.public_base_url,
        ));
        let intake = Arc::new(DocumentIntake::new(store, config.documents.clone()));

        Self {
            kyc,
            loans,
            reminders,
            ledger,
            intake,
            notifications,
        }
    }
}

fn email_transport(config: Option<&ResendConfig>) -> Arc<dyn MessageTransport> {
    let Some(config) = config else {
        info!("resend not configured; email uses the mock transport");
        return Arc::new(MockTransport::default());
    };
    match ResendEmailTransport::new(config.clone()) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            warn!(error = %err, "resend client unavailable; email uses the mock transport");
            Arc::new(MockTransport::default())
        }
    }
}

fn twilio_transport(config: Option<&TwilioConfig>) -> Arc<dyn MessageTransport> {
    let Some(config) = config else {
        info!("twilio not configured; sms and voice use the mock transport");
        return Arc::new(MockTransport::default());
    };
    match TwilioTransport::new(config.clone()) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            warn!(error = %err, "twilio client unavailable; sms and voice use the mock transport");
            Arc::new(MockTransport::default())
        }
    }
}

fn ai_collaborators(config: Option<&OpenAiConfig>) -> (ResilientExtractor, ComplianceNarrator) {
    let Some(config) = config else {
        info!("openai not configured; extraction and narratives use local fallbacks");
        return (ResilientExtractor::fallback_only(), ComplianceNarrator::new(None));
    };
    match OpenAiChat::new(config.clone()) {
        Ok(chat) => (
            ResilientExtractor::new(Some(Arc::new(OpenAiVisionExtractor::new(chat.clone())))),
            ComplianceNarrator::new(Some(Arc::new(OpenAiComplianceAdvisor::new(chat)))),
        ),
        Err(err) => {
            warn!(error = %err, "openai client unavailable; using local fallbacks");
            (ResilientExtractor::fallback_only(), ComplianceNarrator::new(None))
        }
    }
}

/// Configuration with no provider credentials, so every collaborator runs
/// its local fallback.
pub(crate) fn offline_config() -> AppConfig {
    AppConfig {
        environment: AppEnvironment::Development,
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        telemetry: TelemetryConfig {
            log_level: "warn".to_string(),
            ansi: false,
        },
        documents: DocumentConfig::default(),
        providers: ProviderConfig::default(),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
