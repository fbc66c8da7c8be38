use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::governance::{
    AuditLog, ComplianceLedger, GovernanceAlert, LedgerError, NewAlert, NewAuditEntry,
    NewVerificationLog, VerificationLog,
};
use crate::workflows::kyc::{
    KycApplication, KycApplicationId, KycRepository, KycStatus, RepositoryError,
};
use crate::workflows::notifications::{
    DeliveryError, DeliveryReceipt, MessageTransport, MockTransport, Notification,
    NotificationDispatcher, NotificationLog, OutboundMessage,
};
use crate::workflows::IdSequence;

#[derive(Default)]
pub(crate) struct MemoryKycRepository {
    pub(crate) records: Mutex<BTreeMap<KycApplicationId, KycApplication>>,
}

impl MemoryKycRepository {
    pub(crate) fn set_status(&self, id: &KycApplicationId, status: KycStatus) {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if let Some(record) = guard.get_mut(id) {
            record.status = status;
        }
    }
}

impl KycRepository for MemoryKycRepository {
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
        guard.insert(application.id.clone(), application);
        Ok(())
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

pub(crate) struct UnavailableKycRepository;

impl KycRepository for UnavailableKycRepository {
    fn insert(&self, _application: KycApplication) -> Result<KycApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _application: KycApplication) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &KycApplicationId) -> Result<Option<KycApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn with_status(
        &self,
        _statuses: &[KycStatus],
        _limit: usize,
    ) -> Result<Vec<KycApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<KycApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(crate) struct MemoryLedger {
    audits: Mutex<Vec<AuditLog>>,
    verifications: Mutex<Vec<VerificationLog>>,
    alerts: Mutex<Vec<GovernanceAlert>>,
    ids: IdSequence,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self {
            audits: Mutex::default(),
            verifications: Mutex::default(),
            alerts: Mutex::default(),
            ids: IdSequence::new("led"),
        }
    }
}

impl MemoryLedger {
    pub(crate) fn audits(&self) -> Vec<AuditLog> {
        self.audits.lock().expect("ledger mutex poisoned").clone()
    }

    pub(crate) fn all_alerts(&self) -> Vec<GovernanceAlert> {
        self.alerts.lock().expect("ledger mutex poisoned").clone()
    }
}

impl ComplianceLedger for MemoryLedger {
    fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLog, LedgerError> {
        let row = AuditLog {
            id: self.ids.next_id(),
            actor: entry.actor,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            details: entry.details,
            is_ai_action: entry.is_ai_action,
            ai_confidence: entry.ai_confidence,
            created_at: Utc::now(),
        };
        self.audits
            .lock()
            .expect("ledger mutex poisoned")
            .push(row.clone());
        Ok(row)
    }

    fn append_verification(
        &self,
        entry: NewVerificationLog,
    ) -> Result<VerificationLog, LedgerError> {
        let row = VerificationLog {
            id: self.ids.next_id(),
            kyc_application_id: entry.kyc_application_id,
            document_category: entry.document_category,
            stage: entry.stage,
            decision: entry.decision,
            confidence: entry.confidence,
            reasoning: entry.reasoning,
            created_at: Utc::now(),
        };
        self.verifications
            .lock()
            .expect("ledger mutex poisoned")
            .push(row.clone());
        Ok(row)
    }

    fn raise_alert(&self, alert: NewAlert) -> Result<GovernanceAlert, LedgerError> {
        let row = GovernanceAlert {
            id: self.ids.next_id(),
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
        self.alerts
            .lock()
            .expect("ledger mutex poisoned")
            .push(row.clone());
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
pub(crate) struct MemoryNotificationLog {
    rows: Mutex<Vec<Notification>>,
}

impl MemoryNotificationLog {
    pub(crate) fn rows(&self) -> Vec<Notification> {
        self.rows.lock().expect("log mutex poisoned").clone()
    }
}

impl NotificationLog for MemoryNotificationLog {
    fn record(&self, notification: Notification) -> Result<(), DeliveryError> {
        self.rows
            .lock()
            .expect("log mutex poisoned")
            .push(notification);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Notification>, DeliveryError> {
        let rows = self.rows.lock().expect("log mutex poisoned");
        Ok(rows.iter().rev().take(limit).cloned().collect())
    }
}

pub(crate) struct FailingTransport;

#[async_trait]
impl MessageTransport for FailingTransport {
    async fn deliver(&self, _message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        Err(DeliveryError::Transport {
            provider: "resend",
            message: "connection reset".to_string(),
        })
    }
}

pub(crate) fn mock_dispatcher() -> (Arc<NotificationDispatcher>, Arc<MemoryNotificationLog>) {
    let log = Arc::new(MemoryNotificationLog::default());
    let dispatcher = NotificationDispatcher::new(
        Arc::new(MockTransport::default()),
        Arc::new(MockTransport::default()),
        Arc::new(MockTransport::default()),
        log.clone(),
    );
    (Arc::new(dispatcher), log)
}

pub(crate) fn failing_dispatcher() -> (Arc<NotificationDispatcher>, Arc<MemoryNotificationLog>) {
    let log = Arc::new(MemoryNotificationLog::default());
    let dispatcher = NotificationDispatcher::new(
        Arc::new(FailingTransport),
        Arc::new(FailingTransport),
        Arc::new(FailingTransport),
        log.clone(),
    );
    (Arc::new(dispatcher), log)
}

/// Email delivers; SMS and voice fail.
pub(crate) fn email_only_dispatcher() -> (Arc<NotificationDispatcher>, Arc<MemoryNotificationLog>) {
    let log = Arc::new(MemoryNotificationLog::default());
    let dispatcher = NotificationDispatcher::new(
        Arc::new(MockTransport::default()),
        Arc::new(FailingTransport),
        Arc::new(FailingTransport),
        log.clone(),
    );
    (Arc::new(dispatcher), log)
}

pub(crate) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
