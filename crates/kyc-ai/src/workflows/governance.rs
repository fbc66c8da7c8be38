//! Regulatory trail: audit entries, per-stage verification logs, and
//! governance alerts raised when risk or compliance thresholds are exceeded.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::failure_response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Internally raised flag requiring compliance attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceAlert {
    pub id: String,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub is_resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
}

/// Alert payload before the ledger assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub kyc_application_id: Option<String>,
    pub loan_application_id: Option<String>,
    pub user_id: Option<String>,
}

/// Append-only action trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: String,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Value,
    pub is_ai_action: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Value,
    pub is_ai_action: bool,
    pub ai_confidence: Option<f64>,
}

impl NewAuditEntry {
    pub fn human(actor: &str, action: &str, entity_type: &str, entity_id: &str) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details: Value::Null,
            is_ai_action: false,
            ai_confidence: None,
        }
    }

    pub fn ai(action: &str, entity_type: &str, entity_id: &str) -> Self {
        Self {
            actor: "ai-pipeline".to_string(),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            details: Value::Null,
            is_ai_action: true,
            ai_confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.ai_confidence = Some(confidence);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStage {
    FieldExtraction,
    TemplateMatch,
    ComplianceCheck,
}

/// One row per pipeline stage per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationLog {
    pub id: String,
    pub kyc_application_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_category: Option<String>,
    pub stage: VerificationStage,
    pub decision: String,
    pub confidence: f64,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVerificationLog {
    pub kyc_application_id: String,
    pub document_category: Option<String>,
    pub stage: VerificationStage,
    pub decision: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Storage for the compliance trail shared by the KYC and loan workflows.
pub trait ComplianceLedger: Send + Sync {
    fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditLog, LedgerError>;
    fn append_verification(&self, entry: NewVerificationLog)
        -> Result<VerificationLog, LedgerError>;
    fn raise_alert(&self, alert: NewAlert) -> Result<GovernanceAlert, LedgerError>;
    fn alerts(&self, unresolved_only: bool) -> Result<Vec<GovernanceAlert>, LedgerError>;
    fn resolve_alert(&self, id: &str, resolved_by: &str) -> Result<GovernanceAlert, LedgerError>;
    fn audit_trail(&self, entity_id: &str) -> Result<Vec<AuditLog>, LedgerError>;
    fn verification_logs(&self, kyc_application_id: &str)
        -> Result<Vec<VerificationLog>, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("alert {0} not found")]
    AlertNotFound(String),
    #[error("alert {0} is already resolved")]
    AlreadyResolved(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::AlertNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::AlreadyResolved(_) => StatusCode::CONFLICT,
            LedgerError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Router exposing the governance alert queue.
pub fn governance_router<L>(ledger: Arc<L>) -> Router
where
    L: ComplianceLedger + 'static,
{
    Router::new()
        .route("/api/v1/governance/alerts", get(alerts_handler::<L>))
        .route(
            "/api/v1/governance/alerts/:alert_id/resolve",
            post(resolve_handler::<L>),
        )
        .route(
            "/api/v1/governance/audit/:entity_id",
            get(audit_trail_handler::<L>),
        )
        .with_state(ledger)
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlertFilter {
    #[serde(default)]
    unresolved: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Resolution {
    resolved_by: String,
}

pub(crate) async fn alerts_handler<L>(
    State(ledger): State<Arc<L>>,
    Query(filter): Query<AlertFilter>,
) -> Response
where
    L: ComplianceLedger + 'static,
{
    match ledger.alerts(filter.unresolved) {
        Ok(alerts) => {
            let payload = json!({ "success": true, "alerts": alerts });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure_response(error.status_code(), error),
    }
}

pub(crate) async fn audit_trail_handler<L>(
    State(ledger): State<Arc<L>>,
    Path(entity_id): Path<String>,
) -> Response
where
    L: ComplianceLedger + 'static,
{
    match ledger.audit_trail(&entity_id) {
        Ok(entries) => {
            let payload = json!({ "success": true, "entries": entries });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure_response(error.status_code(), error),
    }
}

pub(crate) async fn resolve_handler<L>(
    State(ledger): State<Arc<L>>,
    Path(alert_id): Path<String>,
    axum::Json(resolution): axum::Json<Resolution>,
) -> Response
where
    L: ComplianceLedger + 'static,
{
    let resolved_by = resolution.resolved_by.trim();
    if resolved_by.is_empty() {
        return failure_response(StatusCode::UNPROCESSABLE_ENTITY, "resolved_by is required");
    }

    match ledger.resolve_alert(&alert_id, resolved_by) {
        Ok(alert) => {
            let payload = json!({ "success": true, "alert": alert });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure_response(error.status_code(), error),
    }
}
