use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::advisor::{ComplianceNarrator, NarrativeRequest};
use super::compliance::{decide, review_compliance, DocumentAssessment, VerificationThresholds};
use super::consistency::{check_consistency, ConsistencyReport};
use super::domain::{
    AiVerificationStatus, DocumentCategory, DocumentType, KycApplication, KycApplicationId,
    KycStatus, KycSubmission, ReviewDecision, ReviewOutcome, SubmittedDocument,
};
use super::extraction::{DocumentReading, ReadingSource, ResilientExtractor};
use super::repository::{KycRepository, RepositoryError};
use super::templates::TemplateMatcher;
use super::validators::{validate_document_number, DocumentNumberError};
use crate::workflows::governance::{
    AlertSeverity, ComplianceLedger, LedgerError, NewAlert, NewAuditEntry, NewVerificationLog,
    VerificationLog, VerificationStage,
};
use crate::workflows::notifications::{ContactDetails, NotificationContext, NotificationDispatcher};
use crate::workflows::IdSequence;

const ENTITY: &str = "kyc_application";

/// Per-document slice of a verification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentVerification {
    pub category: DocumentCategory,
    pub document_type: String,
    pub is_valid: bool,
    pub confidence: f64,
    pub extraction_source: ReadingSource,
    pub reason: String,
}

/// Result of running the AI pipeline over one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KycVerificationReport {
    pub application_id: KycApplicationId,
    pub status: KycStatus,
    pub ai_verification_status: AiVerificationStatus,
    pub confidence: f64,
    pub risk_flags: Vec<String>,
    pub documents: Vec<DocumentVerification>,
    pub consistency: ConsistencyReport,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
}

/// Service composing extraction, template matching, compliance rules, and the
/// compliance ledger.
pub struct KycVerificationService<R, L> {
    repository: Arc<R>,
    ledger: Arc<L>,
    notifier: Arc<NotificationDispatcher>,
    extractor: ResilientExtractor,
    narrator: ComplianceNarrator,
    matcher: TemplateMatcher,
    thresholds: VerificationThresholds,
    ids: IdSequence,
}

impl<R, L> KycVerificationService<R, L>
where
    R: KycRepository + 'static,
    L: ComplianceLedger + 'static,
{
    pub fn new(repository: Arc<R>, ledger: Arc<L>, notifier: Arc<NotificationDispatcher>) -> Self {
        Self {
            repository,
            ledger,
            notifier,
            extractor: ResilientExtractor::fallback_only(),
            narrator: ComplianceNarrator::default(),
            matcher: TemplateMatcher::new(),
            thresholds: VerificationThresholds::default(),
            ids: IdSequence::new("kyc"),
        }
    }

    pub fn with_extractor(mut self, extractor: ResilientExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_narrator(mut self, narrator: ComplianceNarrator) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_thresholds(mut self, thresholds: VerificationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Validate and store a new application in `pending`.
    pub fn submit(&self, submission: KycSubmission) -> Result<KycApplication, KycServiceError> {
        let full_name = submission.full_name.trim();
        if full_name.is_empty() {
            return Err(KycServiceError::InvalidSubmission(
                "full name is required".to_string(),
            ));
        }

        for document in [
            &submission.identity_document,
            &submission.address_document,
            &submission.pan_document,
        ]
        .into_iter()
        .flatten()
        {
            validate_submitted_number(document)?;
        }

        let now = Utc::now();
        let application = KycApplication {
            id: KycApplicationId(self.ids.next_id()),
            customer: ContactDetails {
                name: full_name.to_string(),
                email: submission.email,
                phone: submission.phone,
                preferences: submission.notification_preferences,
            },
            date_of_birth: submission.date_of_birth,
            address: submission.address,
            identity_document: submission.identity_document,
            address_document: submission.address_document,
            pan_document: submission.pan_document,
            status: KycStatus::Pending,
            ai_confidence_score: None,
            ai_verification_status: None,
            ai_risk_flags: Vec::new(),
            reviewed_by: None,
            reviewer_notes: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert(application)?;
        self.ledger.append_audit(
            NewAuditEntry::human(&stored.customer.name, "kyc_submitted", ENTITY, &stored.id.0)
                .with_details(json!({ "documents": stored.documents().len() })),
        )?;
        info!(application_id = %stored.id.0, "kyc application submitted");
        Ok(stored)
    }

    /// Run extraction, template matching, consistency, compliance and the
    /// decision thresholds, then persist the outcome.
    pub async fn verify(
        &self,
        application_id: &KycApplicationId,
    ) -> Result<KycVerificationReport, KycServiceError> {
        let mut application = self.load(application_id)?;
        if !application.status.is_open() {
            return Err(KycServiceError::InvalidState {
                id: application_id.0.clone(),
                status: application.status.label(),
            });
        }

        let documents: Vec<(DocumentCategory, SubmittedDocument)> = application
            .documents()
            .into_iter()
            .map(|(category, document)| (category, document.clone()))
            .collect();

        let mut assessments = Vec::with_capacity(documents.len());
        for (category, document) in &documents {
            let assessment = self.assess_document(&application.id, *category, document).await?;
            assessments.push(assessment);
        }

        let extracted: Vec<_> = assessments
            .iter()
            .map(|assessment| (assessment.category, &assessment.reading.fields))
            .collect();
        let consistency = check_consistency(&extracted);
        let review = review_compliance(&application, &assessments, &self.thresholds);
        let flags = review.flag_labels();

        let narrative = self
            .narrator
            .narrate(&NarrativeRequest {
                application_id: application.id.0.clone(),
                document_types: documents
                    .iter()
                    .map(|(_, document)| document.document_type.clone())
                    .collect(),
                flags: flags.clone(),
                average_confidence: review.average_confidence,
                consistency_summary: consistency.summary(),
            })
            .await;

        let decision = decide(review.compliant, review.average_confidence, &self.thresholds);
        let confidence = round2(review.average_confidence);

        self.ledger.append_verification(NewVerificationLog {
            kyc_application_id: application.id.0.clone(),
            document_category: None,
            stage: VerificationStage::ComplianceCheck,
            decision: decision.ai_verification_status.label().to_string(),
            confidence,
            reasoning: format!("{narrative} [consistency: {}]", consistency.summary()),
        })?;

        application.status = decision.status;
        application.ai_verification_status = Some(decision.ai_verification_status);
        application.ai_confidence_score = Some(confidence);
        application.ai_risk_flags = flags.clone();
        application.updated_at = Utc::now();
        self.repository.update(application.clone())?;

        self.ledger.append_audit(
            NewAuditEntry::ai("kyc_ai_verified", ENTITY, &application.id.0)
                .with_confidence(confidence)
                .with_details(json!({
                    "status": decision.status.label(),
                    "ai_verification_status": decision.ai_verification_status.label(),
                    "risk_flags": flags,
                })),
        )?;

        let alert_id = if decision.ai_verification_status
            == AiVerificationStatus::ManualReviewRequired
            && !flags.is_empty()
        {
            let alert = self.ledger.raise_alert(NewAlert {
                alert_type: "kyc_compliance_flags".to_string(),
                severity: AlertSeverity::Medium,
                title: "KYC application requires manual review".to_string(),
                description: format!(
                    "Application {} scored {:.2}% with flags: {}",
                    application.id.0,
                    confidence,
                    flags.join(", ")
                ),
                kyc_application_id: Some(application.id.0.clone()),
                loan_application_id: None,
                user_id: None,
            })?;
            Some(alert.id)
        } else {
            None
        };

        info!(
            application_id = %application.id.0,
            status = decision.status.label(),
            confidence,
            flags = flags.len(),
            "kyc verification completed"
        );
        self.notify(&application).await;

        Ok(KycVerificationReport {
            application_id: application.id.clone(),
            status: decision.status,
            ai_verification_status: decision.ai_verification_status,
            confidence,
            risk_flags: flags,
            documents: assessments
                .iter()
                .map(|assessment| DocumentVerification {
                    category: assessment.category,
                    document_type: assessment.template.document_type.clone(),
                    is_valid: assessment.template.is_valid,
                    confidence: assessment.template.confidence,
                    extraction_source: assessment.reading.source,
                    reason: assessment.template.reason.clone(),
                })
                .collect(),
            consistency,
            narrative,
            alert_id,
        })
    }

    async fn assess_document(
        &self,
        application_id: &KycApplicationId,
        category: DocumentCategory,
        document: &SubmittedDocument,
    ) -> Result<DocumentAssessment, KycServiceError> {
        let reading = match DocumentType::from_code(&document.document_type) {
            Some(kind) => self.extractor.read(kind, document).await,
            None => DocumentReading::unsupported(),
        };
        self.ledger.append_verification(NewVerificationLog {
            kyc_application_id: application_id.0.clone(),
            document_category: Some(category.label().to_string()),
            stage: VerificationStage::FieldExtraction,
            decision: if reading.source == ReadingSource::Unsupported {
                "skipped".to_string()
            } else {
                "extracted".to_string()
            },
            confidence: reading.confidence,
            reasoning: format!(
                "{} field(s) read from {} ({})",
                reading.fields.populated(),
                document.document_type,
                reading.source.label()
            ),
        })?;

        let template = self.matcher.match_document(
            &document.document_type,
            &reading.ocr_text,
            Some(&reading.fields),
        );
        self.ledger.append_verification(NewVerificationLog {
            kyc_application_id: application_id.0.clone(),
            document_category: Some(category.label().to_string()),
            stage: VerificationStage::TemplateMatch,
            decision: if template.is_valid { "valid" } else { "invalid" }.to_string(),
            confidence: template.confidence,
            reasoning: template.reason.clone(),
        })?;

        Ok(DocumentAssessment {
            category,
            template,
            reading,
        })
    }

    /// Human verdict on an application that is still open.
    pub async fn review(
        &self,
        application_id: &KycApplicationId,
        decision: ReviewDecision,
    ) -> Result<KycApplication, KycServiceError> {
        let reviewer = decision.reviewer.trim();
        if reviewer.is_empty() {
            return Err(KycServiceError::InvalidSubmission(
                "reviewer is required".to_string(),
            ));
        }

        let mut application = self.load(application_id)?;
        if !application.status.is_open() {
            return Err(KycServiceError::InvalidState {
                id: application_id.0.clone(),
                status: application.status.label(),
            });
        }

        application.status = match decision.outcome {
            ReviewOutcome::Approve => KycStatus::Verified,
            ReviewOutcome::Reject => KycStatus::Rejected,
        };
        application.reviewed_by = Some(reviewer.to_string());
        application.reviewer_notes = decision.notes.clone();
        application.updated_at = Utc::now();
        self.repository.update(application.clone())?;

        self.ledger.append_audit(
            NewAuditEntry::human(reviewer, "kyc_reviewed", ENTITY, &application.id.0).with_details(
                json!({
                    "status": application.status.label(),
                    "notes": decision.notes,
                }),
            ),
        )?;
        info!(
            application_id = %application.id.0,
            status = application.status.label(),
            reviewer,
            "kyc application reviewed"
        );
        self.notify(&application).await;

        Ok(application)
    }

    pub fn get(&self, application_id: &KycApplicationId) -> Result<KycApplication, KycServiceError> {
        self.load(application_id)
    }

    /// Applications waiting on a human reviewer.
    pub fn review_queue(&self, limit: usize) -> Result<Vec<KycApplication>, KycServiceError> {
        Ok(self
            .repository
            .with_status(&[KycStatus::UnderReview, KycStatus::NeedsReview], limit)?)
    }

    pub fn verification_logs(
        &self,
        application_id: &KycApplicationId,
    ) -> Result<Vec<VerificationLog>, KycServiceError> {
        self.load(application_id)?;
        Ok(self.ledger.verification_logs(&application_id.0)?)
    }

    /// Every stored application as CSV, one row each.
    pub fn export_csv(&self) -> Result<String, KycServiceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "application_id",
            "full_name",
            "email",
            "phone",
            "status",
            "ai_verification_status",
            "ai_confidence_score",
            "ai_risk_flags",
            "reviewed_by",
            "created_at",
        ])?;

        for application in self.repository.all()? {
            let score = application
                .ai_confidence_score
                .map(|score| format!("{score:.2}"))
                .unwrap_or_default();
            let flags = application.ai_risk_flags.join(";");
            let created_at = application.created_at.to_rfc3339();
            writer.write_record([
                application.id.0.as_str(),
                application.customer.name.as_str(),
                application.customer.email.as_deref().unwrap_or_default(),
                application.customer.phone.as_deref().unwrap_or_default(),
                application.status.label(),
                application
                    .ai_verification_status
                    .map(|status| status.label())
                    .unwrap_or_default(),
                score.as_str(),
                flags.as_str(),
                application.reviewed_by.as_deref().unwrap_or_default(),
                created_at.as_str(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| KycServiceError::Export(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| KycServiceError::Export(err.to_string()))
    }

    fn load(&self, application_id: &KycApplicationId) -> Result<KycApplication, KycServiceError> {
        self.repository
            .fetch(application_id)?
            .ok_or_else(|| KycServiceError::NotFound(application_id.0.clone()))
    }

    async fn notify(&self, application: &KycApplication) {
        let (subject, body) = status_message(application);
        let context = NotificationContext {
            kyc_application_id: Some(application.id.0.clone()),
            ..NotificationContext::default()
        };
        let delivery = self
            .notifier
            .notify_contact(&application.customer, subject, &body, context)
            .await;
        if !delivery.failures.is_empty() {
            warn!(
                application_id = %application.id.0,
                failed_channels = delivery.failures.len(),
                "kyc status notification failed"
            );
        }
    }
}

fn validate_submitted_number(document: &SubmittedDocument) -> Result<(), DocumentNumberError> {
    let (Some(kind), Some(number)) = (
        DocumentType::from_code(&document.document_type),
        document.document_number.as_deref(),
    ) else {
        return Ok(());
    };
    validate_document_number(kind, number)
}

fn status_message(application: &KycApplication) -> (&'static str, String) {
    let id = &application.id.0;
    match application.status {
        KycStatus::Verified => (
            "KYC verified",
            format!("your KYC application {id} has been verified."),
        ),
        KycStatus::Rejected => {
            let notes = application
                .reviewer_notes
                .as_deref()
                .map(|notes| format!(" Reason: {notes}"))
                .unwrap_or_default();
            (
                "KYC rejected",
                format!("your KYC application {id} could not be verified.{notes}"),
            )
        }
        KycStatus::Pending | KycStatus::UnderReview | KycStatus::NeedsReview => (
            "KYC under review",
            format!("your KYC application {id} is being reviewed by our compliance team."),
        ),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Error raised by the KYC service.
#[derive(Debug, thiserror::Error)]
pub enum KycServiceError {
    #[error("{0}")]
    InvalidSubmission(String),
    #[error(transparent)]
    DocumentNumber(#[from] DocumentNumberError),
    #[error("kyc application {0} not found")]
    NotFound(String),
    #[error("kyc application {id} is already {status}")]
    InvalidState { id: String, status: &'static str },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("csv export failed: {0}")]
    Export(String),
}

impl From<csv::Error> for KycServiceError {
    fn from(err: csv::Error) -> Self {
        KycServiceError::Export(err.to_string())
    }
}

impl KycServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            KycServiceError::InvalidSubmission(_) | KycServiceError::DocumentNumber(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            KycServiceError::NotFound(_) | KycServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            KycServiceError::InvalidState { .. }
            | KycServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            KycServiceError::Repository(RepositoryError::Unavailable(_))
            | KycServiceError::Ledger(_)
            | KycServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
