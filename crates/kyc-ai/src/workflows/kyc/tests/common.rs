use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::workflows::kyc::compliance::DocumentAssessment;
use crate::workflows::kyc::domain::{
    DocumentCategory, DocumentType, KycApplication, KycApplicationId, KycStatus, KycSubmission,
    SubmittedDocument,
};
use crate::workflows::kyc::extraction::{
    fallback_reading, DocumentReading, ExtractedFields, ExtractionError, FieldExtractor,
    ResilientExtractor,
};
use crate::workflows::kyc::openai::OpenAiError;
use crate::workflows::kyc::templates::TemplateMatch;
use crate::workflows::kyc::KycVerificationService;
use crate::workflows::notifications::{ContactDetails, NotificationPreferences};
use crate::workflows::test_support::{
    mock_dispatcher, MemoryKycRepository, MemoryLedger, MemoryNotificationLog,
};

pub(super) fn document(kind: &str, number: Option<&str>) -> SubmittedDocument {
    SubmittedDocument {
        url: format!("memory://kyc-documents/{kind}.jpg"),
        document_type: kind.to_string(),
        document_number: number.map(str::to_string),
        file_name: Some(format!("{kind}.jpg")),
        content_type: Some("image/jpeg".to_string()),
    }
}

pub(super) fn submission() -> KycSubmission {
    KycSubmission {
        full_name: "Rajesh Kumar".to_string(),
        email: Some("rajesh@example.com".to_string()),
        phone: Some("+919800000001".to_string()),
        date_of_birth: Some("1990-08-15".to_string()),
        address: Some("42 MG Road, Bengaluru 560001".to_string()),
        identity_document: Some(document("aadhaar", Some("1234 5678 9012"))),
        address_document: Some(document("utility_bill", None)),
        pan_document: Some(document("pan", Some("ABCDE1234F"))),
        notification_preferences: NotificationPreferences::default(),
    }
}

pub(super) struct Harness {
    pub(super) service: KycVerificationService<MemoryKycRepository, MemoryLedger>,
    pub(super) repository: Arc<MemoryKycRepository>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) notifications: Arc<MemoryNotificationLog>,
}

pub(super) fn harness() -> Harness {
    let repository = Arc::new(MemoryKycRepository::default());
    let ledger = Arc::new(MemoryLedger::default());
    let (dispatcher, notifications) = mock_dispatcher();
    let service = KycVerificationService::new(repository.clone(), ledger.clone(), dispatcher);
    Harness {
        service,
        repository,
        ledger,
        notifications,
    }
}

pub(super) fn harness_with_readings(readings: HashMap<DocumentType, DocumentReading>) -> Harness {
    let Harness {
        service,
        repository,
        ledger,
        notifications,
    } = harness();
    let extractor = ResilientExtractor::new(Some(Arc::new(ScriptedExtractor { readings })));
    Harness {
        service: service.with_extractor(extractor),
        repository,
        ledger,
        notifications,
    }
}

/// Returns a scripted reading per type and fails for anything else.
pub(super) struct ScriptedExtractor {
    readings: HashMap<DocumentType, DocumentReading>,
}

#[async_trait]
impl FieldExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        document_type: DocumentType,
        _document: &SubmittedDocument,
    ) -> Result<DocumentReading, ExtractionError> {
        self.readings
            .get(&document_type)
            .cloned()
            .ok_or(ExtractionError::Provider(OpenAiError::EmptyResponse))
    }
}

pub(super) fn reading_with_dob(kind: DocumentType, dob: &str) -> DocumentReading {
    let mut reading = fallback_reading(kind);
    reading.fields.date_of_birth = Some(dob.to_string());
    reading
}

pub(super) fn application() -> KycApplication {
    let submission = submission();
    let now = Utc::now();
    KycApplication {
        id: KycApplicationId("kyc-000777".to_string()),
        customer: ContactDetails {
            name: submission.full_name,
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
    }
}

pub(super) fn assessment(
    category: DocumentCategory,
    confidence: f64,
    name: &str,
    dob: Option<&str>,
) -> DocumentAssessment {
    let mut reading = DocumentReading::unsupported();
    reading.fields = ExtractedFields {
        name: Some(name.to_string()),
        date_of_birth: dob.map(str::to_string),
        ..ExtractedFields::default()
    };
    DocumentAssessment {
        category,
        template: TemplateMatch {
            document_type: "aadhaar".to_string(),
            is_valid: confidence >= 60.0,
            confidence,
            pattern_match: confidence,
            field_match: confidence,
            matched_patterns: Vec::new(),
            missing_fields: Vec::new(),
            detected_type: None,
            reason: String::new(),
        },
        reading,
    }
}
