use serde::{Deserialize, Serialize};

use super::domain::{AiVerificationStatus, DocumentCategory, KycApplication, KycStatus};
use super::extraction::DocumentReading;
use super::name_match::normalize_name;
use super::templates::TemplateMatch;

/// Named compliance findings stored on the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    LowDocumentConfidence,
    NameMismatchAcrossDocuments,
    MissingIdentityDocument,
    MissingAddressDocument,
    MissingPanDocument,
    CustomerBelowMinimumAge,
}

impl RiskFlag {
    pub const fn label(self) -> &'static str {
        match self {
            RiskFlag::LowDocumentConfidence => "low_document_confidence",
            RiskFlag::NameMismatchAcrossDocuments => "name_mismatch_across_documents",
            RiskFlag::MissingIdentityDocument => "missing_identity_document",
            RiskFlag::MissingAddressDocument => "missing_address_document",
            RiskFlag::MissingPanDocument => "missing_pan_document",
            RiskFlag::CustomerBelowMinimumAge => "customer_below_minimum_age",
        }
    }

    fn missing(category: DocumentCategory) -> Self {
        match category {
            DocumentCategory::Identity => RiskFlag::MissingIdentityDocument,
            DocumentCategory::Address => RiskFlag::MissingAddressDocument,
            DocumentCategory::Pan => RiskFlag::MissingPanDocument,
        }
    }
}

/// Thresholds steering the compliance flags and the final bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationThresholds {
    pub auto_approve_confidence: f64,
    pub recommend_review_confidence: f64,
    pub document_confidence_floor: f64,
    /// DOB substrings that mark a customer as under age.
    pub underage_birth_year_markers: Vec<String>,
}

impl Default for VerificationThresholds {
    fn default() -> Self {
        Self {
            auto_approve_confidence: 90.0,
            recommend_review_confidence: 80.0,
            document_confidence_floor: 85.0,
            underage_birth_year_markers: vec![
                "2010".to_string(),
                "2011".to_string(),
                "2012".to_string(),
            ],
        }
    }
}

/// One document after extraction and template matching.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAssessment {
    pub category: DocumentCategory,
    pub template: TemplateMatch,
    pub reading: DocumentReading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceReview {
    pub flags: Vec<RiskFlag>,
    pub compliant: bool,
    pub average_confidence: f64,
}

impl ComplianceReview {
    pub fn flag_labels(&self) -> Vec<String> {
        self.flags.iter().map(|flag| flag.label().to_string()).collect()
    }
}

fn push_flag(flags: &mut Vec<RiskFlag>, flag: RiskFlag) {
    if !flags.contains(&flag) {
        flags.push(flag);
    }
}

/// Run every compliance rule; none short-circuits.
pub fn review_compliance(
    application: &KycApplication,
    assessments: &[DocumentAssessment],
    thresholds: &VerificationThresholds,
) -> ComplianceReview {
    let mut flags = Vec::new();

    if assessments
        .iter()
        .any(|assessment| assessment.template.confidence < thresholds.document_confidence_floor)
    {
        push_flag(&mut flags, RiskFlag::LowDocumentConfidence);
    }

    let mut names: Vec<String> = assessments
        .iter()
        .filter_map(|assessment| assessment.reading.fields.name.as_deref())
        .map(normalize_name)
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    if names.len() > 1 {
        push_flag(&mut flags, RiskFlag::NameMismatchAcrossDocuments);
    }

    for category in DocumentCategory::ALL {
        if application.document(category).is_none() {
            push_flag(&mut flags, RiskFlag::missing(category));
        }
    }

    let underage = assessments.iter().any(|assessment| {
        assessment
            .reading
            .fields
            .date_of_birth
            .as_deref()
            .map(|dob| {
                thresholds
                    .underage_birth_year_markers
                    .iter()
                    .any(|marker| dob.contains(marker.as_str()))
            })
            .unwrap_or(false)
    });
    if underage {
        push_flag(&mut flags, RiskFlag::CustomerBelowMinimumAge);
    }

    let average_confidence = if assessments.is_empty() {
        0.0
    } else {
        assessments
            .iter()
            .map(|assessment| assessment.template.confidence)
            .sum::<f64>()
            / assessments.len() as f64
    };

    ComplianceReview {
        compliant: flags.is_empty(),
        flags,
        average_confidence,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KycDecision {
    pub status: KycStatus,
    pub ai_verification_status: AiVerificationStatus,
}

/// Bucket the pipeline result. The review-recommended band ignores
/// compliance flags.
pub fn decide(
    compliant: bool,
    average_confidence: f64,
    thresholds: &VerificationThresholds,
) -> KycDecision {
    if compliant && average_confidence >= thresholds.auto_approve_confidence {
        KycDecision {
            status: KycStatus::Verified,
            ai_verification_status: AiVerificationStatus::AutoApproved,
        }
    } else if average_confidence >= thresholds.recommend_review_confidence {
        KycDecision {
            status: KycStatus::UnderReview,
            ai_verification_status: AiVerificationStatus::ManualReviewRecommended,
        }
    } else {
        KycDecision {
            status: KycStatus::NeedsReview,
            ai_verification_status: AiVerificationStatus::ManualReviewRequired,
        }
    }
}
