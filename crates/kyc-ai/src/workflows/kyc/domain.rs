use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::notifications::{ContactDetails, NotificationPreferences};

/// Identifier wrapper for KYC applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KycApplicationId(pub String);

/// The three document slots every KYC application must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identity,
    Address,
    Pan,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 3] = [
        DocumentCategory::Identity,
        DocumentCategory::Address,
        DocumentCategory::Pan,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentCategory::Identity => "identity",
            DocumentCategory::Address => "address",
            DocumentCategory::Pan => "pan",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "identity" | "identity_proof" => Some(Self::Identity),
            "address" | "address_proof" => Some(Self::Address),
            "pan" | "pan_card" => Some(Self::Pan),
            _ => None,
        }
    }
}

/// Document kinds the template matcher knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Aadhaar,
    Pan,
    VoterId,
    DrivingLicense,
    Passport,
    UtilityBill,
    BankStatement,
}

impl DocumentType {
    pub const ALL: [DocumentType; 7] = [
        DocumentType::Aadhaar,
        DocumentType::Pan,
        DocumentType::VoterId,
        DocumentType::DrivingLicense,
        DocumentType::Passport,
        DocumentType::UtilityBill,
        DocumentType::BankStatement,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            DocumentType::Aadhaar => "aadhaar",
            DocumentType::Pan => "pan",
            DocumentType::VoterId => "voter_id",
            DocumentType::DrivingLicense => "driving_license",
            DocumentType::Passport => "passport",
            DocumentType::UtilityBill => "utility_bill",
            DocumentType::BankStatement => "bank_statement",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            DocumentType::Aadhaar => "Aadhaar Card",
            DocumentType::Pan => "PAN Card",
            DocumentType::VoterId => "Voter ID",
            DocumentType::DrivingLicense => "Driving License",
            DocumentType::Passport => "Passport",
            DocumentType::UtilityBill => "Utility Bill",
            DocumentType::BankStatement => "Bank Statement",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.code() == normalized)
    }
}

/// Document reference as submitted by the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedDocument {
    pub url: String,
    pub document_type: String,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl SubmittedDocument {
    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Inbound KYC form payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycSubmission {
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub identity_document: Option<SubmittedDocument>,
    #[serde(default)]
    pub address_document: Option<SubmittedDocument>,
    #[serde(default)]
    pub pan_document: Option<SubmittedDocument>,
    #[serde(default)]
    pub notification_preferences: NotificationPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    Pending,
    UnderReview,
    Verified,
    Rejected,
    NeedsReview,
}

impl KycStatus {
    pub const fn label(self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::UnderReview => "under_review",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
            KycStatus::NeedsReview => "needs_review",
        }
    }

    /// States from which the AI pipeline or a reviewer may still act.
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            KycStatus::Pending | KycStatus::UnderReview | KycStatus::NeedsReview
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiVerificationStatus {
    AutoApproved,
    ManualReviewRecommended,
    ManualReviewRequired,
}

impl AiVerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AiVerificationStatus::AutoApproved => "auto_approved",
            AiVerificationStatus::ManualReviewRecommended => "manual_review_recommended",
            AiVerificationStatus::ManualReviewRequired => "manual_review_required",
        }
    }
}

/// Stored KYC application row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycApplication {
    pub id: KycApplicationId,
    pub customer: ContactDetails,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub identity_document: Option<SubmittedDocument>,
    pub address_document: Option<SubmittedDocument>,
    pub pan_document: Option<SubmittedDocument>,
    pub status: KycStatus,
    pub ai_confidence_score: Option<f64>,
    pub ai_verification_status: Option<AiVerificationStatus>,
    pub ai_risk_flags: Vec<String>,
    pub reviewed_by: Option<String>,
    pub reviewer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KycApplication {
    pub fn document(&self, category: DocumentCategory) -> Option<&SubmittedDocument> {
        let slot = match category {
            DocumentCategory::Identity => &self.identity_document,
            DocumentCategory::Address => &self.address_document,
            DocumentCategory::Pan => &self.pan_document,
        };
        slot.as_ref().filter(|document| document.has_url())
    }

    /// Documents with a URL, in category order.
    pub fn documents(&self) -> Vec<(DocumentCategory, &SubmittedDocument)> {
        DocumentCategory::ALL
            .into_iter()
            .filter_map(|category| self.document(category).map(|doc| (category, doc)))
            .collect()
    }

    pub fn status_view(&self) -> KycStatusView {
        KycStatusView {
            application_id: self.id.clone(),
            customer_name: self.customer.name.clone(),
            status: self.status.label(),
            ai_verification_status: self.ai_verification_status.map(|status| status.label()),
            ai_confidence_score: self.ai_confidence_score,
            ai_risk_flags: self.ai_risk_flags.clone(),
            reviewed_by: self.reviewed_by.clone(),
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct KycStatusView {
    pub application_id: KycApplicationId,
    pub customer_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_verification_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_confidence_score: Option<f64>,
    pub ai_risk_flags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approve,
    Reject,
}

/// Human reviewer verdict on a queued application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub reviewer: String,
    pub outcome: ReviewOutcome,
    #[serde(default)]
    pub notes: Option<String>,
}
