//! KYC intake and the AI verification pipeline.
//!
//! Documents flow through extraction, template matching, cross-document
//! consistency and the compliance rules before the decision thresholds place
//! the application in one of three buckets. Every stage writes to the
//! compliance ledger.

pub mod advisor;
pub mod compliance;
pub mod consistency;
pub mod domain;
pub mod extraction;
pub mod intake;
pub mod name_match;
pub mod openai;
pub mod repository;
pub mod router;
pub mod service;
pub mod templates;
pub mod validators;

#[cfg(test)]
mod tests;

pub use advisor::{ComplianceAdvisor, ComplianceNarrator, OpenAiComplianceAdvisor};
pub use compliance::{decide, review_compliance, KycDecision, RiskFlag, VerificationThresholds};
pub use consistency::{check_consistency, ConsistencyReport};
pub use domain::{
    AiVerificationStatus, DocumentCategory, DocumentType, KycApplication, KycApplicationId,
    KycStatus, KycStatusView, KycSubmission, ReviewDecision, ReviewOutcome, SubmittedDocument,
};
pub use extraction::{
    DocumentReading, ExtractedFields, FieldExtractor, OpenAiVisionExtractor, ResilientExtractor,
};
pub use intake::{DocumentIntake, DocumentStore, IntakeError, StoredDocument};
pub use name_match::{name_match_score, NameVerdict};
pub use openai::{OpenAiChat, OpenAiError};
pub use repository::{KycRepository, RepositoryError};
pub use router::kyc_router;
pub use service::{KycServiceError, KycVerificationReport, KycVerificationService};
pub use templates::{TemplateMatch, TemplateMatcher};
pub use validators::{validate_document_number, DocumentNumberError};
