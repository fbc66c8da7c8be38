//! Structured field extraction from document images.
//!
//! The hosted vision model is optional. [`ResilientExtractor`] turns every
//! failure (no key, transport error, unparseable reply) into the fixed mock
//! reading for the document type, so the pipeline always has input.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::domain::{DocumentType, SubmittedDocument};
use super::openai::{OpenAiChat, OpenAiError};
use super::templates::template_for;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub father_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl ExtractedFields {
    pub fn populated(&self) -> usize {
        [
            &self.name,
            &self.date_of_birth,
            &self.document_number,
            &self.address,
            &self.father_name,
            &self.gender,
        ]
        .into_iter()
        .filter(|value| value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false))
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    Model,
    Fallback,
    Unsupported,
}

impl ReadingSource {
    pub const fn label(self) -> &'static str {
        match self {
            ReadingSource::Model => "model",
            ReadingSource::Fallback => "fallback",
            ReadingSource::Unsupported => "unsupported",
        }
    }
}

/// OCR transcript plus the structured fields pulled from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReading {
    pub ocr_text: String,
    pub fields: ExtractedFields,
    pub confidence: f64,
    pub source: ReadingSource,
}

impl DocumentReading {
    pub fn unsupported() -> Self {
        Self {
            ocr_text: String::new(),
            fields: ExtractedFields::default(),
            confidence: 0.0,
            source: ReadingSource::Unsupported,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Provider(#[from] OpenAiError),
    #[error("model reply was not the expected JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(
        &self,
        document_type: DocumentType,
        document: &SubmittedDocument,
    ) -> Result<DocumentReading, ExtractionError>;
}

/// Vision-model extractor posting the document URL with a type-specific prompt.
pub struct OpenAiVisionExtractor {
    chat: OpenAiChat,
}

impl OpenAiVisionExtractor {
    pub fn new(chat: OpenAiChat) -> Self {
        Self { chat }
    }
}

pub fn extraction_prompt(document_type: DocumentType) -> String {
    let fields: Vec<&str> = template_for(document_type)
        .required_fields
        .iter()
        .map(|field| field.key())
        .collect();
    format!(
        "You are reading an Indian {label}. Transcribe all visible text into \"ocr_text\". \
         Then extract these fields if present: {fields}. Respond with a JSON object using the keys \
         ocr_text, name, date_of_birth (DD/MM/YYYY), document_number, address, father_name, \
         gender, and confidence (0-100, your certainty in the extraction). Use null for missing \
         values.",
        label = document_type.label(),
        fields = fields.join(", "),
    )
}

#[derive(Deserialize)]
struct ModelReading {
    #[serde(default)]
    ocr_text: String,
    #[serde(flatten)]
    fields: ExtractedFields,
    #[serde(default)]
    confidence: f64,
}

#[async_trait]
impl FieldExtractor for OpenAiVisionExtractor {
    async fn extract(
        &self,
        document_type: DocumentType,
        document: &SubmittedDocument,
    ) -> Result<DocumentReading, ExtractionError> {
        let messages = json!([
            {
                "role": "system",
                "content": "You extract identity data from KYC documents and reply only with JSON."
            },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": extraction_prompt(document_type) },
                    { "type": "image_url", "image_url": { "url": &document.url } }
                ]
            }
        ]);

        let content = self.chat.complete(messages, true).await?;
        let reading: ModelReading = serde_json::from_str(&content)?;

        Ok(DocumentReading {
            ocr_text: reading.ocr_text,
            fields: reading.fields,
            confidence: reading.confidence,
            source: ReadingSource::Model,
        })
    }
}

/// Extractor that never fails: primary model when configured, mock otherwise.
#[derive(Clone, Default)]
pub struct ResilientExtractor {
    primary: Option<Arc<dyn FieldExtractor>>,
}

impl ResilientExtractor {
    pub fn new(primary: Option<Arc<dyn FieldExtractor>>) -> Self {
        Self { primary }
    }

    pub fn fallback_only() -> Self {
        Self { primary: None }
    }

    pub async fn read(
        &self,
        document_type: DocumentType,
        document: &SubmittedDocument,
    ) -> DocumentReading {
        let Some(primary) = &self.primary else {
            return fallback_reading(document_type);
        };

        match primary.extract(document_type, document).await {
            Ok(reading) => reading,
            Err(err) => {
                warn!(
                    document_type = document_type.code(),
                    error = %err,
                    "field extraction failed; using fallback record"
                );
                fallback_reading(document_type)
            }
        }
    }
}

fn some(value: &str) -> Option<String> {
    Some(value.to_string())
}

/// Fixed mock record per document type.
pub fn fallback_reading(document_type: DocumentType) -> DocumentReading {
    let (ocr_text, fields, confidence) = match document_type {
        DocumentType::Aadhaar => (
            "Government of India\nUnique Identification Authority of India (UIDAI)\n\
             Aadhaar\nName: Rajesh Kumar\nDOB: 15/08/1990\nGender: Male\n1234 5678 9012",
            ExtractedFields {
                name: some("Rajesh Kumar"),
                date_of_birth: some("15/08/1990"),
                document_number: some("1234 5678 9012"),
                address: some("42 MG Road, Bengaluru, Karnataka 560001"),
                father_name: None,
                gender: some("Male"),
            },
            92.0,
        ),
        DocumentType::Pan => (
            "INCOME TAX DEPARTMENT\nGOVT. OF INDIA\nPermanent Account Number\nABCDE1234F\n\
             Name: RAJESH KUMAR\nFather's Name: SURESH KUMAR\nDate of Birth: 15/08/1990\nSignature",
            ExtractedFields {
                name: some("RAJESH KUMAR"),
                date_of_birth: some("15/08/1990"),
                document_number: some("ABCDE1234F"),
                address: None,
                father_name: some("SURESH KUMAR"),
                gender: None,
            },
            95.0,
        ),
        DocumentType::VoterId => (
            "Election Commission of India\nIdentity Card\nEPIC No: ABC1234567\n\
             Elector's Name: Rajesh Kumar\nFather's Name: Suresh Kumar\nSex: Male\n\
             Electoral Registration Officer",
            ExtractedFields {
                name: some("Rajesh Kumar"),
                date_of_birth: None,
                document_number: some("ABC1234567"),
                address: None,
                father_name: some("Suresh Kumar"),
                gender: some("Male"),
            },
            90.0,
        ),
        DocumentType::DrivingLicense => (
            "Union of India\nDriving Licence\nTransport Department, Karnataka\n\
             DL No: KA0120150012345\nName: Rajesh Kumar\nDOB: 15/08/1990\n\
             Address: 42 MG Road, Bengaluru 560001\nDate of Issue: 01/02/2015\nValid Till: 31/01/2035",
            ExtractedFields {
                name: some("Rajesh Kumar"),
                date_of_birth: some("15/08/1990"),
                document_number: some("KA0120150012345"),
                address: some("42 MG Road, Bengaluru 560001"),
                father_name: None,
                gender: None,
            },
            89.0,
        ),
        DocumentType::Passport => (
            "Republic of India\nPassport\nPassport No: K1234567\nName: Rajesh Kumar\n\
             Nationality: Indian\nDate of Birth: 15/08/1990\nPlace of Issue: Bengaluru\n\
             Date of Expiry: 14/03/2031",
            ExtractedFields {
                name: some("Rajesh Kumar"),
                date_of_birth: some("15/08/1990"),
                document_number: some("K1234567"),
                address: None,
                father_name: None,
                gender: None,
            },
            93.0,
        ),
        DocumentType::UtilityBill => (
            "BESCOM Electricity Bill\nConsumer No: 7845123690\nName: Rajesh Kumar\n\
             Address: 42 MG Road, Bengaluru 560001\nBill Date: 05/09/2025\nUnits consumed: 212\n\
             Amount Payable: 1840.00\nDue Date: 20/09/2025",
            ExtractedFields {
                name: some("Rajesh Kumar"),
                date_of_birth: None,
                document_number: some("7845123690"),
                address: some("42 MG Road, Bengaluru 560001"),
                father_name: None,
                gender: None,
            },
            88.0,
        ),
        DocumentType::BankStatement => (
            "State Bank of India\nBranch: MG Road\nIFSC: SBIN0000813\nStatement of Account\n\
             Name: Rajesh Kumar\nAddress: 42 MG Road, Bengaluru 560001\nAccount No: 30012345678\n\
             Opening Balance: 52,300.00\nClosing Balance: 61,020.00",
            ExtractedFields {
                name: some("Rajesh Kumar"),
                date_of_birth: None,
                document_number: some("30012345678"),
                address: some("42 MG Road, Bengaluru 560001"),
                father_name: None,
                gender: None,
            },
            87.0,
        ),
    };

    DocumentReading {
        ocr_text: ocr_text.to_string(),
        fields,
        confidence,
        source: ReadingSource::Fallback,
    }
}
