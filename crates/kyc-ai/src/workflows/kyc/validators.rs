//! Format checks for government document numbers.

use std::sync::OnceLock;

use regex::Regex;

use super::domain::DocumentType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DocumentNumberError {
    pub document_type: DocumentType,
    pub message: String,
}

static AADHAAR: OnceLock<Regex> = OnceLock::new();
static PAN: OnceLock<Regex> = OnceLock::new();
static VOTER_ID: OnceLock<Regex> = OnceLock::new();
static DRIVING_LICENSE: OnceLock<Regex> = OnceLock::new();
static PASSPORT: OnceLock<Regex> = OnceLock::new();

fn number_format(document_type: DocumentType) -> Option<(&'static Regex, &'static str)> {
    let (cell, pattern, message) = match document_type {
        DocumentType::Aadhaar => (
            &AADHAAR,
            r"^[0-9]{4}\s?[0-9]{4}\s?[0-9]{4}$",
            "Aadhaar number must be 12 digits (format: XXXX XXXX XXXX)",
        ),
        DocumentType::Pan => (
            &PAN,
            r"^[A-Z]{5}[0-9]{4}[A-Z]$",
            "PAN must be 5 letters, 4 digits and 1 letter (e.g. ABCDE1234F)",
        ),
        DocumentType::VoterId => (
            &VOTER_ID,
            r"^[A-Z]{3}[0-9]{7}$",
            "Voter ID must be 3 letters followed by 7 digits (e.g. ABC1234567)",
        ),
        DocumentType::DrivingLicense => (
            &DRIVING_LICENSE,
            r"^[A-Z]{2}[0-9]{13}$",
            "Driving license number must be 2 letters followed by 13 digits",
        ),
        DocumentType::Passport => (
            &PASSPORT,
            r"^[A-Z][0-9]{7}$",
            "Passport number must be 1 letter followed by 7 digits (e.g. A1234567)",
        ),
        DocumentType::UtilityBill | DocumentType::BankStatement => return None,
    };

    let regex = cell.get_or_init(|| Regex::new(pattern).expect("document number pattern compiles"));
    Some((regex, message))
}

/// Validate a document number against the format for its type.
///
/// Types without a fixed number format (bills, statements) always pass.
pub fn validate_document_number(
    document_type: DocumentType,
    value: &str,
) -> Result<(), DocumentNumberError> {
    let Some((regex, message)) = number_format(document_type) else {
        return Ok(());
    };

    if regex.is_match(value.trim()) {
        Ok(())
    } else {
        Err(DocumentNumberError {
            document_type,
            message: message.to_string(),
        })
    }
}
