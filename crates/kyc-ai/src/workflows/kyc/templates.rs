//! Layout-pattern and required-field matching of OCR text against known
//! document templates.

use regex::Regex;
use serde::Serialize;

use super::domain::DocumentType;
use super::extraction::ExtractedFields;

const PATTERN_WEIGHT: f64 = 0.6;
const FIELD_WEIGHT: f64 = 0.4;
const REJECT_BELOW_PATTERN: f64 = 30.0;
const MIN_PATTERN_MATCH: f64 = 40.0;
const MIN_CONFIDENCE: f64 = 60.0;
const WRONG_TYPE_MIN_HITS: usize = 2;

/// Semantic fields a template expects to find on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateField {
    Name,
    FatherName,
    DateOfBirth,
    Gender,
    AadhaarNumber,
    PanNumber,
    VoterIdNumber,
    DrivingLicenseNumber,
    PassportNumber,
    Address,
    Nationality,
    Expiry,
    BillDate,
    AccountNumber,
}

impl TemplateField {
    const ALL: [TemplateField; 14] = [
        TemplateField::Name,
        TemplateField::FatherName,
        TemplateField::DateOfBirth,
        TemplateField::Gender,
        TemplateField::AadhaarNumber,
        TemplateField::PanNumber,
        TemplateField::VoterIdNumber,
        TemplateField::DrivingLicenseNumber,
        TemplateField::PassportNumber,
        TemplateField::Address,
        TemplateField::Nationality,
        TemplateField::Expiry,
        TemplateField::BillDate,
        TemplateField::AccountNumber,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            TemplateField::Name => "name",
            TemplateField::FatherName => "father_name",
            TemplateField::DateOfBirth => "date_of_birth",
            TemplateField::Gender => "gender",
            TemplateField::AadhaarNumber => "aadhaar_number",
            TemplateField::PanNumber => "pan_number",
            TemplateField::VoterIdNumber => "voter_id_number",
            TemplateField::DrivingLicenseNumber => "driving_license_number",
            TemplateField::PassportNumber => "passport_number",
            TemplateField::Address => "address",
            TemplateField::Nationality => "nationality",
            TemplateField::Expiry => "expiry_date",
            TemplateField::BillDate => "bill_date",
            TemplateField::AccountNumber => "account_number",
        }
    }

    const fn pattern(self) -> &'static str {
        match self {
            TemplateField::Name => r"(?i)\bname\b",
            TemplateField::FatherName => r"(?i)(father'?s?\s+name|\b[sdw]/o\b)",
            TemplateField::DateOfBirth => {
                r"(?i)(\b[0-9]{2}[/-][0-9]{2}[/-][0-9]{4}\b|\bdob\b|date of birth|year of birth)"
            }
            TemplateField::Gender => r"(?i)\b(male|female|transgender)\b",
            TemplateField::AadhaarNumber => r"\b[0-9]{4}\s?[0-9]{4}\s?[0-9]{4}\b",
            TemplateField::PanNumber => r"(?i)\b[a-z]{5}[0-9]{4}[a-z]\b",
            TemplateField::VoterIdNumber => r"(?i)\b[a-z]{3}[0-9]{7}\b",
            TemplateField::DrivingLicenseNumber => r"(?i)\b[a-z]{2}[0-9]{2}[ -]?[0-9]{11}\b",
            TemplateField::PassportNumber => r"(?i)\b[a-z][0-9]{7}\b",
            TemplateField::Address => r"(?i)(\baddress\b|\b[0-9]{6}\b)",
            TemplateField::Nationality => r"(?i)\b(nationality|indian)\b",
            TemplateField::Expiry => r"(?i)(date of expiry|valid till|validity|expiry)",
            TemplateField::BillDate => {
                r"(?i)(bill date|billing date|statement date|\b[0-9]{2}[/-][0-9]{2}[/-][0-9]{4}\b)"
            }
            TemplateField::AccountNumber => {
                r"(?i)(account no|a/c no|account number|consumer no|\b[0-9]{9,18}\b)"
            }
        }
    }

    /// Whether a structured extraction already supplies this field.
    fn present_in(self, fields: &ExtractedFields) -> bool {
        let value = match self {
            TemplateField::Name => &fields.name,
            TemplateField::FatherName => &fields.father_name,
            TemplateField::DateOfBirth => &fields.date_of_birth,
            TemplateField::Gender => &fields.gender,
            TemplateField::Address => &fields.address,
            TemplateField::AadhaarNumber
            | TemplateField::PanNumber
            | TemplateField::VoterIdNumber
            | TemplateField::DrivingLicenseNumber
            | TemplateField::PassportNumber
            | TemplateField::AccountNumber => &fields.document_number,
            TemplateField::Nationality | TemplateField::Expiry | TemplateField::BillDate => {
                return false
            }
        };
        value
            .as_deref()
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Static description of what a document of a given type looks like.
#[derive(Debug, Clone, Copy)]
pub struct DocumentTemplate {
    pub document_type: DocumentType,
    pub layout_patterns: &'static [&'static str],
    pub required_fields: &'static [TemplateField],
}

pub static TEMPLATES: [DocumentTemplate; 7] = [
    DocumentTemplate {
        document_type: DocumentType::Aadhaar,
        layout_patterns: &[
            "government of india",
            "unique identification authority",
            "uidai",
            "aadhaar",
            "dob",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::DateOfBirth,
            TemplateField::Gender,
            TemplateField::AadhaarNumber,
        ],
    },
    DocumentTemplate {
        document_type: DocumentType::Pan,
        layout_patterns: &[
            "income tax department",
            "govt. of india",
            "permanent account number",
            "father's name",
            "signature",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::FatherName,
            TemplateField::DateOfBirth,
            TemplateField::PanNumber,
        ],
    },
    DocumentTemplate {
        document_type: DocumentType::VoterId,
        layout_patterns: &[
            "election commission of india",
            "identity card",
            "elector",
            "epic no",
            "electoral registration officer",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::FatherName,
            TemplateField::Gender,
            TemplateField::VoterIdNumber,
        ],
    },
    DocumentTemplate {
        document_type: DocumentType::DrivingLicense,
        layout_patterns: &[
            "driving licence",
            "transport department",
            "union of india",
            "valid till",
            "dl no",
            "date of issue",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::DateOfBirth,
            TemplateField::DrivingLicenseNumber,
            TemplateField::Address,
            TemplateField::Expiry,
        ],
    },
    DocumentTemplate {
        document_type: DocumentType::Passport,
        layout_patterns: &[
            "republic of india",
            "passport",
            "nationality",
            "place of issue",
            "date of expiry",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::DateOfBirth,
            TemplateField::PassportNumber,
            TemplateField::Nationality,
            TemplateField::Expiry,
        ],
    },
    DocumentTemplate {
        document_type: DocumentType::UtilityBill,
        layout_patterns: &[
            "electricity",
            "bill",
            "consumer",
            "amount payable",
            "due date",
            "units",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::Address,
            TemplateField::BillDate,
            TemplateField::AccountNumber,
        ],
    },
    DocumentTemplate {
        document_type: DocumentType::BankStatement,
        layout_patterns: &[
            "bank",
            "statement of account",
            "ifsc",
            "opening balance",
            "closing balance",
            "branch",
        ],
        required_fields: &[
            TemplateField::Name,
            TemplateField::Address,
            TemplateField::AccountNumber,
        ],
    },
];

pub fn template_for(document_type: DocumentType) -> &'static DocumentTemplate {
    TEMPLATES
        .iter()
        .find(|template| template.document_type == document_type)
        .unwrap_or(&TEMPLATES[0])
}

/// Outcome of matching one document against its declared template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateMatch {
    pub document_type: String,
    pub is_valid: bool,
    pub confidence: f64,
    pub pattern_match: f64,
    pub field_match: f64,
    pub matched_patterns: Vec<String>,
    pub missing_fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_type: Option<DocumentType>,
    pub reason: String,
}

/// Matcher holding the compiled per-field detectors.
pub struct TemplateMatcher {
    detectors: Vec<(TemplateField, Regex)>,
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateMatcher {
    pub fn new() -> Self {
        let detectors = TemplateField::ALL
            .into_iter()
            .map(|field| {
                let regex = Regex::new(field.pattern()).expect("field detector pattern compiles");
                (field, regex)
            })
            .collect();
        Self { detectors }
    }

    fn detects(&self, field: TemplateField, text: &str) -> bool {
        self.detectors
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, regex)| regex.is_match(text))
            .unwrap_or(false)
    }

    /// Match OCR text against the template for `document_type`.
    ///
    /// `extracted` lets a structured extraction vouch for fields the raw text
    /// does not obviously carry.
    pub fn match_document(
        &self,
        document_type: &str,
        ocr_text: &str,
        extracted: Option<&ExtractedFields>,
    ) -> TemplateMatch {
        let Some(kind) = DocumentType::from_code(document_type) else {
            return TemplateMatch {
                document_type: document_type.to_string(),
                is_valid: false,
                confidence: 0.0,
                pattern_match: 0.0,
                field_match: 0.0,
                matched_patterns: Vec::new(),
                missing_fields: Vec::new(),
                detected_type: None,
                reason: "Unsupported document type; upload a recognised KYC document".to_string(),
            };
        };

        let template = template_for(kind);
        let lowered = ocr_text.to_lowercase();

        let matched_patterns: Vec<String> = template
            .layout_patterns
            .iter()
            .filter(|pattern| lowered.contains(*pattern))
            .map(|pattern| pattern.to_string())
            .collect();
        let pattern_match = percentage(matched_patterns.len(), template.layout_patterns.len());

        let mut missing_fields = Vec::new();
        let mut matched_fields = 0;
        for field in template.required_fields {
            let found = self.detects(*field, ocr_text)
                || extracted.map(|fields| field.present_in(fields)).unwrap_or(false);
            if found {
                matched_fields += 1;
            } else {
                missing_fields.push(field.key());
            }
        }
        let field_match = percentage(matched_fields, template.required_fields.len());
        let confidence = PATTERN_WEIGHT * pattern_match + FIELD_WEIGHT * field_match;

        let (is_valid, detected_type, reason) = if pattern_match < REJECT_BELOW_PATTERN {
            match detect_other_type(kind, &lowered) {
                Some(other) => (
                    false,
                    Some(other),
                    format!(
                        "Wrong document type: expected {} but detected as {}",
                        kind.label(),
                        other.label()
                    ),
                ),
                None => (
                    false,
                    None,
                    format!(
                        "Document does not match the {} layout ({:.0}% of patterns found)",
                        kind.label(),
                        pattern_match
                    ),
                ),
            }
        } else if confidence >= MIN_CONFIDENCE && pattern_match >= MIN_PATTERN_MATCH {
            (
                true,
                None,
                format!(
                    "{} template matched with {:.1}% confidence",
                    kind.label(),
                    confidence
                ),
            )
        } else {
            (
                false,
                None,
                format!(
                    "{} template confidence too low ({:.1}%, patterns {:.0}%, fields {:.0}%)",
                    kind.label(),
                    confidence,
                    pattern_match,
                    field_match
                ),
            )
        };

        TemplateMatch {
            document_type: kind.code().to_string(),
            is_valid,
            confidence,
            pattern_match,
            field_match,
            matched_patterns,
            missing_fields,
            detected_type,
            reason,
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// The other template with the most layout hits, if it reaches the minimum.
fn detect_other_type(expected: DocumentType, lowered: &str) -> Option<DocumentType> {
    let mut best: Option<(DocumentType, usize)> = None;
    for template in TEMPLATES.iter().filter(|t| t.document_type != expected) {
        let hits = template
            .layout_patterns
            .iter()
            .filter(|pattern| lowered.contains(*pattern))
            .count();
        if hits >= WRONG_TYPE_MIN_HITS && best.map(|(_, top)| hits > top).unwrap_or(true) {
            best = Some((template.document_type, hits));
        }
    }
    best.map(|(kind, _)| kind)
}
