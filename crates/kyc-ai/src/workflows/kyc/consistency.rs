use serde::Serialize;

use super::domain::DocumentCategory;
use super::extraction::ExtractedFields;
use super::name_match::{name_match_score, NameVerdict};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameComparison {
    pub category: DocumentCategory,
    pub score: u8,
    pub verdict: NameVerdict,
}

/// Cross-document agreement of names and dates of birth.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub name_scores: Vec<NameComparison>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return "documents are consistent".to_string();
        }
        let mut parts = Vec::new();
        if !self.errors.is_empty() {
            parts.push(format!("errors: {}", self.errors.join("; ")));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("warnings: {}", self.warnings.join("; ")));
        }
        parts.join(" | ")
    }
}

fn normalized_dob(value: &str) -> String {
    value.split_whitespace().collect::<String>()
}

/// Compare every document against the identity document (or the first
/// document carrying a name when no identity document was read).
pub fn check_consistency(documents: &[(DocumentCategory, &ExtractedFields)]) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    let reference = documents
        .iter()
        .find(|(category, fields)| *category == DocumentCategory::Identity && fields.name.is_some())
        .or_else(|| documents.iter().find(|(_, fields)| fields.name.is_some()));

    let Some((reference_category, reference_fields)) = reference else {
        report
            .warnings
            .push("no document carried a readable name".to_string());
        return report;
    };

    let reference_name = reference_fields.name.as_deref().unwrap_or_default();
    for (category, fields) in documents {
        if category == reference_category {
            continue;
        }
        let Some(name) = fields.name.as_deref() else {
            continue;
        };

        let score = name_match_score(reference_name, name);
        let verdict = NameVerdict::from_score(score);
        match verdict {
            NameVerdict::Mismatch => report.errors.push(format!(
                "name mismatch between {} and {} documents ({score}%)",
                reference_category.label(),
                category.label()
            )),
            NameVerdict::Warning => report.warnings.push(format!(
                "name differs slightly between {} and {} documents ({score}%)",
                reference_category.label(),
                category.label()
            )),
            NameVerdict::Pass => {}
        }
        report.name_scores.push(NameComparison {
            category: *category,
            score,
            verdict,
        });
    }

    let dates: Vec<(DocumentCategory, String)> = documents
        .iter()
        .filter_map(|(category, fields)| {
            fields
                .date_of_birth
                .as_deref()
                .map(|dob| (*category, normalized_dob(dob)))
        })
        .collect();
    if let Some((first_category, first_dob)) = dates.first() {
        for (category, dob) in dates.iter().skip(1) {
            if dob != first_dob {
                report.errors.push(format!(
                    "date of birth mismatch between {} and {} documents",
                    first_category.label(),
                    category.label()
                ));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: Option<&str>, dob: Option<&str>) -> ExtractedFields {
        ExtractedFields {
            name: name.map(str::to_string),
            date_of_birth: dob.map(str::to_string),
            ..ExtractedFields::default()
        }
    }

    #[test]
    fn matching_documents_are_consistent() {
        let identity = fields(Some("Rajesh Kumar"), Some("15/08/1990"));
        let pan = fields(Some("RAJESH  KUMAR"), Some("15/08/1990"));
        let report = check_consistency(&[
            (DocumentCategory::Identity, &identity),
            (DocumentCategory::Pan, &pan),
        ]);

        assert!(report.is_consistent());
        assert!(report.warnings.is_empty());
        assert_eq!(report.name_scores[0].score, 100);
    }

    #[test]
    fn different_names_and_dates_are_errors() {
        let identity = fields(Some("Rajesh Kumar"), Some("15/08/1990"));
        let pan = fields(Some("Anil Mehta"), Some("01/01/1985"));
        let report = check_consistency(&[
            (DocumentCategory::Identity, &identity),
            (DocumentCategory::Pan, &pan),
        ]);

        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.name_scores[0].verdict, NameVerdict::Mismatch);
    }

    #[test]
    fn documents_without_names_produce_a_warning() {
        let bill = fields(None, None);
        let report = check_consistency(&[(DocumentCategory::Address, &bill)]);

        assert!(report.is_consistent());
        assert_eq!(report.warnings.len(), 1);
    }
}
