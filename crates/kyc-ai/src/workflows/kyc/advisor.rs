//! Free-text compliance narrative grounded in retrieved regulatory snippets.
//!
//! The narrative is stored as reasoning only; it never changes the decision.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use super::openai::{OpenAiChat, OpenAiError};

const TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferenceSnippet {
    pub id: &'static str,
    pub source: &'static str,
    pub text: &'static str,
}

pub static REFERENCE_CORPUS: [ReferenceSnippet; 8] = [
    ReferenceSnippet {
        id: "ovd-list",
        source: "RBI KYC Master Direction, Section 3",
        text: "Officially valid documents for identity include passport, driving licence, \
               voter identity card, and proof of possession of aadhaar number.",
    },
    ReferenceSnippet {
        id: "pan-mandatory",
        source: "RBI KYC Master Direction, Section 16",
        text: "Permanent account number or form 60 must be obtained from every individual \
               customer at the time of account based relationship; pan card verification is mandatory.",
    },
    ReferenceSnippet {
        id: "address-proof",
        source: "RBI KYC Master Direction, Section 3",
        text: "Where the identity document does not carry a current address, utility bill \
               not older than two months or a bank statement may be accepted as address proof.",
    },
    ReferenceSnippet {
        id: "name-consistency",
        source: "Internal CDD Policy 4.2",
        text: "Customer name must match across identity, address and pan documents; any name \
               mismatch requires enhanced due diligence and manual review.",
    },
    ReferenceSnippet {
        id: "minor-accounts",
        source: "RBI KYC Master Direction, Section 22",
        text: "Credit products may not be extended to a minor; customer age below minimum \
               age of eighteen years requires rejection or guardian documentation.",
    },
    ReferenceSnippet {
        id: "document-quality",
        source: "Internal CDD Policy 5.1",
        text: "Low confidence document scans, illegible images or template mismatch must be \
               escalated for manual review rather than auto approved.",
    },
    ReferenceSnippet {
        id: "missing-documents",
        source: "Internal CDD Policy 3.4",
        text: "Applications with missing identity, address or pan documents remain incomplete \
               and cannot be verified until the missing document is uploaded.",
    },
    ReferenceSnippet {
        id: "periodic-update",
        source: "RBI KYC Master Direction, Section 38",
        text: "Verified customers are subject to periodic kyc updation; low risk customers \
               every ten years and high risk customers every two years.",
    },
];

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Rank corpus snippets by token overlap with `query`; ties keep corpus order.
pub fn retrieve_references(query: &str, limit: usize) -> Vec<&'static ReferenceSnippet> {
    let query_tokens = tokens(query);
    let mut scored: Vec<(usize, usize, &'static ReferenceSnippet)> = REFERENCE_CORPUS
        .iter()
        .enumerate()
        .map(|(position, snippet)| {
            let overlap = tokens(snippet.text).intersection(&query_tokens).count();
            (overlap, position, snippet)
        })
        .filter(|(overlap, _, _)| *overlap > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, snippet)| snippet)
        .collect()
}

/// Facts handed to the narrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeRequest {
    pub application_id: String,
    pub document_types: Vec<String>,
    pub flags: Vec<String>,
    pub average_confidence: f64,
    pub consistency_summary: String,
}

impl NarrativeRequest {
    fn retrieval_query(&self) -> String {
        let mut query = self.document_types.join(" ");
        for flag in &self.flags {
            query.push(' ');
            query.push_str(&flag.replace('_', " "));
        }
        if self.flags.is_empty() {
            query.push_str(" verified customers periodic kyc");
        }
        query
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error(transparent)]
    Provider(#[from] OpenAiError),
}

#[async_trait]
pub trait ComplianceAdvisor: Send + Sync {
    async fn narrate(
        &self,
        request: &NarrativeRequest,
        references: &[&'static ReferenceSnippet],
    ) -> Result<String, AdvisorError>;
}

pub struct OpenAiComplianceAdvisor {
    chat: OpenAiChat,
}

impl OpenAiComplianceAdvisor {
    pub fn new(chat: OpenAiChat) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl ComplianceAdvisor for OpenAiComplianceAdvisor {
    async fn narrate(
        &self,
        request: &NarrativeRequest,
        references: &[&'static ReferenceSnippet],
    ) -> Result<String, AdvisorError> {
        let context: Vec<String> = references
            .iter()
            .map(|snippet| format!("[{}] {}", snippet.source, snippet.text))
            .collect();
        let facts = json!(request).to_string();

        let messages = json!([
            {
                "role": "system",
                "content": "You are a KYC compliance analyst. Using only the reference material, \
                            write a short assessment (at most five sentences) of the application."
            },
            {
                "role": "user",
                "content": format!("Reference material:\n{}\n\nApplication facts:\n{}", context.join("\n"), facts)
            }
        ]);

        Ok(self.chat.complete(messages, false).await?)
    }
}

/// Deterministic narrative used when no advisor is configured or it fails.
pub fn local_narrative(request: &NarrativeRequest, references: &[&'static ReferenceSnippet]) -> String {
    let mut text = format!(
        "Application {} reviewed {} document(s) with average confidence {:.1}%.",
        request.application_id,
        request.document_types.len(),
        request.average_confidence
    );
    if request.flags.is_empty() {
        text.push_str(" No compliance flags were raised.");
    } else {
        text.push_str(&format!(" Flags raised: {}.", request.flags.join(", ")));
    }
    text.push_str(&format!(" Consistency: {}.", request.consistency_summary));
    if !references.is_empty() {
        let sources: Vec<&str> = references.iter().map(|snippet| snippet.source).collect();
        text.push_str(&format!(" References: {}.", sources.join("; ")));
    }
    text
}

/// Retrieval plus optional hosted narration with a local fallback.
#[derive(Clone, Default)]
pub struct ComplianceNarrator {
    advisor: Option<Arc<dyn ComplianceAdvisor>>,
}

impl ComplianceNarrator {
    pub fn new(advisor: Option<Arc<dyn ComplianceAdvisor>>) -> Self {
        Self { advisor }
    }

    pub async fn narrate(&self, request: &NarrativeRequest) -> String {
        let references = retrieve_references(&request.retrieval_query(), TOP_K);
        let Some(advisor) = &self.advisor else {
            return local_narrative(request, &references);
        };

        match advisor.narrate(request, &references).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => local_narrative(request, &references),
            Err(err) => {
                warn!(error = %err, "compliance advisor failed; using local narrative");
                local_narrative(request, &references)
            }
        }
    }
}
