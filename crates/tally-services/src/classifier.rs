//! AI-backed duplicate classifier.
//!
//! Advisory only: it never touches data, it only decides whether to ask
//! the user before creating a record. On any failure it falls back to
//! UNIQUE so an outage increases duplicates rather than blocking input.

use serde::Deserialize;
use tally_providers::AiExecutor;
use tracing::warn;

use crate::pending::{Candidate, ClassifierVerdict, Verdict};

/// How many recent entities the classifier gets to compare against.
pub const SHORTLIST_LIMIT: usize = 15;

const FALLBACK_CONFIDENCE: f64 = 0.5;

const SYSTEM_PROMPT: &str = "You judge whether a proposed record duplicates an existing one. \
People abbreviate, misspell and drop punctuation, so \"Dan's Guest House\" may well be \
\"Dandrom Guest House\". Reply with JSON only: \
{\"verdict\": \"DUPLICATE\" or \"UNIQUE\", \"confidence\": 0.0-1.0, \
\"rationale\": \"one short sentence\", \"matched_label\": \"label of the match or null\"}";

#[derive(Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    matched_label: Option<String>,
}

/// Duplicate classifier over a bounded, recency-ordered shortlist.
#[derive(Clone)]
pub struct DuplicateClassifier {
    exec: AiExecutor,
}

impl DuplicateClassifier {
    pub fn new(exec: AiExecutor) -> Self {
        Self { exec }
    }

    /// Judge a proposed entity against the shortlist. Never fails: call
    /// errors and malformed output both degrade to UNIQUE at 0.5.
    pub async fn classify(&self, proposed: &str, shortlist: &[Candidate]) -> ClassifierVerdict {
        if shortlist.is_empty() {
            return ClassifierVerdict {
                verdict: Verdict::Unique,
                confidence: 1.0,
                rationale: "no existing records to compare against".into(),
                matched_label: None,
            };
        }

        let listing = shortlist
            .iter()
            .take(SHORTLIST_LIMIT)
            .enumerate()
            .map(|(i, c)| format!("{}. {} ({}, added {})", i + 1, c.label, c.detail, c.created_at))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("Proposed: {proposed}\n\nExisting records:\n{listing}");

        match self.exec.generate_json::<RawVerdict>(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => {
                let verdict = if raw.verdict.to_lowercase().contains("dup") {
                    Verdict::Duplicate
                } else {
                    Verdict::Unique
                };
                ClassifierVerdict {
                    verdict,
                    confidence: raw.confidence.unwrap_or(FALLBACK_CONFIDENCE).clamp(0.0, 1.0),
                    rationale: raw.rationale.unwrap_or_default(),
                    matched_label: raw.matched_label.filter(|l| !l.is_empty() && l != "null"),
                }
            }
            Err(e) => {
                warn!("duplicate classifier unavailable, treating as unique: {e}");
                ClassifierVerdict {
                    verdict: Verdict::Unique,
                    confidence: FALLBACK_CONFIDENCE,
                    rationale: "duplicate check unavailable; treated as new".into(),
                    matched_label: None,
                }
            }
        }
    }
}
