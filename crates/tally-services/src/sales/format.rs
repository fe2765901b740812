//! User-facing message formatting for the sales domain.

use tally_store::models::{Lead, LeadStatus};

use crate::pending::{Candidate, ClassifierVerdict};
use crate::sales::intents::LeadDraft;

/// One-line description of a proposed lead for the classifier prompt.
pub fn describe_draft(draft: &LeadDraft) -> String {
    let mut parts = vec![format!("lead \"{}\"", draft.name)];
    if let Some(phone) = &draft.phone {
        parts.push(format!("phone {phone}"));
    }
    if let Some(email) = &draft.email {
        parts.push(format!("email {email}"));
    }
    if let Some(notes) = &draft.notes {
        parts.push(format!("notes: {notes}"));
    }
    parts.join(", ")
}

/// Map leads onto classifier candidates, keeping store order (newest first).
pub fn lead_candidates(leads: &[Lead], limit: usize) -> Vec<Candidate> {
    leads
        .iter()
        .take(limit)
        .map(|l| Candidate {
            id: l.id.clone(),
            label: l.name.clone(),
            detail: format!("status {}", l.status),
            created_at: l.created_at.clone(),
        })
        .collect()
}

/// The disambiguation question, with the four reply options spelled out.
pub fn duplicate_prompt(
    name: &str,
    verdict: &ClassifierVerdict,
    candidates: &[Candidate],
) -> String {
    let mut out = format!("\"{name}\" looks like it might already be in your pipeline");
    if let Some(label) = &verdict.matched_label {
        out.push_str(&format!(" as \"{label}\""));
    }
    out.push_str(&format!(
        " ({}% sure",
        (verdict.confidence * 100.0).round() as i64
    ));
    if !verdict.rationale.is_empty() {
        out.push_str(&format!(" — {}", verdict.rationale));
    }
    out.push_str(").\n\n");

    for (i, c) in candidates.iter().enumerate() {
        out.push_str(&format!("{}. {} ({}, added {})\n", i + 1, c.label, c.detail, c.created_at));
    }
    out.push_str(
        "\nReply \"yes\" to add it as a separate new lead, \"update\" (or \"update 2\") \
         to merge into an existing one, \"show\" to see details first, or \"cancel\".",
    );
    out
}

/// Creation confirmation.
pub fn created(lead: &Lead, wisdom: Option<&str>, duplicate_checked: bool) -> String {
    let mut out = format!("Added {} to your pipeline (status {}).", lead.name, lead.status);
    if duplicate_checked {
        out.push_str(" I checked your existing leads — this one's new.");
    }
    append_wisdom(&mut out, wisdom);
    out
}

/// Confirmation-path creation: framed as deliberately separate.
pub fn created_separately(lead: &Lead) -> String {
    format!("Got it — added {} as a separate new lead (status {}).", lead.name, lead.status)
}

/// Merge confirmation, implicit (matcher hit) or explicit (user said update).
pub fn merged(lead: &Lead, implicit: bool, wisdom: Option<&str>) -> String {
    let mut out = if implicit {
        format!("I already have {} — updated their details instead of adding a duplicate.", lead.name)
    } else {
        format!("Updated {} with the new details.", lead.name)
    };
    append_wisdom(&mut out, wisdom);
    out
}

/// Read-only detail view, with a hint that the confirmation is still open.
pub fn detail_with_hint(lead: &Lead) -> String {
    format!(
        "{}\n\nStill pending — reply \"update\" to merge into this lead, \"yes\" to add yours as new, or \"cancel\".",
        detail(lead)
    )
}

/// Read-only detail view of a lead.
pub fn detail(lead: &Lead) -> String {
    let mut out = format!("{} — status {}", lead.name, lead.status);
    if let Some(phone) = &lead.phone {
        out.push_str(&format!("\nPhone: {phone}"));
    }
    if let Some(email) = &lead.email {
        out.push_str(&format!("\nEmail: {email}"));
    }
    if let Some(notes) = &lead.notes {
        out.push_str(&format!("\nNotes: {notes}"));
    }
    out.push_str(&format!("\nAdded: {}", lead.created_at));
    out
}

/// A list of leads, one line each.
pub fn lead_list(title: &str, leads: &[Lead]) -> String {
    if leads.is_empty() {
        return format!("{title}: nothing yet.");
    }
    let lines = leads
        .iter()
        .map(|l| format!("• {} — {}", l.name, l.status))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{title}:\n{lines}")
}

/// Pipeline summary from status counts.
pub fn summary(counts: &[(LeadStatus, i64)]) -> String {
    if counts.is_empty() {
        return "Your pipeline is empty — tell me about a lead to get started.".to_string();
    }
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    let lines = counts
        .iter()
        .map(|(s, n)| format!("• {s}: {n}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Pipeline ({total} leads):\n{lines}")
}

/// Deterministic pipeline report used when AI synthesis fails.
pub fn fallback_report(counts: &[(LeadStatus, i64)], recent: &[Lead]) -> String {
    let mut out = summary(counts);
    if let Some(newest) = recent.first() {
        out.push_str(&format!("\n\nMost recent lead: {} ({}).", newest.name, newest.status));
    }
    let open: i64 = counts
        .iter()
        .filter(|(s, _)| !matches!(s, LeadStatus::ClosedWon | LeadStatus::ClosedLost))
        .map(|(_, n)| n)
        .sum();
    if open > 0 {
        out.push_str(&format!("\n{open} leads still need a next step."));
    }
    out
}

fn append_wisdom(out: &mut String, wisdom: Option<&str>) {
    if let Some(w) = wisdom.map(str::trim).filter(|w| !w.is_empty()) {
        out.push_str(&format!("\n\n💡 {w}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::Verdict;

    fn lead(name: &str) -> Lead {
        Lead {
            id: "lead-1".into(),
            user_id: "u1".into(),
            name: name.into(),
            phone: Some("0821234567".into()),
            email: None,
            status: LeadStatus::New,
            notes: Some("met at expo".into()),
            created_at: "2026-08-01 09:00:00".into(),
            updated_at: "2026-08-01 09:00:00".into(),
        }
    }

    #[test]
    fn test_duplicate_prompt_lists_all_four_options() {
        let verdict = ClassifierVerdict {
            verdict: Verdict::Duplicate,
            confidence: 0.9,
            rationale: "likely the same guest house".into(),
            matched_label: Some("Dandrom Guest House".into()),
        };
        let candidates = vec![Candidate {
            id: "lead-1".into(),
            label: "Dandrom Guest House".into(),
            detail: "status New".into(),
            created_at: "2026-08-01".into(),
        }];
        let prompt = duplicate_prompt("Dan's Guest House", &verdict, &candidates);
        for option in ["\"yes\"", "\"update\"", "\"show\"", "\"cancel\""] {
            assert!(prompt.contains(option), "missing {option}");
        }
        assert!(prompt.contains("Dandrom Guest House"));
        assert!(prompt.contains("90%"));
    }

    #[test]
    fn test_created_mentions_name_and_status() {
        let msg = created(&lead("Acme Corp"), None, false);
        assert!(msg.contains("Acme Corp"));
        assert!(msg.contains("New"));
    }

    #[test]
    fn test_wisdom_appended_only_when_present() {
        let with = created(&lead("Acme"), Some("Strike while it's warm."), false);
        assert!(with.contains("Strike while it's warm."));
        let without = created(&lead("Acme"), Some("   "), false);
        assert!(!without.contains("💡"));
    }

    #[test]
    fn test_detail_with_hint_keeps_options_open() {
        let msg = detail_with_hint(&lead("Acme"));
        assert!(msg.contains("0821234567"));
        assert!(msg.contains("\"update\""));
    }
}
