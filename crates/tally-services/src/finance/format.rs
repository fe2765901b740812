//! User-facing message formatting for the finance domain.

use tally_store::models::{Account, Transaction, TxCategory};

use crate::finance::intents::TxDraft;
use crate::pending::{Candidate, ClassifierVerdict};

/// Financial-advice one-liners used as response flavor on goals and
/// summaries, in the spirit of "The Richest Man in Babylon".
const BABYLON_PRINCIPLES: &[&str] = &[
    "Pay yourself first — put away a tenth of everything you earn.",
    "Make your savings work: idle money earns nothing.",
    "Guard against loss: only part with money for things that hold value.",
    "Small regular amounts beat rare big ones.",
];

/// Pick a flavor line, varied by call.
pub fn principle() -> &'static str {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    BABYLON_PRINCIPLES[(now as usize) % BABYLON_PRINCIPLES.len()]
}

/// Rand formatting: "R450.00", "-R89.50".
pub fn rand(v: f64) -> String {
    if v < 0.0 {
        format!("-R{:.2}", -v)
    } else {
        format!("R{:.2}", v)
    }
}

/// One-line description of a proposed entry for the classifier prompt.
pub fn describe_draft(draft: &TxDraft) -> String {
    let mut out = format!("transaction \"{}\" for {}", draft.description, rand(draft.amount));
    if let Some(category) = &draft.category {
        out.push_str(&format!(", category {category}"));
    }
    out
}

/// Map transactions onto classifier candidates, store order (newest first).
pub fn tx_candidates(txs: &[Transaction], limit: usize) -> Vec<Candidate> {
    txs.iter()
        .take(limit)
        .map(|t| Candidate {
            id: t.id.clone(),
            label: t.description.clone(),
            detail: format!("{}, {}", rand(t.amount), t.category),
            created_at: t.created_at.clone(),
        })
        .collect()
}

/// The disambiguation question for a suspected duplicate entry.
pub fn duplicate_prompt(
    draft: &TxDraft,
    verdict: &ClassifierVerdict,
    candidates: &[Candidate],
) -> String {
    let mut out = format!(
        "\"{}\" for {} looks like it might repeat an entry you already have",
        draft.description,
        rand(draft.amount)
    );
    if let Some(label) = &verdict.matched_label {
        out.push_str(&format!(" (\"{label}\")"));
    }
    out.push_str(&format!(
        " — {}% sure",
        (verdict.confidence * 100.0).round() as i64
    ));
    if !verdict.rationale.is_empty() {
        out.push_str(&format!(", {}", verdict.rationale));
    }
    out.push_str(".\n\n");
    for (i, c) in candidates.iter().enumerate() {
        out.push_str(&format!("{}. {} ({}, added {})\n", i + 1, c.label, c.detail, c.created_at));
    }
    out.push_str(
        "\nReply \"yes\" to record it as a separate new transaction, \"update\" (or \"update 2\") \
         to merge into an existing one, \"show\" to see details first, or \"cancel\".",
    );
    out
}

/// Recording confirmation.
pub fn recorded(tx: &Transaction, wisdom: Option<&str>, duplicate_checked: bool) -> String {
    let mut out = format!(
        "Recorded {} — {} ({}).",
        tx.description,
        rand(tx.amount),
        tx.category
    );
    if duplicate_checked {
        out.push_str(" Checked your recent entries — this one's new.");
    }
    append_wisdom(&mut out, wisdom);
    out
}

/// Confirmation-path creation: framed as deliberately separate.
pub fn recorded_separately(tx: &Transaction) -> String {
    format!(
        "Got it — recorded {} ({}) as a separate new transaction.",
        tx.description,
        rand(tx.amount)
    )
}

pub fn merged(tx: &Transaction, implicit: bool, wisdom: Option<&str>) -> String {
    let mut out = if implicit {
        format!(
            "That matches an entry I already have ({} for {}) — updated it instead of adding a duplicate.",
            tx.description,
            rand(tx.amount)
        )
    } else {
        format!("Updated {} ({}).", tx.description, rand(tx.amount))
    };
    append_wisdom(&mut out, wisdom);
    out
}

/// Read-only detail view of an entry.
pub fn detail(tx: &Transaction) -> String {
    let mut out = format!(
        "{} — {} ({})\nAdded: {}",
        tx.description,
        rand(tx.amount),
        tx.category,
        tx.created_at
    );
    if let Some(notes) = &tx.notes {
        out.push_str(&format!("\nNotes: {notes}"));
    }
    out
}

/// Detail view with the reminder that the confirmation is still open.
pub fn detail_with_hint(tx: &Transaction) -> String {
    format!(
        "{}\n\nStill pending — reply \"update\" to merge into this entry, \"yes\" to record yours separately, or \"cancel\".",
        detail(tx)
    )
}

/// Savings goal progress, with a flavor line.
pub fn goal_progress(account: &Account) -> String {
    match account.target {
        Some(target) if target > 0.0 => {
            let pct = (account.balance / target * 100.0).clamp(0.0, 999.0);
            let mut out = format!(
                "{}: {} of {} ({:.0}%).",
                account.name,
                rand(account.balance),
                rand(target),
                pct
            );
            if account.balance >= target {
                out.push_str(" Goal reached — well done!");
            } else {
                out.push_str(&format!(" {} to go.", rand(target - account.balance)));
            }
            out.push_str(&format!("\n\n💡 {}", principle()));
            out
        }
        _ => format!(
            "{} sits at {} but has no savings target yet. Tell me one and I'll track it.",
            account.name,
            rand(account.balance)
        ),
    }
}

/// 30-day money summary.
pub fn summary(
    income: f64,
    spend: f64,
    by_category: &[(TxCategory, f64)],
    accounts: &[Account],
) -> String {
    let mut out = format!(
        "Last 30 days: in {}, out {}, net {}.",
        rand(income),
        rand(spend),
        rand(income - spend)
    );
    let spend_lines = by_category
        .iter()
        .filter(|(c, total)| *c != TxCategory::Income && *total < 0.0)
        .map(|(c, total)| format!("• {c}: {}", rand(-total)))
        .collect::<Vec<_>>();
    if !spend_lines.is_empty() {
        out.push_str(&format!("\n\nSpending:\n{}", spend_lines.join("\n")));
    }
    if !accounts.is_empty() {
        let lines = accounts
            .iter()
            .map(|a| format!("• {}: {}", a.name, rand(a.balance)))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!("\n\nAccounts:\n{lines}"));
    }
    out
}

/// Recent entries, newest first.
pub fn timeline(txs: &[Transaction]) -> String {
    if txs.is_empty() {
        return "No transactions yet — tell me about one to get started.".to_string();
    }
    let lines = txs
        .iter()
        .map(|t| format!("• {} — {}: {}", t.created_at, t.description, rand(t.amount)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Recent transactions:\n{lines}")
}

/// Deterministic financial report used when AI synthesis fails.
pub fn fallback_report(
    income: f64,
    spend: f64,
    by_category: &[(TxCategory, f64)],
    accounts: &[Account],
) -> String {
    let mut out = summary(income, spend, by_category, accounts);
    if spend > income {
        out.push_str("\n\nYou spent more than you brought in this month — worth a look.");
    } else if income > 0.0 {
        out.push_str(&format!(
            "\n\nYou kept {} of what you earned this month.",
            rand(income - spend)
        ));
    }
    out.push_str(&format!("\n\n💡 {}", principle()));
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

    fn tx(description: &str, amount: f64) -> Transaction {
        Transaction {
            id: "tx-1".into(),
            user_id: "u1".into(),
            description: description.into(),
            amount,
            category: TxCategory::Groceries,
            notes: None,
            created_at: "2026-08-29 10:00:00".into(),
        }
    }

    fn account(balance: f64, target: Option<f64>) -> Account {
        Account {
            id: "a1".into(),
            user_id: "u1".into(),
            name: "Emergency Fund".into(),
            balance,
            target,
            updated_at: "2026-08-29 10:00:00".into(),
        }
    }

    #[test]
    fn test_rand_formatting() {
        assert_eq!(rand(450.0), "R450.00");
        assert_eq!(rand(-89.5), "-R89.50");
        assert_eq!(rand(0.0), "R0.00");
    }

    #[test]
    fn test_duplicate_prompt_lists_all_four_options() {
        let draft = TxDraft {
            description: "Woolworths".into(),
            amount: -89.5,
            ..Default::default()
        };
        let verdict = ClassifierVerdict {
            verdict: crate::pending::Verdict::Duplicate,
            confidence: 0.85,
            rationale: "same amount yesterday".into(),
            matched_label: Some("Groceries".into()),
        };
        let candidates = tx_candidates(&[tx("Groceries", -89.5)], 3);
        let prompt = duplicate_prompt(&draft, &verdict, &candidates);
        for option in ["\"yes\"", "\"update\"", "\"show\"", "\"cancel\""] {
            assert!(prompt.contains(option), "missing {option}");
        }
        assert!(prompt.contains("-R89.50"));
    }

    #[test]
    fn test_goal_progress_with_and_without_target() {
        let msg = goal_progress(&account(2500.0, Some(5000.0)));
        assert!(msg.contains("50%"));
        assert!(msg.contains("R2500.00"));
        let msg = goal_progress(&account(2500.0, None));
        assert!(msg.contains("no savings target"));
    }

    #[test]
    fn test_goal_reached() {
        let msg = goal_progress(&account(5200.0, Some(5000.0)));
        assert!(msg.contains("Goal reached"));
    }

    #[test]
    fn test_summary_separates_spend_categories() {
        let msg = summary(
            15000.0,
            970.0,
            &[
                (TxCategory::Income, 15000.0),
                (TxCategory::Groceries, -850.0),
                (TxCategory::Transport, -120.0),
            ],
            &[],
        );
        assert!(msg.contains("in R15000.00"));
        assert!(msg.contains("groceries: R850.00"));
        assert!(!msg.contains("income: R15000.00"));
    }
}
