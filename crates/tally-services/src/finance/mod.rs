//! Finance domain service: a personal ledger over chat.

pub mod intents;
mod format;

use tally_core::error::TallyError;
use tally_core::message::Domain;
use tally_providers::{friendly, AiExecutor};
use tally_store::models::{Transaction, TxCategory, User};
use tally_store::Store;
use tracing::{error, warn};

use crate::classifier::{DuplicateClassifier, SHORTLIST_LIMIT};
use crate::confirm::{self, ConfirmReply};
use crate::history::HistoryStore;
use crate::matcher;
use crate::merge::merge_notes;
use crate::pending::{
    Candidate, PendingConfirmation, PendingKind, PendingStore, ProposedEntity, Verdict,
};
use intents::{FinanceIntent, TxDraft};

/// How many recent entries to pull for matching and shortlisting.
const TX_SCAN_LIMIT: i64 = 100;

/// Confidence a conversation message needs before it becomes a report.
const REPORT_THRESHOLD: f64 = 0.75;

const INTENT_PROMPT: &str = "You parse personal finance requests for a small business owner. \
Amounts are in rand; spending is negative, income positive. Reply with exactly one JSON object \
and nothing else. Schema, one of:\n\
{\"action\":\"add_transaction\",\"description\":\"...\",\"amount\":-123.45,\"category\":\"...\"?,\"notes\":\"...\"?,\"wisdom\":\"one short money tip\"?}\n\
{\"action\":\"edit_transaction\",\"description\":\"...\",\"amount\"?,\"category\"?,\"notes\"?,\"wisdom\"?}\n\
{\"action\":\"delete_transaction\",\"description\":\"...\"}\n\
{\"action\":\"update_account\",\"name\":\"...\",\"balance\"?,\"target\"?,\"wisdom\"?}\n\
{\"action\":\"delete_account\",\"name\":\"...\"}\n\
{\"action\":\"check_goal\",\"name\":\"...\"}\n\
{\"action\":\"summary\"}\n\
{\"action\":\"timeline\"}\n\
{\"action\":\"conversation\"}\n\
Categories: income, groceries, transport, housing, utilities, entertainment, savings, other. \
Use \"conversation\" for anything that isn't a concrete ledger operation.";

const REPORT_CHECK_PROMPT: &str = "Decide whether the user is asking for an overall financial \
health report (how their money is doing, trends, progress) versus ordinary chat. Reply with \
JSON only: {\"intent\":\"report\" or \"chat\",\"confidence\":0.0-1.0}";

const REPORT_PROMPT: &str = "You are a money coach for a small business owner. Given these \
facts about their last 30 days, write a short financial health report in plain language: \
what's going well, what to watch, and one or two concrete suggestions. No markdown headers.";

const CHAT_PROMPT: &str = "You are Tally, a friendly assistant helping a small business owner \
keep track of their money over chat. Keep replies short and concrete.";

#[derive(serde::Deserialize)]
struct ReportCheck {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Finance orchestrator, structurally parallel to the sales service.
#[derive(Clone)]
pub struct FinanceService {
    store: Store,
    exec: AiExecutor,
    classifier: DuplicateClassifier,
    pending: PendingStore,
    history: HistoryStore,
}

impl FinanceService {
    pub fn new(store: Store, exec: AiExecutor, pending: PendingStore, history: HistoryStore) -> Self {
        let classifier = DuplicateClassifier::new(exec.clone());
        Self {
            store,
            exec,
            classifier,
            pending,
            history,
        }
    }

    /// Interpret the message as a reply to a pending finance confirmation.
    /// Bare numbers are not accepted as indexes here — in a money
    /// conversation a lone "2" is more likely an amount.
    pub async fn claim_confirmation(&self, user: &User, text: &str) -> Option<String> {
        let reply = confirm::parse_confirm_reply(text, false)?;
        if !self.pending.exists(&user.id, Domain::Finance).await {
            return None;
        }
        let pending = self.pending.get(&user.id, Domain::Finance).await?;
        let response = self.finish_confirmation(user, pending, reply).await;
        self.history
            .append(&user.id, Some(Domain::Finance), text, &response)
            .await;
        Some(response)
    }

    /// Handle a normal finance message. Always replies; errors are
    /// logged and turned into friendly text here.
    pub async fn handle(&self, user: &User, text: &str) -> String {
        let response = match self.handle_inner(user, text).await {
            Ok(r) => r,
            Err(TallyError::Intent(e)) => {
                warn!("finance: unusable intent for user {}: {e}", user.id);
                "I couldn't work out what you'd like me to do with that. Try something like \
                 \"spent R450 on groceries\" or \"how am I doing this month?\"."
                    .to_string()
            }
            Err(TallyError::NotFound(what, name)) => friendly::not_found(what, &name),
            Err(e) => {
                error!("finance: failed for user {}: {e}", user.id);
                friendly::apology().to_string()
            }
        };
        self.history
            .append(&user.id, Some(Domain::Finance), text, &response)
            .await;
        response
    }

    async fn handle_inner(&self, user: &User, text: &str) -> Result<String, TallyError> {
        let entries = self.history.load(&user.id).await;
        let context = HistoryStore::render(&entries);
        let prompt = if context.is_empty() {
            text.to_string()
        } else {
            format!("Recent conversation:\n{context}\n\nMessage: {text}")
        };

        let intent: FinanceIntent = self.exec.generate_json(INTENT_PROMPT, &prompt).await?;
        match intent {
            FinanceIntent::AddTransaction { draft, wisdom } => {
                self.add_flow(user, draft, wisdom.as_deref()).await
            }
            FinanceIntent::EditTransaction {
                description,
                amount,
                category,
                notes,
                wisdom,
            } => {
                let txs = self.store.recent_transactions(&user.id, TX_SCAN_LIMIT).await?;
                let hit = matcher::find_transaction_loose(&txs, &description)
                    .cloned()
                    .ok_or_else(|| TallyError::NotFound("transaction", description.clone()))?;
                let merged_notes = notes
                    .as_deref()
                    .and_then(|n| merge_notes(hit.notes.as_deref(), n));
                let updated = self
                    .store
                    .update_transaction(
                        &user.id,
                        &hit.id,
                        None,
                        amount,
                        category.as_deref().map(TxCategory::parse),
                        merged_notes.as_deref(),
                    )
                    .await?
                    .ok_or_else(|| TallyError::NotFound("transaction", description))?;
                Ok(format::merged(&updated, false, wisdom.as_deref()))
            }
            FinanceIntent::DeleteTransaction { description } => {
                let txs = self.store.recent_transactions(&user.id, TX_SCAN_LIMIT).await?;
                let hit = matcher::find_transaction_loose(&txs, &description)
                    .cloned()
                    .ok_or_else(|| TallyError::NotFound("transaction", description.clone()))?;
                self.store.delete_transaction(&user.id, &hit.id).await?;
                Ok(format!(
                    "Deleted {} ({}).",
                    hit.description,
                    format::rand(hit.amount)
                ))
            }
            FinanceIntent::UpdateAccount {
                name,
                balance,
                target,
                wisdom,
            } => {
                let account = self.store.upsert_account(&user.id, &name, balance, target).await?;
                let mut out = format!(
                    "{}: balance {}",
                    account.name,
                    format::rand(account.balance)
                );
                if let Some(target) = account.target {
                    out.push_str(&format!(", target {}", format::rand(target)));
                }
                out.push('.');
                if let Some(w) = wisdom.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
                    out.push_str(&format!("\n\n💡 {w}"));
                }
                Ok(out)
            }
            FinanceIntent::DeleteAccount { name } => {
                if self.store.delete_account(&user.id, &name).await? {
                    Ok(format!("Removed the {name} account."))
                } else {
                    Err(TallyError::NotFound("account", name))
                }
            }
            FinanceIntent::CheckGoal { name } => {
                let account = self
                    .store
                    .get_account(&user.id, &name)
                    .await?
                    .ok_or_else(|| TallyError::NotFound("account", name))?;
                Ok(format::goal_progress(&account))
            }
            FinanceIntent::Summary => {
                let (income, spend) = self.store.income_and_spend(&user.id, 30).await?;
                let by_category = self.store.totals_by_category(&user.id, 30).await?;
                let accounts = self.store.list_accounts(&user.id).await?;
                Ok(format::summary(income, spend, &by_category, &accounts))
            }
            FinanceIntent::Timeline => {
                let txs = self.store.recent_transactions(&user.id, 10).await?;
                Ok(format::timeline(&txs))
            }
            FinanceIntent::Conversation => self.conversation_flow(user, text, &context).await,
        }
    }

    /// Add path: matcher first, classifier second, then either a pending
    /// confirmation or a straight insert.
    async fn add_flow(
        &self,
        user: &User,
        draft: TxDraft,
        wisdom: Option<&str>,
    ) -> Result<String, TallyError> {
        if draft.description.trim().is_empty() {
            return Err(TallyError::Intent("add_transaction with empty description".into()));
        }

        let txs = self.store.recent_transactions(&user.id, TX_SCAN_LIMIT).await?;

        // Identical description and amount: almost certainly a retried
        // delivery of the same entry. Merge notes in place.
        if let Some(hit) = matcher::find_transaction(&txs, &draft.description, draft.amount) {
            let hit = hit.clone();
            let merged_notes = draft
                .notes
                .as_deref()
                .and_then(|n| merge_notes(hit.notes.as_deref(), n));
            let updated = self
                .store
                .update_transaction(&user.id, &hit.id, None, None, None, merged_notes.as_deref())
                .await?
                .ok_or_else(|| TallyError::NotFound("transaction", draft.description.clone()))?;
            return Ok(format::merged(&updated, true, wisdom));
        }

        let shortlist = format::tx_candidates(&txs, SHORTLIST_LIMIT);
        let duplicate_checked = !shortlist.is_empty();
        let verdict = self
            .classifier
            .classify(&format::describe_draft(&draft), &shortlist)
            .await;

        if verdict.verdict == Verdict::Duplicate {
            let candidates = pick_candidates(&txs, &draft, verdict.matched_label.as_deref());
            let prompt = format::duplicate_prompt(&draft, &verdict, &candidates);
            let pending = PendingConfirmation::new(
                PendingKind::DuplicateTransaction,
                ProposedEntity::Transaction(draft),
                verdict,
                candidates,
            );
            self.pending.store(&user.id, Domain::Finance, &pending).await;
            return Ok(prompt);
        }

        let tx = self.create_from_draft(user, &draft).await?;
        Ok(format::recorded(&tx, wisdom, duplicate_checked))
    }

    async fn conversation_flow(
        &self,
        user: &User,
        text: &str,
        context: &str,
    ) -> Result<String, TallyError> {
        let check = self
            .exec
            .generate_json::<ReportCheck>(REPORT_CHECK_PROMPT, text)
            .await
            .ok();
        let wants_report = check
            .map(|c| c.intent == "report" && c.confidence.unwrap_or(0.0) >= REPORT_THRESHOLD)
            .unwrap_or(false);

        if wants_report {
            let (income, spend) = self.store.income_and_spend(&user.id, 30).await?;
            let by_category = self.store.totals_by_category(&user.id, 30).await?;
            let accounts = self.store.list_accounts(&user.id).await?;
            let facts = format::summary(income, spend, &by_category, &accounts);
            return match self.exec.generate(REPORT_PROMPT, &facts).await {
                Ok(report) => Ok(report),
                Err(e) => {
                    warn!("finance: report synthesis failed, using fallback: {e}");
                    Ok(format::fallback_report(income, spend, &by_category, &accounts))
                }
            };
        }

        let prompt = if context.is_empty() {
            text.to_string()
        } else {
            format!("Recent conversation:\n{context}\n\nMessage: {text}")
        };
        self.exec.generate(CHAT_PROMPT, &prompt).await
    }

    /// Resolve a confirmation reply against the parked state.
    async fn finish_confirmation(
        &self,
        user: &User,
        pending: PendingConfirmation,
        reply: ConfirmReply,
    ) -> String {
        match reply {
            ConfirmReply::CreateNew => {
                self.pending.clear(&user.id, Domain::Finance).await;
                let ProposedEntity::Transaction(draft) = pending.proposed else {
                    error!("finance: pending confirmation holds a non-transaction entity");
                    return friendly::apology().to_string();
                };
                match self.create_from_draft(user, &draft).await {
                    Ok(tx) => format::recorded_separately(&tx),
                    Err(e) => {
                        error!("finance: confirmed create failed for user {}: {e}", user.id);
                        friendly::apology().to_string()
                    }
                }
            }
            ConfirmReply::UpdateExisting(index) => {
                self.pending.clear(&user.id, Domain::Finance).await;
                let Some(candidate) = confirm::resolve_index(&pending.candidates, index) else {
                    return "I couldn't find that option — nothing was changed. \
                            Tell me about the transaction again if you'd like to retry."
                        .to_string();
                };
                let ProposedEntity::Transaction(draft) = &pending.proposed else {
                    error!("finance: pending confirmation holds a non-transaction entity");
                    return friendly::apology().to_string();
                };
                match self.merge_into_candidate(user, candidate, draft).await {
                    Ok(tx) => format::merged(&tx, false, None),
                    Err(TallyError::NotFound(what, name)) => friendly::not_found(what, &name),
                    Err(e) => {
                        error!("finance: confirmed merge failed for user {}: {e}", user.id);
                        friendly::apology().to_string()
                    }
                }
            }
            ConfirmReply::ShowDetails(index) => {
                // Read-only: the confirmation stays pending.
                let Some(candidate) = confirm::resolve_index(&pending.candidates, index) else {
                    return "I couldn't find that option — reply \"show 1\", \"update\", \
                            \"yes\" or \"cancel\"."
                        .to_string();
                };
                match self.store.get_transaction(&user.id, &candidate.id).await {
                    Ok(Some(tx)) => format::detail_with_hint(&tx),
                    Ok(None) => friendly::not_found("transaction", &candidate.label),
                    Err(e) => {
                        error!("finance: detail lookup failed for user {}: {e}", user.id);
                        friendly::apology().to_string()
                    }
                }
            }
            ConfirmReply::Cancel => {
                self.pending.clear(&user.id, Domain::Finance).await;
                "No problem — nothing was saved.".to_string()
            }
        }
    }

    async fn merge_into_candidate(
        &self,
        user: &User,
        candidate: &Candidate,
        draft: &TxDraft,
    ) -> Result<Transaction, TallyError> {
        let tx = self
            .store
            .get_transaction(&user.id, &candidate.id)
            .await?
            .ok_or_else(|| TallyError::NotFound("transaction", candidate.label.clone()))?;
        let merged_notes = draft
            .notes
            .as_deref()
            .and_then(|n| merge_notes(tx.notes.as_deref(), n));
        // A confirmed merge adopts the proposed description and amount;
        // only notes are merged rather than replaced.
        let description = Some(draft.description.trim()).filter(|d| !d.is_empty());
        self.store
            .update_transaction(
                &user.id,
                &tx.id,
                description,
                Some(draft.amount),
                draft.category.as_deref().map(TxCategory::parse),
                merged_notes.as_deref(),
            )
            .await?
            .ok_or_else(|| TallyError::NotFound("transaction", candidate.label.clone()))
    }

    async fn create_from_draft(
        &self,
        user: &User,
        draft: &TxDraft,
    ) -> Result<Transaction, TallyError> {
        let category = draft
            .category
            .as_deref()
            .map(TxCategory::parse)
            .unwrap_or(TxCategory::Other);
        self.store
            .add_transaction(
                &user.id,
                draft.description.trim(),
                draft.amount,
                category,
                draft.notes.as_deref(),
            )
            .await
    }
}

/// Choose up to three candidate entries for the disambiguation list.
fn pick_candidates(txs: &[Transaction], draft: &TxDraft, matched_label: Option<&str>) -> Vec<Candidate> {
    let mut picked: Vec<&Transaction> = Vec::new();

    if let Some(label) = matched_label {
        if let Some(hit) = txs.iter().find(|t| t.description.eq_ignore_ascii_case(label)) {
            picked.push(hit);
        }
    }

    let description = draft.description.to_lowercase();
    let tokens: Vec<&str> = description.split_whitespace().filter(|t| t.len() >= 3).collect();
    for tx in txs {
        if picked.len() >= 3 {
            break;
        }
        if picked.iter().any(|p| p.id == tx.id) {
            continue;
        }
        let existing = tx.description.to_lowercase();
        if tokens.iter().any(|t| existing.contains(t)) || tx.amount == draft.amount {
            picked.push(tx);
        }
    }

    if picked.is_empty() {
        picked = txs.iter().take(3).collect();
    }
    picked.truncate(3);

    picked
        .into_iter()
        .map(|t| Candidate {
            id: t.id.clone(),
            label: t.description.clone(),
            detail: format!("{}, {}", format::rand(t.amount), t.category),
            created_at: t.created_at.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(id: &str, description: &str, amount: f64) -> Transaction {
        Transaction {
            id: id.into(),
            user_id: "u1".into(),
            description: description.into(),
            amount,
            category: TxCategory::Other,
            notes: None,
            created_at: "2026-08-29 10:00:00".into(),
        }
    }

    #[test]
    fn test_pick_candidates_matches_label_then_amount() {
        let txs = vec![
            tx("t1", "Petrol", -500.0),
            tx("t2", "Groceries", -89.5),
            tx("t3", "Coffee", -89.5),
        ];
        let draft = TxDraft {
            description: "Woolworths".into(),
            amount: -89.5,
            ..Default::default()
        };
        let candidates = pick_candidates(&txs, &draft, Some("Groceries"));
        assert_eq!(candidates[0].label, "Groceries");
        // Same-amount entry is also offered.
        assert!(candidates.iter().any(|c| c.label == "Coffee"));
        assert!(!candidates.iter().any(|c| c.label == "Petrol"));
    }
}
