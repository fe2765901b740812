//! Sales domain service: CRM over chat.

pub mod intents;
mod format;

use tally_core::error::TallyError;
use tally_core::message::Domain;
use tally_providers::{friendly, AiExecutor};
use tally_store::models::{Lead, LeadStatus, User};
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
use intents::{LeadDraft, SalesIntent};

/// How many leads to pull for matching and shortlisting.
const LEAD_SCAN_LIMIT: i64 = 200;

/// Confidence a conversation message needs before it becomes a report.
const REPORT_THRESHOLD: f64 = 0.75;

const INTENT_PROMPT: &str = "You parse CRM requests for a small business. Reply with exactly one \
JSON object and nothing else. Schema, one of:\n\
{\"action\":\"create_lead\",\"name\":\"...\",\"phone\":\"...\"?,\"email\":\"...\"?,\"status\":\"...\"?,\"notes\":\"...\"?,\"wisdom\":\"one short sales tip\"?}\n\
{\"action\":\"update_lead\",\"name\":\"...\",\"phone\"?,\"email\"?,\"status\"?,\"notes\"?,\"wisdom\"?}\n\
{\"action\":\"view_lead\",\"name\":\"...\"}\n\
{\"action\":\"query_leads\",\"status\":\"...\"?}\n\
{\"action\":\"delete_lead\",\"name\":\"...\"}\n\
{\"action\":\"summary\"}\n\
{\"action\":\"conversation\"}\n\
Statuses: New, Contacted, Replied, Interested, Waiting, Proposal Sent, Closed-Won, Closed-Lost. \
Use \"conversation\" for anything that isn't a concrete CRM operation.";

const REPORT_CHECK_PROMPT: &str = "Decide whether the user is asking for an overall pipeline \
progress report (aggregate health, trends, how things are going) versus ordinary chat. Reply \
with JSON only: {\"intent\":\"report\" or \"chat\",\"confidence\":0.0-1.0}";

const REPORT_PROMPT: &str = "You are a sales coach for a small business owner. Given these \
pipeline facts, write a short progress report in plain language: what's healthy, what's stalling, \
and one or two concrete next steps. No markdown headers.";

const CHAT_PROMPT: &str = "You are Tally, a friendly assistant helping a small business owner \
with their sales pipeline over chat. Keep replies short and concrete.";

#[derive(serde::Deserialize)]
struct ReportCheck {
    intent: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Sales orchestrator: intent parsing, duplicate handling, persistence
/// and response formatting.
#[derive(Clone)]
pub struct SalesService {
    store: Store,
    exec: AiExecutor,
    classifier: DuplicateClassifier,
    pending: PendingStore,
    history: HistoryStore,
}

impl SalesService {
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

    /// Interpret the message as a reply to a pending sales confirmation.
    /// Returns `None` when there is nothing to claim and the message
    /// should flow through normal handling.
    pub async fn claim_confirmation(&self, user: &User, text: &str) -> Option<String> {
        let reply = confirm::parse_confirm_reply(text, true)?;
        if !self.pending.exists(&user.id, Domain::Sales).await {
            return None;
        }
        let pending = self.pending.get(&user.id, Domain::Sales).await?;
        let response = self.finish_confirmation(user, pending, reply).await;
        self.history
            .append(&user.id, Some(Domain::Sales), text, &response)
            .await;
        Some(response)
    }

    /// Handle a normal (non-confirmation) sales message. Always replies;
    /// errors are logged and turned into friendly text here.
    pub async fn handle(&self, user: &User, text: &str) -> String {
        let response = match self.handle_inner(user, text).await {
            Ok(r) => r,
            Err(TallyError::Intent(e)) => {
                warn!("sales: unusable intent for user {}: {e}", user.id);
                "I couldn't work out what you'd like me to do with that. Try something like \
                 \"new lead Acme Corp, 082 123 4567\" or \"show my pipeline\"."
                    .to_string()
            }
            Err(TallyError::NotFound(what, name)) => friendly::not_found(what, &name),
            Err(e) => {
                error!("sales: failed for user {}: {e}", user.id);
                friendly::apology().to_string()
            }
        };
        self.history
            .append(&user.id, Some(Domain::Sales), text, &response)
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

        let intent: SalesIntent = self.exec.generate_json(INTENT_PROMPT, &prompt).await?;
        match intent {
            SalesIntent::CreateLead { draft, wisdom } => {
                self.create_flow(user, draft, wisdom.as_deref()).await
            }
            SalesIntent::UpdateLead {
                name,
                phone,
                email,
                status,
                notes,
                wisdom,
            } => {
                let leads = self.store.list_leads(&user.id, LEAD_SCAN_LIMIT).await?;
                let hit = matcher::find_lead(&leads, &name, phone.as_deref())
                    .cloned()
                    .ok_or_else(|| TallyError::NotFound("lead", name.clone()))?;
                let draft = LeadDraft {
                    name,
                    phone,
                    email,
                    status,
                    notes,
                };
                let updated = self.apply_merge(user, &hit, &draft, None).await?;
                Ok(format::merged(&updated, false, wisdom.as_deref()))
            }
            SalesIntent::ViewLead { name } => {
                let leads = self.store.list_leads(&user.id, LEAD_SCAN_LIMIT).await?;
                let hit = matcher::find_lead(&leads, &name, None)
                    .ok_or_else(|| TallyError::NotFound("lead", name.clone()))?;
                Ok(format::detail(hit))
            }
            SalesIntent::QueryLeads { status } => match status {
                Some(raw) => {
                    let Some(status) = LeadStatus::parse(&raw) else {
                        return Ok(format!(
                            "I don't know the status \"{raw}\". Use New, Contacted, Replied, \
                             Interested, Waiting, Proposal Sent, Closed-Won or Closed-Lost."
                        ));
                    };
                    let leads = self.store.list_leads_by_status(&user.id, status).await?;
                    Ok(format::lead_list(&format!("{status} leads"), &leads))
                }
                None => {
                    let leads = self.store.list_leads(&user.id, 20).await?;
                    Ok(format::lead_list("Your leads", &leads))
                }
            },
            SalesIntent::DeleteLead { name } => {
                let leads = self.store.list_leads(&user.id, LEAD_SCAN_LIMIT).await?;
                let hit = matcher::find_lead(&leads, &name, None)
                    .cloned()
                    .ok_or_else(|| TallyError::NotFound("lead", name.clone()))?;
                self.store.delete_lead(&user.id, &hit.id).await?;
                Ok(format!("Removed {} from your pipeline.", hit.name))
            }
            SalesIntent::Summary => {
                let counts = self.store.count_leads_by_status(&user.id).await?;
                Ok(format::summary(&counts))
            }
            SalesIntent::Conversation => self.conversation_flow(user, text, &context).await,
        }
    }

    /// Create path: matcher first, classifier second, then either a
    /// pending confirmation or a straight create.
    async fn create_flow(
        &self,
        user: &User,
        draft: LeadDraft,
        wisdom: Option<&str>,
    ) -> Result<String, TallyError> {
        if draft.name.trim().is_empty() {
            return Err(TallyError::Intent("create_lead with empty name".into()));
        }

        let leads = self.store.list_leads(&user.id, LEAD_SCAN_LIMIT).await?;

        // Exact or phone hit: the user re-mentioned a known contact.
        // Merge in place; no AI call, no confirmation.
        if let Some(hit) = matcher::find_lead(&leads, &draft.name, draft.phone.as_deref()) {
            let hit = hit.clone();
            let updated = self.apply_merge(user, &hit, &draft, None).await?;
            return Ok(format::merged(&updated, true, wisdom));
        }

        let shortlist = format::lead_candidates(&leads, SHORTLIST_LIMIT);
        let duplicate_checked = !shortlist.is_empty();
        let verdict = self
            .classifier
            .classify(&format::describe_draft(&draft), &shortlist)
            .await;

        if verdict.verdict == Verdict::Duplicate {
            let candidates = pick_candidates(&leads, &draft, verdict.matched_label.as_deref());
            let prompt = format::duplicate_prompt(&draft.name, &verdict, &candidates);
            let pending = PendingConfirmation::new(
                PendingKind::DuplicateLead,
                ProposedEntity::Lead(draft),
                verdict,
                candidates,
            );
            self.pending.store(&user.id, Domain::Sales, &pending).await;
            return Ok(prompt);
        }

        let lead = self.create_from_draft(user, &draft).await?;
        Ok(format::created(&lead, wisdom, duplicate_checked))
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
            let counts = self.store.count_leads_by_status(&user.id).await?;
            let recent = self.store.list_leads(&user.id, 10).await?;
            let facts = format!(
                "{}\n\nRecent leads:\n{}",
                format::summary(&counts),
                recent
                    .iter()
                    .map(|l| format!("- {} ({}, added {})", l.name, l.status, l.created_at))
                    .collect::<Vec<_>>()
                    .join("\n")
            );
            return match self.exec.generate(REPORT_PROMPT, &facts).await {
                Ok(report) => Ok(report),
                Err(e) => {
                    warn!("sales: report synthesis failed, using fallback: {e}");
                    Ok(format::fallback_report(&counts, &recent))
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
                self.pending.clear(&user.id, Domain::Sales).await;
                let ProposedEntity::Lead(draft) = pending.proposed else {
                    error!("sales: pending confirmation holds a non-lead entity");
                    return friendly::apology().to_string();
                };
                match self.create_from_draft(user, &draft).await {
                    Ok(lead) => format::created_separately(&lead),
                    Err(e) => {
                        error!("sales: confirmed create failed for user {}: {e}", user.id);
                        friendly::apology().to_string()
                    }
                }
            }
            ConfirmReply::UpdateExisting(index) => {
                // Cleared up front so a bad index can't strand the user
                // against stale state.
                self.pending.clear(&user.id, Domain::Sales).await;
                let Some(candidate) = confirm::resolve_index(&pending.candidates, index) else {
                    return "I couldn't find that option — nothing was changed. \
                            Tell me about the lead again if you'd like to retry."
                        .to_string();
                };
                let ProposedEntity::Lead(draft) = &pending.proposed else {
                    error!("sales: pending confirmation holds a non-lead entity");
                    return friendly::apology().to_string();
                };
                match self.merge_into_candidate(user, candidate, draft).await {
                    Ok(lead) => format::merged(&lead, false, None),
                    Err(TallyError::NotFound(what, name)) => friendly::not_found(what, &name),
                    Err(e) => {
                        error!("sales: confirmed merge failed for user {}: {e}", user.id);
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
                match self.store.get_lead(&user.id, &candidate.id).await {
                    Ok(Some(lead)) => format::detail_with_hint(&lead),
                    Ok(None) => friendly::not_found("lead", &candidate.label),
                    Err(e) => {
                        error!("sales: detail lookup failed for user {}: {e}", user.id);
                        friendly::apology().to_string()
                    }
                }
            }
            ConfirmReply::Cancel => {
                self.pending.clear(&user.id, Domain::Sales).await;
                "No problem — nothing was saved.".to_string()
            }
        }
    }

    async fn merge_into_candidate(
        &self,
        user: &User,
        candidate: &Candidate,
        draft: &LeadDraft,
    ) -> Result<Lead, TallyError> {
        let lead = self
            .store
            .get_lead(&user.id, &candidate.id)
            .await?
            .ok_or_else(|| TallyError::NotFound("lead", candidate.label.clone()))?;
        // A confirmed merge adopts the proposed name along with the
        // other fields; only notes are merged rather than replaced.
        self.apply_merge(user, &lead, draft, Some(draft.name.trim()))
            .await
    }

    /// Merge draft fields into an existing lead. Present fields overwrite;
    /// notes append idempotently. The name is replaced only when the
    /// caller passes one — matcher hits keep the stored name, since the
    /// name was the lookup key.
    async fn apply_merge(
        &self,
        user: &User,
        lead: &Lead,
        draft: &LeadDraft,
        new_name: Option<&str>,
    ) -> Result<Lead, TallyError> {
        let status = draft.status.as_deref().and_then(LeadStatus::parse);
        let notes = draft
            .notes
            .as_deref()
            .and_then(|n| merge_notes(lead.notes.as_deref(), n));
        self.store
            .update_lead(
                &user.id,
                &lead.id,
                new_name.filter(|n| !n.is_empty()),
                draft.phone.as_deref(),
                draft.email.as_deref(),
                status,
                notes.as_deref(),
            )
            .await?
            .ok_or_else(|| TallyError::NotFound("lead", lead.name.clone()))
    }

    async fn create_from_draft(&self, user: &User, draft: &LeadDraft) -> Result<Lead, TallyError> {
        let status = draft
            .status
            .as_deref()
            .and_then(LeadStatus::parse)
            .unwrap_or(LeadStatus::New);
        self.store
            .create_lead(
                &user.id,
                draft.name.trim(),
                draft.phone.as_deref(),
                draft.email.as_deref(),
                status,
                draft.notes.as_deref(),
            )
            .await
    }
}

/// Choose up to three candidates for the disambiguation list: the
/// classifier's match first, then leads sharing a name token, newest
/// first. Falls back to the most recent leads so the list is never empty.
fn pick_candidates(leads: &[Lead], draft: &LeadDraft, matched_label: Option<&str>) -> Vec<Candidate> {
    let mut picked: Vec<&Lead> = Vec::new();

    if let Some(label) = matched_label {
        if let Some(hit) = leads.iter().find(|l| l.name.eq_ignore_ascii_case(label)) {
            picked.push(hit);
        }
    }

    let name = draft.name.to_lowercase();
    let tokens: Vec<&str> = name.split_whitespace().filter(|t| t.len() >= 3).collect();
    for lead in leads {
        if picked.len() >= 3 {
            break;
        }
        if picked.iter().any(|p| p.id == lead.id) {
            continue;
        }
        let existing = lead.name.to_lowercase();
        if tokens.iter().any(|t| existing.contains(t)) {
            picked.push(lead);
        }
    }

    if picked.is_empty() {
        picked = leads.iter().take(3).collect();
    }
    picked.truncate(3);

    picked
        .into_iter()
        .map(|l| Candidate {
            id: l.id.clone(),
            label: l.name.clone(),
            detail: format!("status {}", l.status),
            created_at: l.created_at.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(id: &str, name: &str) -> Lead {
        Lead {
            id: id.into(),
            user_id: "u1".into(),
            name: name.into(),
            phone: None,
            email: None,
            status: LeadStatus::New,
            notes: None,
            created_at: "2026-08-01 09:00:00".into(),
            updated_at: "2026-08-01 09:00:00".into(),
        }
    }

    #[test]
    fn test_pick_candidates_puts_classifier_match_first() {
        let leads = vec![
            lead("l1", "Acme Corp"),
            lead("l2", "Dandrom Guest House"),
            lead("l3", "Guest Services CC"),
        ];
        let draft = LeadDraft {
            name: "Dan's Guest House".into(),
            ..Default::default()
        };
        let candidates = pick_candidates(&leads, &draft, Some("Dandrom Guest House"));
        assert_eq!(candidates[0].label, "Dandrom Guest House");
        // "Guest" token also pulls in the other guest-related lead.
        assert!(candidates.iter().any(|c| c.label == "Guest Services CC"));
        assert!(candidates.len() <= 3);
    }

    #[test]
    fn test_pick_candidates_never_empty_when_leads_exist() {
        let leads = vec![lead("l1", "Acme Corp")];
        let draft = LeadDraft {
            name: "Zebra Industries".into(),
            ..Default::default()
        };
        let candidates = pick_candidates(&leads, &draft, None);
        assert_eq!(candidates.len(), 1);
    }
}
