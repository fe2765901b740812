//! Conversation router: pending-confirmation claims first, then
//! AI domain classification, then dispatch.

use serde::Deserialize;
use tally_core::message::Inbound;
use tally_providers::{friendly, AiExecutor};
use tally_services::history::HistoryStore;
use tally_services::{FinanceService, SalesService};
use tally_store::models::User;
use tally_store::Store;
use tracing::{error, info, warn};

const DOMAIN_PROMPT: &str = "Route a chat message to the right assistant. \"sales\" covers \
leads, customers and the pipeline; \"finance\" covers money, transactions, accounts and \
savings goals; \"general\" is everything else. Reply with JSON only: \
{\"domain\":\"sales\" or \"finance\" or \"general\"}";

const CHAT_PROMPT: &str = "You are Tally, a friendly chat assistant for a small business \
owner. You can track sales leads and money when asked. Keep replies short and warm.";

#[derive(Deserialize)]
struct DomainPick {
    domain: String,
}

/// Top-level per-message dispatcher. Always produces a reply.
pub struct Router {
    store: Store,
    exec: AiExecutor,
    sales: SalesService,
    finance: FinanceService,
    history: HistoryStore,
}

impl Router {
    pub fn new(
        store: Store,
        exec: AiExecutor,
        sales: SalesService,
        finance: FinanceService,
        history: HistoryStore,
    ) -> Self {
        Self {
            store,
            exec,
            sales,
            finance,
            history,
        }
    }

    /// Handle one inbound message end to end.
    pub async fn handle(&self, inbound: &Inbound) -> String {
        let (user, created) = match self
            .store
            .ensure_user(
                &inbound.platform,
                &inbound.chat_id,
                inbound.sender_name.as_deref(),
            )
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                error!("router: onboarding failed for {} message: {e}", inbound.platform);
                return friendly::apology().to_string();
            }
        };

        info!(
            "router: {} message from user {} ({} chars)",
            inbound.platform,
            user.id,
            inbound.text.len()
        );

        let response = self.dispatch(&user, &inbound.text).await;
        if created {
            let name = user
                .display_name
                .clone()
                .unwrap_or_else(|| "there".to_string());
            format!(
                "Hi {name}! I'm Tally — I keep track of your sales leads and your money. \
                 Just talk to me normally.\n\n{response}"
            )
        } else {
            response
        }
    }

    async fn dispatch(&self, user: &User, text: &str) -> String {
        // A short reply may be resolving a pending duplicate question.
        // Sales first; a bare number is only meaningful there.
        if let Some(response) = self.sales.claim_confirmation(user, text).await {
            return response;
        }
        if let Some(response) = self.finance.claim_confirmation(user, text).await {
            return response;
        }

        let domain = match self
            .exec
            .generate_json::<DomainPick>(DOMAIN_PROMPT, text)
            .await
        {
            Ok(pick) => pick.domain,
            Err(e) => {
                warn!("router: domain classification failed for user {}: {e}", user.id);
                "general".to_string()
            }
        };

        match domain.as_str() {
            "sales" => self.sales.handle(user, text).await,
            "finance" => self.finance.handle(user, text).await,
            _ => self.general_chat(user, text).await,
        }
    }

    async fn general_chat(&self, user: &User, text: &str) -> String {
        let entries = self.history.load(&user.id).await;
        let context = HistoryStore::render(&entries);
        let prompt = if context.is_empty() {
            text.to_string()
        } else {
            format!("Recent conversation:\n{context}\n\nMessage: {text}")
        };

        let response = match self.exec.generate(CHAT_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("router: general chat failed for user {}: {e}", user.id);
                friendly::apology().to_string()
            }
        };
        self.history.append(&user.id, None, text, &response).await;
        response
    }
}
