//! Durable record types, mapped one-to-one onto the SQLite schema.

use serde::{Deserialize, Serialize};

/// A chat user, onboarded lazily on first inbound message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub platform: String,
    pub chat_id: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

/// Lead lifecycle status.
///
/// Forward-biased (New → … → Closed) but transitions are not enforced;
/// any status may be set by an update. Name/phone collisions are resolved
/// by the duplicate classifier, not a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum LeadStatus {
    New,
    Contacted,
    Replied,
    Interested,
    Waiting,
    #[serde(rename = "Proposal Sent")]
    #[sqlx(rename = "Proposal Sent")]
    ProposalSent,
    #[serde(rename = "Closed-Won")]
    #[sqlx(rename = "Closed-Won")]
    ClosedWon,
    #[serde(rename = "Closed-Lost")]
    #[sqlx(rename = "Closed-Lost")]
    ClosedLost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Replied => "Replied",
            Self::Interested => "Interested",
            Self::Waiting => "Waiting",
            Self::ProposalSent => "Proposal Sent",
            Self::ClosedWon => "Closed-Won",
            Self::ClosedLost => "Closed-Lost",
        }
    }

    /// Lenient parse for AI-supplied status strings.
    ///
    /// Matches on lowercased alphanumerics only so "proposal_sent",
    /// "Proposal Sent" and "proposalsent" all resolve the same way.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "new" => Some(Self::New),
            "contacted" => Some(Self::Contacted),
            "replied" => Some(Self::Replied),
            "interested" => Some(Self::Interested),
            "waiting" => Some(Self::Waiting),
            "proposalsent" | "proposal" => Some(Self::ProposalSent),
            "closedwon" | "won" => Some(Self::ClosedWon),
            "closedlost" | "lost" => Some(Self::ClosedLost),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CRM lead.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Ledger entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TxCategory {
    Income,
    Groceries,
    Transport,
    Housing,
    Utilities,
    Entertainment,
    Savings,
    Other,
}

impl TxCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Groceries => "groceries",
            Self::Transport => "transport",
            Self::Housing => "housing",
            Self::Utilities => "utilities",
            Self::Entertainment => "entertainment",
            Self::Savings => "savings",
            Self::Other => "other",
        }
    }

    /// Lenient parse for AI-supplied category strings; unknown → Other.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "income" | "salary" => Self::Income,
            "groceries" | "food" => Self::Groceries,
            "transport" | "fuel" | "petrol" => Self::Transport,
            "housing" | "rent" => Self::Housing,
            "utilities" => Self::Utilities,
            "entertainment" => Self::Entertainment,
            "savings" => Self::Savings,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for TxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger entry. Amounts are signed: income positive, spend negative.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub amount: f64,
    pub category: TxCategory,
    pub notes: Option<String>,
    pub created_at: String,
}

/// A named balance with an optional savings target.
/// Names are unique per user and serve as the upsert key.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub balance: f64,
    pub target: Option<f64>,
    pub updated_at: String,
}

/// Record of a digest delivery attempt. Failures are recorded, not retried.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub status: String,
    pub error: Option<String>,
    pub sent_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_status_roundtrip() {
        for s in [
            LeadStatus::New,
            LeadStatus::ProposalSent,
            LeadStatus::ClosedWon,
        ] {
            assert_eq!(LeadStatus::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn test_lead_status_lenient_parse() {
        assert_eq!(LeadStatus::parse("proposal_sent"), Some(LeadStatus::ProposalSent));
        assert_eq!(LeadStatus::parse("closed-won"), Some(LeadStatus::ClosedWon));
        assert_eq!(LeadStatus::parse("WON"), Some(LeadStatus::ClosedWon));
        assert_eq!(LeadStatus::parse("garbage"), None);
    }

    #[test]
    fn test_tx_category_parse() {
        assert_eq!(TxCategory::parse("Groceries"), TxCategory::Groceries);
        assert_eq!(TxCategory::parse("petrol"), TxCategory::Transport);
        assert_eq!(TxCategory::parse("mystery"), TxCategory::Other);
    }

    #[test]
    fn test_lead_status_serde_display_names() {
        assert_eq!(
            serde_json::to_string(&LeadStatus::ProposalSent).unwrap(),
            "\"Proposal Sent\""
        );
        assert_eq!(
            serde_json::to_string(&LeadStatus::ClosedLost).unwrap(),
            "\"Closed-Lost\""
        );
    }
}
