//! Structured finance intents parsed from free text by the AI provider.

use serde::{Deserialize, Serialize};

/// Fields for a ledger entry the user wants to record. Amount is signed:
/// income positive, spend negative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxDraft {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One variant per action the finance prompt schema allows.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FinanceIntent {
    AddTransaction {
        #[serde(flatten)]
        draft: TxDraft,
        #[serde(default)]
        wisdom: Option<String>,
    },
    EditTransaction {
        description: String,
        #[serde(default)]
        amount: Option<f64>,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        wisdom: Option<String>,
    },
    DeleteTransaction {
        description: String,
    },
    UpdateAccount {
        name: String,
        #[serde(default)]
        balance: Option<f64>,
        #[serde(default)]
        target: Option<f64>,
        #[serde(default)]
        wisdom: Option<String>,
    },
    DeleteAccount {
        name: String,
    },
    CheckGoal {
        name: String,
    },
    Summary,
    Timeline,
    Conversation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_transaction_with_signed_amount() {
        let json = r#"{"action":"add_transaction","description":"Woolworths","amount":-89.5,"category":"groceries"}"#;
        let intent: FinanceIntent = serde_json::from_str(json).unwrap();
        match intent {
            FinanceIntent::AddTransaction { draft, .. } => {
                assert_eq!(draft.description, "Woolworths");
                assert_eq!(draft.amount, -89.5);
                assert_eq!(draft.category.as_deref(), Some("groceries"));
            }
            other => panic!("wrong intent: {other:?}"),
        }
    }

    #[test]
    fn test_update_account_partial() {
        let json = r#"{"action":"update_account","name":"Emergency Fund","target":5000}"#;
        let intent: FinanceIntent = serde_json::from_str(json).unwrap();
        match intent {
            FinanceIntent::UpdateAccount { name, balance, target, .. } => {
                assert_eq!(name, "Emergency Fund");
                assert!(balance.is_none());
                assert_eq!(target, Some(5000.0));
            }
            other => panic!("wrong intent: {other:?}"),
        }
    }

    #[test]
    fn test_unit_actions_parse() {
        for (json, ok) in [
            (r#"{"action":"summary"}"#, true),
            (r#"{"action":"timeline"}"#, true),
            (r#"{"action":"check_goal","name":"Savings"}"#, true),
            (r#"{"action":"transfer_funds"}"#, false),
        ] {
            assert_eq!(serde_json::from_str::<FinanceIntent>(json).is_ok(), ok, "{json}");
        }
    }
}
