//! Structured sales intents parsed from free text by the AI provider.

use serde::{Deserialize, Serialize};

/// Fields for a lead the user wants to create or merge. Partial by
/// nature — the user rarely gives more than a name and one detail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadDraft {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One variant per action the sales prompt schema allows. The formatter
/// matches exhaustively, so an unknown action fails at parse time, not
/// somewhere downstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SalesIntent {
    CreateLead {
        #[serde(flatten)]
        draft: LeadDraft,
        #[serde(default)]
        wisdom: Option<String>,
    },
    UpdateLead {
        name: String,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        wisdom: Option<String>,
    },
    ViewLead {
        name: String,
    },
    QueryLeads {
        #[serde(default)]
        status: Option<String>,
    },
    DeleteLead {
        name: String,
    },
    Summary,
    Conversation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lead_with_partial_fields() {
        let json = r#"{"action":"create_lead","name":"Acme Corp","notes":"wants a demo"}"#;
        let intent: SalesIntent = serde_json::from_str(json).unwrap();
        match intent {
            SalesIntent::CreateLead { draft, wisdom } => {
                assert_eq!(draft.name, "Acme Corp");
                assert_eq!(draft.notes.as_deref(), Some("wants a demo"));
                assert!(draft.phone.is_none());
                assert!(wisdom.is_none());
            }
            other => panic!("wrong intent: {other:?}"),
        }
    }

    #[test]
    fn test_update_lead_with_wisdom() {
        let json = r#"{"action":"update_lead","name":"Sipho","status":"Contacted","wisdom":"Follow up within 48 hours."}"#;
        let intent: SalesIntent = serde_json::from_str(json).unwrap();
        match intent {
            SalesIntent::UpdateLead { name, status, wisdom, .. } => {
                assert_eq!(name, "Sipho");
                assert_eq!(status.as_deref(), Some("Contacted"));
                assert!(wisdom.is_some());
            }
            other => panic!("wrong intent: {other:?}"),
        }
    }

    #[test]
    fn test_unit_actions_parse() {
        assert!(matches!(
            serde_json::from_str::<SalesIntent>(r#"{"action":"summary"}"#).unwrap(),
            SalesIntent::Summary
        ));
        assert!(matches!(
            serde_json::from_str::<SalesIntent>(r#"{"action":"conversation"}"#).unwrap(),
            SalesIntent::Conversation
        ));
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        assert!(serde_json::from_str::<SalesIntent>(r#"{"action":"launch_rocket"}"#).is_err());
    }
}
