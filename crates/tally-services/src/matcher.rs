//! Deterministic entity matching.
//!
//! Runs before any classifier call: exact and substring hits are cheap
//! and unambiguous, so they never incur an AI round trip.

use tally_store::models::{Account, Lead, Transaction};

/// Resolve a lead by, in order: case-insensitive exact name, exact phone,
/// case-insensitive substring (either direction). First hit wins.
pub fn find_lead<'a>(leads: &'a [Lead], name: &str, phone: Option<&str>) -> Option<&'a Lead> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(hit) = leads.iter().find(|l| l.name.to_lowercase() == needle) {
        return Some(hit);
    }

    if let Some(phone) = phone.filter(|p| !p.trim().is_empty()) {
        if let Some(hit) = leads
            .iter()
            .find(|l| l.phone.as_deref() == Some(phone.trim()))
        {
            return Some(hit);
        }
    }

    leads.iter().find(|l| {
        let existing = l.name.to_lowercase();
        existing.contains(&needle) || needle.contains(&existing)
    })
}

/// Resolve a transaction by case-insensitive exact description plus the
/// same amount. Used to absorb retried webhook deliveries of one entry.
pub fn find_transaction<'a>(
    txs: &'a [Transaction],
    description: &str,
    amount: f64,
) -> Option<&'a Transaction> {
    let needle = description.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    txs.iter()
        .find(|t| t.description.to_lowercase() == needle && t.amount == amount)
}

/// Resolve a transaction loosely by description substring, newest first.
/// Used for edit/delete where the user paraphrases the entry.
pub fn find_transaction_loose<'a>(
    txs: &'a [Transaction],
    description: &str,
) -> Option<&'a Transaction> {
    let needle = description.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(hit) = txs.iter().find(|t| t.description.to_lowercase() == needle) {
        return Some(hit);
    }
    txs.iter().find(|t| {
        let existing = t.description.to_lowercase();
        existing.contains(&needle) || needle.contains(&existing)
    })
}

/// Resolve an account by case-insensitive name.
pub fn find_account<'a>(accounts: &'a [Account], name: &str) -> Option<&'a Account> {
    let needle = name.trim().to_lowercase();
    accounts.iter().find(|a| a.name.to_lowercase() == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::models::{LeadStatus, TxCategory};

    fn lead(name: &str, phone: Option<&str>) -> Lead {
        Lead {
            id: format!("lead-{name}"),
            user_id: "u1".into(),
            name: name.into(),
            phone: phone.map(String::from),
            email: None,
            status: LeadStatus::New,
            notes: None,
            created_at: "2026-08-01 09:00:00".into(),
            updated_at: "2026-08-01 09:00:00".into(),
        }
    }

    fn tx(description: &str, amount: f64) -> Transaction {
        Transaction {
            id: format!("tx-{description}"),
            user_id: "u1".into(),
            description: description.into(),
            amount,
            category: TxCategory::Other,
            notes: None,
            created_at: "2026-08-01 09:00:00".into(),
        }
    }

    #[test]
    fn test_exact_name_match_is_case_insensitive() {
        let leads = vec![lead("John Smith", Some("0821234567"))];
        let hit = find_lead(&leads, "john smith", None).unwrap();
        assert_eq!(hit.name, "John Smith");
    }

    #[test]
    fn test_phone_match_beats_substring() {
        let leads = vec![
            lead("Johnny Smithers", None),
            lead("J. Smith", Some("0821234567")),
        ];
        let hit = find_lead(&leads, "john", Some("0821234567")).unwrap();
        assert_eq!(hit.name, "J. Smith");
    }

    #[test]
    fn test_substring_match_either_direction() {
        let leads = vec![lead("Dandrom Guest House", None)];
        assert!(find_lead(&leads, "dandrom", None).is_some());
        // Query longer than the stored name also hits.
        let leads = vec![lead("Acme", None)];
        assert!(find_lead(&leads, "acme corporation", None).is_some());
    }

    #[test]
    fn test_no_match_returns_none() {
        let leads = vec![lead("Acme Corp", None)];
        assert!(find_lead(&leads, "zebra", None).is_none());
        assert!(find_lead(&leads, "", None).is_none());
    }

    #[test]
    fn test_transaction_match_requires_same_amount() {
        let txs = vec![tx("Groceries", -89.50)];
        assert!(find_transaction(&txs, "groceries", -89.50).is_some());
        assert!(find_transaction(&txs, "groceries", -95.00).is_none());
    }

    #[test]
    fn test_loose_transaction_match_by_substring() {
        let txs = vec![tx("Woolworths groceries", -450.0)];
        let hit = find_transaction_loose(&txs, "woolworths").unwrap();
        assert_eq!(hit.amount, -450.0);
    }
}
