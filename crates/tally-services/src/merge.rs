//! Idempotent note merging.
//!
//! Both merge paths (implicit create-path merge and explicit
//! confirmation merge) append notes through here, so a note that
//! arrives twice — retried webhook deliveries are the usual cause —
//! lands exactly once.

use chrono::Local;

/// Merge an incoming note into existing notes.
///
/// Returns the new notes value, or `None` when nothing changed because
/// the incoming text is already present (case-insensitive).
pub fn merge_notes(existing: Option<&str>, incoming: &str) -> Option<String> {
    let incoming = incoming.trim();
    if incoming.is_empty() {
        return None;
    }

    match existing.map(str::trim).filter(|e| !e.is_empty()) {
        Some(existing) => {
            if existing.to_lowercase().contains(&incoming.to_lowercase()) {
                return None;
            }
            let stamp = Local::now().format("%Y-%m-%d %H:%M");
            Some(format!("{existing}\n\n[{stamp}] {incoming}"))
        }
        None => Some(incoming.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_note_is_stored_plain() {
        assert_eq!(merge_notes(None, "wants a demo"), Some("wants a demo".into()));
        assert_eq!(merge_notes(Some("  "), "wants a demo"), Some("wants a demo".into()));
    }

    #[test]
    fn test_new_note_is_appended_with_stamp() {
        let merged = merge_notes(Some("met at expo"), "wants a demo").unwrap();
        assert!(merged.starts_with("met at expo\n\n["));
        assert!(merged.ends_with("] wants a demo"));
    }

    #[test]
    fn test_duplicate_note_is_dropped() {
        let first = merge_notes(Some("met at expo"), "wants a demo").unwrap();
        // Same note again, different case: no change.
        assert_eq!(merge_notes(Some(&first), "Wants A Demo"), None);
    }

    #[test]
    fn test_empty_incoming_is_a_no_op() {
        assert_eq!(merge_notes(Some("met at expo"), "   "), None);
    }
}
