//! Confirmation reply grammar.
//!
//! Short follow-up replies resolve a pending duplicate confirmation.
//! The grammar is deliberately small and length-gated: long freeform
//! messages that happen to start with "yes" must fall through to normal
//! handling, not be swallowed as a confirmation.

/// Messages longer than this are never confirmation replies.
pub const MAX_CONFIRM_LEN: usize = 24;

/// A parsed confirmation reply. Indexes are 1-based, as presented to
/// the user in the candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmReply {
    /// Create the proposed entity as a brand-new record.
    CreateNew,
    /// Merge the proposed fields into candidate N (default: the first).
    UpdateExisting(Option<usize>),
    /// Show candidate N without resolving the confirmation.
    ShowDetails(Option<usize>),
    /// Drop the proposal entirely.
    Cancel,
}

/// Parse a message as a confirmation reply, or `None` to fall through.
///
/// A bare number ("2") is accepted as an update only when
/// `allow_bare_index` is set — in the finance flow a lone number is far
/// more likely to be an amount than an index.
pub fn parse_confirm_reply(text: &str, allow_bare_index: bool) -> Option<ConfirmReply> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_CONFIRM_LEN {
        return None;
    }
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "yes" | "y" | "confirm" | "create new" | "new lead" | "new transaction" => {
            return Some(ConfirmReply::CreateNew);
        }
        "no" | "n" | "cancel" | "abort" => return Some(ConfirmReply::Cancel),
        "update" | "use existing" => return Some(ConfirmReply::UpdateExisting(None)),
        _ => {}
    }

    if allow_bare_index {
        if let Ok(n) = lower.parse::<usize>() {
            return Some(ConfirmReply::UpdateExisting(Some(n)));
        }
    }

    if let Some(rest) = lower.strip_prefix("update ") {
        if let Ok(n) = rest.trim().parse::<usize>() {
            return Some(ConfirmReply::UpdateExisting(Some(n)));
        }
        return None;
    }

    for prefix in ["show", "details", "info"] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let rest = rest.trim();
            if rest.is_empty() {
                return Some(ConfirmReply::ShowDetails(None));
            }
            if let Ok(n) = rest.parse::<usize>() {
                return Some(ConfirmReply::ShowDetails(Some(n)));
            }
            return None;
        }
    }

    None
}

/// Resolve a 1-based reply index against a candidate list, defaulting
/// to the first candidate when no number was given.
pub fn resolve_index<T>(candidates: &[T], index: Option<usize>) -> Option<&T> {
    candidates.get(index.unwrap_or(1).checked_sub(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_variants_create_new() {
        for t in ["yes", "Y", "  confirm ", "create new", "new lead", "new transaction"] {
            assert_eq!(parse_confirm_reply(t, false), Some(ConfirmReply::CreateNew), "{t}");
        }
    }

    #[test]
    fn test_cancel_variants() {
        for t in ["no", "N", "cancel", "ABORT"] {
            assert_eq!(parse_confirm_reply(t, false), Some(ConfirmReply::Cancel), "{t}");
        }
    }

    #[test]
    fn test_update_with_and_without_index() {
        assert_eq!(
            parse_confirm_reply("update", false),
            Some(ConfirmReply::UpdateExisting(None))
        );
        assert_eq!(
            parse_confirm_reply("use existing", false),
            Some(ConfirmReply::UpdateExisting(None))
        );
        assert_eq!(
            parse_confirm_reply("update 2", false),
            Some(ConfirmReply::UpdateExisting(Some(2)))
        );
    }

    #[test]
    fn test_bare_index_only_when_allowed() {
        assert_eq!(
            parse_confirm_reply("2", true),
            Some(ConfirmReply::UpdateExisting(Some(2)))
        );
        assert_eq!(parse_confirm_reply("2", false), None);
    }

    #[test]
    fn test_show_variants() {
        assert_eq!(
            parse_confirm_reply("show", false),
            Some(ConfirmReply::ShowDetails(None))
        );
        assert_eq!(
            parse_confirm_reply("show 1", false),
            Some(ConfirmReply::ShowDetails(Some(1)))
        );
        assert_eq!(
            parse_confirm_reply("details 3", false),
            Some(ConfirmReply::ShowDetails(Some(3)))
        );
        assert_eq!(
            parse_confirm_reply("info2", false),
            Some(ConfirmReply::ShowDetails(Some(2)))
        );
    }

    #[test]
    fn test_length_gate() {
        // Starts like a confirmation but is 30 chars long, so it falls
        // through instead of swallowing the message.
        let long = "yes please go ahead and do it!";
        assert_eq!(long.len(), 30);
        assert_eq!(parse_confirm_reply(long, false), None);
        // Short "yes" is still a confirmation.
        assert_eq!(parse_confirm_reply("yes", false), Some(ConfirmReply::CreateNew));
    }

    #[test]
    fn test_freeform_text_falls_through() {
        for t in [
            "yes I'd also like a demo booked",
            "update the phone number",
            "show me my leads",
            "hello there",
        ] {
            assert_eq!(parse_confirm_reply(t, true), None, "{t}");
        }
    }

    #[test]
    fn test_resolve_index_defaults_to_first() {
        let candidates = vec!["a", "b", "c"];
        assert_eq!(resolve_index(&candidates, None), Some(&"a"));
        assert_eq!(resolve_index(&candidates, Some(3)), Some(&"c"));
        assert_eq!(resolve_index(&candidates, Some(4)), None);
        assert_eq!(resolve_index(&candidates, Some(0)), None);
    }
}
