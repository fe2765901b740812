//! User-facing phrasing for failures.
//!
//! Internal errors never reach the chat verbatim; the user gets a short
//! apology and the detail goes to the log.

const APOLOGIES: &[&str] = &[
    "Eish, something went wrong on my side. Please try that again.",
    "Sorry, I dropped that one. Mind sending it again?",
    "Hmm, I hit a snag processing that. Give it another go?",
    "Apologies, that didn't go through. Please try once more.",
];

/// A short apology, varied so repeated failures don't read like a stuck bot.
pub fn apology() -> &'static str {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    APOLOGIES[(now as usize) % APOLOGIES.len()]
}

/// Phrasing for a lookup that found nothing.
pub fn not_found(what: &str, name: &str) -> String {
    format!("I couldn't find a {what} matching \"{name}\". Want me to list what you have?")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apology_is_from_the_pool() {
        assert!(APOLOGIES.contains(&apology()));
    }

    #[test]
    fn test_not_found_names_the_thing() {
        let msg = not_found("lead", "Sipho");
        assert!(msg.contains("lead"));
        assert!(msg.contains("Sipho"));
    }
}
