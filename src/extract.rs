use crate::model::OrderEvent;
use regex::Regex;
use std::sync::OnceLock;

const NOTE_PATTERN: &str = r"(?i)ref[:\s]*(OKURA-[A-Z0-9]+)";
const TAG_PATTERN: &str = r"(?i)ref:(OKURA-[A-Z0-9]+)";

fn note_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(NOTE_PATTERN).expect("note pattern compiles"))
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TAG_PATTERN).expect("tag pattern compiles"))
}

/// Derive a referral code from an order event. Ordered fallback list,
/// first match wins: note attribute, free-text note, customer tags.
pub fn extract_referral_code(order: &OrderEvent) -> Option<String> {
    let attr = order
        .note_attributes
        .iter()
        .find(|a| a.name == "referral_code" || a.name == "ref");
    if let Some(attr) = attr {
        if !attr.value.is_empty() {
            return Some(attr.value.clone());
        }
    }

    if let Some(note) = order.note.as_deref() {
        if let Some(code) = capture(note_pattern(), note) {
            return Some(code);
        }
    }

    if let Some(tags) = order.customer.as_ref().and_then(|c| c.tags.as_deref()) {
        if let Some(code) = capture(tag_pattern(), tags) {
            return Some(code);
        }
    }

    None
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
