// =============================================================================
// METADATA CODEC
// =============================================================================
//
// Outgoing confirmations carry the sheet rows they announced, so that a later
// reply can be matched back to those rows without any server-side session.
//
// **Encoding:**
// The row indices are appended as an HTML text link whose only character is a
// zero-width space:
//
//   <visible html><a href="https://t.me/#link-tracker:6,7">&#8203;</a>
//
// The platform keeps the href as a `text_link` entity on the stored message,
// and the zero-width anchor renders as nothing. The suffix always goes last so
// the offsets of every entity in the visible part are untouched.
//
// **Decoding:**
// Only a `text_link` entity that covers exactly the zero-width marker and
// whose url carries our prefix is trusted. Anything else, including malformed
// payloads, decodes to an empty list.

use super::link_models::TextEntity;

/// Prefix of the hidden link target; the comma-separated row list follows it.
pub const TOKEN_URL_PREFIX: &str = "https://t.me/#link-tracker:";

/// Invisible anchor text carrying the token entity.
pub const TOKEN_MARKER: char = '\u{200B}';

/// Appends an invisible token for `indices` to an HTML message body.
pub fn encode(indices: &[u64], visible_html: &str) -> String {
    let payload = indices
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}<a href=\"{}{}\">{}</a>",
        visible_html, TOKEN_URL_PREFIX, payload, TOKEN_MARKER
    )
}

/// Recovers the indices embedded by [`encode`] from a stored message.
///
/// Returns an empty list when no token is present or the token is damaged.
pub fn decode(stored_text: &str, entities: &[TextEntity]) -> Vec<u64> {
    let marker = TOKEN_MARKER.to_string();

    let token = entities
        .iter()
        .rev()
        .filter(|entity| entity.is_text_link())
        .filter(|entity| entity.slice(stored_text) == Some(marker.as_str()))
        .find_map(|entity| entity.url.as_deref()?.strip_prefix(TOKEN_URL_PREFIX));

    match token {
        Some(payload) => parse_payload(payload).unwrap_or_default(),
        None => Vec::new(),
    }
}

fn parse_payload(payload: &str) -> Option<Vec<u64>> {
    if payload.is_empty() {
        return Some(Vec::new());
    }

    payload
        .split(',')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            part.parse::<u64>().ok()
        })
        .collect()
}
