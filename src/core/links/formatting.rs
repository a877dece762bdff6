/// Longest chunk of raw payload echoed back to the admin in an error report.
pub const MAX_REPORT_CHARS: usize = 4000;

/// Telegram's limit on the visible text of one message, in UTF-16 units.
const MAX_MESSAGE_UNITS: usize = 4096;

/// URLs longer than this are shortened in the confirmation listing.
const MAX_LISTED_URL_CHARS: usize = 1000;

const STORED_PREFIX: &str = "URLs stored in sheet: ";
const SHEET_LINK_TEXT: &str = "Link Tracker";
const URL_BULLET: &str = "\n  - ";
const REPLY_HINT: &str = "\n\nReply to this message to set a description for the links stored";

/// Escapes the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with "...".
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Visible part of the confirmation sent after links are stored.
pub fn confirmation_message(sheet_url: &str, urls: &[String]) -> String {
    let mut msg = format!(
        "{}<b><a href=\"{}\">{}</a></b>",
        STORED_PREFIX,
        escape_html(sheet_url),
        SHEET_LINK_TEXT
    );
    for url in urls {
        msg.push_str(URL_BULLET);
        msg.push_str(&escape_html(&listed_url(url)));
    }
    msg.push_str(REPLY_HINT);
    msg
}

/// Groups `urls` so that each group's confirmation, token included, fits in
/// one message. Order is kept and no group is empty.
pub fn confirmation_batches(urls: Vec<String>) -> Vec<Vec<String>> {
    // One unit for the zero-width token character.
    let budget = MAX_MESSAGE_UNITS
        - utf16_len(STORED_PREFIX)
        - utf16_len(SHEET_LINK_TEXT)
        - utf16_len(REPLY_HINT)
        - 1;

    let mut batches: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut used = 0usize;
    for url in urls {
        let line = utf16_len(URL_BULLET) + utf16_len(&listed_url(&url));
        if !current.is_empty() && used + line > budget {
            batches.push(std::mem::take(&mut current));
            used = 0;
        }
        used += line;
        current.push(url);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

fn listed_url(url: &str) -> String {
    truncate_chars(url, MAX_LISTED_URL_CHARS)
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Splits a reply into one description per `"\n-"` marker.
///
/// The first description may also start with `-`, so replies written as a
/// uniform dash list work too.
pub fn split_descriptions(text: &str) -> Vec<String> {
    text.split("\n-")
        .enumerate()
        .map(|(i, part)| {
            let part = part.trim();
            let part = if i == 0 {
                part.strip_prefix('-').unwrap_or(part).trim()
            } else {
                part
            };
            part.to_string()
        })
        .collect()
}
