/// Entity type for a bare URL typed in the message text.
pub const ENTITY_URL: &str = "url";
/// Entity type for a hyperlink whose target is carried in `url`.
pub const ENTITY_TEXT_LINK: &str = "text_link";

/// Formatting annotation attached to a chat message.
///
/// `offset` and `length` are measured in UTF-16 code units, which is how the
/// chat platform counts them on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntity {
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    pub url: Option<String>,
}

impl TextEntity {
    pub fn is_url(&self) -> bool {
        self.kind == ENTITY_URL
    }

    pub fn is_text_link(&self) -> bool {
        self.kind == ENTITY_TEXT_LINK
    }

    /// Returns the substring of `text` this entity covers.
    ///
    /// `None` when the range falls outside the text or splits a surrogate pair.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        let end_unit = self.offset.checked_add(self.length)?;
        let start = utf16_to_byte_index(text, self.offset)?;
        let end = utf16_to_byte_index(text, end_unit)?;
        text.get(start..end)
    }
}

fn utf16_to_byte_index(text: &str, target: usize) -> Option<usize> {
    let mut units = 0usize;
    for (byte_idx, ch) in text.char_indices() {
        if units == target {
            return Some(byte_idx);
        }
        if units > target {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == target).then_some(text.len())
}

/// A chat message reduced to what the link tracker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    pub entities: Vec<TextEntity>,
    pub reply_to: Option<Box<InboundMessage>>,
}

impl InboundMessage {
    /// URL substrings, in order, taken from the message's `url` entities.
    pub fn urls(&self) -> Vec<String> {
        let Some(text) = self.text.as_deref() else {
            return Vec::new();
        };

        self.entities
            .iter()
            .filter(|entity| entity.is_url())
            .filter_map(|entity| entity.slice(text))
            .map(str::to_string)
            .collect()
    }
}

/// Event delivered to the webhook, independent of the platform's wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Message(InboundMessage),
    Callback,
    Other,
}

/// What the dispatch flow decided; the webhook layer turns this into HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Processed,
    CallbacksUnsupported,
    FellThrough,
    InternalError,
}

/// One stored link as it appears in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLink {
    pub row_index: u64,
    pub url: String,
    #[allow(dead_code)]
    pub description: Option<String>,
}
