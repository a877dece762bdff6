// In-memory stand-ins for the sheet and chat platform, shared by the core tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::chat_client::{ChatClient, ChatError};
use super::link_models::{TextEntity, ENTITY_TEXT_LINK};
use super::row_allocator::PLACEHOLDER_FORMULA;
use super::sheet_store::{parse_row_span, qualify_range, AppendResult, SheetError, SheetStore};

pub const SHEET_NAME: &str = "Links Tracked";

/// Grid of formatted cell values; `rows[0]` is sheet row 1.
pub struct InMemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    calls: Mutex<Vec<String>>,
    append_failure: Mutex<Option<String>>,
    append_range_override: Mutex<Option<String>>,
}

impl InMemorySheet {
    pub fn empty() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            append_failure: Mutex::new(None),
            append_range_override: Mutex::new(None),
        }
    }

    pub fn with_header() -> Self {
        let sheet = Self::empty();
        sheet.push_row(&["Index", "URL", "Description"]);
        sheet
    }

    pub fn push_row(&self, cells: &[&str]) {
        let row = cells.iter().map(|c| c.to_string()).collect();
        self.rows.lock().unwrap().push(row);
    }

    pub fn fail_appends(&self) {
        self.fail_appends_with("backend unavailable");
    }

    /// Makes every append fail with a 503 carrying `body`.
    pub fn fail_appends_with(&self, body: &str) {
        *self.append_failure.lock().unwrap() = Some(body.to_string());
    }

    pub fn override_append_range(&self, range: &str) {
        *self.append_range_override.lock().unwrap() = Some(range.to_string());
    }

    /// Formatted value at a 1-based row and 0-based column.
    pub fn cell(&self, row: u64, col: usize) -> String {
        let rows = self.rows.lock().unwrap();
        rows.get(row as usize - 1)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get "))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn last_used_row(rows: &[Vec<String>]) -> usize {
        rows.iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn write(rows: &mut Vec<Vec<String>>, row: usize, col: usize, value: &Value) {
        while rows.len() < row {
            rows.push(Vec::new());
        }
        let cells = &mut rows[row - 1];
        while cells.len() <= col {
            cells.push(String::new());
        }
        cells[col] = match value {
            Value::String(s) if s == PLACEHOLDER_FORMULA => row.to_string(),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
    }
}

fn column_index(cell: &str) -> usize {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize)
        - 1
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

#[async_trait]
impl SheetStore for InMemorySheet {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
        self.record(format!("get {}", range));

        let span = parse_row_span(range).ok_or_else(|| SheetError::Api {
            status: 400,
            body: format!("bad range {}", range),
        })?;
        let (start, end) = range.split_once(':').unwrap_or((range, range));
        let (first_col, last_col) = (column_index(start), column_index(end));

        let rows = self.rows.lock().unwrap();
        let mut values: Vec<Vec<String>> = (span.first..=span.last)
            .map(|row| {
                let mut cells: Vec<String> = (first_col..=last_col)
                    .map(|col| {
                        rows.get(row as usize - 1)
                            .and_then(|r| r.get(col))
                            .cloned()
                            .unwrap_or_default()
                    })
                    .collect();
                while cells.last().is_some_and(|c| c.is_empty()) {
                    cells.pop();
                }
                cells
            })
            .collect();
        while values.last().is_some_and(|r| r.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn update_range(&self, range: &str, values: Vec<Vec<Value>>) -> Result<(), SheetError> {
        self.record(format!("update {}", range));

        let span = parse_row_span(range).ok_or_else(|| SheetError::Api {
            status: 400,
            body: format!("bad range {}", range),
        })?;
        let first_col = column_index(range);

        let mut rows = self.rows.lock().unwrap();
        for (offset, row_values) in values.iter().enumerate() {
            for (col_offset, value) in row_values.iter().enumerate() {
                let row = span.first as usize + offset;
                Self::write(&mut rows, row, first_col + col_offset, value);
            }
        }
        Ok(())
    }

    async fn append_rows(
        &self,
        range: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<AppendResult, SheetError> {
        self.record(format!("append {}", range));

        if let Some(body) = self.append_failure.lock().unwrap().clone() {
            return Err(SheetError::Api { status: 503, body });
        }

        let mut rows = self.rows.lock().unwrap();
        let last_used = Self::last_used_row(&rows);
        let table_range =
            (last_used > 0).then(|| qualify_range(SHEET_NAME, &format!("A1:C{}", last_used)));

        let first = last_used + 1;
        let width = values.iter().map(Vec::len).max().unwrap_or(1).max(1);
        for (offset, row_values) in values.iter().enumerate() {
            for (col, value) in row_values.iter().enumerate() {
                Self::write(&mut rows, first + offset, col, value);
            }
        }
        let last = first + values.len() - 1;

        let updated_range = match self.append_range_override.lock().unwrap().clone() {
            Some(range) => range,
            None => qualify_range(
                SHEET_NAME,
                &format!("A{}:{}{}", first, column_letter(width - 1), last),
            ),
        };

        Ok(AppendResult {
            table_range,
            updated_range,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub chat_id: i64,
    pub message_id: i64,
    pub emoji: String,
}

#[derive(Default)]
pub struct RecordingChat {
    pub sent: Mutex<Vec<SentMessage>>,
    pub reactions: Mutex<Vec<Reaction>>,
    pub fail_sends: AtomicBool,
}

impl RecordingChat {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn send_message(&self, chat_id: &str, html: &str) -> Result<(), ChatError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChatError::Api("Forbidden: bot was blocked by the user".to_string()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }

    async fn set_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), ChatError> {
        self.reactions.lock().unwrap().push(Reaction {
            chat_id,
            message_id,
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}

/// Renders Telegram-style HTML into stored text plus `text_link` entities,
/// the way the platform hands a sent message back inside `reply_to_message`.
pub fn render_html(html: &str) -> (String, Vec<TextEntity>) {
    let mut text = String::new();
    let mut entities = Vec::new();
    let mut open_links: Vec<(String, usize)> = Vec::new();
    let mut rest = html;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            let close = rest.find('>').unwrap();
            let tag = &rest[1..close];
            if let Some(href) = tag.strip_prefix("a href=\"") {
                let href = unescape(href.trim_end_matches('"'));
                open_links.push((href, text.encode_utf16().count()));
            } else if tag == "/a" {
                let (href, offset) = open_links.pop().unwrap();
                entities.push(TextEntity {
                    kind: ENTITY_TEXT_LINK.to_string(),
                    offset,
                    length: text.encode_utf16().count() - offset,
                    url: Some(href),
                });
            }
            rest = &rest[close + 1..];
        } else if ch == '&' {
            let end = rest.find(';').unwrap();
            text.push_str(&unescape(&rest[..=end]));
            rest = &rest[end + 1..];
        } else {
            text.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    entities.sort_by_key(|e| e.offset);
    (text, entities)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
