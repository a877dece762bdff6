use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Sheets request failed: {0}")]
    Http(String),
    #[error("Sheets authentication failed: {0}")]
    Auth(String),
}

/// Response of an append call, reduced to the ranges the allocator reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendResult {
    /// Range of the table the append was attached to, if the sheet had one.
    pub table_range: Option<String>,
    /// Range the appended values were written into.
    pub updated_range: String,
}

/// Values API of the single tracked sheet. Ranges are A1 notation without the
/// sheet name; implementations qualify them.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetError>;
    async fn update_range(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), SheetError>;
    async fn append_rows(
        &self,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<AppendResult, SheetError>;
}

/// Inclusive span of sheet rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub first: u64,
    pub last: u64,
}

impl RowSpan {
    pub fn row_count(&self) -> u64 {
        self.last - self.first + 1
    }
}

/// Parses the row span out of an A1 range such as `'Links Tracked'!A6:B7`.
///
/// A single cell (`Sheet1!C4`) gives a one-row span. Whole-column ranges
/// (`A:B`) have no rows and give `None`.
pub fn parse_row_span(range: &str) -> Option<RowSpan> {
    let cells = match range.rsplit_once('!') {
        Some((_, cells)) => cells,
        None => range,
    };

    let (start, end) = match cells.split_once(':') {
        Some((start, end)) => (start, end),
        None => (cells, cells),
    };

    let first = cell_row(start)?;
    let last = cell_row(end)?;
    (first >= 1 && last >= first).then_some(RowSpan { first, last })
}

fn cell_row(cell: &str) -> Option<u64> {
    let digits = cell.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if digits.is_empty() || digits.len() == cell.len() {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Qualifies `range` with a quoted sheet name, e.g. `'Links Tracked'!A:C`.
pub fn qualify_range(sheet_name: &str, range: &str) -> String {
    format!("'{}'!{}", sheet_name.replace('\'', "''"), range)
}
