use serde_json::Value;

use super::sheet_store::{parse_row_span, RowSpan, SheetError, SheetStore};

/// Placeholder written into column A of reserved rows. Sheets evaluates it to
/// the row's own number, so an abandoned reservation still reads sensibly.
pub const PLACEHOLDER_FORMULA: &str = "=ROW()";

/// Column labels written to row 1 when a reservation finds the sheet empty.
pub const HEADER_ROW: [&str; 3] = ["Index", "URL", "Description"];

/// Column the reservation append is anchored to.
const RESERVE_RANGE: &str = "A:A";

#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("Cannot reserve an empty block of rows")]
    InvalidSize,
    #[error("Reservation append failed: {0}")]
    Append(#[source] SheetError),
    #[error("Writing the header rows failed: {0}")]
    Header(#[source] SheetError),
    #[error("Could not read a row span from append range {0:?}")]
    MalformedRange(String),
    #[error("Append reserved {got} rows starting at {first}, expected {expected}")]
    SpanMismatch { first: u64, got: u64, expected: u64 },
    #[error("Block landed on row {first}, before the first data row {first_data_row}")]
    MissingHeader { first: u64, first_data_row: u64 },
}

/// Hands out contiguous blocks of sheet rows using the store's append as the
/// only serialization point.
pub struct RowAllocator {
    first_data_row: u64,
}

impl RowAllocator {
    pub fn new(first_data_row: u64) -> Self {
        Self {
            first_data_row: first_data_row.max(1),
        }
    }

    pub fn first_data_row(&self) -> u64 {
        self.first_data_row
    }

    /// Reserves `n` consecutive rows and returns the first one.
    ///
    /// The placeholders are written by a single append, and the block is read
    /// back from the append response rather than from a separate query, so two
    /// concurrent reservations can never be handed the same rows.
    ///
    /// When the block lands above `first_data_row` (an empty sheet), the rows
    /// in between are turned into the header and the block is topped up so
    /// it still starts at `first_data_row`.
    pub async fn reserve_block<S: SheetStore + ?Sized>(
        &self,
        store: &S,
        n: u64,
    ) -> Result<u64, AllocationError> {
        if n == 0 {
            return Err(AllocationError::InvalidSize);
        }

        let span = self.append_block(store, n).await?;
        if span.first >= self.first_data_row {
            return Ok(span.first);
        }

        tracing::info!(
            first = span.first,
            first_data_row = self.first_data_row,
            "Sheet has no header, writing it"
        );
        self.fill_header(store, span.first).await?;

        // Rows of the first block at or past the header are already ours.
        let owned = (span.last + 1).saturating_sub(self.first_data_row);
        let expected_next = (span.last + 1).max(self.first_data_row);
        let rest = self.append_block(store, n - owned).await?;
        if rest.first == expected_next {
            return Ok(self.first_data_row);
        }

        // Another reservation got in between; start over below the header.
        tracing::warn!(
            expected = expected_next,
            got = rest.first,
            "Top-up block was not contiguous, reserving again"
        );
        let span = self.append_block(store, n).await?;
        if span.first < self.first_data_row {
            return Err(AllocationError::MissingHeader {
                first: span.first,
                first_data_row: self.first_data_row,
            });
        }
        Ok(span.first)
    }

    async fn append_block<S: SheetStore + ?Sized>(
        &self,
        store: &S,
        n: u64,
    ) -> Result<RowSpan, AllocationError> {
        let placeholders = (0..n)
            .map(|_| vec![Value::String(PLACEHOLDER_FORMULA.to_string())])
            .collect();

        let result = store
            .append_rows(RESERVE_RANGE, placeholders)
            .await
            .map_err(AllocationError::Append)?;

        let span = parse_row_span(&result.updated_range)
            .ok_or_else(|| AllocationError::MalformedRange(result.updated_range.clone()))?;

        if span.row_count() != n {
            return Err(AllocationError::SpanMismatch {
                first: span.first,
                got: span.row_count(),
                expected: n,
            });
        }

        tracing::debug!(
            first = span.first,
            last = span.last,
            table_range = ?result.table_range,
            "Reserved sheet rows"
        );

        Ok(span)
    }

    /// Overwrites rows `from..first_data_row` with the column labels (row 1)
    /// and placeholders (any further header rows).
    async fn fill_header<S: SheetStore + ?Sized>(
        &self,
        store: &S,
        from: u64,
    ) -> Result<(), AllocationError> {
        let last = self.first_data_row - 1;
        let rows = (from..=last)
            .map(|row| {
                if row == 1 {
                    HEADER_ROW.iter().map(|label| Value::from(*label)).collect()
                } else {
                    vec![Value::String(PLACEHOLDER_FORMULA.to_string())]
                }
            })
            .collect();

        store
            .update_range(&format!("A{}:C{}", from, last), rows)
            .await
            .map_err(AllocationError::Header)
    }
}

impl Default for RowAllocator {
    fn default() -> Self {
        Self::new(2)
    }
}
