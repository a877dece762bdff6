use std::collections::HashSet;

use serde_json::Value;

use super::chat_client::{ChatClient, ChatError};
use super::formatting::{
    confirmation_batches, confirmation_message, escape_html, split_descriptions, truncate_chars,
    MAX_REPORT_CHARS,
};
use super::link_models::{DispatchOutcome, InboundEvent, InboundMessage, TrackedLink};
use super::metadata_codec;
use super::row_allocator::{AllocationError, RowAllocator};
use super::sheet_store::{SheetError, SheetStore};

pub const REJECTION_MESSAGE: &str = "Sorry, this bot hasn't been enabled for non-premium users";
pub const REACTION_ORIGINAL: &str = "✍";
pub const REACTION_REPLY: &str = "🫡";

// A genuine token always names one contiguous block; anything wider is not ours.
const MAX_REPLY_SPAN: u64 = 500;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
    #[error("Sheet error: {0}")]
    Sheet(#[from] SheetError),
    #[error("Row allocation failed: {0}")]
    Allocation(#[from] AllocationError),
}

/// Settings the dispatch flow needs, injected from configuration.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub admin_id: String,
    pub spreadsheet_id: String,
    pub first_data_row: u64,
}

impl TrackerSettings {
    pub fn sheet_url(&self) -> String {
        format!(
            "https://docs.google.com/spreadsheets/d/{}/edit",
            self.spreadsheet_id
        )
    }
}

pub struct LinkService<C: ChatClient, S: SheetStore> {
    chat: C,
    sheet: S,
    allocator: RowAllocator,
    settings: TrackerSettings,
}

impl<C: ChatClient, S: SheetStore> LinkService<C, S> {
    pub fn new(chat: C, sheet: S, settings: TrackerSettings) -> Self {
        Self {
            chat,
            sheet,
            allocator: RowAllocator::new(settings.first_data_row),
            settings,
        }
    }

    /// Routes one inbound event and reports any failure to the admin.
    ///
    /// `raw_payload` is only used for the error report.
    pub async fn dispatch(&self, event: &InboundEvent, raw_payload: &str) -> DispatchOutcome {
        match event {
            InboundEvent::Message(message) => match self.process_message(message).await {
                Ok(()) => DispatchOutcome::Processed,
                Err(err) => self.report_error(raw_payload, &err).await,
            },
            InboundEvent::Callback => {
                tracing::info!("Ignoring callback query");
                DispatchOutcome::CallbacksUnsupported
            }
            InboundEvent::Other => DispatchOutcome::FellThrough,
        }
    }

    async fn process_message(&self, message: &InboundMessage) -> Result<(), LinkError> {
        let Some(sender_id) = message.sender_id.map(|id| id.to_string()) else {
            return Ok(());
        };

        if sender_id != self.settings.admin_id {
            tracing::info!(sender_id = %sender_id, "Rejecting message from non-admin sender");
            self.chat.send_message(&sender_id, REJECTION_MESSAGE).await?;
            return Ok(());
        }

        if let Some(original) = message.reply_to.as_deref() {
            return self.describe_links(message, original).await;
        }

        let urls = message.urls();
        if urls.is_empty() {
            tracing::debug!(message_id = message.message_id, "Message has no links");
            return Ok(());
        }

        for batch in confirmation_batches(urls) {
            self.store_links(&sender_id, batch).await?;
        }
        Ok(())
    }

    /// Stores `urls` in freshly reserved rows and sends the confirmation that
    /// carries their row indices.
    pub async fn store_links(
        &self,
        sender_id: &str,
        urls: Vec<String>,
    ) -> Result<Vec<TrackedLink>, LinkError> {
        let count = urls.len() as u64;
        let first = self.allocator.reserve_block(&self.sheet, count).await?;
        let last = first + count - 1;

        let links: Vec<TrackedLink> = urls
            .into_iter()
            .zip(first..)
            .map(|(url, row_index)| TrackedLink {
                row_index,
                url,
                description: None,
            })
            .collect();

        let rows = links
            .iter()
            .map(|link| vec![Value::from(link.row_index), Value::from(link.url.clone())])
            .collect();
        self.sheet
            .update_range(&format!("A{}:B{}", first, last), rows)
            .await?;

        tracing::info!(first, last, count, "Stored links");

        let urls: Vec<String> = links.iter().map(|link| link.url.clone()).collect();
        let indices: Vec<u64> = links.iter().map(|link| link.row_index).collect();
        let body = confirmation_message(&self.settings.sheet_url(), &urls);
        self.chat
            .send_message(sender_id, &metadata_codec::encode(&indices, &body))
            .await?;

        Ok(links)
    }

    /// Writes the descriptions in `reply` to the rows announced by `original`.
    async fn describe_links(
        &self,
        reply: &InboundMessage,
        original: &InboundMessage,
    ) -> Result<(), LinkError> {
        let (Some(reply_text), Some(original_text)) =
            (reply.text.as_deref(), original.text.as_deref())
        else {
            return Ok(());
        };

        let indices = metadata_codec::decode(original_text, &original.entities);
        if indices.is_empty() {
            tracing::info!(
                message_id = original.message_id,
                "Replied-to message carries no link token"
            );
            return Ok(());
        }

        let pairs: Vec<(u64, String)> = indices
            .into_iter()
            .zip(split_descriptions(reply_text))
            .filter(|(_, description)| !description.is_empty())
            .collect();

        let verified = self.verified_rows(&pairs).await?;
        let mut written = 0usize;
        for (row, description) in pairs {
            if !verified.contains(&row) {
                tracing::warn!(row, "Skipping description for a row that was not stored by us");
                continue;
            }
            self.sheet
                .update_range(&format!("C{}", row), vec![vec![Value::String(description)]])
                .await?;
            written += 1;
        }

        if written == 0 {
            return Ok(());
        }

        tracing::info!(written, "Stored link descriptions");

        self.chat
            .set_reaction(original.chat_id, original.message_id, REACTION_ORIGINAL)
            .await?;
        self.chat
            .set_reaction(reply.chat_id, reply.message_id, REACTION_REPLY)
            .await?;
        Ok(())
    }

    /// Reads column A over the rows in `pairs` and keeps the rows whose index
    /// cell still holds their own row number.
    async fn verified_rows(
        &self,
        pairs: &[(u64, String)],
    ) -> Result<HashSet<u64>, LinkError> {
        let (Some(min), Some(max)) = (
            pairs.iter().map(|(row, _)| *row).min(),
            pairs.iter().map(|(row, _)| *row).max(),
        ) else {
            return Ok(HashSet::new());
        };

        if min < self.allocator.first_data_row() || max - min >= MAX_REPLY_SPAN {
            tracing::warn!(min, max, "Link token names rows outside a stored block");
            return Ok(HashSet::new());
        }

        let values = self
            .sheet
            .get_values(&format!("A{}:A{}", min, max))
            .await?;

        Ok(values
            .iter()
            .zip(min..)
            .filter(|(cells, row)| {
                cells
                    .first()
                    .and_then(|cell| cell.trim().parse::<u64>().ok())
                    == Some(*row)
            })
            .map(|(_, row)| row)
            .collect())
    }

    /// Sends the admin a header, the raw payload and the error. Failures here
    /// are only logged.
    async fn report_error(&self, raw_payload: &str, error: &LinkError) -> DispatchOutcome {
        tracing::error!(error = %error, "Failed to process update");

        let reports = [
            "<b>Error encountered</b>:".to_string(),
            format!(
                "<pre>{}</pre>",
                escape_html(&truncate_chars(raw_payload, MAX_REPORT_CHARS))
            ),
            escape_html(&truncate_chars(&error.to_string(), MAX_REPORT_CHARS)),
        ];

        for report in &reports {
            if let Err(e) = self.chat.send_message(&self.settings.admin_id, report).await {
                tracing::warn!("Failed to notify admin about error: {}", e);
            }
        }

        DispatchOutcome::InternalError
    }
}
