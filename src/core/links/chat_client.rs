use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat API error: {0}")]
    Api(String),
    #[error("Chat request failed: {0}")]
    Http(String),
}

/// Outbound calls the link tracker makes on the chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends an HTML-formatted message to a user or chat.
    async fn send_message(&self, chat_id: &str, html: &str) -> Result<(), ChatError>;

    /// Replaces the bot's reaction on a message with a single emoji.
    async fn set_reaction(&self, chat_id: i64, message_id: i64, emoji: &str)
        -> Result<(), ChatError>;
}
