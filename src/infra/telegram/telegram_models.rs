use serde::Deserialize;

use crate::core::links::{InboundEvent, InboundMessage, TextEntity};

/// Webhook update from the Bot API. Only the fields the tracker reads are
/// modelled; everything else is ignored.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub offset: usize,
    pub length: usize,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[allow(dead_code)]
    pub id: String,
}

impl From<MessageEntity> for TextEntity {
    fn from(entity: MessageEntity) -> Self {
        TextEntity {
            kind: entity.kind,
            offset: entity.offset,
            length: entity.length,
            url: entity.url,
        }
    }
}

impl From<Message> for InboundMessage {
    fn from(message: Message) -> Self {
        InboundMessage {
            message_id: message.message_id,
            chat_id: message.chat.id,
            sender_id: message.from.map(|user| user.id),
            text: message.text,
            entities: message.entities.into_iter().map(TextEntity::from).collect(),
            reply_to: message
                .reply_to_message
                .map(|reply| Box::new(InboundMessage::from(*reply))),
        }
    }
}

impl From<Update> for InboundEvent {
    fn from(update: Update) -> Self {
        if let Some(message) = update.message {
            InboundEvent::Message(message.into())
        } else if update.callback_query.is_some() {
            InboundEvent::Callback
        } else {
            InboundEvent::Other
        }
    }
}
