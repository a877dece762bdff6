pub mod chat_client;
pub mod formatting;
pub mod link_models;
pub mod link_service;
pub mod metadata_codec;
pub mod row_allocator;
pub mod sheet_store;

#[cfg(test)]
pub mod fakes;

pub use chat_client::{ChatClient, ChatError};
pub use link_models::{DispatchOutcome, InboundEvent, InboundMessage, TextEntity};
pub use link_service::{LinkService, TrackerSettings};
pub use sheet_store::{qualify_range, AppendResult, SheetError, SheetStore};
