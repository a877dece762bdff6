// Webhook layer - the HTTP endpoint the chat platform posts updates to.

pub mod server;

pub use server::{router, WebhookState};
