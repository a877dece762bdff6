// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "google_sheets/mod.rs"]
pub mod google_sheets;

#[path = "telegram/mod.rs"]
pub mod telegram;
