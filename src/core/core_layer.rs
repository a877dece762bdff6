// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "links/mod.rs"]
pub mod links;
