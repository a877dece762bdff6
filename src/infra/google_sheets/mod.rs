// =============================================================================
// GOOGLE SHEETS MODULE
// =============================================================================
//
// The tracked spreadsheet is the only persistence the bot has. This module
// implements the core `SheetStore` trait over the Sheets API v4 Values
// endpoints, authenticated as a service account.

pub mod service_account;
pub mod sheets_client;

pub use service_account::ServiceAccountAuth;
pub use sheets_client::GoogleSheetsClient;
