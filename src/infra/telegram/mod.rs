pub mod telegram_client;
pub mod telegram_models;

pub use telegram_client::TelegramBotClient;
pub use telegram_models::Update;
