pub mod settings;

pub use settings::{BotSettings, JiraSettings, LlmSettings, OAuthSettings, ServerSettings, Settings};
