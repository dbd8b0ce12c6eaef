// Handlers HTTP do binário
// Rotas OAuth2 ficam em src/auth/handlers.rs
pub mod health;
pub mod message;

pub use health::*;
pub use message::*;
