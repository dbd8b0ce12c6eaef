pub mod health;
pub mod message_processor;
pub mod openrouter;
pub mod ticket_classifier;
pub mod ticket_service;

pub use health::{DependencyStatus, HealthChecker, HealthReport};
pub use message_processor::MessageProcessor;
pub use openrouter::{LlmError, OpenRouterClient, TextGenerator};
pub use ticket_classifier::TicketClassifier;
pub use ticket_service::{TicketService, TicketStats};
