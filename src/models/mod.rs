pub mod message;
pub mod ticket;

pub use message::{ClassificationSource, InboundMessage, TicketReply};
pub use ticket::{ClassifiedTicket, MAX_LABELS, TITLE_MAX_CHARS};
