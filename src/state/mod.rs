pub mod ticket_registry;

pub use ticket_registry::{create_shared_ticket_registry, SharedTicketRegistry};
