pub mod types;

pub use types::{ApprovalState, Decision, Ticket, TicketAction, TicketComponent};
