pub mod approval_flow;
pub mod audit_log;
pub mod cleanup;
pub mod permission_checker;
pub mod ticket_manager;

pub use approval_flow::{create_shared_approval_flow, Moderator, Responder, SharedApprovalFlow};
pub use audit_log::create_shared_audit_log;
pub use permission_checker::run_startup_permission_check;
pub use ticket_manager::{create_shared_ticket_manager, SharedTicketManager};
