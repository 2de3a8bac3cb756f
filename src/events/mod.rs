pub mod guild;
pub mod interaction;

pub use guild::{handle_member_add, reconcile_guilds};
pub use interaction::handle_component;
