pub mod config;

pub use config::set_verified_role;
