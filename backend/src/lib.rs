pub mod adapters;
pub mod configuration;
pub mod domain;
pub mod send_welcome_handler;
pub mod utils;
