pub mod adapters;
pub mod configuration;
pub mod domain;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod utils;
