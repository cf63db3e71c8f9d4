pub mod config;
pub mod error;
pub mod resolver;
pub mod store;
pub mod types;
