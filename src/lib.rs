pub mod api;
pub mod appointments;
pub mod config;
pub mod confirm;
pub mod error;
pub mod export;
pub mod hierarchy;
pub mod parser;
pub mod progress;
pub mod reconcile;
pub mod role;
pub mod schema;
pub mod xjx;

#[cfg(test)]
mod fake;
