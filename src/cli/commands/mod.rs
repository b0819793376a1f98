pub mod analyze;
pub mod config;
pub mod impact;
pub mod index;
pub mod monitor;
