//! Core configuration and state for sigtract

pub mod config;
pub mod state;

pub use config::*;
pub use state::*;
