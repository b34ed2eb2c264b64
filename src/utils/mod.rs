//! Utility functions for sigtract

pub mod cache;
pub mod url;

pub use self::cache::*;
pub use self::url::*;
