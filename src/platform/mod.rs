//! Player fetching, format resolution and deciphering

pub mod cipher;
pub mod fetch;
pub mod formats;

pub use cipher::*;
pub use fetch::*;
pub use formats::*;
