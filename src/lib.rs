//! # sigtract - player signature and n-parameter transform extraction
//!
//! Pulls the signature decipher and `n` transform routines out of a video
//! platform's obfuscated player bundle, runs them in an isolated V8 context
//! and rewrites stream URLs with the results.
//!
//! ## Features
//!
//! - Heuristic snippet location with an exact brace-balancing fallback
//! - Short-circuit guard removal
//! - Fresh, stand-in equipped V8 context per evaluation
//! - Process-lifetime program cache with at-most-once extraction per bundle
//! - Soft failure: a broken player never aborts a batch of formats
//!
//! ## Example
//!
//! ```rust,no_run
//! use sigtract::{Decipherer, FetchOptions, Format, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let decipherer = Decipherer::new(PipelineConfig::default())?;
//!     let formats = vec![Format::with_signature_cipher("s=...&sp=sig&url=...")];
//!
//!     let resolved = decipherer
//!         .decipher_formats(formats, "/s/player/abc/player_ias.vflset/en_US/base.js", &FetchOptions::default())
//!         .await;
//!     for url in resolved.keys() {
//!         println!("{}", url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod extract;
pub mod platform;
pub mod sandbox;
pub mod utils;

// Re-export main types
pub use crate::core::{PipelineConfig, PipelineState};
pub use error::SigtractError;
pub use extract::{extract_functions, ExtractedFunctions};
pub use platform::{Decipherer, FetchOptions, Format, PlayerFetcher};
pub use sandbox::{Bindings, Sandbox};

/// Result type alias for sigtract operations
pub type Result<T> = std::result::Result<T, SigtractError>;
