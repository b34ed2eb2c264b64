//! Extraction of the signature and n-parameter transforms from a player bundle

pub mod decipher;
pub mod global_table;
pub mod guards;
pub mod locator;
pub mod ntransform;

pub use decipher::{extract_sig_decipher_func, DECIPHER_ARGUMENT, DECIPHER_FUNC_NAME};
pub use global_table::{extract_global_table, GLOBAL_TABLE_MARKERS};
pub use guards::strip_short_circuits;
pub use locator::{LocatorConfig, PatternLocator, Snippet, SnippetLocator};
pub use ntransform::{extract_n_transform_func, N_ARGUMENT, N_TRANSFORM_FUNC_NAME, N_TRANSFORM_MARKERS};

use tracing::debug;

/// The pair of assembled programs built from one player bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFunctions {
    /// Decipher program, runs with `sig` bound
    pub decipher: Option<String>,
    /// N-transform program, runs with `ncode` bound
    pub n_transform: Option<String>,
}

impl ExtractedFunctions {
    pub fn is_empty(&self) -> bool {
        self.decipher.is_none() && self.n_transform.is_none()
    }
}

/// Build both programs from the player text. Never fails: a missing piece
/// only leaves the corresponding program empty.
pub fn extract_functions(text: &str, locator: &dyn SnippetLocator) -> ExtractedFunctions {
    if text.is_empty() {
        return ExtractedFunctions::default();
    }

    let global_table = extract_global_table(text, locator);
    debug!(
        "Global table: {:?}",
        global_table.as_ref().and_then(|t| t.name.as_deref())
    );

    ExtractedFunctions {
        decipher: extract_sig_decipher_func(text, global_table.as_ref()),
        n_transform: extract_n_transform_func(text, global_table.as_ref(), locator),
    }
}
