//! Signature and n-parameter deciphering against a player bundle

use crate::core::{ExtractionStage, PipelineConfig, PipelineState};
use crate::error::SigtractError;
use crate::extract::{extract_functions, ExtractedFunctions, PatternLocator, SnippetLocator};
use crate::platform::fetch::{FetchOptions, HttpFetcher, PlayerFetcher};
use crate::platform::formats::{run_decipher, run_n_transform, set_download_url, Format};
use crate::sandbox::Sandbox;
use crate::utils::functions_key;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Resolves format URLs against player bundles.
///
/// Programs are extracted once per bundle URL and shared by every later call
/// through the [`PipelineState`] cache.
#[derive(Clone)]
pub struct Decipherer {
    fetcher: Arc<dyn PlayerFetcher>,
    locator: Arc<dyn SnippetLocator>,
    sandbox: Sandbox,
    state: Arc<PipelineState>,
}

impl std::fmt::Debug for Decipherer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decipherer")
            .field("sandbox", &self.sandbox)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Decipherer {
    /// HTTP fetcher, pattern locator and V8 sandbox built from `config`
    pub fn new(config: PipelineConfig) -> Result<Self, SigtractError> {
        let fetcher = HttpFetcher::with_config(config.http)?;
        Ok(Self::with_parts(
            Arc::new(fetcher),
            Arc::new(PatternLocator::with_config(config.locator)),
            Sandbox::new(config.sandbox),
            Arc::new(PipelineState::new()),
        ))
    }

    pub fn with_parts(
        fetcher: Arc<dyn PlayerFetcher>,
        locator: Arc<dyn SnippetLocator>,
        sandbox: Sandbox,
        state: Arc<PipelineState>,
    ) -> Self {
        Self {
            fetcher,
            locator,
            sandbox,
            state,
        }
    }

    /// Share `state` with other decipherers
    pub fn with_state(mut self, state: Arc<PipelineState>) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    /// Run the extraction scans over `text` on the blocking pool, warning
    /// once per stage when a program is missing.
    async fn extract(&self, text: String) -> Result<ExtractedFunctions, SigtractError> {
        let locator = self.locator.clone();
        let state = self.state.clone();

        tokio::task::spawn_blocking(move || {
            let functions = extract_functions(&text, locator.as_ref());

            if functions.decipher.is_none() && state.first_warning(ExtractionStage::Decipher) {
                warn!("Could not parse decipher function, stream URLs will be missing signatures");
            }
            if functions.n_transform.is_none() && state.first_warning(ExtractionStage::NTransform) {
                warn!("Could not parse n transform function, downloads may be throttled");
            }

            functions
        })
        .await
        .map_err(|e| SigtractError::ExtractionError(e.to_string()))
    }

    /// Programs for the bundle at `player_url`, fetched and extracted on the
    /// first call only. Concurrent first calls share one fetch.
    pub async fn get_functions(
        &self,
        player_url: &str,
        options: &FetchOptions,
    ) -> Result<Arc<ExtractedFunctions>, SigtractError> {
        let key = functions_key(player_url);
        self.state
            .cache()
            .get_or_try_insert_with(&key, async {
                info!("Extracting player functions from {}", player_url);
                let text = self.fetcher.fetch(player_url, options).await?;
                self.extract(text).await
            })
            .await
            .map_err(|e| {
                Arc::try_unwrap(e).unwrap_or_else(|e| SigtractError::Generic(e.to_string()))
            })
    }

    /// Cache programs extracted from already loaded bundle text under
    /// `player_id`, without fetching.
    pub async fn load_player(
        &self,
        player_id: &str,
        text: &str,
    ) -> Result<Arc<ExtractedFunctions>, SigtractError> {
        let key = functions_key(player_id);
        if let Some(functions) = self.state.cache().get(&key).await {
            return Ok(functions);
        }
        let functions = self.extract(text.to_string()).await?;
        Ok(self.state.cache().insert(&key, functions).await)
    }

    /// Resolve every format against the bundle at `player_url`, keyed by the
    /// resolved URL. Formats without a URL are dropped; a bundle that cannot
    /// be fetched yields an empty map.
    pub async fn decipher_formats(
        &self,
        formats: Vec<Format>,
        player_url: &str,
        options: &FetchOptions,
    ) -> HashMap<String, Format> {
        let functions = match self.get_functions(player_url, options).await {
            Ok(functions) => functions,
            Err(e) => {
                error!("Error deciphering formats: {}", e);
                return HashMap::new();
            }
        };

        let sandbox = self.sandbox.clone();
        let resolved = tokio::task::spawn_blocking(move || {
            resolve_formats(formats, &functions, &sandbox)
        })
        .await;

        match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Error deciphering formats: {}", e);
                HashMap::new()
            }
        }
    }

    /// Decipher a single scrambled signature
    pub async fn decipher_signature(
        &self,
        player_url: &str,
        s: &str,
        options: &FetchOptions,
    ) -> Result<Option<String>, SigtractError> {
        let functions = self.get_functions(player_url, options).await?;
        let sandbox = self.sandbox.clone();
        let s = s.to_string();

        tokio::task::spawn_blocking(move || {
            functions
                .decipher
                .as_deref()
                .and_then(|program| run_decipher(program, &s, &sandbox))
        })
        .await
        .map_err(|e| SigtractError::Generic(e.to_string()))
    }

    /// Transform a single `n` value
    pub async fn transform_n(
        &self,
        player_url: &str,
        n: &str,
        options: &FetchOptions,
    ) -> Result<Option<String>, SigtractError> {
        let functions = self.get_functions(player_url, options).await?;
        let sandbox = self.sandbox.clone();
        let n = n.to_string();

        tokio::task::spawn_blocking(move || {
            functions
                .n_transform
                .as_deref()
                .and_then(|program| run_n_transform(program, &n, &sandbox))
        })
        .await
        .map_err(|e| SigtractError::Generic(e.to_string()))
    }
}

/// Resolve `formats` with already extracted programs
pub fn resolve_formats(
    formats: Vec<Format>,
    functions: &ExtractedFunctions,
    sandbox: &Sandbox,
) -> HashMap<String, Format> {
    let total = formats.len();
    let mut resolved = HashMap::with_capacity(total);

    for mut format in formats {
        set_download_url(&mut format, functions, sandbox);
        if let Some(url) = format.url.clone() {
            resolved.insert(url, format);
        }
    }

    debug!("Resolved {}/{} formats", resolved.len(), total);
    resolved
}
