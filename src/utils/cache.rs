//! Caching utilities for sigtract

use crate::error::SigtractError;
use crate::extract::ExtractedFunctions;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;

/// Cache key for the programs extracted from one player bundle
pub fn functions_key(player_url: &str) -> String {
    format!("functions-{}", player_url)
}

/// Process-lifetime memo of extracted programs, keyed by bundle URL.
///
/// Entries are never evicted and never expire. Concurrent first lookups of
/// one key share a single extraction run.
#[derive(Clone)]
pub struct FunctionCache {
    cache: Cache<String, Arc<ExtractedFunctions>>,
}

impl FunctionCache {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Arc<ExtractedFunctions>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: &str, functions: ExtractedFunctions) -> Arc<ExtractedFunctions> {
        let functions = Arc::new(functions);
        self.cache.insert(key.to_string(), functions.clone()).await;
        functions
    }

    /// Return the cached entry, or run `init` once for all concurrent callers
    /// of `key`. A failed `init` caches nothing.
    pub async fn get_or_try_insert_with<F>(
        &self,
        key: &str,
        init: F,
    ) -> Result<Arc<ExtractedFunctions>, Arc<SigtractError>>
    where
        F: Future<Output = Result<ExtractedFunctions, SigtractError>>,
    {
        self.cache
            .try_get_with(key.to_string(), async move { init.await.map(Arc::new) })
            .await
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Number of cached bundles
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for FunctionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn functions() -> ExtractedFunctions {
        ExtractedFunctions {
            decipher: Some("d".to_string()),
            n_transform: None,
        }
    }

    #[test]
    fn test_functions_key() {
        assert_eq!(
            functions_key("https://www.youtube.com/s/player/abc/base.js"),
            "functions-https://www.youtube.com/s/player/abc/base.js"
        );
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = FunctionCache::new();
        assert!(cache.get("k").await.is_none());

        let inserted = cache.insert("k", functions()).await;
        let cached = cache.get("k").await.unwrap();
        assert!(Arc::ptr_eq(&inserted, &cached));
        assert!(cache.contains("k"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_init_runs_once() {
        let cache = FunctionCache::new();
        let runs = AtomicUsize::new(0);

        let first = cache
            .get_or_try_insert_with("k", async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(functions())
            })
            .await
            .unwrap();
        let second = cache
            .get_or_try_insert_with("k", async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(ExtractedFunctions::default())
            })
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_failed_init_not_cached() {
        let cache = FunctionCache::new();
        let result = cache
            .get_or_try_insert_with("k", async {
                Err(SigtractError::Generic("down".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.get("k").await.is_none());
        assert!(cache.is_empty().await);
    }
}
