//! Player bundle fetching

use crate::core::HttpConfig;
use crate::error::SigtractError;
use crate::utils::resolve_player_url;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, error, warn};

/// First retry delay, doubled on every further attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Per-request fetch options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Source of player bundle text, consulted only on a cache miss
#[async_trait]
pub trait PlayerFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, SigtractError>;
}

/// reqwest-backed fetcher with retry and exponential backoff
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: HttpConfig,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, SigtractError> {
        Self::with_config(HttpConfig::default())
    }

    pub fn with_config(config: HttpConfig) -> Result<Self, SigtractError> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(&config.user_agent);

        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn fetch_once(&self, url: &str, options: &FetchOptions) -> Result<String, SigtractError> {
        let mut request = self.client.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SigtractError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Backoff before retry number `attempt` (zero based), with up to 10% jitter
fn retry_delay(attempt: u32) -> Duration {
    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
    let jitter_range = delay.as_millis() as u64 / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };
    delay + Duration::from_millis(jitter)
}

#[async_trait]
impl PlayerFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, SigtractError> {
        let url = resolve_player_url(url)?;
        let mut attempt = 0;

        loop {
            debug!(
                "Fetching player {} (attempt {}/{})",
                url,
                attempt + 1,
                self.config.max_retries + 1
            );

            match self.fetch_once(url.as_str(), options).await {
                Ok(text) => {
                    debug!("Fetched {} chars of player code", text.len());
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!("Player fetch failed: {}, retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Player fetch failed: {}", e);
                    return Err(e);
                }
            }
        }
    }
}
