//! Pipeline configuration

use crate::extract::LocatorConfig;
use crate::sandbox::{SandboxConfig, StandIns};
use std::time::Duration;

/// Default browser user agent, shared by HTTP requests and the stand-ins
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client configuration for fetching player bundles
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retries for retryable failures
    pub max_retries: u32,
    /// User agent header
    pub user_agent: String,
    /// Proxy URL
    pub proxy_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy_url: None,
        }
    }
}

/// Configuration for the whole extraction and resolution pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub http: HttpConfig,
    pub locator: LocatorConfig,
    pub sandbox: SandboxConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Set maximum fetch retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.http.max_retries = max_retries;
        self
    }

    /// Set proxy
    pub fn with_proxy(mut self, proxy_url: &str) -> Self {
        self.http.proxy_url = Some(proxy_url.to_string());
        self
    }

    /// Set the user agent for both HTTP requests and the `navigator` stand-in
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.http.user_agent = user_agent.to_string();
        self.sandbox.stand_ins = self.sandbox.stand_ins.with_user_agent(user_agent);
        self
    }

    /// Terminate scripts that run longer than `timeout`
    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.sandbox.timeout = Some(timeout);
        self
    }

    /// Set the backward scan window of the enclosing-function search
    pub fn with_function_lookback(mut self, lookback: usize) -> Self {
        self.locator.function_lookback = lookback;
        self
    }

    pub fn with_stand_ins(mut self, stand_ins: StandIns) -> Self {
        self.sandbox.stand_ins = stand_ins;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.http.timeout, Duration::from_secs(30));
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(config.http.user_agent, config.sandbox.stand_ins.user_agent);
        assert_eq!(config.locator.declaration_window, 5000);
        assert_eq!(config.locator.function_lookback, 100);
        assert_eq!(config.sandbox.timeout, None);
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::new()
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0)
            .with_proxy("http://127.0.0.1:8080")
            .with_user_agent("agent/1.0")
            .with_script_timeout(Duration::from_millis(500))
            .with_function_lookback(400);

        assert_eq!(config.http.timeout, Duration::from_secs(5));
        assert_eq!(config.http.max_retries, 0);
        assert_eq!(config.http.proxy_url.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.http.user_agent, "agent/1.0");
        assert_eq!(config.sandbox.stand_ins.user_agent, "agent/1.0");
        assert_eq!(config.sandbox.timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.locator.function_lookback, 400);
    }
}
