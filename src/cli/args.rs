//! Command line argument parsing

use crate::core::PipelineConfig;
use crate::utils::is_player_url;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extract and run the signature and n transforms of a video player bundle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Player bundle URL (absolute or /s/player/... path) or local file
    pub player: String,

    /// Scrambled signature to decipher
    #[arg(long, value_name = "S")]
    pub sig: Option<String>,

    /// n parameter to transform
    #[arg(long, value_name = "N")]
    pub n: Option<String>,

    /// JSON file holding an array of formats to resolve
    #[arg(long, value_name = "PATH")]
    pub formats: Option<PathBuf>,

    /// Print the assembled programs
    #[arg(long)]
    pub print_programs: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// HTTP retries for transient errors
    #[arg(long, default_value = "3")]
    pub retries: u32,

    /// Terminate player code running longer than this (e.g., 5s)
    #[arg(long, value_name = "DURATION")]
    pub script_timeout: Option<humantime::Duration>,

    /// Characters scanned backwards for an enclosing function head
    #[arg(long, value_name = "CHARS", default_value = "100")]
    pub function_lookback: usize,

    /// Override User-Agent header and navigator stand-in
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get script timeout as Duration
    pub fn script_timeout_duration(&self) -> Option<Duration> {
        self.script_timeout.map(Into::into)
    }

    /// Whether the player argument names a local file
    pub fn is_local_player(&self) -> bool {
        !is_player_url(&self.player) || Path::new(&self.player).is_file()
    }

    /// Default log filter when RUST_LOG is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Whether any action besides the summary was requested
    pub fn has_action(&self) -> bool {
        self.sig.is_some() || self.n.is_some() || self.formats.is_some() || self.print_programs
    }

    /// Pipeline configuration from the flags
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_timeout(self.timeout_duration())
            .with_max_retries(self.retries)
            .with_function_lookback(self.function_lookback);

        if let Some(timeout) = self.script_timeout_duration() {
            config = config.with_script_timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.with_user_agent(user_agent);
        }
        if let Some(proxy) = &self.proxy {
            config = config.with_proxy(proxy);
        }
        config
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            player: String::new(),
            sig: None,
            n: None,
            formats: None,
            print_programs: false,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            retries: 3,
            script_timeout: None,
            function_lookback: 100,
            user_agent: None,
            proxy: None,
            verbose: false,
            quiet: false,
        }
    }
}
