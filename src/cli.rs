use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    ClientConfig, ClonerConfig, RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_ROOT,
    DEFAULT_REQUEST_DELAY_MS, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};

#[derive(Parser, Debug)]
#[command(
    name = "web-cloner",
    about = "A CLI utility to clone a web page together with its assets",
    version,
    long_about = "Downloads a page and the stylesheets, scripts, images and fonts it references, rewrites every reference to point at the local copies, and writes a clone_info.md summary next to index.html."
)]
pub struct CloneCommand {
    /// The URL of the page to clone (https:// is assumed when no scheme is given)
    #[arg(required = true)]
    pub url: String,

    /// Root directory; each site is written to <output-dir>/<domain>/
    #[arg(short, long, default_value = DEFAULT_OUTPUT_ROOT)]
    pub output_dir: PathBuf,

    /// Timeout for requests in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Pause after each asset download, in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_MS)]
    pub delay_ms: u64,

    /// Attempts per request before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_retries: u64,

    /// Pause between attempts of the same request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    pub retry_delay_ms: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// No spinner; progress goes to the log instead
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: LevelFilter,
}

impl CloneCommand {
    pub fn cloner_config(&self) -> ClonerConfig {
        ClonerConfig {
            client: ClientConfig {
                user_agent: self.user_agent.clone(),
                timeout: Duration::from_secs(self.timeout),
            },
            retry: RetryPolicy::new(self.max_retries as usize, Duration::from_millis(self.retry_delay_ms)),
            output_root: self.output_dir.clone(),
            request_delay: Duration::from_millis(self.delay_ms),
        }
    }
}
