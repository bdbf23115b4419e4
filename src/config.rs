use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::CloneError;

/// Browser-like identity sent with every request. Plenty of servers reject
/// obvious bot user agents outright.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_OUTPUT_ROOT: &str = "result";

/// Identity and limits of the HTTP client. Fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// How many times a single fetch is attempted, and the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Retries without sleeping in between.
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Pauses taken between attempts; one fewer than the attempt count.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        tokio_retry::strategy::FixedInterval::new(self.delay).take(self.max_attempts - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        )
    }
}

/// Settings for one cloning run.
#[derive(Debug, Clone)]
pub struct ClonerConfig {
    pub client: ClientConfig,
    pub retry: RetryPolicy,
    /// Each cloned site lands in `<output_root>/<sanitized-domain>/`.
    pub output_root: PathBuf,
    /// Pause after every asset download, to go easy on the target server.
    pub request_delay: Duration,
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            retry: RetryPolicy::default(),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}

/// Parses user input as a URL, assuming `https://` when no scheme is given.
pub fn normalize_url(input: &str) -> Result<Url, CloneError> {
    let trimmed = input.trim();
    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|source| CloneError::InvalidUrl {
        input: input.to_string(),
        source,
    })?;

    if url.host_str().is_none() {
        return Err(CloneError::InvalidUrl {
            input: input.to_string(),
            source: url::ParseError::EmptyHost,
        });
    }

    Ok(url)
}
