use reqwest::StatusCode;
use thiserror::Error;

/// Why a single fetch attempt failed.
#[derive(Error, Debug)]
pub enum FetchErrorKind {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fetch that failed on every attempt allowed by the retry policy.
#[derive(Error, Debug)]
#[error("{url}: {kind} (after {attempts} attempt(s))")]
pub struct FetchError {
    pub url: String,
    pub attempts: usize,
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match &self.kind {
            FetchErrorKind::Status(status) => Some(*status),
            FetchErrorKind::Transport(e) => e.status(),
            FetchErrorKind::Io(_) => None,
        }
    }
}

/// Errors that abort a whole cloning run.
#[derive(Error, Debug)]
pub enum CloneError {
    #[error("invalid URL {input:?}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to fetch root document: {0}")]
    RootFetch(#[source] FetchError),

    #[error("filesystem error: {0:#}")]
    Filesystem(#[from] anyhow::Error),
}
