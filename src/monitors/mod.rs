pub mod extractor;
pub mod fetcher;
pub mod fragment_monitor;

use async_trait::async_trait;
use clap::ValueEnum;
use std::fmt::Display;

use fetcher::FetchError;

/// Change information detected by monitors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Change summary message
    pub message: String,
    /// Change detailed information
    pub details: String,
    /// Value held before the change
    pub previous: String,
    /// Value observed now
    pub current: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("error fetching page: {0}")]
    Fetch(#[from] FetchError),
    #[error("target element `{selector}` not found, comparison skipped")]
    SelectorMiss { selector: String },
}

/// What a check does when the selector matches nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MissPolicy {
    /// Compare an empty fragment against the stored one
    #[default]
    TreatAsEmpty,
    /// Abandon the iteration without comparing
    Skip,
}

/// Monitor trait, all types of monitors need to implement this trait
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Execute a check, returns change information or error
    async fn check(&mut self) -> Result<Option<Change>, MonitorError>;

    /// Get monitoring interval (seconds)
    fn interval(&self) -> u64;

    fn name(&self) -> String;
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
