use async_trait::async_trait;
use log::{debug, error, info};
use scraper::Selector;

use crate::monitors::extractor::{extract_fragment, parse_selector, InvalidSelector};
use crate::monitors::fetcher::{Fetcher, HttpFetcher};
use crate::monitors::{Change, MissPolicy, Monitor, MonitorError};

/// Result of comparing the stored fragment with a fresh one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Unchanged,
    Changed,
}

/// Exact string comparison, no whitespace normalization
pub fn compare(previous: &str, current: &str) -> Comparison {
    if previous == current {
        Comparison::Unchanged
    } else {
        Comparison::Changed
    }
}

/// Watches the inner HTML of one element on one page
pub struct FragmentMonitor<F = HttpFetcher> {
    /// Webpage URL to monitor
    url: String,
    /// Selector as configured, kept for log lines
    selector_text: String,
    selector: Selector,
    /// Fragment considered "no change yet"
    last_fragment: String,
    miss_policy: MissPolicy,
    /// Monitoring interval (seconds)
    interval_secs: u64,
    fetcher: F,
}

impl<F: Fetcher> FragmentMonitor<F> {
    pub fn new(
        fetcher: F,
        url: &str,
        selector: &str,
        baseline: &str,
        miss_policy: MissPolicy,
        interval_secs: u64,
    ) -> Result<Self, InvalidSelector> {
        Ok(Self {
            url: url.to_string(),
            selector_text: selector.to_string(),
            selector: parse_selector(selector)?,
            last_fragment: baseline.to_string(),
            miss_policy,
            interval_secs,
            fetcher,
        })
    }

    #[cfg(test)]
    pub fn last_fragment(&self) -> &str {
        &self.last_fragment
    }

    /// Fetch the page once and pull out the watched fragment
    pub async fn current_fragment(&self) -> Result<Option<String>, MonitorError> {
        let html = self.fetcher.fetch(&self.url).await?;
        Ok(extract_fragment(&html, &self.selector))
    }
}

#[async_trait]
impl<F: Fetcher> Monitor for FragmentMonitor<F> {
    async fn check(&mut self) -> Result<Option<Change>, MonitorError> {
        let current = match self.current_fragment().await? {
            Some(fragment) => fragment,
            None => match self.miss_policy {
                MissPolicy::Skip => {
                    return Err(MonitorError::SelectorMiss {
                        selector: self.selector_text.clone(),
                    });
                }
                MissPolicy::TreatAsEmpty => {
                    error!(
                        "Target element `{}` not found, comparing an empty fragment",
                        self.selector_text
                    );
                    String::new()
                }
            },
        };

        match compare(&self.last_fragment, &current) {
            Comparison::Unchanged => {
                info!("Target element has not changed!");
                Ok(None)
            }
            Comparison::Changed => {
                info!("Target element has changed!");
                info!("Element content: {}", current);
                debug!("Previous content: {}", self.last_fragment);

                let previous = std::mem::replace(&mut self.last_fragment, current.clone());
                Ok(Some(Change {
                    message: format!("Watched element changed on {}", self.url),
                    details: format!(
                        "Selector: {}\nOld value: {}\nNew value: {}",
                        self.selector_text, previous, current
                    ),
                    previous,
                    current,
                }))
            }
        }
    }

    fn interval(&self) -> u64 {
        self.interval_secs
    }

    fn name(&self) -> String {
        format!("Fragment monitor for {} ({})", self.url, self.selector_text)
    }
}
