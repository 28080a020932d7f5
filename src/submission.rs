use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::FillerConfig;
use crate::document::Document;

/// How the wait for a human submission ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    /// The page navigated away from the form.
    Detected { url: String },
    /// Nothing changed before the ceiling; treated as submitted.
    AssumedAfterTimeout,
}

impl Submission {
    pub fn detected(&self) -> bool {
        matches!(self, Submission::Detected { .. })
    }
}

/// Poll the page URL until it differs from `initial_url`, bounded by
/// `config.submission_timeout`.
pub async fn wait_for_submission<D>(doc: &D, initial_url: &str, config: &FillerConfig) -> Submission
where
    D: Document + ?Sized,
{
    let started = Instant::now();
    info!(timeout = ?config.submission_timeout, "waiting for the form to be submitted");
    loop {
        match doc.url().await {
            Ok(url) if url != initial_url => {
                info!(url = %url, "submission detected");
                return Submission::Detected { url };
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "could not read page url"),
        }
        if started.elapsed() >= config.submission_timeout {
            warn!("no navigation before the timeout, assuming submitted");
            return Submission::AssumedAfterTimeout;
        }
        tokio::time::sleep(config.submission_poll_interval).await;
    }
}
