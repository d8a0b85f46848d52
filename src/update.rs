//! Update notification.
//!
//! Fetches the latest released version as plain text. Every failure is
//! swallowed and reported as "no result": an update check must never stop the
//! tool from working.

use std::time::Duration;

use tracing::debug;

use crate::config::{UPDATE_TIMEOUT_SECS, VERSION};

/// Outcome of comparing the remote version with ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available { latest: String },
    Unknown,
}

/// Fetches the version string served at `url`, `None` on any failure.
pub async fn fetch_latest(url: &str) -> Option<String> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(UPDATE_TIMEOUT_SECS)).build().ok()?;

    let response = match client.get(url).send().await.and_then(reqwest::Response::error_for_status) {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "update check request failed");
            return None;
        }
    };

    let body = response.text().await.ok()?;
    let version = body.trim();
    (!version.is_empty()).then(|| version.to_owned())
}

/// Compares a fetched version with the running one.
///
/// Versions are normalized first, so `1.0` and `1.0.0` are equal.
#[must_use]
pub fn compare(latest: Option<&str>) -> UpdateStatus {
    match latest.map(str::trim) {
        None | Some("") => UpdateStatus::Unknown,
        Some(latest) if normalize(latest) == normalize(VERSION) => UpdateStatus::UpToDate,
        Some(latest) => UpdateStatus::Available { latest: latest.to_owned() },
    }
}

/// Drops a leading `v` and trailing `.0` components.
fn normalize(version: &str) -> &str {
    let mut version = version.trim();
    version = version.strip_prefix('v').unwrap_or(version);
    while let Some(shorter) = version.strip_suffix(".0") {
        version = shorter;
    }
    version
}

pub async fn check(url: &str) -> UpdateStatus {
    compare(fetch_latest(url).await.as_deref())
}
