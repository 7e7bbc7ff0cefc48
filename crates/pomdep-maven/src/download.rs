//! HTTP layer for repository access.
//!
//! The contract is `GET(url) -> bytes | not-found | error`: a 404, any
//! other non-success status, or a timeout that survives the retry budget
//! all surface as `Ok(None)`, so a missing artifact short-circuits one
//! coordinate without aborting the walk. Only non-transient transport
//! failures become errors.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pomdep_util::errors::{PomdepError, PomdepResult};
use reqwest::Client;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the shared HTTP client.
pub fn build_client() -> PomdepResult<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent("pomdep/0.2")
        .build()
        .map_err(|e| {
            PomdepError::Network {
                message: format!("failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// GET raw bytes, retrying transient failures with backoff.
pub async fn fetch_bytes(client: &Client, url: &str) -> PomdepResult<Option<Vec<u8>>> {
    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        match client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_server_error() {
                    tracing::debug!("HTTP {status} from {url}, retrying");
                    continue;
                }
                if !status.is_success() {
                    tracing::debug!("HTTP {status} from {url}");
                    return Ok(None);
                }
                let bytes = resp.bytes().await.map_err(|e| PomdepError::Network {
                    message: format!("failed to read response from {url}: {e}"),
                })?;
                return Ok(Some(bytes.to_vec()));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                tracing::debug!("transient failure fetching {url}: {e}");
                continue;
            }
            Err(e) => {
                return Err(PomdepError::Network {
                    message: format!("request to {url} failed: {e}"),
                }
                .into());
            }
        }
    }

    tracing::warn!("giving up on {url} after {MAX_RETRIES} attempts");
    Ok(None)
}

/// GET a text document (POM, metadata).
pub async fn fetch_text(client: &Client, url: &str) -> PomdepResult<Option<String>> {
    match fetch_bytes(client, url).await? {
        Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).to_string())),
        None => Ok(None),
    }
}

/// GET a binary artifact, with a progress bar on large bodies.
pub async fn fetch_artifact(
    client: &Client,
    url: &str,
    label: &str,
) -> PomdepResult<Option<Vec<u8>>> {
    let resp = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() || e.is_connect() => {
            tracing::debug!("transient failure fetching {url}: {e}");
            return fetch_bytes(client, url).await;
        }
        Err(e) => {
            return Err(PomdepError::Network {
                message: format!("request to {url} failed: {e}"),
            }
            .into());
        }
    };

    if !resp.status().is_success() {
        tracing::debug!("HTTP {} from {url}", resp.status());
        return Ok(None);
    }

    let total = resp.content_length().unwrap_or(0);
    let bar = if total > 100_000 {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
                .unwrap()
                .progress_chars("##-"),
        );
        bar.set_message(label.to_string());
        Some(bar)
    } else {
        None
    };

    let bytes = resp.bytes().await.map_err(|e| PomdepError::Network {
        message: format!("failed to read {url}: {e}"),
    })?;

    if let Some(bar) = bar {
        bar.set_position(bytes.len() as u64);
        bar.finish_and_clear();
    }

    Ok(Some(bytes.to_vec()))
}
