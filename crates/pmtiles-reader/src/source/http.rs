//! HTTP range request source for remote archives

use super::ByteSource;
use crate::error::{ReaderError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, RANGE};
use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use tracing::{trace, warn};
use url::Url;

/// HTTP source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Attempts per read, including the first
    pub max_retries: u32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Backoff before the first retry, doubled for each further retry
    pub retry_backoff: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(180),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

impl HttpSourceConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of attempts per read
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial retry backoff
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(ReaderError::InvalidConfiguration(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ReaderError::InvalidConfiguration(
                "timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Archive served over HTTP(S) with byte range support
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
    config: HttpSourceConfig,
}

impl HttpSource {
    /// Create a source with the default configuration
    pub fn new(url: Url) -> Result<Self> {
        Self::with_config(url, HttpSourceConfig::default())
    }

    /// Create a source with a custom configuration
    pub fn with_config(url: Url, config: HttpSourceConfig) -> Result<Self> {
        config.validate()?;

        // Idempotent; fails only when a provider is already installed
        let _ = rustls::crypto::ring::default_provider().install_default();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReaderError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            config,
        })
    }

    /// Archive URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .retry_backoff
            .saturating_mul(1u32 << attempt.min(16))
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn read(&self, offset: u64, length: u32) -> io::Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }

        let expected = u64::from(length);
        let range_header = format!("bytes={}-{}", offset, offset.saturating_add(expected - 1));
        let last_attempt = self.config.max_retries - 1;

        for attempt in 0..self.config.max_retries {
            trace!(url = %self.url, range = %range_header, attempt, "Range request");

            let response = match self
                .client
                .get(self.url.clone())
                .header(RANGE, &range_header)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if attempt < last_attempt && (e.is_timeout() || e.is_connect()) => {
                    warn!(url = %self.url, attempt, "Range request failed, retrying: {e}");
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
                Err(e) => return Err(io::Error::other(e)),
            };

            let status = response.status();
            if status != StatusCode::PARTIAL_CONTENT {
                if attempt < last_attempt && is_transient(status) {
                    warn!(url = %self.url, attempt, %status, "Range request rejected, retrying");
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
                let kind = if status == StatusCode::RANGE_NOT_SATISFIABLE {
                    io::ErrorKind::UnexpectedEof
                } else {
                    io::ErrorKind::Other
                };
                return Err(io::Error::new(
                    kind,
                    format!("Range request for {range_header} returned {status}"),
                ));
            }

            if let Some(content_range) = response.headers().get(CONTENT_RANGE) {
                let valid = content_range
                    .to_str()
                    .is_ok_and(|value| validate_content_range(value, offset, expected));
                if !valid {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Content-Range {content_range:?} does not match {range_header}"),
                    ));
                }
            }

            let data = response.bytes().await.map_err(io::Error::other)?;

            if data.len() as u64 != expected {
                if attempt < last_attempt {
                    warn!(
                        url = %self.url,
                        attempt,
                        expected,
                        received = data.len(),
                        "Incomplete range response, retrying"
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                    continue;
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "Incomplete data: expected {expected} bytes, received {}",
                        data.len()
                    ),
                ));
            }

            return Ok(data);
        }

        Err(io::Error::other(format!(
            "Maximum retry attempts exceeded for {range_header}"
        )))
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Check a `Content-Range` value such as `bytes 200-1023/2048`
fn validate_content_range(value: &str, expected_start: u64, expected_length: u64) -> bool {
    if let Some(bytes_part) = value.strip_prefix("bytes ")
        && let Some((range, _total)) = bytes_part.split_once('/')
        && let Some((start_str, end_str)) = range.split_once('-')
        && let (Ok(start), Ok(end)) = (start_str.parse::<u64>(), end_str.parse::<u64>())
        && end >= start
    {
        return start == expected_start && (end - start + 1) == expected_length;
    }
    false
}
