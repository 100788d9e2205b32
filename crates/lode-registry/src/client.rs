use std::time::Duration;

use lode_constants::{
    ABBREVIATED_ACCEPT, BASE_BACKOFF_MS, FALLBACK_REGISTRY, FULL_ACCEPT, MAX_ATTEMPTS,
    MAX_BACKOFF_MS, REQUEST_TIMEOUT_SECS, USER_AGENT,
};
use lode_error::{LodeError, Result};

use crate::types::Packument;

const EXCERPT_LEN: usize = 200;

pub struct RegistryClient {
    client: reqwest::Client,
    base: String,
    fallback: Option<String>,
    token: Option<String>,
    max_attempts: u32,
}

impl RegistryClient {
    #[must_use]
    pub fn new(registry: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .connect_timeout(Duration::from_secs(20))
                .pool_max_idle_per_host(10)
                .tcp_nodelay(true)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base: registry.trim_end_matches('/').to_string(),
            fallback: Some(FALLBACK_REGISTRY.trim_end_matches('/').to_string()),
            token,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Scoped names keep the leading `@` literal; everything after it is
    /// percent-encoded, which turns the inner `/` into `%2F` the way the
    /// registry expects.
    fn encode_name(name: &str) -> String {
        name.strip_prefix('@').map_or_else(
            || urlencoding::encode(name).into_owned(),
            |rest| format!("@{}", urlencoding::encode(rest)),
        )
    }

    fn package_url(base: &str, name: &str) -> String {
        format!("{base}/{}", Self::encode_name(name))
    }

    pub async fn get_abbreviated(&self, name: &str) -> Result<Packument> {
        let bytes = self.get_metadata_bytes(name, ABBREVIATED_ACCEPT).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get_full(&self, name: &str) -> Result<serde_json::Value> {
        let bytes = self.get_metadata_bytes(name, FULL_ACCEPT).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn download_tarball(&self, url: &str) -> Result<Vec<u8>> {
        self.get_with_retry(url, None, self.max_attempts).await
    }

    /// Fetch a packument from the primary registry; on failure the fallback
    /// registry (when distinct) is queried exactly once. A 404 from the last
    /// registry tried maps to `NotFound`.
    async fn get_metadata_bytes(&self, name: &str, accept: &str) -> Result<Vec<u8>> {
        let url = Self::package_url(&self.base, name);
        let primary_err = match self
            .get_with_retry(&url, Some(accept), self.max_attempts)
            .await
        {
            Ok(bytes) => return Ok(bytes),
            Err(err) => err,
        };

        if let Some(fallback) = self.fallback.as_deref()
            && fallback != self.base
        {
            lode_logger::warn(&format!(
                "primary registry failed for {name}, trying {fallback}"
            ));
            let fb_url = Self::package_url(fallback, name);
            if let Ok(bytes) = self.get_with_retry(&fb_url, Some(accept), 1).await {
                return Ok(bytes);
            }
        }

        Err(match primary_err {
            LodeError::HttpError(404, ..) => LodeError::NotFound(name.to_string()),
            other => other,
        })
    }

    /// GET with up to `attempts` tries. Connection errors, timeouts and 5xx
    /// responses are retried with exponential backoff; 4xx fails immediately
    /// with a body excerpt.
    async fn get_with_retry(
        &self,
        url: &str,
        accept: Option<&str>,
        attempts: u32,
    ) -> Result<Vec<u8>> {
        let mut last_err: Option<LodeError> = None;

        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(backoff_delay_ms(attempt - 1))).await;
            }

            let mut request = self.client.get(url);
            if let Some(accept) = accept {
                request = request.header(reqwest::header::ACCEPT, accept);
            }
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        match resp.bytes().await {
                            Ok(bytes) => return Ok(bytes.to_vec()),
                            Err(err) => {
                                last_err = Some(LodeError::NetworkFailure(
                                    url.to_string(),
                                    err.to_string(),
                                ));
                                continue;
                            }
                        }
                    }
                    if status.is_server_error() {
                        last_err = Some(LodeError::NetworkFailure(
                            url.to_string(),
                            format!("HTTP {status}"),
                        ));
                        continue;
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let excerpt: String = body.chars().take(EXCERPT_LEN).collect();
                    return Err(LodeError::HttpError(
                        status.as_u16(),
                        url.to_string(),
                        excerpt,
                    ));
                }
                Err(err) if err.is_connect() || err.is_timeout() => {
                    last_err = Some(LodeError::NetworkFailure(url.to_string(), err.to_string()));
                }
                Err(err) => {
                    return Err(LodeError::NetworkFailure(url.to_string(), err.to_string()));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            LodeError::NetworkFailure(url.to_string(), "retry budget exhausted".to_string())
        }))
    }
}

/// Delay before retry number `k` (0-based), capped at 10 seconds.
fn backoff_delay_ms(k: u32) -> u64 {
    BASE_BACKOFF_MS
        .saturating_mul(2u64.saturating_pow(k))
        .min(MAX_BACKOFF_MS)
}
