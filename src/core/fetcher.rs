use crate::utils::error::{DigestError, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; PatchDigest/1.0)";

/// 重試策略：第 i 次失敗後（從 0 起算）等待 `base_delay * 2^i`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    user_agent: HeaderValue,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_client(Client::new(), policy)
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url`，非 2xx 或傳輸失敗都算一次失敗嘗試。
    /// 呼叫端的 headers 覆蓋預設 User-Agent，不會被丟棄。
    pub async fn fetch_with_retry(&self, url: &str, headers: &HeaderMap) -> Result<Response> {
        let attempts = self.policy.attempts.max(1);
        let mut last_cause = String::new();

        for attempt in 0..attempts {
            let request = self
                .client
                .get(url)
                .header(USER_AGENT, self.user_agent.clone())
                .headers(headers.clone());

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    last_cause = format!(
                        "HTTP {}: {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    );
                }
                Err(e) => last_cause = e.to_string(),
            }

            if attempt + 1 < attempts {
                let delay = self.policy.delay_for(attempt);
                tracing::warn!(
                    "⚠️ Retry {}/{} in {}ms... ({})",
                    attempt + 1,
                    attempts,
                    delay.as_millis(),
                    last_cause
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(DigestError::FetchError {
            url: url.to_string(),
            attempts,
            cause: last_cause,
        })
    }

    /// 抓取並完整讀取 body
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.fetch_with_retry(url, &HeaderMap::new()).await?;
        Ok(response.text().await?)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
