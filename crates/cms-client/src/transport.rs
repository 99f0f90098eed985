use std::{sync::Arc, time::Duration};

use cms_common::error::{CmsError, Result};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::ratelimit::RateLimiter;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One RPC-style API invocation.
#[derive(Debug, Clone)]
pub struct RpcCall<'a> {
    pub endpoint: &'a str,
    pub action: &'static str,
    pub version: &'static str,
    pub params: Vec<(&'static str, String)>,
    pub timeout: Option<Duration>,
}

/// HTTP plumbing shared by every service client. All requests wait on the
/// same rate limiter before they are sent.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    region: String,
}

impl Transport {
    pub fn new(region: impl Into<String>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            limiter,
            region: region.into(),
        }
    }

    /// Sends the call and returns the raw response body.
    pub async fn call(&self, call: RpcCall<'_>) -> Result<String> {
        self.limiter.until_ready().await;

        let mut request = self
            .client
            .get(call.endpoint)
            .query(&self.query_params(&call));
        if let Some(timeout) = call.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|err| CmsError::Request {
            action: call.action.to_string(),
            reason: format!("{} unreachable: {err}", call.endpoint),
        })?;

        let status = response.status();
        let content = response.text().await.map_err(|err| CmsError::Request {
            action: call.action.to_string(),
            reason: format!("failed to read response body: {err}"),
        })?;
        debug!(action = call.action, status = %status, "api call completed");

        if !status.is_success() {
            let envelope = serde_json::from_str::<ApiStatus>(&content).unwrap_or_default();
            return Err(CmsError::Api {
                action: call.action.to_string(),
                code: envelope.code().unwrap_or_else(|| status.as_u16().to_string()),
                message: envelope
                    .message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
            });
        }

        Ok(content)
    }

    fn query_params(&self, call: &RpcCall<'_>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("Action", call.action.to_string()),
            ("Version", call.version.to_string()),
            ("Format", "JSON".to_string()),
            ("RegionId", self.region.clone()),
        ];
        params.extend(call.params.iter().cloned());
        params
    }
}

/// Status fields every API response may carry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiStatus {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl ApiStatus {
    pub fn code(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(code) => Some(code.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Some APIs answer HTTP 200 with `Success: false`.
    pub fn into_result(self, action: &str) -> Result<()> {
        if self.success == Some(false) {
            return Err(CmsError::Api {
                action: action.to_string(),
                code: self.code().unwrap_or_default(),
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

pub fn decode<T: DeserializeOwned>(action: &str, content: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|err| CmsError::Request {
        action: action.to_string(),
        reason: format!("invalid response body: {err}"),
    })
}
