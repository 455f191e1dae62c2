/// Outbound client for the proxied space-data services
use crate::domain::UpstreamBody;
use crate::errors::{ApiError, ApiResult};
use axum::http::StatusCode;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

const BODY_EXCERPT_LEN: usize = 512;

/// Raw result of one upstream call
#[derive(Debug)]
pub enum UpstreamResult {
    Success(StatusCode, UpstreamBody),
    Failure(ApiError),
}

impl UpstreamResult {
    /// Collapse into the gateway's error taxonomy; only 2xx counts as success
    pub fn into_result(self) -> ApiResult<UpstreamBody> {
        match self {
            UpstreamResult::Success(status, body) if status.is_success() => Ok(body),
            UpstreamResult::Success(status, body) => {
                warn!(
                    "upstream returned {}: {}",
                    status,
                    excerpt(&body.bytes)
                );
                Err(ApiError::UpstreamNonSuccess(status))
            }
            UpstreamResult::Failure(err) => Err(err),
        }
    }
}

/// HTTP client wrapper with common configuration
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("space-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Issue a single GET; transport errors are converted here and never escape untyped
    pub async fn fetch(&self, url: Url) -> UpstreamResult {
        let redacted = redact(&url);
        debug!("GET {}", redacted);

        let resp = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => return UpstreamResult::Failure(classify(&redacted, e)),
        };

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match resp.bytes().await {
            Ok(bytes) => UpstreamResult::Success(
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
                UpstreamBody {
                    content_type,
                    bytes,
                },
            ),
            Err(e) => UpstreamResult::Failure(classify(&redacted, e)),
        }
    }
}

fn classify(url: &str, err: reqwest::Error) -> ApiError {
    // reqwest embeds the request URL, credential included, in its Display output
    let err = err.without_url();
    if err.is_timeout() {
        warn!("upstream timed out: {}", url);
        ApiError::UpstreamTimeout
    } else {
        warn!("upstream request to {} failed: {}", url, err);
        ApiError::UpstreamNetwork(err.to_string())
    }
}

/// URL with credential values masked, for logs
pub fn redact(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == crate::domain::CREDENTIAL_PARAM {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        return masked.to_string();
    }
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

fn excerpt(bytes: &[u8]) -> String {
    let end = bytes.len().min(BODY_EXCERPT_LEN);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
