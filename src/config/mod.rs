/// Application configuration module
use anyhow::Context;
use axum::http::HeaderValue;
use reqwest::Url;
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::warn;

/// Key NASA hands out for unauthenticated, heavily rate-limited access.
pub const DEMO_KEY: &str = "DEMO_KEY";

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub port: u16,
    pub credential: Credential,
    pub allowed_origin: Option<HeaderValue>,
    pub upstreams: UpstreamBases,
    pub upstream_timeout: Duration,
}

/// Base URLs of the proxied services
#[derive(Clone, Debug)]
pub struct UpstreamBases {
    pub nasa_api: Url,
    pub nasa_images: Url,
}

/// Shared upstream API key, owned by the gateway and never echoed to callers.
#[derive(Clone)]
pub struct Credential {
    key: String,
    configured: bool,
}

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            configured: true,
        }
    }

    pub fn demo() -> Self {
        Self {
            key: DEMO_KEY.to_string(),
            configured: false,
        }
    }

    pub fn expose(&self) -> &str {
        &self.key
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key", &"<redacted>")
            .field("configured", &self.configured)
            .finish()
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let credential = match env::var("NASA_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Credential::new(key.trim()),
            _ => {
                warn!("NASA_API_KEY is not set, upstream calls will use {DEMO_KEY}");
                Credential::demo()
            }
        };

        let allowed_origin = match env::var("ALLOWED_ORIGIN") {
            Ok(origin) if !origin.trim().is_empty() => Some(
                HeaderValue::from_str(origin.trim())
                    .with_context(|| format!("ALLOWED_ORIGIN is not a valid origin: {origin}"))?,
            ),
            _ => {
                warn!("ALLOWED_ORIGIN is not set, cross-origin requests will be refused");
                None
            }
        };

        let upstreams = UpstreamBases::parse(
            &env_string("NASA_API_URL", "https://api.nasa.gov"),
            &env_string("NASA_IMAGES_URL", "https://images-api.nasa.gov"),
        )?;

        Ok(Self {
            port: env_parse("PORT", 3001),
            credential,
            allowed_origin,
            upstreams,
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT_SECONDS", 10)),
        })
    }
}

impl UpstreamBases {
    pub fn parse(nasa_api: &str, nasa_images: &str) -> anyhow::Result<Self> {
        Ok(Self {
            nasa_api: parse_base("NASA_API_URL", nasa_api)?,
            nasa_images: parse_base("NASA_IMAGES_URL", nasa_images)?,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_base(name: &str, raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("{name} is not a valid URL: {raw}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("{name} cannot be used as a base URL: {raw}");
    }
    Ok(url)
}
