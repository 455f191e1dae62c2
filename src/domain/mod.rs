/// Route descriptors and the per-request data they operate on
use crate::config::{Credential, UpstreamBases};
use crate::errors::{ApiError, ApiResult};
use reqwest::Url;
use serde::Serialize;

/// Query parameter that carries the shared credential upstream
pub const CREDENTIAL_PARAM: &str = "api_key";

/// Builds the upstream base + path for a route; query parameters are appended afterwards.
pub type UrlBuilder = fn(&UpstreamBases, &ValidatedParams) -> ApiResult<Url>;

/// How the gateway-owned credential reaches the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialInjection {
    QueryParam(&'static str),
    None,
}

/// Static description of one proxied endpoint
#[derive(Clone)]
pub struct RouteDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    pub required_params: &'static [&'static str],
    pub optional_params: &'static [&'static str],
    /// Parameters consumed by the URL builder as path segments
    pub path_params: &'static [&'static str],
    /// `(param, source)`: when `param` is absent, forward the value of `source`
    pub fallbacks: &'static [(&'static str, &'static str)],
    pub fixed_params: &'static [(&'static str, &'static str)],
    pub credential: CredentialInjection,
    pub build_url: UrlBuilder,
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RouteDescriptor {
    /// Fully-qualified upstream URL for an already validated request
    pub fn upstream_url(
        &self,
        bases: &UpstreamBases,
        params: &ValidatedParams,
        credential: &Credential,
    ) -> ApiResult<Url> {
        let mut params = params.clone();
        for (param, source) in self.fallbacks {
            if params.get(param).is_none() {
                if let Some(value) = params.get(source).map(str::to_string) {
                    params.insert(*param, value);
                }
            }
        }

        let mut url = (self.build_url)(bases, &params)?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params.iter() {
                if !self.path_params.contains(&name) {
                    query.append_pair(name, value);
                }
            }
            for (name, value) in self.fixed_params {
                query.append_pair(name, value);
            }
            if let CredentialInjection::QueryParam(name) = self.credential {
                query.append_pair(name, credential.expose());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

/// Parameters that survived validation, in forwarding order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedParams {
    entries: Vec<(&'static str, String)>,
}

impl ValidatedParams {
    pub fn insert(&mut self, name: &'static str, value: String) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(n, v)| (*n, v.as_str()))
    }

    fn require(&self, name: &'static str) -> ApiResult<&str> {
        self.get(name).ok_or(ApiError::MissingParameter(name))
    }
}

/// Immutable lookup of every proxied route, built once at startup
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    /// The five NASA routes served by the gateway
    pub fn standard() -> Self {
        Self::new(vec![
            RouteDescriptor {
                name: "apod",
                path: "/api/apod",
                required_params: &[],
                optional_params: &["date"],
                path_params: &[],
                fallbacks: &[],
                fixed_params: &[],
                credential: CredentialInjection::QueryParam(CREDENTIAL_PARAM),
                build_url: |bases, _| join(&bases.nasa_api, &["planetary", "apod"]),
            },
            RouteDescriptor {
                name: "mars-photos",
                path: "/api/mars-photos",
                required_params: &["rover", "earth_date"],
                optional_params: &["page"],
                path_params: &["rover"],
                fallbacks: &[],
                fixed_params: &[],
                credential: CredentialInjection::QueryParam(CREDENTIAL_PARAM),
                build_url: |bases, params| {
                    let rover = params.require("rover")?;
                    join(
                        &bases.nasa_api,
                        &["mars-photos", "api", "v1", "rovers", rover, "photos"],
                    )
                },
            },
            RouteDescriptor {
                name: "epic",
                path: "/api/epic",
                required_params: &["date"],
                optional_params: &[],
                path_params: &["date"],
                fallbacks: &[],
                fixed_params: &[],
                credential: CredentialInjection::QueryParam(CREDENTIAL_PARAM),
                build_url: |bases, params| {
                    let date = params.require("date")?;
                    join(&bases.nasa_api, &["EPIC", "api", "natural", "date", date])
                },
            },
            RouteDescriptor {
                name: "neo",
                path: "/api/neo",
                required_params: &["start_date"],
                optional_params: &["end_date"],
                path_params: &[],
                fallbacks: &[("end_date", "start_date")],
                fixed_params: &[],
                credential: CredentialInjection::QueryParam(CREDENTIAL_PARAM),
                build_url: |bases, _| join(&bases.nasa_api, &["neo", "rest", "v1", "feed"]),
            },
            RouteDescriptor {
                name: "library",
                path: "/api/library",
                required_params: &["q"],
                optional_params: &[],
                path_params: &[],
                fallbacks: &[],
                fixed_params: &[("media_type", "image,video")],
                credential: CredentialInjection::None,
                build_url: |bases, _| join(&bases.nasa_images, &["search"]),
            },
        ])
    }

    pub fn resolve(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }
}

/// Append path segments to a base URL, percent-encoding each one
fn join(base: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| ApiError::Internal(format!("cannot extend base URL {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Where a single request currently stands in the pipeline
#[derive(Debug)]
pub enum Outcome {
    Pending,
    Validated(ValidatedParams),
    Rejected(ApiError),
    UpstreamSucceeded(UpstreamBody),
    UpstreamFailed(ApiError),
}

/// Successful upstream payload, forwarded byte for byte
#[derive(Debug, Clone)]
pub struct UpstreamBody {
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}

/// Per-request state, created on arrival and consumed by the translator
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub raw_params: std::collections::HashMap<String, String>,
    pub route: &'a RouteDescriptor,
    pub outcome: Outcome,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        route: &'a RouteDescriptor,
        raw_params: std::collections::HashMap<String, String>,
    ) -> Self {
        Self {
            raw_params,
            route,
            outcome: Outcome::Pending,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}
