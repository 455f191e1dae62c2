/// Request pipeline: validate, call upstream, hand the outcome to the translator
use crate::clients::UpstreamClient;
use crate::config::{Credential, UpstreamBases};
use crate::domain::{Outcome, RequestContext, RouteDescriptor, ValidatedParams};
use crate::errors::{ApiError, ApiResult};
use std::collections::HashMap;
use tracing::info;

/// Check inbound query parameters against a route descriptor.
///
/// Fails on the first required parameter that is absent or empty. Optional
/// parameters are forwarded only when non-empty; anything undeclared is dropped.
pub fn validate(
    route: &RouteDescriptor,
    raw: &HashMap<String, String>,
) -> ApiResult<ValidatedParams> {
    let mut params = ValidatedParams::default();

    for name in route.required_params {
        match raw.get(*name) {
            Some(value) if !value.is_empty() => params.insert(*name, value.clone()),
            _ => return Err(ApiError::MissingParameter(*name)),
        }
    }

    for name in route.optional_params {
        if let Some(value) = raw.get(*name).filter(|v| !v.is_empty()) {
            params.insert(*name, value.clone());
        }
    }

    Ok(params)
}

/// Stateless proxy pipeline shared by every route
pub struct GatewayService {
    client: UpstreamClient,
    bases: UpstreamBases,
    credential: Credential,
}

impl GatewayService {
    pub fn new(client: UpstreamClient, bases: UpstreamBases, credential: Credential) -> Self {
        Self {
            client,
            bases,
            credential,
        }
    }

    /// Run one request through validation and the upstream call
    pub async fn proxy<'a>(
        &self,
        route: &'a RouteDescriptor,
        raw: HashMap<String, String>,
    ) -> RequestContext<'a> {
        let mut ctx = RequestContext::new(route, raw);

        ctx.outcome = match validate(route, &ctx.raw_params) {
            Ok(params) => Outcome::Validated(params),
            Err(err) => {
                info!("rejected {} request: {}", route.name, err);
                Outcome::Rejected(err)
            }
        };

        if let Outcome::Validated(params) = &ctx.outcome {
            ctx.outcome = match self.call(route, params).await {
                Ok(body) => Outcome::UpstreamSucceeded(body),
                Err(err) => Outcome::UpstreamFailed(err),
            };
        }

        ctx
    }

    async fn call(
        &self,
        route: &RouteDescriptor,
        params: &ValidatedParams,
    ) -> ApiResult<crate::domain::UpstreamBody> {
        let url = route.upstream_url(&self.bases, params, &self.credential)?;
        self.client.fetch(url).await.into_result()
    }
}
