// QubeTalk relay
// Validate -> resolve tenant/persona -> compose -> single upstream call

use axum::http::HeaderMap;
use reqwest::Method;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::proxy::config::RelayConfig;
use crate::proxy::handle_resolver::HandleResolver;
use crate::proxy::mappers::qubetalk::{
    build_body, build_headers, build_query, ProxyRequest, ResolvedContext,
};
use crate::proxy::upstream::{UpstreamClient, UpstreamReply};

pub struct QubeTalkRelay {
    config: Arc<RelayConfig>,
    resolver: HandleResolver,
    upstream: UpstreamClient,
}

impl QubeTalkRelay {
    pub fn new(config: Arc<RelayConfig>, resolver: HandleResolver, upstream: UpstreamClient) -> Self {
        Self {
            config,
            resolver,
            upstream,
        }
    }

    pub fn resolver(&self) -> &HandleResolver {
        &self.resolver
    }

    /// Handle one console call end to end
    pub async fn handle(&self, inbound: &HeaderMap, raw_body: &[u8]) -> AppResult<UpstreamReply> {
        let base = self
            .config
            .api_base()
            .ok_or_else(|| AppError::Config("QUBETALK_API_URL is not configured".to_string()))?;

        let request: ProxyRequest = if raw_body.iter().all(u8::is_ascii_whitespace) {
            ProxyRequest::default()
        } else {
            serde_json::from_slice(raw_body)
                .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))?
        };

        let endpoint = request.endpoint()?;
        let method = request.method()?;

        let context = self.resolve_context(inbound).await;

        let query = build_query(&context.tenant_id, request.query.as_ref());
        let url = UpstreamClient::build_url(base, &self.config.api_prefix, endpoint, &query)?;
        let body = if method == Method::GET {
            None
        } else {
            Some(build_body(endpoint, request.body.as_ref(), &context.tenant_id)?)
        };
        let headers = build_headers(inbound, &context)?;

        tracing::info!(
            "QubeTalk {} {} (tenant: {}, persona: {})",
            method,
            endpoint,
            context.tenant_id,
            context.persona_id
        );

        let reply = self
            .upstream
            .send(method, url, headers, body.as_ref())
            .await?;

        if !reply.is_success() {
            tracing::warn!("QubeTalk upstream returned {} for {}", reply.status, endpoint);
        }
        Ok(reply)
    }

    /// Caller headers, then configured defaults, then handle resolution.
    /// A tenant only changes when resolution returns one.
    pub async fn resolve_context(&self, inbound: &HeaderMap) -> ResolvedContext {
        let mut tenant_id = header_str(inbound, "x-tenant-id")
            .or(non_empty(self.config.default_tenant_id.as_deref()))
            .unwrap_or_default()
            .to_string();

        let candidate = header_str(inbound, "x-persona-id")
            .or(non_empty(self.config.default_persona_handle.as_deref()))
            .or(non_empty(self.config.default_persona_id.as_deref()))
            .unwrap_or_default()
            .to_string();

        let tenant_hint = Some(tenant_id.as_str()).filter(|t| !t.is_empty());
        let resolved = self.resolver.resolve(&candidate, tenant_hint).await;

        if let Some(tenant) = resolved.tenant_id {
            tenant_id = tenant;
        }

        let persona_id = resolved
            .persona_id
            .or_else(|| non_empty(self.config.default_persona_id.as_deref()).map(String::from))
            .unwrap_or(candidate);

        ResolvedContext {
            tenant_id,
            persona_id,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
