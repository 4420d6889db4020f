// Identity-resolution client
// Turns a `name@domain` handle into an identity-space persona id

use reqwest::{header, Client};
use serde_json::Value;

use crate::proxy::mappers::qubetalk::TUNNEL_BYPASS_HEADER;

/// Key paths probed for the persona id, first match wins
const PERSONA_ID_RULES: &[&[&str]] = &[
    &["id"],
    &["persona_id"],
    &["persona", "id"],
    &["persona", "persona_id"],
];

/// Key paths probed for the tenant id, first match wins
const TENANT_ID_RULES: &[&[&str]] = &[
    &["tenant_id"],
    &["tenant", "id"],
    &["tenant", "tenant_id"],
    &["persona", "tenant_id"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMatch {
    pub persona_id: String,
    pub tenant_id: Option<String>,
}

pub struct IdentityClient {
    http_client: Client,
    base_url: String,
    path_prefix: String,
}

impl IdentityClient {
    pub fn new(http_client: Client, base_url: &str, path_prefix: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            path_prefix: path_prefix.to_string(),
        }
    }

    fn build_url(&self, handle: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url,
            self.path_prefix,
            encode_component(handle)
        )
    }

    /// Any failure is reported as `None`; the caller moves on to its next fallback
    pub async fn resolve(&self, handle: &str, tenant_hint: Option<&str>) -> Option<IdentityMatch> {
        let url = self.build_url(handle);

        let mut request = self
            .http_client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .header(TUNNEL_BYPASS_HEADER, "true");
        if let Some(tenant) = tenant_hint {
            request = request.header("x-tenant-id", tenant);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Identity lookup for {} failed: {}", handle, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Identity lookup for {} returned {}",
                handle,
                response.status()
            );
            return None;
        }

        let data: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Identity response for {} is not JSON: {}", handle, e);
                return None;
            }
        };

        let found = extract_identity(&data);
        if found.is_none() {
            tracing::debug!("Identity response for {} carried no persona id", handle);
        }
        found
    }
}

/// Pull persona and tenant ids out of an identity response.
/// The payload may be wrapped in a `data` object.
pub fn extract_identity(body: &Value) -> Option<IdentityMatch> {
    let root = match body.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => body,
    };

    let persona_id = first_match(root, PERSONA_ID_RULES)?;
    let tenant_id = first_match(root, TENANT_ID_RULES);
    Some(IdentityMatch {
        persona_id,
        tenant_id,
    })
}

fn first_match(root: &Value, rules: &[&[&str]]) -> Option<String> {
    rules.iter().find_map(|rule| {
        let value = rule.iter().try_fold(root, |node, key| node.get(*key))?;
        id_string(value)
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Percent-encode a single path component the way `encodeURIComponent` does
pub fn encode_component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
