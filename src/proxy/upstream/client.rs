// Upstream client implementation
// Single-attempt calls to the QubeTalk agent-messaging API

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use url::Url;

use crate::error::{AppError, AppResult};
use crate::proxy::endpoint::QubeTalkEndpoint;

/// Upstream status and body, mirrored to the caller unchanged
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Value,
}

impl UpstreamReply {
    /// JSON when the text parses, `{ "raw": text }` otherwise
    pub fn from_text(status: u16, text: &str) -> Self {
        let body = serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }));
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    /// Build the upstream URL: base + prefix + endpoint suffix, then the query pairs
    pub fn build_url(
        base: &str,
        prefix: &str,
        endpoint: QubeTalkEndpoint,
        query: &[(String, String)],
    ) -> AppResult<Url> {
        let raw = format!(
            "{}{}{}",
            base.trim_end_matches('/'),
            prefix,
            endpoint.upstream_suffix()
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| AppError::Config(format!("Invalid upstream URL {}: {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Send one request. Upstream error statuses are returned, not raised;
    /// only transport failures produce an error.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> AppResult<UpstreamReply> {
        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        Ok(UpstreamReply::from_text(status, &text))
    }
}
