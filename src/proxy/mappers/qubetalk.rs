// QubeTalk request composition
// Console proxy request -> upstream query, body and headers

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::proxy::endpoint::QubeTalkEndpoint;

/// Skips the tunneling provider's browser interstitial
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// Caller headers copied upstream only when present
pub const FORWARDED_HEADERS: &[&str] = &["authorization", "apikey", "x-client-info", "x-dev-override"];

/// Inbound proxy call from the console
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyRequest {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub query: Option<Map<String, Value>>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl ProxyRequest {
    /// Missing endpoint means the root resource; anything off the allow-list is rejected
    pub fn endpoint(&self) -> AppResult<QubeTalkEndpoint> {
        match self.endpoint.as_deref() {
            None => Ok(QubeTalkEndpoint::default()),
            Some(raw) => QubeTalkEndpoint::parse(raw)
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid endpoint: {}", raw))),
        }
    }

    pub fn method(&self) -> AppResult<Method> {
        match self.method.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            None => Ok(Method::GET),
            Some(raw) => Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
                .map_err(|_| AppError::InvalidInput(format!("Invalid method: {}", raw))),
        }
    }
}

/// Identifiers injected into every upstream call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedContext {
    pub tenant_id: String,
    pub persona_id: String,
}

/// `tenant_id` first, then the caller's entries in order.
/// Nulls are skipped and a caller `tenant_id` never replaces the resolved one.
pub fn build_query(tenant_id: &str, caller: Option<&Map<String, Value>>) -> Vec<(String, String)> {
    let mut pairs = vec![("tenant_id".to_string(), tenant_id.to_string())];

    for (key, value) in caller.into_iter().flatten() {
        if key == "tenant_id" {
            tracing::debug!("Dropping caller tenant_id query override");
            continue;
        }
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        };
        pairs.push((key.clone(), value));
    }

    pairs
}

/// Outbound body for non-GET calls: caller fields plus the resolved `tenant_id`
pub fn build_body(
    endpoint: QubeTalkEndpoint,
    body: Option<&Value>,
    tenant_id: &str,
) -> AppResult<Value> {
    let mut merged = match body {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(AppError::InvalidInput(
                "Request body must be a JSON object".to_string(),
            ))
        }
    };

    merged.insert("tenant_id".to_string(), Value::String(tenant_id.to_string()));

    // The root endpoint reads `message`; console clients send `content`
    if endpoint.is_root() {
        let has_message = merged.get("message").is_some_and(|m| !m.is_null());
        if !has_message {
            if let Some(content) = merged.get("content").filter(|c| !c.is_null()).cloned() {
                merged.insert("message".to_string(), content);
            }
        }
    }

    Ok(Value::Object(merged))
}

pub fn build_headers(inbound: &HeaderMap, context: &ResolvedContext) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();

    for &name in FORWARDED_HEADERS {
        if let Some(value) = inbound.get(name) {
            headers.insert(HeaderName::from_static(name), value.clone());
        }
    }

    headers.insert(
        HeaderName::from_static("x-persona-id"),
        header_value("x-persona-id", &context.persona_id)?,
    );
    headers.insert(
        HeaderName::from_static("x-tenant-id"),
        header_value("x-tenant-id", &context.tenant_id)?,
    );
    headers.insert(
        HeaderName::from_static(TUNNEL_BYPASS_HEADER),
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| AppError::InvalidInput(format!("Invalid {} value", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ResolvedContext {
        ResolvedContext {
            tenant_id: "t1".into(),
            persona_id: "p1".into(),
        }
    }

    #[test]
    fn test_request_defaults() {
        let request: ProxyRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(request.endpoint().unwrap(), QubeTalkEndpoint::Messages);
        assert_eq!(request.method().unwrap(), Method::GET);

        let request: ProxyRequest =
            serde_json::from_value(json!({"endpoint": "/inbox", "method": "post"})).unwrap();
        assert_eq!(request.endpoint().unwrap(), QubeTalkEndpoint::Inbox);
        assert_eq!(request.method().unwrap(), Method::POST);
    }

    #[test]
    fn test_unknown_endpoint_rejected() {
        let request: ProxyRequest =
            serde_json::from_value(json!({"endpoint": "/unknown"})).unwrap();
        assert!(matches!(request.endpoint(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_method_rejected() {
        let request: ProxyRequest =
            serde_json::from_value(json!({"method": "NOT A VERB"})).unwrap();
        assert!(matches!(request.method(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_query_tenant_first_and_scalars() {
        let caller = json!({
            "foo": "bar",
            "limit": 20,
            "unread": true,
            "cursor": null
        });
        let pairs = build_query("t1", caller.as_object());
        assert_eq!(
            pairs,
            vec![
                ("tenant_id".to_string(), "t1".to_string()),
                ("foo".to_string(), "bar".to_string()),
                ("limit".to_string(), "20".to_string()),
                ("unread".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_caller_tenant_cannot_override() {
        let caller = json!({"tenant_id": "attacker", "foo": "bar"});
        let pairs = build_query("t1", caller.as_object());
        let tenants: Vec<_> = pairs.iter().filter(|(k, _)| k == "tenant_id").collect();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].1, "t1");
    }

    #[test]
    fn test_body_content_aliased_to_message_on_root() {
        let body = json!({"content": "hi"});
        let out = build_body(QubeTalkEndpoint::Messages, Some(&body), "T9").unwrap();
        assert_eq!(out, json!({"content": "hi", "tenant_id": "T9", "message": "hi"}));
    }

    #[test]
    fn test_body_existing_message_untouched() {
        let body = json!({"content": "hi", "message": "original"});
        let out = build_body(QubeTalkEndpoint::Messages, Some(&body), "T9").unwrap();
        assert_eq!(out["message"], "original");
        assert_eq!(out["content"], "hi");
    }

    #[test]
    fn test_body_no_alias_on_sub_resources() {
        let body = json!({"content": "hi"});
        let out = build_body(QubeTalkEndpoint::Channels, Some(&body), "T9").unwrap();
        assert!(out.get("message").is_none());
    }

    #[test]
    fn test_body_injected_tenant_wins() {
        let body = json!({"tenant_id": "caller", "name": "launch"});
        let out = build_body(QubeTalkEndpoint::Channels, Some(&body), "T9").unwrap();
        assert_eq!(out, json!({"tenant_id": "T9", "name": "launch"}));
    }

    #[test]
    fn test_body_missing_or_invalid() {
        let out = build_body(QubeTalkEndpoint::Inbox, None, "T9").unwrap();
        assert_eq!(out, json!({"tenant_id": "T9"}));

        let err = build_body(QubeTalkEndpoint::Inbox, Some(&json!(["a"])), "T9").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_headers_forward_only_present() {
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer abc"));
        inbound.insert("x-dev-override", HeaderValue::from_static("1"));
        inbound.insert("cookie", HeaderValue::from_static("secret"));

        let headers = build_headers(&inbound, &context()).unwrap();
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers["x-dev-override"], "1");
        assert!(headers.get("apikey").is_none());
        assert!(headers.get("x-client-info").is_none());
        assert!(headers.get("cookie").is_none());

        assert_eq!(headers["x-persona-id"], "p1");
        assert_eq!(headers["x-tenant-id"], "t1");
        assert_eq!(headers[TUNNEL_BYPASS_HEADER], "true");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["accept"], "application/json");
    }
}
