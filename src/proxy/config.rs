use serde::{Deserialize, Serialize};

/// 反代服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// 是否允许局域网访问
    /// - false: 仅本机访问 127.0.0.1（默认，隐私优先）
    /// - true: 允许局域网访问 0.0.0.0
    pub allow_lan_access: bool,

    /// 监听端口
    pub port: u16,

    /// Outbound request timeout in seconds. `None` keeps the HTTP client default.
    pub request_timeout: Option<u64>,

    /// 上游代理配置
    pub upstream_proxy: UpstreamProxyConfig,
}

/// 上游代理配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// 是否启用
    pub enabled: bool,
    /// 代理地址 (http://, https://, socks5://)
    pub url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false, // 默认仅本机访问，隐私优先
            port: 8046,
            request_timeout: None,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// 获取实际的监听地址
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }
}

/// QubeTalk upstream and persona defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Base URL of the agent-messaging API. Requests fail with a
    /// configuration error while this is unset.
    pub api_url: Option<String>,
    pub api_prefix: String,
    pub default_tenant_id: Option<String>,
    /// Handle used when the caller sends no `x-persona-id`
    pub default_persona_handle: Option<String>,
    /// Already-resolved persona id, used when a handle cannot be resolved
    pub default_persona_id: Option<String>,
    /// Path on the upstream host that resolves a handle to an identity-space persona
    pub identity_path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_prefix: "/api/qubetalk".to_string(),
            default_tenant_id: None,
            default_persona_handle: None,
            default_persona_id: None,
            identity_path: "/api/identity/resolve/".to_string(),
        }
    }
}

impl RelayConfig {
    /// Upstream base with any trailing slash removed, or `None` when unset
    pub fn api_base(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty())
    }
}

/// Persona-identity store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub supabase_url: Option<String>,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
    /// View joining persona identity data, queried through PostgREST
    pub view: String,
    /// Local SQLite file, used when no Supabase store is configured
    pub persona_db_path: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            service_role_key: None,
            anon_key: None,
            view: "persona_identity_view".to_string(),
            persona_db_path: None,
        }
    }
}

impl StoreConfig {
    /// Service-role key preferred, anonymous key as fallback
    pub fn api_key(&self) -> Option<&str> {
        self.service_role_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or_else(|| self.anon_key.as_deref().filter(|k| !k.is_empty()))
    }

    /// Supabase URL and key, only when both are present
    pub fn rest_credentials(&self) -> Option<(&str, &str)> {
        let url = self.supabase_url.as_deref().filter(|u| !u.is_empty())?;
        Some((url.trim_end_matches('/'), self.api_key()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_trims_trailing_slash() {
        let config = RelayConfig {
            api_url: Some("https://agents.example.com/".into()),
            ..Default::default()
        };
        assert_eq!(config.api_base(), Some("https://agents.example.com"));

        let unset = RelayConfig {
            api_url: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(unset.api_base(), None);
    }

    #[test]
    fn test_store_prefers_service_role_key() {
        let mut store = StoreConfig {
            supabase_url: Some("https://db.example.com/".into()),
            service_role_key: Some("service".into()),
            anon_key: Some("anon".into()),
            ..Default::default()
        };
        assert_eq!(
            store.rest_credentials(),
            Some(("https://db.example.com", "service"))
        );

        store.service_role_key = None;
        assert_eq!(store.api_key(), Some("anon"));

        store.anon_key = None;
        assert_eq!(store.rest_credentials(), None);
    }

    #[test]
    fn test_bind_address() {
        let mut config = ProxyConfig::default();
        assert_eq!(config.get_bind_address(), "127.0.0.1");
        config.allow_lan_access = true;
        assert_eq!(config.get_bind_address(), "0.0.0.0");
    }
}
