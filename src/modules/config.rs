use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

/// Names the optional JSON config file
const CONFIG_FILE_ENV: &str = "QUBETALK_PROXY_CONFIG";

/// Load application config: defaults, then the optional JSON file, then environment
pub fn load_app_config() -> AppResult<AppConfig> {
    let mut config = match std::env::var(CONFIG_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => load_config_file(Path::new(path.trim()))?,
        _ => AppConfig::new(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

pub fn load_config_file(path: &Path) -> AppResult<AppConfig> {
    if !path.exists() {
        return Err(AppError::Config(format!(
            "Config file does not exist: {:?}",
            path
        )));
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))
}

/// Overlay recognized environment variables. Empty values are ignored;
/// unparseable numeric values are a configuration error.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(v) = get("QUBETALK_API_URL") {
        config.relay.api_url = Some(v);
    }
    if let Some(v) = get("QUBETALK_API_PREFIX") {
        config.relay.api_prefix = v;
    }
    if let Some(v) = get("QUBETALK_TENANT_ID") {
        config.relay.default_tenant_id = Some(v);
    }
    if let Some(v) = get("QUBETALK_PERSONA_HANDLE") {
        config.relay.default_persona_handle = Some(v);
    }
    if let Some(v) = get("QUBETALK_PERSONA_ID") {
        config.relay.default_persona_id = Some(v);
    }
    if let Some(v) = get("QUBETALK_IDENTITY_PATH") {
        config.relay.identity_path = v;
    }

    if let Some(v) = get("SUPABASE_URL") {
        config.store.supabase_url = Some(v);
    }
    if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
        config.store.service_role_key = Some(v);
    }
    if let Some(v) = get("SUPABASE_ANON_KEY") {
        config.store.anon_key = Some(v);
    }
    if let Some(v) = get("QUBETALK_PERSONA_DB") {
        config.store.persona_db_path = Some(v);
    }

    if let Some(v) = get("QUBETALK_PROXY_PORT") {
        config.proxy.port = parse_env("QUBETALK_PROXY_PORT", &v)?;
    }
    if let Some(v) = get("QUBETALK_PROXY_ALLOW_LAN") {
        config.proxy.allow_lan_access = matches!(v.as_str(), "1" | "true" | "yes");
    }
    if let Some(v) = get("QUBETALK_PROXY_TIMEOUT") {
        config.proxy.request_timeout = Some(parse_env("QUBETALK_PROXY_TIMEOUT", &v)?);
    }
    if let Some(v) = get("QUBETALK_UPSTREAM_PROXY") {
        config.proxy.upstream_proxy.enabled = true;
        config.proxy.upstream_proxy.url = v;
    }
    if let Some(v) = get("QUBETALK_LOG_DIR") {
        config.log_dir = Some(v);
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::Config(format!("Invalid {}: {}", key, value)))
}
