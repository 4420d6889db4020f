pub mod error;
pub mod models;
pub mod modules;
pub mod proxy; // QubeTalk relay service
pub mod utils;

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use error::AppResult;
use models::AppConfig;
use proxy::handle_cache::HandleCache;
use proxy::handle_resolver::HandleResolver;
use proxy::identity::IdentityClient;
use proxy::persona_store::{PersonaStore, RestPersonaStore};
use proxy::stats::StatsCounter;
use proxy::upstream::UpstreamClient;
use proxy::{AppState, AxumServer, QubeTalkRelay};

/// Pick the persona store: Supabase first, then a local SQLite file, else none
pub fn build_persona_store(
    config: &AppConfig,
    http_client: &reqwest::Client,
) -> AppResult<Option<Arc<dyn PersonaStore>>> {
    if let Some((url, key)) = config.store.rest_credentials() {
        info!("Persona store: Supabase view {}", config.store.view);
        let store = RestPersonaStore::new(http_client.clone(), url, key, &config.store.view);
        return Ok(Some(Arc::new(store)));
    }

    if let Some(path) = config.store.persona_db_path.as_deref() {
        info!("Persona store: SQLite {}", path);
        let store = modules::db::SqlitePersonaStore::open(Path::new(path))?;
        return Ok(Some(Arc::new(store)));
    }

    warn!("No persona store configured, handles resolve through the identity service only");
    Ok(None)
}

/// Wire the relay and its collaborators from configuration
pub fn build_app_state(config: &AppConfig) -> AppResult<AppState> {
    let http_client = utils::http::create_client_with_proxy(
        config.proxy.request_timeout,
        Some(&config.proxy.upstream_proxy),
    );

    let store = build_persona_store(config, &http_client)?;
    let identity = IdentityClient::new(
        http_client.clone(),
        config.relay.api_base().unwrap_or_default(),
        &config.relay.identity_path,
    );
    let resolver = HandleResolver::new(Arc::new(HandleCache::new()), store, identity);
    let relay = QubeTalkRelay::new(
        Arc::new(config.relay.clone()),
        resolver,
        UpstreamClient::new(http_client),
    );

    Ok(AppState {
        relay: Arc::new(relay),
        stats: Arc::new(StatsCounter::new()),
    })
}

/// Load config, start the server and run until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    let config = modules::load_app_config()?;
    modules::init_logger(config.log_dir.as_deref());

    if config.relay.api_base().is_none() {
        warn!("QUBETALK_API_URL is not set; proxy calls will fail until it is configured");
    }

    let state = build_app_state(&config)?;
    let (server, handle) =
        AxumServer::start(config.proxy.get_bind_address(), config.proxy.port, state).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    server.stop();
    handle.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_store_configured() {
        let config = AppConfig::new();
        let store = build_persona_store(&config, &reqwest::Client::new()).unwrap();
        assert!(store.is_none());
    }

    #[test]
    fn test_sqlite_store_selected_without_supabase() {
        let dir = std::env::temp_dir().join(format!("qubetalk-db-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = AppConfig::new();
        config.store.persona_db_path = Some(dir.join("personas.db").to_string_lossy().into_owned());

        let store = build_persona_store(&config, &reqwest::Client::new()).unwrap();
        assert!(store.is_some());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_build_app_state_without_upstream() {
        let state = build_app_state(&AppConfig::new()).unwrap();
        assert_eq!(state.relay.resolver().cache().len(), 0);
    }
}
