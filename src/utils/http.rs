use reqwest::{Client, Proxy};

use crate::proxy::config::UpstreamProxyConfig;

/// Create an HTTP client with an optional timeout and upstream proxy
pub fn create_client_with_proxy(
    timeout_secs: Option<u64>,
    proxy_config: Option<&UpstreamProxyConfig>,
) -> Client {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs(secs));
    }

    if let Some(config) = proxy_config {
        if config.enabled && !config.url.is_empty() {
            match Proxy::all(&config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("HTTP client upstream proxy enabled: {}", config.url);
                }
                Err(e) => {
                    tracing::error!("Invalid proxy address: {}, error: {}", config.url, e);
                }
            }
        }
    }

    builder.build().unwrap_or_else(|_| Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_proxy_still_builds_client() {
        let config = UpstreamProxyConfig {
            enabled: true,
            url: "::not a proxy::".to_string(),
        };
        let _client = create_client_with_proxy(Some(5), Some(&config));
    }
}
