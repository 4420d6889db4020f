use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Resolve the log directory, creating it when missing
pub fn get_log_dir(override_dir: Option<&str>) -> AppResult<PathBuf> {
    let log_dir = match override_dir {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_local_dir()
            .ok_or_else(|| AppError::Config("Failed to get local data directory".to_string()))?
            .join("qubetalk-proxy")
            .join("logs"),
    };

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    Ok(log_dir)
}

/// Initialize logger system
pub fn init_logger(override_dir: Option<&str>) {
    // Capture log macro logs
    let _ = tracing_log::LogTracer::init();

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = match get_log_dir(override_dir) {
        Ok(dir) => dir,
        Err(e) => {
            // Console-only when the directory is unusable
            eprintln!("Failed to initialize log directory: {}", e);
            let _ = tracing_subscriber::registry()
                .with(filter_layer)
                .with(console_layer)
                .try_init();
            return;
        }
    };

    let file_appender = tracing_appender::rolling::daily(&log_dir, "qubetalk-proxy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    // The writer flushes for as long as the guard lives, which is the process lifetime
    std::mem::forget(guard);

    info!("Logger system initialized (Console + File: {:?})", log_dir);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_dir_creates_override() {
        let dir = std::env::temp_dir().join(format!("qubetalk-logs-{}", uuid::Uuid::new_v4()));
        let resolved = get_log_dir(dir.to_str()).unwrap();
        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
        let _ = fs::remove_dir_all(dir);
    }
}
