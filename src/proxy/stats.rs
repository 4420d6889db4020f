use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Proxy service statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub cached_handles: usize,
    pub started_at: String,
}

/// Live counters behind `/stats`
pub struct StatsCounter {
    total: AtomicU64,
    success: AtomicU64,
    error: AtomicU64,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            success: AtomicU64::new(0),
            error: AtomicU64::new(0),
            started_at: chrono::Utc::now(),
        }
    }

    /// Count one relay call; upstream 2xx is a success, everything else an error
    pub fn record(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, cached_handles: usize) -> ProxyStats {
        ProxyStats {
            total_requests: self.total.load(Ordering::Relaxed),
            success_count: self.success.load(Ordering::Relaxed),
            error_count: self.error.load(Ordering::Relaxed),
            cached_handles,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

impl Default for StatsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = StatsCounter::new();
        stats.record(true);
        stats.record(false);
        stats.record(true);

        let snapshot = stats.snapshot(4);
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.success_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.cached_handles, 4);
        assert!(!snapshot.started_at.is_empty());
    }
}
