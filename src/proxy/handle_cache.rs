use dashmap::DashMap;

/// What a handle resolved to. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedHandle {
    pub persona_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl ResolvedHandle {
    /// Replace the tenant only when a new one is actually supplied
    pub fn adopt_tenant(&mut self, tenant_id: Option<&str>) {
        if let Some(tenant) = tenant_id.filter(|t| !t.is_empty()) {
            self.tenant_id = Some(tenant.to_string());
        }
    }
}

/// Process-lifetime handle cache (trimmed handle -> ResolvedHandle).
/// No TTL and no eviction.
#[derive(Default)]
pub struct HandleCache {
    entries: DashMap<String, ResolvedHandle>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: &str) -> Option<ResolvedHandle> {
        self.entries.get(handle).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, handle: &str, resolved: ResolvedHandle) {
        self.entries.insert(handle.to_string(), resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
