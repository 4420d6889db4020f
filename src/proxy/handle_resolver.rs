// Persona handle resolver
// name@domain -> (upstream persona id, tenant id), store first, identity service second

use std::sync::Arc;

use crate::proxy::handle_cache::{HandleCache, ResolvedHandle};
use crate::proxy::identity::IdentityClient;
use crate::proxy::persona_store::{PersonaIdentity, PersonaStore};

pub struct HandleResolver {
    cache: Arc<HandleCache>,
    store: Option<Arc<dyn PersonaStore>>,
    identity: IdentityClient,
}

impl HandleResolver {
    pub fn new(
        cache: Arc<HandleCache>,
        store: Option<Arc<dyn PersonaStore>>,
        identity: IdentityClient,
    ) -> Self {
        Self {
            cache,
            store,
            identity,
        }
    }

    pub fn cache(&self) -> &Arc<HandleCache> {
        &self.cache
    }

    /// Resolve a persona identifier.
    ///
    /// Identifiers without `@` are already persona ids. Handles are looked up
    /// in the cache, then the persona store, then the identity service (whose
    /// id is mapped back through the store). Whatever is found, even nothing,
    /// is cached under the trimmed handle. Lookup failures are never returned.
    pub async fn resolve(&self, identifier: &str, tenant_hint: Option<&str>) -> ResolvedHandle {
        let key = identifier.trim();
        if key.is_empty() {
            return ResolvedHandle::default();
        }

        if !key.contains('@') {
            let resolved = ResolvedHandle {
                persona_id: Some(key.to_string()),
                tenant_id: None,
            };
            self.cache.insert(key, resolved.clone());
            return resolved;
        }

        if let Some(hit) = self.cache.get(key) {
            tracing::debug!("Handle cache hit: {}", key);
            return hit;
        }

        let tenant_hint = tenant_hint.filter(|t| !t.is_empty());
        let mut resolved = ResolvedHandle::default();

        // 1. Direct store lookup by handle
        if let Some(row) = self.store_by_handle(key, tenant_hint).await {
            if let Some(persona_id) = row.persona_id() {
                tracing::debug!("Handle {} resolved by persona store", key);
                resolved.persona_id = Some(persona_id.to_string());
                resolved.adopt_tenant(row.tenant());
            }
        }

        // 2. Identity service, then map the identity id into the upstream id space
        if resolved.persona_id.is_none() {
            if let Some(found) = self.identity.resolve(key, tenant_hint).await {
                tracing::debug!(
                    "Handle {} resolved by identity service to {}",
                    key,
                    found.persona_id
                );
                resolved.persona_id = Some(found.persona_id.clone());
                resolved.adopt_tenant(found.tenant_id.as_deref());

                let scope = resolved.tenant_id.clone();
                let scope = scope.as_deref().or(tenant_hint);
                if let Some(row) = self.store_by_identity(&found.persona_id, scope).await {
                    if let Some(crm_id) = row.crm_persona_id.as_deref().filter(|s| !s.is_empty()) {
                        resolved.persona_id = Some(crm_id.to_string());
                    }
                    resolved.adopt_tenant(row.tenant());
                }
            }
        }

        if resolved.persona_id.is_none() {
            tracing::warn!("Could not resolve persona handle {}", key);
        }

        self.cache.insert(key, resolved.clone());
        resolved
    }

    async fn store_by_handle(&self, handle: &str, tenant: Option<&str>) -> Option<PersonaIdentity> {
        let store = self.store.as_ref()?;
        if let Some(tenant_id) = tenant {
            match store.find_by_handle(handle, Some(tenant_id)).await {
                Ok(Some(row)) => return Some(row),
                Ok(None) => {}
                Err(e) => tracing::warn!("Persona lookup for {} failed: {}", handle, e),
            }
        }
        match store.find_by_handle(handle, None).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Persona lookup for {} failed: {}", handle, e);
                None
            }
        }
    }

    async fn store_by_identity(
        &self,
        identity_id: &str,
        tenant: Option<&str>,
    ) -> Option<PersonaIdentity> {
        let store = self.store.as_ref()?;
        if let Some(tenant_id) = tenant {
            match store.find_by_identity_id(identity_id, Some(tenant_id)).await {
                Ok(Some(row)) => return Some(row),
                Ok(None) => {}
                Err(e) => tracing::warn!("Identity mapping for {} failed: {}", identity_id, e),
            }
        }
        match store.find_by_identity_id(identity_id, None).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Identity mapping for {} failed: {}", identity_id, e);
                None
            }
        }
    }
}
