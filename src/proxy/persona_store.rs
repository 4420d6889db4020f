// Persona-identity store
// Read-only lookups against the view joining persona identity data

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const SELECT_COLUMNS: &str = "handle,identity_persona_id,crm_persona_id,tenant_id";

/// One row of the persona-identity view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaIdentity {
    #[serde(default)]
    pub handle: Option<String>,
    /// Persona id in the identity service's id space
    #[serde(default)]
    pub identity_persona_id: Option<String>,
    /// Persona id the upstream messaging API expects
    #[serde(default)]
    pub crm_persona_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl PersonaIdentity {
    /// Upstream-space id, falling back to the identity-space id
    pub fn persona_id(&self) -> Option<&str> {
        self.crm_persona_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.identity_persona_id.as_deref().filter(|s| !s.is_empty()))
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant_id.as_deref().filter(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait PersonaStore: Send + Sync {
    /// Find a row whose handle matches, restricted to `tenant_id` when given
    async fn find_by_handle(
        &self,
        handle: &str,
        tenant_id: Option<&str>,
    ) -> AppResult<Option<PersonaIdentity>>;

    /// Map an identity-space persona id to its row, restricted to `tenant_id` when given
    async fn find_by_identity_id(
        &self,
        identity_id: &str,
        tenant_id: Option<&str>,
    ) -> AppResult<Option<PersonaIdentity>>;
}

/// PostgREST (Supabase) backed store
pub struct RestPersonaStore {
    http_client: Client,
    base_url: String,
    api_key: String,
    view: String,
}

impl RestPersonaStore {
    pub fn new(http_client: Client, base_url: &str, api_key: &str, view: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            view: view.to_string(),
        }
    }

    fn build_url(&self, column: &str, value: &str, tenant_id: Option<&str>) -> AppResult<url::Url> {
        let mut url = url::Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.view))
            .map_err(|e| AppError::Config(format!("Invalid store URL: {}", e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", SELECT_COLUMNS);
            pairs.append_pair(column, &format!("eq.{}", value));
            if let Some(tenant) = tenant_id {
                pairs.append_pair("tenant_id", &format!("eq.{}", tenant));
            }
            pairs.append_pair("limit", "1");
        }
        Ok(url)
    }

    async fn find_one(
        &self,
        column: &str,
        value: &str,
        tenant_id: Option<&str>,
    ) -> AppResult<Option<PersonaIdentity>> {
        let url = self.build_url(column, value, tenant_id)?;

        let response = self
            .http_client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(format!(
                "{} query returned {}: {}",
                self.view, status, body
            )));
        }

        let rows: Vec<PersonaIdentity> = response.json().await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl PersonaStore for RestPersonaStore {
    async fn find_by_handle(
        &self,
        handle: &str,
        tenant_id: Option<&str>,
    ) -> AppResult<Option<PersonaIdentity>> {
        self.find_one("handle", handle, tenant_id).await
    }

    async fn find_by_identity_id(
        &self,
        identity_id: &str,
        tenant_id: Option<&str>,
    ) -> AppResult<Option<PersonaIdentity>> {
        self.find_one("identity_persona_id", identity_id, tenant_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> RestPersonaStore {
        RestPersonaStore::new(Client::new(), &server.uri(), "service-key", "persona_identity_view")
    }

    #[test]
    fn test_persona_id_prefers_crm() {
        let row = PersonaIdentity {
            identity_persona_id: Some("idp-1".into()),
            crm_persona_id: Some("crm-1".into()),
            ..Default::default()
        };
        assert_eq!(row.persona_id(), Some("crm-1"));

        let identity_only = PersonaIdentity {
            identity_persona_id: Some("idp-1".into()),
            crm_persona_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(identity_only.persona_id(), Some("idp-1"));
        assert_eq!(PersonaIdentity::default().persona_id(), None);
    }

    #[tokio::test]
    async fn test_find_by_handle_scoped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/persona_identity_view"))
            .and(query_param("handle", "eq.alice@example.com"))
            .and(query_param("tenant_id", "eq.t1"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "handle": "alice@example.com",
                "identity_persona_id": "idp-1",
                "crm_persona_id": "crm-1",
                "tenant_id": "t1"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let row = store(&server)
            .find_by_handle("alice@example.com", Some("t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.crm_persona_id.as_deref(), Some("crm-1"));
        assert_eq!(row.tenant(), Some("t1"));
    }

    #[tokio::test]
    async fn test_empty_result_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/persona_identity_view"))
            .and(query_param("identity_persona_id", "eq.idp-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let row = store(&server).find_by_identity_id("idp-9", None).await.unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = store(&server)
            .find_by_handle("alice@example.com", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }
}
