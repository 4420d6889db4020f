use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{AppError, AppResult};
use crate::proxy::persona_store::{PersonaIdentity, PersonaStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS persona_identity (
    handle TEXT,
    identity_persona_id TEXT,
    crm_persona_id TEXT,
    tenant_id TEXT
)";

/// Local SQLite copy of the persona-identity view
pub struct SqlitePersonaStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersonaStore {
    /// Open (or create) the persona database file
    pub fn open(db_path: &Path) -> AppResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Seed or replace a row, keyed by handle and tenant
    pub fn upsert_identity(&self, row: &PersonaIdentity) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM persona_identity WHERE handle IS ?1 AND tenant_id IS ?2",
            params![row.handle, row.tenant_id],
        )?;
        conn.execute(
            "INSERT INTO persona_identity (handle, identity_persona_id, crm_persona_id, tenant_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.handle,
                row.identity_persona_id,
                row.crm_persona_id,
                row.tenant_id
            ],
        )?;
        Ok(())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        lock_conn(&self.conn)
    }

    /// Lookups run on tokio's blocking pool
    async fn find_one(
        &self,
        column: &'static str,
        value: &str,
        tenant_id: Option<&str>,
    ) -> AppResult<Option<PersonaIdentity>> {
        let conn = self.conn.clone();
        let value = value.to_string();
        let tenant_id = tenant_id.map(String::from);

        tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&conn)?;
            query_one(&conn, column, &value, tenant_id.as_deref())
        })
        .await
        .map_err(|e| AppError::Store(format!("persona query task failed: {}", e)))?
    }
}

fn lock_conn(conn: &Mutex<Connection>) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| AppError::Store("persona database lock poisoned".to_string()))
}

fn query_one(
    conn: &Connection,
    column: &str,
    value: &str,
    tenant_id: Option<&str>,
) -> AppResult<Option<PersonaIdentity>> {
    let sql = format!(
        "SELECT handle, identity_persona_id, crm_persona_id, tenant_id
         FROM persona_identity
         WHERE {} = ?1 AND (?2 IS NULL OR tenant_id = ?2)
         LIMIT 1",
        column
    );
    let row = conn
        .query_row(&sql, params![value, tenant_id], |row| {
            Ok(PersonaIdentity {
                handle: row.get(0)?,
                identity_persona_id: row.get(1)?,
                crm_persona_id: row.get(2)?,
                tenant_id: row.get(3)?,
            })
        })
        .optional()?;
    Ok(row)
}

#[async_trait]
impl PersonaStore for SqlitePersonaStore {
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
