//! SurrealDB-backed ReportStore implementation
//!
//! Uses `schema::RepositoryRow` for persistence, converting to/from
//! `storage_traits` types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::RepositoryRow;
use crate::storage_traits::{CachedReport, RepositoryIdentity, ReportStore, StorageResult};

/// Connection settings for a SurrealDB endpoint
#[derive(Debug, Clone)]
pub struct SurrealConfig {
    /// Endpoint URL (`mem://`, `surrealkv://path`, `ws://host:port`, `wss://...`)
    pub endpoint: String,
    /// Namespace (default: "reportcard")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Optional credentials; no sign-in is attempted without them
    pub credentials: Option<SurrealCredentials>,
}

/// Credentials for a database or root user
#[derive(Debug, Clone)]
pub struct SurrealCredentials {
    pub username: String,
    pub password: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl SurrealConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: "reportcard".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Sign in with the given credentials after connecting
    pub fn with_credentials(mut self, credentials: SurrealCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }
}

/// SurrealDB-backed implementation of [`ReportStore`].
pub struct SurrealReportStore {
    db: Surreal<Any>,
}

impl SurrealReportStore {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect(&SurrealConfig::new("mem://")).await
    }

    /// Connect to the configured endpoint and initialize the schema.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn connect(config: &SurrealConfig) -> crate::Result<Self> {
        if let Some(path) = config.endpoint.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path)?;
        }

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if let Some(creds) = &config.credentials {
            if creds.is_root {
                db.signin(Root {
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
            } else {
                db.signin(Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
            }
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealReportStore connected");
        Ok(Self { db })
    }
}

#[async_trait]
impl ReportStore for SurrealReportStore {
    async fn get(&self, identity: &RepositoryIdentity) -> StorageResult<Option<CachedReport>> {
        let key = identity.key().as_str().to_string();
        let mut res = self
            .db
            .query("SELECT * OMIT id FROM type::thing('repositories', $key)")
            .bind(("key", key))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<RepositoryRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .map(RepositoryRow::into_report)
            .transpose()
    }

    async fn put(&self, report: &CachedReport) -> StorageResult<()> {
        let key = report.identity.key().as_str().to_string();
        let row = RepositoryRow::from_report(report)?;

        debug!(reference = %row.reference, revision = %row.last_revision, "upserting report");

        self.db
            .query("UPSERT type::thing('repositories', $key) CONTENT $row RETURN NONE")
            .bind(("key", key))
            .bind(("row", row))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, identity: &RepositoryIdentity) -> StorageResult<()> {
        let key = identity.key().as_str().to_string();
        self.db
            .query("DELETE type::thing('repositories', $key)")
            .bind(("key", key))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}
