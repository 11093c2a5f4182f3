//! SurrealDB schema migrations and initialization

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all reportcard tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing reportcard SurrealDB schema");
    init_repositories_table(db).await?;
    info!("reportcard schema initialization complete");
    Ok(())
}

/// Initialize `repositories` table
///
/// Schema:
/// ```text
/// TABLE repositories {
///   id:             repositories:<sha256 of host/owner/name>
///   reference:      STRING (unique, canonical host/owner/name)
///   identity:       OBJECT {host, owner, name}
///   last_revision:  STRING
///   cached_at:      DATETIME
///   document:       STRING (JSON-encoded report document)
/// }
/// ```
///
/// Rows are written with `UPSERT ... CONTENT`, which replaces the whole
/// record, so a row never mixes documents from two analyses.
async fn init_repositories_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing repositories table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS repositories
            SCHEMALESS
            PERMISSIONS FOR select, create, update, delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_reference ON TABLE repositories COLUMNS reference UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_last_revision ON TABLE repositories COLUMNS last_revision;
    "#;

    db.query(sql)
        .await?
        .check()
        .map_err(|e| StateError::SchemaSetup(e.to_string()))?;
    info!("repositories table initialized");
    Ok(())
}
