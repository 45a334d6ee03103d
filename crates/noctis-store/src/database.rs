// SPDX-FileCopyrightText: 2026 Noctis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with lazy, idempotent schema provisioning.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::sync::Once;

use noctis_core::NoctisError;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use crate::schema::{INDEX_STATEMENTS, SCHEMA_SQL};

static VEC_EXTENSION: Once = Once::new();

/// Register sqlite-vec as an auto extension, once per process.
///
/// Must run before the first connection is opened so every connection gets
/// the vec0 virtual table module.
fn register_vec_extension() {
    VEC_EXTENSION.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute::<
            *const (),
            unsafe extern "C" fn(
                *mut rusqlite::ffi::sqlite3,
                *mut *mut std::os::raw::c_char,
                *const rusqlite::ffi::sqlite3_api_routines,
            ) -> std::os::raw::c_int,
        >(sqlite_vec::sqlite3_vec_init as *const ())));
    });
}

/// Convert tokio_rusqlite errors into NoctisError::Store.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> NoctisError {
    NoctisError::Store {
        source: Box::new(e),
    }
}

/// A handle to the SQLite database backing the store.
pub struct Database {
    conn: Connection,
    dimensions: usize,
}

impl Database {
    /// Open (or create) the database at `path` and provision the schema.
    ///
    /// Idempotent: every statement is CREATE ... IF NOT EXISTS. Secondary
    /// index statements are best-effort; a failure is logged and skipped
    /// since the index may already exist with different settings.
    pub async fn open(path: &Path, dimensions: usize) -> Result<Self, NoctisError> {
        register_vec_extension();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| NoctisError::Store {
                source: Box::new(e),
            })?;
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        let db = Self { conn, dimensions };
        db.provision().await?;
        Ok(db)
    }

    /// Open an in-memory database. Used by tests and the `cleanup --dry-run`
    /// scratch path.
    pub async fn open_in_memory(dimensions: usize) -> Result<Self, NoctisError> {
        register_vec_extension();
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        let db = Self { conn, dimensions };
        db.provision().await?;
        Ok(db)
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Configured embedding dimensionality of the vector index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn provision(&self) -> Result<(), NoctisError> {
        let dimensions = self.dimensions;
        self.conn
            .call(move |conn| {
                conn.execute_batch(
                    "PRAGMA journal_mode = WAL;
                     PRAGMA foreign_keys = ON;
                     PRAGMA synchronous = NORMAL;",
                )?;
                conn.execute_batch(SCHEMA_SQL)?;
                conn.execute_batch(&format!(
                    "CREATE VIRTUAL TABLE IF NOT EXISTS vec_memories USING vec0(
                        embedding float[{dimensions}] distance_metric=cosine
                    );"
                ))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        // Best-effort secondary indexes: log-and-continue.
        for stmt in INDEX_STATEMENTS {
            let sql = stmt.to_string();
            let result: Result<(), tokio_rusqlite::Error> = self
                .conn
                .call(move |conn| {
                    conn.execute_batch(&sql)?;
                    Ok(())
                })
                .await;
            if let Err(e) = result {
                warn!(statement = stmt, error = %e, "index creation failed, continuing");
            }
        }

        debug!(dimensions, "database schema provisioned");
        Ok(())
    }

    /// Drop and recreate the vector index with a new dimension.
    ///
    /// Used by reindexing after an embedding model switch.
    pub async fn recreate_vector_index(&mut self, dimensions: usize) -> Result<(), NoctisError> {
        self.dimensions = dimensions;
        self.conn
            .call(move |conn| {
                conn.execute_batch(&format!(
                    "DROP TABLE IF EXISTS vec_memories;
                     CREATE VIRTUAL TABLE vec_memories USING vec0(
                        embedding float[{dimensions}] distance_metric=cosine
                     );"
                ))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_in_memory_provisions_schema() {
        let db = Database::open_in_memory(4).await.unwrap();
        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type IN ('table', 'trigger') ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(names)
            })
            .await
            .unwrap();
        for expected in [
            "memories",
            "entities",
            "tags",
            "mentions",
            "tagged",
            "entity_links",
            "vec_memories",
        ] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}, have {tables:?}"
            );
        }
    }

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let db = Database::open_in_memory(4).await.unwrap();
        db.provision().await.unwrap();
        db.provision().await.unwrap();
    }

    #[tokio::test]
    async fn vector_index_accepts_configured_dimension() {
        let db = Database::open_in_memory(4).await.unwrap();
        db.connection()
            .call(|conn| {
                let blob = crate::schema::vec_to_blob(&[0.1, 0.2, 0.3, 0.4]);
                conn.execute(
                    "INSERT INTO vec_memories(rowid, embedding) VALUES (1, ?1)",
                    rusqlite::params![blob],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();
    }
}
