//! libSQL-backed tree storage (local file, offline).
//!
//! The [`Storage`] struct wraps a libSQL database holding one JSON document per
//! syllabus tree plus the run leases that keep generation single-writer.
//!
//! **Access rules:**
//! - Generation runs: read-write via [`Storage::open`]; node results are only
//!   ever written through [`Storage::update_node_result`]
//! - Display layers: read-only via [`Storage::open_readonly`]

mod migrations;
mod targeted;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use libsql::params::Params;
use libsql::{Connection, Database, Value, params};
use notesgen_shared::{NodePath, NotesError, Result, SyllabusTree, TreeId, TreeProgress};

use crate::targeted::TargetedUpdate;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Listing row for a stored tree.
#[derive(Debug, Clone)]
pub struct TreeSummary {
    pub id: TreeId,
    pub root_topic: String,
    pub progress: TreeProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn storage_err(e: impl std::fmt::Display) -> NotesError {
    NotesError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NotesError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    NotesError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(NotesError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tree documents
    // -----------------------------------------------------------------------

    /// Persist a newly parsed tree under its own identifier.
    pub async fn create_tree(&self, tree: &SyllabusTree) -> Result<TreeId> {
        self.check_writable()?;
        if tree.id.is_nil() {
            return Err(NotesError::validation("cannot store a tree with a nil id"));
        }

        let document = serde_json::to_string(tree).map_err(storage_err)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO syllabi (id, root_topic, document, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    tree.id.to_string(),
                    tree.root_topic.as_str(),
                    document,
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;

        tracing::debug!(tree_id = %tree.id, root_topic = %tree.root_topic, "tree created");
        Ok(tree.id.clone())
    }

    /// Load a tree by identifier.
    pub async fn get_tree(&self, id: &TreeId) -> Result<Option<SyllabusTree>> {
        let mut rows = self
            .conn
            .query(
                "SELECT document FROM syllabi WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => {
                let document: String = row.get(0).map_err(storage_err)?;
                Ok(Some(decode_document(&document)?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Load a tree, failing with [`NotesError::TreeNotFound`] if it is absent.
    pub async fn require_tree(&self, id: &TreeId) -> Result<SyllabusTree> {
        self.get_tree(id)
            .await?
            .ok_or_else(|| NotesError::TreeNotFound(id.to_string()))
    }

    /// List all trees, newest first.
    pub async fn list_trees(&self) -> Result<Vec<TreeSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT document, created_at, updated_at FROM syllabi ORDER BY created_at DESC, id",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let document: String = row.get(0).map_err(storage_err)?;
            let tree = decode_document(&document)?;
            results.push(TreeSummary {
                progress: tree.progress(),
                id: tree.id,
                root_topic: tree.root_topic,
                created_at: parse_timestamp(&row.get::<String>(1).map_err(storage_err)?)?,
                updated_at: parse_timestamp(&row.get::<String>(2).map_err(storage_err)?)?,
            });
        }
        Ok(results)
    }

    /// Overwrite the `result` of exactly the node addressed by `path`.
    ///
    /// Returns the number of documents modified: `1` on success, `0` when the
    /// tree is gone or any path segment no longer matches its name.
    pub async fn update_node_result(
        &self,
        id: &TreeId,
        path: &NodePath,
        result: &str,
    ) -> Result<u64> {
        self.check_writable()?;
        let update = TargetedUpdate::for_path(path);
        let sql = format!(
            "UPDATE syllabi
             SET document = json_set(document, ?1, ?2), updated_at = ?3
             WHERE id = ?4 AND {}",
            update.where_clause(5)
        );

        let mut values = vec![
            Value::Text(update.set_path.clone()),
            Value::Text(result.to_string()),
            Value::Text(Utc::now().to_rfc3339()),
            Value::Text(id.to_string()),
        ];
        for (json_path, name) in update.filters {
            values.push(Value::Text(json_path));
            values.push(Value::Text(name));
        }

        let modified = self
            .conn
            .execute(&sql, Params::Positional(values))
            .await
            .map_err(storage_err)?;

        tracing::trace!(tree_id = %id, %path, modified, "targeted update");
        Ok(modified)
    }

    // -----------------------------------------------------------------------
    // Run leases
    // -----------------------------------------------------------------------

    /// Take the generation lease for a tree.
    ///
    /// Succeeds if nobody holds it or the holder's last heartbeat is older than
    /// `ttl`. Returns `false` when a live run holds the lease.
    pub async fn acquire_run_lease(&self, id: &TreeId, holder: &str, ttl: Duration) -> Result<bool> {
        self.check_writable()?;
        let now = Utc::now().timestamp_millis();
        let cutoff = now - i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let changed = self
            .conn
            .execute(
                "INSERT INTO run_leases (tree_id, holder, acquired_at, heartbeat_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(tree_id) DO UPDATE SET
                   holder = excluded.holder,
                   acquired_at = excluded.acquired_at,
                   heartbeat_at = excluded.heartbeat_at
                 WHERE run_leases.heartbeat_at < ?4",
                params![id.to_string(), holder, now, cutoff],
            )
            .await
            .map_err(storage_err)?;

        Ok(changed > 0)
    }

    /// Refresh the heartbeat of a lease this holder owns.
    pub async fn renew_run_lease(&self, id: &TreeId, holder: &str) -> Result<bool> {
        self.check_writable()?;
        let changed = self
            .conn
            .execute(
                "UPDATE run_leases SET heartbeat_at = ?1 WHERE tree_id = ?2 AND holder = ?3",
                params![Utc::now().timestamp_millis(), id.to_string(), holder],
            )
            .await
            .map_err(storage_err)?;
        Ok(changed > 0)
    }

    /// Drop a lease this holder owns. Releasing a lease held by someone else is a no-op.
    pub async fn release_run_lease(&self, id: &TreeId, holder: &str) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "DELETE FROM run_leases WHERE tree_id = ?1 AND holder = ?2",
                params![id.to_string(), holder],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

fn decode_document(document: &str) -> Result<SyllabusTree> {
    serde_json::from_str(document)
        .map_err(|e| NotesError::Storage(format!("corrupt tree document: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NotesError::Storage(format!("invalid date: {e}")))
}
