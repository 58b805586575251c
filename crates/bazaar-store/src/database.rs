//! SQLite-backed [`DocumentStore`].
//!
//! Each document two levels below the root is stored as one row
//! (`collection`, `key`, JSON `body`).  A batch runs inside a single SQLite
//! transaction, which gives the all-or-nothing guarantee the market relies
//! on.  The connection is synchronous, so every call hops onto the blocking
//! thread pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::batch::WriteBatch;
use crate::error::{Result, StoreError};
use crate::migrations;
use crate::path::DocPath;
use crate::push_id::PushIdGenerator;
use crate::snapshot::Snapshot;
use crate::{tree, ChangeSet, DocumentStore, CHANGE_CHANNEL_CAPACITY};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
    ids: Mutex<PushIdGenerator>,
    notifier: broadcast::Sender<ChangeSet>,
}

impl SqliteStore {
    /// Open (or create) the default database in the platform data directory:
    /// - Linux:   `~/.local/share/bazaar/bazaar.db`
    /// - macOS:   `~/Library/Application Support/org.bazaar.bazaar/bazaar.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\bazaar\bazaar\data\bazaar.db`
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "bazaar", "bazaar").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Self::open_at(&data_dir.join("bazaar.db"))
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Open a private, non-persistent database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        migrations::run_migrations(&conn)?;

        let (notifier, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            ids: Mutex::new(PushIdGenerator::new()),
            notifier,
        })
    }

    /// Filesystem path of the database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, path: &DocPath) -> Result<Snapshot> {
        let target = path.clone();
        let value = self.with_conn(move |conn| read_path(conn, &target)).await?;
        Ok(Snapshot::new(path.clone(), value))
    }

    fn generate_id(&self) -> String {
        match self.ids.lock() {
            Ok(mut ids) => ids.generate(),
            Err(poisoned) => poisoned.into_inner().generate(),
        }
    }

    async fn atomic_write(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        batch.validate()?;

        let changed: Vec<DocPath> = batch.paths().cloned().collect();
        let now_ms = chrono::Utc::now().timestamp_millis();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for (path, value) in batch.into_entries() {
                let value = value.and_then(|mut v| {
                    tree::resolve_server_values(&mut v, now_ms);
                    tree::normalize(v)
                });
                apply_entry(&tx, &path, value)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::trace!(paths = changed.len(), "sqlite batch committed");
        let _ = self.notifier.send(Arc::new(changed));
        Ok(())
    }

    async fn query_equal_to(
        &self,
        path: &DocPath,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot> {
        let [collection] = path.segments() else {
            return Err(StoreError::IndexNotDefined {
                path: path.to_string(),
                field: field.to_string(),
            });
        };
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::InvalidPath(format!(
                "unsupported query field '{field}'"
            )));
        }
        let needle = to_sql_value(value)?;
        let collection = collection.clone();
        // The literal JSON path lets SQLite match expression indexes.
        let sql = format!(
            "SELECT key, body FROM documents
             WHERE collection = ?1 AND json_extract(body, '$.{field}') = ?2
             ORDER BY key ASC"
        );

        let matches = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![collection, needle], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;

                let mut matches = Map::new();
                for row in rows {
                    let (key, body) = row?;
                    matches.insert(key, serde_json::from_str(&body)?);
                }
                Ok(matches)
            })
            .await?;

        Ok(Snapshot::new(path.clone(), Some(Value::Object(matches))))
    }

    fn changes(&self) -> broadcast::Receiver<ChangeSet> {
        self.notifier.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_path(conn: &Connection, path: &DocPath) -> Result<Option<Value>> {
    match path.segments() {
        [] => {
            let mut stmt =
                conn.prepare("SELECT collection, key, body FROM documents ORDER BY collection, key")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut root = Map::new();
            for row in rows {
                let (collection, key, body) = row?;
                let entry = root
                    .entry(collection)
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(children) = entry {
                    children.insert(key, serde_json::from_str(&body)?);
                }
            }
            Ok(Some(Value::Object(root)))
        }
        [collection] => Ok(Some(Value::Object(load_collection(conn, collection)?))),
        [collection, key, rest @ ..] => {
            let body = load_body(conn, collection, key)?;
            Ok(body.and_then(|b| tree::get_at(&b, rest).cloned()))
        }
    }
}

fn load_collection(conn: &Connection, collection: &str) -> Result<Map<String, Value>> {
    let mut stmt =
        conn.prepare("SELECT key, body FROM documents WHERE collection = ?1 ORDER BY key ASC")?;
    let rows = stmt.query_map(params![collection], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut children = Map::new();
    for row in rows {
        let (key, body) = row?;
        children.insert(key, serde_json::from_str(&body)?);
    }
    Ok(children)
}

fn load_body(conn: &Connection, collection: &str, key: &str) -> Result<Option<Value>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| serde_json::from_str(&b))
        .transpose()
        .map_err(StoreError::from)
}

fn upsert(conn: &Connection, collection: &str, key: &str, body: &Value) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (collection, key, body) VALUES (?1, ?2, ?3)
         ON CONFLICT(collection, key) DO UPDATE SET body = excluded.body",
        params![collection, key, serde_json::to_string(body)?],
    )?;
    Ok(())
}

fn apply_entry(conn: &Connection, path: &DocPath, value: Option<Value>) -> Result<()> {
    match path.segments() {
        [] => Err(StoreError::InvalidPath(
            "batch may not write the root".to_string(),
        )),
        [collection] => {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1",
                params![collection],
            )?;
            match value {
                None => Ok(()),
                Some(Value::Object(children)) => {
                    for (key, body) in children {
                        path.child(&key)?;
                        upsert(conn, collection, &key, &body)?;
                    }
                    Ok(())
                }
                Some(_) => Err(StoreError::InvalidPath(format!(
                    "collection '{collection}' can only hold documents"
                ))),
            }
        }
        [collection, key, rest @ ..] => {
            let mut body = load_body(conn, collection, key)?.unwrap_or(Value::Null);
            tree::set_at(&mut body, rest, value);
            if tree::is_empty(&body) {
                conn.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                )?;
                Ok(())
            } else {
                upsert(conn, collection, key, &body)
            }
        }
    }
}

fn to_sql_value(value: &Value) -> Result<rusqlite::types::Value> {
    use rusqlite::types::Value as Sql;

    match value {
        Value::String(s) => Ok(Sql::Text(s.clone())),
        Value::Bool(b) => Ok(Sql::Integer(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(Sql::Integer)
            .or_else(|| n.as_f64().map(Sql::Real))
            .ok_or_else(|| StoreError::InvalidPath(format!("unsupported number {n}"))),
        other => Err(StoreError::InvalidPath(format!(
            "cannot query by non-scalar value {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::batch::server_timestamp;

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let store = SqliteStore::open_at(&path).expect("should open");
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn nested_writes_and_reads() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set(
                p("items/i1"),
                json!({"title": "Lamp", "available": true, "createdAt": server_timestamp()}),
            )
            .set(p("category-items/c1/i1"), true);
        store.atomic_write(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set(p("items/i1/available"), false)
            .delete(p("category-items/c1/i1"));
        store.atomic_write(batch).await.unwrap();

        let item = store.get(&p("items/i1")).await.unwrap();
        assert_eq!(item.child("available").value(), Some(&json!(false)));
        assert!(item.child("createdAt").value().unwrap().is_i64());
        assert!(!store.get(&p("category-items/c1")).await.unwrap().exists());
        assert_eq!(
            store.get(&p("items/i1/title")).await.unwrap().value(),
            Some(&json!("Lamp"))
        );
    }

    #[tokio::test]
    async fn failed_batch_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set(p("items/i1/title"), "Lamp")
            // A collection cannot hold a scalar, so the whole batch fails.
            .set(p("users"), "oops");
        assert!(store.atomic_write(batch).await.is_err());
        assert!(!store.get(&p("items/i1")).await.unwrap().exists());
    }

    #[tokio::test]
    async fn equality_query_matches_field() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut batch = WriteBatch::new();
        batch
            .set(p("transactions/t1"), json!({"itemId": "i1", "status": "pending"}))
            .set(p("transactions/t2"), json!({"itemId": "i2", "status": "pending"}))
            .set(p("transactions/t3"), json!({"itemId": "i1", "status": "completed"}));
        store.atomic_write(batch).await.unwrap();

        let hits = store
            .query_equal_to(&p("transactions"), "itemId", &json!("i1"))
            .await
            .unwrap();
        assert_eq!(hits.child_keys(), vec!["t1", "t3"]);

        let err = store
            .query_equal_to(&p("transactions/t1"), "itemId", &json!("i1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IndexNotDefined { .. }));
    }

    #[tokio::test]
    async fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");

        {
            let store = SqliteStore::open_at(&path).unwrap();
            let mut batch = WriteBatch::new();
            batch.set(p("categories/c1"), json!({"name": "Books"}));
            store.atomic_write(batch).await.unwrap();
        }

        let store = SqliteStore::open_at(&path).unwrap();
        let cats = store.get(&p("categories")).await.unwrap();
        assert_eq!(cats.child_keys(), vec!["c1"]);
    }
}
