//! Persistent overflow store: one ordered, durable map from node id to the
//! node's serialized image, backed by a single SQLite file. The backing file
//! is opened lazily on first real access, never at construction; stores
//! created without an explicit path live in the OS temp dir and clean up
//! after themselves.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::SpillGraphError;

enum StoreState {
    Unopened,
    Open(Connection),
    Closed,
}

pub struct OverflowStore {
    path: PathBuf,
    temp: bool,
    state: Mutex<StoreState>,
}

impl OverflowStore {
    /// Store backed by a specific file, which may or may not exist yet. The
    /// file survives close (unlike [`OverflowStore::temp`]).
    pub fn at_path<P: AsRef<Path>>(path: P) -> Self {
        OverflowStore {
            path: path.as_ref().to_path_buf(),
            temp: false,
            state: Mutex::new(StoreState::Unopened),
        }
    }

    /// Store backed by a fresh file in the OS temp dir, removed on close or
    /// drop.
    pub fn temp() -> Self {
        let path = std::env::temp_dir().join(format!(
            "spillgraph-{:016x}.db",
            rand::random::<u64>()
        ));
        OverflowStore {
            path,
            temp: true,
            state: Mutex::new(StoreState::Unopened),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), StoreState::Closed)
    }

    /// Upserts the byte image for `id`. Durable once SQLite commits the
    /// statement; no cross-id transaction boundary is provided.
    pub fn persist(&self, id: u64, bytes: &[u8]) -> Result<(), SpillGraphError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO nodes(id, bytes) VALUES(?1, ?2)",
                params![id as i64, bytes],
            )?;
            Ok(())
        })
    }

    /// Byte image for `id`, or `None` when nothing was ever persisted under
    /// it — a legitimate negative for speculative reads.
    pub fn read(&self, id: u64) -> Result<Option<Vec<u8>>, SpillGraphError> {
        self.with_conn(|conn| {
            let bytes = conn
                .query_row(
                    "SELECT bytes FROM nodes WHERE id=?1",
                    params![id as i64],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(bytes)
        })
    }

    pub fn remove(&self, id: u64) -> Result<(), SpillGraphError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM nodes WHERE id=?1", params![id as i64])?;
            Ok(())
        })
    }

    /// Largest id with a persisted image, for seeding id assignment past
    /// everything an existing store already holds.
    pub fn max_id(&self) -> Result<Option<u64>, SpillGraphError> {
        self.with_conn(|conn| {
            let max: Option<i64> =
                conn.query_row("SELECT MAX(id) FROM nodes", [], |row| row.get(0))?;
            Ok(max.map(|id| id as u64))
        })
    }

    /// Ordered snapshot of every persisted entry.
    pub fn iter_entries(&self) -> Result<Vec<(u64, Vec<u8>)>, SpillGraphError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, bytes FROM nodes ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)? as u64, row.get::<_, Vec<u8>>(1)?))
            })?;
            let mut entries = Vec::new();
            for entry in rows {
                entries.push(entry?);
            }
            Ok(entries)
        })
    }

    /// Flushes and releases the backing file. Every operation afterwards
    /// fails with `StoreClosed`.
    pub fn close(&self) -> Result<(), SpillGraphError> {
        let mut state = self.state.lock();
        if let StoreState::Open(_) = *state {
            log::info!("closing overflow store at {}", self.path.display());
        }
        *state = StoreState::Closed;
        if self.temp {
            let _ = std::fs::remove_file(&self.path);
        }
        Ok(())
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, SpillGraphError>
    where
        F: FnOnce(&Connection) -> Result<T, SpillGraphError>,
    {
        let mut state = self.state.lock();
        match &*state {
            StoreState::Closed => {
                return Err(SpillGraphError::store_closed(format!(
                    "overflow store at {}",
                    self.path.display()
                )));
            }
            StoreState::Unopened => {
                log::trace!("opening overflow store file {}", self.path.display());
                let conn = Connection::open(&self.path)?;
                // "nodes" is the store's one logical map: id → serialized image.
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS nodes (
                        id    INTEGER PRIMARY KEY,
                        bytes BLOB NOT NULL
                    );",
                )?;
                *state = StoreState::Open(conn);
            }
            StoreState::Open(_) => {}
        }
        if let StoreState::Open(conn) = &*state {
            f(conn)
        } else {
            Err(SpillGraphError::store_closed(format!(
                "overflow store at {}",
                self.path.display()
            )))
        }
    }
}

impl Drop for OverflowStore {
    fn drop(&mut self) {
        if self.temp && !self.is_closed() {
            // Connection closes when the state is dropped; the temp file
            // must not outlive the store.
            *self.state.lock() = StoreState::Closed;
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
