//! StorageEngine — owns the ConnectionPool, runs migrations on open, and
//! implements the IMemoryStore seam the upper layers depend on.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use engram_core::errors::EngramResult;
use engram_core::memory::{MemoryKind, MemoryRecord};
use engram_core::traits::IMemoryStore;

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::{datetime_to_ms, queries};

/// The main storage engine. Owns the connection pool and provides typed
/// access for every subsystem.
pub struct StorageEngine {
    pool: ConnectionPool,
    /// When true, use the read pool for read operations (file-backed mode).
    /// When false, route all reads through the writer (in-memory mode,
    /// because in-memory read pool connections are isolated databases).
    use_read_pool: bool,
}

impl StorageEngine {
    /// Open a storage engine backed by a file on disk.
    pub fn open(path: &Path) -> EngramResult<Self> {
        let pool = ConnectionPool::open(path, crate::pool::ReadPool::default_size())?;
        let engine = Self {
            pool,
            use_read_pool: true,
        };
        engine.initialize()?;
        Ok(engine)
    }

    /// Open an in-memory storage engine (for testing). Routes all reads
    /// through the writer since in-memory read pool connections are
    /// isolated databases that can't see writer's changes.
    pub fn open_in_memory() -> EngramResult<Self> {
        let pool = ConnectionPool::open_in_memory(1)?;
        let engine = Self {
            pool,
            use_read_pool: false,
        };
        engine.initialize()?;
        Ok(engine)
    }

    fn initialize(&self) -> EngramResult<()> {
        self.pool
            .writer
            .with_conn(|conn| migrations::run_migrations(conn))
    }

    /// Get a reference to the connection pool (for advanced operations).
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Execute a closure with the write connection.
    pub fn with_writer<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        self.pool.writer.with_conn(f)
    }

    /// Execute a read-only query on the best available connection.
    /// File-backed: uses the read pool (no writer contention).
    /// In-memory: uses the writer (read pool is isolated).
    pub fn with_reader<F, T>(&self, f: F) -> EngramResult<T>
    where
        F: FnOnce(&Connection) -> EngramResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn(f)
        }
    }
}

impl IMemoryStore for StorageEngine {
    fn get_memory(&self, id: &str) -> EngramResult<Option<MemoryRecord>> {
        self.with_reader(|conn| queries::memory_crud::get_memory(conn, id))
    }

    fn get_memories(&self, ids: &[String]) -> EngramResult<Vec<MemoryRecord>> {
        self.with_reader(|conn| queries::memory_query::get_memories(conn, ids))
    }

    fn list_memories(
        &self,
        project_id: &str,
        kind: Option<MemoryKind>,
    ) -> EngramResult<Vec<MemoryRecord>> {
        self.with_reader(|conn| queries::memory_query::list_memories(conn, project_id, kind))
    }

    fn search_keyword(
        &self,
        project_id: &str,
        query: &str,
        limit: usize,
    ) -> EngramResult<Vec<(MemoryRecord, f64)>> {
        self.with_reader(|conn| queries::memory_search::search_keyword(conn, project_id, query, limit))
    }

    fn search_temporal(
        &self,
        project_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> EngramResult<Vec<MemoryRecord>> {
        self.with_reader(|conn| {
            queries::memory_search::search_temporal(
                conn,
                project_id,
                datetime_to_ms(from),
                datetime_to_ms(to),
                limit,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::TypedContent;

    #[test]
    fn engine_initializes_schema_on_open() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let version = engine
            .with_reader(|conn| migrations::highest_applied(conn))
            .unwrap();
        assert!(version >= 5);
    }

    #[test]
    fn trait_surface_round_trips() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Semantic, "trait surface"),
            vec![],
        );
        engine
            .with_writer(|conn| queries::memory_crud::insert_memory(conn, &memory))
            .unwrap();

        let loaded = engine.get_memory(&memory.id).unwrap().unwrap();
        assert_eq!(loaded.id, memory.id);
        assert_eq!(engine.list_memories("p1", None).unwrap().len(), 1);
    }

    #[test]
    fn file_backed_engine_sees_writes_from_readers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engram.db");
        let engine = StorageEngine::open(&path).unwrap();

        let memory = MemoryRecord::new(
            "p1",
            TypedContent::from_text(MemoryKind::Episodic, "file backed"),
            vec![],
        );
        engine
            .with_writer(|conn| queries::memory_crud::insert_memory(conn, &memory))
            .unwrap();

        // Read path goes through the read pool.
        let loaded = engine.get_memory(&memory.id).unwrap();
        assert!(loaded.is_some());
    }
}
