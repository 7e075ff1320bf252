//! Historical Store
//!
//! Append-only persistence of assessment records. Two backends:
//! - **SqliteStore**: one `credibility_history` table, writers serialised
//!   through a mutex-guarded connection, one INSERT per append
//! - **MemoryStore**: a vector behind a mutex, for tests and dry runs

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use credence_core::CredibilityRecord;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt record {row}: {reason}")]
    Corrupt { row: i64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Append-only record history. No update or delete.
pub trait HistoryStore: Send + Sync {
    /// Durably persist one record as a new row
    fn append(&self, record: &CredibilityRecord) -> Result<(), StoreError>;

    /// Every record, in insertion order
    fn read_all(&self) -> Result<Vec<CredibilityRecord>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

pub type SharedStore = Arc<dyn HistoryStore>;

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS credibility_history (
        id                 INTEGER PRIMARY KEY AUTOINCREMENT,
        source             TEXT NOT NULL,
        date               TEXT NOT NULL,
        final_score        REAL NOT NULL,
        currency           REAL NOT NULL,
        relevance          REAL NOT NULL,
        authority          REAL NOT NULL,
        accuracy           REAL NOT NULL,
        purpose            REAL NOT NULL,
        sift_score         REAL NOT NULL,
        rag_score          REAL NOT NULL,
        sentiment_polarity REAL NOT NULL,
        subjectivity       REAL NOT NULL
    );
";

/// SQLite-backed history
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        info!("Opened history database {}", path.as_ref().display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl HistoryStore for SqliteStore {
    fn append(&self, record: &CredibilityRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO credibility_history (
                source, date, final_score, currency, relevance, authority,
                accuracy, purpose, sift_score, rag_score, sentiment_polarity, subjectivity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.source,
                record.date.to_rfc3339(),
                record.final_score,
                record.currency,
                record.relevance,
                record.authority,
                record.accuracy,
                record.purpose,
                record.sift_score,
                record.rag_score,
                record.sentiment_polarity,
                record.subjectivity,
            ],
        )?;
        debug!("Appended history row {} for {}", conn.last_insert_rowid(), record.source);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<CredibilityRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, source, date, final_score, currency, relevance, authority,
                    accuracy, purpose, sift_score, rag_score, sentiment_polarity, subjectivity
             FROM credibility_history ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(2)?,
                CredibilityRecord {
                    source: row.get(1)?,
                    date: DateTime::<Utc>::UNIX_EPOCH,
                    final_score: row.get(3)?,
                    currency: row.get(4)?,
                    relevance: row.get(5)?,
                    authority: row.get(6)?,
                    accuracy: row.get(7)?,
                    purpose: row.get(8)?,
                    sift_score: row.get(9)?,
                    rag_score: row.get(10)?,
                    sentiment_polarity: row.get(11)?,
                    subjectivity: row.get(12)?,
                },
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, date, mut record) = row?;
            record.date = DateTime::parse_from_rfc3339(&date)
                .map_err(|e| StoreError::Corrupt {
                    row: id,
                    reason: e.to_string(),
                })?
                .with_timezone(&Utc);
            records.push(record);
        }
        Ok(records)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM credibility_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// In-process history
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CredibilityRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, record: &CredibilityRecord) -> Result<(), StoreError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<CredibilityRecord>, StoreError> {
        Ok(self.records.lock().clone())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().len())
    }
}
