//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.
//! List-valued fields and vectors are stored as JSON text.

use crate::pipeline::PaperRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordStore, StorageError, StorageResult};
use crate::storage::{RecordId, RecordStatus, StoredRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

const RECORD_COLUMNS: &str = "id, position, title, authors, abstract, publication_date, doi, \
     pdf_url, keywords, full_text, methods, results, discussion, conclusions, citation_count, \
     view_count, entities, status, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Creates a new SqliteRecordStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRecordStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_record(&self, column: &str, value: i64) -> StorageResult<Option<StoredRecord>> {
        let sql = format!("SELECT {} FROM papers WHERE {} = ?1", RECORD_COLUMNS, column);
        let mut stmt = self.conn.prepare(&sql)?;

        let raw = stmt
            .query_row(params![value], RawRecord::from_row)
            .optional()?;

        raw.map(RawRecord::into_stored).transpose()
    }
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl RecordStore for SqliteRecordStore {
    fn upsert_record(
        &mut self,
        position: usize,
        record: &PaperRecord,
    ) -> StorageResult<RecordId> {
        let now = Utc::now().to_rfc3339();
        let position = position as i64;

        self.conn.execute(
            "INSERT INTO papers (position, title, authors, abstract, publication_date, doi,
                 pdf_url, keywords, full_text, methods, results, discussion, conclusions,
                 citation_count, view_count, entities, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                 ?14, ?15, ?16, ?17, ?18, ?18)
             ON CONFLICT(position) DO UPDATE SET
                 title = excluded.title,
                 authors = excluded.authors,
                 abstract = excluded.abstract,
                 publication_date = excluded.publication_date,
                 doi = excluded.doi,
                 pdf_url = excluded.pdf_url,
                 keywords = excluded.keywords,
                 full_text = excluded.full_text,
                 methods = excluded.methods,
                 results = excluded.results,
                 discussion = excluded.discussion,
                 conclusions = excluded.conclusions,
                 citation_count = excluded.citation_count,
                 view_count = excluded.view_count,
                 entities = excluded.entities,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
            params![
                position,
                record.title,
                to_json(&record.authors)?,
                record.abstract_text,
                record.publication_date,
                record.doi,
                record.pdf_url,
                to_json(&record.keywords)?,
                record.full_text,
                record.methods,
                record.results,
                record.discussion,
                record.conclusions,
                record.citation_count,
                record.view_count,
                to_json(&record.entities)?,
                RecordStatus::Processing.to_db_string(),
                now,
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM papers WHERE position = ?1",
            params![position],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn upsert_embedding(
        &mut self,
        record_id: RecordId,
        section: &str,
        vector: &[f32],
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO embeddings (paper_id, section, dimensions, vector, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(paper_id, section) DO UPDATE SET
                 dimensions = excluded.dimensions,
                 vector = excluded.vector,
                 created_at = excluded.created_at",
            params![record_id, section, vector.len() as i64, to_json(vector)?, now],
        )?;
        Ok(())
    }

    fn update_status(&mut self, record_id: RecordId, status: RecordStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE papers SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, record_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RecordNotFound(record_id));
        }
        Ok(())
    }

    fn get_record(&self, record_id: RecordId) -> StorageResult<StoredRecord> {
        self.query_record("id", record_id)?
            .ok_or(StorageError::RecordNotFound(record_id))
    }

    fn find_by_position(&self, position: usize) -> StorageResult<Option<StoredRecord>> {
        self.query_record("position", position as i64)
    }

    fn get_embedding(
        &self,
        record_id: RecordId,
        section: &str,
    ) -> StorageResult<Option<Vec<f32>>> {
        let vector: Option<String> = self
            .conn
            .query_row(
                "SELECT vector FROM embeddings WHERE paper_id = ?1 AND section = ?2",
                params![record_id, section],
                |row| row.get(0),
            )
            .optional()?;

        vector.as_deref().map(from_json).transpose()
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: RecordStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM papers WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_embeddings(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Row as read from the papers table, before JSON columns are decoded
struct RawRecord {
    id: i64,
    position: i64,
    title: String,
    authors: String,
    abstract_text: String,
    publication_date: String,
    doi: String,
    pdf_url: String,
    keywords: String,
    full_text: String,
    methods: String,
    results: String,
    discussion: String,
    conclusions: String,
    citation_count: u32,
    view_count: u32,
    entities: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            position: row.get(1)?,
            title: row.get(2)?,
            authors: row.get(3)?,
            abstract_text: row.get(4)?,
            publication_date: row.get(5)?,
            doi: row.get(6)?,
            pdf_url: row.get(7)?,
            keywords: row.get(8)?,
            full_text: row.get(9)?,
            methods: row.get(10)?,
            results: row.get(11)?,
            discussion: row.get(12)?,
            conclusions: row.get(13)?,
            citation_count: row.get(14)?,
            view_count: row.get(15)?,
            entities: row.get(16)?,
            status: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
        })
    }

    fn into_stored(self) -> StorageResult<StoredRecord> {
        let status = RecordStatus::from_db_string(&self.status).ok_or_else(|| {
            StorageError::Serialization(format!("unknown record status '{}'", self.status))
        })?;

        Ok(StoredRecord {
            id: self.id,
            position: self.position as usize,
            status,
            record: PaperRecord {
                title: self.title,
                authors: from_json(&self.authors)?,
                abstract_text: self.abstract_text,
                publication_date: self.publication_date,
                doi: self.doi,
                pdf_url: self.pdf_url,
                keywords: from_json(&self.keywords)?,
                full_text: self.full_text,
                methods: self.methods,
                results: self.results,
                discussion: self.discussion,
                conclusions: self.conclusions,
                citation_count: self.citation_count,
                view_count: self.view_count,
                entities: from_json(&self.entities)?,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn from_json<T: DeserializeOwned>(text: &str) -> StorageResult<T> {
    serde_json::from_str(text).map_err(|e| StorageError::Serialization(e.to_string()))
}
