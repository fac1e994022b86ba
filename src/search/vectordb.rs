//! Vector database using SQLite
//!
//! Stores sentences with their embeddings as BLOBs and computes similarity in
//! Rust with an exact linear scan.

use std::cmp::Ordering;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::embedding::cosine_similarity;
use crate::core::text::Sentence;
use crate::error::{Result, SearchError};

/// Vector database for sentence embeddings
pub struct VectorDB {
    conn: Connection,
}

/// Document metadata stored alongside its sentences
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub path: String,
    pub title: String,
    pub kind: String,
    pub mtime: i64,
    pub sentence_count: usize,
}

/// A stored sentence
#[derive(Debug, Clone, Serialize)]
pub struct SentenceRecord {
    pub doc_id: String,
    pub title: String,
    pub path: String,
    pub position: usize,
    pub text: String,
}

/// Restrictions applied to a similarity scan
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub limit: usize,
    pub min_score: Option<f32>,
    pub document: Option<String>,
    /// Sentence to leave out of the results (doc id, position)
    pub exclude: Option<(String, usize)>,
}

impl VectorDB {
    /// Open or create database at path
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                title TEXT NOT NULL,
                kind TEXT NOT NULL,
                mtime INTEGER NOT NULL,
                sentence_count INTEGER NOT NULL,
                indexed_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sentences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                text TEXT NOT NULL,
                UNIQUE (doc_id, position),
                FOREIGN KEY (doc_id) REFERENCES documents(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS embeddings (
                sentence_id INTEGER PRIMARY KEY,
                embedding BLOB NOT NULL,
                FOREIGN KEY (sentence_id) REFERENCES sentences(id) ON DELETE CASCADE
            );

            -- Files that were read but yielded no usable sentences
            CREATE TABLE IF NOT EXISTS empty_documents (
                id TEXT PRIMARY KEY,
                mtime INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sentences_doc ON sentences(doc_id);
            "#,
        )?;

        Ok(())
    }

    /// Refuse to mix embeddings from different models in one index.
    ///
    /// An empty index adopts the given embedder.
    pub fn check_embedder(&self, name: &str, dimension: usize) -> Result<()> {
        let indexed = self.get_meta("embedder")?;
        let indexed_dim = self
            .get_meta("dimension")?
            .and_then(|d| d.parse::<usize>().ok());

        match (indexed, indexed_dim) {
            (Some(indexed), Some(indexed_dim)) if indexed != name || indexed_dim != dimension => {
                if self.get_stats()?.sentence_count == 0 {
                    return self.adopt_embedder(name, dimension);
                }
                Err(SearchError::EmbedderMismatch {
                    indexed,
                    indexed_dim,
                    active: name.to_string(),
                    active_dim: dimension,
                })
            }
            (Some(_), Some(_)) => Ok(()),
            _ => self.adopt_embedder(name, dimension),
        }
    }

    fn adopt_embedder(&self, name: &str, dimension: usize) -> Result<()> {
        self.set_meta("embedder", name)?;
        self.set_meta("dimension", &dimension.to_string())
    }

    /// Replace a document and all of its sentences in one transaction.
    pub fn replace_document(
        &mut self,
        record: &DocumentRecord,
        sentences: &[Sentence],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        if sentences.len() != embeddings.len() {
            return Err(SearchError::Embedding(format!(
                "{} sentences but {} embeddings for {}",
                sentences.len(),
                embeddings.len(),
                record.id
            )));
        }

        let now = chrono::Utc::now().timestamp();
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM documents WHERE id = ?1", params![record.id])?;
        tx.execute("DELETE FROM empty_documents WHERE id = ?1", params![record.id])?;
        tx.execute(
            r#"
            INSERT INTO documents (id, path, title, kind, mtime, sentence_count, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.path,
                record.title,
                record.kind,
                record.mtime,
                sentences.len() as i64,
                now,
            ],
        )?;

        {
            let mut insert_sentence = tx.prepare(
                "INSERT INTO sentences (doc_id, position, text) VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_embedding =
                tx.prepare("INSERT INTO embeddings (sentence_id, embedding) VALUES (?1, ?2)")?;

            for (sentence, embedding) in sentences.iter().zip(embeddings) {
                insert_sentence.execute(params![
                    record.id,
                    sentence.position as i64,
                    sentence.text
                ])?;
                let sentence_id = tx.last_insert_rowid();
                insert_embedding.execute(params![sentence_id, embedding_to_blob(embedding)])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete document (and, by cascade, its sentences) by ID
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Remember a file that yielded no sentences, so it is not reported as
    /// pending forever
    pub fn mark_empty_document(&self, id: &str, mtime: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO empty_documents (id, mtime) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET mtime = excluded.mtime",
            params![id, mtime],
        )?;
        Ok(())
    }

    pub fn forget_empty_document(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM empty_documents WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Files without sentences, with the mtime they had when read
    pub fn empty_documents(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, mtime FROM empty_documents ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Drop every document and the recorded embedder, leaving an empty index
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM documents", [])?;
        tx.execute("DELETE FROM empty_documents", [])?;
        tx.execute(
            "DELETE FROM index_meta WHERE key IN ('embedder', 'dimension')",
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let result = self
            .conn
            .query_row(
                "SELECT id, path, title, kind, mtime, sentence_count FROM documents WHERE id = ?1",
                params![id],
                document_from_row,
            )
            .optional()?;

        Ok(result)
    }

    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, path, title, kind, mtime, sentence_count FROM documents ORDER BY id",
        )?;
        let rows = stmt.query_map([], document_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Sentences of one document in positional order
    pub fn document_sentences(&self, doc_id: &str) -> Result<Vec<SentenceRecord>> {
        self.sentences_in_range(doc_id, 0, i64::MAX as usize)
    }

    /// Sentences with `from <= position <= to`
    pub fn sentences_in_range(
        &self,
        doc_id: &str,
        from: usize,
        to: usize,
    ) -> Result<Vec<SentenceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.doc_id, d.title, d.path, s.position, s.text
            FROM sentences s
            JOIN documents d ON d.id = s.doc_id
            WHERE s.doc_id = ?1 AND s.position >= ?2 AND s.position <= ?3
            ORDER BY s.position
            "#,
        )?;
        let rows = stmt.query_map(params![doc_id, from as i64, to as i64], sentence_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// A stored sentence together with its embedding
    pub fn sentence_at(
        &self,
        doc_id: &str,
        position: usize,
    ) -> Result<Option<(SentenceRecord, Vec<f32>)>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT s.doc_id, d.title, d.path, s.position, s.text, e.embedding
                FROM sentences s
                JOIN documents d ON d.id = s.doc_id
                JOIN embeddings e ON e.sentence_id = s.id
                WHERE s.doc_id = ?1 AND s.position = ?2
                "#,
                params![doc_id, position as i64],
                |row| {
                    let blob: Vec<u8> = row.get(5)?;
                    Ok((sentence_from_row(row)?, blob_to_embedding(&blob)))
                },
            )
            .optional()?;

        Ok(result)
    }

    /// Every stored sentence, for keyword matching
    pub fn all_sentences(&self) -> Result<Vec<SentenceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.doc_id, d.title, d.path, s.position, s.text
            FROM sentences s
            JOIN documents d ON d.id = s.doc_id
            ORDER BY s.doc_id, s.position
            "#,
        )?;
        let rows = stmt.query_map([], sentence_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Search for similar sentences using cosine similarity
    ///
    /// O(n) over stored sentences. Results are sorted by descending score,
    /// ties broken by document id then position.
    pub fn search(
        &self,
        query_embedding: &[f32],
        filter: &SearchFilter,
    ) -> Result<Vec<(SentenceRecord, f32)>> {
        if filter.limit == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.doc_id, d.title, d.path, s.position, s.text, e.embedding
            FROM sentences s
            JOIN documents d ON d.id = s.doc_id
            JOIN embeddings e ON e.sentence_id = s.id
            WHERE (?1 IS NULL OR s.doc_id = ?1)
            "#,
        )?;

        let rows = stmt.query_map(params![filter.document], |row| {
            let blob: Vec<u8> = row.get(5)?;
            Ok((sentence_from_row(row)?, blob))
        })?;

        let mut results: Vec<(SentenceRecord, f32)> = Vec::new();

        for row_result in rows {
            let (sentence, blob) = row_result?;

            if let Some((doc_id, position)) = &filter.exclude {
                if sentence.doc_id == *doc_id && sentence.position == *position {
                    continue;
                }
            }

            let score = cosine_similarity(query_embedding, &blob_to_embedding(&blob));
            if filter.min_score.is_some_and(|min| score < min) {
                continue;
            }
            results.push((sentence, score));
        }

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.doc_id.cmp(&b.0.doc_id))
                .then_with(|| a.0.position.cmp(&b.0.position))
        });
        results.truncate(filter.limit);

        Ok(results)
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        let document_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let sentence_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sentences", [], |row| row.get(0))?;

        let embedding_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;

        let last_indexed: Option<i64> = self
            .conn
            .query_row("SELECT MAX(indexed_at) FROM documents", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(IndexStats {
            document_count: document_count as usize,
            sentence_count: sentence_count as usize,
            embedding_count: embedding_count as usize,
            last_indexed,
            embedder: self.get_meta("embedder")?,
        })
    }

    /// All document IDs with their mtimes
    pub fn all_mtimes(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare("SELECT id, mtime FROM documents")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

/// Index statistics
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub sentence_count: usize,
    pub embedding_count: usize,
    pub last_indexed: Option<i64>,
    pub embedder: Option<String>,
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let sentence_count: i64 = row.get(5)?;
    Ok(DocumentRecord {
        id: row.get(0)?,
        path: row.get(1)?,
        title: row.get(2)?,
        kind: row.get(3)?,
        mtime: row.get(4)?,
        sentence_count: sentence_count as usize,
    })
}

fn sentence_from_row(row: &Row<'_>) -> rusqlite::Result<SentenceRecord> {
    let position: i64 = row.get(3)?;
    Ok(SentenceRecord {
        doc_id: row.get(0)?,
        title: row.get(1)?,
        path: row.get(2)?,
        position: position as usize,
        text: row.get(4)?,
    })
}

/// Convert f32 embedding to little-endian BLOB
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        blob.extend_from_slice(&val.to_le_bytes());
    }
    blob
}

fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
