//! SQLite persistence for ingested documents and the vector-store handle.
//!
//! Two record kinds live here: per-drive-file document records keyed by the
//! external file id, and the singleton vector-store row. The ingestion
//! workflow is the only writer; search reads the document catalog.

use crate::schema::DocumentMetadata;
use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised by the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// Persisted metadata column could not be serialized or parsed.
    #[error("stored metadata is not valid JSON: {0}")]
    Metadata(#[from] serde_json::Error),
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vector_store (
    singleton INTEGER PRIMARY KEY CHECK (singleton = 1),
    external_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    drive_file_id TEXT PRIMARY KEY,
    original_file_name TEXT NOT NULL,
    renamed_file_name TEXT,
    vector_store_file_id TEXT,
    metadata_json TEXT,
    processed_at TEXT NOT NULL
);
"#;

/// A persisted document record.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRecord {
    /// External drive identifier, the primary correlation key.
    pub drive_file_id: String,
    /// File name observed when the document was first ingested.
    pub original_file_name: String,
    /// Derived name applied at the drive, when renaming succeeded.
    pub renamed_file_name: Option<String>,
    /// Identifier of the file attached to the vector store.
    pub vector_store_file_id: Option<String>,
    /// Serialized fichamento, absent until extraction succeeded.
    pub metadata_json: Option<String>,
    /// RFC3339 timestamp of the last successful processing run.
    pub processed_at: String,
}

impl DocumentRecord {
    /// Deserialize the stored fichamento, when present.
    pub fn metadata(&self) -> Result<Option<DocumentMetadata>, StoreError> {
        match &self.metadata_json {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    /// Renamed file name, falling back to the original drive name.
    pub fn display_name(&self) -> &str {
        self.renamed_file_name
            .as_deref()
            .unwrap_or(&self.original_file_name)
    }
}

/// Fields written by a document upsert.
#[derive(Debug, Clone)]
pub struct DocumentUpsert {
    /// External drive identifier.
    pub drive_file_id: String,
    /// Drive file name before renaming.
    pub original_file_name: String,
    /// Derived name applied at the drive.
    pub renamed_file_name: Option<String>,
    /// Identifier of the file attached to the vector store.
    pub vector_store_file_id: Option<String>,
    /// Extracted fichamento.
    pub metadata: Option<DocumentMetadata>,
}

/// Handle to the SQLite document store.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    /// Open (and create, if needed) the database at the given path.
    pub async fn connect(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                StoreError::Database(sqlx::Error::Io(err))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        tracing::debug!(path = %db_path.display(), "Connecting to SQLite database");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Return the persisted vector-store identifier, when one exists.
    pub async fn get_vector_store(&self) -> Result<Option<String>, StoreError> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT external_id FROM vector_store WHERE singleton = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }

    /// Persist a vector-store identifier, keeping the first writer's value.
    ///
    /// The singleton primary key plus `INSERT OR IGNORE` acts as a
    /// compare-and-set: when two ingestions race the first creation, exactly
    /// one row lands and both callers observe the same identifier. Returns
    /// the identifier that actually won.
    pub async fn persist_vector_store(&self, external_id: &str) -> Result<String, StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO vector_store (singleton, external_id, created_at) VALUES (1, ?, ?)",
        )
        .bind(external_id)
        .bind(current_timestamp_rfc3339())
        .execute(&self.pool)
        .await?;

        let winner: String =
            sqlx::query_scalar("SELECT external_id FROM vector_store WHERE singleton = 1")
                .fetch_one(&self.pool)
                .await?;
        Ok(winner)
    }

    /// Fetch a document record by its external drive identifier.
    pub async fn get_document(
        &self,
        drive_file_id: &str,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE drive_file_id = ?",
        )
        .bind(drive_file_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// List every persisted document record.
    pub async fn get_all_documents(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents ORDER BY processed_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// List documents that carry extracted metadata.
    pub async fn documents_with_metadata(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE metadata_json IS NOT NULL ORDER BY processed_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Insert or update a document record.
    ///
    /// Reprocessing the same drive file updates the existing row in place and
    /// keeps the `original_file_name` captured on first ingestion.
    pub async fn upsert_document(&self, doc: DocumentUpsert) -> Result<DocumentRecord, StoreError> {
        let metadata_json = doc
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO documents
                (drive_file_id, original_file_name, renamed_file_name,
                 vector_store_file_id, metadata_json, processed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(drive_file_id) DO UPDATE SET
                renamed_file_name = excluded.renamed_file_name,
                vector_store_file_id = excluded.vector_store_file_id,
                metadata_json = excluded.metadata_json,
                processed_at = excluded.processed_at
            "#,
        )
        .bind(&doc.drive_file_id)
        .bind(&doc.original_file_name)
        .bind(&doc.renamed_file_name)
        .bind(&doc.vector_store_file_id)
        .bind(&metadata_json)
        .bind(current_timestamp_rfc3339())
        .execute(&self.pool)
        .await?;

        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT * FROM documents WHERE drive_file_id = ?",
        )
        .bind(&doc.drive_file_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }
}

/// Current timestamp formatted for persisted records.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_metadata;
    use tempfile::TempDir;

    async fn setup_test_store() -> (DocumentStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::connect(&tmp.path().join("test.db"))
            .await
            .unwrap();
        (store, tmp)
    }

    fn sample_metadata() -> DocumentMetadata {
        parse_metadata(
            r#"{
                "identificacao": {"titulo": "Metformin Trial", "ano": 2024},
                "conclusao_clinica": "Reduziu HbA1c.",
                "resumo_teleprompter": "Estudo randomizado."
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn vector_store_first_writer_wins() {
        let (store, _tmp) = setup_test_store().await;

        assert!(store.get_vector_store().await.unwrap().is_none());

        let first = store.persist_vector_store("vs_one").await.unwrap();
        assert_eq!(first, "vs_one");

        // A racing second creation must observe the persisted identifier.
        let second = store.persist_vector_store("vs_two").await.unwrap();
        assert_eq!(second, "vs_one");
        assert_eq!(store.get_vector_store().await.unwrap().as_deref(), Some("vs_one"));
    }

    #[tokio::test]
    async fn upsert_preserves_original_file_name() {
        let (store, _tmp) = setup_test_store().await;

        let created = store
            .upsert_document(DocumentUpsert {
                drive_file_id: "file-1".into(),
                original_file_name: "scan01.pdf".into(),
                renamed_file_name: Some("2024_Silva_Metformin_Trial_Endocrinologia.pdf".into()),
                vector_store_file_id: Some("vsfile-1".into()),
                metadata: Some(sample_metadata()),
            })
            .await
            .unwrap();
        assert_eq!(created.original_file_name, "scan01.pdf");

        let updated = store
            .upsert_document(DocumentUpsert {
                drive_file_id: "file-1".into(),
                original_file_name: "2024_Silva_Metformin_Trial_Endocrinologia.pdf".into(),
                renamed_file_name: Some("2024_Silva_Renamed.pdf".into()),
                vector_store_file_id: Some("vsfile-2".into()),
                metadata: Some(sample_metadata()),
            })
            .await
            .unwrap();

        // Reprocessing updates in place, without a second row or a new original name.
        assert_eq!(updated.original_file_name, "scan01.pdf");
        assert_eq!(updated.renamed_file_name.as_deref(), Some("2024_Silva_Renamed.pdf"));
        assert_eq!(store.get_all_documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn documents_with_metadata_skips_bare_records() {
        let (store, _tmp) = setup_test_store().await;

        store
            .upsert_document(DocumentUpsert {
                drive_file_id: "file-1".into(),
                original_file_name: "a.pdf".into(),
                renamed_file_name: None,
                vector_store_file_id: None,
                metadata: None,
            })
            .await
            .unwrap();
        store
            .upsert_document(DocumentUpsert {
                drive_file_id: "file-2".into(),
                original_file_name: "b.pdf".into(),
                renamed_file_name: None,
                vector_store_file_id: None,
                metadata: Some(sample_metadata()),
            })
            .await
            .unwrap();

        let tagged = store.documents_with_metadata().await.unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].drive_file_id, "file-2");
        let metadata = tagged[0].metadata().unwrap().unwrap();
        assert_eq!(metadata.identificacao.titulo, "Metformin Trial");
        assert_eq!(tagged[0].display_name(), "b.pdf");
    }
}
