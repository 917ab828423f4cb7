// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector store with per-user collections.
//!
//! Points are stored as f32 BLOBs in `vector_points`. Search loads the
//! requesting user's points from one collection and ranks them by cosine
//! similarity in process.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Type;
use tracing::debug;

use parley_core::naming::USER_ID_FIELD;
use parley_core::time::now_timestamp;
use parley_core::types::{MemoryCategory, MemoryRecord, PayloadSchema, ScoredMemory, VectorQuery};
use parley_core::{
    AdapterType, HealthStatus, ParleyError, PluginAdapter, VectorStoreAdapter,
};
use parley_storage::{Database, map_tr_err};

use crate::vector::{blob_to_vec, cosine_similarity, vec_to_blob};

/// Outcome of a write that may hit a missing collection.
enum Write<T> {
    Done(T),
    MissingCollection,
}

/// Persistent vector store sharing the application database.
pub struct SqliteVectorStore {
    db: Arc<Database>,
}

impl SqliteVectorStore {
    /// Creates a vector store over an opened database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Dimension of a collection, or `None` if it does not exist.
    pub async fn collection_dimensions(&self, name: &str) -> Result<Option<usize>, ParleyError> {
        let name = name.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<usize>, rusqlite::Error> {
                dimensions_of(conn, &name)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Payload indexes defined on a collection, as `(field, schema)` pairs.
    pub async fn payload_indexes(
        &self,
        collection: &str,
    ) -> Result<Vec<(String, PayloadSchema)>, ParleyError> {
        let collection = collection.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<(String, PayloadSchema)>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT field_name, field_schema FROM vector_payload_indexes
                     WHERE collection = ?1 ORDER BY field_name",
                )?;
                let rows = stmt.query_map(rusqlite::params![collection], |row| {
                    let field: String = row.get(0)?;
                    let raw: String = row.get(1)?;
                    let schema = raw.parse::<PayloadSchema>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                    })?;
                    Ok((field, schema))
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Number of points in a collection across all users.
    pub async fn count(&self, collection: &str) -> Result<u64, ParleyError> {
        let collection = collection.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<u64, rusqlite::Error> {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM vector_points WHERE collection = ?1",
                    rusqlite::params![collection],
                    |row| row.get(0),
                )?;
                Ok(n as u64)
            })
            .await
            .map_err(map_tr_err)
    }
}

fn dimensions_of(
    conn: &rusqlite::Connection,
    name: &str,
) -> Result<Option<usize>, rusqlite::Error> {
    use rusqlite::OptionalExtension;

    let dims: Option<i64> = conn
        .query_row(
            "SELECT dimensions FROM vector_collections WHERE name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(dims.map(|d| d as usize))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let raw_category: String = row.get(3)?;
    let category = raw_category.parse::<MemoryCategory>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
    })?;
    let blob: Vec<u8> = row.get(4)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        text: row.get(2)?,
        category,
        embedding: blob_to_vec(&blob),
        created_at: row.get(5)?,
    })
}

fn missing_collection(name: &str) -> ParleyError {
    ParleyError::NotFound {
        resource: format!("collection {name}"),
    }
}

#[async_trait]
impl PluginAdapter for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite-vector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::VectorStore
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM vector_collections", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        // The database handle is owned and closed by the storage adapter.
        Ok(())
    }
}

#[async_trait]
impl VectorStoreAdapter for SqliteVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<(), ParleyError> {
        if dimensions == 0 {
            return Err(ParleyError::validation("collection dimension must be at least 1"));
        }
        let owned = name.to_string();
        let created_at = now_timestamp();
        let inserted = self
            .db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let changed = conn.execute(
                    "INSERT INTO vector_collections (name, dimensions, created_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO NOTHING",
                    rusqlite::params![owned, dimensions as i64, created_at],
                )?;
                Ok(changed == 1)
            })
            .await
            .map_err(map_tr_err)?;

        if !inserted {
            return Err(ParleyError::AlreadyExists {
                resource: format!("collection {name}"),
            });
        }
        debug!(collection = name, dimensions, "collection created");
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        field: &str,
        schema: PayloadSchema,
    ) -> Result<(), ParleyError> {
        if field != USER_ID_FIELD {
            return Err(ParleyError::validation(format!(
                "payload index on `{field}` is not supported, only `{USER_ID_FIELD}`"
            )));
        }
        let owned_collection = collection.to_string();
        let owned_field = field.to_string();
        let created_at = now_timestamp();
        let outcome = self
            .db
            .connection()
            .call(move |conn| -> Result<Write<bool>, rusqlite::Error> {
                if dimensions_of(conn, &owned_collection)?.is_none() {
                    return Ok(Write::MissingCollection);
                }
                let changed = conn.execute(
                    "INSERT INTO vector_payload_indexes (collection, field_name, field_schema, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(collection, field_name) DO NOTHING",
                    rusqlite::params![owned_collection, owned_field, schema.to_string(), created_at],
                )?;
                Ok(Write::Done(changed == 1))
            })
            .await
            .map_err(map_tr_err)?;

        match outcome {
            Write::MissingCollection => Err(missing_collection(collection)),
            Write::Done(false) => Err(ParleyError::AlreadyExists {
                resource: format!("{collection}/{field}"),
            }),
            Write::Done(true) => {
                debug!(collection, field, "payload index created");
                Ok(())
            }
        }
    }

    async fn upsert(
        &self,
        collection: &str,
        records: &[MemoryRecord],
    ) -> Result<(), ParleyError> {
        if records.is_empty() {
            return Ok(());
        }
        let owned_collection = collection.to_string();
        let records = records.to_vec();
        let outcome = self
            .db
            .connection()
            .call(move |conn| -> Result<Write<Result<usize, String>>, rusqlite::Error> {
                let tx = conn.transaction()?;
                let Some(dims) = dimensions_of(&tx, &owned_collection)? else {
                    return Ok(Write::MissingCollection);
                };
                if let Some(bad) = records.iter().find(|r| r.embedding.len() != dims) {
                    return Ok(Write::Done(Err(format!(
                        "point {} has {} dimensions, collection expects {dims}",
                        bad.id,
                        bad.embedding.len()
                    ))));
                }
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO vector_points (collection, id, user_id, text, category, embedding, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                         ON CONFLICT(collection, id) DO UPDATE SET
                             text = excluded.text,
                             category = excluded.category,
                             embedding = excluded.embedding",
                    )?;
                    for record in &records {
                        stmt.execute(rusqlite::params![
                            owned_collection,
                            record.id,
                            record.user_id,
                            record.text,
                            record.category.to_string(),
                            vec_to_blob(&record.embedding),
                            record.created_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(Write::Done(Ok(records.len())))
            })
            .await
            .map_err(map_tr_err)?;

        match outcome {
            Write::MissingCollection => Err(missing_collection(collection)),
            Write::Done(Err(message)) => Err(ParleyError::validation(message)),
            Write::Done(Ok(n)) => {
                debug!(collection, points = n, "points upserted");
                Ok(())
            }
        }
    }

    async fn search(&self, query: VectorQuery) -> Result<Vec<ScoredMemory>, ParleyError> {
        let collection = query.collection.clone();
        let user_id = query.user_id.clone();
        let candidates = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<Vec<MemoryRecord>>, rusqlite::Error> {
                if dimensions_of(conn, &collection)?.is_none() {
                    return Ok(None);
                }
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, text, category, embedding, created_at
                     FROM vector_points WHERE collection = ?1 AND user_id = ?2",
                )?;
                let rows = stmt.query_map(rusqlite::params![collection, user_id], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>().map(Some)
            })
            .await
            .map_err(map_tr_err)?
            .ok_or_else(|| missing_collection(&query.collection))?;

        let mut scored: Vec<ScoredMemory> = candidates
            .into_iter()
            .map(|record| ScoredMemory {
                score: cosine_similarity(&query.vector, &record.embedding),
                id: record.id,
                text: record.text,
                created_at: record.created_at,
            })
            .filter(|m| query.score_threshold.is_none_or(|t| m.score >= t))
            .collect();

        // Ties broken by age so results are stable across calls.
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(query.limit);
        Ok(scored)
    }

    async fn scroll(
        &self,
        collection: &str,
        user_id: &str,
    ) -> Result<Vec<MemoryRecord>, ParleyError> {
        let owned_collection = collection.to_string();
        let user_id = user_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Option<Vec<MemoryRecord>>, rusqlite::Error> {
                if dimensions_of(conn, &owned_collection)?.is_none() {
                    return Ok(None);
                }
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, text, category, embedding, created_at
                     FROM vector_points WHERE collection = ?1 AND user_id = ?2
                     ORDER BY created_at ASC, id ASC",
                )?;
                let rows =
                    stmt.query_map(rusqlite::params![owned_collection, user_id], row_to_record)?;
                rows.collect::<Result<Vec<_>, _>>().map(Some)
            })
            .await
            .map_err(map_tr_err)?
            .ok_or_else(|| missing_collection(collection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (SqliteVectorStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectors.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (SqliteVectorStore::new(Arc::new(db)), dir)
    }

    fn record(id: &str, user: &str, text: &str, embedding: Vec<f32>, at: &str) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            user_id: user.to_string(),
            text: text.to_string(),
            embedding,
            created_at: at.to_string(),
            category: MemoryCategory::Memory,
        }
    }

    fn query(collection: &str, user: &str, vector: Vec<f32>) -> VectorQuery {
        VectorQuery {
            collection: collection.to_string(),
            vector,
            user_id: user.to_string(),
            limit: 10,
            score_threshold: None,
        }
    }

    #[tokio::test]
    async fn create_collection_twice_reports_already_exists() {
        let (store, _dir) = setup().await;
        store.create_collection("user_memories_u1", 3).await.unwrap();
        let err = store
            .create_collection("user_memories_u1", 3)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(
            store.collection_dimensions("user_memories_u1").await.unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn payload_index_requires_collection() {
        let (store, _dir) = setup().await;
        let err = store
            .create_payload_index("user_memories_u1", USER_ID_FIELD, PayloadSchema::Keyword)
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn payload_index_is_created_once() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 2).await.unwrap();
        store
            .create_payload_index("c", USER_ID_FIELD, PayloadSchema::Keyword)
            .await
            .unwrap();
        let err = store
            .create_payload_index("c", USER_ID_FIELD, PayloadSchema::Keyword)
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(
            store.payload_indexes("c").await.unwrap(),
            vec![(USER_ID_FIELD.to_string(), PayloadSchema::Keyword)]
        );
    }

    #[tokio::test]
    async fn payload_index_on_other_field_is_rejected() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 2).await.unwrap();
        let err = store
            .create_payload_index("c", "text", PayloadSchema::Keyword)
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Validation { .. }));
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 3).await.unwrap();
        let err = store
            .upsert("c", &[record("a", "u1", "hi", vec![1.0, 0.0], "2026-01-01T00:00:00.000Z")])
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::Validation { .. }));
        assert_eq!(store.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_is_not_found() {
        let (store, _dir) = setup().await;
        let err = store
            .upsert("nope", &[record("a", "u1", "hi", vec![1.0], "2026-01-01T00:00:00.000Z")])
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn upsert_same_id_replaces_point_and_keeps_created_at() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 2).await.unwrap();
        store
            .upsert("c", &[record("a", "u1", "first", vec![1.0, 0.0], "2026-01-01T00:00:00.000Z")])
            .await
            .unwrap();
        store
            .upsert("c", &[record("a", "u1", "second", vec![0.0, 1.0], "2026-02-01T00:00:00.000Z")])
            .await
            .unwrap();

        let all = store.scroll("c", "u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "second");
        assert_eq!(all[0].embedding, vec![0.0, 1.0]);
        assert_eq!(all[0].created_at, "2026-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_and_filters_user() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 2).await.unwrap();
        store
            .upsert(
                "c",
                &[
                    record("near", "u1", "rust", vec![1.0, 0.1], "2026-01-01T00:00:00.000Z"),
                    record("far", "u1", "cooking", vec![0.0, 1.0], "2026-01-02T00:00:00.000Z"),
                    record("other", "u2", "rust too", vec![1.0, 0.0], "2026-01-03T00:00:00.000Z"),
                ],
            )
            .await
            .unwrap();

        let results = store.search(query("c", "u1", vec![1.0, 0.0])).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn search_applies_threshold_and_limit() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 2).await.unwrap();
        let points: Vec<MemoryRecord> = (0..5)
            .map(|i| {
                record(
                    &format!("p{i}"),
                    "u1",
                    "same",
                    vec![1.0, 0.0],
                    &format!("2026-01-0{}T00:00:00.000Z", i + 1),
                )
            })
            .chain(std::iter::once(record(
                "opposite",
                "u1",
                "no",
                vec![-1.0, 0.0],
                "2026-01-09T00:00:00.000Z",
            )))
            .collect();
        store.upsert("c", &points).await.unwrap();

        let mut q = query("c", "u1", vec![1.0, 0.0]);
        q.limit = 3;
        q.score_threshold = Some(0.0);
        let results = store.search(q).await.unwrap();
        assert_eq!(results.len(), 3);
        // Equal scores come back oldest first.
        assert_eq!(results[0].id, "p0");
        assert!(results.iter().all(|m| m.id != "opposite"));
    }

    #[tokio::test]
    async fn search_missing_collection_is_not_found() {
        let (store, _dir) = setup().await;
        let err = store
            .search(query("missing", "u1", vec![1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, ParleyError::NotFound { .. }));
    }

    #[tokio::test]
    async fn scroll_returns_oldest_first() {
        let (store, _dir) = setup().await;
        store.create_collection("c", 1).await.unwrap();
        store
            .upsert(
                "c",
                &[
                    record("b", "u1", "later", vec![1.0], "2026-03-01T00:00:00.000Z"),
                    record("a", "u1", "earlier", vec![1.0], "2026-01-01T00:00:00.000Z"),
                ],
            )
            .await
            .unwrap();
        let texts: Vec<String> = store
            .scroll("c", "u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["earlier", "later"]);
    }
}
