use crate::error::Error;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Query-by-filter over flat documents. Conditions are ANDed.
#[derive(Debug, Clone, Default)]
pub struct DocFilter {
    equals: Vec<(String, Value)>,
    missing: Vec<String>,
}

impl DocFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field equals the given value
    pub fn eq(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.equals.push((key.to_string(), value.into()));
        self
    }

    /// Field is absent or null (used by the bulk cleanup)
    pub fn missing(mut self, key: &str) -> Self {
        self.missing.push(key.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.missing.is_empty()
    }

    /// In-process evaluation, used by the in-memory store
    pub fn matches(&self, doc: &Value) -> bool {
        for (key, value) in &self.equals {
            if doc.get(key) != Some(value) {
                return false;
            }
        }
        for key in &self.missing {
            match doc.get(key) {
                None | Some(Value::Null) => {}
                Some(_) => return false,
            }
        }
        true
    }

    /// SQL fragment over the `doc` jsonb column, continuing at the given
    /// bind index. Missing-field keys are internal constants, embedded
    /// with quotes stripped.
    fn to_sql(&self, first_bind: usize) -> (String, Option<Value>) {
        let mut sql = String::new();
        let eq_object = if self.equals.is_empty() {
            None
        } else {
            let map: serde_json::Map<String, Value> = self
                .equals
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            sql.push_str(&format!(" AND doc @> ${}", first_bind));
            Some(Value::Object(map))
        };

        for key in &self.missing {
            let safe = key.replace('\'', "");
            sql.push_str(&format!(
                " AND (doc->'{safe}' IS NULL OR doc->'{safe}' = 'null'::jsonb)"
            ));
        }

        (sql, eq_object)
    }
}

/// Abstract document store the ingestion core persists through
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, doc: Value) -> Result<Uuid>;
    async fn find_one(
        &self,
        collection: &str,
        filter: &DocFilter,
        sort_desc_by: Option<&str>,
    ) -> Result<Option<Value>>;
    async fn find_many(&self, collection: &str, filter: &DocFilter, limit: i64)
        -> Result<Vec<Value>>;
    async fn exists(&self, collection: &str, filter: &DocFilter) -> Result<bool>;
    async fn count(&self, collection: &str, filter: &DocFilter) -> Result<i64>;
    async fn delete_many(&self, collection: &str, filter: &DocFilter) -> Result<u64>;
}

/// Postgres-backed store: one `documents` table, collection column plus a
/// jsonb payload, filters compiled to jsonb conditions.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: Arc<PgPool>,
}

impl PgDocumentStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn where_clause(filter: &DocFilter) -> (String, Option<Value>) {
        let (fragment, eq_object) = filter.to_sql(2);
        (format!("collection = $1{}", fragment), eq_object)
    }

    /// Listing query with the limit as a bind parameter, placed after the
    /// optional containment object.
    fn find_many_sql(filter: &DocFilter) -> (String, Option<Value>) {
        let (clause, eq_object) = Self::where_clause(filter);
        let limit_bind = if eq_object.is_some() { 3 } else { 2 };
        let sql = format!(
            "SELECT doc FROM documents WHERE {} ORDER BY doc->>'timestamp' DESC LIMIT ${}",
            clause, limit_bind
        );
        (sql, eq_object)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, doc: Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, collection, doc) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(&doc)
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to insert document: {}", e)))?;
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &DocFilter,
        sort_desc_by: Option<&str>,
    ) -> Result<Option<Value>> {
        let (clause, eq_object) = Self::where_clause(filter);
        let mut sql = format!("SELECT doc FROM documents WHERE {}", clause);
        if let Some(key) = sort_desc_by {
            let safe = key.replace('\'', "");
            sql.push_str(&format!(" ORDER BY doc->>'{}' DESC", safe));
        }
        sql.push_str(" LIMIT 1");

        let mut query = sqlx::query(&sql).bind(collection);
        if let Some(eq_object) = eq_object {
            query = query.bind(eq_object);
        }

        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to query documents: {}", e)))?;

        Ok(row.map(|r| r.get::<Value, _>("doc")))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &DocFilter,
        limit: i64,
    ) -> Result<Vec<Value>> {
        let (sql, eq_object) = Self::find_many_sql(filter);

        let mut query = sqlx::query(&sql).bind(collection);
        if let Some(eq_object) = eq_object {
            query = query.bind(eq_object);
        }
        query = query.bind(limit);

        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to query documents: {}", e)))?;

        Ok(rows.iter().map(|r| r.get::<Value, _>("doc")).collect())
    }

    async fn exists(&self, collection: &str, filter: &DocFilter) -> Result<bool> {
        let (clause, eq_object) = Self::where_clause(filter);
        let sql = format!("SELECT EXISTS(SELECT 1 FROM documents WHERE {})", clause);

        let mut query = sqlx::query(&sql).bind(collection);
        if let Some(eq_object) = eq_object {
            query = query.bind(eq_object);
        }

        let row = query
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to check documents: {}", e)))?;

        Ok(row.get::<bool, _>(0))
    }

    async fn count(&self, collection: &str, filter: &DocFilter) -> Result<i64> {
        let (clause, eq_object) = Self::where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", clause);

        let mut query = sqlx::query(&sql).bind(collection);
        if let Some(eq_object) = eq_object {
            query = query.bind(eq_object);
        }

        let row = query
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to count documents: {}", e)))?;

        Ok(row.get::<i64, _>(0))
    }

    async fn delete_many(&self, collection: &str, filter: &DocFilter) -> Result<u64> {
        let (clause, eq_object) = Self::where_clause(filter);
        let sql = format!("DELETE FROM documents WHERE {}", clause);

        let mut query = sqlx::query(&sql).bind(collection);
        if let Some(eq_object) = eq_object {
            query = query.bind(eq_object);
        }

        let result = query
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to delete documents: {}", e)))?;

        Ok(result.rows_affected())
    }
}

/// In-memory store used by tests and local development
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<(Uuid, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, doc: Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut collections = self.collections.lock().unwrap();
        collections
            .entry(collection.to_string())
            .or_default()
            .push((id, doc));
        Ok(id)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &DocFilter,
        sort_desc_by: Option<&str>,
    ) -> Result<Option<Value>> {
        let collections = self.collections.lock().unwrap();
        let docs = match collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(None),
        };
        let mut matching: Vec<&Value> = docs
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| filter.matches(doc))
            .collect();
        if let Some(key) = sort_desc_by {
            matching.sort_by(|a, b| {
                let a = a.get(key).and_then(Value::as_str).unwrap_or("");
                let b = b.get(key).and_then(Value::as_str).unwrap_or("");
                b.cmp(a)
            });
        }
        Ok(matching.first().map(|doc| (*doc).clone()))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &DocFilter,
        limit: i64,
    ) -> Result<Vec<Value>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(_, doc)| doc)
                    .filter(|doc| filter.matches(doc))
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exists(&self, collection: &str, filter: &DocFilter) -> Result<bool> {
        Ok(self.count(collection, filter).await? > 0)
    }

    async fn count(&self, collection: &str, filter: &DocFilter) -> Result<i64> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|(_, doc)| filter.matches(doc)).count() as i64)
            .unwrap_or(0))
    }

    async fn delete_many(&self, collection: &str, filter: &DocFilter) -> Result<u64> {
        let mut collections = self.collections.lock().unwrap();
        let docs = match collections.get_mut(collection) {
            Some(docs) => docs,
            None => return Ok(0),
        };
        let before = docs.len();
        docs.retain(|(_, doc)| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_equality_and_missing() {
        let filter = DocFilter::new().eq("session_id", "s1").missing("user_id");

        assert!(filter.matches(&json!({"session_id": "s1"})));
        assert!(filter.matches(&json!({"session_id": "s1", "user_id": null})));
        assert!(!filter.matches(&json!({"session_id": "s1", "user_id": "u1"})));
        assert!(!filter.matches(&json!({"session_id": "s2"})));
    }

    #[test]
    fn filter_sql_fragment() {
        let (sql, eq_object) = DocFilter::new()
            .eq("session_id", "s1")
            .missing("gps_latitude")
            .to_sql(2);

        assert!(sql.contains("doc @> $2"));
        assert!(sql.contains("doc->'gps_latitude' IS NULL"));
        assert_eq!(eq_object, Some(json!({"session_id": "s1"})));
    }

    #[test]
    fn find_many_sql_binds_the_limit() {
        let (sql, eq_object) = PgDocumentStore::find_many_sql(&DocFilter::new());
        assert!(sql.ends_with("LIMIT $2"));
        assert!(eq_object.is_none());

        let (sql, eq_object) =
            PgDocumentStore::find_many_sql(&DocFilter::new().eq("session_id", "s1"));
        assert!(sql.contains("doc @> $2"));
        assert!(sql.ends_with("LIMIT $3"));
        assert!(eq_object.is_some());
    }

    #[tokio::test]
    async fn memory_store_round_trip() -> Result<()> {
        let store = MemoryStore::new();
        store
            .insert("vehicle_detections", json!({"session_id": "s1", "timestamp": "2024-05-01 08:30:15"}))
            .await?;
        store
            .insert("vehicle_detections", json!({"session_id": "s2", "timestamp": "2024-05-01 09:00:00"}))
            .await?;

        assert_eq!(store.count("vehicle_detections", &DocFilter::new()).await?, 2);
        assert!(
            store
                .exists("vehicle_detections", &DocFilter::new().eq("session_id", "s1"))
                .await?
        );

        let latest = store
            .find_one("vehicle_detections", &DocFilter::new(), Some("timestamp"))
            .await?
            .unwrap();
        assert_eq!(latest["session_id"], "s2");

        let deleted = store
            .delete_many("vehicle_detections", &DocFilter::new().eq("session_id", "s1"))
            .await?;
        assert_eq!(deleted, 1);
        assert_eq!(store.count("vehicle_detections", &DocFilter::new()).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn memory_store_deletes_docs_with_missing_fields() -> Result<()> {
        let store = MemoryStore::new();
        store
            .insert("other_detections", json!({"session_id": "s1", "user_id": "u1"}))
            .await?;
        store
            .insert("other_detections", json!({"session_id": "s2", "user_id": null}))
            .await?;
        store
            .insert("other_detections", json!({"session_id": "s3"}))
            .await?;

        let deleted = store
            .delete_many("other_detections", &DocFilter::new().missing("user_id"))
            .await?;
        assert_eq!(deleted, 2);
        Ok(())
    }
}
