// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory record store.
//!
//! Used in offline mode and by the test suite. Counts queries per
//! collection and can inject failures, so cache and partial-failure
//! behaviour can be observed.

use crate::db::record::{Document, Fields, Filter};
use crate::db::store::RecordStore;
use crate::error::AppError;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Sentinel for "no delete budget configured".
const UNLIMITED: usize = usize::MAX;

/// Record store backed by process memory.
pub struct InMemoryStore {
    collections: DashMap<String, BTreeMap<String, Fields>>,
    next_id: AtomicU64,
    queries: DashMap<String, usize>,
    /// Remaining successful deletes before every delete fails.
    delete_budget: AtomicUsize,
    failing_collections: DashSet<String>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            next_id: AtomicU64::new(1),
            queries: DashMap::new(),
            delete_budget: AtomicUsize::new(UNLIMITED),
            failing_collections: DashSet::new(),
        }
    }

    /// Seed a document directly, bypassing fault injection.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Raw fields of a document, if present.
    pub fn fields(&self, collection: &str, id: &str) -> Option<Fields> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |docs| docs.len())
    }

    /// Number of `query` calls issued against a collection.
    pub fn query_count(&self, collection: &str) -> usize {
        self.queries.get(collection).map_or(0, |n| *n)
    }

    /// Allow `n` more deletes to succeed; every delete after that fails.
    pub fn fail_deletes_after(&self, n: usize) {
        self.delete_budget.store(n, Ordering::SeqCst);
    }

    /// Make every operation on `collection` fail.
    pub fn fail_collection(&self, collection: &str) {
        self.failing_collections.insert(collection.to_string());
    }

    /// Undo all fault injection.
    pub fn clear_faults(&self) {
        self.delete_budget.store(UNLIMITED, Ordering::SeqCst);
        self.failing_collections.clear();
    }

    fn check_collection(&self, collection: &str) -> Result<(), AppError> {
        if self.failing_collections.contains(collection) {
            return Err(AppError::Database(format!(
                "Injected failure for collection {}",
                collection
            )));
        }
        Ok(())
    }

    fn take_delete_budget(&self) -> Result<(), AppError> {
        self.delete_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .map(|_| ())
            .map_err(|_| AppError::Database("Injected delete failure".to_string()))
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, AppError> {
        *self.queries.entry(collection.to_string()).or_insert(0) += 1;
        self.check_collection(collection)?;

        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, fields)| filters.iter().all(|f| f.matches(fields)))
            .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        self.check_collection(collection)?;
        Ok(self
            .fields(collection, id)
            .map(|fields| Document::new(id, fields)))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        self.check_collection(collection)?;
        let id = format!("doc{:06}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.insert(collection, &id, fields);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        self.check_collection(collection)?;
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        let doc = docs.get_mut(id).ok_or_else(|| {
            AppError::NotFound(format!("{}/{} does not exist", collection, id))
        })?;
        doc.extend(fields);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.check_collection(collection)?;
        self.take_delete_budget()?;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::record::DocRef;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_query_applies_all_filters() {
        let store = InMemoryStore::new();
        store.insert(
            "adsAccounts",
            "a1",
            fields(json!({ "User": "users/admin", "Is Connected": true })),
        );
        store.insert(
            "adsAccounts",
            "a2",
            fields(json!({ "User": "users/admin", "Is Connected": false })),
        );

        let docs = store
            .query(
                "adsAccounts",
                &[
                    Filter::reference("User", &DocRef::user("admin")),
                    Filter::eq("Is Connected", true),
                ],
            )
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a1");
        assert_eq!(store.query_count("adsAccounts"), 1);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryStore::new();
        store.insert("users", "u1", fields(json!({ "Name": "A", "email": "a@x.io" })));

        store
            .update("users", "u1", fields(json!({ "Name": "B" })))
            .await
            .unwrap();

        let doc = store.fields("users", "u1").unwrap();
        assert_eq!(doc["Name"], "B");
        assert_eq!(doc["email"], "a@x.io");

        let missing = store.update("users", "nope", Fields::new()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_budget() {
        let store = InMemoryStore::new();
        for id in ["a", "b", "c"] {
            store.insert("alerts", id, Fields::new());
        }
        store.fail_deletes_after(2);

        assert!(store.delete("alerts", "a").await.is_ok());
        assert!(store.delete("alerts", "b").await.is_ok());
        assert!(store.delete("alerts", "c").await.is_err());
        assert_eq!(store.count("alerts"), 1);

        store.clear_faults();
        assert!(store.delete("alerts", "c").await.is_ok());
        assert_eq!(store.count("alerts"), 0);
    }
}
