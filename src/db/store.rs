// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Record store abstraction.
//!
//! Only equality and array-containment predicates are ever issued; no range
//! or sort queries.

use crate::db::record::{Document, Fields, Filter};
use crate::error::AppError;
use async_trait::async_trait;

/// Collection-oriented document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All documents in `collection` matching every filter.
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, AppError>;

    /// A single document by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError>;

    /// Create a document with a generated id and return that id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, AppError>;

    /// Partial update: only the given fields change. Fails if the document is missing.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;
}
