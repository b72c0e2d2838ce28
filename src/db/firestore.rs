// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore implementation of [`RecordStore`].
//!
//! Documents are exchanged as JSON field maps. Fields listed in
//! [`fields::REFERENCE_FIELDS`] are written as native Firestore references
//! so the data stays queryable by the web application; on read, references
//! come back as resource-name strings and are normalized by [`DocRef`].

use crate::db::fields;
use crate::db::record::{DocRef, Document, Fields, Filter};
use crate::db::store::RecordStore;
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field Firestore injects with the document id when deserializing.
const FIRESTORE_ID_FIELD: &str = "_firestore_id";
/// Metadata fields Firestore injects alongside the id.
const FIRESTORE_META_FIELDS: &[&str] = &[
    "_firestore_full_id",
    "_firestore_created",
    "_firestore_updated",
];

/// Firestore record store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
    documents_root: String,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            documents_root: documents_root(project_id),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            documents_root: documents_root(project_id),
        })
    }

    /// Create an offline store. Every operation returns an error.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            documents_root: documents_root("offline"),
        }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    fn full_reference(&self, reference: &DocRef) -> firestore::FirestoreReference {
        firestore::FirestoreReference(format!("{}/{}", self.documents_root, reference.path()))
    }

    /// Convert a JSON field map into its Firestore wire form.
    fn to_wire(&self, fields: Fields) -> BTreeMap<String, WireValue> {
        fields
            .into_iter()
            .map(|(name, value)| {
                let wire = if fields::REFERENCE_FIELDS.contains(&name.as_str()) {
                    self.reference_value(value)
                } else {
                    WireValue::Plain(value)
                };
                (name, wire)
            })
            .collect()
    }

    fn reference_value(&self, value: Value) -> WireValue {
        match value {
            Value::String(raw) => match DocRef::parse(&raw) {
                Some(r) => WireValue::Reference(self.full_reference(&r)),
                None => WireValue::Plain(Value::String(raw)),
            },
            Value::Array(items) => {
                let refs: Option<Vec<_>> = items
                    .iter()
                    .map(|item| item.as_str().and_then(DocRef::parse))
                    .map(|r| r.map(|r| self.full_reference(&r)))
                    .collect();
                match refs {
                    Some(refs) => WireValue::References(refs),
                    None => WireValue::Plain(Value::Array(items)),
                }
            }
            other => WireValue::Plain(other),
        }
    }
}

/// Firestore root path for documents of a project.
fn documents_root(project_id: &str) -> String {
    format!("projects/{}/databases/(default)/documents", project_id)
}

/// Quote a field path segment containing characters outside `[A-Za-z0-9_]`.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Split a deserialized document into id and fields.
fn into_document(mut fields: Fields) -> Result<Document, AppError> {
    let id = match fields.remove(FIRESTORE_ID_FIELD) {
        Some(Value::String(id)) => id,
        _ => {
            return Err(AppError::Database(
                "Firestore document is missing its id".to_string(),
            ))
        }
    };
    for meta in FIRESTORE_META_FIELDS {
        fields.remove(*meta);
    }
    Ok(Document::new(id, fields))
}

/// Field value as sent to Firestore. The fluent insert and update builders
/// require objects that deserialize as well as serialize.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Reference(firestore::FirestoreReference),
    References(Vec<firestore::FirestoreReference>),
    Plain(Value),
}

#[async_trait]
impl RecordStore for FirestoreStore {
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>, AppError> {
        let filters = filters.to_vec();
        let root = self.documents_root.clone();

        let rows: Vec<Fields> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| {
                q.for_all(filters.iter().map(|f| match f {
                    Filter::Eq { field, value } => q.field(field_path(field)).eq(value.clone()),
                    Filter::RefEq { field, reference } => q.field(field_path(field)).eq(
                        firestore::FirestoreReference(format!("{}/{}", root, reference.path())),
                    ),
                    Filter::ArrayContainsRef { field, reference } => {
                        q.field(field_path(field)).array_contains(firestore::FirestoreReference(
                            format!("{}/{}", root, reference.path()),
                        ))
                    }
                }))
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(into_document).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let row: Option<Fields> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(into_document).transpose()
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        let created: Fields = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .generate_document_id()
            .object(&self.to_wire(fields))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        into_document(created).map(|doc| doc.id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError> {
        if self.get(collection, id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "{}/{} does not exist",
                collection, id
            )));
        }

        let mask: Vec<String> = fields.keys().map(|k| field_path(k)).collect();

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(mask)
            .in_col(collection)
            .document_id(id)
            .object(&self.to_wire(fields))
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_path_quoting() {
        assert_eq!(field_path("email"), "email");
        assert_eq!(field_path("Company Admin"), "`Company Admin`");
        assert_eq!(field_path("Last4"), "Last4");
        assert_eq!(field_path("4th"), "`4th`");
    }

    #[test]
    fn test_into_document_strips_metadata() {
        let fields: Fields = serde_json::from_value(json!({
            "_firestore_id": "u1",
            "_firestore_created": "2026-01-01T00:00:00Z",
            "Name": "Ada"
        }))
        .unwrap();

        let doc = into_document(fields).unwrap();
        assert_eq!(doc.id, "u1");
        assert_eq!(doc.fields.len(), 1);
    }

    /// Bounds the firestore fluent builders put on `.object()`.
    fn assert_firestore_object<T>(_: &T)
    where
        T: Serialize + Sync + Send,
        for<'de> T: Deserialize<'de>,
    {
    }

    #[test]
    fn test_wire_form_is_a_firestore_object() {
        let store = FirestoreStore::new_mock();
        let fields: Fields = serde_json::from_value(json!({
            "User": "users/admin",
            "Currency Symbol": "€"
        }))
        .unwrap();

        let wire = store.to_wire(fields);
        assert_firestore_object(&wire);

        let encoded = serde_json::to_value(&wire).unwrap();
        assert_eq!(encoded["Currency Symbol"], json!("€"));
        let decoded: BTreeMap<String, WireValue> = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn test_reference_fields_become_references() {
        let store = FirestoreStore::new_mock();
        let fields: Fields = serde_json::from_value(json!({
            "User": "users/admin",
            "Selected Users": ["users/a", "users/b"],
            "Name": "users/not-a-reference"
        }))
        .unwrap();

        let wire = store.to_wire(fields);
        assert!(matches!(wire["User"], WireValue::Reference(_)));
        assert!(matches!(wire["Selected Users"], WireValue::References(ref r) if r.len() == 2));
        assert!(matches!(wire["Name"], WireValue::Plain(_)));
    }
}
