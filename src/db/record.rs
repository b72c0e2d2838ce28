// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document, reference and filter types shared by every record store.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

/// Key under which a document's id is exposed to typed models.
pub const ID_FIELD: &str = "_id";

/// Normalized reference to a document: collection plus id.
///
/// Stored references come in several spellings (`users/abc`, `/users/abc`,
/// `projects/p/databases/(default)/documents/users/abc`). All of them parse
/// to the same value, and comparisons are plain key equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocRef {
    collection: String,
    id: String,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Reference into the `users` collection.
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(super::collections::USERS, id)
    }

    /// Parse a stored reference path. Requires at least `collection/id`.
    pub fn parse(raw: &str) -> Option<Self> {
        let path = raw
            .split_once("/documents/")
            .map_or(raw, |(_, rest)| rest)
            .trim_matches('/');

        let mut segments = path.rsplit('/');
        let id = segments.next().filter(|s| !s.is_empty())?;
        let collection = segments.next().filter(|s| !s.is_empty())?;

        Some(Self::new(collection, id))
    }

    /// Parse a reference, treating a bare id as a document in `default_collection`.
    pub fn parse_or_id(raw: &str, default_collection: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.contains('/') {
            Self::parse(trimmed)
        } else {
            Some(Self::new(default_collection, trimmed))
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Short path form, `collection/id`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl fmt::Display for DocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl Serialize for DocRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path())
    }
}

impl<'de> Deserialize<'de> for DocRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DocRef::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid document reference: {raw}")))
    }
}

impl From<&DocRef> for Value {
    fn from(reference: &DocRef) -> Self {
        Value::String(reference.path())
    }
}

/// A document read from a record store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decode into a typed model. The id is exposed as [`ID_FIELD`].
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T, AppError> {
        let mut fields = self.fields.clone();
        fields.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::decode(collection, &self.id, e))
    }
}

/// Deserialize a possibly-null field, mapping null to the type's default.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Interpret a stored value as a document reference.
pub fn value_as_reference(value: &Value) -> Option<DocRef> {
    value.as_str().and_then(DocRef::parse)
}

/// Encode a typed model into a field map, dropping the id field.
pub fn encode<T: Serialize>(model: &T) -> Result<Fields, AppError> {
    match serde_json::to_value(model)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode document: {}", e)))?
    {
        Value::Object(mut fields) => {
            fields.remove(ID_FIELD);
            Ok(fields)
        }
        other => Err(AppError::Internal(anyhow::anyhow!(
            "Document must encode to an object, got {}",
            other
        ))),
    }
}

/// Query predicate. Predicates in one query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals a scalar value.
    Eq { field: String, value: Value },
    /// Field holds a reference to the given document.
    RefEq { field: String, reference: DocRef },
    /// Field is an array containing a reference to the given document.
    ArrayContainsRef { field: String, reference: DocRef },
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn reference(field: &str, reference: &DocRef) -> Self {
        Filter::RefEq {
            field: field.to_string(),
            reference: reference.clone(),
        }
    }

    pub fn contains_ref(field: &str, reference: &DocRef) -> Self {
        Filter::ArrayContainsRef {
            field: field.to_string(),
            reference: reference.clone(),
        }
    }

    /// Evaluate the predicate against a field map.
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::Eq { field, value } => fields.get(field) == Some(value),
            Filter::RefEq { field, reference } => fields
                .get(field)
                .and_then(value_as_reference)
                .is_some_and(|r| &r == reference),
            Filter::ArrayContainsRef { field, reference } => match fields.get(field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(value_as_reference)
                    .any(|r| &r == reference),
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reference_spellings() {
        let expected = DocRef::user("abc");
        assert_eq!(DocRef::parse("users/abc"), Some(expected.clone()));
        assert_eq!(DocRef::parse("/users/abc"), Some(expected.clone()));
        assert_eq!(
            DocRef::parse("projects/p/databases/(default)/documents/users/abc"),
            Some(expected.clone())
        );
        assert_eq!(DocRef::parse("abc"), None);
        assert_eq!(DocRef::parse_or_id("abc", "users"), Some(expected));
    }

    #[test]
    fn test_reference_equality_is_not_substring() {
        let fields: Fields = serde_json::from_value(json!({
            "Selected Users": ["users/abc123"]
        }))
        .unwrap();

        let short = Filter::contains_ref("Selected Users", &DocRef::user("abc"));
        let exact = Filter::contains_ref("Selected Users", &DocRef::user("abc123"));

        assert!(!short.matches(&fields));
        assert!(exact.matches(&fields));
    }

    #[test]
    fn test_decode_exposes_id() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(rename = "_id")]
            id: String,
            #[serde(rename = "Name")]
            name: String,
        }

        let doc = Document::new(
            "u1",
            serde_json::from_value(json!({ "Name": "Ada" })).unwrap(),
        );
        let row: Row = doc.decode("users").unwrap();
        assert_eq!(row.id, "u1");
        assert_eq!(row.name, "Ada");
    }
}
