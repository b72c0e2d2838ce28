// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Connected advertising account model.

use crate::db::record::{self, null_as_default, Fields};
use crate::db::DocRef;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Ads account stored in the `adsAccounts` collection.
///
/// Fields this service does not interpret are kept in `extra` and survive
/// local patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsAccount {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    /// Platform account number (numeric or string)
    #[serde(rename = "Id", default)]
    pub external_id: Option<Value>,
    #[serde(rename = "Account Name Editable", default)]
    pub name_editable: Option<String>,
    #[serde(rename = "Account Name Original", default)]
    pub name_original: Option<String>,
    #[serde(rename = "Is Connected", default, deserialize_with = "null_as_default")]
    pub is_connected: bool,
    #[serde(rename = "Is Selected", default, deserialize_with = "null_as_default")]
    pub is_selected: bool,
    #[serde(rename = "Monthly Budget", default)]
    pub monthly_budget: Option<f64>,
    #[serde(rename = "Daily Budget", default)]
    pub daily_budget: Option<f64>,
    #[serde(rename = "Currency Symbol", default)]
    pub currency_symbol: Option<String>,
    #[serde(rename = "Platform", default)]
    pub platform: Option<String>,
    /// Owning company admin
    #[serde(rename = "User", default)]
    pub company_admin: Option<DocRef>,
    /// Users allowed to see this account's data
    #[serde(rename = "Selected Users", default, deserialize_with = "null_as_default")]
    pub selected_users: Vec<DocRef>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl AdsAccount {
    /// Display name: editable name, then original name, then the formatted account number.
    pub fn display_name(&self) -> String {
        non_empty(self.name_editable.as_deref())
            .or_else(|| non_empty(self.name_original.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.external_id
                    .as_ref()
                    .map(format_account_number)
                    .unwrap_or_default()
            })
    }

    pub fn has_member(&self, user: &DocRef) -> bool {
        self.selected_users.contains(user)
    }

    /// Apply a field patch locally, returning the merged account.
    pub fn merged(&self, patch: &Fields) -> Result<AdsAccount, AppError> {
        let mut fields = record::encode(self)?;
        fields.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
        fields.insert(record::ID_FIELD.to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| AppError::BadRequest(format!("Invalid ads account patch: {}", e)))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Format a platform account number; ten digits render as `123-456-7890`.
pub fn format_account_number(raw: &Value) -> String {
    let digits = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return String::new(),
    };

    if digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits
    }
}

/// Flat row for the settings screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdsAccountRow {
    pub id: String,
    pub name: String,
    /// Ids of users with access
    pub selected_users: Vec<String>,
}

impl From<&AdsAccount> for AdsAccountRow {
    fn from(account: &AdsAccount) -> Self {
        Self {
            id: account.id.clone(),
            name: account.display_name(),
            selected_users: account
                .selected_users
                .iter()
                .map(|r| r.id().to_string())
                .collect(),
        }
    }
}
