//! User model for storage and API.

use crate::db::record::null_as_default;
use crate::db::DocRef;
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Access level of a user within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum UserRole {
    Admin,
    Manager,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => f.write_str("Admin"),
            UserRole::Manager => f.write_str("Manager"),
        }
    }
}

/// User profile stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document id
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    pub email: String,
    #[serde(rename = "Name", default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Missing on half-provisioned accounts
    #[serde(rename = "User Type", default)]
    pub role: Option<UserRole>,
    /// Free-text access summary shown in the users table
    #[serde(rename = "User Access", default)]
    pub access: Option<String>,
    #[serde(rename = "Avatar", default)]
    pub avatar: Option<String>,
    #[serde(rename = "Is Google Sign Up", default, deserialize_with = "null_as_default")]
    pub is_google_sign_up: bool,
    /// Opt-in for profile-change notifications
    #[serde(rename = "Notify User", default, deserialize_with = "null_as_default")]
    pub notify: bool,
    /// Company admin this user belongs to (self-reference for the admin)
    #[serde(rename = "Company Admin", default)]
    pub company_admin: Option<DocRef>,
}

impl User {
    pub fn reference(&self) -> DocRef {
        DocRef::user(&self.id)
    }

    /// The company-admin anchor; an admin without the field anchors itself.
    pub fn company_admin_ref(&self) -> DocRef {
        self.company_admin.clone().unwrap_or_else(|| self.reference())
    }
}

/// Flat row for the users table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<UserRole>,
    pub access: Option<String>,
    pub avatar: Option<String>,
    pub is_google_sign_up: bool,
}

impl From<User> for UserRow {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            access: user.access,
            avatar: user.avatar,
            is_google_sign_up: user.is_google_sign_up,
        }
    }
}
