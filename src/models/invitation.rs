// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pending user invitation.

use crate::db::DocRef;
use crate::models::UserRole;
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an invitation stays valid.
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Status of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
}

/// Invitation stored in the `invitations` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    pub email: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Role")]
    pub role: UserRole,
    /// Ads accounts the invitee will be granted
    #[serde(rename = "Ads Accounts", default)]
    pub ads_accounts: Vec<DocRef>,
    #[serde(rename = "Invited By")]
    pub invited_by: DocRef,
    #[serde(rename = "Company Admin")]
    pub company_admin: DocRef,
    /// RFC3339
    #[serde(rename = "Created At")]
    pub created_at: String,
    /// RFC3339, always `created_at` + 7 days
    #[serde(rename = "Expires At")]
    pub expires_at: String,
    #[serde(rename = "Status")]
    pub status: InvitationStatus,
}

impl Invitation {
    /// Build a pending invitation created at `now`.
    pub fn pending(
        email: &str,
        name: &str,
        role: UserRole,
        ads_accounts: Vec<DocRef>,
        invited_by: DocRef,
        company_admin: DocRef,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            email: email.trim().to_lowercase(),
            name: name.trim().to_string(),
            role,
            ads_accounts,
            invited_by,
            company_admin,
            created_at: format_utc_rfc3339(now),
            expires_at: format_utc_rfc3339(expiry_for(now)),
            status: InvitationStatus::Pending,
        }
    }

    /// Whether the invitation can no longer be accepted at `now`.
    /// An unreadable expiry counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == InvitationStatus::Expired
            || parse_utc_rfc3339(&self.expires_at).is_none_or(|expiry| now >= expiry)
    }
}

/// Expiry of an invitation created at `created`.
pub fn expiry_for(created: DateTime<Utc>) -> DateTime<Utc> {
    created + Duration::days(INVITATION_TTL_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiry_is_seven_days() {
        let created = Utc.with_ymd_and_hms(2026, 2, 25, 23, 30, 0).unwrap();
        let invitation = Invitation::pending(
            " New.User@Example.com ",
            "New User",
            UserRole::Manager,
            vec![],
            DocRef::user("admin"),
            DocRef::user("admin"),
            created,
        );

        assert_eq!(invitation.email, "new.user@example.com");
        assert_eq!(invitation.created_at, "2026-02-25T23:30:00Z");
        assert_eq!(invitation.expires_at, "2026-03-04T23:30:00Z");
        assert_eq!(invitation.status, InvitationStatus::Pending);

        assert!(!invitation.is_expired(created + Duration::days(6)));
        assert!(invitation.is_expired(created + Duration::days(7)));
    }
}
