// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ads-account membership reconciliation.
//!
//! Access to an ads account is granted solely by the user's presence in its
//! `Selected Users` array. Planning is pure so it can be tested and
//! benchmarked without a store.

use crate::db::{DocRef, Repository};
use crate::error::AppError;
use crate::models::{AdsAccount, UserRole};
use std::collections::HashSet;

/// A pending change to one account's member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub account_id: String,
    /// Full new `Selected Users` array
    pub members: Vec<DocRef>,
    /// True when the user is added, false when removed
    pub added: bool,
}

/// Compute the member-list changes needed for `user` across `accounts`.
///
/// Admins are added to every account and never removed. Managers end up in
/// exactly the accounts listed in `targets`. Accounts that already match
/// produce no change.
pub fn plan_membership(
    accounts: &[AdsAccount],
    user: &DocRef,
    role: UserRole,
    targets: &HashSet<String>,
) -> Vec<MembershipChange> {
    accounts
        .iter()
        .filter_map(|account| {
            let present = account.has_member(user);
            let wanted = match role {
                UserRole::Admin => true,
                UserRole::Manager => targets.contains(&account.id),
            };

            match (present, wanted) {
                (false, true) => {
                    let mut members = account.selected_users.clone();
                    members.push(user.clone());
                    Some(MembershipChange {
                        account_id: account.id.clone(),
                        members,
                        added: true,
                    })
                }
                (true, false) if role == UserRole::Manager => Some(MembershipChange {
                    account_id: account.id.clone(),
                    members: account
                        .selected_users
                        .iter()
                        .filter(|m| *m != user)
                        .cloned()
                        .collect(),
                    added: false,
                }),
                _ => None,
            }
        })
        .collect()
}

/// Reconcile `user`'s membership over the company's connected accounts.
///
/// Changes are written one account at a time; a failure leaves earlier
/// accounts updated.
pub async fn reconcile_membership(
    repo: &Repository,
    company_admin: &DocRef,
    user: &DocRef,
    role: UserRole,
    targets: &HashSet<String>,
) -> Result<Vec<MembershipChange>, AppError> {
    let accounts = repo.connected_ads_accounts(company_admin).await?;
    let changes = plan_membership(&accounts, user, role, targets);

    for change in &changes {
        repo.set_selected_users(&change.account_id, &change.members)
            .await?;
        tracing::debug!(
            account_id = %change.account_id,
            user = %user,
            added = change.added,
            "Updated ads account membership"
        );
    }

    tracing::info!(
        user = %user,
        role = %role,
        changed = changes.len(),
        "Reconciled ads account membership"
    );
    Ok(changes)
}
