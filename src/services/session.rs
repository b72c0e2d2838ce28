// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user session context.
//!
//! A [`Session`] owns everything cached for one signed-in user and
//! coordinates operations that touch more than one cache. Sessions live in
//! a [`SessionRegistry`] keyed by user id; each is behind its own async
//! mutex, so operations on one session run one at a time while different
//! sessions proceed independently.

use crate::db::DocRef;
use crate::error::AppError;
use crate::models::{Invitation, User, UserRole};
use crate::services::lifecycle::{self, DeletionReport, ProvisionOutcome, ProvisionRequest};
use crate::services::selection::SelectionStore;
use crate::services::settings::{InviteRequest, SettingsStore, UserUpdate, UserUpdateOutcome};
use crate::services::Backends;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Session {
    backends: Backends,
    user: User,
    pub settings: SettingsStore,
    pub selection: SelectionStore,
}

impl Session {
    /// Open a session for an existing user.
    pub async fn open(backends: Backends, user_id: &str) -> Result<Self, AppError> {
        let user = backends
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        Ok(Self {
            settings: SettingsStore::new(backends.clone()),
            selection: SelectionStore::new(backends.repo.clone()),
            backends,
            user,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn company_admin(&self) -> DocRef {
        self.user.company_admin_ref()
    }

    /// Re-read the session user so checks see role and company changes made
    /// by other sessions.
    async fn reload_user(&mut self) -> Result<(), AppError> {
        self.user = self
            .backends
            .repo
            .get_user(&self.user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", self.user.id)))?;
        Ok(())
    }

    /// Admin check against the stored user record.
    async fn require_admin(&mut self, action: &str) -> Result<(), AppError> {
        self.reload_user().await?;
        match self.user.role {
            Some(UserRole::Admin) => Ok(()),
            _ => Err(AppError::Forbidden(format!("Only admins can {}", action))),
        }
    }

    /// Reload the visible ads accounts of the session user.
    pub async fn refresh_selection(&mut self) -> Result<(), AppError> {
        let company_admin = self.company_admin();
        let user = self.user.reference();
        self.selection
            .fetch_user_ads_accounts(&company_admin, &user)
            .await?;
        Ok(())
    }

    /// Update a company user. Changing one's own profile also reloads the
    /// session user, and their selection when membership changed.
    pub async fn update_user(
        &mut self,
        user_id: &str,
        update: UserUpdate,
        notify: bool,
        target_ads_ids: Option<HashSet<String>>,
    ) -> Result<UserUpdateOutcome, AppError> {
        if user_id != self.user.id {
            self.require_admin("update other users").await?;
            self.ensure_same_company(user_id).await?;
        }
        if update.role.is_some() || target_ads_ids.is_some() {
            self.require_admin("change roles or account access").await?;
        }

        let acting = self.user.clone();
        let outcome = self
            .settings
            .update_user(user_id, update, notify, &acting, target_ads_ids)
            .await?;

        if user_id == self.user.id {
            if let Some(user) = self.backends.repo.get_user(user_id).await? {
                self.user = user;
            }
            if outcome.membership_changes > 0 {
                self.refresh_selection().await?;
            }
        }
        Ok(outcome)
    }

    async fn ensure_same_company(&self, user_id: &str) -> Result<(), AppError> {
        let target = self
            .backends
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        if target.company_admin_ref() != self.company_admin() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    pub async fn invite_user(&mut self, request: InviteRequest) -> Result<Invitation, AppError> {
        self.require_admin("invite users").await?;
        let acting = self.user.clone();
        self.settings.invite_user(request, &acting).await
    }

    /// Provision billing for the session user's company.
    pub async fn provision_subscription(
        &mut self,
        request: ProvisionRequest,
    ) -> Result<ProvisionOutcome, AppError> {
        self.require_admin("manage billing").await?;
        let company_admin = self.company_admin();
        let requested = DocRef::parse_or_id(&request.company_admin, crate::db::collections::USERS);
        if requested.as_ref() != Some(&company_admin) {
            return Err(AppError::Forbidden(
                "Billing can only be managed for your own company".to_string(),
            ));
        }

        let outcome = lifecycle::provision_subscription(&self.backends, request).await;
        // Whatever got written before a failure should show on the next read
        self.settings.invalidate_billing();
        let outcome = outcome?;

        self.settings.set_invoices(outcome.invoices.clone());
        self.settings.refresh_subscription(&company_admin).await?;
        Ok(outcome)
    }

    /// Delete the session user's company and sign out all of its users.
    pub async fn delete_company(
        &mut self,
        registry: &SessionRegistry,
    ) -> Result<DeletionReport, AppError> {
        self.require_admin("delete the company").await?;
        let company_admin = self.company_admin();
        lifecycle::delete_company(&self.backends, &company_admin, |user_ids| {
            registry.logout(user_ids)
        })
        .await
    }
}

/// Open sessions keyed by user id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's session, opening one if needed.
    pub async fn get_or_open(
        &self,
        backends: &Backends,
        user_id: &str,
    ) -> Result<Arc<Mutex<Session>>, AppError> {
        let existing = self
            .sessions
            .get(user_id)
            .map(|entry| Arc::clone(entry.value()));
        if let Some(session) = existing {
            return Ok(session);
        }

        let session = Session::open(backends.clone(), user_id).await?;
        tracing::debug!(user_id, "Opened session");

        // A concurrent request may have opened one meanwhile; keep the first
        Ok(self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone())
    }

    /// Drop the sessions of the given users.
    pub fn logout(&self, user_ids: &[String]) {
        for user_id in user_ids {
            if self.sessions.remove(user_id).is_some() {
                tracing::info!(user_id = %user_id, "Session closed");
            }
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.sessions.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
