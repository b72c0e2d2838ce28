// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Settings synchronization store.
//!
//! Per-session cache of the company's settings data. Each slice remembers
//! the scope it was loaded for: a `fetch_*` call for the same scope returns
//! the cached data without touching the record store, while `refresh_*`
//! always queries. Mutations write through to the store and then refresh
//! the affected slice.
//!
//! Multi-step mutations run their steps in order and stop at the first
//! failure. Completed steps are not rolled back.

use crate::db::{collections, DocRef, Fields};
use crate::error::AppError;
use crate::models::{
    AdsAccountRow, AlertSettings, AlertSettingsPatch, Invitation, Invoice, PaymentMethod,
    StripeCompany, Subscription, User, UserRole, UserRow,
};
use crate::services::blob::safe_file_name;
use crate::services::email::EmailMessage;
use crate::services::membership::reconcile_membership;
use crate::services::Backends;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::future::Future;

/// Cached data plus the scope key it was loaded for.
#[derive(Debug, Default)]
pub struct Slice<T> {
    data: T,
    loaded_for: Option<String>,
}

impl<T> Slice<T> {
    pub fn is_loaded_for(&self, scope: &str) -> bool {
        self.loaded_for.as_deref() == Some(scope)
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    fn fill(&mut self, scope: String, data: T) {
        self.data = data;
        self.loaded_for = Some(scope);
    }

    fn invalidate(&mut self) {
        self.loaded_for = None;
    }
}

/// A new avatar image supplied with a profile update.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Field changes for a user profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub notify_user: Option<bool>,
    pub avatar: Option<AvatarUpload>,
}

/// What `update_user` changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdateOutcome {
    pub avatar_url: Option<String>,
    /// Number of ads accounts whose member list changed
    pub membership_changes: usize,
}

/// Request to invite a new user into the acting user's company.
#[derive(Debug, Clone)]
pub struct InviteRequest {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Ignored for admins, who get every connected account
    pub ads_account_ids: Vec<String>,
}

/// Loading/error flags shared by all slices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStatus {
    pub loading: bool,
    pub error: Option<String>,
}

pub struct SettingsStore {
    backends: Backends,
    users: Slice<Vec<UserRow>>,
    ads_accounts: Slice<Vec<AdsAccountRow>>,
    alert_settings: Slice<Option<AlertSettings>>,
    subscription: Slice<Option<Subscription>>,
    payment_method: Slice<Option<PaymentMethod>>,
    stripe_company: Slice<Option<StripeCompany>>,
    invoices: Vec<Invoice>,
    status: StoreStatus,
}

impl SettingsStore {
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            users: Slice::default(),
            ads_accounts: Slice::default(),
            alert_settings: Slice::default(),
            subscription: Slice::default(),
            payment_method: Slice::default(),
            stripe_company: Slice::default(),
            invoices: Vec::new(),
            status: StoreStatus::default(),
        }
    }

    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    pub fn users(&self) -> &[UserRow] {
        self.users.data().as_slice()
    }

    pub fn ads_accounts(&self) -> &[AdsAccountRow] {
        self.ads_accounts.data().as_slice()
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    /// Replace the cached invoice list (filled after provisioning).
    pub fn set_invoices(&mut self, invoices: Vec<Invoice>) {
        self.invoices = invoices;
    }

    /// Forget the billing slices so the next fetch reloads them.
    pub fn invalidate_billing(&mut self) {
        self.subscription.invalidate();
        self.payment_method.invalidate();
        self.stripe_company.invalidate();
    }

    /// Run a remote operation with loading/error bookkeeping.
    async fn track<T>(&mut self, op: impl Future<Output = Result<T, AppError>>) -> Result<T, AppError> {
        self.status.loading = true;
        self.status.error = None;

        let result = op.await;

        self.status.loading = false;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Settings operation failed");
            self.status.error = Some(e.to_string());
        }
        result
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn fetch_users(&mut self, company_admin: &DocRef) -> Result<&[UserRow], AppError> {
        if self.users.is_loaded_for(&company_admin.path()) {
            return Ok(self.users.data().as_slice());
        }
        self.refresh_users(company_admin).await
    }

    pub async fn refresh_users(&mut self, company_admin: &DocRef) -> Result<&[UserRow], AppError> {
        let repo = self.backends.repo.clone();
        let scope = company_admin.clone();
        let users = self
            .track(async move { repo.users_for_company(&scope).await })
            .await?;

        tracing::debug!(company_admin = %company_admin, count = users.len(), "Loaded users");
        self.users.fill(
            company_admin.path(),
            users.into_iter().map(UserRow::from).collect(),
        );
        Ok(self.users.data().as_slice())
    }

    // ─── Ads Accounts ────────────────────────────────────────────

    pub async fn fetch_ads_accounts(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<&[AdsAccountRow], AppError> {
        if self.ads_accounts.is_loaded_for(&company_admin.path()) {
            return Ok(self.ads_accounts.data().as_slice());
        }
        self.refresh_ads_accounts(company_admin).await
    }

    pub async fn refresh_ads_accounts(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<&[AdsAccountRow], AppError> {
        let repo = self.backends.repo.clone();
        let scope = company_admin.clone();
        let accounts = self
            .track(async move { repo.connected_ads_accounts(&scope).await })
            .await?;

        self.ads_accounts.fill(
            company_admin.path(),
            accounts.iter().map(AdsAccountRow::from).collect(),
        );
        Ok(self.ads_accounts.data().as_slice())
    }

    // ─── Alert Settings ──────────────────────────────────────────

    pub async fn fetch_alert_settings(
        &mut self,
        user: &DocRef,
    ) -> Result<Option<&AlertSettings>, AppError> {
        if self.alert_settings.is_loaded_for(&user.path()) {
            return Ok(self.alert_settings.data().as_ref());
        }
        self.refresh_alert_settings(user).await
    }

    pub async fn refresh_alert_settings(
        &mut self,
        user: &DocRef,
    ) -> Result<Option<&AlertSettings>, AppError> {
        let repo = self.backends.repo.clone();
        let scope = user.clone();
        let settings = self
            .track(async move { repo.alert_settings_for_user(&scope).await })
            .await?;

        self.alert_settings.fill(user.path(), settings);
        Ok(self.alert_settings.data().as_ref())
    }

    /// Apply a partial update to the user's alert settings, creating the
    /// document from defaults when the user has none yet.
    pub async fn update_alert_settings(
        &mut self,
        user: &DocRef,
        patch: AlertSettingsPatch,
    ) -> Result<Option<&AlertSettings>, AppError> {
        let repo = self.backends.repo.clone();
        let owner = user.clone();
        self.track(async move {
            match repo.alert_settings_for_user(&owner).await? {
                Some(existing) => repo.update_alert_settings(&existing.id, &patch).await,
                None => {
                    let mut settings = AlertSettings::defaults_for(owner.clone());
                    settings.apply(&patch);
                    let id = repo.create_alert_settings(&settings).await?;
                    tracing::info!(user = %owner, settings_id = %id, "Created alert settings");
                    Ok(())
                }
            }
        })
        .await?;

        self.refresh_alert_settings(user).await
    }

    // ─── Billing ─────────────────────────────────────────────────

    pub async fn fetch_subscription(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<Option<&Subscription>, AppError> {
        if self.subscription.is_loaded_for(&company_admin.path()) {
            return Ok(self.subscription.data().as_ref());
        }
        self.refresh_subscription(company_admin).await
    }

    pub async fn refresh_subscription(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<Option<&Subscription>, AppError> {
        let repo = self.backends.repo.clone();
        let scope = company_admin.clone();
        let subscription = self
            .track(async move { repo.subscription_for(&scope).await })
            .await?;

        self.subscription.fill(company_admin.path(), subscription);
        Ok(self.subscription.data().as_ref())
    }

    pub async fn fetch_payment_method(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<Option<&PaymentMethod>, AppError> {
        if self.payment_method.is_loaded_for(&company_admin.path()) {
            return Ok(self.payment_method.data().as_ref());
        }
        self.refresh_payment_method(company_admin).await
    }

    pub async fn refresh_payment_method(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<Option<&PaymentMethod>, AppError> {
        let repo = self.backends.repo.clone();
        let scope = company_admin.clone();
        let method = self
            .track(async move { repo.payment_method_for(&scope).await })
            .await?;

        self.payment_method.fill(company_admin.path(), method);
        Ok(self.payment_method.data().as_ref())
    }

    pub async fn fetch_stripe_company(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<Option<&StripeCompany>, AppError> {
        if self.stripe_company.is_loaded_for(&company_admin.path()) {
            return Ok(self.stripe_company.data().as_ref());
        }
        self.refresh_stripe_company(company_admin).await
    }

    pub async fn refresh_stripe_company(
        &mut self,
        company_admin: &DocRef,
    ) -> Result<Option<&StripeCompany>, AppError> {
        let repo = self.backends.repo.clone();
        let scope = company_admin.clone();
        let company = self
            .track(async move { repo.stripe_company_for(&scope).await })
            .await?;

        self.stripe_company.fill(company_admin.path(), company);
        Ok(self.stripe_company.data().as_ref())
    }

    // ─── User Management ─────────────────────────────────────────

    /// Update a user's profile, then optionally their ads-account access and
    /// a notification email. The users slice is refreshed afterwards.
    ///
    /// Membership is reconciled only when both a role and a target set are
    /// given.
    pub async fn update_user(
        &mut self,
        user_id: &str,
        update: UserUpdate,
        notify: bool,
        acting: &User,
        target_ads_ids: Option<HashSet<String>>,
    ) -> Result<UserUpdateOutcome, AppError> {
        let backends = self.backends.clone();
        let company_admin = acting.company_admin_ref();
        let user_id_owned = user_id.to_string();

        let outcome = self
            .track(async move {
                apply_user_update(
                    &backends,
                    &user_id_owned,
                    update,
                    notify,
                    &company_admin,
                    target_ads_ids,
                )
                .await
            })
            .await?;

        self.refresh_users(&acting.company_admin_ref()).await?;
        Ok(outcome)
    }

    /// Invite a new user into the acting user's company.
    ///
    /// Fails with a conflict, and writes nothing, when the email is already
    /// registered.
    pub async fn invite_user(
        &mut self,
        request: InviteRequest,
        acting: &User,
    ) -> Result<Invitation, AppError> {
        let backends = self.backends.clone();
        let acting = acting.clone();
        self.track(async move { send_invitation(&backends, request, &acting).await })
            .await
    }
}

async fn apply_user_update(
    backends: &Backends,
    user_id: &str,
    update: UserUpdate,
    notify: bool,
    company_admin: &DocRef,
    target_ads_ids: Option<HashSet<String>>,
) -> Result<UserUpdateOutcome, AppError> {
    let repo = &backends.repo;
    let user = repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    let mut outcome = UserUpdateOutcome::default();

    // 1. Avatar
    if let Some(upload) = update.avatar {
        let object = format!(
            "avatars/{}/{}-{}",
            user_id,
            chrono::Utc::now().timestamp_millis(),
            safe_file_name(&upload.file_name)
        );
        let url = backends
            .blobs
            .upload(&object, &upload.content_type, upload.bytes)
            .await?;

        if let Some(previous) = user.avatar.as_deref().filter(|p| !p.is_empty() && *p != url) {
            if let Err(e) = backends.blobs.delete_by_url(previous).await {
                tracing::warn!(user_id, error = %e, "Failed to delete previous avatar");
            }
        }
        outcome.avatar_url = Some(url);
    }

    // 2. Profile fields
    let mut changes = Fields::new();
    if let Some(name) = &update.name {
        changes.insert("Name".to_string(), Value::from(name.trim()));
    }
    if let Some(role) = update.role {
        changes.insert("User Type".to_string(), Value::from(role.to_string()));
    }
    if let Some(notify_user) = update.notify_user {
        changes.insert("Notify User".to_string(), Value::from(notify_user));
    }
    if let Some(url) = &outcome.avatar_url {
        changes.insert("Avatar".to_string(), Value::from(url.as_str()));
    }
    if !changes.is_empty() {
        repo.update_user_fields(user_id, changes).await?;
    }

    // 3. Ads-account access
    if let (Some(role), Some(targets)) = (update.role, target_ads_ids.as_ref()) {
        let changes =
            reconcile_membership(repo, company_admin, &user.reference(), role, targets).await?;
        outcome.membership_changes = changes.len();
    }

    // 4. Notification
    if notify {
        let mut variables = Map::new();
        variables.insert(
            "name".to_string(),
            Value::from(update.name.as_deref().unwrap_or(&user.name)),
        );
        if let Some(role) = update.role.or(user.role) {
            variables.insert("role".to_string(), Value::from(role.to_string()));
        }
        backends
            .mailer
            .send(&EmailMessage {
                to: user.email.clone(),
                template_id: backends.config.email_template_profile_update.clone(),
                name: update.name.clone().unwrap_or_else(|| user.name.clone()),
                variables,
            })
            .await?;
    }

    tracing::info!(user_id, "User updated");
    Ok(outcome)
}

/// Resolve requested ads accounts, which must all belong to the company.
fn company_account_refs(
    requested: &[String],
    company_accounts: &HashSet<String>,
) -> Result<Vec<DocRef>, AppError> {
    let mut refs: Vec<DocRef> = Vec::with_capacity(requested.len());
    for raw in requested {
        let reference = DocRef::parse_or_id(raw, collections::ADS_ACCOUNTS)
            .filter(|r| {
                r.collection() == collections::ADS_ACCOUNTS && company_accounts.contains(r.id())
            })
            .ok_or_else(|| AppError::BadRequest(format!("Unknown ads account: {}", raw)))?;
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }
    Ok(refs)
}

async fn send_invitation(
    backends: &Backends,
    request: InviteRequest,
    acting: &User,
) -> Result<Invitation, AppError> {
    let repo = &backends.repo;
    let email = request.email.trim().to_lowercase();

    if !repo.users_by_email(&email).await?.is_empty() {
        return Err(AppError::Conflict(
            "A user with this email already exists".to_string(),
        ));
    }

    let company_admin = acting.company_admin_ref();
    let ads_accounts = match request.role {
        UserRole::Admin => repo
            .connected_ads_accounts(&company_admin)
            .await?
            .into_iter()
            .map(|a| DocRef::new(collections::ADS_ACCOUNTS, a.id))
            .collect(),
        UserRole::Manager => {
            let company_accounts: HashSet<String> = repo
                .company_ads_accounts(&company_admin)
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect();
            company_account_refs(&request.ads_account_ids, &company_accounts)?
        }
    };

    let mut invitation = Invitation::pending(
        &email,
        &request.name,
        request.role,
        ads_accounts,
        acting.reference(),
        company_admin,
        chrono::Utc::now(),
    );
    invitation.id = repo.create_invitation(&invitation).await?;

    let link = format!(
        "{}/invite/{}",
        backends.config.app_base_url.trim_end_matches('/'),
        invitation.id
    );
    let mut variables = Map::new();
    variables.insert("link".to_string(), Value::from(link));
    variables.insert("invitedBy".to_string(), Value::from(acting.name.as_str()));
    variables.insert("role".to_string(), Value::from(request.role.to_string()));

    backends
        .mailer
        .send(&EmailMessage {
            to: invitation.email.clone(),
            template_id: backends.config.email_template_invitation.clone(),
            name: invitation.name.clone(),
            variables,
        })
        .await?;

    tracing::info!(
        invitation_id = %invitation.id,
        invited_by = %acting.id,
        role = %request.role,
        accounts = invitation.ads_accounts.len(),
        "Invitation sent"
    );
    Ok(invitation)
}
