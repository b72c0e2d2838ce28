// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, SESSION_COOKIE};
use crate::models::billing::subscription_price_cents;
use crate::models::{AdsAccountRow, AlertSettings, AlertSettingsPatch, Invoice, StripeCompany};
use crate::models::{UserRole, UserRow};
use crate::services::lifecycle::{DeletionReport, ProvisionOutcome, ProvisionRequest};
use crate::services::settings::{AvatarUpload, InviteRequest, UserUpdate};
use crate::services::Session;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Largest accepted avatar image, after base64 decoding.
const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/users", get(get_users))
        .route("/api/users/{id}", patch(update_user))
        .route("/api/invitations", post(invite_user))
        .route("/api/ads-accounts", get(get_ads_accounts))
        .route(
            "/api/alert-settings",
            get(get_alert_settings).patch(update_alert_settings),
        )
        .route("/api/billing", get(get_billing))
        .route("/api/billing/subscribe", post(subscribe))
        .route("/api/company", delete(delete_company))
        .route("/api/selection", get(get_selection).put(put_selection))
        .route(
            "/api/selection/accounts/{id}/currency",
            patch(update_currency),
        )
}

async fn session(state: &AppState, user: &AuthUser) -> Result<Arc<Mutex<Session>>> {
    state
        .sessions
        .get_or_open(&state.backends, &user.user_id)
        .await
}

fn validated<T: Validate>(payload: T) -> Result<T> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(payload)
}

#[derive(Deserialize, Default)]
struct RefreshQuery {
    #[serde(default)]
    refresh: bool,
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserRow,
    /// Id of the company admin this user belongs to
    pub company_admin_id: String,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let session = session(&state, &user).await?;
    let session = session.lock().await;

    Ok(Json(MeResponse {
        user: UserRow::from(session.user().clone()),
        company_admin_id: session.company_admin().id().to_string(),
    }))
}

// ─── Users ───────────────────────────────────────────────────

async fn get_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<Vec<UserRow>>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let company_admin = session.company_admin();

    let users = if query.refresh {
        session.settings.refresh_users(&company_admin).await?
    } else {
        session.settings.fetch_users(&company_admin).await?
    };
    Ok(Json(users.to_vec()))
}

#[derive(Deserialize, Validate)]
pub struct AvatarPayload {
    #[validate(length(min = 1, max = 200))]
    pub file_name: String,
    #[validate(length(min = 1))]
    pub content_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub notify_user: Option<bool>,
    #[validate(nested)]
    pub avatar: Option<AvatarPayload>,
    /// Send the profile-update email
    #[serde(default)]
    pub notify: bool,
    /// Ads accounts the user should have access to (managers)
    pub ads_account_ids: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct UpdateUserResponse {
    pub avatar_url: Option<String>,
    pub membership_changes: usize,
    pub users: Vec<UserRow>,
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdateUserResponse>> {
    let payload = validated(payload)?;

    let avatar = payload
        .avatar
        .map(|a| {
            if !a.content_type.starts_with("image/") {
                return Err(AppError::BadRequest("Avatar must be an image".to_string()));
            }
            let bytes = STANDARD
                .decode(a.data.as_bytes())
                .map_err(|_| AppError::BadRequest("Avatar data is not valid base64".to_string()))?;
            if bytes.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest("Avatar image is too large".to_string()));
            }
            Ok(AvatarUpload {
                file_name: a.file_name,
                content_type: a.content_type,
                bytes,
            })
        })
        .transpose()?;

    let update = UserUpdate {
        name: payload.name,
        role: payload.role,
        notify_user: payload.notify_user,
        avatar,
    };
    let targets: Option<HashSet<String>> = payload
        .ads_account_ids
        .map(|ids| ids.into_iter().collect());

    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let outcome = session
        .update_user(&user_id, update, payload.notify, targets)
        .await?;

    Ok(Json(UpdateUserResponse {
        avatar_url: outcome.avatar_url,
        membership_changes: outcome.membership_changes,
        users: session.settings.users().to_vec(),
    }))
}

#[derive(Deserialize, Validate)]
pub struct InviteUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub role: UserRole,
    #[serde(default)]
    pub ads_account_ids: Vec<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct InvitationResponse {
    pub id: String,
    pub email: String,
    pub expires_at: String,
    pub ads_account_ids: Vec<String>,
}

async fn invite_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<InviteUserRequest>,
) -> Result<Json<InvitationResponse>> {
    let payload = validated(payload)?;

    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let invitation = session
        .invite_user(InviteRequest {
            email: payload.email,
            name: payload.name,
            role: payload.role,
            ads_account_ids: payload.ads_account_ids,
        })
        .await?;

    Ok(Json(InvitationResponse {
        ads_account_ids: invitation
            .ads_accounts
            .iter()
            .map(|r| r.id().to_string())
            .collect(),
        id: invitation.id,
        email: invitation.email,
        expires_at: invitation.expires_at,
    }))
}

// ─── Ads Accounts & Alert Settings ───────────────────────────

async fn get_ads_accounts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<Vec<AdsAccountRow>>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let company_admin = session.company_admin();

    let accounts = if query.refresh {
        session.settings.refresh_ads_accounts(&company_admin).await?
    } else {
        session.settings.fetch_ads_accounts(&company_admin).await?
    };
    Ok(Json(accounts.to_vec()))
}

/// The user's alert settings; defaults when none were saved yet.
async fn get_alert_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AlertSettings>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let owner = session.user().reference();

    let settings = session.settings.fetch_alert_settings(&owner).await?.cloned();
    Ok(Json(
        settings.unwrap_or_else(|| AlertSettings::defaults_for(owner)),
    ))
}

async fn update_alert_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<AlertSettingsPatch>,
) -> Result<Json<AlertSettings>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let owner = session.user().reference();

    let settings = session
        .settings
        .update_alert_settings(&owner, patch)
        .await?
        .cloned()
        .ok_or_else(|| AppError::NotFound("Alert settings not found after update".to_string()))?;
    Ok(Json(settings))
}

// ─── Billing ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BillingResponse {
    pub status: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub connected_accounts: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub price_cents: u64,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub company: Option<StripeCompany>,
    pub invoices: Vec<Invoice>,
}

async fn get_billing(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BillingResponse>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let company_admin = session.company_admin();
    let settings = &mut session.settings;

    let connected = settings.fetch_ads_accounts(&company_admin).await?.len() as u64;
    let status = settings
        .fetch_subscription(&company_admin)
        .await?
        .and_then(|s| s.status.clone())
        .map(String::from);
    let card = settings.fetch_payment_method(&company_admin).await?.cloned();
    let company = settings.fetch_stripe_company(&company_admin).await?.cloned();

    Ok(Json(BillingResponse {
        status,
        connected_accounts: connected,
        price_cents: subscription_price_cents(connected, &state.config.pricing),
        card_brand: card.as_ref().and_then(|c| c.brand.clone()),
        card_last4: card.and_then(|c| c.last4),
        company,
        invoices: settings.invoices().to_vec(),
    }))
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ProvisionRequest>,
) -> Result<Json<ProvisionOutcome>> {
    if request.card_token.trim().is_empty() {
        return Err(AppError::BadRequest("Missing card token".to_string()));
    }

    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let outcome = session.provision_subscription(request).await?;
    Ok(Json(outcome))
}

// ─── Company Deletion ────────────────────────────────────────

/// Delete the company and everything in it, then sign everybody out.
async fn delete_company(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeletionReport>)> {
    tracing::info!(user_id = %user.user_id, "User-initiated company deletion");

    let session = session(&state, &user).await?;
    let mut session = session.lock().await;
    let report = session.delete_company(&state.sessions).await?;

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(report)))
}

// ─── Selection ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SelectionAccount {
    pub id: String,
    pub name: String,
    pub currency_symbol: Option<String>,
    pub monthly_budget: Option<f64>,
    pub daily_budget: Option<f64>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SelectionResponse {
    pub accounts: Vec<SelectionAccount>,
    pub selected: Option<String>,
}

fn selection_response(session: &Session) -> SelectionResponse {
    let selection = &session.selection;
    SelectionResponse {
        accounts: selection
            .accounts()
            .iter()
            .map(|a| SelectionAccount {
                id: a.id.clone(),
                name: a.display_name(),
                currency_symbol: a.currency_symbol.clone(),
                monthly_budget: a.monthly_budget,
                daily_budget: a.daily_budget,
            })
            .collect(),
        selected: selection.selected().map(|a| a.id.clone()),
    }
}

async fn get_selection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<SelectionResponse>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;

    if query.refresh || !session.selection.is_loaded() {
        session.refresh_selection().await?;
    }
    Ok(Json(selection_response(&session)))
}

#[derive(Deserialize)]
pub struct SelectRequest {
    /// `None` clears the selection
    pub account_id: Option<String>,
}

async fn put_selection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SelectRequest>,
) -> Result<Json<SelectionResponse>> {
    let session = session(&state, &user).await?;
    let mut session = session.lock().await;

    if !session.selection.is_loaded() {
        session.refresh_selection().await?;
    }
    match payload.account_id.as_deref() {
        Some(id) => {
            session.selection.select(id)?;
        }
        None => session.selection.clear(),
    }
    Ok(Json(selection_response(&session)))
}

#[derive(Deserialize, Validate)]
pub struct CurrencyRequest {
    #[validate(length(min = 1, max = 4))]
    pub symbol: String,
}

async fn update_currency(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(account_id): Path<String>,
    Json(payload): Json<CurrencyRequest>,
) -> Result<Json<SelectionResponse>> {
    let payload = validated(payload)?;

    let session = session(&state, &user).await?;
    let mut session = session.lock().await;

    if !session.selection.is_loaded() {
        session.refresh_selection().await?;
    }
    // Only accounts the user can see may be edited
    if !session
        .selection
        .accounts()
        .iter()
        .any(|a| a.id == account_id)
    {
        return Err(AppError::NotFound(format!(
            "Ads account {} not found",
            account_id
        )));
    }

    session
        .selection
        .update_currency_symbol(&account_id, payload.symbol.trim())
        .await?;
    Ok(Json(selection_response(&session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_update_request_validation() {
        let ok: UpdateUserRequest = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "role": "Manager",
            "ads_account_ids": ["acc1"]
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        let empty_name: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({ "name": "" })).unwrap();
        assert!(empty_name.validate().is_err());
    }

    #[test]
    fn test_invite_request_rejects_bad_email() {
        let req: InviteUserRequest = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "name": "Someone",
            "role": "Admin"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_in_alert_patch_ignored() {
        let patch: AlertSettingsPatch = serde_json::from_value(serde_json::json!({
            "Type Budget": false,
            "Unrelated": Value::Null
        }))
        .unwrap();
        assert_eq!(patch.type_budget, Some(false));
    }
}
