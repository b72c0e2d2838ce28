// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations over a [`RecordStore`].

use crate::db::record::{self, DocRef, Fields, Filter};
use crate::db::store::RecordStore;
use crate::db::{collections, fields};
use crate::error::AppError;
use crate::models::{
    AdsAccount, AlertSettings, AlertSettingsPatch, Invitation, PaymentMethod, StripeCompany,
    Subscription, User,
};
use futures_util::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Upper bound on concurrent deletes within one cascading step.
const MAX_CONCURRENT_DB_OPS: usize = 10;

/// Typed access to the application's collections.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn query_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<T>, AppError> {
        self.store
            .query(collection, filters)
            .await?
            .iter()
            .map(|doc| doc.decode(collection))
            .collect()
    }

    /// First match of a query that is expected to have at most one result.
    async fn first_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Option<T>, AppError> {
        let docs = self.store.query(collection, filters).await?;
        if docs.len() > 1 {
            tracing::warn!(
                collection,
                count = docs.len(),
                "Expected a single document, using the first"
            );
        }
        docs.first().map(|doc| doc.decode(collection)).transpose()
    }

    /// Update an existing document keyed by `User`, or create one.
    async fn upsert_for_user(
        &self,
        collection: &str,
        user: &DocRef,
        mut update: Fields,
    ) -> Result<String, AppError> {
        let existing = self
            .store
            .query(collection, &[Filter::reference(fields::USER, user)])
            .await?;

        match existing.first() {
            Some(doc) => {
                self.store.update(collection, &doc.id, update).await?;
                Ok(doc.id.clone())
            }
            None => {
                update.insert(fields::USER.to_string(), Value::from(user));
                self.store.create(collection, update).await
            }
        }
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.store
            .get(collections::USERS, user_id)
            .await?
            .map(|doc| doc.decode(collections::USERS))
            .transpose()
    }

    /// All users whose `Company Admin` is the given reference.
    pub async fn users_for_company(&self, company_admin: &DocRef) -> Result<Vec<User>, AppError> {
        self.query_as(
            collections::USERS,
            &[Filter::reference(fields::COMPANY_ADMIN, company_admin)],
        )
        .await
    }

    /// Users registered under an email (expects a lower-cased address).
    pub async fn users_by_email(&self, email: &str) -> Result<Vec<User>, AppError> {
        self.query_as(collections::USERS, &[Filter::eq(fields::EMAIL, email)])
            .await
    }

    pub async fn update_user_fields(&self, user_id: &str, update: Fields) -> Result<(), AppError> {
        self.store.update(collections::USERS, user_id, update).await
    }

    // ─── Ads Accounts ────────────────────────────────────────────

    /// Every ads account owned by the company, connected or not.
    pub async fn company_ads_accounts(
        &self,
        company_admin: &DocRef,
    ) -> Result<Vec<AdsAccount>, AppError> {
        self.query_as(
            collections::ADS_ACCOUNTS,
            &[Filter::reference(fields::USER, company_admin)],
        )
        .await
    }

    pub async fn connected_ads_accounts(
        &self,
        company_admin: &DocRef,
    ) -> Result<Vec<AdsAccount>, AppError> {
        self.query_as(
            collections::ADS_ACCOUNTS,
            &[
                Filter::reference(fields::USER, company_admin),
                Filter::eq(fields::IS_CONNECTED, true),
            ],
        )
        .await
    }

    /// Connected accounts of the company that `user` is a member of.
    pub async fn user_ads_accounts(
        &self,
        company_admin: &DocRef,
        user: &DocRef,
    ) -> Result<Vec<AdsAccount>, AppError> {
        self.query_as(
            collections::ADS_ACCOUNTS,
            &[
                Filter::reference(fields::USER, company_admin),
                Filter::eq(fields::IS_CONNECTED, true),
                Filter::contains_ref(fields::SELECTED_USERS, user),
            ],
        )
        .await
    }

    /// Replace the `Selected Users` array of an account.
    pub async fn set_selected_users(
        &self,
        account_id: &str,
        members: &[DocRef],
    ) -> Result<(), AppError> {
        let mut update = Fields::new();
        update.insert(
            fields::SELECTED_USERS.to_string(),
            Value::Array(members.iter().map(Value::from).collect()),
        );
        self.store
            .update(collections::ADS_ACCOUNTS, account_id, update)
            .await
    }

    pub async fn update_ads_account(&self, account_id: &str, update: Fields) -> Result<(), AppError> {
        self.store
            .update(collections::ADS_ACCOUNTS, account_id, update)
            .await
    }

    // ─── Alert Settings ──────────────────────────────────────────

    pub async fn alert_settings_for_user(
        &self,
        user: &DocRef,
    ) -> Result<Option<AlertSettings>, AppError> {
        self.first_as(
            collections::ALERT_SETTINGS,
            &[Filter::reference(fields::USER, user)],
        )
        .await
    }

    pub async fn create_alert_settings(&self, settings: &AlertSettings) -> Result<String, AppError> {
        self.store
            .create(collections::ALERT_SETTINGS, record::encode(settings)?)
            .await
    }

    pub async fn update_alert_settings(
        &self,
        settings_id: &str,
        patch: &AlertSettingsPatch,
    ) -> Result<(), AppError> {
        self.store
            .update(
                collections::ALERT_SETTINGS,
                settings_id,
                record::encode(patch)?,
            )
            .await
    }

    // ─── Billing ─────────────────────────────────────────────────

    pub async fn subscription_for(&self, user: &DocRef) -> Result<Option<Subscription>, AppError> {
        self.first_as(
            collections::SUBSCRIPTIONS,
            &[Filter::reference(fields::USER, user)],
        )
        .await
    }

    /// Merge fields into the company's subscription record, creating it if needed.
    pub async fn upsert_subscription(&self, user: &DocRef, update: Fields) -> Result<String, AppError> {
        self.upsert_for_user(collections::SUBSCRIPTIONS, user, update)
            .await
    }

    pub async fn payment_method_for(
        &self,
        user: &DocRef,
    ) -> Result<Option<PaymentMethod>, AppError> {
        self.first_as(
            collections::PAYMENT_METHODS,
            &[Filter::reference(fields::USER, user)],
        )
        .await
    }

    pub async fn create_payment_method(&self, method: &PaymentMethod) -> Result<String, AppError> {
        self.store
            .create(collections::PAYMENT_METHODS, record::encode(method)?)
            .await
    }

    pub async fn stripe_company_for(
        &self,
        user: &DocRef,
    ) -> Result<Option<StripeCompany>, AppError> {
        self.first_as(
            collections::STRIPE_COMPANIES,
            &[Filter::reference(fields::USER, user)],
        )
        .await
    }

    pub async fn upsert_stripe_company(
        &self,
        user: &DocRef,
        update: Fields,
    ) -> Result<String, AppError> {
        self.upsert_for_user(collections::STRIPE_COMPANIES, user, update)
            .await
    }

    // ─── Invitations ─────────────────────────────────────────────

    pub async fn create_invitation(&self, invitation: &Invitation) -> Result<String, AppError> {
        self.store
            .create(collections::INVITATIONS, record::encode(invitation)?)
            .await
    }

    // ─── Deletion ────────────────────────────────────────────────

    /// Delete every document matching `filters`. Returns how many were deleted.
    ///
    /// Deletes run with bounded concurrency. Every matching document gets a
    /// delete attempt even after one fails; the call then returns the first
    /// failure in completion order, and documents already deleted stay gone.
    pub async fn delete_where(&self, collection: &str, filters: &[Filter]) -> Result<usize, AppError> {
        let ids: Vec<String> = self
            .store
            .query(collection, filters)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        let count = ids.len();

        stream::iter(ids)
            .map(|id| async move { self.store.delete(collection, &id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        tracing::debug!(collection, count, "Deleted documents");
        Ok(count)
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.store.delete(collection, id).await
    }
}
