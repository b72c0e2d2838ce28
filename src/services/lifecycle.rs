// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: cascading company deletion and subscription
//! provisioning.
//!
//! Neither operation is transactional. Steps run strictly in order and the
//! first failure aborts; whatever already happened stays committed.

use crate::db::{collections, fields, DocRef, Fields, Filter};
use crate::error::AppError;
use crate::models::billing::{country_name, subscription_price_cents};
use crate::models::{Invoice, PaymentMethod, SubscriptionStatus};
use crate::services::stripe::BillingDetails;
use crate::services::Backends;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Collections keyed by `User` that are cleared for every company user,
/// in deletion order.
const PER_USER_COLLECTIONS: [&str; 7] = [
    collections::ALERT_SETTINGS,
    collections::PAGE_TRACKERS,
    collections::DASHBOARD_DAILY,
    collections::STRIPE_COMPANIES,
    collections::SUBSCRIPTIONS,
    collections::PAYMENT_METHODS,
    collections::AUTH_TOKENS,
];

/// How many invoices to cache after provisioning.
const RECENT_INVOICES: u32 = 10;

/// Documents deleted per collection by [`delete_company`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionReport {
    pub deleted: BTreeMap<String, usize>,
    /// Ids of every user removed with the company
    pub user_ids: Vec<String>,
}

impl DeletionReport {
    fn record(&mut self, collection: &str, count: usize) {
        *self.deleted.entry(collection.to_string()).or_default() += count;
    }

    pub fn total(&self) -> usize {
        self.deleted.values().sum()
    }
}

/// Delete a company and everything that belongs to it, then call `logout`
/// with the ids of the removed users.
///
/// Order:
/// 1. budget variables keyed by the company admin
/// 2. budget variables of each ads account
/// 3. alerts of each ads account
/// 4. the ads accounts
/// 5. per-user records of every company user
/// 6. the user documents
/// 7. `logout`
pub async fn delete_company<F>(
    backends: &Backends,
    company_admin: &DocRef,
    logout: F,
) -> Result<DeletionReport, AppError>
where
    F: FnOnce(&[String]) + Send,
{
    let repo = &backends.repo;
    let mut report = DeletionReport::default();

    tracing::info!(company_admin = %company_admin, "Starting company deletion");

    // 1. Company-level budget variables
    let count = repo
        .delete_where(
            collections::ADS_ACCOUNT_VARIABLES,
            &[Filter::reference(fields::USER, company_admin)],
        )
        .await?;
    report.record(collections::ADS_ACCOUNT_VARIABLES, count);

    let accounts: Vec<DocRef> = repo
        .company_ads_accounts(company_admin)
        .await?
        .into_iter()
        .map(|a| DocRef::new(collections::ADS_ACCOUNTS, a.id))
        .collect();

    // 2. Per-account budget variables
    for account in &accounts {
        let count = repo
            .delete_where(
                collections::ADS_ACCOUNT_VARIABLES,
                &[Filter::reference(fields::ADS_ACCOUNT, account)],
            )
            .await?;
        report.record(collections::ADS_ACCOUNT_VARIABLES, count);
    }

    // 3. Alerts
    for account in &accounts {
        let count = repo
            .delete_where(
                collections::ALERTS,
                &[Filter::reference(fields::ADS_ACCOUNT, account)],
            )
            .await?;
        report.record(collections::ALERTS, count);
    }

    // 4. Ads accounts
    let count = repo
        .delete_where(
            collections::ADS_ACCOUNTS,
            &[Filter::reference(fields::USER, company_admin)],
        )
        .await?;
    report.record(collections::ADS_ACCOUNTS, count);

    // 5. Per-user records
    let mut user_ids: Vec<String> = repo
        .users_for_company(company_admin)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();
    if !user_ids.iter().any(|id| id == company_admin.id()) {
        user_ids.push(company_admin.id().to_string());
    }

    for collection in PER_USER_COLLECTIONS {
        for user_id in &user_ids {
            let count = repo
                .delete_where(
                    collection,
                    &[Filter::reference(fields::USER, &DocRef::user(user_id))],
                )
                .await?;
            report.record(collection, count);
        }
    }

    // 6. Users
    for user_id in &user_ids {
        repo.delete(collections::USERS, user_id).await?;
        report.record(collections::USERS, 1);
    }

    tracing::info!(
        company_admin = %company_admin,
        users = user_ids.len(),
        deleted = report.total(),
        "Company deletion complete"
    );

    // 7. Sign everybody out
    logout(&user_ids);
    report.user_ids = user_ids;

    Ok(report)
}

/// Billing form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionRequest {
    /// Company admin as a reference path or bare user id
    pub company_admin: String,
    /// Client-side card token
    pub card_token: String,
    #[serde(default)]
    pub billing: BillingDetails,
}

/// Result of [`provision_subscription`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvisionOutcome {
    pub customer_id: String,
    /// Set when a paid subscription was created
    pub subscription_id: Option<String>,
    pub quantity: u64,
    pub price_cents: u64,
    pub invoices: Vec<Invoice>,
}

/// Attach a payment method to the company and start a paid subscription
/// for its connected ads accounts.
pub async fn provision_subscription(
    backends: &Backends,
    request: ProvisionRequest,
) -> Result<ProvisionOutcome, AppError> {
    let repo = &backends.repo;
    let payments = &backends.payments;

    // 1. Resolve the company admin
    let company_admin = DocRef::parse_or_id(&request.company_admin, collections::USERS)
        .ok_or_else(|| AppError::BadRequest("Missing company admin reference".to_string()))?;

    // 2. Load what we bill against
    let user = repo
        .get_user(company_admin.id())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", company_admin.id())))?;
    let mirror = repo.stripe_company_for(&company_admin).await?;
    let quantity = repo.connected_ads_accounts(&company_admin).await?.len() as u64;
    let subscription = repo.subscription_for(&company_admin).await?;
    let recorded_customer = subscription
        .as_ref()
        .and_then(|s| s.stripe_customer_id.clone());

    let email = mirror
        .as_ref()
        .and_then(|m| m.email.clone())
        .or_else(|| request.billing.email.clone())
        .unwrap_or_else(|| user.email.clone());
    let name = mirror
        .as_ref()
        .and_then(|m| m.name.clone())
        .or_else(|| request.billing.name.clone())
        .unwrap_or_else(|| user.name.clone());

    // 3. Payment method and customer
    let customer_id = match repo.payment_method_for(&company_admin).await? {
        Some(existing) => match recorded_customer {
            Some(id) => id,
            None => {
                let id = payments
                    .create_customer(&email, &name, &existing.stripe_payment_method_id)
                    .await?;
                record_customer(backends, &company_admin, &id).await?;
                id
            }
        },
        None => {
            let created = payments
                .create_payment_method(&request.card_token, &request.billing)
                .await?;

            let customer_id = match recorded_customer {
                Some(id) => id,
                None => payments.create_customer(&email, &name, &created.id).await?,
            };

            let card = created.card.unwrap_or_default();
            repo.create_payment_method(&PaymentMethod {
                id: String::new(),
                user: company_admin.clone(),
                stripe_payment_method_id: created.id.clone(),
                brand: card.brand,
                last4: card.last4,
                exp_month: card.exp_month,
                exp_year: card.exp_year,
            })
            .await?;

            repo.upsert_stripe_company(&company_admin, billing_address(&request.billing))
                .await?;
            record_customer(backends, &company_admin, &customer_id).await?;

            tracing::info!(
                company_admin = %company_admin,
                payment_method = %created.id,
                "Payment method attached"
            );
            customer_id
        }
    };

    let mut outcome = ProvisionOutcome {
        customer_id: customer_id.clone(),
        quantity,
        price_cents: subscription_price_cents(quantity, &backends.config.pricing),
        ..Default::default()
    };

    // 4. Paid subscription
    if quantity > 0 {
        let created = payments
            .create_subscription(&customer_id, &backends.config.stripe_price_id, quantity)
            .await
            .map_err(|e| match e {
                AppError::Payment(msg) => AppError::Payment(msg),
                other => AppError::Payment(format!("Could not start subscription: {}", other)),
            })?;

        let mut update = Fields::new();
        update.insert(
            "Status".to_string(),
            Value::from(String::from(SubscriptionStatus::Paying)),
        );
        update.insert(
            "Stripe Subscription Id".to_string(),
            Value::from(created.id.as_str()),
        );
        update.insert("Quantity".to_string(), Value::from(quantity));
        repo.upsert_subscription(&company_admin, update).await?;

        outcome.invoices = payments.list_invoices(&customer_id, RECENT_INVOICES).await?;
        outcome.subscription_id = Some(created.id);

        tracing::info!(
            company_admin = %company_admin,
            quantity,
            price_cents = outcome.price_cents,
            "Subscription started"
        );
    }

    Ok(outcome)
}

async fn record_customer(
    backends: &Backends,
    company_admin: &DocRef,
    customer_id: &str,
) -> Result<(), AppError> {
    let mut update = Fields::new();
    update.insert(
        "Stripe Customer Id".to_string(),
        Value::from(customer_id),
    );
    backends
        .repo
        .upsert_subscription(company_admin, update)
        .await
        .map(|_| ())
}

/// Billing-mirror fields for the address on the form. Empty values are skipped.
fn billing_address(billing: &BillingDetails) -> Fields {
    let mut fields = Fields::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            fields.insert(key.to_string(), Value::from(v));
        }
    };

    put("Address Line 1", billing.line1.clone());
    put("Address Line 2", billing.line2.clone());
    put("City", billing.city.clone());
    put("State", billing.state.clone());
    put("Postal Code", billing.postal_code.clone());
    put("Country", billing.country.as_deref().map(country_name));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_billing_address_resolves_country() {
        let fields = billing_address(&BillingDetails {
            line1: Some("1 Main St".to_string()),
            line2: Some("".to_string()),
            country: Some("GB".to_string()),
            ..Default::default()
        });

        assert_eq!(fields["Address Line 1"], "1 Main St");
        assert_eq!(fields["Country"], "United Kingdom");
        assert!(!fields.contains_key("Address Line 2"));
    }

    #[test]
    fn test_report_totals() {
        let mut report = DeletionReport::default();
        report.record(collections::ALERTS, 3);
        report.record(collections::ALERTS, 2);
        report.record(collections::USERS, 1);

        assert_eq!(report.deleted[collections::ALERTS], 5);
        assert_eq!(report.total(), 6);
    }
}
