// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Billing mirrors of payment-provider state and subscription pricing.
//!
//! All records are keyed by a `User` reference to the company admin.

use crate::config::Pricing;
use crate::db::DocRef;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Monthly price in cents for `connected` ads accounts.
///
/// The first account is priced on its own; every further account adds the
/// additional-account price.
pub fn subscription_price_cents(connected: u64, pricing: &Pricing) -> u64 {
    match connected {
        0 => 0,
        n => pricing.first_account_cents + (n - 1) * pricing.additional_account_cents,
    }
}

/// Country names for the ISO codes the billing form offers.
const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("AU", "Australia"),
    ("AT", "Austria"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("MX", "Mexico"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("SE", "Sweden"),
    ("SG", "Singapore"),
    ("US", "United States"),
    ("ZA", "South Africa"),
];

/// Country name for an ISO 3166-1 alpha-2 code, or the code itself if unknown.
pub fn country_name(code: &str) -> String {
    let code = code.trim();
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map_or_else(|| code.to_string(), |(_, name)| name.to_string())
}

/// Billing contact and address mirrored from the provider (`stripeCompanies`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StripeCompany {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    #[serde(rename = "User", default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub user: Option<DocRef>,
    #[serde(rename = "Email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Address Line 1", default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(rename = "Address Line 2", default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(rename = "City", default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "State", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "Postal Code", default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country name (not the ISO code)
    #[serde(rename = "Country", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Subscription lifecycle state. Unrecognized stored values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Trial,
    Paying,
    Canceled,
    Other(String),
}

impl From<String> for SubscriptionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Trial" => SubscriptionStatus::Trial,
            "Paying" => SubscriptionStatus::Paying,
            "Canceled" => SubscriptionStatus::Canceled,
            _ => SubscriptionStatus::Other(raw),
        }
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Trial => "Trial".to_string(),
            SubscriptionStatus::Paying => "Paying".to_string(),
            SubscriptionStatus::Canceled => "Canceled".to_string(),
            SubscriptionStatus::Other(raw) => raw,
        }
    }
}

/// Subscription record (`subscriptions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    #[serde(rename = "User")]
    pub user: DocRef,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(rename = "Stripe Customer Id", default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(
        rename = "Stripe Subscription Id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub stripe_subscription_id: Option<String>,
    #[serde(rename = "Quantity", default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,
}

impl Subscription {
    pub fn is_paying(&self) -> bool {
        self.status == Some(SubscriptionStatus::Paying)
    }
}

/// Locally persisted card summary (`paymentMethods`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: String,
    #[serde(rename = "User")]
    pub user: DocRef,
    #[serde(rename = "Stripe Payment Method Id")]
    pub stripe_payment_method_id: String,
    #[serde(rename = "Brand", default)]
    pub brand: Option<String>,
    #[serde(rename = "Last4", default)]
    pub last4: Option<String>,
    #[serde(rename = "Exp Month", default)]
    pub exp_month: Option<u32>,
    #[serde(rename = "Exp Year", default)]
    pub exp_year: Option<u32>,
}

/// Invoice summary returned by the payment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Smallest currency unit
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub amount_due: i64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub amount_paid: i64,
    #[serde(default)]
    pub currency: String,
    /// Unix timestamp
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub created: i64,
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
}
