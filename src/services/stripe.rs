// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Payment provider client.
//!
//! Talks to the Stripe REST API with form-encoded requests. Only the calls
//! needed for subscription provisioning are implemented.

use crate::error::AppError;
use crate::models::Invoice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Card fields collected by the billing form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2
    pub country: Option<String>,
}

/// Card summary of a created payment method.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CardSummary {
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<u32>,
    pub exp_year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedPaymentMethod {
    pub id: String,
    #[serde(default)]
    pub card: Option<CardSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedSubscription {
    pub id: String,
    pub status: String,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct InvoiceList {
    data: Vec<Invoice>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Operations the lifecycle orchestrator needs from the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a card payment method from a client-side card token.
    async fn create_payment_method(
        &self,
        card_token: &str,
        billing: &BillingDetails,
    ) -> Result<CreatedPaymentMethod, AppError>;

    /// Create a customer with the payment method as default. Returns the customer id.
    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        payment_method_id: &str,
    ) -> Result<String, AppError>;

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        quantity: u64,
    ) -> Result<CreatedSubscription, AppError>;

    /// Most recent invoices of a customer, newest first.
    async fn list_invoices(&self, customer_id: &str, limit: u32) -> Result<Vec<Invoice>, AppError>;
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, "https://api.stripe.com/v1".to_string())
    }

    /// Client against a different API root (used by tests).
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            secret_key,
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Request to payment provider failed: {}", e)))?;

        check_response_json(response).await
    }
}

/// Check response status and parse the JSON body.
///
/// Provider errors carry a human-readable message, which is surfaced as is.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        tracing::warn!(status = status.as_u16(), error = %message, "Payment provider error");
        return Err(AppError::Payment(message));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Payment(format!("JSON parse error: {}", e)))
}

fn push_opt(form: &mut Vec<(String, String)>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        form.push((key.to_string(), v.to_string()));
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_method(
        &self,
        card_token: &str,
        billing: &BillingDetails,
    ) -> Result<CreatedPaymentMethod, AppError> {
        let mut form = vec![
            ("type".to_string(), "card".to_string()),
            ("card[token]".to_string(), card_token.to_string()),
        ];
        push_opt(&mut form, "billing_details[name]", &billing.name);
        push_opt(&mut form, "billing_details[email]", &billing.email);
        push_opt(&mut form, "billing_details[address][line1]", &billing.line1);
        push_opt(&mut form, "billing_details[address][line2]", &billing.line2);
        push_opt(&mut form, "billing_details[address][city]", &billing.city);
        push_opt(&mut form, "billing_details[address][state]", &billing.state);
        push_opt(
            &mut form,
            "billing_details[address][postal_code]",
            &billing.postal_code,
        );
        push_opt(&mut form, "billing_details[address][country]", &billing.country);

        self.post_form("/payment_methods", &form).await
    }

    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        payment_method_id: &str,
    ) -> Result<String, AppError> {
        let form = vec![
            ("email".to_string(), email.to_string()),
            ("name".to_string(), name.to_string()),
            ("payment_method".to_string(), payment_method_id.to_string()),
            (
                "invoice_settings[default_payment_method]".to_string(),
                payment_method_id.to_string(),
            ),
        ];

        let customer: IdOnly = self.post_form("/customers", &form).await?;
        tracing::info!(customer_id = %customer.id, "Created payment customer");
        Ok(customer.id)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        quantity: u64,
    ) -> Result<CreatedSubscription, AppError> {
        let form = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("items[0][price]".to_string(), price_id.to_string()),
            ("items[0][quantity]".to_string(), quantity.to_string()),
        ];

        self.post_form("/subscriptions", &form).await
    }

    async fn list_invoices(&self, customer_id: &str, limit: u32) -> Result<Vec<Invoice>, AppError> {
        let response = self
            .http
            .get(format!("{}/invoices", self.base_url))
            .bearer_auth(&self.secret_key)
            .query(&[("customer", customer_id), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Request to payment provider failed: {}", e)))?;

        let list: InvoiceList = check_response_json(response).await?;
        Ok(list.data)
    }
}
