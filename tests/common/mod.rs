// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use adalert_api::config::Config;
use adalert_api::db::{collections, Fields, InMemoryStore, Repository};
use adalert_api::error::AppError;
use adalert_api::middleware::auth::create_jwt;
use adalert_api::models::Invoice;
use adalert_api::routes::create_router;
use adalert_api::services::stripe::{
    BillingDetails, CardSummary, CreatedPaymentMethod, CreatedSubscription,
};
use adalert_api::services::{
    Backends, BlobStore, EmailMessage, EmailSender, PaymentGateway, SessionRegistry,
};
use adalert_api::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// A call made to the fake payment gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentCall {
    PaymentMethod { card_token: String },
    Customer { email: String, name: String, payment_method: String },
    Subscription { customer: String, price: String, quantity: u64 },
    Invoices { customer: String, limit: u32 },
}

/// Payment gateway that records calls and answers with canned ids.
#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<PaymentCall>>,
    pub fail_subscription: AtomicBool,
    pub fail_payment_method: AtomicBool,
}

impl FakeGateway {
    pub fn calls(&self) -> Vec<PaymentCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PaymentCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_method(
        &self,
        card_token: &str,
        _billing: &BillingDetails,
    ) -> Result<CreatedPaymentMethod, AppError> {
        self.record(PaymentCall::PaymentMethod {
            card_token: card_token.to_string(),
        });
        if self.fail_payment_method.load(Ordering::SeqCst) {
            return Err(AppError::Payment("Your card was declined.".to_string()));
        }
        Ok(CreatedPaymentMethod {
            id: "pm_test_1".to_string(),
            card: Some(CardSummary {
                brand: Some("visa".to_string()),
                last4: Some("4242".to_string()),
                exp_month: Some(12),
                exp_year: Some(2030),
            }),
        })
    }

    async fn create_customer(
        &self,
        email: &str,
        name: &str,
        payment_method_id: &str,
    ) -> Result<String, AppError> {
        self.record(PaymentCall::Customer {
            email: email.to_string(),
            name: name.to_string(),
            payment_method: payment_method_id.to_string(),
        });
        Ok("cus_test_1".to_string())
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
        quantity: u64,
    ) -> Result<CreatedSubscription, AppError> {
        self.record(PaymentCall::Subscription {
            customer: customer_id.to_string(),
            price: price_id.to_string(),
            quantity,
        });
        if self.fail_subscription.load(Ordering::SeqCst) {
            return Err(AppError::Payment("Your card has insufficient funds.".to_string()));
        }
        Ok(CreatedSubscription {
            id: "sub_test_1".to_string(),
            status: "active".to_string(),
        })
    }

    async fn list_invoices(&self, customer_id: &str, limit: u32) -> Result<Vec<Invoice>, AppError> {
        self.record(PaymentCall::Invoices {
            customer: customer_id.to_string(),
            limit,
        });
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "in_test_1",
            "number": "ADA-0001",
            "status": "paid",
            "amount_due": 9700,
            "amount_paid": 9700,
            "currency": "usd",
            "created": 1_772_000_000,
            "hosted_invoice_url": "https://invoice.stripe.test/in_test_1"
        }))
        .unwrap();
        Ok(vec![invoice])
    }
}

/// Email sender that records messages.
#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

impl FakeMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Email("Email endpoint unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Blob store that keeps uploaded object names and deleted URLs.
#[derive(Default)]
pub struct FakeBlobStore {
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(
        &self,
        name: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        self.uploaded.lock().unwrap().push(name.to_string());
        Ok(format!("https://storage.googleapis.com/test-avatars/{}", name))
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Fake collaborators wired into a test [`Backends`].
pub struct Fakes {
    pub store: Arc<InMemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<FakeMailer>,
    pub blobs: Arc<FakeBlobStore>,
}

/// Backends over an in-memory store and fake collaborators.
pub fn test_backends() -> (Backends, Fakes) {
    let fakes = Fakes {
        store: Arc::new(InMemoryStore::new()),
        gateway: Arc::new(FakeGateway::default()),
        mailer: Arc::new(FakeMailer::default()),
        blobs: Arc::new(FakeBlobStore::default()),
    };
    let backends = Backends {
        config: Arc::new(Config::test_default()),
        repo: Repository::new(fakes.store.clone()),
        payments: fakes.gateway.clone(),
        mailer: fakes.mailer.clone(),
        blobs: fakes.blobs.clone(),
    };
    (backends, fakes)
}

/// Create a test app with offline fake dependencies.
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Fakes) {
    let (backends, fakes) = test_backends();
    let state = Arc::new(AppState {
        config: Config::test_default(),
        backends,
        sessions: SessionRegistry::new(),
    });
    (create_router(state.clone()), state, fakes)
}

/// Session token for `user_id`, signed with the test key.
pub fn test_jwt(user_id: &str) -> String {
    create_jwt(user_id, &Config::test_default().jwt_signing_key).unwrap()
}

pub fn fields(value: Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

pub fn seed_user(store: &InMemoryStore, id: &str, role: &str, company_admin: &str) {
    store.insert(
        collections::USERS,
        id,
        fields(json!({
            "email": format!("{id}@example.com"),
            "Name": format!("User {id}"),
            "User Type": role,
            "Company Admin": format!("users/{company_admin}"),
        })),
    );
}

pub fn seed_ads_account(
    store: &InMemoryStore,
    id: &str,
    company_admin: &str,
    connected: bool,
    members: &[&str],
) {
    let members: Vec<String> = members.iter().map(|m| format!("users/{m}")).collect();
    store.insert(
        collections::ADS_ACCOUNTS,
        id,
        fields(json!({
            "Id": 1234567890u64,
            "Account Name Original": format!("Account {id}"),
            "User": format!("users/{company_admin}"),
            "Is Connected": connected,
            "Selected Users": members,
            "Currency Symbol": "$",
        })),
    );
}

/// A company with an admin, a manager and two connected accounts plus one
/// disconnected account. Only the admin is a member of `acc2`.
pub fn seed_company(store: &InMemoryStore) {
    seed_user(store, "admin", "Admin", "admin");
    seed_user(store, "manager", "Manager", "admin");
    seed_ads_account(store, "acc1", "admin", true, &["admin", "manager"]);
    seed_ads_account(store, "acc2", "admin", true, &["admin"]);
    seed_ads_account(store, "acc3", "admin", false, &["admin"]);
}

/// Member ids of an ads account as stored.
pub fn members(store: &InMemoryStore, account_id: &str) -> Vec<String> {
    let stored = store.fields(collections::ADS_ACCOUNTS, account_id).unwrap();
    stored["Selected Users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().trim_start_matches("users/").to_string())
        .collect()
}
