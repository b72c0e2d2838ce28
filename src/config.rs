// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Template ids and the Stripe price id are opaque strings handed straight
//! to the email endpoint and the payment provider.

use std::env;

/// Default price of the first connected ads account, in cents ($59).
pub const DEFAULT_FIRST_ACCOUNT_CENTS: u64 = 5_900;
/// Default price of each additional connected ads account, in cents ($19).
pub const DEFAULT_ADDITIONAL_ACCOUNT_CENTS: u64 = 1_900;

/// Subscription pricing in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    pub first_account_cents: u64,
    pub additional_account_cents: u64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            first_account_cents: DEFAULT_FIRST_ACCOUNT_CENTS,
            additional_account_cents: DEFAULT_ADDITIONAL_ACCOUNT_CENTS,
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Public application URL used in email links
    pub app_base_url: String,
    /// Internal email dispatch endpoint
    pub email_endpoint_url: String,
    /// Template id for "your profile was updated" emails
    pub email_template_profile_update: String,
    /// Template id for invitation emails
    pub email_template_invitation: String,
    /// Stripe recurring price id billed per connected ads account
    pub stripe_price_id: String,
    /// Cloud Storage bucket for avatar uploads
    pub avatar_bucket: String,
    /// Subscription pricing shown to users
    pub pricing: Pricing,
    /// Keep records in process memory instead of Firestore
    pub offline: bool,

    // --- Secrets ---
    /// Stripe secret API key
    pub stripe_secret_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            app_base_url: "http://localhost:3000".to_string(),
            email_endpoint_url: "http://localhost:3000/api/send-email".to_string(),
            email_template_profile_update: "tmpl_profile_update".to_string(),
            email_template_invitation: "tmpl_invitation".to_string(),
            stripe_price_id: "price_test".to_string(),
            avatar_bucket: "test-avatars".to_string(),
            pricing: Pricing::default(),
            offline: true,
            stripe_secret_key: "sk_test_dummy".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL").unwrap_or_else(|_| app_base_url.clone()),
            email_endpoint_url: env::var("EMAIL_ENDPOINT_URL")
                .unwrap_or_else(|_| format!("{}/api/send-email", app_base_url)),
            app_base_url,
            email_template_profile_update: required("EMAIL_TEMPLATE_PROFILE_UPDATE")?,
            email_template_invitation: required("EMAIL_TEMPLATE_INVITATION")?,
            stripe_price_id: required("STRIPE_PRICE_ID")?,
            avatar_bucket: required("AVATAR_BUCKET")?,
            pricing: Pricing {
                first_account_cents: cents_var(
                    "PRICE_FIRST_ACCOUNT_CENTS",
                    DEFAULT_FIRST_ACCOUNT_CENTS,
                )?,
                additional_account_cents: cents_var(
                    "PRICE_ADDITIONAL_ACCOUNT_CENTS",
                    DEFAULT_ADDITIONAL_ACCOUNT_CENTS,
                )?,
            },
            offline: env::var("OFFLINE_MODE")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),

            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn cents_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("EMAIL_TEMPLATE_PROFILE_UPDATE", "tmpl_a");
        env::set_var("EMAIL_TEMPLATE_INVITATION", "tmpl_b");
        env::set_var("STRIPE_PRICE_ID", "price_123");
        env::set_var("AVATAR_BUCKET", "avatars");
        env::set_var("STRIPE_SECRET_KEY", " sk_test_abc ");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::remove_var("PRICE_FIRST_ACCOUNT_CENTS");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.stripe_price_id, "price_123");
        assert_eq!(config.stripe_secret_key, "sk_test_abc");
        assert_eq!(config.pricing.first_account_cents, DEFAULT_FIRST_ACCOUNT_CENTS);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_cents_rejected() {
        env::set_var("PRICE_TEST_BAD_CENTS", "nineteen");
        let err = cents_var("PRICE_TEST_BAD_CENTS", 1).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PRICE_TEST_BAD_CENTS", _)));
    }
}
