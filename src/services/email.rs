// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Transactional email dispatch through a templating endpoint.

use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// One templated email.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub template_id: String,
    pub name: String,
    pub variables: Map<String, Value>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError>;
}

/// Posts messages as JSON to the configured endpoint.
#[derive(Clone)]
pub struct HttpEmailSender {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpEmailSender {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        if response.status().is_success() {
            tracing::debug!(template = %message.template_id, "Email sent");
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        // The endpoint reports failures as {"message": "..."}
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

        Err(AppError::Email(detail))
    }
}
