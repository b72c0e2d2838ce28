// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! adAlert API Server
//!
//! Serves the settings, user-management and billing endpoints used by the
//! adAlert web application.

use adalert_api::{
    config::Config,
    db::{FirestoreStore, InMemoryStore, RecordStore, Repository},
    services::{Backends, GcsBlobStore, HttpEmailSender, SessionRegistry, StripeClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting adAlert API");

    let store: Arc<dyn RecordStore> = if config.offline {
        tracing::warn!("Offline mode: records are kept in memory only");
        Arc::new(InMemoryStore::new())
    } else {
        Arc::new(
            FirestoreStore::new(&config.gcp_project_id)
                .await
                .expect("Failed to connect to Firestore"),
        )
    };

    let backends = Backends {
        config: Arc::new(config.clone()),
        repo: Repository::new(store),
        payments: Arc::new(StripeClient::new(config.stripe_secret_key.clone())),
        mailer: Arc::new(HttpEmailSender::new(config.email_endpoint_url.clone())),
        blobs: Arc::new(GcsBlobStore::new(config.avatar_bucket.clone())),
    };
    tracing::info!(
        project = %config.gcp_project_id,
        bucket = %config.avatar_bucket,
        "Backends initialized"
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        backends,
        sessions: SessionRegistry::new(),
    });

    // Build router
    let app = adalert_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("adalert_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
