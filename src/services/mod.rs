// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod blob;
pub mod email;
pub mod lifecycle;
pub mod membership;
pub mod selection;
pub mod session;
pub mod settings;
pub mod stripe;

pub use blob::{BlobStore, GcsBlobStore};
pub use email::{EmailMessage, EmailSender, HttpEmailSender};
pub use lifecycle::{DeletionReport, ProvisionOutcome, ProvisionRequest};
pub use membership::{plan_membership, reconcile_membership, MembershipChange};
pub use selection::SelectionStore;
pub use session::{Session, SessionRegistry};
pub use settings::SettingsStore;
pub use stripe::{PaymentGateway, StripeClient};

use crate::config::Config;
use crate::db::Repository;
use std::sync::Arc;

/// Shared handles to the store and external collaborators.
///
/// Cheap to clone; every session holds one.
#[derive(Clone)]
pub struct Backends {
    pub config: Arc<Config>,
    pub repo: Repository,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn EmailSender>,
    pub blobs: Arc<dyn BlobStore>,
}
