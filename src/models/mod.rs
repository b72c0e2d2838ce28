// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod ads_account;
pub mod alert_settings;
pub mod billing;
pub mod invitation;
pub mod user;

pub use ads_account::{AdsAccount, AdsAccountRow};
pub use alert_settings::{AlertSettings, AlertSettingsPatch};
pub use billing::{Invoice, PaymentMethod, StripeCompany, Subscription, SubscriptionStatus};
pub use invitation::{Invitation, InvitationStatus};
pub use user::{User, UserRole, UserRow};
