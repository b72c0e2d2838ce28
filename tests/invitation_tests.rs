// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Inviting users into a company.

use adalert_api::db::{collections, DocRef};
use adalert_api::error::AppError;
use adalert_api::models::{InvitationStatus, UserRole};
use adalert_api::services::settings::InviteRequest;
use adalert_api::services::SessionRegistry;
use adalert_api::time_utils::parse_utc_rfc3339;
use serde_json::json;
use std::sync::atomic::Ordering;

mod common;

use common::{seed_ads_account, seed_company, seed_user, test_backends};

fn invite(email: &str, role: UserRole, accounts: &[&str]) -> InviteRequest {
    InviteRequest {
        email: email.to_string(),
        name: "New Person".to_string(),
        role,
        ads_account_ids: accounts.iter().map(|a| a.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_manager_invitation_gets_requested_accounts() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let invitation = admin
        .lock()
        .await
        .invite_user(invite(
            "New.Person@Example.com",
            UserRole::Manager,
            &["acc2", "adsAccounts/acc3"],
        ))
        .await
        .unwrap();

    assert_eq!(invitation.email, "new.person@example.com");
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.invited_by, DocRef::user("admin"));
    assert_eq!(invitation.company_admin, DocRef::user("admin"));
    assert_eq!(
        invitation.ads_accounts,
        vec![
            DocRef::new(collections::ADS_ACCOUNTS, "acc2"),
            DocRef::new(collections::ADS_ACCOUNTS, "acc3"),
        ]
    );

    let stored = fakes
        .store
        .fields(collections::INVITATIONS, &invitation.id)
        .unwrap();
    assert_eq!(stored["Status"], json!("Pending"));
    assert_eq!(stored["Company Admin"], json!("users/admin"));
}

#[tokio::test]
async fn test_admin_invitation_gets_every_connected_account() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let invitation = admin
        .lock()
        .await
        .invite_user(invite("second.admin@example.com", UserRole::Admin, &["acc3"]))
        .await
        .unwrap();

    let mut ids: Vec<&str> = invitation.ads_accounts.iter().map(|r| r.id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["acc1", "acc2"]);
}

#[tokio::test]
async fn test_invitation_expires_after_seven_days() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let invitation = admin
        .lock()
        .await
        .invite_user(invite("late@example.com", UserRole::Manager, &[]))
        .await
        .unwrap();

    let created = parse_utc_rfc3339(&invitation.created_at).unwrap();
    let expires = parse_utc_rfc3339(&invitation.expires_at).unwrap();
    assert_eq!(expires - created, chrono::Duration::days(7));
    assert!(!invitation.is_expired(created + chrono::Duration::days(6)));
    assert!(invitation.is_expired(expires));
}

#[tokio::test]
async fn test_invitation_email_carries_link() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let invitation = admin
        .lock()
        .await
        .invite_user(invite("linked@example.com", UserRole::Manager, &["acc1"]))
        .await
        .unwrap();

    let sent = fakes.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "linked@example.com");
    assert_eq!(sent[0].template_id, "tmpl_invitation");
    assert_eq!(
        sent[0].variables["link"],
        json!(format!("http://localhost:3000/invite/{}", invitation.id))
    );
    assert_eq!(sent[0].variables["invitedBy"], json!("User admin"));
}

#[tokio::test]
async fn test_duplicate_email_conflicts_without_writes() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let result = admin
        .lock()
        .await
        .invite_user(invite(" Manager@Example.com", UserRole::Manager, &["acc1"]))
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(fakes.store.count(collections::INVITATIONS), 0);
    assert!(fakes.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_email_failure_keeps_invitation() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    fakes.mailer.fail.store(true, Ordering::SeqCst);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let result = admin
        .lock()
        .await
        .invite_user(invite("unlucky@example.com", UserRole::Manager, &[]))
        .await;

    assert!(matches!(result, Err(AppError::Email(_))));
    assert_eq!(fakes.store.count(collections::INVITATIONS), 1);
}

#[tokio::test]
async fn test_managers_cannot_invite() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let manager = registry.get_or_open(&backends, "manager").await.unwrap();

    let result = manager
        .lock()
        .await
        .invite_user(invite("friend@example.com", UserRole::Manager, &[]))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(fakes.store.count(collections::INVITATIONS), 0);
}

#[tokio::test]
async fn test_invitation_rejects_accounts_outside_company() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    seed_user(&fakes.store, "rival", "Admin", "rival");
    seed_ads_account(&fakes.store, "rivalAcc", "rival", true, &["rival"]);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();
    let mut admin = admin.lock().await;

    for accounts in [
        &["acc1", "rivalAcc"][..],
        &["adsAccounts/rivalAcc"][..],
        &["users/rival"][..],
        &["users/acc1"][..],
        &["missing"][..],
    ] {
        let result = admin
            .invite_user(invite("outsider@example.com", UserRole::Manager, accounts))
            .await;
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "accounts {:?} should be rejected",
            accounts
        );
    }

    assert_eq!(fakes.store.count(collections::INVITATIONS), 0);
    assert!(fakes.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_invitation_collapses_repeated_accounts() {
    let (backends, fakes) = test_backends();
    seed_company(&fakes.store);
    let registry = SessionRegistry::new();
    let admin = registry.get_or_open(&backends, "admin").await.unwrap();

    let invitation = admin
        .lock()
        .await
        .invite_user(invite(
            "repeat@example.com",
            UserRole::Manager,
            &["acc1", "adsAccounts/acc1"],
        ))
        .await
        .unwrap();

    assert_eq!(
        invitation.ads_accounts,
        vec![DocRef::new(collections::ADS_ACCOUNTS, "acc1")]
    );
}
