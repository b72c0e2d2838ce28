// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The signed-in user's visible ads accounts and the one they are working on.

use crate::db::{DocRef, Fields, Repository};
use crate::error::AppError;
use crate::models::AdsAccount;
use crate::services::settings::StoreStatus;
use serde_json::Value;

pub struct SelectionStore {
    repo: Repository,
    accounts: Vec<AdsAccount>,
    selected: Option<String>,
    loaded: bool,
    status: StoreStatus,
}

impl SelectionStore {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            accounts: Vec::new(),
            selected: None,
            loaded: false,
            status: StoreStatus::default(),
        }
    }

    pub fn accounts(&self) -> &[AdsAccount] {
        &self.accounts
    }

    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The selected account, read from the loaded list so local patches show.
    pub fn selected(&self) -> Option<&AdsAccount> {
        let id = self.selected.as_deref()?;
        self.accounts.iter().find(|a| a.id == id)
    }

    fn record<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        self.status.loading = false;
        match &result {
            Ok(_) => self.status.error = None,
            Err(e) => {
                tracing::warn!(error = %e, "Selection operation failed");
                self.status.error = Some(e.to_string());
            }
        }
        result
    }

    /// Load the connected accounts `user` is a member of.
    ///
    /// A single result is selected automatically; otherwise the selection
    /// is cleared.
    pub async fn fetch_user_ads_accounts(
        &mut self,
        company_admin: &DocRef,
        user: &DocRef,
    ) -> Result<&[AdsAccount], AppError> {
        self.status.loading = true;
        let result = self.repo.user_ads_accounts(company_admin, user).await;
        let accounts = self.record(result)?;

        self.selected = match accounts.as_slice() {
            [only] => Some(only.id.clone()),
            _ => None,
        };
        tracing::debug!(
            user = %user,
            count = accounts.len(),
            auto_selected = self.selected.is_some(),
            "Loaded visible ads accounts"
        );
        self.accounts = accounts;
        self.loaded = true;
        Ok(&self.accounts)
    }

    /// Select one of the loaded accounts.
    pub fn select(&mut self, account_id: &str) -> Result<&AdsAccount, AppError> {
        let index = self
            .accounts
            .iter()
            .position(|a| a.id == account_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Ads account {} is not available", account_id))
            })?;
        self.selected = Some(account_id.to_string());
        Ok(&self.accounts[index])
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Merge fields into a loaded account without persisting them.
    pub fn patch_account(&mut self, account_id: &str, patch: &Fields) -> Result<(), AppError> {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| AppError::NotFound(format!("Ads account {} not loaded", account_id)))?;
        *account = account.merged(patch)?;
        Ok(())
    }

    /// Persist a new currency symbol, then show it locally.
    pub async fn update_currency_symbol(
        &mut self,
        account_id: &str,
        symbol: &str,
    ) -> Result<(), AppError> {
        let mut patch = Fields::new();
        patch.insert("Currency Symbol".to_string(), Value::from(symbol));

        self.status.loading = true;
        let result = self.repo.update_ads_account(account_id, patch.clone()).await;
        self.record(result)?;

        if self.accounts.iter().any(|a| a.id == account_id) {
            self.patch_account(account_id, &patch)?;
        }
        tracing::info!(account_id, symbol, "Updated currency symbol");
        Ok(())
    }
}
