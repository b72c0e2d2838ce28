// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! adAlert API: account and settings synchronization backend.
//!
//! This crate keeps a company's users, connected ads accounts, alert
//! settings and billing records in sync with the document store, and
//! handles cascading company deletion and subscription provisioning.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{Backends, SessionRegistry};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backends: Backends,
    pub sessions: SessionRegistry,
}
