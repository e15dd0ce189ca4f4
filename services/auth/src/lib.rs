//! Account and session authentication service
//!
//! Issues short-lived access tokens and single-use refresh tokens backed by
//! server-side refresh sessions. See [`session::SessionManager`] for the token
//! lifecycle and [`accounts::AccountService`] for account management.

pub mod accounts;
pub mod config;
pub mod database;
pub mod error;
pub mod jwt;
pub mod last_seen;
pub mod middleware;
pub mod models;
pub mod password;
pub mod purge;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod validation;

use crate::{accounts::AccountService, session::SessionManager};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session_manager: SessionManager,
    pub account_service: AccountService,
}
