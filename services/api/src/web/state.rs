//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use chrono::{DateTime, Duration, Utc};
use court_booking_core::BookingService;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to
/// all handlers.
#[derive(Clone)]
pub struct AppState {
    pub booking: BookingService,
    pub config: Arc<Config>,
    pub sessions: AdminSessions,
}

//=========================================================================================
// AdminSessions (In-Process Bearer Tokens)
//=========================================================================================

/// Table of live admin bearer tokens. Tokens die with the process;
/// booking state never lives here.
#[derive(Clone, Default)]
pub struct AdminSessions {
    inner: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl AdminSessions {
    /// Mints a new token valid for `ttl`, dropping any expired ones.
    pub fn issue(&self, ttl: Duration) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        sessions.retain(|_, expires_at| *expires_at > now);
        sessions.insert(token.clone(), now + ttl);
        token
    }

    /// True if the token exists and has not expired.
    pub fn validate(&self, token: &str) -> bool {
        let sessions = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(token)
            .is_some_and(|expires_at| *expires_at > Utc::now())
    }
}
