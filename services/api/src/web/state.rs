//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use gymlog_core::ports::AuthStore;
use gymlog_core::service::WorkoutService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The workout service owns its injected store; the auth store is
/// held separately for the login handlers and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub workouts: WorkoutService,
    pub auth: Arc<dyn AuthStore>,
    pub config: Arc<Config>,
}
