//! crates/gymlog_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{
    ActiveRoutineDetail, ActiveRoutineSet, ActiveRoutineSetDetail, NewSet, RoutineTemplate,
    SetPerformance, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The persistence port for the active-workout engine.
///
/// Every query is scoped by `user_id`; the caller supplies an already
/// authenticated id and the implementation must never return rows owned by
/// another user. Batch operations (`create_active_routine`, `reorder_sets`)
/// must be atomic: either all rows become visible or none do.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Returns the user's current `active`-status session with full set
    /// detail, sets ordered ascending by sort key, or `None` if the user has
    /// no session in progress.
    async fn find_active_routine(&self, user_id: Uuid) -> PortResult<Option<ActiveRoutineDetail>>;

    /// Loads a routine template with its exercise entries in template order,
    /// or `None` if the routine does not exist or is not owned by the user.
    async fn find_routine_template(
        &self,
        routine_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<RoutineTemplate>>;

    /// Grouped aggregate: for each of the given exercises, the maximum
    /// `actual_weight` among completed sets of the user's completed sessions.
    /// Exercises the user has never performed are absent from the map.
    async fn max_completed_weight_by_exercise(
        &self,
        user_id: Uuid,
        exercise_ids: &[Uuid],
    ) -> PortResult<HashMap<Uuid, f64>>;

    /// Atomically creates an active routine and all of its seeded sets, then
    /// returns the aggregate with full set detail ordered by sort key.
    async fn create_active_routine(
        &self,
        user_id: Uuid,
        routine_id: Uuid,
        sets: Vec<NewSet>,
    ) -> PortResult<ActiveRoutineDetail>;

    /// The comparison population for PR detection: every set of the user's
    /// completed sessions for the exercise, plus the already-completed sets
    /// of the user's in-progress session(s).
    async fn pr_population(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
    ) -> PortResult<Vec<SetPerformance>>;

    /// Looks up a set, but only if its parent routine is owned by the user
    /// and still in `active` status.
    async fn find_set_in_active_routine(
        &self,
        set_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ActiveRoutineSet>>;

    /// Persists a completed set: actual weight and reps, `completed = true`
    /// and the supplied PR flag. Returns the updated set with exercise detail.
    async fn record_set(
        &self,
        set_id: Uuid,
        actual_weight: f64,
        actual_reps: i32,
        is_pr: bool,
    ) -> PortResult<ActiveRoutineSetDetail>;

    /// Rewrites sort keys as one atomic batch: the set at input position
    /// `index` gets `sort_order = index`. Ids that do not belong to an
    /// active session owned by the user are skipped silently.
    async fn reorder_sets(&self, user_id: Uuid, set_ids: &[Uuid]) -> PortResult<()>;

    /// Transitions an owned, `active` routine to `completed` and stamps its
    /// end time. Returns `None` when no such routine matched. The returned
    /// aggregate carries all sets regardless of their `completed` flag, and
    /// unlike the other reads makes no ordering promise.
    async fn complete_routine(
        &self,
        active_routine_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ActiveRoutineDetail>>;

    /// Deletes an owned, `active` routine and all of its sets. Returns
    /// `false` when no such routine matched.
    async fn delete_routine(&self, active_routine_id: Uuid, user_id: Uuid) -> PortResult<bool>;
}

/// The persistence port for account and login-session storage, consumed by
/// the auth handlers and middleware only. The workout core never sees it.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session cookie value to the owning user, rejecting expired
    /// or unknown sessions with `Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
