//! crates/gymlog_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The lifecycle state of an active routine.
///
/// `Active` is the only mutable state; `Completed` is terminal. A cancelled
/// session is deleted outright and has no status of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineStatus {
    Active,
    Completed,
}

impl RoutineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// A live (or finished) instantiation of a routine template for one user.
#[derive(Debug, Clone)]
pub struct ActiveRoutine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub routine_id: Uuid,
    pub status: RoutineStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// One planned-or-performed set within an active routine.
///
/// Carries both the target values seeded at session start and the actual
/// values recorded when the set is completed. `sort_order` is a global sort
/// key across all exercises in the session, deliberately sparse so extra
/// sets can be inserted without renumbering.
#[derive(Debug, Clone)]
pub struct ActiveRoutineSet {
    pub id: Uuid,
    pub active_routine_id: Uuid,
    pub exercise_id: Uuid,
    pub set_number: i32,
    pub target_weight: Option<f64>,
    pub target_reps_min: i32,
    pub target_reps_max: i32,
    pub actual_weight: f64,
    pub actual_reps: Option<i32>,
    pub completed: bool,
    pub is_pr: bool,
    pub sort_order: i32,
}

/// Descriptive exercise metadata joined into responses.
#[derive(Debug, Clone)]
pub struct ExerciseInfo {
    pub id: Uuid,
    pub name: String,
    pub equipment: Option<String>,
    pub muscle_group: Option<String>,
}

/// A set together with its exercise/equipment/muscle-group detail.
#[derive(Debug, Clone)]
pub struct ActiveRoutineSetDetail {
    pub set: ActiveRoutineSet,
    pub exercise: ExerciseInfo,
}

/// The full active-routine aggregate returned by the read operations.
#[derive(Debug, Clone)]
pub struct ActiveRoutineDetail {
    pub routine: ActiveRoutine,
    pub sets: Vec<ActiveRoutineSetDetail>,
}

/// A routine template with its ordered exercise entries. Read-only from
/// this crate's perspective.
#[derive(Debug, Clone)]
pub struct RoutineTemplate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub exercises: Vec<RoutineExercise>,
}

/// One exercise entry of a routine template: how many sets, at what rep
/// range and configured weight, and where it sits in the template order.
#[derive(Debug, Clone)]
pub struct RoutineExercise {
    pub exercise_id: Uuid,
    pub set_count: i32,
    pub reps_min: i32,
    pub reps_max: i32,
    pub weight: Option<f64>,
    pub position: i32,
}

/// The seed values for one set, built by the session instantiator and
/// persisted as a batch together with the parent routine.
#[derive(Debug, Clone)]
pub struct NewSet {
    pub exercise_id: Uuid,
    pub set_number: i32,
    pub target_weight: Option<f64>,
    pub target_reps_min: i32,
    pub target_reps_max: i32,
    pub sort_order: i32,
}

/// The (weight, reps) snapshot of one historical set, as read by the PR
/// detector. Missing values compare as zero.
#[derive(Debug, Clone, Copy)]
pub struct SetPerformance {
    pub weight: Option<f64>,
    pub reps: Option<i32>,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}
