//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `WorkoutStore` and `AuthStore` ports from the `core`
//! crate. It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymlog_core::domain::{
    ActiveRoutine, ActiveRoutineDetail, ActiveRoutineSet, ActiveRoutineSetDetail, ExerciseInfo,
    NewSet, RoutineExercise, RoutineStatus, RoutineTemplate, SetPerformance, User,
    UserCredentials,
};
use gymlog_core::ports::{AuthStore, PortError, PortResult, WorkoutStore};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

// The partial unique index that enforces one active session per user; a
// violation of it during start() means the caller lost a race.
const ONE_ACTIVE_INDEX: &str = "active_routines_one_active_per_user";

const SET_DETAIL_COLUMNS: &str = "\
    s.id, s.active_routine_id, s.exercise_id, s.set_number, \
    s.target_weight, s.target_reps_min, s.target_reps_max, \
    s.actual_weight, s.actual_reps, s.completed, s.is_pr, s.sort_order, \
    e.name AS exercise_name, eq.name AS equipment_name, mg.name AS muscle_group_name";

const SET_DETAIL_JOINS: &str = "\
    FROM active_routine_sets s \
    JOIN exercises e ON e.id = s.exercise_id \
    LEFT JOIN equipment eq ON eq.id = e.equipment_id \
    LEFT JOIN muscle_groups mg ON mg.id = e.muscle_group_id";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `WorkoutStore` and `AuthStore` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Loads the full set detail for a routine. `by_sort_key` selects between
    /// the display ordering used by the read paths and the bare, unordered
    /// read that the completion path deliberately keeps.
    async fn fetch_routine_detail(
        &self,
        routine: ActiveRoutine,
        by_sort_key: bool,
    ) -> PortResult<ActiveRoutineDetail> {
        let mut sql = format!(
            "SELECT {} {} WHERE s.active_routine_id = $1",
            SET_DETAIL_COLUMNS, SET_DETAIL_JOINS
        );
        if by_sort_key {
            sql.push_str(" ORDER BY s.sort_order ASC");
        }

        let records = sqlx::query_as::<_, SetDetailRecord>(&sql)
            .bind(routine.id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(ActiveRoutineDetail {
            routine,
            sets: records.into_iter().map(SetDetailRecord::to_domain).collect(),
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ActiveRoutineRecord {
    id: Uuid,
    user_id: Uuid,
    routine_id: Uuid,
    status: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}
impl ActiveRoutineRecord {
    fn to_domain(self) -> ActiveRoutine {
        let status = if self.status == "completed" {
            RoutineStatus::Completed
        } else {
            RoutineStatus::Active
        };
        ActiveRoutine {
            id: self.id,
            user_id: self.user_id,
            routine_id: self.routine_id,
            status,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

#[derive(FromRow)]
struct SetDetailRecord {
    id: Uuid,
    active_routine_id: Uuid,
    exercise_id: Uuid,
    set_number: i32,
    target_weight: Option<f64>,
    target_reps_min: i32,
    target_reps_max: i32,
    actual_weight: f64,
    actual_reps: Option<i32>,
    completed: bool,
    is_pr: bool,
    sort_order: i32,
    exercise_name: String,
    equipment_name: Option<String>,
    muscle_group_name: Option<String>,
}
impl SetDetailRecord {
    fn to_domain(self) -> ActiveRoutineSetDetail {
        ActiveRoutineSetDetail {
            exercise: ExerciseInfo {
                id: self.exercise_id,
                name: self.exercise_name,
                equipment: self.equipment_name,
                muscle_group: self.muscle_group_name,
            },
            set: ActiveRoutineSet {
                id: self.id,
                active_routine_id: self.active_routine_id,
                exercise_id: self.exercise_id,
                set_number: self.set_number,
                target_weight: self.target_weight,
                target_reps_min: self.target_reps_min,
                target_reps_max: self.target_reps_max,
                actual_weight: self.actual_weight,
                actual_reps: self.actual_reps,
                completed: self.completed,
                is_pr: self.is_pr,
                sort_order: self.sort_order,
            },
        }
    }
}

#[derive(FromRow)]
struct SetRecord {
    id: Uuid,
    active_routine_id: Uuid,
    exercise_id: Uuid,
    set_number: i32,
    target_weight: Option<f64>,
    target_reps_min: i32,
    target_reps_max: i32,
    actual_weight: f64,
    actual_reps: Option<i32>,
    completed: bool,
    is_pr: bool,
    sort_order: i32,
}
impl SetRecord {
    fn to_domain(self) -> ActiveRoutineSet {
        ActiveRoutineSet {
            id: self.id,
            active_routine_id: self.active_routine_id,
            exercise_id: self.exercise_id,
            set_number: self.set_number,
            target_weight: self.target_weight,
            target_reps_min: self.target_reps_min,
            target_reps_max: self.target_reps_max,
            actual_weight: self.actual_weight,
            actual_reps: self.actual_reps,
            completed: self.completed,
            is_pr: self.is_pr,
            sort_order: self.sort_order,
        }
    }
}

#[derive(FromRow)]
struct RoutineRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
}

#[derive(FromRow)]
struct RoutineExerciseRecord {
    exercise_id: Uuid,
    set_count: i32,
    reps_min: i32,
    reps_max: i32,
    weight: Option<f64>,
    position: i32,
}
impl RoutineExerciseRecord {
    fn to_domain(self) -> RoutineExercise {
        RoutineExercise {
            exercise_id: self.exercise_id,
            set_count: self.set_count,
            reps_min: self.reps_min,
            reps_max: self.reps_max,
            weight: self.weight,
            position: self.position,
        }
    }
}

#[derive(FromRow)]
struct MaxWeightRecord {
    exercise_id: Uuid,
    max_weight: Option<f64>,
}

#[derive(FromRow)]
struct PerformanceRecord {
    actual_weight: f64,
    actual_reps: Option<i32>,
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}

//=========================================================================================
// `WorkoutStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl WorkoutStore for DbAdapter {
    async fn find_active_routine(&self, user_id: Uuid) -> PortResult<Option<ActiveRoutineDetail>> {
        let record = sqlx::query_as::<_, ActiveRoutineRecord>(
            "SELECT id, user_id, routine_id, status, started_at, ended_at \
             FROM active_routines WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => Ok(Some(
                self.fetch_routine_detail(record.to_domain(), true).await?,
            )),
            None => Ok(None),
        }
    }

    async fn find_routine_template(
        &self,
        routine_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<RoutineTemplate>> {
        let routine = sqlx::query_as::<_, RoutineRecord>(
            "SELECT id, user_id, name FROM routines WHERE id = $1 AND user_id = $2",
        )
        .bind(routine_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        let Some(routine) = routine else {
            return Ok(None);
        };

        let exercises = sqlx::query_as::<_, RoutineExerciseRecord>(
            "SELECT exercise_id, set_count, reps_min, reps_max, weight, position \
             FROM routine_exercises WHERE routine_id = $1 ORDER BY position ASC",
        )
        .bind(routine.id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(Some(RoutineTemplate {
            id: routine.id,
            user_id: routine.user_id,
            name: routine.name,
            exercises: exercises
                .into_iter()
                .map(RoutineExerciseRecord::to_domain)
                .collect(),
        }))
    }

    async fn max_completed_weight_by_exercise(
        &self,
        user_id: Uuid,
        exercise_ids: &[Uuid],
    ) -> PortResult<HashMap<Uuid, f64>> {
        let records = sqlx::query_as::<_, MaxWeightRecord>(
            "SELECT s.exercise_id, MAX(s.actual_weight) AS max_weight \
             FROM active_routine_sets s \
             JOIN active_routines ar ON ar.id = s.active_routine_id \
             WHERE ar.user_id = $1 AND ar.status = 'completed' \
               AND s.completed = TRUE AND s.exercise_id = ANY($2) \
             GROUP BY s.exercise_id",
        )
        .bind(user_id)
        .bind(exercise_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .filter_map(|r| r.max_weight.map(|w| (r.exercise_id, w)))
            .collect())
    }

    async fn create_active_routine(
        &self,
        user_id: Uuid,
        routine_id: Uuid,
        sets: Vec<NewSet>,
    ) -> PortResult<ActiveRoutineDetail> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let routine = sqlx::query_as::<_, ActiveRoutineRecord>(
            "INSERT INTO active_routines (id, user_id, routine_id, status) \
             VALUES ($1, $2, $3, 'active') \
             RETURNING id, user_id, routine_id, status, started_at, ended_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(routine_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some(ONE_ACTIVE_INDEX) => {
                PortError::Conflict("user already has an active routine".to_string())
            }
            _ => unexpected(e),
        })?;

        for set in &sets {
            sqlx::query(
                "INSERT INTO active_routine_sets \
                 (id, active_routine_id, exercise_id, set_number, target_weight, \
                  target_reps_min, target_reps_max, sort_order) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::new_v4())
            .bind(routine.id)
            .bind(set.exercise_id)
            .bind(set.set_number)
            .bind(set.target_weight)
            .bind(set.target_reps_min)
            .bind(set.target_reps_max)
            .bind(set.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;

        self.fetch_routine_detail(routine.to_domain(), true).await
    }

    async fn pr_population(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
    ) -> PortResult<Vec<SetPerformance>> {
        let records = sqlx::query_as::<_, PerformanceRecord>(
            "SELECT s.actual_weight, s.actual_reps \
             FROM active_routine_sets s \
             JOIN active_routines ar ON ar.id = s.active_routine_id \
             WHERE ar.user_id = $1 AND s.exercise_id = $2 \
               AND (ar.status = 'completed' \
                    OR (ar.status = 'active' AND s.completed = TRUE))",
        )
        .bind(user_id)
        .bind(exercise_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(|r| SetPerformance {
                weight: Some(r.actual_weight),
                reps: r.actual_reps,
            })
            .collect())
    }

    async fn find_set_in_active_routine(
        &self,
        set_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ActiveRoutineSet>> {
        let record = sqlx::query_as::<_, SetRecord>(
            "SELECT s.id, s.active_routine_id, s.exercise_id, s.set_number, \
                    s.target_weight, s.target_reps_min, s.target_reps_max, \
                    s.actual_weight, s.actual_reps, s.completed, s.is_pr, s.sort_order \
             FROM active_routine_sets s \
             JOIN active_routines ar ON ar.id = s.active_routine_id \
             WHERE s.id = $1 AND ar.user_id = $2 AND ar.status = 'active'",
        )
        .bind(set_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(SetRecord::to_domain))
    }

    async fn record_set(
        &self,
        set_id: Uuid,
        actual_weight: f64,
        actual_reps: i32,
        is_pr: bool,
    ) -> PortResult<ActiveRoutineSetDetail> {
        sqlx::query(
            "UPDATE active_routine_sets \
             SET actual_weight = $2, actual_reps = $3, completed = TRUE, is_pr = $4 \
             WHERE id = $1",
        )
        .bind(set_id)
        .bind(actual_weight)
        .bind(actual_reps)
        .bind(is_pr)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let sql = format!(
            "SELECT {} {} WHERE s.id = $1",
            SET_DETAIL_COLUMNS, SET_DETAIL_JOINS
        );
        let record = sqlx::query_as::<_, SetDetailRecord>(&sql)
            .bind(set_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Set {} not found", set_id))
                }
                _ => unexpected(e),
            })?;

        Ok(record.to_domain())
    }

    async fn reorder_sets(&self, user_id: Uuid, set_ids: &[Uuid]) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        for (index, set_id) in set_ids.iter().enumerate() {
            // Ids outside the caller's active sessions match zero rows.
            sqlx::query(
                "UPDATE active_routine_sets s SET sort_order = $1 \
                 FROM active_routines ar \
                 WHERE s.id = $2 AND ar.id = s.active_routine_id \
                   AND ar.user_id = $3 AND ar.status = 'active'",
            )
            .bind(index as i32)
            .bind(set_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn complete_routine(
        &self,
        active_routine_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<Option<ActiveRoutineDetail>> {
        let record = sqlx::query_as::<_, ActiveRoutineRecord>(
            "UPDATE active_routines SET status = 'completed', ended_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND status = 'active' \
             RETURNING id, user_id, routine_id, status, started_at, ended_at",
        )
        .bind(active_routine_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => Ok(Some(
                self.fetch_routine_detail(record.to_domain(), false).await?,
            )),
            None => Ok(None),
        }
    }

    async fn delete_routine(&self, active_routine_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        sqlx::query(
            "DELETE FROM active_routine_sets WHERE active_routine_id IN \
             (SELECT id FROM active_routines \
              WHERE id = $1 AND user_id = $2 AND status = 'active')",
        )
        .bind(active_routine_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        let result = sqlx::query(
            "DELETE FROM active_routines \
             WHERE id = $1 AND user_id = $2 AND status = 'active'",
        )
        .bind(active_routine_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }
}

//=========================================================================================
// `AuthStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AuthStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict("email already registered".to_string())
            }
            _ => unexpected(e),
        })?;

        Ok(User {
            user_id: record.id,
            email: Some(record.email),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;

        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.password_hash,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
