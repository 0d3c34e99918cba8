//! crates/gymlog_core/src/service.rs
//!
//! The active-workout engine: instantiates live sessions from routine
//! templates, records per-set performance with PR detection, re-sequences
//! sets, and drives the session lifecycle (active -> completed / cancelled).
//!
//! The service holds nothing but an injected `WorkoutStore`, so tests run it
//! against an in-memory fake.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{ActiveRoutineDetail, ActiveRoutineSetDetail, NewSet};
use crate::ports::{PortError, PortResult, WorkoutStore};
use crate::pr::{is_personal_record, resolve_reps, resolve_weight, seed_order};

/// Coordinates every operation on a user's active routine.
#[derive(Clone)]
pub struct WorkoutService {
    store: Arc<dyn WorkoutStore>,
}

impl WorkoutService {
    pub fn new(store: Arc<dyn WorkoutStore>) -> Self {
        Self { store }
    }

    /// Materializes a new active session from a routine template.
    ///
    /// Each configured set's target weight is seeded from the user's best
    /// completed weight for that exercise, falling back to the template's
    /// configured weight. Sort keys are spaced 100 apart per exercise so
    /// sets can be inserted later without renumbering.
    ///
    /// Fails with `Conflict` if the user already has a session in progress,
    /// and `NotFound` if the routine is missing or owned by someone else.
    pub async fn start(&self, routine_id: Uuid, user_id: Uuid) -> PortResult<ActiveRoutineDetail> {
        if self.store.find_active_routine(user_id).await?.is_some() {
            return Err(PortError::Conflict(
                "user already has an active routine".to_string(),
            ));
        }

        let template = self
            .store
            .find_routine_template(routine_id, user_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Routine {} not found", routine_id)))?;

        let mut exercise_ids: Vec<Uuid> = Vec::new();
        for entry in &template.exercises {
            if !exercise_ids.contains(&entry.exercise_id) {
                exercise_ids.push(entry.exercise_id);
            }
        }
        let historical_best = self
            .store
            .max_completed_weight_by_exercise(user_id, &exercise_ids)
            .await?;

        let mut sets = Vec::new();
        for entry in &template.exercises {
            for i in 0..entry.set_count {
                sets.push(NewSet {
                    exercise_id: entry.exercise_id,
                    set_number: i + 1,
                    target_weight: historical_best
                        .get(&entry.exercise_id)
                        .copied()
                        .or(entry.weight),
                    target_reps_min: entry.reps_min,
                    target_reps_max: entry.reps_max,
                    sort_order: seed_order(entry.position, i),
                });
            }
        }

        self.store
            .create_active_routine(user_id, routine_id, sets)
            .await
    }

    /// Returns the user's in-progress session, or `None` — absence is a
    /// valid state, not an error.
    pub async fn get_active(&self, user_id: Uuid) -> PortResult<Option<ActiveRoutineDetail>> {
        self.store.find_active_routine(user_id).await
    }

    /// Records one set: resolves the final weight and reps through the
    /// fallback rules, decides PR status against the history snapshot, and
    /// persists the set as completed.
    ///
    /// The snapshot is read before the write so a set cannot match its own
    /// new value. Re-recording an already-completed set does compare against
    /// its own prior value, though; that is the intended behavior and is
    /// pinned by a test.
    pub async fn update_set(
        &self,
        set_id: Uuid,
        actual_weight: Option<f64>,
        actual_reps: Option<i32>,
        user_id: Uuid,
    ) -> PortResult<ActiveRoutineSetDetail> {
        let set = self
            .store
            .find_set_in_active_routine(set_id, user_id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Set {} not found", set_id)))?;

        let weight = resolve_weight(actual_weight, set.target_weight);
        let reps = resolve_reps(actual_reps, set.target_reps_max);

        let history = self.store.pr_population(user_id, set.exercise_id).await?;
        let is_pr = is_personal_record(weight, reps, &history);

        self.store.record_set(set_id, weight, reps, is_pr).await
    }

    /// Rewrites sort keys so the sets appear in the order given. Ids that do
    /// not belong to one of the caller's active sessions are skipped without
    /// error; validating the permutation is the caller's responsibility.
    pub async fn reorder_sets(&self, set_ids: &[Uuid], user_id: Uuid) -> PortResult<()> {
        self.store.reorder_sets(user_id, set_ids).await
    }

    /// Transitions an active session to `completed` and stamps its end time.
    pub async fn complete(
        &self,
        active_routine_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<ActiveRoutineDetail> {
        self.store
            .complete_routine(active_routine_id, user_id)
            .await?
            .ok_or_else(|| {
                PortError::NotFound(format!("Active routine {} not found", active_routine_id))
            })
    }

    /// Deletes an active session and all of its sets. Irreversible.
    pub async fn cancel(&self, active_routine_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let deleted = self
            .store
            .delete_routine(active_routine_id, user_id)
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(PortError::NotFound(format!(
                "Active routine {} not found",
                active_routine_id
            )))
        }
    }
}

//=========================================================================================
// Tests (against an in-memory fake of the WorkoutStore port)
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ActiveRoutine, ActiveRoutineSet, ExerciseInfo, RoutineExercise, RoutineStatus,
        RoutineTemplate, SetPerformance,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        templates: Vec<RoutineTemplate>,
        routines: Vec<ActiveRoutine>,
        sets: Vec<ActiveRoutineSet>,
    }

    /// In-memory stand-in for the persistence adapter.
    #[derive(Default)]
    struct FakeStore {
        inner: Mutex<Inner>,
    }

    impl FakeStore {
        fn add_template(&self, user_id: Uuid, exercises: Vec<RoutineExercise>) -> Uuid {
            let id = Uuid::new_v4();
            self.inner.lock().unwrap().templates.push(RoutineTemplate {
                id,
                user_id,
                name: "push day".to_string(),
                exercises,
            });
            id
        }

        /// Inserts a pre-existing session with one set per `(exercise,
        /// completed, weight, reps)` tuple, for seeding history.
        fn add_session(
            &self,
            user_id: Uuid,
            status: RoutineStatus,
            sets: &[(Uuid, bool, f64, i32)],
        ) -> Uuid {
            let routine_id = Uuid::new_v4();
            let mut inner = self.inner.lock().unwrap();
            inner.routines.push(ActiveRoutine {
                id: routine_id,
                user_id,
                routine_id: Uuid::new_v4(),
                status,
                started_at: Utc::now(),
                ended_at: None,
            });
            for (i, &(exercise_id, completed, weight, reps)) in sets.iter().enumerate() {
                inner.sets.push(ActiveRoutineSet {
                    id: Uuid::new_v4(),
                    active_routine_id: routine_id,
                    exercise_id,
                    set_number: i as i32 + 1,
                    target_weight: None,
                    target_reps_min: 8,
                    target_reps_max: 12,
                    actual_weight: weight,
                    actual_reps: Some(reps),
                    completed,
                    is_pr: false,
                    sort_order: i as i32,
                });
            }
            routine_id
        }

        fn set_ids_of(&self, routine_id: Uuid) -> Vec<Uuid> {
            self.inner
                .lock()
                .unwrap()
                .sets
                .iter()
                .filter(|s| s.active_routine_id == routine_id)
                .map(|s| s.id)
                .collect()
        }

        fn sort_orders_of(&self, routine_id: Uuid) -> Vec<(Uuid, i32)> {
            self.inner
                .lock()
                .unwrap()
                .sets
                .iter()
                .filter(|s| s.active_routine_id == routine_id)
                .map(|s| (s.id, s.sort_order))
                .collect()
        }
    }

    fn stub_exercise(id: Uuid) -> ExerciseInfo {
        ExerciseInfo {
            id,
            name: "bench press".to_string(),
            equipment: Some("barbell".to_string()),
            muscle_group: Some("chest".to_string()),
        }
    }

    fn detail_of(inner: &Inner, routine: &ActiveRoutine, by_sort_key: bool) -> ActiveRoutineDetail {
        let mut sets: Vec<_> = inner
            .sets
            .iter()
            .filter(|s| s.active_routine_id == routine.id)
            .cloned()
            .collect();
        if by_sort_key {
            sets.sort_by_key(|s| s.sort_order);
        }
        ActiveRoutineDetail {
            routine: routine.clone(),
            sets: sets
                .into_iter()
                .map(|set| ActiveRoutineSetDetail {
                    exercise: stub_exercise(set.exercise_id),
                    set,
                })
                .collect(),
        }
    }

    #[async_trait]
    impl WorkoutStore for FakeStore {
        async fn find_active_routine(
            &self,
            user_id: Uuid,
        ) -> PortResult<Option<ActiveRoutineDetail>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .routines
                .iter()
                .find(|r| r.user_id == user_id && r.status == RoutineStatus::Active)
                .map(|r| detail_of(&inner, r, true)))
        }

        async fn find_routine_template(
            &self,
            routine_id: Uuid,
            user_id: Uuid,
        ) -> PortResult<Option<RoutineTemplate>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .templates
                .iter()
                .find(|t| t.id == routine_id && t.user_id == user_id)
                .cloned())
        }

        async fn max_completed_weight_by_exercise(
            &self,
            user_id: Uuid,
            exercise_ids: &[Uuid],
        ) -> PortResult<HashMap<Uuid, f64>> {
            let inner = self.inner.lock().unwrap();
            let mut best: HashMap<Uuid, f64> = HashMap::new();
            for set in &inner.sets {
                if !set.completed || !exercise_ids.contains(&set.exercise_id) {
                    continue;
                }
                let from_completed_session = inner.routines.iter().any(|r| {
                    r.id == set.active_routine_id
                        && r.user_id == user_id
                        && r.status == RoutineStatus::Completed
                });
                if !from_completed_session {
                    continue;
                }
                let entry = best.entry(set.exercise_id).or_insert(set.actual_weight);
                if set.actual_weight > *entry {
                    *entry = set.actual_weight;
                }
            }
            Ok(best)
        }

        async fn create_active_routine(
            &self,
            user_id: Uuid,
            routine_id: Uuid,
            sets: Vec<NewSet>,
        ) -> PortResult<ActiveRoutineDetail> {
            let mut inner = self.inner.lock().unwrap();
            let routine = ActiveRoutine {
                id: Uuid::new_v4(),
                user_id,
                routine_id,
                status: RoutineStatus::Active,
                started_at: Utc::now(),
                ended_at: None,
            };
            inner.routines.push(routine.clone());
            for seed in sets {
                inner.sets.push(ActiveRoutineSet {
                    id: Uuid::new_v4(),
                    active_routine_id: routine.id,
                    exercise_id: seed.exercise_id,
                    set_number: seed.set_number,
                    target_weight: seed.target_weight,
                    target_reps_min: seed.target_reps_min,
                    target_reps_max: seed.target_reps_max,
                    actual_weight: 0.0,
                    actual_reps: None,
                    completed: false,
                    is_pr: false,
                    sort_order: seed.sort_order,
                });
            }
            Ok(detail_of(&inner, &routine, true))
        }

        async fn pr_population(
            &self,
            user_id: Uuid,
            exercise_id: Uuid,
        ) -> PortResult<Vec<SetPerformance>> {
            let inner = self.inner.lock().unwrap();
            let mut population = Vec::new();
            for set in &inner.sets {
                if set.exercise_id != exercise_id {
                    continue;
                }
                let Some(routine) = inner
                    .routines
                    .iter()
                    .find(|r| r.id == set.active_routine_id && r.user_id == user_id)
                else {
                    continue;
                };
                let included = match routine.status {
                    RoutineStatus::Completed => true,
                    RoutineStatus::Active => set.completed,
                };
                if included {
                    population.push(SetPerformance {
                        weight: Some(set.actual_weight),
                        reps: set.actual_reps,
                    });
                }
            }
            Ok(population)
        }

        async fn find_set_in_active_routine(
            &self,
            set_id: Uuid,
            user_id: Uuid,
        ) -> PortResult<Option<ActiveRoutineSet>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .sets
                .iter()
                .find(|s| {
                    s.id == set_id
                        && inner.routines.iter().any(|r| {
                            r.id == s.active_routine_id
                                && r.user_id == user_id
                                && r.status == RoutineStatus::Active
                        })
                })
                .cloned())
        }

        async fn record_set(
            &self,
            set_id: Uuid,
            actual_weight: f64,
            actual_reps: i32,
            is_pr: bool,
        ) -> PortResult<ActiveRoutineSetDetail> {
            let mut inner = self.inner.lock().unwrap();
            let set = inner
                .sets
                .iter_mut()
                .find(|s| s.id == set_id)
                .ok_or_else(|| PortError::NotFound(format!("Set {} not found", set_id)))?;
            set.actual_weight = actual_weight;
            set.actual_reps = Some(actual_reps);
            set.completed = true;
            set.is_pr = is_pr;
            let set = set.clone();
            Ok(ActiveRoutineSetDetail {
                exercise: stub_exercise(set.exercise_id),
                set,
            })
        }

        async fn reorder_sets(&self, user_id: Uuid, set_ids: &[Uuid]) -> PortResult<()> {
            let mut inner = self.inner.lock().unwrap();
            let owned_active: Vec<Uuid> = inner
                .routines
                .iter()
                .filter(|r| r.user_id == user_id && r.status == RoutineStatus::Active)
                .map(|r| r.id)
                .collect();
            for (index, set_id) in set_ids.iter().enumerate() {
                if let Some(set) = inner
                    .sets
                    .iter_mut()
                    .find(|s| s.id == *set_id && owned_active.contains(&s.active_routine_id))
                {
                    set.sort_order = index as i32;
                }
            }
            Ok(())
        }

        async fn complete_routine(
            &self,
            active_routine_id: Uuid,
            user_id: Uuid,
        ) -> PortResult<Option<ActiveRoutineDetail>> {
            let mut inner = self.inner.lock().unwrap();
            let Some(routine) = inner.routines.iter_mut().find(|r| {
                r.id == active_routine_id
                    && r.user_id == user_id
                    && r.status == RoutineStatus::Active
            }) else {
                return Ok(None);
            };
            routine.status = RoutineStatus::Completed;
            routine.ended_at = Some(Utc::now());
            let routine = routine.clone();
            Ok(Some(detail_of(&inner, &routine, false)))
        }

        async fn delete_routine(
            &self,
            active_routine_id: Uuid,
            user_id: Uuid,
        ) -> PortResult<bool> {
            let mut inner = self.inner.lock().unwrap();
            let matched = inner.routines.iter().any(|r| {
                r.id == active_routine_id
                    && r.user_id == user_id
                    && r.status == RoutineStatus::Active
            });
            if !matched {
                return Ok(false);
            }
            inner.sets.retain(|s| s.active_routine_id != active_routine_id);
            inner.routines.retain(|r| r.id != active_routine_id);
            Ok(true)
        }
    }

    fn service() -> (WorkoutService, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        (WorkoutService::new(store.clone()), store)
    }

    fn entry(exercise_id: Uuid, set_count: i32, weight: Option<f64>, position: i32) -> RoutineExercise {
        RoutineExercise {
            exercise_id,
            set_count,
            reps_min: 8,
            reps_max: 12,
            weight,
            position,
        }
    }

    #[tokio::test]
    async fn start_seeds_sets_from_template() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let rows = Uuid::new_v4();
        let routine = store.add_template(
            user,
            vec![entry(bench, 3, Some(50.0), 0), entry(rows, 2, None, 1)],
        );

        let session = service.start(routine, user).await.unwrap();

        assert_eq!(session.routine.status, RoutineStatus::Active);
        assert_eq!(session.sets.len(), 5);
        let bench_sets: Vec<_> = session
            .sets
            .iter()
            .filter(|s| s.set.exercise_id == bench)
            .collect();
        assert_eq!(bench_sets.len(), 3);
        for (i, detail) in bench_sets.iter().enumerate() {
            assert_eq!(detail.set.set_number, i as i32 + 1);
            assert_eq!(detail.set.target_weight, Some(50.0));
            assert_eq!(detail.set.target_reps_min, 8);
            assert_eq!(detail.set.target_reps_max, 12);
            assert_eq!(detail.set.sort_order, i as i32);
            assert!(!detail.set.completed);
        }
        // The second exercise's sort keys start 100 further along.
        let row_orders: Vec<i32> = session
            .sets
            .iter()
            .filter(|s| s.set.exercise_id == rows)
            .map(|s| s.set.sort_order)
            .collect();
        assert_eq!(row_orders, vec![100, 101]);
    }

    #[tokio::test]
    async fn start_prefers_historical_best_weight() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        store.add_session(
            user,
            RoutineStatus::Completed,
            &[(bench, true, 70.0, 5), (bench, true, 65.0, 8)],
        );
        let routine = store.add_template(user, vec![entry(bench, 2, Some(50.0), 0)]);

        let session = service.start(routine, user).await.unwrap();

        for detail in &session.sets {
            assert_eq!(detail.set.target_weight, Some(70.0));
        }
    }

    #[tokio::test]
    async fn uncompleted_historical_sets_do_not_seed_targets() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        // The heavy set was never marked completed, so it must not count.
        store.add_session(user, RoutineStatus::Completed, &[(bench, false, 90.0, 5)]);
        let routine = store.add_template(user, vec![entry(bench, 1, Some(50.0), 0)]);

        let session = service.start(routine, user).await.unwrap();

        assert_eq!(session.sets[0].set.target_weight, Some(50.0));
    }

    #[tokio::test]
    async fn start_rejects_second_active_session() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 1, None, 0)]);
        service.start(routine, user).await.unwrap();

        let err = service.start(routine, user).await.unwrap_err();

        assert!(matches!(err, PortError::Conflict(_)));
        // The failed attempt must not have created a second session.
        let inner = store.inner.lock().unwrap();
        let active = inner
            .routines
            .iter()
            .filter(|r| r.user_id == user && r.status == RoutineStatus::Active)
            .count();
        assert_eq!(active, 1);
    }

    #[tokio::test]
    async fn start_requires_an_owned_routine() {
        let (service, store) = service();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let routine = store.add_template(owner, vec![entry(Uuid::new_v4(), 1, None, 0)]);

        let err = service.start(routine, stranger).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        let err = service.start(Uuid::new_v4(), owner).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn get_active_is_empty_when_nothing_started() {
        let (service, _store) = service();
        assert!(service.get_active(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn first_ever_set_is_a_pr() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 1, Some(40.0), 0)]);
        let session = service.start(routine, user).await.unwrap();
        let set_id = session.sets[0].set.id;

        let updated = service
            .update_set(set_id, Some(45.0), Some(10), user)
            .await
            .unwrap();

        assert!(updated.set.is_pr);
        assert!(updated.set.completed);
        assert_eq!(updated.set.actual_weight, 45.0);
        assert_eq!(updated.set.actual_reps, Some(10));
    }

    #[tokio::test]
    async fn recording_without_actuals_falls_back_to_targets() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 1, Some(50.0), 0)]);
        let session = service.start(routine, user).await.unwrap();
        let set_id = session.sets[0].set.id;

        let updated = service.update_set(set_id, None, None, user).await.unwrap();

        assert_eq!(updated.set.actual_weight, 50.0);
        assert_eq!(updated.set.actual_reps, Some(12));
    }

    #[tokio::test]
    async fn pr_decision_follows_weight_then_reps_tie_break() {
        let cases = [
            (85.0, 1, true),   // strictly heavier
            (80.0, 6, true),   // tie weight, more reps
            (79.0, 10, false), // lighter loses regardless of reps
        ];
        // Fresh state per case: recording a set folds it into the population
        // for every later comparison, which would skew the matrix.
        for &(weight, reps, expected) in &cases {
            let (service, store) = service();
            let user = Uuid::new_v4();
            let bench = Uuid::new_v4();
            store.add_session(user, RoutineStatus::Completed, &[(bench, true, 80.0, 5)]);
            let routine = store.add_template(user, vec![entry(bench, 1, None, 0)]);
            let session = service.start(routine, user).await.unwrap();

            let updated = service
                .update_set(session.sets[0].set.id, Some(weight), Some(reps), user)
                .await
                .unwrap();
            assert_eq!(updated.set.is_pr, expected, "candidate {}x{}", weight, reps);
        }
    }

    #[tokio::test]
    async fn exact_tie_with_history_is_not_a_pr() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        store.add_session(user, RoutineStatus::Completed, &[(bench, true, 80.0, 5)]);
        let routine = store.add_template(user, vec![entry(bench, 1, None, 0)]);
        let session = service.start(routine, user).await.unwrap();

        let updated = service
            .update_set(session.sets[0].set.id, Some(80.0), Some(5), user)
            .await
            .unwrap();
        assert!(!updated.set.is_pr);
    }

    #[tokio::test]
    async fn completed_sets_of_the_current_session_join_the_population() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 2, None, 0)]);
        let session = service.start(routine, user).await.unwrap();

        let first = service
            .update_set(session.sets[0].set.id, Some(60.0), Some(8), user)
            .await
            .unwrap();
        assert!(first.set.is_pr);

        // Same weight and reps as the set just recorded in this session.
        let second = service
            .update_set(session.sets[1].set.id, Some(60.0), Some(8), user)
            .await
            .unwrap();
        assert!(!second.set.is_pr);
    }

    #[tokio::test]
    async fn repeat_update_compares_against_own_prior_value() {
        // Correcting an already-completed set re-runs PR detection against a
        // population that now contains the set's own previous value, so an
        // identical correction is no longer a PR. Intentional behavior.
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 1, None, 0)]);
        let session = service.start(routine, user).await.unwrap();
        let set_id = session.sets[0].set.id;

        let first = service
            .update_set(set_id, Some(100.0), Some(5), user)
            .await
            .unwrap();
        assert!(first.set.is_pr);

        let second = service
            .update_set(set_id, Some(100.0), Some(5), user)
            .await
            .unwrap();
        assert!(!second.set.is_pr);
    }

    #[tokio::test]
    async fn reorder_applies_input_positions_and_skips_foreign_ids() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 3, None, 0)]);
        let session = service.start(routine, user).await.unwrap();
        let ids: Vec<Uuid> = session.sets.iter().map(|s| s.set.id).collect();
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        // A stranger's active set slipped into the request.
        let stranger = Uuid::new_v4();
        let foreign_session = store.add_session(stranger, RoutineStatus::Active, &[(bench, false, 0.0, 0)]);
        let foreign_set = store.set_ids_of(foreign_session)[0];

        service
            .reorder_sets(&[c, foreign_set, a, b], user)
            .await
            .unwrap();

        let orders: HashMap<Uuid, i32> = store.sort_orders_of(session.routine.id).into_iter().collect();
        assert_eq!(orders[&c], 0);
        assert_eq!(orders[&a], 2);
        assert_eq!(orders[&b], 3);
        // Untouched even though it appeared in the input list.
        assert_eq!(store.sort_orders_of(foreign_session)[0].1, 0);
    }

    #[tokio::test]
    async fn complete_returns_all_sets_even_uncompleted() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 3, None, 0)]);
        let session = service.start(routine, user).await.unwrap();
        service
            .update_set(session.sets[0].set.id, Some(50.0), Some(10), user)
            .await
            .unwrap();

        let finished = service.complete(session.routine.id, user).await.unwrap();

        assert_eq!(finished.routine.status, RoutineStatus::Completed);
        assert!(finished.routine.ended_at.is_some());
        assert_eq!(finished.sets.len(), 3);
        assert_eq!(finished.sets.iter().filter(|s| s.set.completed).count(), 1);
    }

    #[tokio::test]
    async fn update_after_complete_is_not_found() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 1, None, 0)]);
        let session = service.start(routine, user).await.unwrap();
        let set_id = session.sets[0].set.id;
        service.complete(session.routine.id, user).await.unwrap();

        let err = service
            .update_set(set_id, Some(50.0), Some(5), user)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        // Completion is terminal: a second complete() is NotFound too.
        let err = service.complete(session.routine.id, user).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_deletes_session_and_sets() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let bench = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(bench, 2, None, 0)]);
        let session = service.start(routine, user).await.unwrap();

        service.cancel(session.routine.id, user).await.unwrap();

        assert!(service.get_active(user).await.unwrap().is_none());
        assert!(store.set_ids_of(session.routine.id).is_empty());

        let err = service.cancel(session.routine.id, user).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancelling_someone_elses_session_is_not_found() {
        let (service, store) = service();
        let user = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let routine = store.add_template(user, vec![entry(Uuid::new_v4(), 1, None, 0)]);
        let session = service.start(routine, user).await.unwrap();

        let err = service.cancel(session.routine.id, stranger).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(service.get_active(user).await.unwrap().is_some());
    }
}
