pub mod domain;
pub mod ports;
pub mod pr;
pub mod service;

pub use domain::{
    ActiveRoutine, ActiveRoutineDetail, ActiveRoutineSet, ActiveRoutineSetDetail, ExerciseInfo,
    NewSet, RoutineExercise, RoutineStatus, RoutineTemplate, SetPerformance, User,
    UserCredentials,
};
pub use ports::{AuthStore, PortError, PortResult, WorkoutStore};
pub use service::WorkoutService;
