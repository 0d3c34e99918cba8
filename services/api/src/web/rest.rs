//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the active-workout REST endpoints and the
//! master definition for the OpenAPI specification. Every response follows
//! the `{success, message/error, data}` envelope.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use gymlog_core::domain::{ActiveRoutineDetail, ActiveRoutineSetDetail};
use gymlog_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_active_routine_handler,
        start_routine_handler,
        update_set_handler,
        reorder_sets_handler,
        complete_routine_handler,
        cancel_routine_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            ActiveRoutineDto,
            SetDto,
            ExerciseDto,
            SessionEnvelope,
            SetEnvelope,
            MessageEnvelope,
            ErrorEnvelope,
            StartRoutineRequest,
            UpdateSetRequest,
            ReorderSetsRequest,
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::AuthResponse,
        )
    ),
    tags(
        (name = "Gymlog API", description = "API endpoints for running live workout sessions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct ExerciseDto {
    pub id: Uuid,
    pub name: String,
    pub equipment: Option<String>,
    pub muscle_group: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SetDto {
    pub id: Uuid,
    pub exercise: ExerciseDto,
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

#[derive(Serialize, ToSchema)]
pub struct ActiveRoutineDto {
    pub id: Uuid,
    pub routine_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub sets: Vec<SetDto>,
}

impl From<ActiveRoutineSetDetail> for SetDto {
    fn from(detail: ActiveRoutineSetDetail) -> Self {
        Self {
            id: detail.set.id,
            exercise: ExerciseDto {
                id: detail.exercise.id,
                name: detail.exercise.name,
                equipment: detail.exercise.equipment,
                muscle_group: detail.exercise.muscle_group,
            },
            set_number: detail.set.set_number,
            target_weight: detail.set.target_weight,
            target_reps_min: detail.set.target_reps_min,
            target_reps_max: detail.set.target_reps_max,
            actual_weight: detail.set.actual_weight,
            actual_reps: detail.set.actual_reps,
            completed: detail.set.completed,
            is_pr: detail.set.is_pr,
            sort_order: detail.set.sort_order,
        }
    }
}

impl From<ActiveRoutineDetail> for ActiveRoutineDto {
    fn from(detail: ActiveRoutineDetail) -> Self {
        Self {
            id: detail.routine.id,
            routine_id: detail.routine.routine_id,
            status: detail.routine.status.as_str().to_string(),
            started_at: detail.routine.started_at,
            ended_at: detail.routine.ended_at,
            sets: detail.sets.into_iter().map(SetDto::from).collect(),
        }
    }
}

/// Envelope for endpoints returning a session aggregate. `data` is null when
/// the user has no session in progress; that is a success, not an error.
#[derive(Serialize, ToSchema)]
pub struct SessionEnvelope {
    pub success: bool,
    pub data: Option<ActiveRoutineDto>,
}

#[derive(Serialize, ToSchema)]
pub struct SetEnvelope {
    pub success: bool,
    pub data: SetDto,
}

#[derive(Serialize, ToSchema)]
pub struct MessageEnvelope {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StartRoutineRequest {
    pub routine_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSetRequest {
    pub actual_weight: Option<f64>,
    pub actual_reps: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReorderSetsRequest {
    pub set_ids: Vec<Uuid>,
}

/// Maps a port error onto its HTTP status and the error envelope. Unexpected
/// storage failures are logged and replaced with a generic message.
pub(crate) fn error_response(err: PortError) -> (StatusCode, Json<ErrorEnvelope>) {
    let status = match &err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Conflict(_) => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = if let PortError::Unexpected(_) = err {
        error!("Unexpected port error: {:?}", err);
        "An unexpected internal error occurred".to_string()
    } else {
        err.to_string()
    };
    (
        status,
        Json(ErrorEnvelope {
            success: false,
            error: message,
        }),
    )
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Get the caller's in-progress workout session, if any.
#[utoipa::path(
    get,
    path = "/active-routines/current",
    responses(
        (status = 200, description = "The current session, or null data when none exists", body = SessionEnvelope),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_active_routine_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let session = state
        .workouts
        .get_active(user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(SessionEnvelope {
        success: true,
        data: session.map(ActiveRoutineDto::from),
    }))
}

/// Start a new workout session from a routine template.
#[utoipa::path(
    post,
    path = "/active-routines",
    request_body = StartRoutineRequest,
    responses(
        (status = 201, description = "Session created", body = SessionEnvelope),
        (status = 400, description = "A session is already in progress", body = ErrorEnvelope),
        (status = 404, description = "Routine not found", body = ErrorEnvelope)
    )
)]
pub async fn start_routine_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<StartRoutineRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let session = state
        .workouts
        .start(req.routine_id, user_id)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionEnvelope {
            success: true,
            data: Some(session.into()),
        }),
    ))
}

/// Record one set of the current session.
///
/// Omitted values fall back to the set's planned targets. The set is marked
/// completed and its personal-record status is computed server-side.
#[utoipa::path(
    patch,
    path = "/active-routines/sets/{set_id}",
    request_body = UpdateSetRequest,
    params(
        ("set_id" = Uuid, Path, description = "The set to record")
    ),
    responses(
        (status = 200, description = "Set recorded", body = SetEnvelope),
        (status = 404, description = "Set missing, not owned, or session not active", body = ErrorEnvelope)
    )
)]
pub async fn update_set_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(set_id): Path<Uuid>,
    Json(req): Json<UpdateSetRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let updated = state
        .workouts
        .update_set(set_id, req.actual_weight, req.actual_reps, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(SetEnvelope {
        success: true,
        data: updated.into(),
    }))
}

/// Re-sequence the sets of the current session.
///
/// Each set takes its position in the submitted list as its new sort key.
/// Ids that do not belong to the caller's active session are ignored.
#[utoipa::path(
    put,
    path = "/active-routines/sets/order",
    request_body = ReorderSetsRequest,
    responses(
        (status = 200, description = "Sets reordered", body = MessageEnvelope)
    )
)]
pub async fn reorder_sets_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ReorderSetsRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    state
        .workouts
        .reorder_sets(&req.set_ids, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(MessageEnvelope {
        success: true,
        message: "sets reordered".to_string(),
    }))
}

/// Finish the current session.
#[utoipa::path(
    patch,
    path = "/active-routines/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "The active routine to complete")
    ),
    responses(
        (status = 200, description = "Session completed", body = SessionEnvelope),
        (status = 404, description = "Session missing, not owned, or already finished", body = ErrorEnvelope)
    )
)]
pub async fn complete_routine_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let session = state
        .workouts
        .complete(id, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(SessionEnvelope {
        success: true,
        data: Some(session.into()),
    }))
}

/// Cancel the current session, discarding it and all of its sets.
#[utoipa::path(
    delete,
    path = "/active-routines/{id}",
    params(
        ("id" = Uuid, Path, description = "The active routine to cancel")
    ),
    responses(
        (status = 200, description = "Session cancelled", body = MessageEnvelope),
        (status = 404, description = "Session missing, not owned, or already finished", body = ErrorEnvelope)
    )
)]
pub async fn cancel_routine_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    state
        .workouts
        .cancel(id, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(MessageEnvelope {
        success: true,
        message: "active routine cancelled".to_string(),
    }))
}
