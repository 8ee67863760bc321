use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use floorplan_loader::LoaderError;
use plan_graph::PlanError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Body of every error reply: a machine code plus a readable message
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("plan {0} not found")]
    PlanNotFound(Uuid),

    #[error("Too many {kind}. Maximum allowed: {max}. Received: {received}")]
    InputTooLarge {
        kind: &'static str,
        max: usize,
        received: usize,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Plan(PlanError::UnknownRoom(_)) | ApiError::Plan(PlanError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Plan(PlanError::PathLimit { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Plan(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Loader(_) | ApiError::InputTooLarge { .. } => StatusCode::BAD_REQUEST,
            ApiError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Plan(PlanError::UnknownCategory { .. }) => "UNKNOWN_CATEGORY",
            ApiError::Plan(PlanError::InvalidGeometry { .. }) => "INVALID_GEOMETRY",
            ApiError::Plan(PlanError::UnknownRoom(_)) => "UNKNOWN_ROOM",
            ApiError::Plan(PlanError::NotFound { .. }) => "NO_PATH",
            ApiError::Plan(PlanError::PathLimit { .. }) => "INPUT_TOO_LARGE",
            ApiError::Loader(_) => "INVALID_PLAN",
            ApiError::PlanNotFound(_) => "PLAN_NOT_FOUND",
            ApiError::InputTooLarge { .. } => "INPUT_TOO_LARGE",
            ApiError::Task(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed with {}: {}", self.code(), self);

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
