//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    pub description: String,
}

/// A [`TaskError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub TaskError);

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            TaskError::NotFound { .. } => StatusCode::NOT_FOUND,
            TaskError::NoOutputAvailable { .. } | TaskError::IncorrectOperation { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            TaskError::NotFound { .. } => "Task not found",
            TaskError::NoOutputAvailable { .. } => "No output available",
            TaskError::IncorrectOperation { .. } => "Incorrect operation",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.message().to_string(),
            description: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError(TaskError::NotFound { task_id: 1 }).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(TaskError::NoOutputAvailable { task_id: 1 }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(TaskError::IncorrectOperation {
                task_id: 1,
                status: TaskStatus::Running,
                operation: "cancel".into(),
            })
            .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
