use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::notification::NotificationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid budget notification: {0}")]
    Notification(#[from] NotificationError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Notification(_) => StatusCode::BAD_REQUEST,
        };
        tracing::error!(error = %self, "rejecting push message");
        (status, self.to_string()).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
