use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::views::RenderError;

/// Generic detail shown instead of the raw store message when error exposure is off.
pub const HIDDEN_DETAIL: &str = "belső hiba";

/// AppError
///
/// Failures a handler hands back to the client. Every variant renders as a short
/// plain-text body; there is no structured error page.
#[derive(Debug, Error)]
pub enum AppError {
    /// A store call failed on a route that reports it. `context` is the
    /// user-facing prefix ("Hiba", "Mentési hiba", ...).
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        source: sqlx::Error,
        expose: bool,
    },

    /// A required form field was missing or malformed.
    #[error("{0}")]
    Validation(&'static str),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("password hashing failed: {0}")]
    Password(String),
}

impl AppError {
    pub fn store(context: &'static str, source: sqlx::Error, expose: bool) -> Self {
        AppError::Store {
            context,
            source,
            expose,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Store {
                context,
                source,
                expose,
            } => {
                tracing::error!(context = %context, error = %source, "store query failed");
                let detail = if *expose {
                    source.to_string()
                } else {
                    HIDDEN_DETAIL.to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("{}: {}", context, detail),
                )
            }
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            AppError::Session(e) => {
                tracing::error!("session store error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Munkamenet hiba".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("render error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Megjelenítési hiba".to_string(),
                )
            }
            AppError::Password(e) => {
                tracing::error!("password hashing error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Hiba történt!".to_string())
            }
        };

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
