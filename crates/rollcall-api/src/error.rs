//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Component errors
//! (`CoordinatorError`, `StorageError`, validation failures) convert into
//! `HttpAppError` through `AppError`, so every failure renders the same
//! `ErrorResponse` body and is logged at the level its metadata asks for.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rollcall_core::{AppError, ErrorMetadata, LogLevel};
use rollcall_services::QrError;
use rollcall_storage::StorageError;
use rollcall_worker::CoordinatorError;
use serde::de::DeserializeOwned;

pub use rollcall_infra::ErrorResponse;

/// Local wrapper so `IntoResponse` can be implemented for `AppError`.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<validator::ValidationErrors> for HttpAppError {
    fn from(err: validator::ValidationErrors) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that rejects malformed bodies with an `ErrorResponse`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| {
            let env = env.to_lowercase();
            env == "production" || env == "prod"
        })
        .unwrap_or(false)
}

fn error_body(app_error: &AppError, show_details: bool) -> ErrorResponse {
    ErrorResponse {
        error: app_error.client_message(),
        details: show_details.then(|| app_error.detailed_message()),
        error_type: show_details.then(|| app_error.error_type().to_string()),
        code: app_error.error_code().to_string(),
        recoverable: app_error.is_recoverable(),
        suggested_action: app_error.suggested_action().map(String::from),
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details never leave the process in production or for sensitive errors.
        let show_details = !is_production_env() && !app_error.is_sensitive();
        (status, Json(error_body(app_error, show_details))).into_response()
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<CoordinatorError> for HttpAppError {
    fn from(err: CoordinatorError) -> Self {
        let app = match err {
            CoordinatorError::Format(e) => AppError::InvalidLink(e),
            CoordinatorError::Reconstruction(e) => AppError::Reconstruction(e.to_string()),
            CoordinatorError::Qr(e @ QrError::Encode(_)) => AppError::InvalidInput(e.to_string()),
            CoordinatorError::Qr(e) => AppError::Internal(e.to_string()),
            CoordinatorError::Storage(e) => AppError::Storage(e.to_string()),
        };
        HttpAppError(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::FormatError;
    use rollcall_services::{ReconstructionError, RejectionCause};

    #[test]
    fn test_storage_not_found_maps_to_404() {
        let HttpAppError(app_err) = StorageError::NotFound("qr/missing.png".to_string()).into();
        assert!(matches!(app_err, AppError::NotFound(ref msg) if msg == "qr/missing.png"));
        assert_eq!(app_err.http_status_code(), 404);
    }

    #[test]
    fn test_storage_failures_map_to_storage_error() {
        let HttpAppError(app_err) = StorageError::AlreadyExists("qr/a.png".to_string()).into();
        assert_eq!(app_err.error_code(), "STORAGE_ERROR");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let HttpAppError(app_err) = StorageError::IoError(io).into();
        assert_eq!(app_err.http_status_code(), 500);
    }

    #[test]
    fn test_coordinator_errors_keep_their_status() {
        let HttpAppError(app_err) = CoordinatorError::Format(FormatError::Empty).into();
        assert_eq!(app_err.http_status_code(), 400);
        assert_eq!(app_err.error_code(), "INVALID_LINK_FORMAT");

        let reconstruction = ReconstructionError {
            attempts: 2,
            cause: RejectionCause::NoLink,
        };
        let HttpAppError(app_err) = CoordinatorError::Reconstruction(reconstruction).into();
        assert_eq!(app_err.http_status_code(), 502);
        assert_eq!(app_err.error_code(), "RECONSTRUCTION_FAILED");
        assert!(app_err.client_message().contains("2 attempt"));

        let HttpAppError(app_err) =
            CoordinatorError::Storage(StorageError::NotFound("qr/a.png".to_string())).into();
        assert_eq!(app_err.error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_unencodable_link_is_client_error() {
        let HttpAppError(app_err) =
            CoordinatorError::Qr(QrError::Encode("data too long".to_string())).into();
        assert_eq!(app_err.http_status_code(), 400);
        assert_eq!(app_err.error_code(), "INVALID_INPUT");
        assert!(app_err.client_message().contains("data too long"));

        let HttpAppError(app_err) =
            CoordinatorError::Qr(QrError::Png("encoder failed".to_string())).into();
        assert_eq!(app_err.http_status_code(), 500);
    }

    #[test]
    fn test_sensitive_errors_hide_details() {
        let body = error_body(&AppError::Internal("db password leaked".to_string()), false);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }

    #[test]
    fn test_error_body_with_details() {
        let body = error_body(&AppError::from(FormatError::MissingIdentifier), true);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["code"], "INVALID_LINK_FORMAT");
        assert_eq!(json["recoverable"], false);
        assert_eq!(json["error_type"], "FormatError");
        assert!(json["suggested_action"].is_string());
    }
}
