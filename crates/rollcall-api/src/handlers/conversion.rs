//! Conversion, evening derivation, manual trigger and QR-only endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rollcall_core::models::{ConversionMode, ConversionRequest, Credentials};
use rollcall_core::{AppError, AttendanceLink, Config, LinkCodec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::handlers::{filename_of, SubmitReceiptResponse};
use crate::state::AppState;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ConvertExpiredRequest {
    /// Expired attendance link as scanned from the QR code
    #[validate(length(min = 1, max = 2048))]
    pub qr_link: String,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub module_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct EveningQrRequest {
    /// Morning attendance link the evening link is derived from
    #[validate(length(min = 1, max = 2048))]
    pub morning_qr_link: String,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub module_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceRequest {
    /// Already converted link to submit
    #[validate(length(min = 1, max = 2048))]
    pub qr_link: String,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub module_name: String,
    /// Link the converted one was produced from, kept on the record
    pub original_qr: Option<String>,
    #[serde(default)]
    pub is_evening: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateQrRequest {
    #[validate(length(min = 1, max = 2048))]
    pub qr_link: String,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub module_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateQrResponse {
    pub module_name: String,
    pub converted_link: String,
    pub qr_image_url: String,
    pub qr_filename: String,
}

/// Directory part of the portal page URL, e.g. `https://students.nsbm.ac.lk/attendence/`.
fn portal_prefix(codec: &LinkCodec) -> &str {
    let base = codec.base_url();
    match base.rfind('/') {
        Some(i) => &base[..=i],
        None => base,
    }
}

/// Accept only portal links that carry a well-formed `id` parameter.
pub(crate) fn parse_portal_link(codec: &LinkCodec, raw: &str) -> Result<AttendanceLink, AppError> {
    let raw = raw.trim();
    let prefix = portal_prefix(codec);
    if !raw.starts_with(prefix) {
        return Err(AppError::InvalidInput(format!(
            "Link must start with {}",
            prefix
        )));
    }
    Ok(codec.parse(raw)?)
}

/// Request credentials, falling back field by field to the configured defaults.
/// Missing credentials are not rejected here; the submission fails at login.
fn resolve_credentials(
    config: &Config,
    username: Option<String>,
    password: Option<String>,
) -> Credentials {
    let defaults = config.default_credentials();
    let username = username
        .filter(|u| !u.trim().is_empty())
        .or_else(|| defaults.as_ref().map(|c| c.username.clone()))
        .unwrap_or_default();
    let password = password
        .filter(|p| !p.is_empty())
        .or_else(|| defaults.as_ref().map(|c| c.password.clone()))
        .unwrap_or_default();
    Credentials::new(username, password)
}

async fn submit_conversion(
    state: &AppState,
    module_name: String,
    raw_link: &str,
    mode: ConversionMode,
    credentials: Credentials,
) -> Result<(StatusCode, Json<SubmitReceiptResponse>), HttpAppError> {
    let original_link = parse_portal_link(state.coordinator.reconstructor().codec(), raw_link)?;
    let request = ConversionRequest {
        module_name: module_name.trim().to_string(),
        original_link,
        mode,
        credentials,
    };

    let receipt = state.coordinator.submit(request).await?;
    tracing::info!(
        task_id = %receipt.task.task_id(),
        outcome = %receipt.outcome,
        converted_link = %receipt.task.converted_link(),
        "Conversion accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitReceiptResponse::new(&receipt, state.storage.as_ref())),
    ))
}

/// Convert an expired link to the live one and schedule the submission.
#[utoipa::path(
    post,
    path = "/api/convert-expired-qr",
    tag = "attendance",
    request_body = ConvertExpiredRequest,
    responses(
        (status = 202, description = "Submission scheduled; poll the task", body = SubmitReceiptResponse),
        (status = 400, description = "Invalid link or request", body = ErrorResponse),
        (status = 502, description = "Link reconstruction failed", body = ErrorResponse),
        (status = 500, description = "QR image could not be stored", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(module_name = %request.module_name))]
pub async fn convert_expired_qr(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConvertExpiredRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let credentials = resolve_credentials(&state.config, request.username, request.password);
    submit_conversion(
        &state,
        request.module_name,
        &request.qr_link,
        ConversionMode::ExpiredConversion,
        credentials,
    )
    .await
}

/// Derive the evening-session link from a morning link and schedule the submission.
#[utoipa::path(
    post,
    path = "/api/create-evening-qr",
    tag = "attendance",
    request_body = EveningQrRequest,
    responses(
        (status = 202, description = "Submission scheduled; poll the task", body = SubmitReceiptResponse),
        (status = 400, description = "Invalid link or request", body = ErrorResponse),
        (status = 502, description = "Link reconstruction failed", body = ErrorResponse),
        (status = 500, description = "QR image could not be stored", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(module_name = %request.module_name))]
pub async fn create_evening_qr(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<EveningQrRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    let credentials = resolve_credentials(&state.config, request.username, request.password);
    submit_conversion(
        &state,
        request.module_name,
        &request.morning_qr_link,
        ConversionMode::EveningDerivation,
        credentials,
    )
    .await
}

/// Submit attendance for a link converted earlier, without reconstruction.
#[utoipa::path(
    post,
    path = "/api/mark-attendance",
    tag = "attendance",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 202, description = "Submission scheduled; poll the task", body = SubmitReceiptResponse),
        (status = 400, description = "Invalid link or request", body = ErrorResponse),
        (status = 500, description = "QR image could not be stored", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(module_name = %request.module_name, is_evening = request.is_evening))]
pub async fn mark_attendance(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<MarkAttendanceRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;

    let codec = state.coordinator.reconstructor().codec();
    let converted = parse_portal_link(codec, &request.qr_link)?;
    let mode = if request.is_evening {
        ConversionMode::EveningDerivation
    } else {
        ConversionMode::ExpiredConversion
    };
    let original_link = request
        .original_qr
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty());
    let credentials = resolve_credentials(&state.config, request.username, request.password);

    let receipt = state
        .coordinator
        .submit_converted(
            request.module_name.trim().to_string(),
            mode,
            converted.raw(),
            original_link,
            credentials,
        )
        .await?;
    tracing::info!(
        task_id = %receipt.task.task_id(),
        outcome = %receipt.outcome,
        "Manual submission accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitReceiptResponse::new(&receipt, state.storage.as_ref())),
    ))
}

/// Render and store a QR image for a valid link without submitting anything.
#[utoipa::path(
    post,
    path = "/api/generate-qr-only",
    tag = "attendance",
    request_body = GenerateQrRequest,
    responses(
        (status = 200, description = "QR image stored", body = GenerateQrResponse),
        (status = 400, description = "Invalid link or request", body = ErrorResponse),
        (status = 500, description = "QR image could not be stored", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(module_name = %request.module_name))]
pub async fn generate_qr_only(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<GenerateQrRequest>,
) -> Result<Json<GenerateQrResponse>, HttpAppError> {
    request.validate()?;

    let link = parse_portal_link(state.coordinator.reconstructor().codec(), &request.qr_link)?;
    let key = state.coordinator.store_qr(&link).await?;
    tracing::debug!(storage_key = %key, "QR image generated");

    Ok(Json(GenerateQrResponse {
        module_name: request.module_name.trim().to_string(),
        converted_link: link.raw().to_string(),
        qr_image_url: state.storage.public_url(&key),
        qr_filename: filename_of(&key).to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{AttendanceConfig, FormatError};

    #[test]
    fn test_portal_prefix_is_page_directory() {
        assert_eq!(
            portal_prefix(&LinkCodec::default()),
            "https://students.nsbm.ac.lk/attendence/"
        );
    }

    #[test]
    fn test_parse_portal_link() {
        let codec = LinkCodec::default();
        let link = parse_portal_link(
            &codec,
            " https://students.nsbm.ac.lk/attendence/index.php?id=52202002751_90017 ",
        )
        .unwrap();
        assert_eq!(link.identifier(), "52202002751_90017");

        let err = parse_portal_link(&codec, "https://evil.example.com/index.php?id=1_2").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = parse_portal_link(
            &codec,
            "https://students.nsbm.ac.lk/attendence/index.php?id=52202002751",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidLink(FormatError::MissingSeparator(_))
        ));
    }

    #[test]
    fn test_credentials_fall_back_per_field() {
        let config = Config::new(AttendanceConfig {
            default_username: Some("default-user".to_string()),
            default_password: Some("default-pass".to_string()),
            ..AttendanceConfig::default()
        });

        let creds = resolve_credentials(&config, Some("student42".to_string()), None);
        assert_eq!(creds.username, "student42");
        assert_eq!(creds.password, "default-pass");

        let creds = resolve_credentials(&config, Some("  ".to_string()), Some("pw".to_string()));
        assert_eq!(creds.username, "default-user");
        assert_eq!(creds.password, "pw");

        let creds = resolve_credentials(&Config::new(AttendanceConfig::default()), None, None);
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_blank_module_name_is_rejected() {
        let request = GenerateQrRequest {
            qr_link: "https://students.nsbm.ac.lk/attendence/index.php?id=1_2".to_string(),
            module_name: "   ".to_string(),
        };
        assert!(request.validate().is_err());

        let request = GenerateQrRequest {
            module_name: "x".repeat(101),
            ..request
        };
        assert!(request.validate().is_err());
    }
}
