//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use rollcall_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rollcall API",
        version = "0.1.0",
        description = "Converts expired or morning attendance QR links into live ones, submits attendance through the university portal in the background and keeps a record of every outcome. Conversion endpoints answer 202 with a task id; poll /api/tasks/{task_id} for the result."
    ),
    paths(
        handlers::health::health_check,
        handlers::conversion::convert_expired_qr,
        handlers::conversion::create_evening_qr,
        handlers::conversion::mark_attendance,
        handlers::conversion::generate_qr_only,
        handlers::tasks::get_task,
        handlers::records::today_records,
        handlers::records::module_records,
        handlers::artifacts::download_artifact,
    ),
    components(
        schemas(
            ErrorResponse,
            handlers::SubmitReceiptResponse,
            handlers::TaskResponse,
            handlers::conversion::ConvertExpiredRequest,
            handlers::conversion::EveningQrRequest,
            handlers::conversion::MarkAttendanceRequest,
            handlers::conversion::GenerateQrRequest,
            handlers::conversion::GenerateQrResponse,
            handlers::records::TodayRecordsResponse,
            handlers::records::ModuleRecordsResponse,
            handlers::health::HealthCheckResponse,
            models::AttendanceRecord,
            models::RecordStatus,
            models::ConversionMode,
            models::TaskStatus,
            models::SubmissionError,
        )
    ),
    tags(
        (name = "attendance", description = "Link conversion and attendance submission"),
        (name = "tasks", description = "Background submission tasks"),
        (name = "records", description = "Persisted attendance records"),
        (name = "artifacts", description = "QR images and portal screenshots"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/health",
            "/api/convert-expired-qr",
            "/api/create-evening-qr",
            "/api/mark-attendance",
            "/api/generate-qr-only",
            "/api/tasks/{task_id}",
            "/api/records/today",
            "/api/records/module/{module_name}",
            "/api/download/{kind}/{filename}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
