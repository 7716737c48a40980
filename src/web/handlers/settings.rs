//! Storage administration handlers.

use axum::{extract::State, Form, Json};
use std::sync::Arc;

use crate::file::{QuotaStatus, StorageLimits, StorageSettings, SweepReport};
use crate::web::dto::{ApiResponse, QuotaForm, StorageSettingsForm};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /settings/storage - Current limits and usage.
pub async fn get_storage_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StorageSettings>>, ApiError> {
    let settings = state.file_service().storage_settings().await?;

    Ok(Json(ApiResponse::new(settings)))
}

/// POST /settings/storage - Set the quota and single-file limit.
pub async fn set_storage_settings(
    State(state): State<Arc<AppState>>,
    Form(form): Form<StorageSettingsForm>,
) -> Result<Json<ApiResponse<StorageLimits>>, ApiError> {
    let limits = state
        .file_service()
        .update_storage_settings(
            form.quota_size.as_deref(),
            form.quota_unit.as_deref(),
            form.file_size.as_deref(),
            form.file_unit.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::new(limits)))
}

/// POST /settings/quota - Set the quota in GB.
pub async fn set_quota(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuotaForm>,
) -> Result<Json<ApiResponse<QuotaStatus>>, ApiError> {
    let status = state
        .file_service()
        .set_quota(form.quota_gb.as_deref())
        .await?;

    Ok(Json(ApiResponse::new(status)))
}

/// POST /cleanup - Sweep expired files now.
pub async fn run_cleanup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SweepReport>>, ApiError> {
    let report = state.file_service().manual_sweep().await?;

    Ok(Json(ApiResponse::new(report)))
}
