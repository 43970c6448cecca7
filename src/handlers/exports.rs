//! # Export API Handlers
//!
//! Compliance register downloads as xlsx or CSV.

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};

use crate::audit::{AuditEntry, record};
use crate::auth::{Permission, Principal, TenantExtension};
use crate::error::ApiError;
use crate::export::{register_csv, register_xlsx};
use crate::handlers::types::authorize;
use crate::repositories::ComplianceRecordRepository;
use crate::server::AppState;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn download_headers(content_type: &'static str, file_name: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers
}

/// Download the compliance register as an xlsx workbook
#[utoipa::path(
    get,
    path = "/api/v1/exports/compliance.xlsx",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Workbook bytes", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "exports"
)]
pub async fn compliance_xlsx(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, tenant, &principal, Permission::ExportRegister, "export.compliance_xlsx")
        .await?;

    let rows = ComplianceRecordRepository::new(&state.db)
        .register_rows(&tenant.0)
        .await?;
    let bytes = register_xlsx(&rows).map_err(ApiError::from)?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "export.compliance_xlsx")
            .details(serde_json::json!({ "rows": rows.len() })),
    )
    .await;

    Ok((download_headers(XLSX_CONTENT_TYPE, "compliance.xlsx"), bytes))
}

/// Download the compliance register as CSV
#[utoipa::path(
    get,
    path = "/api/v1/exports/compliance.csv",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV bytes", content_type = "text/csv"),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "exports"
)]
pub async fn compliance_csv(
    State(state): State<AppState>,
    principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, tenant, &principal, Permission::ExportRegister, "export.compliance_csv")
        .await?;

    let rows = ComplianceRecordRepository::new(&state.db)
        .register_rows(&tenant.0)
        .await?;
    let bytes = register_csv(&rows).map_err(ApiError::from)?;

    record(
        &state.db,
        AuditEntry::new(tenant, &principal, "export.compliance_csv")
            .details(serde_json::json!({ "rows": rows.len() })),
    )
    .await;

    Ok((download_headers("text/csv", "compliance.csv"), bytes))
}
