//! # Dashboard API Handlers
//!
//! Per-tenant aggregation computed with per-request queries: record counts
//! by status, per-organization compliance percentage, overdue counts, risk
//! counts by level, and documents entering their review window.

use std::collections::HashMap;

use axum::{extract::State, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Principal, TenantExtension};
use crate::error::ApiError;
use crate::handlers::types::ApiResponse;
use crate::repositories::{
    ApplicabilityRepository, ComplianceRecordRepository, DocumentRepository,
    OrganizationRepository, RiskRepository,
};
use crate::server::AppState;

/// Compliance summary for one organization
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrgComplianceDto {
    pub organization_id: Uuid,
    pub organization_name: String,
    /// Requirements applicable to this organization
    pub applicable: u64,
    /// Records in approved state
    pub approved: u64,
    /// approved / applicable, 0-100; 100 when nothing is applicable
    pub compliance_pct: f64,
}

/// Tenant-wide dashboard aggregation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardDto {
    /// Record counts keyed by workflow status
    pub records_by_status: HashMap<String, u64>,
    /// Records past their due date and not approved
    pub overdue_records: u64,
    /// Open risk counts keyed by level
    pub risks_by_level: HashMap<String, u64>,
    /// Approved documents due for review within 30 days
    pub documents_review_due: u64,
    pub organizations: Vec<OrgComplianceDto>,
}

/// Tenant compliance dashboard
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard computed", body = ApiResponse<DashboardDto>)
    ),
    tag = "dashboard"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    _principal: Principal,
    TenantExtension(tenant): TenantExtension,
) -> Result<Json<ApiResponse<DashboardDto>>, ApiError> {
    let today = Utc::now().date_naive();

    let records = ComplianceRecordRepository::new(&state.db);
    let records_by_status = records.status_counts(&tenant.0).await?;
    let overdue_records = records.overdue_count(&tenant.0, today).await?;

    let risks_by_level = RiskRepository::new(&state.db).level_counts(&tenant.0).await?;

    let documents_review_due = DocumentRepository::new(&state.db)
        .review_due(&tenant.0, today, 30)
        .await?
        .len() as u64;

    let applicability = ApplicabilityRepository::new(&state.db);
    let mut organizations = Vec::new();
    for org in OrganizationRepository::new(&state.db)
        .find_by_tenant(&tenant.0)
        .await?
    {
        let applicable = applicability
            .applicable_requirement_ids(&tenant.0, &org.id)
            .await?
            .len() as u64;
        let approved = records.approved_count_for_org(&tenant.0, &org.id).await?;
        organizations.push(OrgComplianceDto {
            organization_id: org.id,
            organization_name: org.name,
            applicable,
            approved,
            compliance_pct: compliance_pct(approved, applicable),
        });
    }

    Ok(Json(ApiResponse::new(DashboardDto {
        records_by_status,
        overdue_records,
        risks_by_level,
        documents_review_due,
        organizations,
    })))
}

/// Percentage of applicable requirements with an approved record.
fn compliance_pct(approved: u64, applicable: u64) -> f64 {
    if applicable == 0 {
        return 100.0;
    }
    let pct = (approved as f64 / applicable as f64) * 100.0;
    (pct * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_rounds_to_one_decimal() {
        assert_eq!(compliance_pct(1, 3), 33.3);
        assert_eq!(compliance_pct(2, 3), 66.7);
        assert_eq!(compliance_pct(3, 3), 100.0);
    }

    #[test]
    fn no_applicable_requirements_is_fully_compliant() {
        assert_eq!(compliance_pct(0, 0), 100.0);
    }

    #[test]
    fn approved_beyond_applicable_stays_above_hundred() {
        // Manual records can exist for requirements later excluded
        assert_eq!(compliance_pct(4, 2), 200.0);
    }
}
