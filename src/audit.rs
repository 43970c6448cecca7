//! # Audit Trail
//!
//! Persistent recorder for mutating API actions and authorization denials.
//! Recording is best-effort: a failed insert is logged and never fails the
//! request that triggered it.

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::auth::{Principal, TenantId};
use crate::models::audit_event;
use crate::telemetry;

/// Outcome recorded for an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditResult {
    Success,
    Denied,
    Error,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Denied => "denied",
            AuditResult::Error => "error",
        }
    }
}

/// One audit event under construction
#[derive(Debug, Clone)]
pub struct AuditEntry {
    tenant_id: Uuid,
    actor_id: Option<Uuid>,
    actor_role: Option<String>,
    action: String,
    target_type: Option<String>,
    target_id: Option<Uuid>,
    result: AuditResult,
    details: Option<JsonValue>,
}

impl AuditEntry {
    /// Start an entry for the given tenant and action slug
    /// (verb-object form, e.g. `organization.create`).
    pub fn new(tenant: TenantId, principal: &Principal, action: &str) -> Self {
        Self {
            tenant_id: tenant.0,
            actor_id: principal.actor_id(),
            actor_role: Some(principal.role_str().to_string()),
            action: action.to_string(),
            target_type: None,
            target_id: None,
            result: AuditResult::Success,
            details: None,
        }
    }

    pub fn target(mut self, target_type: &str, target_id: Uuid) -> Self {
        self.target_type = Some(target_type.to_string());
        self.target_id = Some(target_id);
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = result;
        self
    }

    pub fn details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

/// Persist an audit entry, swallowing (but logging) storage failures.
pub async fn record(db: &DatabaseConnection, entry: AuditEntry) {
    let model = audit_event::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(entry.tenant_id),
        actor_id: Set(entry.actor_id),
        actor_role: Set(entry.actor_role.clone()),
        action: Set(entry.action.clone()),
        target_type: Set(entry.target_type),
        target_id: Set(entry.target_id),
        result: Set(entry.result.as_str().to_string()),
        details: Set(entry.details),
        trace_id: Set(telemetry::current_trace_id()),
        occurred_at: Set(chrono::Utc::now().into()),
    };

    if let Err(err) = model.insert(db).await {
        tracing::warn!(
            error = ?err,
            action = %entry.action,
            tenant_id = %entry.tenant_id,
            "Failed to persist audit event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_slugs() {
        assert_eq!(AuditResult::Success.as_str(), "success");
        assert_eq!(AuditResult::Denied.as_str(), "denied");
        assert_eq!(AuditResult::Error.as_str(), "error");
    }

    #[test]
    fn entry_builder_fills_fields() {
        let tenant = TenantId(Uuid::new_v4());
        let target = Uuid::new_v4();
        let entry = AuditEntry::new(tenant, &Principal::Operator, "organization.create")
            .target("organization", target)
            .result(AuditResult::Denied)
            .details(serde_json::json!({"reason": "test"}));

        assert_eq!(entry.tenant_id, tenant.0);
        assert_eq!(entry.actor_id, None);
        assert_eq!(entry.actor_role.as_deref(), Some("operator"));
        assert_eq!(entry.target_id, Some(target));
        assert_eq!(entry.result, AuditResult::Denied);
        assert!(entry.details.is_some());
    }
}
