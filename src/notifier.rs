//! # Notification Sweep
//!
//! Evaluates every enabled notification rule against its deadline window
//! and inserts pending notification rows for targets entering the window.
//! The unique (rule, target, due_at) guard in the schema keeps re-runs
//! idempotent, so the sweep can run from the background scheduler and the
//! cron endpoint interchangeably.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::is_unique_violation;
use crate::models::{
    compliance_record, control_measure, document, evidence, notification, notification_rule,
    tenant,
};

/// Event kinds a rule can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ComplianceDue,
    DocumentReviewDue,
    MeasureDue,
    EvidenceExpiring,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ComplianceDue => "compliance_due",
            EventKind::DocumentReviewDue => "document_review_due",
            EventKind::MeasureDue => "measure_due",
            EventKind::EvidenceExpiring => "evidence_expiring",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "compliance_due" => Some(EventKind::ComplianceDue),
            "document_review_due" => Some(EventKind::DocumentReviewDue),
            "measure_due" => Some(EventKind::MeasureDue),
            "evidence_expiring" => Some(EventKind::EvidenceExpiring),
            _ => None,
        }
    }
}

/// Counters from one sweep run
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct SweepStats {
    pub tenants_processed: u64,
    pub rules_evaluated: u64,
    pub notifications_created: u64,
    pub notifications_skipped_existing: u64,
    pub rules_with_errors: u64,
}

/// A deadline the sweep found inside a rule's window
#[derive(Debug, Clone)]
struct DueTarget {
    target_type: &'static str,
    target_id: Uuid,
    due_on: NaiveDate,
    subject: String,
}

/// Run the sweep across every tenant.
pub async fn run_sweep(db: &DatabaseConnection, now: DateTime<Utc>) -> anyhow::Result<SweepStats> {
    let mut stats = SweepStats::default();

    let tenants = tenant::Entity::find().all(db).await?;
    for t in tenants {
        stats.tenants_processed += 1;
        sweep_tenant(db, t.id, now, &mut stats).await?;
    }

    counter!("notification_sweep_created_total").increment(stats.notifications_created);
    counter!("notification_sweep_skipped_total").increment(stats.notifications_skipped_existing);

    debug!(
        tenants = stats.tenants_processed,
        rules = stats.rules_evaluated,
        created = stats.notifications_created,
        skipped = stats.notifications_skipped_existing,
        errors = stats.rules_with_errors,
        "Notification sweep completed"
    );

    Ok(stats)
}

/// Run the sweep for a single tenant, accumulating into `stats`.
pub async fn sweep_tenant(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    now: DateTime<Utc>,
    stats: &mut SweepStats,
) -> anyhow::Result<()> {
    let rules = notification_rule::Entity::find()
        .filter(notification_rule::Column::TenantId.eq(tenant_id))
        .filter(notification_rule::Column::Enabled.eq(true))
        .all(db)
        .await?;

    for rule in rules {
        stats.rules_evaluated += 1;
        match process_rule(db, &rule, now).await {
            Ok((created, skipped)) => {
                stats.notifications_created += created;
                stats.notifications_skipped_existing += skipped;
            }
            Err(err) => {
                stats.rules_with_errors += 1;
                warn!(
                    error = ?err,
                    rule_id = %rule.id,
                    tenant_id = %tenant_id,
                    "Failed to process notification rule"
                );
            }
        }
    }

    Ok(())
}

async fn process_rule(
    db: &DatabaseConnection,
    rule: &notification_rule::Model,
    now: DateTime<Utc>,
) -> anyhow::Result<(u64, u64)> {
    let Some(kind) = EventKind::parse(&rule.event_kind) else {
        warn!(rule_id = %rule.id, event_kind = %rule.event_kind, "Unknown event kind on rule");
        return Ok((0, 0));
    };

    let window_end = now.date_naive() + chrono::Duration::days(rule.days_before.max(0) as i64);
    let targets = find_due_targets(db, rule.tenant_id, kind, window_end).await?;

    let mut created = 0u64;
    let mut skipped = 0u64;

    for target in targets {
        let due_at = target.due_on.and_time(NaiveTime::MIN).and_utc();
        let message = format!(
            "{} due {:04}-{:02}-{:02}",
            target.subject,
            target.due_on.year(),
            target.due_on.month(),
            target.due_on.day()
        );

        let model = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(rule.tenant_id),
            rule_id: Set(rule.id),
            target_type: Set(target.target_type.to_string()),
            target_id: Set(target.target_id),
            message: Set(message),
            due_at: Set(due_at.into()),
            status: Set("pending".to_string()),
            created_at: Set(now.into()),
        };

        match model.insert(db).await {
            Ok(_) => created += 1,
            // Re-runs hit the (rule, target, due_at) unique guard
            Err(err) if is_unique_violation(&err) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }

    Ok((created, skipped))
}

async fn find_due_targets(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    kind: EventKind,
    window_end: NaiveDate,
) -> anyhow::Result<Vec<DueTarget>> {
    let targets = match kind {
        EventKind::ComplianceDue => compliance_record::Entity::find()
            .filter(compliance_record::Column::TenantId.eq(tenant_id))
            .filter(compliance_record::Column::DueDate.is_not_null())
            .filter(compliance_record::Column::DueDate.lte(window_end))
            .filter(compliance_record::Column::Status.ne("approved"))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|record| {
                record.due_date.map(|due_on| DueTarget {
                    target_type: "compliance_record",
                    target_id: record.id,
                    due_on,
                    subject: "Compliance record".to_string(),
                })
            })
            .collect(),
        EventKind::DocumentReviewDue => document::Entity::find()
            .filter(document::Column::TenantId.eq(tenant_id))
            .filter(document::Column::NextReviewAt.is_not_null())
            .filter(document::Column::NextReviewAt.lte(window_end))
            .filter(document::Column::Status.eq("approved"))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|doc| {
                doc.next_review_at.map(|due_on| DueTarget {
                    target_type: "document",
                    target_id: doc.id,
                    due_on,
                    subject: format!("Review of document \"{}\"", doc.title),
                })
            })
            .collect(),
        EventKind::MeasureDue => control_measure::Entity::find()
            .filter(control_measure::Column::TenantId.eq(tenant_id))
            .filter(control_measure::Column::DueDate.is_not_null())
            .filter(control_measure::Column::DueDate.lte(window_end))
            .filter(control_measure::Column::Status.ne("verified"))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|measure| {
                measure.due_date.map(|due_on| DueTarget {
                    target_type: "control_measure",
                    target_id: measure.id,
                    due_on,
                    subject: format!("Control measure \"{}\"", measure.title),
                })
            })
            .collect(),
        EventKind::EvidenceExpiring => evidence::Entity::find()
            .filter(evidence::Column::TenantId.eq(tenant_id))
            .filter(evidence::Column::ValidUntil.is_not_null())
            .filter(evidence::Column::ValidUntil.lte(window_end))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|item| {
                item.valid_until.map(|due_on| DueTarget {
                    target_type: "evidence",
                    target_id: item.id,
                    due_on,
                    subject: format!("Evidence \"{}\" expires", item.title),
                })
            })
            .collect(),
    };

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips() {
        for kind in [
            EventKind::ComplianceDue,
            EventKind::DocumentReviewDue,
            EventKind::MeasureDue,
            EventKind::EvidenceExpiring,
        ] {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("something_else"), None);
    }
}
