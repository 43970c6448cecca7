//! Requirement catalog seeding
//!
//! Populates the shared catalog (tenant_id NULL) with the core Russian
//! information-security baseline and the applicability rules that key each
//! requirement to organization profile attributes. Seeding is idempotent:
//! rows are matched by code and skipped when present.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::models::{applicability_rule, requirement};

struct CatalogEntry {
    code: &'static str,
    title: &'static str,
    description: &'static str,
    regulator: &'static str,
    category: &'static str,
    rule: CatalogRule,
}

#[derive(Default)]
struct CatalogRule {
    kii_categories: Option<&'static [i32]>,
    pdn_levels: Option<&'static [i32]>,
    requires_financial: Option<bool>,
}

fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            code: "152-ФЗ ст.18.1",
            title: "Organizational measures for personal data protection",
            description: "Appoint a responsible person, publish the privacy policy and apply \
                          organizational measures required of personal data operators.",
            regulator: "rkn",
            category: "pdn",
            rule: CatalogRule {
                pdn_levels: Some(&[1, 2, 3, 4]),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "152-ФЗ ст.19",
            title: "Security of personal data processing",
            description: "Ensure the security of personal data during processing, including \
                          protection against unauthorized access.",
            regulator: "rkn",
            category: "pdn",
            rule: CatalogRule {
                pdn_levels: Some(&[1, 2, 3, 4]),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "РКН уведомление",
            title: "Operator registration with the personal data authority",
            description: "Submit the processing notification before starting personal data \
                          processing.",
            regulator: "rkn",
            category: "pdn",
            rule: CatalogRule {
                pdn_levels: Some(&[1, 2, 3, 4]),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "Приказ ФСТЭК №21",
            title: "Technical protection measures for personal data systems",
            description: "Apply the measure set matching the declared protection level of the \
                          personal data information system.",
            regulator: "fstec",
            category: "pdn",
            rule: CatalogRule {
                pdn_levels: Some(&[1, 2, 3, 4]),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "187-ФЗ ст.10",
            title: "Security systems for critical information infrastructure",
            description: "Create a security system for significant objects of critical \
                          information infrastructure.",
            regulator: "fstec",
            category: "kii",
            rule: CatalogRule {
                kii_categories: Some(&[1, 2, 3]),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "Приказ ФСТЭК №239",
            title: "Requirements for significant KII objects",
            description: "Implement the protection requirements for significant objects of \
                          critical information infrastructure.",
            regulator: "fstec",
            category: "kii",
            rule: CatalogRule {
                kii_categories: Some(&[1, 2, 3]),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "ГОСТ Р 57580.1",
            title: "Financial operations security baseline",
            description: "Apply the GOST R 57580.1 protection level required for financial \
                          organizations.",
            regulator: "cbr",
            category: "financial",
            rule: CatalogRule {
                requires_financial: Some(true),
                ..Default::default()
            },
        },
        CatalogEntry {
            code: "683-П",
            title: "Bank of Russia requirements for credit organizations",
            description: "Meet the information security requirements of regulation 683-P for \
                          banking operations.",
            regulator: "cbr",
            category: "financial",
            rule: CatalogRule {
                requires_financial: Some(true),
                ..Default::default()
            },
        },
    ]
}

/// Seeds the shared requirement catalog.
pub async fn seed_requirement_catalog(db: &DatabaseConnection) -> Result<()> {
    for entry in catalog() {
        let existing = requirement::Entity::find()
            .filter(requirement::Column::TenantId.is_null())
            .filter(requirement::Column::Code.eq(entry.code))
            .one(db)
            .await?;

        if existing.is_some() {
            log::debug!("Catalog requirement '{}' already exists, skipping", entry.code);
            continue;
        }

        log::info!("Seeding catalog requirement: {}", entry.code);

        let now = Utc::now();
        let requirement_id = Uuid::new_v4();
        let model = requirement::ActiveModel {
            id: Set(requirement_id),
            tenant_id: Set(None),
            code: Set(entry.code.to_string()),
            title: Set(entry.title.to_string()),
            description: Set(Some(entry.description.to_string())),
            regulator: Set(entry.regulator.to_string()),
            category: Set(entry.category.to_string()),
            effective_from: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        model.insert(db).await?;

        let rule = applicability_rule::ActiveModel {
            id: Set(Uuid::new_v4()),
            requirement_id: Set(requirement_id),
            kii_categories: Set(entry.rule.kii_categories.map(|v| serde_json::json!(v))),
            pdn_levels: Set(entry.rule.pdn_levels.map(|v| serde_json::json!(v))),
            sectors: Set(None),
            min_employee_count: Set(None),
            max_employee_count: Set(None),
            requires_financial: Set(entry.rule.requires_financial),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        rule.insert(db).await?;
    }

    Ok(())
}
