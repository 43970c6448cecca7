//! # Applicability Engine
//!
//! Computes the subset of organizations a requirement applies to.
//!
//! A requirement carries zero or more declarative filter rules evaluated
//! against organization profile attributes. Within one rule every present
//! predicate must match (AND); a rule set matches when any rule matches
//! (OR). An absent predicate is a wildcard. Manual include/exclude
//! overrides always win over automatic matches.
//!
//! Evaluation is a synchronous pass over the tenant's organizations; there
//! is no indexing, incremental recomputation, or caching.

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::{applicability_rule, organization};

/// Organization attributes the rules are evaluated against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgProfile {
    pub id: Uuid,
    pub kii_category: i32,
    pub pdn_level: i32,
    pub sector: String,
    pub employee_count: i32,
    pub is_financial: bool,
}

impl From<&organization::Model> for OrgProfile {
    fn from(model: &organization::Model) -> Self {
        Self {
            id: model.id,
            kii_category: model.kii_category,
            pdn_level: model.pdn_level,
            sector: model.sector.clone(),
            employee_count: model.employee_count,
            is_financial: model.is_financial,
        }
    }
}

/// One filter rule; every `Some` predicate must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub id: Uuid,
    pub kii_categories: Option<Vec<i32>>,
    pub pdn_levels: Option<Vec<i32>>,
    pub sectors: Option<Vec<String>>,
    pub min_employee_count: Option<i32>,
    pub max_employee_count: Option<i32>,
    pub requires_financial: Option<bool>,
}

impl Rule {
    /// Evaluate this rule against one organization profile.
    pub fn matches(&self, org: &OrgProfile) -> bool {
        if let Some(categories) = &self.kii_categories
            && !categories.contains(&org.kii_category)
        {
            return false;
        }
        if let Some(levels) = &self.pdn_levels
            && !levels.contains(&org.pdn_level)
        {
            return false;
        }
        if let Some(sectors) = &self.sectors
            && !sectors.iter().any(|s| s == &org.sector)
        {
            return false;
        }
        if let Some(min) = self.min_employee_count
            && org.employee_count < min
        {
            return false;
        }
        if let Some(max) = self.max_employee_count
            && org.employee_count > max
        {
            return false;
        }
        if let Some(financial) = self.requires_financial
            && org.is_financial != financial
        {
            return false;
        }
        true
    }
}

impl From<&applicability_rule::Model> for Rule {
    fn from(model: &applicability_rule::Model) -> Self {
        Self {
            id: model.id,
            kii_categories: model.kii_categories.as_ref().map(json_int_list),
            pdn_levels: model.pdn_levels.as_ref().map(json_int_list),
            sectors: model.sectors.as_ref().map(json_string_list),
            min_employee_count: model.min_employee_count,
            max_employee_count: model.max_employee_count,
            requires_financial: model.requires_financial,
        }
    }
}

fn json_int_list(value: &JsonValue) -> Vec<i32> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_i64())
                .map(|v| v as i32)
                .collect()
        })
        .unwrap_or_default()
}

fn json_string_list(value: &JsonValue) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Where a mapping row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingSource {
    Automatic,
    ManualInclude,
    ManualExclude,
}

impl MappingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingSource::Automatic => "automatic",
            MappingSource::ManualInclude => "manual_include",
            MappingSource::ManualExclude => "manual_exclude",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "automatic" => Some(MappingSource::Automatic),
            "manual_include" => Some(MappingSource::ManualInclude),
            "manual_exclude" => Some(MappingSource::ManualExclude),
            _ => None,
        }
    }
}

/// Manual override for one (requirement, organization) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualOverride {
    pub organization_id: Uuid,
    pub include: bool,
}

/// Classification of one organization against the requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub organization_id: Uuid,
    pub source: MappingSource,
    pub matched_rule_id: Option<Uuid>,
}

/// Classify the given organizations against a requirement's rule set.
///
/// Every organization with a manual override yields exactly one row with
/// that override's source, regardless of what the rules say. Organizations
/// without an override yield an `automatic` row when any rule matches
/// (tagged with the first matching rule) and no row otherwise.
pub fn classify(
    organizations: &[OrgProfile],
    rules: &[Rule],
    overrides: &[ManualOverride],
) -> Vec<Classified> {
    let mut result = Vec::new();

    for org in organizations {
        if let Some(manual) = overrides.iter().find(|o| o.organization_id == org.id) {
            result.push(Classified {
                organization_id: org.id,
                source: if manual.include {
                    MappingSource::ManualInclude
                } else {
                    MappingSource::ManualExclude
                },
                matched_rule_id: None,
            });
            continue;
        }

        if let Some(rule) = rules.iter().find(|rule| rule.matches(org)) {
            result.push(Classified {
                organization_id: org.id,
                source: MappingSource::Automatic,
                matched_rule_id: Some(rule.id),
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(kii: i32, pdn: i32, sector: &str, employees: i32, financial: bool) -> OrgProfile {
        OrgProfile {
            id: Uuid::new_v4(),
            kii_category: kii,
            pdn_level: pdn,
            sector: sector.to_string(),
            employee_count: employees,
            is_financial: financial,
        }
    }

    fn rule() -> Rule {
        Rule {
            id: Uuid::new_v4(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_rule_matches_everything() {
        let r = rule();
        assert!(r.matches(&org(0, 0, "telecom", 10, false)));
        assert!(r.matches(&org(3, 4, "energy", 100_000, true)));
    }

    #[test]
    fn predicates_are_anded_within_a_rule() {
        let r = Rule {
            kii_categories: Some(vec![1, 2, 3]),
            sectors: Some(vec!["energy".to_string()]),
            ..rule()
        };
        assert!(r.matches(&org(2, 0, "energy", 50, false)));
        // KII matches, sector does not
        assert!(!r.matches(&org(2, 0, "telecom", 50, false)));
        // Sector matches, KII does not
        assert!(!r.matches(&org(0, 0, "energy", 50, false)));
    }

    #[test]
    fn employee_count_bounds_are_inclusive() {
        let r = Rule {
            min_employee_count: Some(50),
            max_employee_count: Some(250),
            ..rule()
        };
        assert!(!r.matches(&org(0, 0, "it", 49, false)));
        assert!(r.matches(&org(0, 0, "it", 50, false)));
        assert!(r.matches(&org(0, 0, "it", 250, false)));
        assert!(!r.matches(&org(0, 0, "it", 251, false)));
    }

    #[test]
    fn financial_flag_must_equal_when_present() {
        let r = Rule {
            requires_financial: Some(true),
            ..rule()
        };
        assert!(r.matches(&org(0, 1, "banking", 10, true)));
        assert!(!r.matches(&org(0, 1, "banking", 10, false)));
    }

    #[test]
    fn rules_are_ored_and_first_match_is_tagged() {
        let kii_rule = Rule {
            kii_categories: Some(vec![1, 2, 3]),
            ..rule()
        };
        let pdn_rule = Rule {
            pdn_levels: Some(vec![3, 4]),
            ..rule()
        };
        let orgs = vec![org(0, 4, "it", 10, false)];
        let classified = classify(&orgs, &[kii_rule.clone(), pdn_rule.clone()], &[]);

        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].source, MappingSource::Automatic);
        // First rule does not match, second does
        assert_eq!(classified[0].matched_rule_id, Some(pdn_rule.id));
    }

    #[test]
    fn non_matching_org_yields_no_row() {
        let r = Rule {
            kii_categories: Some(vec![1]),
            ..rule()
        };
        let classified = classify(&[org(0, 0, "it", 10, false)], &[r], &[]);
        assert!(classified.is_empty());
    }

    #[test]
    fn manual_exclude_wins_over_automatic_match() {
        let r = rule(); // matches everything
        let target = org(1, 1, "energy", 10, false);
        let overrides = vec![ManualOverride {
            organization_id: target.id,
            include: false,
        }];

        let classified = classify(std::slice::from_ref(&target), &[r], &overrides);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].source, MappingSource::ManualExclude);
        assert_eq!(classified[0].matched_rule_id, None);
    }

    #[test]
    fn manual_include_wins_when_no_rule_matches() {
        let r = Rule {
            kii_categories: Some(vec![3]),
            ..rule()
        };
        let target = org(0, 0, "it", 10, false);
        let overrides = vec![ManualOverride {
            organization_id: target.id,
            include: true,
        }];

        let classified = classify(std::slice::from_ref(&target), &[r], &overrides);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].source, MappingSource::ManualInclude);
    }

    #[test]
    fn classification_is_deterministic() {
        let rules = vec![
            Rule {
                sectors: Some(vec!["energy".to_string()]),
                ..rule()
            },
            Rule {
                pdn_levels: Some(vec![1, 2]),
                ..rule()
            },
        ];
        let orgs = vec![
            org(0, 1, "energy", 10, false),
            org(0, 0, "it", 10, false),
            org(2, 2, "healthcare", 700, false),
        ];

        let first = classify(&orgs, &rules, &[]);
        let second = classify(&orgs, &rules, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn rule_from_model_parses_json_lists() {
        let model = applicability_rule::Model {
            id: Uuid::new_v4(),
            requirement_id: Uuid::new_v4(),
            kii_categories: Some(serde_json::json!([1, 2])),
            pdn_levels: None,
            sectors: Some(serde_json::json!(["energy", "telecom"])),
            min_employee_count: Some(10),
            max_employee_count: None,
            requires_financial: None,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };

        let rule = Rule::from(&model);
        assert_eq!(rule.kii_categories, Some(vec![1, 2]));
        assert_eq!(
            rule.sectors,
            Some(vec!["energy".to_string(), "telecom".to_string()])
        );
        assert_eq!(rule.pdn_levels, None);
        assert_eq!(rule.min_employee_count, Some(10));
    }

    #[test]
    fn mapping_source_round_trips() {
        for source in [
            MappingSource::Automatic,
            MappingSource::ManualInclude,
            MappingSource::ManualExclude,
        ] {
            assert_eq!(MappingSource::parse(source.as_str()), Some(source));
        }
        assert_eq!(MappingSource::parse("other"), None);
    }
}
