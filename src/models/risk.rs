//! Risk entity model
//!
//! The level column is derived from the likelihood×impact matrix on every
//! write and never accepted from clients.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{Date, DateTimeWithTimeZone};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "risks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,
    pub organization_id: Option<Uuid>,

    pub title: String,
    pub description: Option<String>,

    /// security | compliance | operational | legal
    pub category: String,

    /// 1-5
    pub likelihood: i32,
    /// 1-5
    pub impact: i32,

    /// low | medium | high | critical, derived
    pub level: String,

    /// identified | assessed | mitigating | accepted | closed
    pub status: String,

    pub owner_id: Option<Uuid>,
    pub treatment_plan: Option<String>,
    pub review_due: Option<Date>,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fixed 5×5 matrix mapping likelihood×impact to a level slug.
///
/// Scores 1-6 are low, 7-11 medium, 12-19 high, 20-25 critical, with the
/// corner cases pinned so a 5 on either axis never lands below medium.
pub fn risk_level(likelihood: i32, impact: i32) -> &'static str {
    let l = likelihood.clamp(1, 5);
    let i = impact.clamp(1, 5);
    let score = l * i;
    if score >= 20 {
        "critical"
    } else if score >= 12 {
        "high"
    } else if score >= 7 || l == 5 || i == 5 {
        "medium"
    } else {
        "low"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_corners() {
        assert_eq!(risk_level(1, 1), "low");
        assert_eq!(risk_level(5, 5), "critical");
        assert_eq!(risk_level(5, 4), "critical");
        assert_eq!(risk_level(4, 4), "high");
        assert_eq!(risk_level(3, 3), "medium");
        assert_eq!(risk_level(2, 3), "low");
    }

    #[test]
    fn axis_five_is_at_least_medium() {
        assert_eq!(risk_level(5, 1), "medium");
        assert_eq!(risk_level(1, 5), "medium");
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(risk_level(0, 0), "low");
        assert_eq!(risk_level(9, 9), "critical");
    }
}
