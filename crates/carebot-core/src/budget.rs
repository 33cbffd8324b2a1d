//! Budget snapshot types and the two data-side capabilities the reminder
//! jobs depend on: reading the budget and rendering the care plan.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One line of the monthly support breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetItem {
    pub category: String,
    pub amount_gbp: Decimal,
    /// Naira estimate, when the sheet has one.
    pub amount_ngn: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

impl BudgetItem {
    pub fn is_emergency(&self) -> bool {
        self.category.to_lowercase().contains("emergency")
    }
}

/// Immutable snapshot of the budget sheet, taken fresh for every firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    /// Period the snapshot was taken for, `YYYY-MM`.
    pub month: String,
    /// Local day the sheet was read. Dates shown in the care plan come from here.
    pub as_of: NaiveDate,
    pub weekly_income: Decimal,
    pub monthly_income: Decimal,
    /// Total planned monthly support in GBP.
    pub support_amount: Decimal,
    pub support_amount_ngn: Option<Decimal>,
    /// Monthly emergency-savings contribution, taken from the breakdown.
    pub savings_target: Option<Decimal>,
    pub items: Vec<BudgetItem>,
    #[serde(default)]
    pub notes: String,
}

impl BudgetRecord {
    /// The breakdown line for emergency savings, if the sheet has one.
    pub fn emergency_item(&self) -> Option<&BudgetItem> {
        self.items.iter().find(|i| i.is_emergency())
    }
}

/// Provider of the current budget snapshot.
///
/// Fails with [`CarebotError::DataUnavailable`](crate::error::CarebotError::DataUnavailable)
/// when the source is missing or malformed.
pub trait BudgetSource: Send + Sync {
    fn read_budget(&self) -> Result<BudgetRecord>;
}

/// Renderer of the care-plan artifact.
///
/// Fails with [`CarebotError::Render`](crate::error::CarebotError::Render).
pub trait DocumentGenerator: Send + Sync {
    /// Suggested file name for the rendered document.
    fn file_name(&self, record: &BudgetRecord) -> String;

    fn render(&self, record: &BudgetRecord) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(category: &str, gbp: &str) -> BudgetItem {
        BudgetItem {
            category: category.to_string(),
            amount_gbp: Decimal::from_str(gbp).unwrap(),
            amount_ngn: None,
            notes: String::new(),
        }
    }

    #[test]
    fn emergency_item_matches_case_insensitively() {
        let record = BudgetRecord {
            month: "2026-01".into(),
            as_of: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            weekly_income: Decimal::ZERO,
            monthly_income: Decimal::ZERO,
            support_amount: Decimal::ZERO,
            support_amount_ngn: None,
            savings_target: None,
            items: vec![item("Food", "120"), item("EMERGENCY Fund", "40")],
            notes: String::new(),
        };
        let found = record.emergency_item().expect("emergency line");
        assert_eq!(found.amount_gbp, Decimal::from(40));
    }
}
