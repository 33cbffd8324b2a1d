//! Budget workbook reader.
//!
//! Layout of the support-plan sheet:
//!
//! | Column | Content                                   |
//! |--------|-------------------------------------------|
//! | A      | labels / categories                       |
//! | B      | GBP amounts                               |
//! | C      | NGN amounts (numbers or text like ₦216,000) |
//! | D      | notes                                     |
//!
//! "Weekly Income" and "Monthly Income" rows are required. Breakdown rows
//! follow the "MONTHLY SUPPORT BREAKDOWN" header and end at
//! "TOTAL MONTHLY SUPPORT" or "REMAINING FOR YOU".

use std::path::PathBuf;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use carebot_core::{BudgetItem, BudgetRecord, BudgetSource};

use crate::amount::{parse_amount, Cell};
use crate::error::{PlanError, Result};

const WEEKLY_INCOME: &str = "Weekly Income";
const MONTHLY_INCOME: &str = "Monthly Income";
const BREAKDOWN_HEADER: &str = "MONTHLY SUPPORT BREAKDOWN";
const TOTAL_ROW: &str = "TOTAL MONTHLY SUPPORT";
const REMAINING_ROW: &str = "REMAINING FOR YOU";

/// Reads a fresh [`BudgetRecord`] from an `.xlsx` workbook on every call.
#[derive(Debug, Clone)]
pub struct ExcelBudgetSource {
    path: PathBuf,
    sheet: String,
    timezone: Tz,
}

impl ExcelBudgetSource {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
            timezone,
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display(), sheet = %self.sheet))]
    pub fn read(&self) -> Result<BudgetRecord> {
        if !self.path.exists() {
            return Err(PlanError::WorkbookNotFound(self.path.display().to_string()));
        }
        let mut workbook = open_workbook_auto(&self.path)?;
        let names = workbook.sheet_names();
        if !names.iter().any(|n| n == &self.sheet) {
            return Err(PlanError::SheetNotFound {
                sheet: self.sheet.clone(),
                found: names,
            });
        }

        let range = workbook.worksheet_range(&self.sheet)?;
        // The range starts at the first used cell; re-anchor it on column A.
        let first_col = range.start().map(|(_, c)| c as usize).unwrap_or(0);
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| {
                let mut cells = vec![Cell::Empty; first_col];
                cells.extend(row.iter().map(to_cell));
                cells
            })
            .collect();

        let as_of = Utc::now().with_timezone(&self.timezone).date_naive();
        let record = parse_plan(&rows, as_of)?;
        debug!(items = record.items.len(), total = %record.support_amount, "budget read");
        Ok(record)
    }
}

impl BudgetSource for ExcelBudgetSource {
    fn read_budget(&self) -> carebot_core::Result<BudgetRecord> {
        Ok(self.read()?)
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

static EMPTY: Cell = Cell::Empty;

/// Build a record from sheet rows (column A first), as read on `as_of`.
pub fn parse_plan(rows: &[Vec<Cell>], as_of: NaiveDate) -> Result<BudgetRecord> {
    let cell = |r: usize, c: usize| rows.get(r).and_then(|row| row.get(c)).unwrap_or(&EMPTY);
    let find_row = |label: &'static str| {
        rows.iter()
            .position(|row| {
                row.first()
                    .and_then(Cell::label)
                    .is_some_and(|l| l.eq_ignore_ascii_case(label))
            })
            .ok_or(PlanError::MissingRow(label))
    };

    let weekly_income = parse_amount(cell(find_row(WEEKLY_INCOME)?, 1)).unwrap_or_default();
    let monthly_income = parse_amount(cell(find_row(MONTHLY_INCOME)?, 1)).unwrap_or_default();
    let header = find_row(BREAKDOWN_HEADER)?;

    let mut items = Vec::new();
    let mut total_gbp = Decimal::ZERO;
    let mut total_ngn = None;

    for r in header + 1..rows.len() {
        let Some(category) = cell(r, 0).label() else {
            continue;
        };
        let upper = category.to_uppercase();
        if upper == TOTAL_ROW {
            total_gbp = parse_amount(cell(r, 1)).unwrap_or_default();
            total_ngn = parse_amount(cell(r, 2));
            break;
        }
        if upper == REMAINING_ROW {
            break;
        }
        let Some(amount_gbp) = parse_amount(cell(r, 1)) else {
            continue;
        };
        items.push(BudgetItem {
            category,
            amount_gbp,
            amount_ngn: parse_amount(cell(r, 2)),
            notes: cell(r, 3).label().unwrap_or_default(),
        });
    }

    if total_gbp.is_zero() && !items.is_empty() {
        total_gbp = items.iter().map(|i| i.amount_gbp).sum();
    }
    let savings_target = items
        .iter()
        .find(|i| i.is_emergency())
        .map(|i| i.amount_gbp);

    Ok(BudgetRecord {
        month: as_of.format("%Y-%m").to_string(),
        as_of,
        weekly_income,
        monthly_income,
        support_amount: total_gbp,
        support_amount_ngn: total_ngn,
        savings_target,
        items,
        notes: String::new(),
    })
}
