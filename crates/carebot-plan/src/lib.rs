//! Budget spreadsheet reading, care-plan PDF rendering and chat texts.

pub mod amount;
pub mod error;
pub mod format;
pub mod pdf;
pub mod reader;

pub use error::{PlanError, Result};
pub use format::{
    document_caption, emergency_reminder, format_plan_summary, monthly_reminder,
    GENERIC_SAVINGS_REMINDER, WEEKLY_CALL_REMINDER,
};
pub use pdf::PdfCarePlan;
pub use reader::{parse_plan, ExcelBudgetSource};
