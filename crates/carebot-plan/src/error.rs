use carebot_core::CarebotError;

/// Errors produced while reading the budget workbook or rendering the plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("workbook not found: {0}")]
    WorkbookNotFound(String),

    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("sheet '{sheet}' not found (found: {found:?})")]
    SheetNotFound { sheet: String, found: Vec<String> },

    #[error("could not find '{0}' in column A")]
    MissingRow(&'static str),

    #[error("pdf error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;

impl From<PlanError> for CarebotError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::Pdf(msg) => CarebotError::Render(msg),
            other => CarebotError::DataUnavailable(other.to_string()),
        }
    }
}
