//! Care-plan PDF rendering.
//!
//! Rendering is two steps: [`layout`] turns a record into positioned text
//! runs split across A4 pages, then [`PdfCarePlan::render_pdf`] draws them with
//! the built-in Helvetica fonts. Text stays ASCII since the built-in fonts
//! have no Naira sign.

use printpdf::{BuiltinFont, Mm, PdfDocument};
use tracing::debug;

use carebot_core::config::{PlanConfig, DEFAULT_PLAN_TITLE};
use carebot_core::{BudgetRecord, DocumentGenerator};

use crate::amount::format_amount;
use crate::error::{PlanError, Result};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const FOOTER_Y: f32 = 13.0;

const COL_GBP: f32 = 95.0;
const COL_NGN: f32 = 122.0;
const COL_NOTES: f32 = 152.0;

const CHECKLIST: [&str; 5] = [
    "Set a fixed transfer date each month and keep it consistent.",
    "Keep her enrolled in a state health insurance scheme.",
    "Name one trusted local contact for check-ins and emergencies.",
    "Build the emergency fund gradually (start with NGN 100k-200k).",
    "Keep a weekly call rhythm: 1-2 calls per week.",
];

const FX_NOTE: &str = "NGN values are plan estimates (rate may change).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// One text run at a fixed position, in millimetres from the bottom left.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub weight: Weight,
}

/// Renders the monthly care plan as a PDF.
#[derive(Debug, Clone)]
pub struct PdfCarePlan {
    title: String,
    prepared_for: Option<String>,
}

impl Default for PdfCarePlan {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_TITLE)
    }
}

impl From<&PlanConfig> for PdfCarePlan {
    fn from(plan: &PlanConfig) -> Self {
        let generator = Self::new(plan.title.trim());
        match plan.prepared_for.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => generator.prepared_for(name),
            _ => generator,
        }
    }
}

impl PdfCarePlan {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            prepared_for: None,
        }
    }

    pub fn prepared_for(mut self, name: impl Into<String>) -> Self {
        self.prepared_for = Some(name.into());
        self
    }

    pub fn render_pdf(&self, record: &BudgetRecord) -> Result<Vec<u8>> {
        let title = format!("{} {}", self.title, record.month);
        let pages = layout(&title, self.prepared_for.as_deref(), record);

        let (doc, first_page, first_layer) =
            PdfDocument::new(&title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PlanError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PlanError::Pdf(e.to_string()))?;

        let page_count = pages.len();
        for (i, runs) in pages.into_iter().enumerate() {
            let layer = if i == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
                doc.get_page(page).get_layer(layer)
            };
            for run in runs {
                let font = match run.weight {
                    Weight::Regular => &regular,
                    Weight::Bold => &bold,
                };
                layer.use_text(run.text, run.size, Mm(run.x), Mm(run.y), font);
            }
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| PlanError::Pdf(e.to_string()))?;
        debug!(pages = page_count, bytes = bytes.len(), "care plan rendered");
        Ok(bytes)
    }
}

impl DocumentGenerator for PdfCarePlan {
    fn file_name(&self, record: &BudgetRecord) -> String {
        format!("{}_{}.pdf", self.title.replace(' ', "_"), record.month)
    }

    fn render(&self, record: &BudgetRecord) -> carebot_core::Result<Vec<u8>> {
        Ok(self.render_pdf(record)?)
    }
}

/// Cursor that flows text down the page and starts a new page when full.
struct Flow {
    pages: Vec<Vec<TextRun>>,
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_H - MARGIN,
        }
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_H - MARGIN;
        }
    }

    fn line(&mut self, cols: &[(f32, &str)], size: f32, weight: Weight) {
        let height = size * 0.5 + 1.5;
        self.ensure(height);
        self.y -= height;
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            for (x, text) in cols {
                if text.is_empty() {
                    continue;
                }
                page.push(TextRun {
                    text: (*text).to_string(),
                    size,
                    x: *x,
                    y,
                    weight,
                });
            }
        }
    }

    fn text(&mut self, text: &str, size: f32, weight: Weight) {
        for chunk in wrap(text, 90) {
            self.line(&[(MARGIN, chunk.as_str())], size, weight);
        }
    }

    fn heading(&mut self, text: &str) {
        self.gap(4.0);
        self.line(&[(MARGIN, text)], 13.0, Weight::Bold);
        self.gap(1.0);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn finish(mut self, footer: &str) -> Vec<Vec<TextRun>> {
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.push(TextRun {
                text: footer.to_string(),
                size: 9.0,
                x: MARGIN,
                y: FOOTER_Y,
                weight: Weight::Regular,
            });
            page.push(TextRun {
                text: format!("Page {} of {}", i + 1, total),
                size: 9.0,
                x: PAGE_W - MARGIN - 22.0,
                y: FOOTER_Y,
                weight: Weight::Regular,
            });
        }
        self.pages
    }
}

/// Lay out the care plan as text runs, one `Vec` per page.
pub fn layout(title: &str, prepared_for: Option<&str>, record: &BudgetRecord) -> Vec<Vec<TextRun>> {
    let mut flow = Flow::new();
    let gbp = |v| format!("GBP {}", format_amount(v));
    let ngn = |v: Option<_>| v.map(|v| format!("NGN {}", format_amount(v))).unwrap_or_else(|| "-".into());

    flow.line(&[(MARGIN, title)], 20.0, Weight::Bold);
    let date = record.as_of.format("%d %b %Y");
    let byline = match prepared_for {
        Some(name) => format!("Prepared for: {name}  |  Period: {}  |  Date: {date}", record.month),
        None => format!("Period: {}  |  Date: {date}", record.month),
    };
    flow.text(&byline, 10.5, Weight::Regular);

    flow.heading("Your income baseline");
    flow.line(&[(MARGIN, "Item"), (COL_GBP, "Amount")], 10.0, Weight::Bold);
    let weekly = gbp(record.weekly_income);
    let monthly = gbp(record.monthly_income);
    flow.line(
        &[(MARGIN, "Weekly income (avg)"), (COL_GBP, weekly.as_str())],
        10.5,
        Weight::Regular,
    );
    flow.line(
        &[(MARGIN, "Monthly income (estimate)"), (COL_GBP, monthly.as_str())],
        10.5,
        Weight::Regular,
    );

    flow.heading("Monthly support budget");
    let total = match record.support_amount_ngn {
        Some(n) => format!(
            "Total monthly support: {} (approx {}).",
            gbp(record.support_amount),
            ngn(Some(n))
        ),
        None => format!("Total monthly support: {}.", gbp(record.support_amount)),
    };
    flow.text(&total, 10.5, Weight::Regular);
    flow.gap(2.0);
    flow.line(
        &[
            (MARGIN, "Category"),
            (COL_GBP, "GBP / month"),
            (COL_NGN, "NGN approx"),
            (COL_NOTES, "Notes"),
        ],
        10.0,
        Weight::Bold,
    );
    for item in &record.items {
        let category = clip(&ascii(&item.category), 40);
        let notes = clip(&ascii(&item.notes), 22);
        let amount = gbp(item.amount_gbp);
        let amount_ngn = ngn(item.amount_ngn);
        flow.line(
            &[
                (MARGIN, category.as_str()),
                (COL_GBP, amount.as_str()),
                (COL_NGN, amount_ngn.as_str()),
                (COL_NOTES, notes.as_str()),
            ],
            10.0,
            Weight::Regular,
        );
    }
    let total_gbp = gbp(record.support_amount);
    let total_ngn = ngn(record.support_amount_ngn);
    flow.line(
        &[
            (MARGIN, "TOTAL"),
            (COL_GBP, total_gbp.as_str()),
            (COL_NGN, total_ngn.as_str()),
        ],
        10.0,
        Weight::Bold,
    );

    flow.heading("Operational checklist");
    for entry in CHECKLIST {
        flow.text(&format!("- {entry}"), 10.5, Weight::Regular);
    }

    flow.heading("Notes");
    if !record.notes.is_empty() {
        flow.text(&ascii(&record.notes), 10.5, Weight::Regular);
    }
    flow.text(FX_NOTE, 10.5, Weight::Regular);

    let footer = match prepared_for {
        Some(name) => format!("{title} | Prepared for {name}"),
        None => title.to_string(),
    };
    flow.finish(&footer)
}

/// Replace what the built-in fonts cannot draw.
fn ascii(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '£' => "GBP ".to_string(),
            '₦' => "NGN ".to_string(),
            '–' | '—' => "-".to_string(),
            '‘' | '’' => "'".to_string(),
            '“' | '”' => "\"".to_string(),
            '•' => "-".to_string(),
            c if c.is_ascii() => c.to_string(),
            _ => "?".to_string(),
        })
        .collect()
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// Greedy word wrap at `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
