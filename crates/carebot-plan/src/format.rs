//! Chat texts built from a budget snapshot.

use rust_decimal::Decimal;

use carebot_core::{BudgetItem, BudgetRecord};

use crate::amount::format_amount;

pub const WEEKLY_CALL_REMINDER: &str = "📞 CareBot: Reminder, call Mum today (weekly check-in).";
pub const GENERIC_SAVINGS_REMINDER: &str =
    "💰 CareBot: Reminder, put emergency savings aside this week.";

fn money(gbp: Decimal, ngn: Option<Decimal>) -> String {
    match ngn {
        Some(ngn) => format!("£{} (≈ ₦{})", format_amount(gbp), format_amount(ngn)),
        None => format!("£{}", format_amount(gbp)),
    }
}

/// Plan summary: income, planned support, breakdown and a closing reminder.
pub fn format_plan_summary(record: &BudgetRecord) -> String {
    let mut lines = vec![
        format!("🧾 CareBot: Monthly Support Plan ({})", record.month),
        format!(
            "Income: £{}/week (~£{}/month)",
            format_amount(record.weekly_income),
            format_amount(record.monthly_income)
        ),
        format!(
            "Planned support: {}",
            money(record.support_amount, record.support_amount_ngn)
        ),
        String::new(),
        "Breakdown:".to_string(),
    ];
    lines.extend(
        record
            .items
            .iter()
            .map(|i| format!("• {}: {}", i.category, money(i.amount_gbp, i.amount_ngn))),
    );
    lines.push(String::new());
    lines.push("✅ Reminder: keep it consistent and save the emergency fund monthly.".to_string());
    lines.join("\n")
}

/// Body of the monthly transfer-day message.
pub fn monthly_reminder(record: &BudgetRecord) -> String {
    format!(
        "📅 Monthly Support Reminder\nToday is your scheduled transfer date.\n\n{}",
        format_plan_summary(record)
    )
}

/// Emergency savings amount reminder, `None` when the plan has no emergency line.
pub fn emergency_reminder(record: &BudgetRecord) -> Option<String> {
    record.emergency_item().map(|BudgetItem { amount_gbp, amount_ngn, .. }| {
        format!(
            "💰 CareBot: Emergency savings reminder, {}",
            money(*amount_gbp, *amount_ngn)
        )
    })
}

/// Caption for the care-plan document.
pub fn document_caption(record: &BudgetRecord) -> String {
    format!("📄 Care Plan ({})", record.month)
}
