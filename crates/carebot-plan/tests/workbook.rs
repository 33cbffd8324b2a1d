use std::path::Path;
use std::str::FromStr;

use carebot_core::{BudgetSource, CarebotError, DocumentGenerator};
use carebot_plan::{ExcelBudgetSource, PdfCarePlan};
use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;

const SHEET: &str = "Mom Monthly Support Plan";

fn write_plan(path: &Path, sheet: &str) {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(sheet).unwrap();

    ws.write_string(0, 0, "Mom Monthly Support Plan").unwrap();
    ws.write_string(2, 0, "Weekly Income").unwrap();
    ws.write_number(2, 1, 450.0).unwrap();
    ws.write_string(3, 0, "Monthly Income").unwrap();
    ws.write_number(3, 1, 1950.0).unwrap();

    ws.write_string(5, 0, "MONTHLY SUPPORT BREAKDOWN").unwrap();
    ws.write_string(5, 1, "GBP").unwrap();
    ws.write_string(5, 2, "NGN").unwrap();

    ws.write_string(6, 0, "Food & household").unwrap();
    ws.write_number(6, 1, 120.0).unwrap();
    ws.write_string(6, 2, "₦259,200").unwrap();
    ws.write_string(6, 3, "Market runs").unwrap();

    ws.write_string(7, 0, "Health").unwrap();
    ws.write_string(7, 1, "£30").unwrap();
    ws.write_number(7, 2, 64800.0).unwrap();

    ws.write_string(8, 0, "Emergency Fund").unwrap();
    ws.write_number(8, 1, 40.5).unwrap();

    ws.write_string(9, 0, "TOTAL MONTHLY SUPPORT").unwrap();
    ws.write_number(9, 1, 190.5).unwrap();

    workbook.save(path).unwrap();
}

#[test]
fn reads_a_real_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.xlsx");
    write_plan(&path, SHEET);

    let source = ExcelBudgetSource::new(&path, SHEET, chrono_tz::Europe::London);
    let record = source.read_budget().unwrap();

    assert_eq!(record.month.len(), 7);
    assert_eq!(record.weekly_income, Decimal::from(450));
    assert_eq!(record.monthly_income, Decimal::from(1950));
    assert_eq!(record.support_amount, Decimal::from_str("190.5").unwrap());
    assert_eq!(record.support_amount_ngn, None);
    assert_eq!(record.items.len(), 3);
    assert_eq!(record.items[0].amount_ngn, Some(Decimal::from(259_200)));
    assert_eq!(record.items[0].notes, "Market runs");
    assert_eq!(record.items[1].amount_gbp, Decimal::from(30));
    assert_eq!(
        record.savings_target,
        Some(Decimal::from_str("40.5").unwrap())
    );

    let pdf = PdfCarePlan::default().render(&record).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn wrong_sheet_name_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.xlsx");
    write_plan(&path, "Sheet1");

    let err = ExcelBudgetSource::new(&path, SHEET, chrono_tz::UTC)
        .read_budget()
        .unwrap_err();
    match err {
        CarebotError::DataUnavailable(msg) => assert!(msg.contains("Sheet1")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn corrupt_file_is_data_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.xlsx");
    std::fs::write(&path, b"not a zip").unwrap();

    let err = ExcelBudgetSource::new(&path, SHEET, chrono_tz::UTC)
        .read_budget()
        .unwrap_err();
    assert!(matches!(err, CarebotError::DataUnavailable(_)));
}
