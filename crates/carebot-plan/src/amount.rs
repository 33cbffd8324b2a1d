//! Money cell parsing and display.

use std::str::FromStr;

use rust_decimal::Decimal;

/// A spreadsheet cell, reduced to what the budget sheet uses.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Trimmed text form, `None` for empty cells.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
        }
    }
}

// Currency marks seen in the sheet, in GBP and NGN columns alike.
const CURRENCY_MARKS: [&str; 4] = ["£", "₦", "GBP", "NGN"];

/// Parse a money cell: plain numbers, or text such as `"£200"`,
/// `"₦216,000"` or `"NGN 216,000"`. Anything else is `None`.
pub fn parse_amount(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Empty => None,
        Cell::Number(n) if n.is_finite() => Decimal::from_str(&n.to_string()).ok(),
        Cell::Number(_) => None,
        Cell::Text(s) => {
            let mut cleaned = s.replace(',', "");
            for mark in CURRENCY_MARKS {
                cleaned = cleaned.replace(mark, "");
            }
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return None;
            }
            Decimal::from_str(cleaned).ok()
        }
    }
}

/// Whole-unit amount with thousands separators: `216000.4` → `"216,000"`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round().normalize();
    let digits = rounded.abs().trunc().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn numbers_parse_exactly() {
        assert_eq!(parse_amount(&Cell::Number(200.0)), Some(dec("200")));
        assert_eq!(parse_amount(&Cell::Number(123.45)), Some(dec("123.45")));
        assert_eq!(parse_amount(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn currency_text_is_cleaned() {
        assert_eq!(parse_amount(&Cell::Text("£200".into())), Some(dec("200")));
        assert_eq!(
            parse_amount(&Cell::Text("₦216,000".into())),
            Some(dec("216000"))
        );
        assert_eq!(
            parse_amount(&Cell::Text(" NGN 1,250,000 ".into())),
            Some(dec("1250000"))
        );
        assert_eq!(parse_amount(&Cell::Text("GBP 40.50".into())), Some(dec("40.50")));
    }

    #[test]
    fn non_amounts_are_none() {
        assert_eq!(parse_amount(&Cell::Empty), None);
        assert_eq!(parse_amount(&Cell::Text("  ".into())), None);
        assert_eq!(parse_amount(&Cell::Text("n/a".into())), None);
        assert_eq!(parse_amount(&Cell::Text("£".into())), None);
    }

    #[test]
    fn formats_with_separators_and_rounding() {
        assert_eq!(format_amount(dec("0")), "0");
        assert_eq!(format_amount(dec("200")), "200");
        assert_eq!(format_amount(dec("1000")), "1,000");
        assert_eq!(format_amount(dec("216000.4")), "216,000");
        assert_eq!(format_amount(dec("1250000")), "1,250,000");
        assert_eq!(format_amount(dec("99.5")), "100");
        assert_eq!(format_amount(dec("-1234")), "-1,234");
    }

    #[test]
    fn label_trims_and_skips_blank() {
        assert_eq!(Cell::Text("  Food ".into()).label().as_deref(), Some("Food"));
        assert_eq!(Cell::Text("   ".into()).label(), None);
        assert_eq!(Cell::Empty.label(), None);
    }
}
