use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Column order of the order export, also used when writing sample files.
pub const ORDER_COLUMNS: &[&str] = &[
    "order_id",
    "order_date",
    "customer_name",
    "customer_email",
    "product_name",
    "category",
    "quantity",
    "price_per_unit",
    "total_price",
    "total_discount",
    "coupon_code",
    "cost_price_per_unit",
    "total_cost",
    "profit",
    "payment_method",
    "shipping_address",
    "city",
    "state",
    "postal_code",
    "is_fraud",
];

/// Columns that may be absent from an upload; they load as empty text.
pub const OPTIONAL_ORDER_COLUMNS: &[&str] =
    &["coupon_code", "shipping_address", "city", "postal_code"];

/// One transaction row. Currency amounts are integer cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub order_id: String,
    pub order_date: NaiveDateTime,
    pub customer_name: String,
    pub customer_email: String,
    pub product_name: String,
    pub category: String,
    pub quantity: i64,
    pub price_per_unit_cents: i64,
    pub total_price_cents: i64,
    pub total_discount_cents: i64,
    pub coupon_code: String,
    pub cost_price_per_unit_cents: i64,
    pub total_cost_cents: i64,
    pub profit_cents: i64,
    pub payment_method: String,
    pub shipping_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_fraud: bool,
}

impl OrderRecord {
    pub fn order_day(&self) -> NaiveDate {
        self.order_date.date()
    }

    /// Cell values in `ORDER_COLUMNS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.order_id.clone(),
            format_order_date(&self.order_date),
            self.customer_name.clone(),
            self.customer_email.clone(),
            self.product_name.clone(),
            self.category.clone(),
            self.quantity.to_string(),
            cents_to_amount_text(self.price_per_unit_cents),
            cents_to_amount_text(self.total_price_cents),
            cents_to_amount_text(self.total_discount_cents),
            self.coupon_code.clone(),
            cents_to_amount_text(self.cost_price_per_unit_cents),
            cents_to_amount_text(self.total_cost_cents),
            cents_to_amount_text(self.profit_cents),
            self.payment_method.clone(),
            self.shipping_address.clone(),
            self.city.clone(),
            self.state.clone(),
            self.postal_code.clone(),
            if self.is_fraud { "1" } else { "0" }.to_string(),
        ]
    }
}

fn amount_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s$,]").expect("invalid amount noise regex"))
}

/// Date-only timestamps print as `YYYY-MM-DD`, anything else keeps the clock.
pub fn format_order_date(ts: &NaiveDateTime) -> String {
    if ts.time() == chrono::NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Parses `1200`, `1,200.5`, `$1,200.00`, `-3.10`. Empty text is zero.
/// Digits past the second decimal are rounded half away from zero.
pub fn parse_amount_to_cents(raw: &str) -> Result<i64, String> {
    let mut s = amount_noise_re().replace_all(raw.trim(), "").to_string();
    if s.is_empty() {
        return Ok(0);
    }
    let negative = s.starts_with('-');
    if s.starts_with('-') || s.starts_with('+') {
        s = s[1..].to_string();
    }
    if s.is_empty() {
        return Err("invalid amount".to_string());
    }
    let parts = s.split('.').collect::<Vec<_>>();
    if parts.len() > 2 {
        return Err("invalid amount".to_string());
    }
    let int_part = if parts[0].is_empty() { "0" } else { parts[0] };
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid amount".to_string());
    }
    let frac_part = if parts.len() == 2 { parts[1] } else { "" };
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return Err("invalid amount".to_string());
    }
    let int_val = int_part
        .parse::<i64>()
        .map_err(|_| "amount out of range".to_string())?;
    let mut digits = frac_part.bytes().map(|b| i64::from(b - b'0'));
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let round_up = digits.next().map(|d| d >= 5).unwrap_or(false);
    let frac_val = tenths * 10 + hundredths + i64::from(round_up);
    let mut cents = int_val
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac_val))
        .ok_or_else(|| "amount out of range".to_string())?;
    if negative {
        cents = -cents;
    }
    Ok(cents)
}

pub fn cents_to_amount_text(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$1,200.00` style text.
pub fn format_usd(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{sign}${}.{:02}",
        group_thousands(&(abs / 100).to_string()),
        abs % 100
    )
}

pub fn format_count(count: u64) -> String {
    group_thousands(&count.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_parser_accepts_currency_text_and_rounds_float_noise() {
        assert_eq!(parse_amount_to_cents("1200.0"), Ok(120_000));
        assert_eq!(parse_amount_to_cents("$1,200.00"), Ok(120_000));
        assert_eq!(parse_amount_to_cents("-3.1"), Ok(-310));
        assert_eq!(parse_amount_to_cents(""), Ok(0));
        assert_eq!(parse_amount_to_cents("280.00000000000006"), Ok(28_000));
        assert_eq!(parse_amount_to_cents("0.105"), Ok(11));
        assert!(parse_amount_to_cents("12.3.4").is_err());
        assert!(parse_amount_to_cents("abc").is_err());
        assert!(parse_amount_to_cents("-").is_err());
    }

    #[test]
    fn usd_text_groups_thousands() {
        assert_eq!(format_usd(120_000), "$1,200.00");
        assert_eq!(format_usd(28_000), "$280.00");
        assert_eq!(format_usd(123_456_789), "$1,234,567.89");
        assert_eq!(format_usd(-5), "-$0.05");
        assert_eq!(format_count(1), "1");
        assert_eq!(format_count(100_000), "100,000");
    }

    #[test]
    fn row_cells_follow_column_order() {
        let rec = fixtures::order("ORD001", "2025-10-29", "Laptop", "Electronics", 120_000);
        let row = rec.to_row();
        assert_eq!(row.len(), ORDER_COLUMNS.len());
        assert_eq!(row[1], "2025-10-29");
        assert_eq!(row[8], "1200.00");
        assert_eq!(row[19], "0");
    }
}
