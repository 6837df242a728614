//! Seeded generator for sample order files, including a small share of
//! orders with throwaway, gibberish or `+` aliased emails.

use chrono::{Duration, NaiveDate, NaiveTime};
use csv::WriterBuilder;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::io::Write;

use crate::email_screening::DEFAULT_DISPOSABLE_DOMAINS;
use crate::order_record::{OrderRecord, ORDER_COLUMNS};

pub const DEFAULT_SAMPLE_ROWS: usize = 100_000;
pub const DEFAULT_SAMPLE_FILE_NAME: &str = "synthetic_ecommerce_data_with_email_fraud.csv";

const PRODUCT_CATEGORIES: &[(&str, &str)] = &[
    ("Laptop", "Electronics"),
    ("Smartphone", "Electronics"),
    ("Headphones", "Electronics"),
    ("Smartwatch", "Electronics"),
    ("Backpack", "Accessories"),
    ("Shoes", "Apparel"),
    ("T-shirt", "Apparel"),
    ("Book", "Books"),
    ("Camera", "Electronics"),
    ("Gaming Console", "Gaming"),
];
const PAYMENT_METHODS: &[&str] = &["Credit Card", "Debit Card", "PayPal", "COD", "UPI"];
const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Alex", "Chris", "Katie", "Mike", "Laura", "Tom", "Anna", "James",
];
const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Miller", "Davis", "Wilson", "Clark",
    "Lewis",
];
const GIBBERISH_DOMAINS: &[&str] = &["xyzabc.com", "fakedomain.net", "randomsite.org"];
const DISCOUNT_RATES_PCT: &[i64] = &[0, 5, 10, 15, 20];
const COUPON_CODES: &[&str] = &["SUMMER20", "NEWUSER10", ""];
const GIBBERISH_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
/// Out of 100.
const FRAUD_RATE_PCT: u32 = 3;
const DATE_SPAN_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct SampleDataConfig {
    pub rows: usize,
    pub seed: u64,
    /// Last possible order date; orders fall within the year before it.
    pub end_date: NaiveDate,
}

impl SampleDataConfig {
    pub fn new(end_date: NaiveDate) -> Self {
        Self {
            rows: DEFAULT_SAMPLE_ROWS,
            seed: 0,
            end_date,
        }
    }
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn gibberish(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| GIBBERISH_ALPHABET[rng.gen_range(0..GIBBERISH_ALPHABET.len())] as char)
        .collect()
}

/// Rounds `value * numerator / denominator` to the nearest cent.
fn scale_cents(value: i64, numerator: i64, denominator: i64) -> i64 {
    (value * numerator + denominator / 2) / denominator
}

fn fraudulent_email(rng: &mut StdRng) -> String {
    match rng.gen_range(0..3) {
        0 => format!("{}@{}", gibberish(rng, 8), pick(rng, DEFAULT_DISPOSABLE_DOMAINS)),
        1 => format!("{}@{}", gibberish(rng, 8), pick(rng, GIBBERISH_DOMAINS)),
        _ => format!("john.doe+{}@gmail.com", rng.gen_range(1..=100)),
    }
}

fn sample_order(rng: &mut StdRng, seq: usize, start_date: NaiveDate) -> OrderRecord {
    let is_fraud = rng.gen_range(0..100) < FRAUD_RATE_PCT;
    let customer_name = format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES));
    let customer_email = if is_fraud {
        fraudulent_email(rng)
    } else {
        format!("{}@example.com", customer_name.replace(' ', ".").to_lowercase())
    };

    let (product_name, category) = PRODUCT_CATEGORIES
        .choose(rng)
        .copied()
        .unwrap_or(("Book", "Books"));
    let quantity = rng.gen_range(1..=3_i64);
    let price_per_unit_cents = rng.gen_range(2_000..=150_000_i64);
    let total_price_cents = price_per_unit_cents * quantity;
    let discount_pct = DISCOUNT_RATES_PCT.choose(rng).copied().unwrap_or(0);
    let total_discount_cents = scale_cents(total_price_cents, discount_pct, 100);
    let cost_ratio_bp = rng.gen_range(6_000..=8_500_i64);
    let cost_price_per_unit_cents = scale_cents(price_per_unit_cents, cost_ratio_bp, 10_000);
    let total_cost_cents = cost_price_per_unit_cents * quantity;
    let coupon_code = if total_discount_cents > 0 {
        pick(rng, COUPON_CODES).to_string()
    } else {
        String::new()
    };
    let order_day = start_date + Duration::days(rng.gen_range(0..=DATE_SPAN_DAYS));

    OrderRecord {
        order_id: format!("ORD{seq:07}"),
        order_date: order_day.and_time(NaiveTime::MIN),
        customer_name,
        customer_email,
        product_name: product_name.to_string(),
        category: category.to_string(),
        quantity,
        price_per_unit_cents,
        total_price_cents,
        total_discount_cents,
        coupon_code,
        cost_price_per_unit_cents,
        total_cost_cents,
        profit_cents: total_price_cents - total_discount_cents - total_cost_cents,
        payment_method: pick(rng, PAYMENT_METHODS).to_string(),
        shipping_address: format!("{} Main St", rng.gen_range(100..=999)),
        city: "Anytown".to_string(),
        state: "CA".to_string(),
        postal_code: rng.gen_range(10_000..=99_999).to_string(),
        is_fraud,
    }
}

/// Same config, same rows.
pub fn generate_sample_orders(config: &SampleDataConfig) -> Vec<OrderRecord> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let start_date = config.end_date - Duration::days(DATE_SPAN_DAYS);
    (1..=config.rows)
        .map(|seq| sample_order(&mut rng, seq, start_date))
        .collect()
}

pub fn write_orders_csv<W: Write>(writer: W, orders: &[OrderRecord]) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    writer.write_record(ORDER_COLUMNS)?;
    for order in orders {
        writer.write_record(order.to_row())?;
    }
    writer.flush()?;
    Ok(())
}
