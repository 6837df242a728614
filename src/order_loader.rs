use calamine::{open_workbook_auto, Data, Range, Reader, Xlsx};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::LoadError;
use crate::order_record::{parse_amount_to_cents, OrderRecord, OPTIONAL_ORDER_COLUMNS, ORDER_COLUMNS};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Header name -> cell index, resolved once per file.
struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn from_header(header: &[String]) -> Result<Self, LoadError> {
        let normalized = header
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect::<Vec<_>>();
        let mut positions = HashMap::new();
        for column in ORDER_COLUMNS {
            match normalized.iter().position(|h| h == column) {
                Some(idx) => {
                    positions.insert(*column, idx);
                }
                None if OPTIONAL_ORDER_COLUMNS.contains(column) => {}
                None => {
                    return Err(LoadError::MissingColumn {
                        column: (*column).to_string(),
                    })
                }
            }
        }
        Ok(Self { positions })
    }

    fn cell<'a>(&self, row: &'a [String], column: &str) -> &'a str {
        self.positions
            .get(column)
            .and_then(|idx| row.get(*idx))
            .map(|s| s.trim())
            .unwrap_or("")
    }
}

/// Accepts the date shapes spreadsheet exports commonly produce. Offsets are
/// dropped and the wall-clock time is kept.
pub fn parse_order_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_local());
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }
    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_quantity(raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return Some(0);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .filter(|v| *v >= i64::MIN as f64 && *v < i64::MAX as f64)
        .map(|v| v as i64)
}

fn parse_fraud_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" | "" => Some(false),
        _ => None,
    }
}

fn parse_row(columns: &ColumnIndex, row: &[String], line: usize) -> Result<OrderRecord, LoadError> {
    let text = |column: &str| columns.cell(row, column).to_string();
    let amount = |column: &str| {
        let raw = columns.cell(row, column);
        parse_amount_to_cents(raw).map_err(|_| LoadError::invalid_field(line, column, raw))
    };

    let date_text = columns.cell(row, "order_date");
    let order_date = parse_order_timestamp(date_text).ok_or_else(|| LoadError::InvalidDate {
        line,
        value: date_text.to_string(),
    })?;
    let quantity_text = columns.cell(row, "quantity");
    let quantity = parse_quantity(quantity_text)
        .ok_or_else(|| LoadError::invalid_field(line, "quantity", quantity_text))?;
    let fraud_text = columns.cell(row, "is_fraud");
    let is_fraud = parse_fraud_flag(fraud_text)
        .ok_or_else(|| LoadError::invalid_field(line, "is_fraud", fraud_text))?;

    Ok(OrderRecord {
        order_id: text("order_id"),
        order_date,
        customer_name: text("customer_name"),
        customer_email: text("customer_email"),
        product_name: text("product_name"),
        category: text("category"),
        quantity,
        price_per_unit_cents: amount("price_per_unit")?,
        total_price_cents: amount("total_price")?,
        total_discount_cents: amount("total_discount")?,
        coupon_code: text("coupon_code"),
        cost_price_per_unit_cents: amount("cost_price_per_unit")?,
        total_cost_cents: amount("total_cost")?,
        profit_cents: amount("profit")?,
        payment_method: text("payment_method"),
        shipping_address: text("shipping_address"),
        city: text("city"),
        state: text("state"),
        postal_code: text("postal_code"),
        is_fraud,
    })
}

/// First row is the header; every following row must produce a record.
fn orders_from_rows(rows: Vec<Vec<String>>) -> Result<Vec<OrderRecord>, LoadError> {
    let mut iter = rows.into_iter();
    let header = iter.next().ok_or(LoadError::NoHeader)?;
    let columns = ColumnIndex::from_header(&header)?;

    let mut orders = Vec::new();
    for (idx, row) in iter.enumerate() {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let line = idx + 2;
        match parse_row(&columns, &row, line) {
            Ok(order) => orders.push(order),
            Err(err) => {
                log::warn!("order file rejected: {err}");
                return Err(err);
            }
        }
    }
    log::info!("loaded {} order records", orders.len());
    Ok(orders)
}

fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<Vec<String>>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for rec in reader.records() {
        let rec = rec?;
        rows.push(rec.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(rows)
}

/// `None` when the serial is not a representable calendar timestamp.
fn excel_serial_to_text(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial <= 0.0 {
        return None;
    }
    let seconds = (serial * 86_400.0).round();
    if seconds >= i64::MAX as f64 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    let ts = base.checked_add_signed(Duration::try_seconds(seconds as i64)?)?;
    Some(crate::order_record::format_order_date(&ts))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        // Out-of-range serials stay numeric and fail date parsing for their line.
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_text(serial).unwrap_or_else(|| serial.to_string())
        }
        other => other.to_string().trim().to_string(),
    }
}

fn first_sheet_name(sheet_names: &[String]) -> Result<String, LoadError> {
    sheet_names
        .first()
        .cloned()
        .ok_or_else(|| LoadError::Workbook("no worksheet found".to_string()))
}

fn rows_from_range(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .collect()
}

/// Parses delimited text with a header row into order records, keeping file order.
pub fn load_orders_from_reader<R: Read>(reader: R) -> Result<Vec<OrderRecord>, LoadError> {
    orders_from_rows(read_csv_rows(reader)?)
}

/// Uploaded bytes: xlsx workbooks are recognised by their zip signature,
/// everything else is read as delimited text.
pub fn load_orders_from_bytes(bytes: &[u8]) -> Result<Vec<OrderRecord>, LoadError> {
    if bytes.starts_with(ZIP_MAGIC) {
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes)).map_err(|e| LoadError::Workbook(e.to_string()))?;
        let sheet = first_sheet_name(&workbook.sheet_names())?;
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| LoadError::Workbook(e.to_string()))?;
        return orders_from_rows(rows_from_range(&range));
    }
    load_orders_from_reader(bytes)
}

pub fn load_orders_from_path(path: &Path) -> Result<Vec<OrderRecord>, LoadError> {
    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    log::debug!("loading orders from {}", path.to_string_lossy());

    match suffix.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)?;
            load_orders_from_reader(std::io::BufReader::new(file))
        }
        "xlsx" => {
            let mut workbook =
                open_workbook_auto(path).map_err(|e| LoadError::Workbook(e.to_string()))?;
            let sheet = first_sheet_name(&workbook.sheet_names())?;
            let range = workbook
                .worksheet_range(&sheet)
                .map_err(|e| LoadError::Workbook(e.to_string()))?;
            orders_from_rows(rows_from_range(&range))
        }
        _ => Err(LoadError::UnsupportedFormat(suffix)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::fs;
    use std::path::PathBuf;
    use uuid::Uuid;

    const HEADER: &str = "order_id,order_date,customer_name,customer_email,product_name,category,quantity,price_per_unit,total_price,total_discount,coupon_code,cost_price_per_unit,total_cost,profit,payment_method,shipping_address,city,state,postal_code,is_fraud";

    fn sample_csv() -> String {
        format!(
            "{HEADER}\n\
             ORD001,2025-10-29,Test User,test@example.com,Laptop,Electronics,1,1200.0,1200.0,120.0,SAVE10,800.0,800.0,280.0,Credit Card,123 Test St,Testville,CA,90210,0\n\
             ORD002,2025-10-30 14:05:00,Jane Smith,jane+1@gmail.com,Book,Books,2,15.5,31.0,0.0,,10.0,20.0,11.0,PayPal,9 Main St,Anytown,NY,10001,1\n"
        )
    }

    fn temp_path(ext: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "storefront_loader_test_{}_{}.{ext}",
            std::process::id(),
            Uuid::new_v4()
        ))
    }

    #[test]
    fn loads_typed_records_in_file_order() {
        let orders = load_orders_from_bytes(sample_csv().as_bytes()).expect("load csv");
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, "ORD001");
        assert_eq!(orders[0].total_price_cents, 120_000);
        assert_eq!(orders[0].profit_cents, 28_000);
        assert!(!orders[0].is_fraud);
        assert_eq!(orders[1].order_id, "ORD002");
        assert_eq!(orders[1].order_date.hour(), 14);
        assert_eq!(orders[1].quantity, 2);
        assert!(orders[1].is_fraud);
        assert_eq!(orders[1].coupon_code, "");
    }

    #[test]
    fn column_lookup_is_by_name_not_position() {
        let csv = "is_fraud,state,payment_method,profit,total_cost,cost_price_per_unit,total_discount,total_price,price_per_unit,quantity,category,product_name,customer_email,customer_name,order_date,order_id\n\
                   0,TX,UPI,5,5,5,0,10,10,1,Books,Book,a@b.com,A B,2025-01-02,ORD9\n";
        let orders = load_orders_from_bytes(csv.as_bytes()).expect("load reordered csv");
        assert_eq!(orders[0].order_id, "ORD9");
        assert_eq!(orders[0].state, "TX");
        assert_eq!(orders[0].city, "");
    }

    #[test]
    fn missing_date_column_is_a_load_error() {
        let csv = "order_id,customer_email\nORD1,a@b.com\n";
        match load_orders_from_bytes(csv.as_bytes()) {
            Err(LoadError::MissingColumn { column }) => assert_eq!(column, "order_date"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn one_bad_date_rejects_the_whole_file() {
        let csv = sample_csv().replace("2025-10-30 14:05:00", "not-a-date");
        match load_orders_from_bytes(csv.as_bytes()) {
            Err(LoadError::InvalidDate { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected invalid date, got {other:?}"),
        }
    }

    #[test]
    fn bad_numeric_cells_are_reported_with_column() {
        let csv = sample_csv().replace(",2,15.5,", ",two,15.5,");
        match load_orders_from_bytes(csv.as_bytes()) {
            Err(LoadError::InvalidField { column, .. }) => assert_eq!(column, "quantity"),
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(
            load_orders_from_bytes(b""),
            Err(LoadError::NoHeader)
        ));
    }

    #[test]
    fn non_utf8_text_is_a_parse_error() {
        let mut bytes = HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"\n\xff\xfe,\xff\n");
        assert!(matches!(
            load_orders_from_bytes(&bytes),
            Err(LoadError::Csv(_))
        ));
    }

    #[test]
    fn timestamp_shapes() {
        let ts = parse_order_timestamp("2025-10-29T08:30:00+02:00").expect("rfc3339");
        assert_eq!(ts.hour(), 8);
        assert_eq!(
            parse_order_timestamp("10/29/2025").map(|t| t.date()),
            NaiveDate::from_ymd_opt(2025, 10, 29)
        );
        assert!(parse_order_timestamp("2025-13-01").is_none());
        assert!(parse_order_timestamp("").is_none());
    }

    #[test]
    fn path_loader_dispatches_on_extension() {
        let csv_path = temp_path("csv");
        fs::write(&csv_path, sample_csv()).expect("write temp csv");
        let orders = load_orders_from_path(&csv_path).expect("load from path");
        assert_eq!(orders.len(), 2);
        let _ = fs::remove_file(&csv_path);

        let txt_path = temp_path("txt");
        assert!(matches!(
            load_orders_from_path(&txt_path),
            Err(LoadError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("data/fixtures")
            .join(name)
    }

    #[test]
    fn xlsx_upload_reads_the_first_sheet() {
        let path = fixture_path("orders_sample.xlsx");
        let bytes = fs::read(&path).expect("read xlsx fixture");
        let orders = load_orders_from_bytes(&bytes).expect("load xlsx bytes");
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_id, "ORD001");
        assert_eq!(
            orders[0].order_day(),
            NaiveDate::from_ymd_opt(2025, 10, 29).expect("date")
        );
        assert_eq!(orders[0].total_price_cents, 120_000);
        assert_eq!(orders[0].profit_cents, 28_000);
        assert_eq!(orders[1].order_date.hour(), 12);
        assert_eq!(orders[1].quantity, 2);
        assert_eq!(orders[1].price_per_unit_cents, 1_550);
        assert_eq!(orders[1].coupon_code, "");
        assert!(orders[1].is_fraud);

        let from_path = load_orders_from_path(&path).expect("load xlsx path");
        assert_eq!(from_path, orders);
    }

    #[test]
    fn xlsx_date_cell_out_of_range_is_an_invalid_date() {
        let path = fixture_path("orders_out_of_range_date.xlsx");
        let bytes = fs::read(&path).expect("read xlsx fixture");
        match load_orders_from_bytes(&bytes) {
            Err(LoadError::InvalidDate { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected invalid date, got {other:?}"),
        }
        assert!(matches!(
            load_orders_from_path(&path),
            Err(LoadError::InvalidDate { line: 2, .. })
        ));
    }

    #[test]
    fn zip_signature_without_a_workbook_is_a_workbook_error() {
        assert!(matches!(
            load_orders_from_bytes(b"PK\x03\x04not really a workbook"),
            Err(LoadError::Workbook(_))
        ));
    }

    #[test]
    fn excel_serial_dates_become_calendar_dates() {
        assert_eq!(excel_serial_to_text(45_959.0).as_deref(), Some("2025-10-29"));
        assert_eq!(
            excel_serial_to_text(45_959.5).as_deref(),
            Some("2025-10-29 12:00:00")
        );
    }

    #[test]
    fn out_of_range_excel_serials_are_rejected() {
        assert_eq!(excel_serial_to_text(1.0e15), None);
        assert_eq!(excel_serial_to_text(1.0e300), None);
        assert_eq!(excel_serial_to_text(f64::NAN), None);
        assert_eq!(excel_serial_to_text(f64::INFINITY), None);
        assert_eq!(excel_serial_to_text(-1.0), None);
        assert_eq!(excel_serial_to_text(0.0), None);
    }

    #[test]
    fn huge_quantities_are_invalid_fields() {
        let csv = sample_csv().replace(",2,15.5,", ",1e30,15.5,");
        match load_orders_from_bytes(csv.as_bytes()) {
            Err(LoadError::InvalidField { line, column, value }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "quantity");
                assert_eq!(value, "1e30");
            }
            other => panic!("expected invalid quantity, got {other:?}"),
        }
        let csv = sample_csv().replace(",2,15.5,", ",3.0,15.5,");
        let orders = load_orders_from_bytes(csv.as_bytes()).expect("float quantity");
        assert_eq!(orders[1].quantity, 3);
    }
}
