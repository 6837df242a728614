use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::email_screening::{find_suspicious_emails, suspicious_summary_message};
use crate::error::{PipelineError, QueryError};
use crate::order_aggregates::{
    category_counts, daily_profit, price_discount_points, sales_by_hour, sales_by_weekday,
    sales_treemap, state_totals, summary_metrics, top_products, MapMetric, TreemapNode,
};
use crate::order_filter::{filter_orders, FilterOptions, FilterSelection, FilteredView};
use crate::order_record::{cents_to_dollars, format_order_date, format_usd, OrderRecord};
use crate::settings::DashboardSettings;

pub const DASHBOARD_TITLE: &str = "Analytics Dashboard";

/// Sidebar state as sent by the UI. An absent list means the widget default
/// (every value); a present but empty list selects nothing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardQueryRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub categories: Option<Vec<String>>,
    pub payment_methods: Option<Vec<String>>,
    pub map_metric: Option<String>,
}

pub type ViewQuery =
    fn(&[OrderRecord], &DashboardQueryRequest, &DashboardSettings) -> Result<Value, QueryError>;

fn parse_optional_date(raw: Option<&str>, field_name: &str) -> Result<Option<NaiveDate>, QueryError> {
    let text = raw.unwrap_or("").trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| QueryError::Validation(format!("{field_name} must be a YYYY-MM-DD date")))
}

fn parse_map_metric(raw: Option<&str>) -> Result<MapMetric, QueryError> {
    let text = raw.unwrap_or("");
    MapMetric::parse(text).ok_or_else(|| {
        QueryError::Validation(format!(
            "map_metric must be total_sales/total_profit/fraudulent_orders, got {text:?}"
        ))
    })
}

pub fn build_selection(
    options: &FilterOptions,
    req: &DashboardQueryRequest,
) -> Result<FilterSelection, QueryError> {
    let mut selection = FilterSelection::covering(options);
    if let Some(start) = parse_optional_date(req.start_date.as_deref(), "start_date")? {
        selection.start_date = start;
    }
    if let Some(end) = parse_optional_date(req.end_date.as_deref(), "end_date")? {
        selection.end_date = end;
    }
    if let Some(categories) = &req.categories {
        selection.categories = categories.iter().cloned().collect();
    }
    if let Some(payment_methods) = &req.payment_methods {
        selection.payment_methods = payment_methods.iter().cloned().collect();
    }
    Ok(selection)
}

fn filtered_view<'a>(
    orders: &'a [OrderRecord],
    req: &DashboardQueryRequest,
) -> Result<FilteredView<'a>, QueryError> {
    let options = FilterOptions::from_orders(orders).ok_or(PipelineError::EmptyResult)?;
    let selection = build_selection(&options, req)?;
    Ok(filter_orders(orders, &selection)?)
}

fn money_json(cents: i64) -> Value {
    json!({
        "cents": cents,
        "value": cents_to_dollars(cents),
        "text": format_usd(cents),
    })
}

fn overview_section(view: &FilteredView<'_>) -> Result<Value, QueryError> {
    let metrics = summary_metrics(view)?;
    let display = metrics.display();
    Ok(json!({
        "metrics": [
            { "label": "Total Orders", "value": display.total_orders },
            { "label": "Total Revenue", "value": display.total_revenue },
            { "label": "Total Profit", "value": display.total_profit },
            { "label": "Pre-flagged Fraud", "value": display.preflagged_fraud },
        ],
        "order_count": metrics.order_count,
        "revenue": money_json(metrics.revenue_cents),
        "profit": money_json(metrics.profit_cents),
        "flagged_fraud_count": metrics.flagged_fraud_count,
    }))
}

fn performance_section(view: &FilteredView<'_>) -> Result<Value, QueryError> {
    let daily = daily_profit(view)?
        .into_iter()
        .map(|(date, cents)| {
            json!({
                "order_date": date.format("%Y-%m-%d").to_string(),
                "profit_cents": cents,
                "profit": cents_to_dollars(cents),
            })
        })
        .collect::<Vec<_>>();
    let hourly = sales_by_hour(view)?
        .into_iter()
        .map(|(hour, cents)| {
            json!({
                "hour_of_day": hour,
                "total_price_cents": cents,
                "total_price": cents_to_dollars(cents),
            })
        })
        .collect::<Vec<_>>();
    let weekly = sales_by_weekday(view)?
        .into_iter()
        .map(|(day, cents)| {
            json!({
                "day_of_week": day,
                "total_price_cents": cents,
                "total_price": cents_to_dollars(cents),
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({
        "daily_profit": daily,
        "hourly_sales": hourly,
        "weekly_sales": weekly,
    }))
}

fn products_section(view: &FilteredView<'_>, limit: usize) -> Value {
    let products = top_products(view, limit)
        .into_iter()
        .map(|vc| json!({ "product_name": vc.value, "count": vc.count }))
        .collect::<Vec<_>>();
    let categories = category_counts(view)
        .into_iter()
        .map(|c| json!({ "category": c.category, "count": c.count, "share": c.share }))
        .collect::<Vec<_>>();
    json!({
        "top_products_limit": limit,
        "top_products": products,
        "distinct_category_count": categories.len(),
        "categories": categories,
    })
}

fn geographic_section(view: &FilteredView<'_>, metric: MapMetric) -> Result<Value, QueryError> {
    let rows = state_totals(view, metric)?
        .into_iter()
        .map(|(state, value)| match metric {
            MapMetric::FraudulentOrders => json!({ "state": state, "fraud_count": value }),
            _ => json!({
                "state": state,
                (metric.value_column()): cents_to_dollars(value),
                "cents": value,
            }),
        })
        .collect::<Vec<_>>();
    Ok(json!({
        "map_metric": metric,
        "label": metric.label(),
        "title": format!("{} by State", metric.label()),
        "value_column": metric.value_column(),
        "rows": rows,
    }))
}

fn fraud_section(
    view: &FilteredView<'_>,
    settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    let points = price_discount_points(view)
        .into_iter()
        .map(|p| {
            json!({
                "order_id": p.order_id,
                "total_price": cents_to_dollars(p.total_price_cents),
                "total_discount": cents_to_dollars(p.total_discount_cents),
                "is_fraud": if p.is_fraud { 1 } else { 0 },
            })
        })
        .collect::<Vec<_>>();
    let rules = settings.disposable_domain_rules()?;
    let suspicious = find_suspicious_emails(view.records(), &rules);
    let rows = suspicious
        .iter()
        .map(|s| {
            json!({
                "order_id": s.record.order_id,
                "customer_name": s.record.customer_name,
                "customer_email": s.record.customer_email,
                "total_price": cents_to_dollars(s.record.total_price_cents),
                "fraud_reason": s.fraud_reason,
                "disposable_domain": s.hits.disposable_domain,
                "alias_marker": s.hits.alias_marker,
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({
        "price_discount_points": points,
        "suspicious_email_count": rows.len(),
        "suspicious_email_message": suspicious_summary_message(rows.len()),
        "suspicious_emails": rows,
        "disposable_domains": rules.domains(),
    }))
}

fn treemap_json(node: &TreemapNode) -> Value {
    json!({
        "label": node.label,
        "total_price": cents_to_dollars(node.value_cents),
        "total_price_cents": node.value_cents,
        "children": node.children.iter().map(treemap_json).collect::<Vec<_>>(),
    })
}

fn inspector_section(view: &FilteredView<'_>) -> Value {
    let rows = view
        .orders()
        .iter()
        .map(|o| {
            let r = o.record;
            json!({
                "order_id": r.order_id,
                "order_date": format_order_date(&r.order_date),
                "customer_name": r.customer_name,
                "customer_email": r.customer_email,
                "product_name": r.product_name,
                "category": r.category,
                "quantity": r.quantity,
                "price_per_unit": cents_to_dollars(r.price_per_unit_cents),
                "total_price": cents_to_dollars(r.total_price_cents),
                "total_discount": cents_to_dollars(r.total_discount_cents),
                "coupon_code": r.coupon_code,
                "cost_price_per_unit": cents_to_dollars(r.cost_price_per_unit_cents),
                "total_cost": cents_to_dollars(r.total_cost_cents),
                "profit": cents_to_dollars(r.profit_cents),
                "payment_method": r.payment_method,
                "shipping_address": r.shipping_address,
                "city": r.city,
                "state": r.state,
                "postal_code": r.postal_code,
                "is_fraud": if r.is_fraud { 1 } else { 0 },
                "hour_of_day": o.hour_of_day,
                "day_of_week": o.day_of_week_name(),
            })
        })
        .collect::<Vec<_>>();
    json!({ "row_count": rows.len(), "rows": rows })
}

pub fn filter_options_query(
    orders: &[OrderRecord],
    _req: &DashboardQueryRequest,
    _settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    let options = FilterOptions::from_orders(orders).ok_or(PipelineError::EmptyResult)?;
    Ok(json!({
        "min_date": options.min_date.format("%Y-%m-%d").to_string(),
        "max_date": options.max_date.format("%Y-%m-%d").to_string(),
        "categories": options.categories,
        "payment_methods": options.payment_methods,
        "order_count": orders.len(),
    }))
}

pub fn overview_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    _settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    overview_section(&filtered_view(orders, req)?)
}

pub fn performance_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    _settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    performance_section(&filtered_view(orders, req)?)
}

pub fn products_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    Ok(products_section(
        &filtered_view(orders, req)?,
        settings.top_products_limit,
    ))
}

pub fn geographic_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    _settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    let metric = parse_map_metric(req.map_metric.as_deref())?;
    geographic_section(&filtered_view(orders, req)?, metric)
}

pub fn fraud_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    fraud_section(&filtered_view(orders, req)?, settings)
}

pub fn treemap_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    _settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    Ok(treemap_json(&sales_treemap(&filtered_view(orders, req)?)?))
}

pub fn inspector_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    _settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    Ok(inspector_section(&filtered_view(orders, req)?))
}

/// Every view for one selection, filtered once.
pub fn dashboard_query(
    orders: &[OrderRecord],
    req: &DashboardQueryRequest,
    settings: &DashboardSettings,
) -> Result<Value, QueryError> {
    let metric = parse_map_metric(req.map_metric.as_deref())?;
    let view = filtered_view(orders, req)?;
    Ok(json!({
        "title": DASHBOARD_TITLE,
        "filters": filter_options_query(orders, req, settings)?,
        "overview": overview_section(&view)?,
        "performance": performance_section(&view)?,
        "products": products_section(&view, settings.top_products_limit),
        "geographic": geographic_section(&view, metric)?,
        "fraud": fraud_section(&view, settings)?,
        "treemap": treemap_json(&sales_treemap(&view)?),
        "inspector": inspector_section(&view),
    }))
}
