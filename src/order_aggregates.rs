//! Aggregates behind each dashboard view. Everything here is a pure function
//! of a non-empty [`FilteredView`]. Cent totals are checked and fail with
//! [`PipelineError::AmountOverflow`] instead of wrapping.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::PipelineError;
use crate::order_filter::{weekday_name, FilteredView, WEEKDAYS};
use crate::order_record::{format_count, format_usd};

pub const DEFAULT_TOP_PRODUCTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryMetrics {
    pub order_count: u64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
    pub flagged_fraud_count: u64,
}

/// The four metric tiles as rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsDisplay {
    pub total_orders: String,
    pub total_revenue: String,
    pub total_profit: String,
    pub preflagged_fraud: String,
}

impl SummaryMetrics {
    pub fn display(&self) -> MetricsDisplay {
        MetricsDisplay {
            total_orders: format_count(self.order_count),
            total_revenue: format_usd(self.revenue_cents),
            total_profit: format_usd(self.profit_cents),
            preflagged_fraud: format_count(self.flagged_fraud_count),
        }
    }
}

fn add_cents(total: i64, cents: i64) -> Result<i64, PipelineError> {
    total.checked_add(cents).ok_or(PipelineError::AmountOverflow)
}

fn add_cents_into(slot: &mut i64, cents: i64) -> Result<(), PipelineError> {
    *slot = add_cents(*slot, cents)?;
    Ok(())
}

pub fn summary_metrics(view: &FilteredView<'_>) -> Result<SummaryMetrics, PipelineError> {
    let mut metrics = SummaryMetrics {
        order_count: 0,
        revenue_cents: 0,
        profit_cents: 0,
        flagged_fraud_count: 0,
    };
    for rec in view.records() {
        metrics.order_count += 1;
        add_cents_into(&mut metrics.revenue_cents, rec.total_price_cents)?;
        add_cents_into(&mut metrics.profit_cents, rec.profit_cents)?;
        metrics.flagged_fraud_count += u64::from(rec.is_fraud);
    }
    Ok(metrics)
}

/// Profit per calendar day, ascending.
pub fn daily_profit(view: &FilteredView<'_>) -> Result<Vec<(NaiveDate, i64)>, PipelineError> {
    let mut by_day = BTreeMap::<NaiveDate, i64>::new();
    for rec in view.records() {
        add_cents_into(by_day.entry(rec.order_day()).or_insert(0), rec.profit_cents)?;
    }
    Ok(by_day.into_iter().collect())
}

/// Sales per hour of day; only hours that have orders, ascending.
pub fn sales_by_hour(view: &FilteredView<'_>) -> Result<Vec<(u32, i64)>, PipelineError> {
    let mut by_hour = BTreeMap::<u32, i64>::new();
    for order in view.orders() {
        add_cents_into(
            by_hour.entry(order.hour_of_day).or_insert(0),
            order.record.total_price_cents,
        )?;
    }
    Ok(by_hour.into_iter().collect())
}

/// Always seven buckets, Monday first; days without orders are zero.
pub fn sales_by_weekday(
    view: &FilteredView<'_>,
) -> Result<Vec<(&'static str, i64)>, PipelineError> {
    let mut totals = [0_i64; 7];
    for order in view.orders() {
        add_cents_into(
            &mut totals[order.day_of_week.num_days_from_monday() as usize],
            order.record.total_price_cents,
        )?;
    }
    Ok(WEEKDAYS
        .iter()
        .zip(totals)
        .map(|(day, total)| (weekday_name(*day), total))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

/// Frequency count, highest first; equal counts keep first-seen order.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<ValueCount> {
    let mut counts = HashMap::<&str, (u64, usize)>::new();
    for (idx, value) in values.enumerate() {
        counts.entry(value).or_insert((0, idx)).0 += 1;
    }
    let mut rows = counts.into_iter().collect::<Vec<_>>();
    rows.sort_by(|(_, (a_count, a_first)), (_, (b_count, b_first))| {
        b_count.cmp(a_count).then(a_first.cmp(b_first))
    });
    rows.into_iter()
        .map(|(value, (count, _))| ValueCount {
            value: value.to_string(),
            count,
        })
        .collect()
}

/// At most `limit` products; fewer distinct products yields fewer rows.
pub fn top_products(view: &FilteredView<'_>, limit: usize) -> Vec<ValueCount> {
    let mut rows = value_counts(view.records().map(|r| r.product_name.as_str()));
    rows.truncate(limit);
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub share: f64,
}

pub fn category_counts(view: &FilteredView<'_>) -> Vec<CategoryShare> {
    let total = view.len() as f64;
    value_counts(view.records().map(|r| r.category.as_str()))
        .into_iter()
        .map(|vc| CategoryShare {
            share: vc.count as f64 / total,
            category: vc.value,
            count: vc.count,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapMetric {
    #[default]
    TotalSales,
    TotalProfit,
    FraudulentOrders,
}

impl MapMetric {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "" | "total_sales" | "sales" => Some(MapMetric::TotalSales),
            "total_profit" | "profit" => Some(MapMetric::TotalProfit),
            "fraudulent_orders" | "fraud" | "fraud_count" => Some(MapMetric::FraudulentOrders),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MapMetric::TotalSales => "Total Sales",
            MapMetric::TotalProfit => "Total Profit",
            MapMetric::FraudulentOrders => "Number of Fraudulent Orders",
        }
    }

    pub fn value_column(&self) -> &'static str {
        match self {
            MapMetric::TotalSales => "total_price",
            MapMetric::TotalProfit => "profit",
            MapMetric::FraudulentOrders => "fraud_count",
        }
    }
}

/// Per-state totals, state codes ascending. Amounts are cents; the fraud
/// metric is an order count and only lists states with flagged orders.
pub fn state_totals(
    view: &FilteredView<'_>,
    metric: MapMetric,
) -> Result<Vec<(String, i64)>, PipelineError> {
    let mut by_state = BTreeMap::<&str, i64>::new();
    for rec in view.records() {
        let value = match metric {
            MapMetric::TotalSales => rec.total_price_cents,
            MapMetric::TotalProfit => rec.profit_cents,
            MapMetric::FraudulentOrders if rec.is_fraud => 1,
            MapMetric::FraudulentOrders => continue,
        };
        add_cents_into(by_state.entry(rec.state.as_str()).or_insert(0), value)?;
    }
    Ok(by_state
        .into_iter()
        .map(|(state, value)| (state.to_string(), value))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreemapNode {
    pub label: String,
    pub value_cents: i64,
    pub children: Vec<TreemapNode>,
}

/// `All` -> category -> product, each node holding summed sales.
pub fn sales_treemap(view: &FilteredView<'_>) -> Result<TreemapNode, PipelineError> {
    let mut tree = BTreeMap::<&str, BTreeMap<&str, i64>>::new();
    for rec in view.records() {
        let leaf = tree
            .entry(rec.category.as_str())
            .or_default()
            .entry(rec.product_name.as_str())
            .or_insert(0);
        add_cents_into(leaf, rec.total_price_cents)?;
    }
    let mut children = Vec::with_capacity(tree.len());
    for (category, products) in tree {
        let mut category_cents = 0_i64;
        let mut leaves = Vec::with_capacity(products.len());
        for (product, value_cents) in products {
            add_cents_into(&mut category_cents, value_cents)?;
            leaves.push(TreemapNode {
                label: product.to_string(),
                value_cents,
                children: Vec::new(),
            });
        }
        children.push(TreemapNode {
            label: category.to_string(),
            value_cents: category_cents,
            children: leaves,
        });
    }
    let value_cents = children
        .iter()
        .try_fold(0_i64, |acc, c| add_cents(acc, c.value_cents))?;
    Ok(TreemapNode {
        label: "All".to_string(),
        value_cents,
        children,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceDiscountPoint {
    pub order_id: String,
    pub total_price_cents: i64,
    pub total_discount_cents: i64,
    pub is_fraud: bool,
}

/// Points for the price vs. discount anomaly scatter.
pub fn price_discount_points(view: &FilteredView<'_>) -> Vec<PriceDiscountPoint> {
    view.records()
        .map(|rec| PriceDiscountPoint {
            order_id: rec.order_id.clone(),
            total_price_cents: rec.total_price_cents,
            total_discount_cents: rec.total_discount_cents,
            is_fraud: rec.is_fraud,
        })
        .collect()
}
