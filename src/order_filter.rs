use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use std::collections::HashSet;

use crate::error::PipelineError;
use crate::order_record::OrderRecord;

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// What the sidebar widgets offer for a loaded file: full date bounds and the
/// distinct categories / payment methods in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub categories: Vec<String>,
    pub payment_methods: Vec<String>,
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

impl FilterOptions {
    /// `None` for an empty order set.
    pub fn from_orders(orders: &[OrderRecord]) -> Option<Self> {
        let min_date = orders.iter().map(OrderRecord::order_day).min()?;
        let max_date = orders.iter().map(OrderRecord::order_day).max()?;
        Some(Self {
            min_date,
            max_date,
            categories: distinct_in_order(orders.iter().map(|o| o.category.as_str())),
            payment_methods: distinct_in_order(orders.iter().map(|o| o.payment_method.as_str())),
        })
    }
}

/// User selection. An empty category or payment set is a real selection that
/// matches nothing; "everything" must be spelled out with [`FilterSelection::covering`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub categories: HashSet<String>,
    pub payment_methods: HashSet<String>,
}

impl FilterSelection {
    pub fn covering(options: &FilterOptions) -> Self {
        Self {
            start_date: options.min_date,
            end_date: options.max_date,
            categories: options.categories.iter().cloned().collect(),
            payment_methods: options.payment_methods.iter().cloned().collect(),
        }
    }

    pub fn matches(&self, order: &OrderRecord) -> bool {
        let day = order.order_day();
        day >= self.start_date
            && day <= self.end_date
            && self.categories.contains(&order.category)
            && self.payment_methods.contains(&order.payment_method)
    }
}

/// A record that passed the filter, with the time fields views group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilteredOrder<'a> {
    pub record: &'a OrderRecord,
    pub hour_of_day: u32,
    pub day_of_week: Weekday,
}

impl<'a> FilteredOrder<'a> {
    fn new(record: &'a OrderRecord) -> Self {
        Self {
            record,
            hour_of_day: record.order_date.hour(),
            day_of_week: record.order_date.weekday(),
        }
    }

    pub fn day_of_week_name(&self) -> &'static str {
        weekday_name(self.day_of_week)
    }
}

/// Non-empty, load-ordered projection of the order set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredView<'a> {
    orders: Vec<FilteredOrder<'a>>,
}

impl<'a> FilteredView<'a> {
    pub fn orders(&self) -> &[FilteredOrder<'a>] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &'a OrderRecord> + '_ {
        self.orders.iter().map(|o| o.record)
    }
}

pub fn filter_orders<'a>(
    orders: &'a [OrderRecord],
    selection: &FilterSelection,
) -> Result<FilteredView<'a>, PipelineError> {
    let filtered = orders
        .iter()
        .filter(|o| selection.matches(o))
        .map(FilteredOrder::new)
        .collect::<Vec<_>>();
    log::debug!(
        "filter kept {} of {} orders ({}..={}, {} categories, {} payment methods)",
        filtered.len(),
        orders.len(),
        selection.start_date,
        selection.end_date,
        selection.categories.len(),
        selection.payment_methods.len()
    );
    if filtered.is_empty() {
        return Err(PipelineError::EmptyResult);
    }
    Ok(FilteredView { orders: filtered })
}
