//! Per-product aggregation and summary statistics.
//!
//! This module groups sales records by product and derives average price,
//! margin and the row-to-row variation shown on the metric cards.

use crate::models::{BranchFilter, ProductSummary, SalesRecord, SalesTotals};
use std::collections::HashMap;

/// Divide, returning `None` instead of an infinite or undefined result.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Percent change of `current` against `previous`.
fn percent_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let ratio = safe_ratio(current?, previous?)?;
    Some((ratio - 1.0) * 100.0)
}

/// Keep only the records that pass the branch filter.
pub fn filter_by_branch<'a>(
    records: &'a [SalesRecord],
    filter: &BranchFilter,
) -> Vec<&'a SalesRecord> {
    records.iter().filter(|r| filter.matches(&r.branch)).collect()
}

/// Distinct branch names in first-appearance order.
pub fn distinct_branches(records: &[SalesRecord]) -> Vec<String> {
    let mut branches: Vec<String> = Vec::new();

    for record in records {
        if !branches.contains(&record.branch) {
            branches.push(record.branch.clone());
        }
    }

    branches
}

/// Running sums for one product.
#[derive(Debug, Default)]
struct ProductTotals {
    revenue_total: f64,
    cost_total: f64,
    units_sold: f64,
}

/// Group records by product and compute the summary metrics.
///
/// Products are listed in the order they first appear after filtering.
/// `price_change_pct` and `units_change_pct` compare each product with the
/// one listed before it, so the first product never has a value.
pub fn aggregate(records: &[SalesRecord], filter: &BranchFilter) -> Vec<ProductSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, ProductTotals> = HashMap::new();

    for record in filter_by_branch(records, filter) {
        let totals = grouped.entry(record.product.as_str()).or_insert_with(|| {
            order.push(record.product.as_str());
            ProductTotals::default()
        });
        totals.revenue_total += record.revenue_total;
        totals.cost_total += record.cost_total;
        totals.units_sold += record.units_sold;
    }

    let mut summaries: Vec<ProductSummary> = Vec::with_capacity(order.len());

    for product in order {
        let totals = &grouped[product];
        let average_price = safe_ratio(totals.revenue_total, totals.units_sold);
        let average_margin = safe_ratio(
            totals.revenue_total - totals.cost_total,
            totals.revenue_total,
        );

        let (price_change_pct, units_change_pct) = match summaries.last() {
            Some(prev) => (
                percent_change(average_price, prev.average_price),
                percent_change(Some(totals.units_sold), Some(prev.units_sold)),
            ),
            None => (None, None),
        };

        summaries.push(ProductSummary {
            product: product.to_string(),
            revenue_total: totals.revenue_total,
            cost_total: totals.cost_total,
            units_sold: totals.units_sold,
            average_price,
            average_margin,
            price_change_pct,
            units_change_pct,
        });
    }

    summaries
}

/// Overall totals of the filtered records.
pub fn compute_totals(records: &[SalesRecord], filter: &BranchFilter) -> SalesTotals {
    let filtered = filter_by_branch(records, filter);

    let mut products: Vec<&str> = Vec::new();
    for record in &filtered {
        if !products.contains(&record.product.as_str()) {
            products.push(record.product.as_str());
        }
    }

    let revenue_total: f64 = filtered.iter().map(|r| r.revenue_total).sum();
    let cost_total: f64 = filtered.iter().map(|r| r.cost_total).sum();

    SalesTotals {
        revenue_total,
        cost_total,
        units_sold: filtered.iter().map(|r| r.units_sold).sum(),
        margin: safe_ratio(revenue_total - cost_total, revenue_total),
        products: products.len(),
        records: filtered.len(),
    }
}

/// Products sorted by units sold (highest first), limited to `n`.
pub fn top_sellers(summaries: &[ProductSummary], n: usize) -> Vec<&ProductSummary> {
    let mut sorted: Vec<&ProductSummary> = summaries.iter().collect();
    sorted.sort_by(|a, b| {
        b.units_sold
            .partial_cmp(&a.units_sold)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}
