//! Data models for the sales dashboard.
//!
//! This module contains the core data structures that flow through the
//! pipeline: raw input rows, per-product summaries, period series, fitted
//! trends and the assembled report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slopes with an absolute value below this are reported as flat.
const FLAT_SLOPE_EPSILON: f64 = 1e-9;

/// One row of the input sales table.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    /// Branch (sales location) the row belongs to.
    pub branch: String,
    /// Product the row belongs to.
    pub product: String,
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1 to 12.
    pub month: u32,
    /// Total revenue of the row.
    pub revenue_total: f64,
    /// Total cost of the row.
    pub cost_total: f64,
    /// Units sold in the row.
    pub units_sold: f64,
}

impl SalesRecord {
    /// Returns the `YYYY-MM` period label of this row.
    pub fn period(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// Which branches take part in an analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchFilter {
    /// Every branch.
    #[default]
    All,
    /// Only the named branch.
    Only(String),
}

impl BranchFilter {
    /// Build a filter from a selector value.
    ///
    /// `None`, an empty string, the configured sentinel (e.g. "Todas") and
    /// the literal "All" all select every branch.
    pub fn from_selection(selection: Option<&str>, all_label: &str) -> Self {
        match selection.map(str::trim) {
            None => BranchFilter::All,
            Some(s) if s.is_empty() || s == all_label || s.eq_ignore_ascii_case("all") => {
                BranchFilter::All
            }
            Some(s) => BranchFilter::Only(s.to_string()),
        }
    }

    /// Returns true if a row from `branch` passes the filter.
    pub fn matches(&self, branch: &str) -> bool {
        match self {
            BranchFilter::All => true,
            BranchFilter::Only(selected) => selected == branch,
        }
    }

    /// Returns the selected branch name, if any.
    pub fn selected(&self) -> Option<&str> {
        match self {
            BranchFilter::All => None,
            BranchFilter::Only(s) => Some(s),
        }
    }
}

impl fmt::Display for BranchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchFilter::All => write!(f, "All Branches"),
            BranchFilter::Only(s) => write!(f, "{}", s),
        }
    }
}

/// Aggregated metrics for one product.
///
/// Derived ratios are `None` when their denominator is zero (or, for the
/// change percentages, when there is no usable predecessor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product: String,
    pub revenue_total: f64,
    pub cost_total: f64,
    pub units_sold: f64,
    /// Revenue per unit sold.
    pub average_price: Option<f64>,
    /// (revenue - cost) / revenue, as a fraction.
    pub average_margin: Option<f64>,
    /// Change of `average_price` against the previous product in listing order.
    pub price_change_pct: Option<f64>,
    /// Change of `units_sold` against the previous product in listing order.
    pub units_change_pct: Option<f64>,
}

/// Units sold by one product in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPoint {
    /// `YYYY-MM`.
    pub period: String,
    /// `YYYY`, used for axis labels only.
    pub year_label: String,
    pub units_sold: f64,
}

impl PeriodPoint {
    /// Creates a point, deriving the year label from the period.
    pub fn new(period: String, units_sold: f64) -> Self {
        let year_label = period.chars().take(4).collect();
        Self {
            period,
            year_label,
            units_sold,
        }
    }
}

/// General direction of a fitted trend line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "Increasing"),
            TrendDirection::Decreasing => write!(f, "Decreasing"),
            TrendDirection::Flat => write!(f, "Flat"),
        }
    }
}

impl TrendDirection {
    /// Returns an arrow representation of the direction.
    pub fn arrow(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "↗",
            TrendDirection::Decreasing => "↘",
            TrendDirection::Flat => "→",
        }
    }
}

/// A least-squares line over the period index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    /// The line evaluated at each index of the series.
    pub fitted: Vec<f64>,
    /// Coefficient of determination, clamped to [0, 1].
    pub r_squared: f64,
}

impl TrendLine {
    pub fn direction(&self) -> TrendDirection {
        if self.slope > FLAT_SLOPE_EPSILON {
            TrendDirection::Increasing
        } else if self.slope < -FLAT_SLOPE_EPSILON {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Flat
        }
    }
}

/// Result of fitting a trend to a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trend {
    /// Fewer than two points: nothing to draw.
    NoTrend,
    Line(TrendLine),
}

impl Trend {
    /// Returns the fitted line, if there is one.
    pub fn line(&self) -> Option<&TrendLine> {
        match self {
            Trend::NoTrend => None,
            Trend::Line(line) => Some(line),
        }
    }
}

/// Everything the display layer needs for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductReport {
    pub summary: ProductSummary,
    pub series: Vec<PeriodPoint>,
    pub trend: Trend,
}

/// Totals over the filtered input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub revenue_total: f64,
    pub cost_total: f64,
    pub units_sold: f64,
    /// Overall margin, `None` when there is no revenue.
    pub margin: Option<f64>,
    pub products: usize,
    pub records: usize,
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Name of the analysed input (file name or upload name).
    pub source: String,
    /// Branch filter applied to the pass.
    pub branch: BranchFilter,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Rows read from the input.
    pub records_loaded: usize,
    /// Rows left after the branch filter.
    pub records_analyzed: usize,
    /// Duration of the pass in seconds.
    pub duration_seconds: f64,
}

/// The complete sales report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Distinct branches of the input, in first-appearance order.
    pub branches: Vec<String>,
    pub totals: SalesTotals,
    pub products: Vec<ProductReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: i32, month: u32) -> SalesRecord {
        SalesRecord {
            branch: "Centro".to_string(),
            product: "Café".to_string(),
            year,
            month,
            revenue_total: 100.0,
            cost_total: 40.0,
            units_sold: 10.0,
        }
    }

    #[test]
    fn test_period_label_zero_pads_month() {
        assert_eq!(record(2024, 3).period(), "2024-03");
        assert_eq!(record(2024, 12).period(), "2024-12");
        assert_eq!(record(2023, 7).period(), "2023-07");
    }

    #[test]
    fn test_period_point_year_label() {
        let point = PeriodPoint::new("2023-11".to_string(), 5.0);
        assert_eq!(point.year_label, "2023");
        assert_eq!(point.period, "2023-11");
    }

    #[test]
    fn test_branch_filter_from_selection() {
        assert_eq!(BranchFilter::from_selection(None, "Todas"), BranchFilter::All);
        assert_eq!(
            BranchFilter::from_selection(Some("Todas"), "Todas"),
            BranchFilter::All
        );
        assert_eq!(
            BranchFilter::from_selection(Some("All"), "Todas"),
            BranchFilter::All
        );
        assert_eq!(
            BranchFilter::from_selection(Some(" Norte "), "Todas"),
            BranchFilter::Only("Norte".to_string())
        );
    }

    #[test]
    fn test_branch_filter_matches() {
        let filter = BranchFilter::Only("Norte".to_string());
        assert!(filter.matches("Norte"));
        assert!(!filter.matches("norte"));
        assert!(BranchFilter::All.matches("anything"));
    }

    #[test]
    fn test_trend_direction() {
        let line = |slope| TrendLine {
            slope,
            intercept: 0.0,
            fitted: vec![],
            r_squared: 1.0,
        };
        assert_eq!(line(2.5).direction(), TrendDirection::Increasing);
        assert_eq!(line(-0.5).direction(), TrendDirection::Decreasing);
        assert_eq!(line(0.0).direction(), TrendDirection::Flat);
    }

    #[test]
    fn test_trend_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Trend::NoTrend).unwrap();
        assert_eq!(json, r#"{"kind":"no_trend"}"#);
    }
}
