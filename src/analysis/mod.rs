//! Analysis pipeline.
//!
//! One pass goes: branch filter, per-product aggregation, then a monthly
//! series and trend for every product. The pass is a pure function of the
//! loaded records and the filter.

pub mod aggregator;
pub mod trend;

pub use aggregator::*;
pub use trend::*;

use crate::models::{BranchFilter, ProductReport, Report, ReportMetadata, SalesRecord};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

/// Aggregate and fit trends for every product that passes the filter.
pub fn analyze(records: &[SalesRecord], filter: &BranchFilter) -> Vec<ProductReport> {
    let filtered = filter_by_branch(records, filter);

    aggregate(records, filter)
        .into_iter()
        .map(|summary| {
            let series = build_series(filtered.iter().copied(), &summary.product);
            let trend = fit_trend(&series);
            debug!(
                "{}: {} periods, trend {}",
                summary.product,
                series.len(),
                trend
                    .line()
                    .map(|l| format!("slope {:.3}", l.slope))
                    .unwrap_or_else(|| "none".to_string())
            );
            ProductReport {
                summary,
                series,
                trend,
            }
        })
        .collect()
}

/// Run a full pass and assemble the report.
pub fn build_report(source: &str, records: &[SalesRecord], filter: BranchFilter) -> Report {
    let start_time = Instant::now();

    let products = analyze(records, &filter);
    let totals = compute_totals(records, &filter);
    let branches = distinct_branches(records);

    info!(
        "Analyzed {} of {} records: {} products ({})",
        totals.records,
        records.len(),
        products.len(),
        filter
    );

    let metadata = ReportMetadata {
        source: source.to_string(),
        branch: filter,
        generated_at: Utc::now(),
        records_loaded: records.len(),
        records_analyzed: totals.records,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    Report {
        metadata,
        branches,
        totals,
        products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SalesLoader;
    use crate::models::Trend;

    fn fixture() -> Vec<SalesRecord> {
        SalesLoader::default()
            .load_str(include_str!("../../fixtures/ventas.csv"))
            .unwrap()
    }

    #[test]
    fn test_analyze_fixture_all_branches() {
        let products = analyze(&fixture(), &BranchFilter::All);
        let names: Vec<_> = products
            .iter()
            .map(|p| p.summary.product.as_str())
            .collect();
        assert_eq!(names, vec!["Café", "Té", "Chocolate", "Muestras"]);

        let cafe = &products[0];
        let periods: Vec<_> = cafe.series.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(
            periods,
            vec!["2023-01", "2023-02", "2023-03", "2024-01", "2024-02"]
        );
        // 2023-01 combines Norte (120) and Sur (80).
        assert_eq!(cafe.series[0].units_sold, 200.0);
        assert!(cafe.trend.line().is_some());

        let muestras = &products[3];
        assert_eq!(muestras.summary.average_price, None);
        assert_eq!(muestras.trend, Trend::NoTrend);
    }

    #[test]
    fn test_analyze_series_follow_branch_filter() {
        let products = analyze(&fixture(), &BranchFilter::Only("Sur".to_string()));
        let cafe = products
            .iter()
            .find(|p| p.summary.product == "Café")
            .unwrap();
        assert_eq!(cafe.series[0].units_sold, 80.0);

        let series_units: f64 = cafe.series.iter().map(|p| p.units_sold).sum();
        assert_eq!(series_units, cafe.summary.units_sold);
    }

    #[test]
    fn test_build_report() {
        let records = fixture();
        let filter = BranchFilter::Only("Centro".to_string());
        let report = build_report("ventas.csv", &records, filter);

        assert_eq!(report.metadata.source, "ventas.csv");
        assert_eq!(report.metadata.records_loaded, records.len());
        assert_eq!(report.metadata.records_analyzed, 5);
        assert_eq!(report.branches, vec!["Norte", "Sur", "Centro"]);
        assert_eq!(report.totals.products, report.products.len());
    }

    #[test]
    fn test_build_report_unknown_branch() {
        let filter = BranchFilter::Only("Oeste".to_string());
        let report = build_report("ventas.csv", &fixture(), filter);
        assert!(report.products.is_empty());
        assert_eq!(report.totals.records, 0);
    }
}
