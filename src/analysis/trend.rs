//! Monthly series and linear trend fitting.
//!
//! A product's rows are bucketed into `YYYY-MM` periods and a least-squares
//! line is fitted over the zero-based index of each period. The index is used
//! rather than the calendar date, so gaps between months are not stretched.

use crate::models::{PeriodPoint, SalesRecord, Trend, TrendLine};
use std::collections::BTreeMap;

/// Build the sorted monthly units series of one product.
///
/// Periods are sorted by their `YYYY-MM` label; with a four-digit year and a
/// zero-padded month, that order is chronological.
pub fn build_series<'a, I>(records: I, product: &str) -> Vec<PeriodPoint>
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let mut periods: BTreeMap<String, f64> = BTreeMap::new();

    for record in records.into_iter().filter(|r| r.product == product) {
        *periods.entry(record.period()).or_default() += record.units_sold;
    }

    periods
        .into_iter()
        .map(|(period, units)| PeriodPoint::new(period, units))
        .collect()
}

/// Fit a trend line to a series. Fewer than two points yield [`Trend::NoTrend`].
pub fn fit_trend(series: &[PeriodPoint]) -> Trend {
    let values: Vec<f64> = series.iter().map(|p| p.units_sold).collect();
    fit_values(&values)
}

/// Ordinary least squares of `values[i]` against `i`.
pub fn fit_values(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::NoTrend;
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    // sxx > 0 whenever there are at least two points.
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let fitted: Vec<f64> = (0..values.len())
        .map(|i| intercept + slope * i as f64)
        .collect();
    let r_squared = r_squared(values, &fitted, mean_y);

    Trend::Line(TrendLine {
        slope,
        intercept,
        fitted,
        r_squared,
    })
}

/// Coefficient of determination. A constant series is fitted exactly.
fn r_squared(values: &[f64], fitted: &[f64], mean: f64) -> f64 {
    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;

    for (y, y_hat) in values.iter().zip(fitted) {
        ss_tot += (y - mean).powi(2);
        ss_res += (y - y_hat).powi(2);
    }

    if ss_tot == 0.0 {
        return 1.0;
    }

    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrendDirection;

    fn record(product: &str, year: i32, month: u32, units: f64) -> SalesRecord {
        SalesRecord {
            branch: "Norte".to_string(),
            product: product.to_string(),
            year,
            month,
            revenue_total: units * 2.0,
            cost_total: units,
            units_sold: units,
        }
    }

    fn series(values: &[f64]) -> Vec<PeriodPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| PeriodPoint::new(format!("2024-{:02}", i + 1), *v))
            .collect()
    }

    #[test]
    fn test_build_series_sorts_and_sums() {
        let records = vec![
            record("Café", 2023, 11, 5.0),
            record("Café", 2024, 1, 7.0),
            record("Té", 2023, 5, 100.0),
            record("Café", 2023, 2, 3.0),
            record("Café", 2024, 1, 1.0),
        ];

        let points = build_series(&records, "Café");
        let periods: Vec<_> = points.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2023-02", "2023-11", "2024-01"]);

        let units: Vec<_> = points.iter().map(|p| p.units_sold).collect();
        assert_eq!(units, vec![3.0, 5.0, 8.0]);

        let years: Vec<_> = points.iter().map(|p| p.year_label.as_str()).collect();
        assert_eq!(years, vec!["2023", "2023", "2024"]);
    }

    #[test]
    fn test_build_series_unknown_product() {
        let records = vec![record("Café", 2023, 1, 5.0)];
        assert!(build_series(&records, "Té").is_empty());
    }

    #[test]
    fn test_fit_linear_series() {
        let trend = fit_trend(&series(&[10.0, 20.0, 30.0]));
        let line = trend.line().expect("three points should fit a line");

        assert_eq!(line.slope, 10.0);
        assert_eq!(line.intercept, 10.0);
        assert_eq!(line.fitted, vec![10.0, 20.0, 30.0]);
        assert_eq!(line.r_squared, 1.0);
        assert_eq!(line.direction(), TrendDirection::Increasing);
    }

    #[test]
    fn test_single_point_has_no_trend() {
        assert_eq!(fit_trend(&series(&[42.0])), Trend::NoTrend);
        assert_eq!(fit_trend(&[]), Trend::NoTrend);
    }

    #[test]
    fn test_constant_series_is_flat() {
        let trend = fit_trend(&series(&[7.0, 7.0, 7.0, 7.0]));
        let line = trend.line().unwrap();

        assert_eq!(line.slope, 0.0);
        assert_eq!(line.intercept, 7.0);
        assert_eq!(line.direction(), TrendDirection::Flat);
    }

    #[test]
    fn test_two_points_pass_through_both() {
        let trend = fit_values(&[50.0, 20.0]);
        let line = trend.line().unwrap();

        assert_eq!(line.slope, -30.0);
        assert_eq!(line.intercept, 50.0);
        assert_eq!(line.fitted, vec![50.0, 20.0]);
        assert_eq!(line.direction(), TrendDirection::Decreasing);
    }

    #[test]
    fn test_noisy_series_least_squares() {
        // y = 1, 3, 2, 5: slope 1.1, intercept 1.1.
        let line = fit_values(&[1.0, 3.0, 2.0, 5.0]).line().cloned().unwrap();
        assert!((line.slope - 1.1).abs() < 1e-9);
        assert!((line.intercept - 1.1).abs() < 1e-9);
        assert!(line.r_squared > 0.0 && line.r_squared < 1.0);
    }
}
