//! Trend Statistics Module
//! Null-aware rolling means and summary figures over date-indexed series.

use chrono::{Datelike, Duration, NaiveDate};

/// Trailing simple moving average over the last `window` observations.
///
/// The value at position `i` is the mean of the non-null values among
/// positions `max(0, i - window + 1)..=i`. A window containing no values
/// yields null. Output length always equals input length.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let mut sum = 0.0;
        let mut count = 0usize;
        for value in values[start..=i].iter().flatten() {
            sum += value;
            count += 1;
        }
        out.push(if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        });
    }

    out
}

/// Most recent non-null value and its date. `dates` and `values` are
/// parallel, date ascending.
pub fn latest_non_null(dates: &[NaiveDate], values: &[Option<f64>]) -> Option<(NaiveDate, f64)> {
    dates
        .iter()
        .zip(values)
        .rev()
        .find_map(|(&date, value)| value.map(|v| (date, v)))
}

/// Monday of the calendar week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sum values per calendar week, keyed by the week's Monday. Nulls count
/// as zero, matching a resample-then-sum over a sparse daily series.
/// Input dates must be ascending.
pub fn weekly_totals(dates: &[NaiveDate], values: &[Option<f64>]) -> Vec<(NaiveDate, f64)> {
    let mut totals: Vec<(NaiveDate, f64)> = Vec::new();

    for (&date, value) in dates.iter().zip(values) {
        let week = week_start(date);
        let value = value.unwrap_or(0.0);
        match totals.last_mut() {
            Some((last_week, sum)) if *last_week == week => *sum += value,
            _ => totals.push((week, value)),
        }
    }

    totals
}

/// The most recent week's total and its percentage change versus the prior
/// week. The change is `None` when there is no prior week or its total is
/// zero. Returns `None` for an empty series.
pub fn latest_weekly_change(
    dates: &[NaiveDate],
    values: &[Option<f64>],
) -> Option<(f64, Option<f64>)> {
    let totals = weekly_totals(dates, values);
    let (_, latest) = *totals.last()?;

    let pct_change = if totals.len() >= 2 {
        let prev = totals[totals.len() - 2].1;
        (prev != 0.0).then(|| (latest - prev) / prev * 100.0)
    } else {
        None
    };

    Some((latest, pct_change))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, day).unwrap()
    }

    fn variance(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    }

    #[test]
    fn rolling_mean_worked_example() {
        // [10, null, 30, 40] with a 2-day window: the null is ignored
        // inside each window, so every output point is defined.
        let values = [Some(10.0), None, Some(30.0), Some(40.0)];
        let rolled = rolling_mean(&values, 2);
        assert_eq!(
            rolled,
            vec![Some(10.0), Some(10.0), Some(30.0), Some(35.0)]
        );
    }

    #[test]
    fn window_one_is_identity() {
        let values = [Some(1.0), None, Some(3.0), None, Some(5.0)];
        assert_eq!(rolling_mean(&values, 1), values.to_vec());
    }

    #[test]
    fn all_null_window_stays_null() {
        let values = [None, None, Some(4.0)];
        assert_eq!(rolling_mean(&values, 2), vec![None, None, Some(4.0)]);
    }

    #[test]
    fn length_is_preserved() {
        let values: Vec<Option<f64>> = (0..37).map(|i| Some(i as f64)).collect();
        for window in [1, 3, 7, 14, 100] {
            assert_eq!(rolling_mean(&values, window).len(), values.len());
        }
    }

    #[test]
    fn rolling_never_nulls_a_present_value() {
        let values = [Some(2.0), None, None, Some(8.0), None, Some(1.0)];
        for window in [1, 2, 5] {
            let rolled = rolling_mean(&values, window);
            for (raw, out) in values.iter().zip(&rolled) {
                if raw.is_some() {
                    assert!(out.is_some());
                }
            }
        }
    }

    #[test]
    fn wider_windows_smooth() {
        let values: Vec<Option<f64>> = [10.0, 50.0, 10.0, 50.0, 10.0, 50.0, 10.0, 50.0]
            .iter()
            .map(|&v| Some(v))
            .collect();
        let raw: Vec<f64> = values.iter().map(|v| v.unwrap()).collect();
        let smoothed: Vec<f64> = rolling_mean(&values, 4)
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        assert!(variance(&smoothed) < variance(&raw));
    }

    #[test]
    fn latest_non_null_skips_trailing_nulls() {
        let dates = [date(1), date(2), date(3)];
        let values = [Some(10.0), Some(20.0), None];
        assert_eq!(latest_non_null(&dates, &values), Some((date(2), 20.0)));

        let empty = [None, None, None];
        assert_eq!(latest_non_null(&dates, &empty), None);
    }

    #[test]
    fn weekly_totals_bucket_by_monday() {
        // 2021-03-01 is a Monday; days 1..=7 are one week, 8..=10 the next.
        let dates: Vec<NaiveDate> = (1..=10).map(date).collect();
        let values: Vec<Option<f64>> = (1..=10).map(|i| Some(i as f64)).collect();

        let totals = weekly_totals(&dates, &values);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0], (date(1), 28.0));
        assert_eq!(totals[1], (date(8), 27.0));
    }

    #[test]
    fn weekly_change_handles_zero_prior_week() {
        let dates: Vec<NaiveDate> = (1..=10).map(date).collect();
        let mut values: Vec<Option<f64>> = vec![None; 7];
        values.extend([Some(5.0), Some(5.0), Some(5.0)]);

        let (latest, change) = latest_weekly_change(&dates, &values).unwrap();
        assert_eq!(latest, 15.0);
        assert_eq!(change, None);
    }

    #[test]
    fn weekly_change_percentage() {
        let dates: Vec<NaiveDate> = (1..=14).map(date).collect();
        let mut values: Vec<Option<f64>> = vec![Some(10.0); 7];
        values.extend(vec![Some(15.0); 7]);

        let (latest, change) = latest_weekly_change(&dates, &values).unwrap();
        assert_eq!(latest, 105.0);
        let change = change.unwrap();
        assert!((change - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weekly_change_empty_series() {
        assert_eq!(latest_weekly_change(&[], &[]), None);
    }
}
