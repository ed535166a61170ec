//! Cross-sectional percentile ranks.

use crate::signal::MonthlySignal;
use std::cmp::Ordering;

/// Percentile ranks in `(0, 1]`: average rank for ties, divided by count.
///
/// The smallest value ranks `1/n` and the largest `1`. Non-finite values get
/// `NaN` and are excluded from the count.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let n = order.len() as f64;

    let mut ranks = vec![f64::NAN; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share the average of ranks start+1..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average / n;
        }
        start = end;
    }
    ranks
}

/// Sort signals by trailing return, highest first; ties by ticker ascending.
pub fn sort_descending(signals: &mut [MonthlySignal]) {
    signals.sort_by(|a, b| {
        b.trailing_return
            .partial_cmp(&a.trailing_return)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}
