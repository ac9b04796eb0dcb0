//! Summary statistics for a validated batch

use crate::types::{DatasetSummary, Measurement};

/// Collects one numeric column and reduces it order-independently
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    observations: Vec<f64>,
}

/// Reduced statistics for one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub upper_median: f64,
}

impl Accumulator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.observations.push(value);
    }

    pub fn count(&self) -> usize {
        self.observations.len()
    }

    /// Sorts the observations, so the mean is summed in ascending order and
    /// is bit-identical for any input order.
    pub fn finish(mut self) -> Option<ColumnStats> {
        let n = self.observations.len();
        if n == 0 {
            return None;
        }

        self.observations.sort_by(f64::total_cmp);
        let sum: f64 = self.observations.iter().sum();

        Some(ColumnStats {
            min: self.observations[0],
            max: self.observations[n - 1],
            mean: sum / n as f64,
            upper_median: self.observations[n / 2],
        })
    }
}

/// Compute the summary for `batch`, or `None` when it is empty.
///
/// The median is the upper median (index `n / 2` after sorting), not the
/// average of the two middle values.
pub fn summarize(file_name: &str, batch: &[Measurement]) -> Option<DatasetSummary> {
    let first = batch.first()?;
    let mut earliest = first.timestamp;
    let mut latest = first.timestamp;

    let mut execution = Accumulator::with_capacity(batch.len());
    let mut values = Accumulator::with_capacity(batch.len());

    for m in batch {
        earliest = earliest.min(m.timestamp);
        latest = latest.max(m.timestamp);
        execution.add(m.execution_time);
        values.add(m.value);
    }

    let execution = execution.finish()?;
    let values = values.finish()?;

    let span = latest - earliest;
    let time_span_seconds = match span.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => span.num_seconds() as f64,
    };

    Some(DatasetSummary {
        file_name: file_name.to_string(),
        time_span_seconds,
        earliest_timestamp: earliest,
        mean_execution_time: execution.mean,
        mean_value: values.mean,
        median_value: values.upper_median,
        max_value: values.max,
        min_value: values.min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn day(d: u32) -> crate::Timestamp {
        Utc.with_ymd_and_hms(2021, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_accumulator_stats() {
        let mut acc = Accumulator::default();
        acc.add(10.0);
        acc.add(5.0);
        acc.add(15.0);
        assert_eq!(acc.count(), 3);

        let stats = acc.finish().unwrap();
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 15.0);
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.upper_median, 10.0);
    }

    #[test]
    fn test_accumulator_empty() {
        assert_eq!(Accumulator::default().finish(), None);
    }

    #[test]
    fn test_upper_median_for_even_count() {
        let mut acc = Accumulator::default();
        for v in [4.0, 1.0, 3.0, 2.0] {
            acc.add(v);
        }
        // Sorted [1, 2, 3, 4]: index 2, not the averaged 2.5.
        assert_eq!(acc.finish().unwrap().upper_median, 3.0);
    }

    #[test]
    fn test_three_day_scenario() {
        let batch = vec![
            Measurement::new(day(1), 1.0, 10.0),
            Measurement::new(day(2), 2.0, 30.0),
            Measurement::new(day(3), 3.0, 20.0),
        ];
        let summary = summarize("run.csv", &batch).unwrap();

        assert_eq!(summary.file_name, "run.csv");
        assert_eq!(summary.earliest_timestamp, day(1));
        assert_eq!(summary.time_span_seconds, 172_800.0);
        assert_eq!(summary.mean_execution_time, 2.0);
        assert_eq!(summary.mean_value, 20.0);
        assert_eq!(summary.median_value, 20.0);
        assert_eq!(summary.max_value, 30.0);
        assert_eq!(summary.min_value, 10.0);
    }

    #[test]
    fn test_single_record() {
        let batch = vec![Measurement::new(day(5), 0.25, 7.0)];
        let summary = summarize("one.csv", &batch).unwrap();

        assert_eq!(summary.time_span_seconds, 0.0);
        assert_eq!(summary.median_value, 7.0);
        assert_eq!(summary.min_value, 7.0);
        assert_eq!(summary.max_value, 7.0);
    }

    #[test]
    fn test_fractional_time_span() {
        let batch = vec![
            Measurement::new(day(1), 0.0, 0.0),
            Measurement::new(day(1) + Duration::milliseconds(1500), 0.0, 0.0),
        ];
        assert_eq!(summarize("f.csv", &batch).unwrap().time_span_seconds, 1.5);
    }

    #[test]
    fn test_order_independent() {
        let batch: Vec<Measurement> = (0..50)
            .map(|i| Measurement::new(day(1 + i % 28), 0.1 * i as f64, 0.7 * i as f64 + 0.3))
            .collect();
        let mut reversed = batch.clone();
        reversed.reverse();

        let a = summarize("x", &batch).unwrap();
        let b = summarize("x", &reversed).unwrap();
        assert_eq!(a.mean_value.to_bits(), b.mean_value.to_bits());
        assert_eq!(
            a.mean_execution_time.to_bits(),
            b.mean_execution_time.to_bits()
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_batch() {
        assert!(summarize("empty.csv", &[]).is_none());
    }
}
