//! Predicates for summary lookups

use crate::types::{DatasetSummary, Timestamp};

/// Optional, inclusive constraints on stored summaries.
///
/// Absent fields do not constrain anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub file_name: Option<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub start_execution_time: Option<f64>,
    pub end_execution_time: Option<f64>,
    pub start_average_value: Option<f64>,
    pub end_average_value: Option<f64>,
}

impl SummaryFilter {
    /// Exact file name, ignoring blank input
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        let name = file_name.into();
        self.file_name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }

    pub fn with_date_range(mut self, start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_execution_time_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_execution_time = start;
        self.end_execution_time = end;
        self
    }

    pub fn with_average_value_range(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_average_value = start;
        self.end_average_value = end;
        self
    }

    /// The file name constraint, if it is set and not blank
    pub fn file_name(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    pub fn is_unconstrained(&self) -> bool {
        self.file_name().is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.start_execution_time.is_none()
            && self.end_execution_time.is_none()
            && self.start_average_value.is_none()
            && self.end_average_value.is_none()
    }

    pub fn matches(&self, summary: &DatasetSummary) -> bool {
        fn within<T: PartialOrd>(v: T, lo: Option<T>, hi: Option<T>) -> bool {
            lo.map_or(true, |lo| v >= lo) && hi.map_or(true, |hi| v <= hi)
        }

        self.file_name().map_or(true, |name| summary.file_name == name)
            && within(summary.earliest_timestamp, self.start_date, self.end_date)
            && within(
                summary.mean_execution_time,
                self.start_execution_time,
                self.end_execution_time,
            )
            && within(
                summary.mean_value,
                self.start_average_value,
                self.end_average_value,
            )
    }
}
