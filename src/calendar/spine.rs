//! Date Spine
//!
//! A dense sequence of calendar dates - the backbone every reporting
//! granularity is derived from.

use crate::error::{configuration_error, AppResult};
use chrono::NaiveDate;

/// Lazy iterator over every calendar date in `[start, end]`, inclusive on
/// both ends. Dates come out in ascending order, one per day, no gaps.
#[derive(Debug, Clone)]
pub struct DateSpine {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DateSpine {
    /// Create a spine over `[start, end]`. Fails if the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(configuration_error(format!(
                "Invalid date range: start {} is after end {}",
                start, end
            )));
        }
        Ok(Self {
            next: Some(start),
            end,
        })
    }

    /// Number of dates the spine will yield
    pub fn len(&self) -> usize {
        match self.next {
            Some(next) => (self.end - next).num_days() as usize + 1,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_none()
    }
}

impl Iterator for DateSpine {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        if current > self.end {
            self.next = None;
            return None;
        }
        self.next = if current == self.end {
            None
        } else {
            current.succ_opt()
        };
        Some(current)
    }
}
