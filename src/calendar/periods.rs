//! Reporting Period Generator
//!
//! Expands the date spine into one row per (granularity, anchor) pair and
//! enriches each anchor with calendar attributes.
//!
//! Conventions (fixed here, not inherited from any SQL engine):
//! - Day-of-week is ISO 8601: Monday=1 .. Sunday=7
//! - Weekend is Saturday and Sunday
//! - Weeks anchor on the ISO week's Monday

use crate::calendar::holidays::HolidayCalendar;
use crate::calendar::spine::DateSpine;
use crate::error::{configuration_error, AppResult};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::debug;

/// Reporting granularity. Variant order doubles as the tie-break order for
/// rows sharing an anchor date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    /// Truncate a date to the start of the period containing it
    pub fn truncate(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                let offset = date.weekday().num_days_from_monday() as i64;
                date - chrono::Duration::days(offset)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
            Granularity::Quarter => {
                let quarter_month = (date.month() - 1) / 3 * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), quarter_month, 1).unwrap_or(date)
            }
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Parse a granularity name (case-insensitive)
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            "year" => Ok(Granularity::Year),
            other => Err(configuration_error(format!(
                "Unknown granularity '{}' (expected day, week, month, quarter or year)",
                other
            ))),
        }
    }
}

impl FromStr for Granularity {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::parse(s)
    }
}

/// One row of the reporting-period dimension.
/// Natural key: (granularity, anchorDate).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRow {
    pub granularity: Granularity,
    pub anchor_date: NaiveDate,
    pub calendar_year: i32,
    pub calendar_quarter: u32,
    pub calendar_month: u32,
    pub calendar_month_name: String,
    pub iso_week: u32,
    /// ISO 8601: Monday=1 .. Sunday=7
    pub day_of_week: u32,
    pub day_name: String,
    pub is_weekend: bool,
    pub is_holiday: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holiday_name: Option<String>,
}

/// The period generator that expands a date range into dimension rows
pub struct PeriodGenerator;

impl PeriodGenerator {
    /// Generate the full period dimension for `[start, end]` at the
    /// requested granularities. Output is ordered by (anchor_date,
    /// granularity) with exactly one row per (granularity, anchor) pair.
    ///
    /// Week/month/quarter/year anchors may precede `start` - the period
    /// containing the first spine date is always represented by its true
    /// start.
    pub fn generate(
        start: NaiveDate,
        end: NaiveDate,
        granularities: &[Granularity],
        holidays: &HolidayCalendar,
    ) -> AppResult<Vec<PeriodRow>> {
        if granularities.is_empty() {
            return Err(configuration_error(
                "At least one granularity is required",
            ));
        }

        let spine = DateSpine::new(start, end)?;
        let spine_days = spine.len();
        let requested: BTreeSet<Granularity> = granularities.iter().copied().collect();

        // BTreeSet both dedups (granularity, anchor) pairs and hands the
        // rows back in (anchor, granularity) order.
        let mut anchors: BTreeSet<(NaiveDate, Granularity)> = BTreeSet::new();
        for date in spine {
            for granularity in &requested {
                anchors.insert((granularity.truncate(date), *granularity));
            }
        }

        debug!(
            "Expanded {} spine dates into {} period rows",
            spine_days,
            anchors.len()
        );
        Ok(anchors
            .into_iter()
            .map(|(anchor, granularity)| Self::enrich(granularity, anchor, holidays))
            .collect())
    }

    /// Compute the calendar attributes for a single anchor
    fn enrich(
        granularity: Granularity,
        anchor: NaiveDate,
        holidays: &HolidayCalendar,
    ) -> PeriodRow {
        let weekday = anchor.weekday();
        let holiday_name = holidays
            .lookup(anchor.month(), anchor.day())
            .map(str::to_string);

        PeriodRow {
            granularity,
            anchor_date: anchor,
            calendar_year: anchor.year(),
            calendar_quarter: (anchor.month() - 1) / 3 + 1,
            calendar_month: anchor.month(),
            calendar_month_name: anchor.format("%B").to_string(),
            iso_week: anchor.iso_week().week(),
            day_of_week: weekday.number_from_monday(),
            day_name: anchor.format("%A").to_string(),
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            is_holiday: holiday_name.is_some(),
            holiday_name,
        }
    }
}
