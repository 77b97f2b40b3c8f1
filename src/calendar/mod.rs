//! Calendar Dimension Module
//!
//! Builds the reporting-period dimension: a dense date spine expanded into
//! day/week/month/quarter/year anchors, enriched with calendar attributes
//! and fixed-date holiday flags.

pub mod holidays;
pub mod periods;
pub mod spine;

pub use holidays::{Holiday, HolidayCalendar};
pub use periods::{Granularity, PeriodGenerator};
#[allow(unused_imports)]
pub use periods::PeriodRow;
#[allow(unused_imports)]
pub use spine::DateSpine;
