//! Fixed-Date Holiday Calendar
//!
//! A static (month, day) -> name lookup. Fixed-date holidays only - moving
//! feasts (Easter and friends) are out of scope for the reporting dimension.

use crate::error::{configuration_error, AppResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single fixed-date holiday rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
    pub name: String,
}

impl Holiday {
    pub fn new(month: u32, day: u32, name: impl Into<String>) -> Self {
        Self {
            month,
            day,
            name: name.into(),
        }
    }
}

/// Holidays every deployment gets out of the box
static BUILTIN_HOLIDAYS: Lazy<Vec<Holiday>> = Lazy::new(|| {
    vec![
        Holiday::new(1, 1, "New Year's Day"),
        Holiday::new(5, 1, "Labour Day"),
        Holiday::new(12, 25, "Christmas Day"),
        Holiday::new(12, 26, "Boxing Day"),
    ]
});

/// Lookup table for fixed-date holidays, keyed by (month, day)
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    by_date: HashMap<(u32, u32), String>,
}

impl HolidayCalendar {
    /// Build a calendar from an explicit rule set. Rejects impossible
    /// month/day pairs and duplicate dates.
    pub fn new(holidays: &[Holiday]) -> AppResult<Self> {
        let mut by_date = HashMap::new();
        for holiday in holidays {
            if holiday.month < 1 || holiday.month > 12 {
                return Err(configuration_error(format!(
                    "Invalid holiday month {} for '{}'",
                    holiday.month, holiday.name
                )));
            }
            if holiday.day < 1 || holiday.day > 31 {
                return Err(configuration_error(format!(
                    "Invalid holiday day {} for '{}'",
                    holiday.day, holiday.name
                )));
            }
            let key = (holiday.month, holiday.day);
            if by_date.contains_key(&key) {
                return Err(configuration_error(format!(
                    "Duplicate holiday date {:02}-{:02} ('{}')",
                    holiday.month, holiday.day, holiday.name
                )));
            }
            by_date.insert(key, holiday.name.clone());
        }
        Ok(Self { by_date })
    }

    /// The built-in rule set, optionally extended with deployment-specific
    /// holidays. Extras win on date collisions with the built-ins.
    pub fn standard(extras: &[Holiday]) -> AppResult<Self> {
        let mut calendar = Self::new(&BUILTIN_HOLIDAYS)?;
        let extra_calendar = Self::new(extras)?;
        for (key, name) in extra_calendar.by_date {
            calendar.by_date.insert(key, name);
        }
        Ok(calendar)
    }

    /// Look up the holiday name for a (month, day) pair, if any
    pub fn lookup(&self, month: u32, day: u32) -> Option<&str> {
        self.by_date.get(&(month, day)).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_builtin_christmas_lookup() {
        let calendar = HolidayCalendar::standard(&[]).unwrap();
        assert_eq!(calendar.lookup(12, 25), Some("Christmas Day"));
        assert_eq!(calendar.lookup(12, 24), None);
    }

    #[test]
    fn test_extras_override_builtins() {
        let extras = vec![
            Holiday::new(12, 25, "Christmas"),
            Holiday::new(10, 28, "National Day"),
        ];
        let calendar = HolidayCalendar::standard(&extras).unwrap();
        assert_eq!(calendar.lookup(12, 25), Some("Christmas"));
        assert_eq!(calendar.lookup(10, 28), Some("National Day"));
        assert_eq!(calendar.lookup(1, 1), Some("New Year's Day"));
    }

    #[test]
    fn test_rejects_invalid_month() {
        let err = HolidayCalendar::new(&[Holiday::new(13, 1, "Nope")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_rejects_duplicate_date() {
        let rules = vec![Holiday::new(7, 4, "A"), Holiday::new(7, 4, "B")];
        let err = HolidayCalendar::new(&rules).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
