//! Interval units accepted when rescheduling a job.
//!
//! Units are calendar-naive: a month is 4 weeks and a year is 52 weeks.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SchedulerError;

const SECOND: u64 = 1;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 4 * WEEK;
const YEAR: u64 = 52 * WEEK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalBase {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl IntervalBase {
    pub fn as_secs(&self) -> u64 {
        match self {
            IntervalBase::Second => SECOND,
            IntervalBase::Minute => MINUTE,
            IntervalBase::Hour => HOUR,
            IntervalBase::Day => DAY,
            IntervalBase::Week => WEEK,
            IntervalBase::Month => MONTH,
            IntervalBase::Year => YEAR,
        }
    }
}

impl FromStr for IntervalBase {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "second" => Ok(IntervalBase::Second),
            "minute" => Ok(IntervalBase::Minute),
            "hour" => Ok(IntervalBase::Hour),
            "day" => Ok(IntervalBase::Day),
            "week" => Ok(IntervalBase::Week),
            "month" => Ok(IntervalBase::Month),
            "year" => Ok(IntervalBase::Year),
            _ => Err(SchedulerError::UnknownIntervalBase(s.to_string())),
        }
    }
}

/// `number` units of `base`. The number is checked before the base.
pub fn interval_from(number: i64, base: &str) -> Result<Duration, SchedulerError> {
    if number <= 0 {
        return Err(SchedulerError::InvalidIntervalNumber(number));
    }
    let base: IntervalBase = base.parse()?;

    base.as_secs()
        .checked_mul(number as u64)
        .map(Duration::from_secs)
        .ok_or(SchedulerError::InvalidIntervalNumber(number))
}
