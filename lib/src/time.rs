//! Universal time and KSP calendars.

use std::{fmt, ops};

use serde::{Deserialize, Serialize};
use time::Duration;

/// Universal time, measured from the start of the game's epoch.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct UT(Duration);

impl UT {
    /// Saturates at the representable range; NaN maps to the epoch.
    pub fn new_seconds(sec: f64) -> UT {
        UT::from_duration(Duration::saturating_seconds_f64(sec))
    }

    /// `None` for NaN or times beyond the representable range (about
    /// ±2.9e11 years).
    pub fn checked_seconds(sec: f64) -> Option<UT> {
        Duration::checked_seconds_f64(sec).map(UT)
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_seconds_f64(self) -> f64 {
        self.0.as_seconds_f64()
    }

    /// Break this time down into calendar fields.
    pub fn to_calendar(self, calendar: Calendar) -> CalendarTime {
        CalendarTime::from_seconds(self.as_seconds_f64(), calendar)
    }
}

impl ops::Sub<UT> for UT {
    type Output = Duration;

    fn sub(self, rhs: UT) -> Self::Output {
        self.0 - rhs.0
    }
}

impl ops::Add<Duration> for UT {
    type Output = UT;

    fn add(self, rhs: Duration) -> Self::Output {
        UT(self.0 + rhs)
    }
}

impl fmt::Display for UT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UT({}s)", self.0.as_seconds_f64())
    }
}

impl fmt::Debug for UT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Day and year lengths used to display times.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calendar {
    /// 6 hour days, 426 day years.
    #[default]
    Kerbin,
    /// 24 hour days, 365 day years.
    Earth,
}

impl Calendar {
    pub fn seconds_per_day(self) -> f64 {
        match self {
            Calendar::Kerbin => 21_600.0,
            Calendar::Earth => 86_400.0,
        }
    }

    pub fn days_per_year(self) -> f64 {
        match self {
            Calendar::Kerbin => 426.0,
            Calendar::Earth => 365.0,
        }
    }
}

/// A time split into years, days, hours, minutes and seconds.
///
/// All fields count from zero. Negative inputs are clamped to zero.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarTime {
    pub calendar: Calendar,
    pub years: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: f64,
}

impl CalendarTime {
    #[allow(clippy::cast_sign_loss)]
    pub fn from_seconds(seconds: f64, calendar: Calendar) -> Self {
        let day = calendar.seconds_per_day();
        let year = day * calendar.days_per_year();

        let mut rest = seconds.max(0.0);
        let years = (rest / year).floor();
        rest -= years * year;
        let days = (rest / day).floor();
        rest -= days * day;
        let hours = (rest / 3600.0).floor();
        rest -= hours * 3600.0;
        let minutes = (rest / 60.0).floor();
        rest -= minutes * 60.0;

        Self {
            calendar,
            years: years as u32,
            days: days as u32,
            hours: hours as u32,
            minutes: minutes as u32,
            seconds: rest,
        }
    }

    pub fn as_seconds_f64(&self) -> f64 {
        let day = self.calendar.seconds_per_day();
        let year = day * self.calendar.days_per_year();
        self.seconds
            + self.minutes as f64 * 60.0
            + self.hours as f64 * 3600.0
            + self.days as f64 * day
            + self.years as f64 * year
    }

    /// Format as an interval, e.g. `1y, 2d, 3h, 4m, 5s`, omitting zero fields.
    pub fn delta_string(&self) -> String {
        let mut parts = vec![];
        if self.years > 0 {
            parts.push(format!("{}y", self.years));
        }
        if self.days > 0 {
            parts.push(format!("{}d", self.days));
        }
        if self.hours > 0 {
            parts.push(format!("{}h", self.hours));
        }
        if self.minutes > 0 {
            parts.push(format!("{}m", self.minutes));
        }
        let seconds = self.seconds.round();
        if seconds > 0.0 {
            parts.push(format!("{seconds}s"));
        }
        if parts.is_empty() {
            "0s".to_owned()
        } else {
            parts.join(", ")
        }
    }
}

/// Formats as an absolute date, e.g. `Y1 D2 03:04:05`. Years and days
/// are displayed starting from 1.
impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Y{} D{} {:02}:{:02}:{:02}",
            self.years + 1,
            self.days + 1,
            self.hours,
            self.minutes,
            self.seconds.round()
        )
    }
}
