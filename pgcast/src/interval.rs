//! Interval parsing, accepting every `IntervalStyle` output.
//!
//! | style             | example                                         |
//! |-------------------|-------------------------------------------------|
//! | `iso_8601`        | `P1Y2M3DT4H5M6S`                                |
//! | `postgres_verbose`| `@ 1 year 2 mons 3 days 4 hours 5 mins 6 secs`  |
//! | `postgres`        | `1 year 2 mons 3 days 04:05:06`                 |
//! | `sql_standard`    | `+1-2 +3 +4:05:06`                              |
use regex::{Captures, Regex};
use std::{fmt, str::FromStr, sync::LazyLock};

use crate::common::verbose;

static ISO_8601: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^P(?:([+-]?[0-9]+)Y)?",
        r"(?:([+-]?[0-9]+)M)?",
        r"(?:([+-]?[0-9]+)D)?",
        r"(?:T(?:([+-]?[0-9]+)H)?",
        r"(?:([+-]?[0-9]+)M)?",
        r"(?:([+-])?([0-9]+)(?:\.([0-9]+))?S)?)?$",
    ))
    .expect("pattern is statically known")
});

static POSTGRES_VERBOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^@ ?(?:([+-]?[0-9]+) ?years? ?)?",
        r"(?:([+-]?[0-9]+) ?mons? ?)?",
        r"(?:([+-]?[0-9]+) ?days? ?)?",
        r"(?:([+-]?[0-9]+) ?hours? ?)?",
        r"(?:([+-]?[0-9]+) ?mins? ?)?",
        r"(?:([+-])?([0-9]+)(?:\.([0-9]+))? ?secs?)? ?(ago)?$",
    ))
    .expect("pattern is statically known")
});

static POSTGRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:([+-]?[0-9]+) ?years? ?)?",
        r"(?:([+-]?[0-9]+) ?mons? ?)?",
        r"(?:([+-]?[0-9]+) ?days? ?)?",
        r"(?:([+-])?([0-9]+):([0-9]+):([0-9]+)(?:\.([0-9]+))?)?$",
    ))
    .expect("pattern is statically known")
});

// a day count must be followed by a blank or the end, not by `:`
static SQL_STANDARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:([+-])?([0-9]+)-([0-9]+)(?: +|$))?",
        r"(?:([+-]?[0-9]+)(?: +|$))?",
        r"(?:([+-])?([0-9]+):([0-9]+):([0-9]+)(?:\.([0-9]+))?)?$",
    ))
    .expect("pattern is statically known")
});

/// Postgres `interval`.
///
/// Components are kept as reported by the server. Comparison folds years
/// and months into days, a year is 365 days and a month is 30 days.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interval {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub microseconds: i64,
}

impl Interval {
    /// Parse interval in any of the four output styles.
    ///
    /// ```
    /// use pgcast::Interval;
    ///
    /// let a = Interval::parse("1 day 01:30:00")?;
    /// let b = Interval::parse("P1DT1H30M")?;
    /// assert_eq!(a, b);
    /// assert_eq!(a.total_microseconds(), (25 * 60 + 30) * 60 * 1_000_000);
    /// # Ok::<_, pgcast::Error>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self, UnparsableInterval> {
        let trimmed = text.trim();
        let err = || UnparsableInterval { text: text.into() };

        if let Some(caps) = ISO_8601.captures(trimmed) {
            verbose!("interval in iso_8601 style");
            let mut iv = Self {
                years: num(&caps, 1).ok_or_else(err)?,
                months: num(&caps, 2).ok_or_else(err)?,
                days: num(&caps, 3).ok_or_else(err)?,
                hours: num(&caps, 4).ok_or_else(err)?,
                minutes: num(&caps, 5).ok_or_else(err)?,
                seconds: num(&caps, 7).ok_or_else(err)?,
                microseconds: fraction(&caps, 8).ok_or_else(err)?,
            };
            if is_minus(&caps, 6) {
                iv.negate_seconds();
            }
            return Ok(iv);
        }

        if let Some(caps) = POSTGRES_VERBOSE.captures(trimmed) {
            verbose!("interval in postgres_verbose style");
            let mut iv = Self {
                years: num(&caps, 1).ok_or_else(err)?,
                months: num(&caps, 2).ok_or_else(err)?,
                days: num(&caps, 3).ok_or_else(err)?,
                hours: num(&caps, 4).ok_or_else(err)?,
                minutes: num(&caps, 5).ok_or_else(err)?,
                seconds: num(&caps, 7).ok_or_else(err)?,
                microseconds: fraction(&caps, 8).ok_or_else(err)?,
            };
            if caps.get(9).is_some() {
                iv = iv.negated();
            }
            if is_minus(&caps, 6) {
                iv.negate_seconds();
            }
            return Ok(iv);
        }

        if let Some(caps) = POSTGRES.captures(trimmed).filter(any_group) {
            verbose!("interval in postgres style");
            let mut iv = Self {
                years: num(&caps, 1).ok_or_else(err)?,
                months: num(&caps, 2).ok_or_else(err)?,
                days: num(&caps, 3).ok_or_else(err)?,
                hours: num(&caps, 5).ok_or_else(err)?,
                minutes: num(&caps, 6).ok_or_else(err)?,
                seconds: num(&caps, 7).ok_or_else(err)?,
                microseconds: fraction(&caps, 8).ok_or_else(err)?,
            };
            if is_minus(&caps, 4) {
                iv.negate_time();
            }
            return Ok(iv);
        }

        if let Some(caps) = SQL_STANDARD.captures(trimmed).filter(any_group) {
            verbose!("interval in sql_standard style");
            let mut iv = Self {
                years: num(&caps, 2).ok_or_else(err)?,
                months: num(&caps, 3).ok_or_else(err)?,
                days: num(&caps, 4).ok_or_else(err)?,
                hours: num(&caps, 6).ok_or_else(err)?,
                minutes: num(&caps, 7).ok_or_else(err)?,
                seconds: num(&caps, 8).ok_or_else(err)?,
                microseconds: fraction(&caps, 9).ok_or_else(err)?,
            };
            if is_minus(&caps, 1) {
                iv.years = -iv.years;
                iv.months = -iv.months;
            }
            if is_minus(&caps, 5) {
                iv.negate_time();
            }
            return Ok(iv);
        }

        Err(err())
    }

    fn negated(self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
            microseconds: -self.microseconds,
        }
    }

    fn negate_seconds(&mut self) {
        self.seconds = -self.seconds;
        self.microseconds = -self.microseconds;
    }

    fn negate_time(&mut self) {
        self.hours = -self.hours;
        self.minutes = -self.minutes;
        self.negate_seconds();
    }

    /// Days with years and months folded in.
    pub fn total_days(&self) -> i128 {
        i128::from(self.days) + 365 * i128::from(self.years) + 30 * i128::from(self.months)
    }

    /// The whole interval in microseconds.
    pub fn total_microseconds(&self) -> i128 {
        let minutes = (self.total_days() * 24 + i128::from(self.hours)) * 60 + i128::from(self.minutes);
        (minutes * 60 + i128::from(self.seconds)) * 1_000_000 + i128::from(self.microseconds)
    }

    /// Convert to [`time::Duration`], [`None`] if it does not fit.
    #[cfg(feature = "time")]
    pub fn to_duration(&self) -> Option<time::Duration> {
        i64::try_from(self.total_microseconds()).ok().map(time::Duration::microseconds)
    }

    /// ISO 8601 representation, which postgres accepts as input.
    pub fn to_iso8601(&self) -> String {
        use std::fmt::Write;

        let mut out = String::from("P");
        for (value, unit) in [(self.years, 'Y'), (self.months, 'M'), (self.days, 'D')] {
            if value != 0 {
                let _ = write!(out, "{value}{unit}");
            }
        }

        let secs = i128::from(self.seconds) * 1_000_000 + i128::from(self.microseconds);
        if self.hours != 0 || self.minutes != 0 || secs != 0 {
            out.push('T');
            for (value, unit) in [(self.hours, 'H'), (self.minutes, 'M')] {
                if value != 0 {
                    let _ = write!(out, "{value}{unit}");
                }
            }
            if secs != 0 {
                let sign = if secs < 0 { "-" } else { "" };
                let (whole, frac) = (secs.abs() / 1_000_000, secs.abs() % 1_000_000);
                let _ = match frac {
                    0 => write!(out, "{sign}{whole}S"),
                    frac => {
                        let frac = format!("{frac:06}");
                        write!(out, "{sign}{whole}.{}S", frac.trim_end_matches('0'))
                    }
                };
            }
        }

        if out.len() == 1 {
            out.push_str("T0S");
        }
        out
    }
}

fn num(caps: &Captures, i: usize) -> Option<i64> {
    match caps.get(i) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

/// Fraction digits as microseconds, `5` is half a second.
fn fraction(caps: &Captures, i: usize) -> Option<i64> {
    let Some(m) = caps.get(i) else {
        return Some(0);
    };
    let digits = m.as_str();
    let digits = &digits[..digits.len().min(6)];
    let value: i64 = digits.parse().ok()?;
    Some(value * 10i64.pow(6 - digits.len() as u32))
}

fn is_minus(caps: &Captures, i: usize) -> bool {
    caps.get(i).is_some_and(|m| m.as_str() == "-")
}

fn any_group(caps: &Captures) -> bool {
    caps.iter().skip(1).any(|m| m.is_some())
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.total_microseconds() == other.total_microseconds()
    }
}

impl Eq for Interval { }

impl FromStr for Interval {
    type Err = UnparsableInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

#[cfg(feature = "time")]
impl From<time::Duration> for Interval {
    fn from(value: time::Duration) -> Self {
        let micros = value.whole_microseconds();
        let (secs, microseconds) = (micros / 1_000_000, micros % 1_000_000);
        let (mins, seconds) = (secs / 60, secs % 60);
        let (hours, minutes) = (mins / 60, mins % 60);
        let (days, hours) = (hours / 24, hours % 24);
        Self {
            days: days as i64,
            hours: hours as i64,
            minutes: minutes as i64,
            seconds: seconds as i64,
            microseconds: microseconds as i64,
            ..Self::default()
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Interval {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

/// Text matched none of the interval styles.
pub struct UnparsableInterval {
    text: String,
}

impl UnparsableInterval {
    /// The rejected text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::error::Error for UnparsableInterval { }

impl fmt::Display for UnparsableInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot parse interval: {:?}", self.text)
    }
}

impl fmt::Debug for UnparsableInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
