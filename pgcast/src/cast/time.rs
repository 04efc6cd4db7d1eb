//! Date and time casts.
//!
//! Output format depends on the server `DateStyle`, the effective style is
//! read from [`Context::date_style`] on every call.
//!
//! `infinity` and values outside of the supported range, e.g. `BC` dates or
//! five digit years, saturate to the minimum or maximum value.
use std::sync::LazyLock;

use regex::Regex;
use time::{
    Date, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem as I, Component as C, modifier},
};

use super::{Cast, Context, invalid};
use crate::{DateStyle, Error, Result, Value, common::warn};

/// Date, time, and timestamp casts registered as global defaults.
pub fn builtins() -> Vec<(&'static str, Cast)> {
    vec![
        ("date", Cast::contextual(cast_date)),
        ("time", Cast::plain(cast_time)),
        ("timetz", Cast::plain(cast_timetz)),
        ("timestamp", Cast::contextual(cast_timestamp)),
        ("timestamptz", Cast::contextual(cast_timestamptz)),
    ]
}

pub fn cast_date(text: &str, ctx: &Context) -> Result<Value> {
    match text {
        "infinity" => return Ok(Value::Date(Date::MAX)),
        "-infinity" => return Ok(Value::Date(Date::MIN)),
        _ => {}
    }
    let tokens: Vec<_> = text.split_whitespace().collect();
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        return Err(invalid("date", text, "empty date"));
    };
    if *last == "BC" {
        return Ok(Value::Date(Date::MIN));
    }
    if first.len() > 10 {
        return Ok(Value::Date(Date::MAX));
    }
    parse_date(first, ctx.date_style()).map(Value::Date)
}

pub fn cast_time(text: &str) -> Result<Value> {
    parse_time(text.trim()).map(Value::Time)
}

/// Time followed by an optional numeric offset, `07:37:16-08`.
pub fn cast_timetz(text: &str) -> Result<Value> {
    let (time, offset) = split_offset(text.trim());
    let offset = match offset {
        Some(offset) => parse_offset(offset).ok_or_else(|| invalid("timetz", text, "invalid time zone"))?,
        None => UtcOffset::UTC,
    };
    Ok(Value::TimeTz(parse_time(time)?, offset))
}

pub fn cast_timestamp(text: &str, ctx: &Context) -> Result<Value> {
    match text {
        "infinity" => return Ok(Value::Timestamp(MAX_DATETIME)),
        "-infinity" => return Ok(Value::Timestamp(MIN_DATETIME)),
        _ => {}
    }
    let tokens: Vec<_> = text.split_whitespace().collect();
    parse_timestamp(text, &tokens, ctx.date_style()).map(Value::Timestamp)
}

/// Offset is taken from the last token, or the time token in ISO style.
///
/// Unknown time zone abbreviation is UTC.
pub fn cast_timestamptz(text: &str, ctx: &Context) -> Result<Value> {
    match text {
        "infinity" => return Ok(Value::TimestampTz(MAX_DATETIME.assume_utc())),
        "-infinity" => return Ok(Value::TimestampTz(MIN_DATETIME.assume_utc())),
        _ => {}
    }

    let style = ctx.date_style();
    let mut tokens: Vec<_> = text.split_whitespace().collect();
    if tokens.last() == Some(&"BC") {
        return Ok(Value::TimestampTz(MIN_DATETIME.assume_utc()));
    }

    let zone = match style {
        DateStyle::Iso => match tokens.get_mut(1) {
            Some(time) => {
                let (rest, zone) = split_offset(time);
                *time = rest;
                zone
            }
            None => None,
        },
        DateStyle::PostgresMdy | DateStyle::PostgresDmy if tokens.len() <= 5 => None,
        _ if tokens.len() <= 2 => None,
        _ => tokens.pop(),
    };

    let offset = match zone {
        Some(zone) => match parse_offset(zone) {
            Some(offset) => offset,
            None if zone.starts_with(['+', '-']) => {
                return Err(invalid("timestamptz", text, "invalid time zone"));
            }
            None => {
                warn!("unknown time zone {zone:?}, assuming UTC");
                UtcOffset::UTC
            }
        },
        None => UtcOffset::UTC,
    };

    parse_timestamp(text, &tokens, style).map(|ts| Value::TimestampTz(ts.assume_offset(offset)))
}

fn parse_timestamp(text: &str, tokens: &[&str], style: DateStyle) -> Result<PrimitiveDateTime> {
    if tokens.last() == Some(&"BC") {
        return Ok(MIN_DATETIME);
    }

    if matches!(style, DateStyle::PostgresMdy | DateStyle::PostgresDmy) && tokens.len() > 2 {
        // Wed Dec 17 07:37:16 1997
        let Some(parts) = tokens.get(1..5) else {
            return Err(invalid("timestamp", text, "incomplete timestamp"));
        };
        if parts[3].len() > 4 {
            return Ok(MAX_DATETIME);
        }
        let description = match style.is_dmy() {
            true => POSTGRES_DMY,
            false => POSTGRES_MDY,
        };
        return PrimitiveDateTime::parse(&parts.join(" "), description)
            .map_err(|e| Error::cast_failure("timestamp", text, e));
    }

    let (Some(date), Some(time)) = (tokens.first(), tokens.get(1)) else {
        return Err(invalid("timestamp", text, "expected date and time"));
    };
    if date.len() > 10 {
        return Ok(MAX_DATETIME);
    }
    Ok(PrimitiveDateTime::new(parse_date(date, style)?, parse_time(time)?))
}

fn parse_date(text: &str, style: DateStyle) -> Result<Date> {
    Date::parse(text, date_description(style)).map_err(|e| Error::cast_failure("date", text, e))
}

fn parse_time(text: &str) -> Result<Time> {
    Time::parse(text, TIME).map_err(|e| Error::cast_failure("time", text, e))
}

/// Split `07:37:16+05:30` at the last sign.
fn split_offset(text: &str) -> (&str, Option<&str>) {
    static OFFSET: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(.*)([+-].*)$").expect("pattern is statically known"));

    match OFFSET.captures(text) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(rest), Some(offset)) => (rest.as_str(), Some(offset.as_str())),
            _ => (text, None),
        },
        None => (text, None),
    }
}

/// Numeric offset, `+05`, `-0800`, `+05:30`, or a known abbreviation.
fn parse_offset(zone: &str) -> Option<UtcOffset> {
    let hours = match zone {
        "GMT" | "UCT" | "UTC" | "WET" | "Z" => 0,
        "CET" | "MET" => 1,
        "EET" => 2,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        "HST" => -10,
        _ => return parse_numeric_offset(zone),
    };
    UtcOffset::from_hms(hours, 0, 0).ok()
}

fn parse_numeric_offset(zone: &str) -> Option<UtcOffset> {
    let (sign, rest) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let digits: Vec<i8> = rest
        .bytes()
        .filter(|b| *b != b':')
        .map(|b| b.is_ascii_digit().then(|| (b - b'0') as i8))
        .collect::<Option<_>>()?;
    let pair = |i: usize| digits.get(i..i + 2).map(|d| d[0] * 10 + d[1]);
    let (h, m, s) = match digits.len() {
        2 => (pair(0)?, 0, 0),
        4 => (pair(0)?, pair(2)?, 0),
        6 => (pair(0)?, pair(2)?, pair(4)?),
        _ => return None,
    };
    UtcOffset::from_hms(sign * h, sign * m, sign * s).ok()
}

/// ISO 8601 text of date and time values, [`None`] for anything else.
///
/// Saturated dates are written back as `infinity`.
pub fn format(value: &Value) -> Option<String> {
    let text = match value {
        Value::Date(d) if *d == Date::MAX => "infinity".into(),
        Value::Date(d) if *d == Date::MIN => "-infinity".into(),
        Value::Date(d) => d.format(DATE).expect("format is statically known"),
        Value::Time(t) => format_time(*t),
        Value::TimeTz(t, offset) => format_time(*t) + &format_offset(*offset),
        Value::Timestamp(ts) if *ts == MAX_DATETIME => "infinity".into(),
        Value::Timestamp(ts) if *ts == MIN_DATETIME => "-infinity".into(),
        Value::Timestamp(ts) => format_timestamp(*ts),
        Value::TimestampTz(ts) => {
            let local = PrimitiveDateTime::new(ts.date(), ts.time());
            if local == MAX_DATETIME {
                "infinity".into()
            } else if local == MIN_DATETIME {
                "-infinity".into()
            } else {
                format_timestamp(local) + &format_offset(ts.offset())
            }
        }
        _ => return None,
    };
    Some(text)
}

fn format_time(t: Time) -> String {
    let description = match t.nanosecond() {
        0 => TIME_SECONDS,
        _ => TIME,
    };
    t.format(description).expect("format is statically known")
}

fn format_timestamp(ts: PrimitiveDateTime) -> String {
    let mut out = ts.date().format(DATE).expect("format is statically known");
    out.push(' ');
    out.push_str(&format_time(ts.time()));
    out
}

fn format_offset(offset: UtcOffset) -> String {
    offset.format(OFFSET).expect("format is statically known")
}

fn date_description(style: DateStyle) -> &'static [I<'static>] {
    match style {
        DateStyle::Iso => DATE,
        DateStyle::PostgresMdy => &[MONTH, I::Literal(b"-"), DAY, I::Literal(b"-"), YEAR],
        DateStyle::PostgresDmy => &[DAY, I::Literal(b"-"), MONTH, I::Literal(b"-"), YEAR],
        DateStyle::SqlMdy => &[MONTH, I::Literal(b"/"), DAY, I::Literal(b"/"), YEAR],
        DateStyle::SqlDmy => &[DAY, I::Literal(b"/"), MONTH, I::Literal(b"/"), YEAR],
        DateStyle::German => &[DAY, I::Literal(b"."), MONTH, I::Literal(b"."), YEAR],
    }
}

const MAX_TIME: Time = match Time::from_hms_micro(23, 59, 59, 999_999) {
    Ok(ok) => ok,
    Err(_) => panic!("time is statically known"),
};

const MIN_DATETIME: PrimitiveDateTime = PrimitiveDateTime::new(Date::MIN, Time::MIDNIGHT);
const MAX_DATETIME: PrimitiveDateTime = PrimitiveDateTime::new(Date::MAX, MAX_TIME);

const YEAR: I<'_> = I::Component(C::Year(modifier::Year::default()));
const MONTH: I<'_> = I::Component(C::Month(modifier::Month::default()));
const DAY: I<'_> = I::Component(C::Day(modifier::Day::default()));

const SHORT_MONTH: I<'_> = I::Component(C::Month({
    let mut month = modifier::Month::default();
    month.repr = modifier::MonthRepr::Short;
    month
}));

const DATE: &[I<'_>] = &[YEAR, I::Literal(b"-"), MONTH, I::Literal(b"-"), DAY];

const TIME_SECONDS: &[I<'_>] = &[
    I::Component(C::Hour(modifier::Hour::default())),
    I::Literal(b":"),
    I::Component(C::Minute(modifier::Minute::default())),
    I::Literal(b":"),
    I::Component(C::Second(modifier::Second::default())),
];

const FRACTION: &[I<'_>] = &[
    I::Literal(b"."),
    I::Component(C::Subsecond(modifier::Subsecond::default())),
];

const TIME: &[I<'_>] = &[I::Compound(TIME_SECONDS), I::Optional(&I::Compound(FRACTION))];

const POSTGRES_MDY: &[I<'_>] = &[
    SHORT_MONTH,
    I::Literal(b" "),
    DAY,
    I::Literal(b" "),
    I::Compound(TIME),
    I::Literal(b" "),
    YEAR,
];

const POSTGRES_DMY: &[I<'_>] = &[
    DAY,
    I::Literal(b" "),
    SHORT_MONTH,
    I::Literal(b" "),
    I::Compound(TIME),
    I::Literal(b" "),
    YEAR,
];

const OFFSET: &[I<'_>] = &[
    I::Component(C::OffsetHour({
        let mut hour = modifier::OffsetHour::default();
        hour.sign_is_mandatory = true;
        hour
    })),
    I::Literal(b":"),
    I::Component(C::OffsetMinute(modifier::OffsetMinute::default())),
];
