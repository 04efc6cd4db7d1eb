//! Typecast configuration.
use std::{convert::Infallible, env::var, fmt, str::FromStr};

/// Connection local typecast settings.
///
/// Every setting has a default that matches what the server sends, so
/// `Config::default()` decodes values into their natural rust types.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub(crate) date_style: Option<DateStyle>,
    pub(crate) decimal_point: Option<char>,
    pub(crate) bool_as_text: bool,
    pub(crate) json: bool,
    pub(crate) bytea_escaped: bool,
}

impl Config {
    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `PGDATESTYLE`
    pub fn from_env() -> Config {
        let mut me = Config::default();
        if let Ok(style) = var("PGDATESTYLE") {
            me.date_style = style.parse().ok();
        }
        me
    }

    /// Always assume `style` instead of the server `DateStyle` parameter.
    pub fn date_style(mut self, style: Option<DateStyle>) -> Self {
        self.date_style = style;
        self
    }

    /// Decimal point used by `money` values.
    ///
    /// With [`None`], money is returned as text.
    pub fn decimal_point(mut self, point: Option<char>) -> Self {
        self.decimal_point = point;
        self
    }

    /// Return booleans as `t` or `f` text.
    pub fn bool_as_text(mut self, enable: bool) -> Self {
        self.bool_as_text = enable;
        self
    }

    /// Decode `json` and `jsonb` into [`Value::Json`][crate::Value], otherwise keep text.
    pub fn json(mut self, enable: bool) -> Self {
        self.json = enable;
        self
    }

    /// Keep `bytea` as its escaped text representation.
    pub fn bytea_escaped(mut self, enable: bool) -> Self {
        self.bytea_escaped = enable;
        self
    }

    pub fn get_date_style(&self) -> Option<DateStyle> {
        self.date_style
    }

    pub fn get_decimal_point(&self) -> Option<char> {
        self.decimal_point
    }

    pub fn is_bool_as_text(&self) -> bool {
        self.bool_as_text
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn is_bytea_escaped(&self) -> bool {
        self.bytea_escaped
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_style: None,
            decimal_point: Some('.'),
            bool_as_text: false,
            json: cfg!(feature = "json"),
            bytea_escaped: false,
        }
    }
}

/// Server `DateStyle` parameter, the output format and the field order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateStyle {
    /// `1997-12-17`
    #[default]
    Iso,
    /// `Wed Dec 17 1997`
    PostgresMdy,
    /// `Wed 17 Dec 1997`
    PostgresDmy,
    /// `12/17/1997`
    SqlMdy,
    /// `17/12/1997`
    SqlDmy,
    /// `17.12.1997`
    German,
}

impl DateStyle {
    /// Returns `true` if day is written before month.
    pub fn is_dmy(&self) -> bool {
        matches!(self, Self::PostgresDmy | Self::SqlDmy | Self::German)
    }

    /// strftime like description of a date in this style.
    pub fn date_format(&self) -> &'static str {
        match self {
            Self::Iso => "%Y-%m-%d",
            Self::PostgresMdy => "%m-%d-%Y",
            Self::PostgresDmy => "%d-%m-%Y",
            Self::SqlMdy => "%m/%d/%Y",
            Self::SqlDmy => "%d/%m/%Y",
            Self::German => "%d.%m.%Y",
        }
    }
}

impl FromStr for DateStyle {
    type Err = Infallible;

    /// Parse the parameter value, e.g. `ISO, MDY` or `SQL, DMY`.
    ///
    /// Unrecognized output format is ISO.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start();
        let dmy = s
            .split_once(',')
            .is_some_and(|(_, order)| order.trim_start().starts_with(['D', 'd']));
        Ok(match (s.as_bytes().first().map(u8::to_ascii_uppercase), dmy) {
            (Some(b'P'), false) => Self::PostgresMdy,
            (Some(b'P'), true) => Self::PostgresDmy,
            (Some(b'S'), false) => Self::SqlMdy,
            (Some(b'S'), true) => Self::SqlDmy,
            (Some(b'G'), _) => Self::German,
            _ => Self::Iso,
        })
    }
}

impl fmt::Display for DateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Iso => "ISO, MDY",
            Self::PostgresMdy => "Postgres, MDY",
            Self::PostgresDmy => "Postgres, DMY",
            Self::SqlMdy => "SQL, MDY",
            Self::SqlDmy => "SQL, DMY",
            Self::German => "German, DMY",
        })
    }
}

/// Server `IntervalStyle` parameter.
///
/// Interval parsing accepts every style, this is only informational for
/// custom casts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntervalStyle {
    #[default]
    Postgres,
    PostgresVerbose,
    SqlStandard,
    Iso8601,
}

impl FromStr for IntervalStyle {
    type Err = Infallible;

    /// Unrecognized style is `postgres`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "postgres_verbose" => Self::PostgresVerbose,
            "sql_standard" => Self::SqlStandard,
            "iso_8601" => Self::Iso8601,
            _ => Self::Postgres,
        })
    }
}

impl fmt::Display for IntervalStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Postgres => "postgres",
            Self::PostgresVerbose => "postgres_verbose",
            Self::SqlStandard => "sql_standard",
            Self::Iso8601 => "iso_8601",
        })
    }
}
