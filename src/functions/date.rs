//! Date functions.
//!
//! Dates are epoch milliseconds held in a Long. Patterns use the familiar
//! letter codes (`yyyy-MM-dd'T'HH:mm:ss.SSSXX`) and are translated to chrono
//! format items.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc,
};

use super::{Category, EvalEnv, FunctionDef, Signature, text, text_arg};
use crate::value::Val;

const SECOND: i64 = 1_000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounding {
    Floor,
    Ceiling,
    Round,
}

pub(crate) fn definitions() -> Vec<FunctionDef> {
    let mut defs = vec![
        FunctionDef::new("parseDate", Category::Date)
            .signature(Signature::scalar(
                vec![text("value")],
                "long",
                "Parse an ISO-8601 date into epoch milliseconds",
                parse_date,
            ))
            .signature(Signature::scalar(
                vec![text("value"), text("pattern")],
                "long",
                "Parse a date using a pattern",
                parse_date,
            ))
            .signature(Signature::scalar(
                vec![text("value"), text("pattern"), text("timeZone")],
                "long",
                "Parse a date using a pattern, in a time zone offset",
                parse_date,
            )),
        FunctionDef::new("formatDate", Category::Date)
            .signature(Signature::scalar(
                vec![arg_date()],
                "string",
                "Format epoch milliseconds as an ISO-8601 date",
                format_date,
            ))
            .signature(Signature::scalar(
                vec![arg_date(), text("pattern")],
                "string",
                "Format epoch milliseconds using a pattern",
                format_date,
            ))
            .signature(Signature::scalar(
                vec![arg_date(), text("pattern"), text("timeZone")],
                "string",
                "Format epoch milliseconds using a pattern, in a time zone offset",
                format_date,
            )),
    ];

    // One function per rounding and unit, e.g. floorDay
    macro_rules! rounding {
        ($name:literal, $rounding:expr, $unit:expr, $description:literal) => {
            FunctionDef::new($name, Category::Date).signature(Signature::scalar(
                vec![arg_date()],
                "long",
                $description,
                |args, _| round_date(args, $rounding, $unit),
            ))
        };
    }

    defs.extend([
        rounding!("floorSecond", Rounding::Floor, Unit::Second, "Start of the second"),
        rounding!("floorMinute", Rounding::Floor, Unit::Minute, "Start of the minute"),
        rounding!("floorHour", Rounding::Floor, Unit::Hour, "Start of the hour"),
        rounding!("floorDay", Rounding::Floor, Unit::Day, "Start of the day"),
        rounding!("floorMonth", Rounding::Floor, Unit::Month, "Start of the month"),
        rounding!("floorYear", Rounding::Floor, Unit::Year, "Start of the year"),
        rounding!("ceilingSecond", Rounding::Ceiling, Unit::Second, "Start of the next second, unless already on one"),
        rounding!("ceilingMinute", Rounding::Ceiling, Unit::Minute, "Start of the next minute, unless already on one"),
        rounding!("ceilingHour", Rounding::Ceiling, Unit::Hour, "Start of the next hour, unless already on one"),
        rounding!("ceilingDay", Rounding::Ceiling, Unit::Day, "Start of the next day, unless already on one"),
        rounding!("ceilingMonth", Rounding::Ceiling, Unit::Month, "Start of the next month, unless already on one"),
        rounding!("ceilingYear", Rounding::Ceiling, Unit::Year, "Start of the next year, unless already on one"),
        rounding!("roundSecond", Rounding::Round, Unit::Second, "Nearest second"),
        rounding!("roundMinute", Rounding::Round, Unit::Minute, "Nearest minute"),
        rounding!("roundHour", Rounding::Round, Unit::Hour, "Nearest hour"),
        rounding!("roundDay", Rounding::Round, Unit::Day, "Nearest day"),
        rounding!("roundMonth", Rounding::Round, Unit::Month, "Nearest month"),
        rounding!("roundYear", Rounding::Round, Unit::Year, "Nearest year"),
    ]);
    defs
}

fn arg_date() -> super::Arg {
    super::arg("date")
}

/// Parse a zone offset: `Z`, `UTC`, `GMT`, `+04`, `+0400`, `+04:00`, `UTC+04:00`.
pub(crate) fn parse_offset(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    let rest = zone
        .strip_prefix("UTC")
        .or_else(|| zone.strip_prefix("GMT"))
        .unwrap_or(zone);
    if rest.is_empty() || rest == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, digits) = match rest.as_bytes().first() {
        Some(b'+') => (1, &rest[1..]),
        Some(b'-') => (-1, &rest[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Translate a date pattern to a chrono format string.
///
/// When `zero_offset` is set, offset letters render as a literal `Z`.
fn to_chrono_format(pattern: &str, zero_offset: bool) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // Quoted literal; '' is a single quote
            i += 1;
            if chars.get(i) == Some(&'\'') {
                out.push('\'');
                i += 1;
                continue;
            }
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        i += run;
        let item = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('X' | 'Z' | 'x', _) if zero_offset => "Z",
            ('X', 3) | ('x', 3) => "%:z",
            ('X' | 'Z' | 'x', _) => "%z",
            _ => "",
        };
        out.push_str(item);
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn has_offset(pattern: &str) -> bool {
    let mut quoted = false;
    for c in pattern.chars() {
        match c {
            '\'' => quoted = !quoted,
            'X' | 'Z' | 'x' if !quoted => return true,
            _ => {}
        }
    }
    false
}

fn zone_arg(args: &[Val], env: &EvalEnv) -> Result<FixedOffset, Val> {
    let zone = text_arg(args, 2).unwrap_or_else(|| env.context.time_zone.clone());
    parse_offset(&zone).ok_or_else(|| Val::error(format!("Unknown time zone '{}'", zone)))
}

fn parse_date(args: &[Val], env: &EvalEnv) -> Val {
    let Some(value) = text_arg(args, 0) else {
        return Val::Null;
    };
    let zone = match zone_arg(args, env) {
        Ok(z) => z,
        Err(e) => return e,
    };
    let pattern = text_arg(args, 1);
    if pattern.is_none() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value.trim()) {
            return Val::Long(dt.timestamp_millis());
        }
    }
    let pattern = pattern.unwrap_or_else(|| env.context.default_date_format.clone());
    match parse_with_pattern(value.trim(), &pattern, zone) {
        Some(ms) => Val::Long(ms),
        None => Val::error(format!("Unable to parse date '{}' with pattern '{}'", value, pattern)),
    }
}

fn parse_with_pattern(value: &str, pattern: &str, zone: FixedOffset) -> Option<i64> {
    if has_offset(pattern) {
        let format = to_chrono_format(pattern, false).replace("%z", "%#z").replace("%:z", "%#z");
        return DateTime::parse_from_str(value, &format)
            .ok()
            .map(|dt| dt.timestamp_millis());
    }
    let format = to_chrono_format(pattern, false);
    let naive = NaiveDateTime::parse_from_str(value, &format).ok().or_else(|| {
        NaiveDate::parse_from_str(value, &format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })?;
    zone.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp_millis())
}

/// Millisecond view of a date argument: a number, or text parsed as ISO-8601.
fn millis(val: &Val) -> Result<Option<i64>, Val> {
    match val {
        Val::Null => Ok(None),
        Val::Error(m) => Err(Val::Error(m.clone())),
        Val::String(s) => match s.trim().parse::<i64>() {
            Ok(ms) => Ok(Some(ms)),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| Some(dt.timestamp_millis()))
                .map_err(|_| Val::error(format!("Unable to parse date '{}'", s))),
        },
        other => other
            .to_long()
            .map(Some)
            .ok_or_else(|| Val::error(format!("Expected a date but found '{}'", other))),
    }
}

fn format_date(args: &[Val], env: &EvalEnv) -> Val {
    let ms = match millis(&args[0]) {
        Ok(Some(ms)) => ms,
        Ok(None) => return Val::Null,
        Err(e) => return e,
    };
    let zone = match zone_arg(args, env) {
        Ok(z) => z,
        Err(e) => return e,
    };
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(ms) else {
        return Val::error(format!("Date {} is out of range", ms));
    };
    let pattern = text_arg(args, 1).unwrap_or_else(|| env.context.default_date_format.clone());
    let format = to_chrono_format(&pattern, zone.local_minus_utc() == 0);
    Val::String(utc.with_timezone(&zone).format(&format).to_string())
}

fn floor_unit(ms: i64, unit: Unit) -> Option<i64> {
    let fixed = |size: i64| Some(ms.div_euclid(size) * size);
    match unit {
        Unit::Second => fixed(SECOND),
        Unit::Minute => fixed(MINUTE),
        Unit::Hour => fixed(HOUR),
        Unit::Day => fixed(DAY),
        Unit::Month | Unit::Year => {
            let dt = DateTime::<Utc>::from_timestamp_millis(ms)?;
            let month = if unit == Unit::Month { dt.month() } else { 1 };
            start_of(dt.year(), month)
        }
    }
}

fn next_unit(floor: i64, unit: Unit) -> Option<i64> {
    match unit {
        Unit::Second => Some(floor + SECOND),
        Unit::Minute => Some(floor + MINUTE),
        Unit::Hour => Some(floor + HOUR),
        Unit::Day => Some(floor + DAY),
        Unit::Month => {
            let dt = DateTime::<Utc>::from_timestamp_millis(floor)?;
            if dt.month() == 12 {
                start_of(dt.year() + 1, 1)
            } else {
                start_of(dt.year(), dt.month() + 1)
            }
        }
        Unit::Year => {
            let dt = DateTime::<Utc>::from_timestamp_millis(floor)?;
            start_of(dt.year() + 1, 1)
        }
    }
}

fn start_of(year: i32, month: u32) -> Option<i64> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn round_date(args: &[Val], rounding: Rounding, unit: Unit) -> Val {
    let ms = match millis(&args[0]) {
        Ok(Some(ms)) => ms,
        Ok(None) => return Val::Null,
        Err(e) => return e,
    };
    let Some(floor) = floor_unit(ms, unit) else {
        return Val::error(format!("Date {} is out of range", ms));
    };
    if rounding == Rounding::Floor || floor == ms {
        return Val::Long(floor);
    }
    let Some(ceiling) = next_unit(floor, unit) else {
        return Val::error(format!("Date {} is out of range", ms));
    };
    match rounding {
        Rounding::Ceiling => Val::Long(ceiling),
        _ if ms - floor < ceiling - ms => Val::Long(floor),
        _ => Val::Long(ceiling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIME: i64 = 1393071132888; // 2014-02-22T12:12:12.888Z

    fn rounded(rounding: Rounding, unit: Unit) -> Val {
        round_date(&[Val::Long(TIME)], rounding, unit)
    }

    #[test]
    fn test_floor() {
        assert_eq!(rounded(Rounding::Floor, Unit::Second), Val::Long(1393071132000));
        assert_eq!(rounded(Rounding::Floor, Unit::Minute), Val::Long(1393071120000));
        assert_eq!(rounded(Rounding::Floor, Unit::Hour), Val::Long(1393070400000));
        assert_eq!(rounded(Rounding::Floor, Unit::Day), Val::Long(1393027200000));
        assert_eq!(rounded(Rounding::Floor, Unit::Month), Val::Long(1391212800000));
        assert_eq!(rounded(Rounding::Floor, Unit::Year), Val::Long(1388534400000));
    }

    #[test]
    fn test_ceiling() {
        assert_eq!(rounded(Rounding::Ceiling, Unit::Second), Val::Long(1393071133000));
        assert_eq!(rounded(Rounding::Ceiling, Unit::Minute), Val::Long(1393071180000));
        assert_eq!(rounded(Rounding::Ceiling, Unit::Hour), Val::Long(1393074000000));
        assert_eq!(rounded(Rounding::Ceiling, Unit::Day), Val::Long(1393113600000));
        assert_eq!(rounded(Rounding::Ceiling, Unit::Month), Val::Long(1393632000000));
        assert_eq!(rounded(Rounding::Ceiling, Unit::Year), Val::Long(1420070400000));
    }

    #[test]
    fn test_round() {
        assert_eq!(rounded(Rounding::Round, Unit::Second), Val::Long(1393071133000));
        assert_eq!(rounded(Rounding::Round, Unit::Minute), Val::Long(1393071120000));
        assert_eq!(rounded(Rounding::Round, Unit::Hour), Val::Long(1393070400000));
        assert_eq!(rounded(Rounding::Round, Unit::Day), Val::Long(1393113600000));
        assert_eq!(rounded(Rounding::Round, Unit::Month), Val::Long(1393632000000));
        assert_eq!(rounded(Rounding::Round, Unit::Year), Val::Long(1388534400000));
    }

    #[test]
    fn test_pattern_translation() {
        assert_eq!(to_chrono_format("yyyy MM dd", false), "%Y %m %d");
        assert_eq!(
            to_chrono_format("yyyy-MM-dd'T'HH:mm:ss.SSSXX", false),
            "%Y-%m-%dT%H:%M:%S.%3f%z"
        );
        assert_eq!(to_chrono_format("HH:mm XXX", true), "%H:%M Z");
        assert_eq!(to_chrono_format("'it''s' d%", false), "it's %-d%%");
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+0400").map(|o| o.local_minus_utc()), Some(14400));
        assert_eq!(parse_offset("-05:30").map(|o| o.local_minus_utc()), Some(-19800));
        assert_eq!(parse_offset("UTC").map(|o| o.local_minus_utc()), Some(0));
        assert_eq!(parse_offset("Europe/London"), None);
    }

    #[test]
    fn test_parse_and_format() {
        let env = EvalEnv::default();
        assert_eq!(
            parse_date(&[Val::from("2014-02-22T12:12:12.888Z")], &env),
            Val::Long(TIME)
        );
        assert_eq!(
            parse_date(&[Val::from("2014 02 22"), Val::from("yyyy MM dd"), Val::from("+0400")], &env),
            Val::Long(1393012800000)
        );
        assert_eq!(
            format_date(&[Val::Long(TIME)], &env),
            Val::from("2014-02-22T12:12:12.888Z")
        );
        assert_eq!(
            format_date(&[Val::Long(TIME), Val::from("yyyy MM dd"), Val::from("+1200")], &env),
            Val::from("2014 02 23")
        );
    }
}
