use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

static NUMERIC_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("NUMERIC_DATE_RE: hardcoded regex is valid")
});

static SPELLED_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({}) (\d{{1,2}}), (\d{{4}})", MONTHS.join("|")))
        .expect("SPELLED_DATE_RE: hardcoded regex is valid")
});

static POSTED_ON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Posted on (.+?)(?:\.|$)").expect("POSTED_ON_RE: hardcoded regex is valid")
});

static TIME_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<time[^>]+datetime=["']([^"']+)["']"#)
        .expect("TIME_ATTR_RE: hardcoded regex is valid")
});

/// 回傳文字中所有可解析的日期，依樣式族群順序（數字、英文月份、"Posted on"、`<time>`）。
/// 無法解析的匹配直接略過。
pub fn extract_dates(text: &str) -> Vec<DateTime<Utc>> {
    let mut dates = Vec::new();

    dates.extend(
        NUMERIC_DATE_RE
            .captures_iter(text)
            .filter_map(|caps| numeric_date(&caps)),
    );
    dates.extend(
        SPELLED_DATE_RE
            .captures_iter(text)
            .filter_map(|caps| spelled_date(&caps)),
    );
    dates.extend(
        POSTED_ON_RE
            .captures_iter(text)
            .filter_map(|caps| parse_generic_date(&caps[1])),
    );
    dates.extend(
        TIME_ATTR_RE
            .captures_iter(text)
            .filter_map(|caps| parse_generic_date(&caps[1])),
    );

    dates
}

/// 取最晚的日期；沒有任何可解析的日期時回傳 `None`
pub fn extract_latest_date(text: &str) -> Option<DateTime<Utc>> {
    extract_dates(text).into_iter().max()
}

fn numeric_date(caps: &Captures) -> Option<DateTime<Utc>> {
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(at_midnight)
}

fn spelled_date(caps: &Captures) -> Option<DateTime<Utc>> {
    let month = month_number(&caps[1])?;
    let day = caps[2].parse().ok()?;
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(at_midnight)
}

pub fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// 寬鬆解析一般日期字串。沒有時區的時間一律視為 UTC。
pub fn parse_generic_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%B %d %Y", "%d %B %Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(at_midnight(date));
        }
    }

    None
}
