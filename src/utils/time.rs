//! 时间与时区相关的工具函数

use crate::error::{ErrorCode, QuickRestError, QuickRestResult};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc,
};

/// 宽松解析得到的日期时间
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedDateTime {
    /// 输入自带时区
    Aware(DateTime<FixedOffset>),
    /// 输入不带时区
    Naive(NaiveDateTime),
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// 当前UTC时间（毫秒精度）
pub fn now() -> DateTime<FixedOffset> {
    truncate_to_millis(Utc::now().fixed_offset())
}

/// 今天（UTC）
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// 将无时区的时间视为UTC
pub fn localize(dt: NaiveDateTime) -> DateTime<FixedOffset> {
    dt.and_utc().fixed_offset()
}

/// 将无时区的时间视为指定偏移下的本地时间
pub fn localize_with_offset(dt: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    match dt.and_local_timezone(offset) {
        chrono::LocalResult::Single(v) => v,
        // 固定偏移不存在歧义，这里只为穷尽匹配
        _ => localize(dt),
    }
}

/// 去掉毫秒以下的精度
pub fn truncate_to_millis(dt: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let nanos = dt.nanosecond() / 1_000_000 * 1_000_000;
    dt.with_nanosecond(nanos).unwrap_or(dt)
}

/// 毫秒时间戳转为UTC时间
pub fn millis_to_datetime(millis: i64) -> QuickRestResult<DateTime<FixedOffset>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| QuickRestError::field(ErrorCode::InvalidDatetime))
}

/// 时间转为毫秒时间戳
pub fn datetime_to_millis(dt: &DateTime<FixedOffset>) -> i64 {
    dt.timestamp_millis()
}

/// 日期（UTC零点）转为毫秒时间戳
pub fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// 时间转为自零点起的分钟数
pub fn time_to_mins(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// 将时区偏移字符串转换为秒数
///
/// # 参数
/// * `timezone_offset` - 时区偏移，格式 "+08:00", "-05:00"
pub fn parse_timezone_offset_to_seconds(timezone_offset: &str) -> QuickRestResult<i32> {
    let invalid = || crate::quick_error!(config, format!(
        "无效的时区偏移格式: '{}', 期望格式: +HH:MM",
        timezone_offset
    ));

    if !timezone_offset.is_ascii() || timezone_offset.len() != 6 || &timezone_offset[3..4] != ":" {
        return Err(invalid());
    }

    let sign = match &timezone_offset[..1] {
        "+" => 1,
        "-" => -1,
        _ => return Err(invalid()),
    };
    let hours: i32 = timezone_offset[1..3].parse().map_err(|_| invalid())?;
    let minutes: i32 = timezone_offset[4..6].parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    Ok(sign * (hours * 3600 + minutes * 60))
}

/// 解析时区偏移字符串
pub fn parse_fixed_offset(timezone_offset: &str) -> QuickRestResult<FixedOffset> {
    let seconds = parse_timezone_offset_to_seconds(timezone_offset)?;
    FixedOffset::east_opt(seconds).ok_or_else(|| {
        crate::quick_error!(config, format!("时区偏移超出有效范围: {}", timezone_offset))
    })
}

/// 转换到指定时区
///
/// # 参数
/// * `dt` - 任意时区的时间
/// * `timezone_offset` - 时区偏移，格式 "+08:00", "-05:00"
pub fn change_timezone(
    dt: DateTime<FixedOffset>,
    timezone_offset: &str,
) -> QuickRestResult<DateTime<FixedOffset>> {
    Ok(dt.with_timezone(&parse_fixed_offset(timezone_offset)?))
}

/// 宽松解析日期时间字符串
///
/// 支持 RFC3339、常见的 `YYYY-MM-DD HH:MM:SS` 形式以及纯日期（取零点）
pub fn parse_datetime_str(value: &str) -> Option<ParsedDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(ParsedDateTime::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(ParsedDateTime::Aware(dt));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(ParsedDateTime::Naive(dt));
        }
    }
    parse_date_only(value).map(|d| ParsedDateTime::Naive(d.and_time(NaiveTime::MIN)))
}

fn parse_date_only(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// 宽松解析日期字符串，带时间部分时取其日期
pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(d) = parse_date_only(value) {
        return Some(d);
    }
    if value.len() > 10 {
        return match parse_datetime_str(value)? {
            ParsedDateTime::Aware(dt) => Some(dt.date_naive()),
            ParsedDateTime::Naive(dt) => Some(dt.date()),
        };
    }
    None
}

/// 宽松解析时间字符串，带日期部分时取其时间
pub fn parse_time_str(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(value, fmt) {
            return Some(t);
        }
    }
    match parse_datetime_str(value)? {
        ParsedDateTime::Aware(dt) => Some(dt.time()),
        ParsedDateTime::Naive(dt) => Some(dt.time()),
    }
}

/// 月份字符串，格式 `YYYY-MM`
pub fn datetime_to_month_str(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m").to_string()
}

/// 所在周的周一，格式 `YYYY-MM-DD`
pub fn datetime_to_week_str(dt: &DateTime<FixedOffset>) -> String {
    let days = dt.weekday().num_days_from_monday() as i64;
    (*dt - Duration::days(days)).format("%Y-%m-%d").to_string()
}

/// 判断两个半开区间是否重叠
pub fn overlaps<T: PartialOrd>(first: (T, T), second: (T, T)) -> bool {
    if first.1 <= second.0 {
        return false;
    }
    if second.1 <= first.0 {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone_offset() {
        assert_eq!(parse_timezone_offset_to_seconds("+08:00").unwrap(), 8 * 3600);
        assert_eq!(parse_timezone_offset_to_seconds("-05:30").unwrap(), -(5 * 3600 + 1800));
        assert!(parse_timezone_offset_to_seconds("0800").is_err());
        assert!(parse_timezone_offset_to_seconds("+25:00").is_err());
        assert!(parse_timezone_offset_to_seconds("*08:00").is_err());
    }

    #[test]
    fn test_millis_round_trip() {
        let dt = millis_to_datetime(1_700_000_000_123).unwrap();
        assert_eq!(datetime_to_millis(&dt), 1_700_000_000_123);
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_lenient_parsing() {
        assert!(matches!(
            parse_datetime_str("2024-01-02T03:04:05Z"),
            Some(ParsedDateTime::Aware(_))
        ));
        assert!(matches!(
            parse_datetime_str("2024-01-02 03:04:05"),
            Some(ParsedDateTime::Naive(_))
        ));
        assert_eq!(
            parse_date_str("2024-01-02T10:00:00+08:00"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(parse_time_str("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert!(parse_datetime_str("yesterday").is_none());
        assert!(parse_date_str("definitely not a date").is_none());
    }

    #[test]
    fn test_week_and_month_strings() {
        // 2024-03-07 是周四
        let dt = DateTime::parse_from_rfc3339("2024-03-07T12:00:00Z").unwrap();
        assert_eq!(datetime_to_week_str(&dt), "2024-03-04");
        assert_eq!(datetime_to_month_str(&dt), "2024-03");
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps((1, 5), (4, 8)));
        assert!(!overlaps((1, 4), (4, 8)));
        assert!(!overlaps((6, 8), (1, 6)));
    }

    #[test]
    fn test_change_timezone() {
        let dt = DateTime::parse_from_rfc3339("2024-03-07T00:00:00Z").unwrap();
        let shanghai = change_timezone(dt, "+08:00").unwrap();
        assert_eq!(shanghai.format("%H").to_string(), "08");
        assert_eq!(shanghai, dt);
    }
}
