//! The five-field cron parser and matcher.

use chrono::{Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One parsed cron field: the closed set of minute/hour/day/month/weekday
/// values it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Field(BTreeSet<u32>);

impl Field {
    fn matches(&self, value: u32) -> bool {
        self.0.contains(&value)
    }
}

fn parse_range_or_wildcard(base: &str, min: u32, max: u32) -> Option<(u32, u32)> {
    if base == "*" {
        return Some((min, max));
    }
    if let Some((a, b)) = base.split_once('-') {
        let a: u32 = a.parse().ok()?;
        let b: u32 = b.parse().ok()?;
        if a > b || a < min || b > max {
            return None;
        }
        return Some((a, b));
    }
    let v: u32 = base.parse().ok()?;
    if v < min || v > max {
        return None;
    }
    Some((v, max))
}

fn parse_field(spec: &str, min: u32, max: u32) -> Option<Field> {
    let mut values = BTreeSet::new();

    for item in spec.split(',') {
        if item.is_empty() {
            return None;
        }
        if let Some((base, step)) = item.split_once('/') {
            let step: u32 = step.parse().ok()?;
            if step == 0 {
                return None;
            }
            let (start, end) = parse_range_or_wildcard(base, min, max)?;
            let mut v = start;
            while v <= end {
                values.insert(v);
                v += step;
            }
        } else if item == "*" {
            values.extend(min..=max);
        } else if let Some((a, b)) = item.split_once('-') {
            let a: u32 = a.parse().ok()?;
            let b: u32 = b.parse().ok()?;
            if a > b || a < min || b > max {
                return None;
            }
            values.extend(a..=b);
        } else {
            let v: u32 = item.parse().ok()?;
            if v < min || v > max {
                return None;
            }
            values.insert(v);
        }
    }

    if values.is_empty() {
        None
    } else {
        Some(Field(values))
    }
}

/// A parsed five-field cron expression: minute, hour, day-of-month,
/// month, day-of-week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    day_of_week: Field,
}

impl CronExpr {
    /// Parse a five-field cron expression. Each field supports `*`, an
    /// integer, a range `a-b`, a list `a,b,c`, and a step `base/step`
    /// where `base` is `*`, an integer, or a range. Returns `None` on
    /// any syntax violation.
    pub fn parse(expr: &str) -> Option<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return None;
        }

        Some(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day_of_month: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            day_of_week: parse_field(fields[4], 0, 6)?,
        })
    }

    /// Whether this expression matches the local-time breakdown of
    /// `now_ms` (epoch milliseconds). Day-of-week uses the cron
    /// convention where 0 is Sunday.
    pub fn matches(&self, now_ms: i64) -> bool {
        let Some(dt) = chrono::Local.timestamp_millis_opt(now_ms).single() else {
            return false;
        };

        self.minute.matches(dt.minute())
            && self.hour.matches(dt.hour())
            && self.day_of_month.matches(dt.day())
            && self.month.matches(dt.month())
            && self.day_of_week.matches(dt.weekday().num_days_from_sunday())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        let expr = CronExpr::parse("* * * * *").unwrap();
        assert!(expr.matches(0));
        assert!(expr.matches(1_700_000_000_000));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronExpr::parse("* * * *").is_none());
        assert!(CronExpr::parse("* * * * * *").is_none());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(CronExpr::parse("60 * * * *").is_none());
        assert!(CronExpr::parse("* 24 * * *").is_none());
        assert!(CronExpr::parse("* * 32 * *").is_none());
        assert!(CronExpr::parse("* * * 13 *").is_none());
        assert!(CronExpr::parse("* * * * 7").is_none());
    }

    #[test]
    fn rejects_malformed_range_or_step() {
        assert!(CronExpr::parse("5-3 * * * *").is_none());
        assert!(CronExpr::parse("*/0 * * * *").is_none());
        assert!(CronExpr::parse("abc * * * *").is_none());
        assert!(CronExpr::parse(", * * * *").is_none());
    }

    #[test]
    fn parses_list_range_and_step() {
        let expr = CronExpr::parse("0,30 9-17 * * 1-5").unwrap();
        // Monday Jan 5 1970 09:00 UTC-ish local doesn't matter for *; just
        // exercise minute/hour/day-of-week fields via a known timestamp.
        assert!(expr.minute.matches(0));
        assert!(expr.minute.matches(30));
        assert!(!expr.minute.matches(15));
        assert!(expr.hour.matches(9));
        assert!(expr.hour.matches(17));
        assert!(!expr.hour.matches(8));
        assert!(expr.day_of_week.matches(1));
        assert!(!expr.day_of_week.matches(6));
    }

    #[test]
    fn parses_step_on_wildcard() {
        let expr = CronExpr::parse("*/15 * * * *").unwrap();
        assert!(expr.minute.matches(0));
        assert!(expr.minute.matches(15));
        assert!(expr.minute.matches(45));
        assert!(!expr.minute.matches(20));
    }
}
