//! Standard 5-field cron (minute hour day-of-month month day-of-week), UTC only.
//!
//! The `cron` crate's parser expects a leading seconds field, so a `0 ` is
//! prepended before handing the expression to it; a 6-field expression
//! (sub-minute granularity) is rejected up front rather than silently
//! accepted.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{Error, Result};

/// Returns the smallest instant strictly after `now` at which `expr` fires.
pub fn cron_next(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let schedule = parse(expr)?;
    schedule
        .after(&now)
        .next()
        .ok_or_else(|| Error::InvalidCronExpression {
            cron: expr.to_string(),
            reason: "expression never fires again".to_string(),
        })
}

/// Validates `expr` without computing a trigger time.
pub fn validate(expr: &str) -> Result<()> {
    parse(expr).map(|_| ())
}

fn parse(expr: &str) -> Result<Schedule> {
    let fields = expr.split_whitespace().count();
    if fields != 5 {
        return Err(Error::InvalidCronExpression {
            cron: expr.to_string(),
            reason: format!(
                "expected 5 fields (minute hour day month weekday), got {fields}"
            ),
        });
    }

    let with_seconds = format!("0 {expr}");
    Schedule::from_str(&with_seconds).map_err(|e| Error::InvalidCronExpression {
        cron: expr.to_string(),
        reason: e.to_string(),
    })
}
