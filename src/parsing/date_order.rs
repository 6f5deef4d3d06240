//! Date-order inference for locale-ambiguous exports.
//!
//! The export format carries no locale marker, so `01/02/2024` is ambiguous.
//! A single order is inferred once per source from a bounded prefix of lines
//! and then fixed for the remainder of the parse; it is never re-evaluated
//! per line.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// The order of the first two numeric fields in an ambiguous date token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DateOrder {
    /// `D/M/Y` — the default when no evidence disambiguates.
    DayFirst,
    /// `M/D/Y`
    MonthFirst,
}

/// Matches a line-leading date token, with or without a leading bracket:
/// two 1-2 digit fields and a 2-4 digit year. Both separators are captured;
/// the caller rejects tokens whose separators differ.
fn leading_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[?(\d{1,2})([/.\-])(\d{1,2})([/.\-])(\d{2,4})").unwrap()
    })
}

/// Infers the date order from a sample of normalized lines.
///
/// For every line beginning with a date token, the first two numeric fields
/// are inspected: a first field above 12 is day-first evidence, a second
/// field above 12 (on a line whose first field is not) is month-first
/// evidence. The higher evidence count wins; a tie defaults to day-first.
///
/// A file whose scanned prefix contains no disambiguating date cannot be
/// inferred soundly; the day-first default is a policy decision, not a
/// guess at intent. Callers with better knowledge pass an explicit order
/// via [`ParseConfig::with_date_order`](crate::config::ParseConfig::with_date_order).
pub fn infer_date_order<'a, I>(lines: I) -> DateOrder
where
    I: IntoIterator<Item = &'a str>,
{
    let re = leading_date_regex();
    let mut day_first_hits = 0usize;
    let mut month_first_hits = 0usize;

    for line in lines {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        if caps[2] != caps[4] {
            continue;
        }
        let first: u32 = caps[1].parse().unwrap_or(0);
        let second: u32 = caps[3].parse().unwrap_or(0);

        if first > 12 {
            day_first_hits += 1;
        } else if second > 12 {
            month_first_hits += 1;
        }
    }

    tracing::debug!(
        day_first_hits,
        month_first_hits,
        "date-order inference complete"
    );

    if month_first_hits > day_first_hits {
        DateOrder::MonthFirst
    } else {
        DateOrder::DayFirst
    }
}
