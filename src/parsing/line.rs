//! Line classification and timestamp resolution.
//!
//! Exports interleave timestamp-prefixed lines with free-form message bodies
//! and administrative events, with nothing but shape to tell them apart.
//! Three concrete timestamp shapes are recognized:
//!
//! - bracketed: `[15/01/2024, 10:30:45] Alice: Hello`
//! - dash-separated: `15/01/2024, 10:30:45 - Alice: Hello`
//! - dash-separated without seconds: `15/01/2024, 10:30 - Alice: Hello`
//!
//! with optional 12-hour meridiem suffixes in all of them. Classification is
//! pure and allocation-light; it runs in a tight loop over potentially
//! hundreds of thousands of lines.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use super::date_order::DateOrder;

/// A single classified export line.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedLine {
    /// Starts a user message: a valid timestamp followed by `sender: body`.
    UserMessageStart {
        timestamp: DateTime<Utc>,
        sender: String,
        rest: String,
    },
    /// Starts a system line: a valid timestamp with no sender segment.
    SystemLineStart {
        timestamp: DateTime<Utc>,
        rest: String,
    },
    /// Extends the body of the previously open message.
    Continuation(String),
    /// Looks like it starts with a timestamp but failed full parsing.
    ///
    /// The assembler closes the open message and discards this line rather
    /// than corrupting the body with orphaned date text.
    Unrecognized(String),
}

/// Bracketed shape: `[d/d/yyyy, hh:mm(:ss)( AM)] rest`. The two date
/// separators are captured independently; `classify_line` requires them to
/// be the same character.
fn bracketed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\[(\d{1,2})([/.\-])(\d{1,2})([/.\-])(\d{2,4}), (\d{1,2}):(\d{2})(?::(\d{2}))?(?: ?([AaPp])\.?[Mm]\.?)?\] ?(.*)$",
        )
        .unwrap()
    })
}

/// Dash shape: `d/d/yyyy, hh:mm(:ss)( AM) - rest`. Seconds optional, so this
/// one pattern covers both dash-separated variants.
fn dashed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{1,2})([/.\-])(\d{1,2})([/.\-])(\d{2,4}), (\d{1,2}):(\d{2})(?::(\d{2}))?(?: ?([AaPp])\.?[Mm]\.?)? - (.*)$",
        )
        .unwrap()
    })
}

/// Strict sub-check: the line opens with a bracketed or bare date token even
/// though the full shapes above did not match.
fn timestampish_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[?\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4},").unwrap())
}

/// Classifies one normalized line under a fixed date order.
pub fn classify_line(line: &str, order: DateOrder) -> ClassifiedLine {
    for re in [bracketed_regex(), dashed_regex()] {
        if let Some(caps) = re.captures(line) {
            // A date token must use one separator consistently
            if caps[2] != caps[4] {
                return ClassifiedLine::Unrecognized(line.to_string());
            }
            let timestamp = resolve_timestamp(&caps, order);
            let rest = caps.get(10).map_or("", |m| m.as_str());
            return match timestamp {
                Some(timestamp) => start_of_line(timestamp, rest),
                // Shaped like a timestamp line but the fields are impossible
                None => ClassifiedLine::Unrecognized(line.to_string()),
            };
        }
    }

    if timestampish_regex().is_match(line) {
        return ClassifiedLine::Unrecognized(line.to_string());
    }

    ClassifiedLine::Continuation(line.to_string())
}

/// Decides user-message vs. system for a timestamp-prefixed line.
///
/// A `sender:` segment in the remainder makes it a user message; anything
/// else is a system line. The split is deliberately the only signal used
/// here: system classification is authoritative and is never inferred from
/// phrases in ordinary message text.
fn start_of_line(timestamp: DateTime<Utc>, rest: &str) -> ClassifiedLine {
    match split_sender(rest) {
        Some((sender, body)) => ClassifiedLine::UserMessageStart {
            timestamp,
            sender: sender.to_string(),
            rest: body.to_string(),
        },
        None => ClassifiedLine::SystemLineStart {
            timestamp,
            rest: rest.to_string(),
        },
    }
}

/// Splits `rest` into `(sender, body)` when it looks like `name: text`.
///
/// URLs and overlong prefixes disqualify the colon as a sender separator.
fn split_sender(rest: &str) -> Option<(&str, &str)> {
    let (name, body) = rest.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.len() > 80 || name.contains("http") {
        return None;
    }
    let body = body.strip_prefix(' ').unwrap_or(body);
    Some((name, body))
}

/// Builds a timestamp from captured numeric fields under the given order.
///
/// 2-digit years are normalized by adding 2000. Returns `None` when the
/// fields do not form a real date or time.
fn resolve_timestamp(caps: &regex::Captures<'_>, order: DateOrder) -> Option<DateTime<Utc>> {
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[3].parse().ok()?;
    let mut year: i32 = caps[5].parse().ok()?;
    if year < 100 {
        year += 2000;
    }

    let (day, month) = match order {
        DateOrder::DayFirst => (first, second),
        DateOrder::MonthFirst => (second, first),
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let mut hour: u32 = caps[6].parse().ok()?;
    let minute: u32 = caps[7].parse().ok()?;
    let second: u32 = caps.get(8).map_or(Ok(0), |m| m.as_str().parse()).ok()?;

    if let Some(meridiem) = caps.get(9) {
        let pm = meridiem.as_str().eq_ignore_ascii_case("p");
        if hour == 0 || hour > 12 {
            return None;
        }
        hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
    }

    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(date.and_time(time).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn classify(line: &str) -> ClassifiedLine {
        classify_line(line, DateOrder::DayFirst)
    }

    fn expect_user(line: &str, order: DateOrder) -> (DateTime<Utc>, String, String) {
        match classify_line(line, order) {
            ClassifiedLine::UserMessageStart {
                timestamp,
                sender,
                rest,
            } => (timestamp, sender, rest),
            other => panic!("expected UserMessageStart, got {other:?}"),
        }
    }

    #[test]
    fn bracketed_with_seconds() {
        let (ts, sender, rest) =
            expect_user("[15/01/2024, 10:30:45] Alice: Hello", DateOrder::DayFirst);
        assert_eq!((ts.day(), ts.month(), ts.year()), (15, 1, 2024));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (10, 30, 45));
        assert_eq!(sender, "Alice");
        assert_eq!(rest, "Hello");
    }

    #[test]
    fn dashed_without_seconds() {
        let (ts, sender, rest) =
            expect_user("15/01/2024, 10:30 - Alice: Hello", DateOrder::DayFirst);
        assert_eq!(ts.second(), 0);
        assert_eq!(sender, "Alice");
        assert_eq!(rest, "Hello");
    }

    #[test]
    fn dashed_with_seconds() {
        let (ts, ..) = expect_user("15/01/2024, 10:30:12 - Alice: Hello", DateOrder::DayFirst);
        assert_eq!(ts.second(), 12);
    }

    #[test]
    fn meridiem_conversion() {
        let (ts, ..) = expect_user("[1/15/24, 10:30:45 PM] Alice: Hi", DateOrder::MonthFirst);
        assert_eq!(ts.hour(), 22);
        let (ts, ..) = expect_user("[1/15/24, 12:01 AM] Alice: Hi", DateOrder::MonthFirst);
        assert_eq!(ts.hour(), 0);
        let (ts, ..) = expect_user("[1/15/24, 12:01 PM] Alice: Hi", DateOrder::MonthFirst);
        assert_eq!(ts.hour(), 12);
    }

    #[test]
    fn two_digit_year_gains_2000() {
        let (ts, ..) = expect_user("[15.01.24, 10:30:45] Alice: Hi", DateOrder::DayFirst);
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn date_order_changes_resolution() {
        let (day_first, ..) = expect_user("[5/1/2024, 10:30] Alice: Hi", DateOrder::DayFirst);
        let (month_first, ..) = expect_user("[5/1/2024, 10:30] Alice: Hi", DateOrder::MonthFirst);
        assert_eq!((day_first.day(), day_first.month()), (5, 1));
        assert_eq!((month_first.day(), month_first.month()), (1, 5));
    }

    #[test]
    fn timestamp_without_sender_is_system() {
        match classify("15/01/2024, 10:30 - Messages and calls are end-to-end encrypted") {
            ClassifiedLine::SystemLineStart { rest, .. } => {
                assert!(rest.contains("end-to-end"));
            }
            other => panic!("expected SystemLineStart, got {other:?}"),
        }
    }

    #[test]
    fn sender_segment_disqualifies_system() {
        // Carries a timestamp and no ordinary body shape, but the remainder
        // is name: text, so it stays a user message.
        let (_, sender, rest) =
            expect_user("15/01/2024, 10:30 - Alice: added value to my life", DateOrder::DayFirst);
        assert_eq!(sender, "Alice");
        assert_eq!(rest, "added value to my life");
    }

    #[test]
    fn url_in_system_line_is_not_a_sender() {
        match classify("15/01/2024, 10:30 - see https://example.com/page for details") {
            ClassifiedLine::SystemLineStart { .. } => {}
            other => panic!("expected SystemLineStart, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_continuation() {
        assert_eq!(
            classify("just another line of the message"),
            ClassifiedLine::Continuation("just another line of the message".into())
        );
    }

    #[test]
    fn empty_line_is_continuation() {
        assert_eq!(classify(""), ClassifiedLine::Continuation(String::new()));
    }

    #[test]
    fn malformed_timestamp_prefix_is_unrecognized() {
        // Date token with comma but garbage where the time should be
        match classify("15/01/2024, garbage - Alice: Hello") {
            ClassifiedLine::Unrecognized(_) => {}
            other => panic!("expected Unrecognized, got {other:?}"),
        }
    }

    #[test]
    fn impossible_date_is_unrecognized() {
        match classify("31/31/2024, 10:30 - Alice: Hello") {
            ClassifiedLine::Unrecognized(_) => {}
            other => panic!("expected Unrecognized, got {other:?}"),
        }
    }

    #[test]
    fn impossible_time_is_unrecognized() {
        match classify("15/01/2024, 25:99 - Alice: Hello") {
            ClassifiedLine::Unrecognized(_) => {}
            other => panic!("expected Unrecognized, got {other:?}"),
        }
    }

    #[test]
    fn line_starting_with_plain_number_is_continuation() {
        // No date token, no comma: just prose that happens to open numerically
        assert_eq!(
            classify("42 is the answer"),
            ClassifiedLine::Continuation("42 is the answer".into())
        );
    }

    #[test]
    fn empty_body_after_sender() {
        let (_, sender, rest) = expect_user("[15/01/2024, 10:30] Alice:", DateOrder::DayFirst);
        assert_eq!(sender, "Alice");
        assert_eq!(rest, "");
    }

    #[test]
    fn every_separator_classifies() {
        for line in [
            "15/01/2024, 10:30 - Alice: Hello",
            "15.01.2024, 10:30 - Alice: Hello",
            "15-01-2024, 10:30 - Alice: Hello",
            "[15/01/2024, 10:30] Alice: Hello",
        ] {
            let (_, sender, _) = expect_user(line, DateOrder::DayFirst);
            assert_eq!(sender, "Alice");
        }
    }

    #[test]
    fn mixed_separators_are_unrecognized() {
        for line in [
            "15/01.2024, 10:30 - Alice: Hello",
            "[15-01/2024, 10:30] Alice: Hello",
        ] {
            match classify(line) {
                ClassifiedLine::Unrecognized(_) => {}
                other => panic!("expected Unrecognized, got {other:?}"),
            }
        }
    }
}
