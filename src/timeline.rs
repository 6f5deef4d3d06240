//! Display-oriented grouping of a merged message history.
//!
//! The timeline splits messages into calendar-day groups, each subdivided
//! into bubble groups — consecutive runs from one sender that are close
//! enough in time to render as a single visual block. Grouping is pure
//! presentation: it never reorders or mutates messages.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::message::Message;
use crate::participants::names_equal;

/// A run of messages rendered as one visual block.
#[derive(Debug, Clone, Serialize)]
pub struct BubbleGroup {
    /// Sender shared by every message in the run (first-seen spelling).
    pub sender: String,
    /// Outgoing polarity shared by the run.
    pub outgoing: bool,
    /// System notices always form singleton groups.
    pub system: bool,
    /// Messages in chronological order.
    pub messages: Vec<Message>,
}

/// All messages of one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineGroup {
    /// The day, in the export's local reading of timestamps.
    pub date: NaiveDate,
    /// Human-readable day header, relative to the reference date.
    pub label: String,
    /// Bubble groups in chronological order.
    pub bubbles: Vec<BubbleGroup>,
}

/// Day header text relative to `reference` (normally today).
///
/// `TODAY`, `YESTERDAY`, the upper-cased weekday name for the five days
/// before that, and `MONTH DAY, YEAR` beyond. Future days get the long form
/// too; exports should not contain them but clock skew happens.
#[must_use]
pub fn day_label(day: NaiveDate, reference: NaiveDate) -> String {
    match (reference - day).num_days() {
        0 => "TODAY".to_string(),
        1 => "YESTERDAY".to_string(),
        2..=6 => weekday_name(day.weekday()).to_string(),
        _ => format!(
            "{} {}, {}",
            month_name(day.month()),
            day.day(),
            day.year()
        ),
    }
}

fn weekday_name(weekday: chrono::Weekday) -> &'static str {
    use chrono::Weekday;
    match weekday {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "JANUARY",
        2 => "FEBRUARY",
        3 => "MARCH",
        4 => "APRIL",
        5 => "MAY",
        6 => "JUNE",
        7 => "JULY",
        8 => "AUGUST",
        9 => "SEPTEMBER",
        10 => "OCTOBER",
        11 => "NOVEMBER",
        _ => "DECEMBER",
    }
}

/// Groups chronologically-ordered messages into day and bubble groups.
///
/// A message joins the current bubble when it has the same sender
/// (case-insensitive), the same outgoing polarity, and lies within
/// `window_minutes` of the bubble's *first* message, boundary inclusive.
/// System messages never share a bubble.
#[must_use]
pub fn build_timeline(
    messages: &[Message],
    window_minutes: i64,
    reference: NaiveDate,
) -> Vec<TimelineGroup> {
    let window = Duration::minutes(window_minutes);
    let mut days: Vec<TimelineGroup> = Vec::new();

    for msg in messages {
        let date = msg.timestamp.date_naive();
        let start_day = days.last().is_none_or(|g| g.date != date);
        if start_day {
            days.push(TimelineGroup {
                date,
                label: day_label(date, reference),
                bubbles: Vec::new(),
            });
        }
        let Some(day) = days.last_mut() else { continue };

        let joins = !msg.is_system()
            && day.bubbles.last().is_some_and(|b| {
                !b.system
                    && b.outgoing == msg.outgoing
                    && names_equal(&b.sender, &msg.sender)
                    && msg.timestamp - b.messages[0].timestamp <= window
            });
        if joins {
            if let Some(bubble) = day.bubbles.last_mut() {
                bubble.messages.push(msg.clone());
            }
        } else {
            day.bubbles.push(BubbleGroup {
                sender: msg.sender.clone(),
                outgoing: msg.outgoing,
                system: msg.is_system(),
                messages: vec![msg.clone()],
            });
        }
    }
    days
}

/// Case-insensitive substring search over a message history.
///
/// Built once per chat; matches against content, sender, and attachment
/// filename, returning message indices in source order.
#[derive(Debug)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

#[derive(Debug)]
struct SearchEntry {
    content: String,
    sender: String,
    filename: Option<String>,
}

impl SearchIndex {
    /// Precomputes lowercase haystacks for every message.
    #[must_use]
    pub fn build(messages: &[Message]) -> Self {
        let entries = messages
            .iter()
            .map(|m| SearchEntry {
                content: m.content.to_lowercase(),
                sender: m.sender.to_lowercase(),
                filename: m.attachment_filename().map(str::to_lowercase),
            })
            .collect();
        Self { entries }
    }

    /// Indices of messages matching `query`, in source order.
    ///
    /// An empty or whitespace-only query matches nothing.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<usize> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.content.contains(&needle)
                    || e.sender.contains(&needle)
                    || e.filename.as_deref().is_some_and(|f| f.contains(&needle))
            })
            .map(|(i, _)| i)
            .collect()
    }
}
