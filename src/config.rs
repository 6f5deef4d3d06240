//! Configuration types for parsing and the media cache.
//!
//! This module provides clean configuration structs for library usage,
//! without any CLI framework dependencies.
//!
//! # Example
//!
//! ```rust
//! use chatloom::config::{LocalIdentity, ParseConfig};
//!
//! let config = ParseConfig::new()
//!     .with_sample_lines(400)
//!     .with_local_identity(LocalIdentity::new("Me").with_phone("+1 (555) 123-4567"));
//! ```

use serde::{Deserialize, Serialize};

use crate::parsing::date_order::DateOrder;

/// The configured identity of the local user.
///
/// Exports name every sender the same way, including the person who produced
/// the export. This identity decides which messages are outgoing, which
/// participant is "the other side" in 1:1 chats, and how those chats are
/// named. Phone numbers are normalized by stripping non-digits and keeping
/// the final 10 digits when a country code is present, so `+1 (555) 123-4567`
/// and `5551234567` compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    /// Display name used by the local user in exports.
    pub display_name: String,

    /// Known phone-number forms of the local user.
    pub phone_numbers: Vec<String>,
}

impl LocalIdentity {
    /// Creates an identity with a display name and no phone numbers.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            phone_numbers: Vec::new(),
        }
    }

    /// Adds a phone-number form.
    #[must_use]
    pub fn with_phone(mut self, number: impl Into<String>) -> Self {
        self.phone_numbers.push(number.into());
        self
    }

    /// Returns `true` if a sender display name resolves to this identity.
    ///
    /// Matches case-insensitively on the trimmed name, or on any configured
    /// phone number after normalization.
    pub fn matches(&self, sender: &str) -> bool {
        let sender = sender.trim();
        if !self.display_name.is_empty()
            && sender.eq_ignore_ascii_case(self.display_name.trim())
        {
            return true;
        }

        let sender_digits = normalize_phone(sender);
        if sender_digits.is_empty() {
            return false;
        }
        self.phone_numbers
            .iter()
            .any(|n| normalize_phone(n) == sender_digits)
    }
}

/// Normalizes a phone-number form for comparison.
///
/// Strips every non-digit character; when more than 10 digits remain (a
/// country code is present), keeps the final 10.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 10 {
        digits[digits.len() - 10..].to_string()
    } else {
        digits
    }
}

/// Configuration for export parsing.
///
/// # Example
///
/// ```rust
/// use chatloom::config::ParseConfig;
/// use chatloom::parsing::date_order::DateOrder;
///
/// // Trust inference but override the locale when the caller knows better.
/// let config = ParseConfig::new().with_date_order(DateOrder::MonthFirst);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Number of leading lines sampled for date-order inference (default: 800).
    pub sample_lines: usize,

    /// Caller-supplied locale hint. When set, inference is skipped entirely.
    pub date_order: Option<DateOrder>,

    /// Identity of the local user; decides the outgoing flag and 1:1 naming.
    pub local_identity: LocalIdentity,

    /// Bubble-grouping window in minutes, measured from the first message of
    /// a group (default: 10).
    pub grouping_window_minutes: i64,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            sample_lines: 800,
            date_order: None,
            local_identity: LocalIdentity::default(),
            grouping_window_minutes: 10,
        }
    }
}

impl ParseConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of lines sampled for date-order inference.
    #[must_use]
    pub fn with_sample_lines(mut self, lines: usize) -> Self {
        self.sample_lines = lines;
        self
    }

    /// Overrides date-order inference with a fixed order.
    #[must_use]
    pub fn with_date_order(mut self, order: DateOrder) -> Self {
        self.date_order = Some(order);
        self
    }

    /// Sets the local-user identity.
    #[must_use]
    pub fn with_local_identity(mut self, identity: LocalIdentity) -> Self {
        self.local_identity = identity;
        self
    }

    /// Sets the bubble-grouping window in minutes.
    #[must_use]
    pub fn with_grouping_window_minutes(mut self, minutes: i64) -> Self {
        self.grouping_window_minutes = minutes;
        self
    }
}

/// Configuration for the bounded media cache.
///
/// The cache holds at most `budget_bytes` of fetched attachment content and
/// starts evicting once occupancy would pass `eviction_ratio * budget_bytes`,
/// so it never churns right at the hard boundary.
#[cfg(feature = "cache")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hard aggregate byte budget (default: 64MB).
    pub budget_bytes: u64,

    /// Fraction of the budget at which eviction begins (default: 0.9).
    pub eviction_ratio: f64,
}

#[cfg(feature = "cache")]
impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 64 * 1024 * 1024, // 64MB
            eviction_ratio: 0.9,
        }
    }
}

#[cfg(feature = "cache")]
impl CacheConfig {
    /// Creates a configuration with the given byte budget.
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            budget_bytes,
            ..Self::default()
        }
    }

    /// Sets the eviction ratio.
    #[must_use]
    pub fn with_eviction_ratio(mut self, ratio: f64) -> Self {
        self.eviction_ratio = ratio;
        self
    }

    /// Returns the byte occupancy at which eviction begins.
    pub fn eviction_threshold(&self) -> u64 {
        (self.budget_bytes as f64 * self.eviction_ratio) as u64
    }
}
