//! Cross-backup merging of redundant export sources.
//!
//! Users re-export the same conversation repeatedly; each backup is a
//! complete or partial copy of the same message history. Merging pools every
//! source, sorts chronologically, and drops duplicates by a content-addressed
//! key. Timestamps are rounded to whole seconds in the key because redundant
//! exports of one conversation record sub-second jitter; sender and
//! content/filename must still match exactly, so rounding cannot cause a
//! false merge.

use std::collections::HashSet;

use crate::message::Message;

/// Content-addressed dedup key: `seconds|sender|filename` for media,
/// `seconds|sender|content` for everything else.
fn dedup_key(msg: &Message) -> String {
    let secs = msg.timestamp.timestamp();
    let sender = msg.sender.trim().to_lowercase();
    match msg.attachment_filename() {
        Some(filename) => format!("{secs}|{sender}|{}", filename.to_lowercase()),
        None => format!("{secs}|{sender}|{}", msg.content.trim().to_lowercase()),
    }
}

/// Merges message arrays from redundant sources into one chronological,
/// deduplicated sequence.
///
/// A single source is only sorted — no dedup key is ever computed for it.
/// With two or more sources, the first occurrence (in timestamp order) of a
/// given key wins and later duplicates are dropped silently. Sorting is
/// stable, so equal-timestamp messages keep their source order.
pub fn merge_sources(sources: Vec<Vec<Message>>) -> Vec<Message> {
    match sources.len() {
        0 => Vec::new(),
        1 => {
            let mut only = sources.into_iter().next().unwrap_or_default();
            only.sort_by_key(|m| m.timestamp);
            only
        }
        n => {
            let mut pooled: Vec<Message> = sources.into_iter().flatten().collect();
            let pooled_len = pooled.len();
            pooled.sort_by_key(|m| m.timestamp);

            let mut seen = HashSet::with_capacity(pooled_len);
            let merged: Vec<Message> = pooled
                .into_iter()
                .filter(|m| seen.insert(dedup_key(m)))
                .collect();
            tracing::debug!(
                sources = n,
                pooled = pooled_len,
                merged = merged.len(),
                "cross-backup merge complete"
            );
            merged
        }
    }
}
