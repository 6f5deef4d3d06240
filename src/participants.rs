//! Participant derivation and local-identity resolution.
//!
//! Participants are derived once per parsed source by walking the finished
//! message sequence and recording the first-seen display name of every
//! non-system sender. Colors come from a fixed palette cycled by insertion
//! order — not hashed — so re-parsing the same file reproduces the same
//! avatars.

use serde::{Deserialize, Serialize};

use crate::config::{normalize_phone, LocalIdentity};
use crate::message::Message;

/// Fixed display palette, cycled by insertion order.
const PALETTE: &[&str] = &[
    "#e57373", "#64b5f6", "#81c784", "#ffb74d", "#ba68c8", "#4db6ac", "#f06292", "#a1887f",
    "#7986cb", "#90a4ae",
];

/// One distinct sender observed in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// First-seen display name.
    pub name: String,

    /// Normalized phone form, when the display name is itself a number.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub phone: Option<String>,

    /// Stable display color from the fixed palette.
    pub color: String,
}

impl Participant {
    fn new(name: &str, position: usize) -> Self {
        let digits = normalize_phone(name);
        let looks_like_number = !digits.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ' | '.'));
        Self {
            name: name.to_string(),
            phone: looks_like_number.then_some(digits),
            color: PALETTE[position % PALETTE.len()].to_string(),
        }
    }

    /// Returns `true` if this participant resolves to the local identity.
    pub fn is_local(&self, identity: &LocalIdentity) -> bool {
        identity.matches(&self.name)
    }
}

/// Derives the distinct participant set from a finished message sequence.
///
/// System messages carry no sender and are skipped. Name comparison is
/// case-insensitive on the trimmed form, keeping "alice" and " Alice "
/// one participant under the first-seen spelling.
pub fn extract_participants(messages: &[Message]) -> Vec<Participant> {
    let mut participants: Vec<Participant> = Vec::new();
    for msg in messages {
        if msg.is_system() || msg.sender.trim().is_empty() {
            continue;
        }
        let known = participants
            .iter()
            .any(|p| names_equal(&p.name, &msg.sender));
        if !known {
            let position = participants.len();
            participants.push(Participant::new(msg.sender.trim(), position));
        }
    }
    participants
}

/// Unions participant sets from merged sources, preserving first-seen order
/// and re-cycling the palette so colors stay deterministic after a merge.
pub fn union_participants(sets: impl IntoIterator<Item = Vec<Participant>>) -> Vec<Participant> {
    let mut names: Vec<String> = Vec::new();
    for set in sets {
        for p in set {
            if !names.iter().any(|n| names_equal(n, &p.name)) {
                names.push(p.name);
            }
        }
    }
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Participant::new(name, i))
        .collect()
}

/// Case-insensitive trimmed name comparison.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(sender: &str, ordinal: usize) -> Message {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        Message::new(ts, ordinal, sender, "hi")
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let messages = vec![msg("Bob", 0), msg("Alice", 1), msg("Bob", 2)];
        let participants = extract_participants(&messages);
        assert_eq!(participants.len(), 2);
        assert_eq!(participants[0].name, "Bob");
        assert_eq!(participants[1].name, "Alice");
    }

    #[test]
    fn colors_cycle_deterministically() {
        let messages: Vec<Message> = (0..12).map(|i| msg(&format!("User{i}"), i)).collect();
        let a = extract_participants(&messages);
        let b = extract_participants(&messages);
        assert_eq!(a, b);
        // Palette wraps after its length
        assert_eq!(a[0].color, a[PALETTE.len()].color);
    }

    #[test]
    fn system_messages_contribute_no_participant() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let messages = vec![Message::system(ts, 0, "Group created"), msg("Alice", 1)];
        let participants = extract_participants(&messages);
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].name, "Alice");
    }

    #[test]
    fn name_variants_collapse_case_insensitively() {
        let messages = vec![msg("Alice", 0), msg("alice", 1), msg(" ALICE ", 2)];
        let participants = extract_participants(&messages);
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].name, "Alice");
    }

    #[test]
    fn phone_sender_records_normalized_form() {
        let messages = vec![msg("+1 555 123 4567", 0)];
        let participants = extract_participants(&messages);
        assert_eq!(participants[0].phone.as_deref(), Some("5551234567"));
    }

    #[test]
    fn word_sender_records_no_phone() {
        let messages = vec![msg("Alice 2nd", 0)];
        let participants = extract_participants(&messages);
        assert!(participants[0].phone.is_none());
    }

    #[test]
    fn union_dedupes_across_sources() {
        let a = vec![
            Participant::new("Alice", 0),
            Participant::new("Bob", 1),
        ];
        let b = vec![
            Participant::new("bob", 0),
            Participant::new("Carol", 1),
        ];
        let merged = union_participants([a, b]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].name, "Alice");
        assert_eq!(merged[1].name, "Bob");
        assert_eq!(merged[2].name, "Carol");
        // Colors re-cycled by merged insertion order
        assert_eq!(merged[2].color, PALETTE[2]);
    }

    #[test]
    fn is_local_uses_identity() {
        let p = Participant::new("Alice", 0);
        assert!(p.is_local(&LocalIdentity::new("alice")));
        assert!(!p.is_local(&LocalIdentity::new("Bob")));
    }
}
