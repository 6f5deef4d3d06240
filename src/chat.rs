//! Conversations assembled from one or more export sources.
//!
//! A [`Chat`] is the unit the rest of the crate (timeline, CLI, JSON output)
//! consumes: a named, classified conversation with its participant list and
//! merged message history. [`parse_chat`] is the one-call entry point for a
//! single source; [`merge_chats`] folds redundant backups of the same
//! conversation into one.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::attachments::AttachmentIndex;
use crate::config::{LocalIdentity, ParseConfig};
use crate::error::ChatloomError;
use crate::merge::merge_sources;
use crate::message::Message;
use crate::participants::{extract_participants, union_participants, Participant};
use crate::parsing::{parse_source, ParseStats};

/// One-to-one conversation or group conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatKind {
    /// Exactly two distinct senders (or fewer, for degenerate exports).
    OneToOne,
    /// Three or more distinct senders.
    Group,
}

/// A reconstructed conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Stable identifier derived from the source name.
    pub id: String,
    /// Display name, resolved through the naming ladder.
    pub name: String,
    /// Conversation shape, derived from the distinct sender count.
    pub kind: ChatKind,
    /// Participants; for one-to-one chats the non-local party comes first.
    pub participants: Vec<Participant>,
    /// Merged messages in chronological order.
    pub messages: Vec<Message>,
    /// Pipeline statistics for a single-source chat. Merged chats drop them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<ParseStats>,
    /// Set when the source could not be parsed at all; the chat is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl Chat {
    /// Builds a chat from already-parsed messages.
    ///
    /// Derives participants, kind, name, and id; orders participants so the
    /// non-local party leads in one-to-one chats.
    pub fn from_messages(
        source_name: &str,
        messages: Vec<Message>,
        identity: &LocalIdentity,
        stats: Option<ParseStats>,
    ) -> Self {
        let kind = classify_kind(&messages);
        let mut participants = extract_participants(&messages);
        order_participants(&mut participants, kind, identity);
        let name = derive_name(source_name, &messages, &participants, kind, identity);
        Self {
            id: slug(source_name),
            name,
            kind,
            participants,
            messages,
            stats,
            parse_error: None,
        }
    }

    /// An empty chat recording why its source could not be parsed.
    ///
    /// Ingestion of *other* sources continues; the failure travels with the
    /// chat instead of aborting the batch.
    pub fn failed(source_name: &str, error: &ChatloomError) -> Self {
        Self {
            id: slug(source_name),
            name: stem(source_name).to_string(),
            kind: ChatKind::OneToOne,
            participants: Vec::new(),
            messages: Vec::new(),
            stats: None,
            parse_error: Some(error.to_string()),
        }
    }

    /// Whether the source failed to parse.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.parse_error.is_some()
    }
}

/// Parses one export source into a [`Chat`].
///
/// Structural parse failures degrade to [`Chat::failed`] rather than
/// propagating, so a batch of sources never aborts on one bad file.
pub fn parse_chat(
    source_name: &str,
    raw_text: &str,
    attachments: &AttachmentIndex,
    config: &ParseConfig,
) -> Chat {
    match parse_source(source_name, raw_text, attachments, config) {
        Ok(parsed) => Chat::from_messages(
            source_name,
            parsed.messages,
            &config.local_identity,
            Some(parsed.stats),
        ),
        Err(err) => {
            tracing::warn!(source_name, error = %err, "source failed to parse");
            Chat::failed(source_name, &err)
        }
    }
}

/// Merges several parsed chats (redundant backups of the same conversation).
///
/// Messages go through the cross-backup merger, participant sets are
/// unioned case-insensitively, and kind is re-derived from the merged
/// history. The first successfully-parsed chat's name wins unless the
/// merged history offers a better rung of the naming ladder (an embedded
/// group subject). Failed inputs contribute nothing but are not an error.
pub fn merge_chats(chats: Vec<Chat>, identity: &LocalIdentity) -> Chat {
    let usable: Vec<Chat> = chats.into_iter().filter(|c| !c.is_failed()).collect();
    let Some(first) = usable.first() else {
        return Chat {
            id: "merged".to_string(),
            name: String::new(),
            kind: ChatKind::OneToOne,
            participants: Vec::new(),
            messages: Vec::new(),
            stats: None,
            parse_error: Some("no parseable sources to merge".to_string()),
        };
    };
    let id = first.id.clone();
    let first_name = first.name.clone();

    let mut participant_sets = Vec::with_capacity(usable.len());
    let mut sources = Vec::with_capacity(usable.len());
    for chat in usable {
        participant_sets.push(chat.participants);
        sources.push(chat.messages);
    }

    let messages = merge_sources(sources);
    let kind = classify_kind(&messages);
    let mut participants = union_participants(participant_sets);
    order_participants(&mut participants, kind, identity);

    let name = if first_name.is_empty() {
        derive_name(&id, &messages, &participants, kind, identity)
    } else {
        subject_from_messages(&messages).unwrap_or(first_name)
    };

    Chat {
        id,
        name,
        kind,
        participants,
        messages,
        stats: None,
        parse_error: None,
    }
}

/// Exactly two distinct non-system senders (case-insensitive) or fewer is a
/// one-to-one chat; three or more is a group.
fn classify_kind(messages: &[Message]) -> ChatKind {
    let mut senders: HashSet<String> = HashSet::new();
    for msg in messages {
        if !msg.is_system() {
            senders.insert(msg.sender.trim().to_lowercase());
        }
    }
    if senders.len() >= 3 {
        ChatKind::Group
    } else {
        ChatKind::OneToOne
    }
}

/// In one-to-one chats the remote party leads the participant list.
fn order_participants(participants: &mut [Participant], kind: ChatKind, identity: &LocalIdentity) {
    if kind == ChatKind::OneToOne {
        participants.sort_by_key(|p| p.is_local(identity));
    }
}

/// Naming ladder: meaningful filename stem, then an embedded group-subject
/// system line, then the non-local participant for one-to-one chats, then
/// the raw stem.
fn derive_name(
    source_name: &str,
    messages: &[Message],
    participants: &[Participant],
    kind: ChatKind,
    identity: &LocalIdentity,
) -> String {
    if let Some(name) = name_from_filename(source_name) {
        return name;
    }
    if let Some(subject) = subject_from_messages(messages) {
        return subject;
    }
    if kind == ChatKind::OneToOne {
        if let Some(remote) = participants.iter().find(|p| !p.is_local(identity)) {
            return remote.name.clone();
        }
    }
    stem(source_name).to_string()
}

/// Filename stems like `_chat` or `chat` carry no conversation name.
const GENERIC_STEMS: &[&str] = &["_chat", "chat", "messages", "export"];

fn name_from_filename(source_name: &str) -> Option<String> {
    let mut name = stem(source_name);
    for prefix in ["WhatsApp Chat with ", "WhatsApp Chat - ", "Chat with "] {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
            break;
        }
    }
    let name = name.trim();
    if name.is_empty() || GENERIC_STEMS.contains(&name.to_lowercase().as_str()) {
        None
    } else {
        Some(name.to_string())
    }
}

/// Basename without its final extension.
fn stem(source_name: &str) -> &str {
    let base = source_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}

fn subject_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?:created group|changed the subject (?:from ["“][^"”]*["”] )?to) ["“](.+?)["”]"#,
        )
        .unwrap()
    })
}

/// Latest group subject announced by a system line, if any.
fn subject_from_messages(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.is_system())
        .filter_map(|m| subject_regex().captures(&m.content))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .next_back()
}

/// Lowercase alphanumeric slug with dash separators.
fn slug(source_name: &str) -> String {
    let mut out = String::with_capacity(source_name.len());
    let mut last_dash = true;
    for ch in stem(source_name).chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() { "chat".to_string() } else { out }
}
