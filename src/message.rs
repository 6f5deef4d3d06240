//! The normalized message type reconstructed from export text.
//!
//! This module provides [`Message`], the durable unit of a reconstructed
//! timeline, along with its satellite types: [`MessageKind`], [`Attachment`],
//! [`Quoted`] and [`CallInfo`].
//!
//! # Overview
//!
//! A message consists of:
//! - **Required**: `id`, `timestamp`, `sender`, `kind`, `content`
//! - **Optional**: `attachment`, `quoted`, `call`, plus the `edited` flag
//!
//! A message's identity is stable for a given (timestamp, sender,
//! ordinal-within-file) triple but is *not* globally unique across redundant
//! sources until the cross-backup merge runs.
//!
//! # Examples
//!
//! ```
//! use chatloom::message::{Message, MessageKind};
//! use chrono::{TimeZone, Utc};
//!
//! let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
//! let msg = Message::new(ts, 0, "Alice", "Hello, world!");
//! assert_eq!(msg.sender, "Alice");
//! assert_eq!(msg.kind, MessageKind::Text);
//! assert!(!msg.is_system());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a reconstructed message.
///
/// Media kinds are assigned during assembly when a media reference in the
/// body resolves against the attachment index; `System` is assigned only by
/// the line classifier, never inferred from body text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text (also unresolved-media placeholders).
    Text,
    /// Image attachment.
    Image,
    /// Video attachment.
    Video,
    /// Audio attachment, including voice notes.
    Audio,
    /// Document attachment.
    Document,
    /// Sticker attachment.
    Sticker,
    /// Voice or video call log entry.
    Call,
    /// Administrative event emitted by the platform, not a user.
    System,
}

impl MessageKind {
    /// Returns `true` if this kind carries an attachment payload.
    pub fn is_media(self) -> bool {
        matches!(
            self,
            MessageKind::Image
                | MessageKind::Video
                | MessageKind::Audio
                | MessageKind::Document
                | MessageKind::Sticker
        )
    }
}

/// A resolved attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Filename as listed by the archive collaborator.
    pub filename: String,

    /// Declared MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub mime_type: Option<String>,

    /// Size in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub size_bytes: Option<u64>,

    /// Opaque identifier for lazy fetching from remote storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub remote_id: Option<String>,

    /// Locator of a low-resolution preview, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub preview: Option<String>,
}

/// A best-effort snapshot of the message being replied to.
///
/// Quote detection is a heuristic enrichment layer; when in doubt the body
/// is left untouched and no quote is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quoted {
    /// Sender of the quoted message.
    pub sender: String,
    /// Quoted snippet.
    pub content: String,
}

/// Whether a call was voice-only or video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Voice,
    Video,
}

/// Metadata for a call-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    /// Voice or video.
    pub kind: CallKind,

    /// Duration text as it appeared in the export, e.g. `5 min`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub duration: Option<String>,

    /// Set when the call was missed.
    pub missed: bool,
}

/// A normalized, reconstructed chat message.
///
/// All export sources produce this one representation, enabling uniform
/// merging, grouping and search regardless of the locale or shape of the
/// original text.
///
/// # Invariant
///
/// System messages never carry outgoing semantics: `kind == System` implies
/// `outgoing == false`. The constructors uphold this; there is no way to
/// build a system message through [`Message::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable display identifier, derived from timestamp, ordinal and sender.
    pub id: String,

    /// When the message was sent (second precision; exports carry no zone).
    pub timestamp: DateTime<Utc>,

    /// Display name of the author; empty for system messages.
    pub sender: String,

    /// `true` iff the sender resolves to the configured local identity.
    pub outgoing: bool,

    /// Classified kind of the message.
    pub kind: MessageKind,

    /// Body text, or the caption for media messages. Empty for pure media.
    pub content: String,

    /// Resolved attachment, for media kinds.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub attachment: Option<Attachment>,

    /// Quoted-reply snapshot, when detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub quoted: Option<Quoted>,

    /// Set when the export marked the message as edited.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub edited: bool,

    /// Call metadata, for call-log entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub call: Option<CallInfo>,
}

impl Message {
    /// Creates a text message from a user sender.
    ///
    /// The `ordinal` is the message's position within its source file; it
    /// keeps ids distinct when a sender posts twice in one second.
    pub fn new(
        timestamp: DateTime<Utc>,
        ordinal: usize,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let sender = sender.into();
        Self {
            id: derive_id(timestamp, ordinal, &sender),
            timestamp,
            sender,
            outgoing: false,
            kind: MessageKind::Text,
            content: content.into(),
            attachment: None,
            quoted: None,
            edited: false,
            call: None,
        }
    }

    /// Creates a system message. System messages have no sender and are
    /// never outgoing.
    pub fn system(timestamp: DateTime<Utc>, ordinal: usize, content: impl Into<String>) -> Self {
        Self {
            id: derive_id(timestamp, ordinal, ""),
            timestamp,
            sender: String::new(),
            outgoing: false,
            kind: MessageKind::System,
            content: content.into(),
            attachment: None,
            quoted: None,
            edited: false,
            call: None,
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Sets the kind and attachment together, turning this into a media
    /// message.
    #[must_use]
    pub fn with_attachment(mut self, kind: MessageKind, attachment: Attachment) -> Self {
        debug_assert!(kind.is_media());
        self.kind = kind;
        self.attachment = Some(attachment);
        self
    }

    /// Sets the quoted-reply snapshot.
    #[must_use]
    pub fn with_quoted(mut self, quoted: Quoted) -> Self {
        self.quoted = Some(quoted);
        self
    }

    /// Marks this message as edited.
    #[must_use]
    pub fn with_edited(mut self, edited: bool) -> Self {
        self.edited = edited;
        self
    }

    /// Sets call metadata, turning this into a call-log entry.
    #[must_use]
    pub fn with_call(mut self, call: CallInfo) -> Self {
        self.kind = MessageKind::Call;
        self.call = Some(call);
        self
    }

    /// Sets the outgoing flag. No-op for system messages.
    #[must_use]
    pub fn with_outgoing(mut self, outgoing: bool) -> Self {
        if self.kind != MessageKind::System {
            self.outgoing = outgoing;
        }
        self
    }

    // =========================================================================
    // Utility methods
    // =========================================================================

    /// Returns `true` for system messages.
    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }

    /// Returns `true` if this message carries an attachment.
    pub fn is_media(&self) -> bool {
        self.kind.is_media()
    }

    /// Returns `true` if this message's content is empty or whitespace-only.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Returns the attachment filename, when present.
    pub fn attachment_filename(&self) -> Option<&str> {
        self.attachment.as_ref().map(|a| a.filename.as_str())
    }
}

/// Derives the stable display id for a `(timestamp, ordinal, sender)` triple.
fn derive_id(timestamp: DateTime<Utc>, ordinal: usize, sender: &str) -> String {
    let sender_part: String = sender
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(12)
        .collect();
    format!("{}-{}-{}", timestamp.timestamp(), ordinal, sender_part)
}
