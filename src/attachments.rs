//! The attachment index and its resolution strategies.
//!
//! Exports reference media by name only, and the names rarely line up with
//! the files the archive collaborator actually supplies: paths differ,
//! devices rename on re-download, and some exporters truncate. Resolution is
//! an ordered ladder of pure matcher functions tried until one succeeds,
//! from exact to increasingly fuzzy:
//!
//! 1. exact path match
//! 2. exact basename match
//! 3. substring match
//! 4. leading numeric-ID match (at least 5 digits)
//! 5. date-substring match (an 8-digit `YYYYMMDD` run)

use serde::{Deserialize, Serialize};

use crate::message::MessageKind;

// The index hands these out, so callers can import everything from here.
pub use crate::message::Attachment;

/// The normalized form of a referenced media name, computed once per lookup.
struct MediaRef {
    path: String,
    basename: String,
    leading_id: Option<String>,
    date_token: Option<String>,
}

impl MediaRef {
    fn new(name: &str) -> Self {
        let path = name.trim().to_lowercase();
        let basename = basename(&path).to_string();
        Self {
            leading_id: leading_digit_run(&basename, 5),
            date_token: eight_digit_run(&basename),
            path,
            basename,
        }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Returns the digit run at the start of `name` when it has at least
/// `min_len` digits.
fn leading_digit_run(name: &str, min_len: usize) -> Option<String> {
    let run: String = name.chars().take_while(char::is_ascii_digit).collect();
    (run.len() >= min_len).then_some(run)
}

/// Returns the first 8-digit run anywhere in `name` (device-generated names
/// embed the capture date as `YYYYMMDD`).
fn eight_digit_run(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            let s = *start.get_or_insert(i);
            if i - s + 1 == 8 {
                // Must be exactly 8: a longer run is not a date token
                let end_ok = bytes.get(i + 1).is_none_or(|b| !b.is_ascii_digit());
                if end_ok {
                    return Some(name[s..=i].to_string());
                }
            }
        } else {
            start = None;
        }
    }
    None
}

type Matcher = fn(&MediaRef, &IndexedAttachment) -> bool;

/// Strategy ladder, most exact first.
const STRATEGIES: &[(&str, Matcher)] = &[
    ("exact-path", |r, a| a.path == r.path),
    ("exact-basename", |r, a| a.basename == r.basename),
    ("substring", |r, a| {
        a.basename.contains(r.basename.as_str()) || r.basename.contains(a.basename.as_str())
    }),
    ("leading-id", |r, a| {
        r.leading_id
            .as_deref()
            .is_some_and(|id| a.basename.contains(id))
    }),
    ("date-substring", |r, a| {
        r.date_token
            .as_deref()
            .is_some_and(|d| a.basename.contains(d))
    }),
];

/// One indexed attachment with its precomputed lowercase forms.
#[derive(Debug, Clone)]
struct IndexedAttachment {
    path: String,
    basename: String,
    attachment: Attachment,
}

/// Index of the attachment files associated with one or more export sources.
///
/// Built once from the archive collaborator's listing; lookups are performed
/// per media reference during assembly.
///
/// # Example
///
/// ```
/// use chatloom::attachments::AttachmentIndex;
/// use chatloom::message::Attachment;
///
/// let mut index = AttachmentIndex::new();
/// index.insert(Attachment {
///     filename: "media/IMG-20240115-WA0001.jpg".into(),
///     mime_type: Some("image/jpeg".into()),
///     size_bytes: Some(204800),
///     remote_id: None,
///     preview: None,
/// });
///
/// assert!(index.resolve("IMG-20240115-WA0001.jpg").is_some());
/// assert!(index.resolve("IMG-9999-WA0001.jpg").is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Attachment>", into = "Vec<Attachment>")]
pub struct AttachmentIndex {
    entries: Vec<IndexedAttachment>,
}

impl AttachmentIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from an attachment listing.
    pub fn from_entries(entries: impl IntoIterator<Item = Attachment>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry);
        }
        index
    }

    /// Adds one attachment to the index.
    pub fn insert(&mut self, attachment: Attachment) {
        let path = attachment.filename.trim().to_lowercase();
        let basename = basename(&path).to_string();
        self.entries.push(IndexedAttachment {
            path,
            basename,
            attachment,
        });
    }

    /// Number of indexed attachments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no attachments are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a referenced media name against the index.
    ///
    /// Strategies are tried strictly in ladder order; within one strategy the
    /// first indexed entry wins, keeping resolution deterministic.
    pub fn resolve(&self, name: &str) -> Option<&Attachment> {
        if name.trim().is_empty() {
            return None;
        }
        let media_ref = MediaRef::new(name);
        for (strategy, matcher) in STRATEGIES {
            if let Some(found) = self.entries.iter().find(|e| matcher(&media_ref, e)) {
                tracing::debug!(name, strategy, file = %found.attachment.filename, "media resolved");
                return Some(&found.attachment);
            }
        }
        None
    }
}

impl From<Vec<Attachment>> for AttachmentIndex {
    fn from(entries: Vec<Attachment>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<AttachmentIndex> for Vec<Attachment> {
    fn from(index: AttachmentIndex) -> Self {
        index.entries.into_iter().map(|e| e.attachment).collect()
    }
}

/// Determines the message kind for a resolved attachment, preferring the
/// declared MIME type and falling back to extension, then to the device
/// filename convention.
pub fn media_kind(attachment: &Attachment) -> MessageKind {
    if let Some(mime) = attachment.mime_type.as_deref() {
        let mime = mime.to_lowercase();
        if mime.starts_with("image/") {
            return if mime.contains("webp") {
                MessageKind::Sticker
            } else {
                MessageKind::Image
            };
        }
        if mime.starts_with("video/") {
            return MessageKind::Video;
        }
        if mime.starts_with("audio/") {
            return MessageKind::Audio;
        }
    }
    kind_from_filename(&attachment.filename)
}

/// Classifies a bare filename by device convention, then by extension.
pub fn kind_from_filename(name: &str) -> MessageKind {
    let base = basename(&name.to_lowercase()).to_string();
    for (prefix, kind) in [
        ("img-", MessageKind::Image),
        ("vid-", MessageKind::Video),
        ("aud-", MessageKind::Audio),
        ("ptt-", MessageKind::Audio),
        ("stk-", MessageKind::Sticker),
        ("doc-", MessageKind::Document),
    ] {
        if base.starts_with(prefix) {
            return kind;
        }
    }
    match base.rsplit('.').next().unwrap_or("") {
        "jpg" | "jpeg" | "png" | "gif" | "heic" => MessageKind::Image,
        "mp4" | "mov" | "3gp" | "mkv" | "webm" => MessageKind::Video,
        "opus" | "ogg" | "mp3" | "m4a" | "aac" | "wav" => MessageKind::Audio,
        "webp" => MessageKind::Sticker,
        _ => MessageKind::Document,
    }
}
