//! Message assembly from the classified-line stream.
//!
//! The assembler is an explicit fold carrying an `Option<PartialMessage>`
//! accumulator: each classified line either extends the open accumulator or
//! flushes it and opens a new one. There is no shared mutable state; the
//! fold is a pure function from (stream, initial state) to (finished
//! messages, final partial state).
//!
//! Finished user bodies are enriched in a fixed order: media-reference
//! extraction, edit-marker stripping, quoted-reply detection, call-log
//! detection. System lines bypass all of it — their classification is
//! authoritative and is never second-guessed from body text, since words
//! like "added" or "joined" appear in ordinary prose.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::attachments::{media_kind, AttachmentIndex};
use crate::config::LocalIdentity;
use crate::message::{CallInfo, CallKind, Message, Quoted};
use crate::parsing::line::ClassifiedLine;

/// The literal appended by the exporter to edited messages.
const EDIT_MARKER: &str = "<This message was edited>";

/// Whole-body placeholders the exporter writes when media was excluded from
/// the export. These are dropped entirely, never surfaced as empty messages.
const OMITTED_LITERALS: &[&str] = &[
    "media omitted",
    "image omitted",
    "video omitted",
    "audio omitted",
    "gif omitted",
    "sticker omitted",
    "document omitted",
    "voice message omitted",
    "contact card omitted",
];

/// One message under construction.
#[derive(Debug, Clone)]
struct PartialMessage {
    timestamp: DateTime<Utc>,
    /// `None` marks a system line.
    sender: Option<String>,
    body: String,
}

impl PartialMessage {
    fn push_line(&mut self, line: &str) {
        self.body.push('\n');
        self.body.push_str(line);
    }
}

/// Result of assembling one source.
#[derive(Debug, Default)]
pub struct AssembledSource {
    /// Finished messages in file order.
    pub messages: Vec<Message>,
    /// Malformed timestamp-looking lines that were discarded.
    pub discarded_lines: usize,
}

/// Folds a classified-line stream into finished messages.
pub fn assemble<I>(
    lines: I,
    attachments: &AttachmentIndex,
    identity: &LocalIdentity,
) -> AssembledSource
where
    I: IntoIterator<Item = ClassifiedLine>,
{
    let mut out = AssembledSource::default();
    let mut state: Option<PartialMessage> = None;

    for line in lines {
        state = step(state, line, attachments, identity, &mut out);
    }
    flush(state, attachments, identity, &mut out);

    out
}

/// One fold step: consumes the accumulator state and a line, emits any
/// finished message into `out`, and returns the next state.
fn step(
    state: Option<PartialMessage>,
    line: ClassifiedLine,
    attachments: &AttachmentIndex,
    identity: &LocalIdentity,
    out: &mut AssembledSource,
) -> Option<PartialMessage> {
    match line {
        ClassifiedLine::UserMessageStart {
            timestamp,
            sender,
            rest,
        } => {
            flush(state, attachments, identity, out);
            Some(PartialMessage {
                timestamp,
                sender: Some(sender),
                body: rest,
            })
        }
        ClassifiedLine::SystemLineStart { timestamp, rest } => {
            flush(state, attachments, identity, out);
            Some(PartialMessage {
                timestamp,
                sender: None,
                body: rest,
            })
        }
        ClassifiedLine::Continuation(text) => match state {
            Some(mut partial) => {
                partial.push_line(&text);
                Some(partial)
            }
            // Orphan line before any message start
            None => None,
        },
        ClassifiedLine::Unrecognized(text) => {
            // Close out the open message; keeping the orphaned date text
            // would corrupt its body.
            flush(state, attachments, identity, out);
            tracing::warn!(line = %text, "discarding malformed timestamp-prefixed line");
            out.discarded_lines += 1;
            None
        }
    }
}

/// Finishes the open accumulator, if any, and appends the result.
fn flush(
    state: Option<PartialMessage>,
    attachments: &AttachmentIndex,
    identity: &LocalIdentity,
    out: &mut AssembledSource,
) {
    if let Some(partial) = state {
        let ordinal = out.messages.len();
        if let Some(msg) = finish(partial, ordinal, attachments, identity) {
            out.messages.push(msg);
        }
    }
}

/// Turns a completed accumulator into a `Message`, or drops it.
fn finish(
    partial: PartialMessage,
    ordinal: usize,
    attachments: &AttachmentIndex,
    identity: &LocalIdentity,
) -> Option<Message> {
    let body = partial.body.trim().to_string();

    let Some(sender) = partial.sender else {
        // System classification is authoritative; no enrichment runs.
        return Some(Message::system(partial.timestamp, ordinal, body));
    };

    let outgoing = identity.matches(&sender);

    // (a) media-reference extraction
    if is_omitted_placeholder(&body) {
        return None;
    }
    if let Some((name, caption)) = extract_media_reference(&body) {
        let (caption, edited) = strip_edit_marker(&caption);
        let msg = match attachments.resolve(&name) {
            Some(attachment) => Message::new(partial.timestamp, ordinal, sender, caption)
                .with_attachment(media_kind(attachment), attachment.clone()),
            None => {
                let placeholder = if caption.is_empty() {
                    format!("media not found: {name}")
                } else {
                    format!("media not found: {name}\n{caption}")
                };
                Message::new(partial.timestamp, ordinal, sender, placeholder)
            }
        };
        return Some(msg.with_edited(edited).with_outgoing(outgoing));
    }

    // (b) edit marker
    let (content, edited) = strip_edit_marker(&body);

    // (c) quoted-reply detection, best-effort
    let (quoted, content) = match detect_quote(&content) {
        Some((quoted, remainder)) => (Some(quoted), remainder),
        None => (None, content),
    };

    // (d) call-log detection
    let call = detect_call(&content);

    let mut msg = Message::new(partial.timestamp, ordinal, sender, content)
        .with_edited(edited)
        .with_outgoing(outgoing);
    if let Some(quoted) = quoted {
        msg = msg.with_quoted(quoted);
    }
    if let Some(call) = call {
        msg = msg.with_call(call);
    }
    Some(msg)
}

// ============================================================================
// Body enrichment
// ============================================================================

/// `<attached: NAME>` anywhere in the body.
fn attached_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<attached:\s*([^>\n]+)>").unwrap())
}

/// `NAME (file attached)` on a line of its own.
fn file_attached_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^(\S.{0,200}?) ?\(file attached\) *$").unwrap())
}

/// A bare device-generated filename as the whole first line.
fn device_filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:IMG|VID|AUD|PTT|STK|DOC)-\d{8}-WA\d{4}\.[A-Za-z0-9]{1,5}$").unwrap()
    })
}

/// Returns `true` when the whole body is an omitted-media placeholder.
fn is_omitted_placeholder(body: &str) -> bool {
    let bare = body
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_lowercase();
    OMITTED_LITERALS.contains(&bare.as_str())
}

/// Extracts `(media name, remaining caption)` from a body, if it carries a
/// media reference.
fn extract_media_reference(body: &str) -> Option<(String, String)> {
    if let Some(caps) = attached_regex().captures(body) {
        let whole = caps.get(0).unwrap();
        let name = caps[1].trim().to_string();
        let caption = format!("{}{}", &body[..whole.start()], &body[whole.end()..]);
        return Some((name, caption.trim().to_string()));
    }

    if let Some(caps) = file_attached_regex().captures(body) {
        let whole = caps.get(0).unwrap();
        let name = caps[1].trim().to_string();
        let caption = format!("{}{}", &body[..whole.start()], &body[whole.end()..]);
        return Some((name, caption.trim().to_string()));
    }

    let first_line = body.lines().next().unwrap_or("");
    if device_filename_regex().is_match(first_line) {
        let caption = body[first_line.len()..].trim().to_string();
        return Some((first_line.to_string(), caption));
    }

    None
}

/// Strips the edit-marker literal from the tail of a body.
fn strip_edit_marker(body: &str) -> (String, bool) {
    match body.trim_end().strip_suffix(EDIT_MARKER) {
        Some(rest) => (rest.trim_end().to_string(), true),
        None => (body.to_string(), false),
    }
}

/// Best-effort quoted-reply detection.
///
/// Requires the first line to look like `sender: text` with a non-empty
/// remainder; anything ambiguous leaves the body untouched. This is an
/// enrichment layer, not a correctness property — it degrades to "no quote
/// detected", never to corrupted content.
fn detect_quote(body: &str) -> Option<(Quoted, String)> {
    let (first, rest) = body.split_once('\n')?;
    let (sender, content) = first.split_once(": ")?;
    let sender = sender.trim();
    let content = content.trim();
    let remainder = rest.trim();
    if sender.is_empty()
        || sender.len() > 60
        || sender.contains("http")
        || content.is_empty()
        || remainder.is_empty()
    {
        return None;
    }
    Some((
        Quoted {
            sender: sender.to_string(),
            content: content.to_string(),
        },
        remainder.to_string(),
    ))
}

/// Call-log detection on remaining text.
///
/// Matches the literal voice/video call phrases, with or without a duration
/// suffix. The phrase must be the whole text or be followed by a punctuation
/// separator; "video call me later" is prose, not a call log.
fn detect_call(text: &str) -> Option<CallInfo> {
    let trimmed = text.trim();
    let (missed, rest) = match strip_prefix_ci(trimmed, "missed ") {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let (kind, after) = if let Some(after) = strip_prefix_ci(rest, "voice call") {
        (CallKind::Voice, after)
    } else if let Some(after) = strip_prefix_ci(rest, "video call") {
        (CallKind::Video, after)
    } else {
        return None;
    };

    let after = after.trim_start();
    let duration = if after.is_empty() {
        None
    } else if let Some(d) = after.strip_prefix(',') {
        Some(d.trim().to_string())
    } else if let Some(d) = after.strip_prefix('(').and_then(|d| d.strip_suffix(')')) {
        Some(d.trim().to_string())
    } else if let Some(d) = after.strip_prefix('·') {
        Some(d.trim().to_string())
    } else {
        // Trailing prose disqualifies the match
        return None;
    };

    Some(CallInfo {
        kind,
        duration: duration.filter(|d| !d.is_empty()),
        missed,
    })
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    // get() bails on non-boundary indices, which multi-byte bodies hit
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Attachment, MessageKind};
    use crate::parsing::date_order::DateOrder;
    use crate::parsing::line::classify_line;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn assemble_text(text: &str, attachments: &AttachmentIndex) -> AssembledSource {
        let identity = LocalIdentity::new("Me");
        let lines = text
            .lines()
            .map(|l| classify_line(l, DateOrder::DayFirst))
            .collect::<Vec<_>>();
        assemble(lines, attachments, &identity)
    }

    fn image_index() -> AttachmentIndex {
        AttachmentIndex::from_entries([Attachment {
            filename: "IMG-20240115-WA0001.jpg".into(),
            mime_type: Some("image/jpeg".into()),
            size_bytes: Some(1024),
            remote_id: Some("remote-1".into()),
            preview: None,
        }])
    }

    #[test]
    fn assembles_multiline_messages() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: first line\nsecond line\n15/01/2024, 10:31 - Bob: reply",
            &AttachmentIndex::new(),
        );
        assert_eq!(out.messages.len(), 2);
        assert_eq!(out.messages[0].content, "first line\nsecond line");
        assert_eq!(out.messages[1].sender, "Bob");
    }

    #[test]
    fn orphan_continuation_before_first_message_is_ignored() {
        let out = assemble_text(
            "stray line\n15/01/2024, 10:30 - Alice: hello",
            &AttachmentIndex::new(),
        );
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].content, "hello");
    }

    #[test]
    fn unrecognized_line_closes_open_message() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: hello\n15/01/2024, garbage\nthis would be a continuation",
            &AttachmentIndex::new(),
        );
        // The malformed line is discarded and the trailing continuation is
        // orphaned rather than appended to Alice's message.
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].content, "hello");
        assert_eq!(out.discarded_lines, 1);
    }

    #[test]
    fn system_line_bypasses_enrichment() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Missed voice call",
            &AttachmentIndex::new(),
        );
        assert_eq!(out.messages.len(), 1);
        // "Missed voice call" with no sender segment is a system line, and
        // system classification is never reinterpreted as a call log.
        assert!(out.messages[0].is_system());
        assert!(out.messages[0].call.is_none());
    }

    #[test]
    fn resolved_attachment_yields_media_message() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: <attached: IMG-20240115-WA0001.jpg>",
            &image_index(),
        );
        let msg = &out.messages[0];
        assert_eq!(msg.kind, MessageKind::Image);
        assert_eq!(msg.attachment_filename(), Some("IMG-20240115-WA0001.jpg"));
        assert_eq!(msg.content, "");
    }

    #[test]
    fn caption_survives_media_extraction() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: IMG-20240115-WA0001.jpg (file attached)\nlook at this!",
            &image_index(),
        );
        let msg = &out.messages[0];
        assert_eq!(msg.kind, MessageKind::Image);
        assert_eq!(msg.content, "look at this!");
    }

    #[test]
    fn bare_device_filename_is_a_media_reference() {
        let out = assemble_text("15/01/2024, 10:30 - Alice: IMG-20240115-WA0001.jpg", &image_index());
        assert_eq!(out.messages[0].kind, MessageKind::Image);
    }

    #[test]
    fn unresolved_media_becomes_placeholder_text() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: <attached: IMG-9999-WA0001.jpg>",
            &AttachmentIndex::new(),
        );
        let msg = &out.messages[0];
        assert_eq!(msg.kind, MessageKind::Text);
        assert!(msg.content.contains("media not found"));
        assert!(msg.content.contains("IMG-9999-WA0001.jpg"));
    }

    #[test]
    fn omitted_placeholder_is_dropped_entirely() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: <Media omitted>\n15/01/2024, 10:31 - Alice: image omitted\n15/01/2024, 10:32 - Alice: real text",
            &AttachmentIndex::new(),
        );
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].content, "real text");
    }

    #[test]
    fn edit_marker_is_stripped_and_flagged() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: fixed typo <This message was edited>",
            &AttachmentIndex::new(),
        );
        let msg = &out.messages[0];
        assert!(msg.edited);
        assert_eq!(msg.content, "fixed typo");
    }

    #[test]
    fn quote_detection_requires_remainder() {
        // First line looks quoted but nothing follows: leave untouched
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: Bob: are you coming?",
            &AttachmentIndex::new(),
        );
        assert!(out.messages[0].quoted.is_none());
        assert_eq!(out.messages[0].content, "Bob: are you coming?");
    }

    #[test]
    fn quote_detected_with_remainder() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: Bob: are you coming?\nyes, on my way",
            &AttachmentIndex::new(),
        );
        let msg = &out.messages[0];
        let quoted = msg.quoted.as_ref().unwrap();
        assert_eq!(quoted.sender, "Bob");
        assert_eq!(quoted.content, "are you coming?");
        assert_eq!(msg.content, "yes, on my way");
    }

    #[test]
    fn quote_detection_degrades_on_urls() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: check https://example.com: the best site\nreally",
            &AttachmentIndex::new(),
        );
        assert!(out.messages[0].quoted.is_none());
        assert!(out.messages[0].content.contains("https://example.com"));
    }

    #[test]
    fn call_log_with_duration() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: Voice call, 5 min",
            &AttachmentIndex::new(),
        );
        let call = out.messages[0].call.as_ref().unwrap();
        assert_eq!(call.kind, CallKind::Voice);
        assert_eq!(call.duration.as_deref(), Some("5 min"));
        assert!(!call.missed);
        assert_eq!(out.messages[0].kind, MessageKind::Call);
    }

    #[test]
    fn missed_video_call() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Bob: Missed video call",
            &AttachmentIndex::new(),
        );
        let call = out.messages[0].call.as_ref().unwrap();
        assert_eq!(call.kind, CallKind::Video);
        assert!(call.missed);
        assert!(call.duration.is_none());
    }

    #[test]
    fn call_phrase_in_prose_is_not_a_call() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Bob: video call me later please",
            &AttachmentIndex::new(),
        );
        assert!(out.messages[0].call.is_none());
        assert_eq!(out.messages[0].kind, MessageKind::Text);
    }

    #[test]
    fn outgoing_flag_follows_identity() {
        let identity = LocalIdentity::new("Alice");
        let lines = ["15/01/2024, 10:30 - Alice: mine", "15/01/2024, 10:31 - Bob: theirs"]
            .iter()
            .map(|l| classify_line(l, DateOrder::DayFirst))
            .collect::<Vec<_>>();
        let out = assemble(lines, &AttachmentIndex::new(), &identity);
        assert!(out.messages[0].outgoing);
        assert!(!out.messages[1].outgoing);
    }

    #[test]
    fn detect_call_unit() {
        assert!(detect_call("Voice call").is_some());
        assert!(detect_call("video call (12:30)").is_some());
        assert_eq!(
            detect_call("Video call (12:30)").unwrap().duration.as_deref(),
            Some("12:30")
        );
        assert!(detect_call("calling all units").is_none());
        assert!(detect_call("").is_none());
    }

    #[test]
    fn multibyte_body_survives_call_detection() {
        // Byte-slicing at the prefix length would land mid-character here
        assert!(detect_call("Привет 🎉").is_none());
        let out = assemble_text(
            "15/01/2024, 10:30 - Боб: Привет 🎉",
            &AttachmentIndex::new(),
        );
        assert_eq!(out.messages[0].content, "Привет 🎉");
        assert_eq!(out.messages[0].kind, MessageKind::Text);
    }

    #[test]
    fn strip_edit_marker_unit() {
        let (body, edited) = strip_edit_marker("hello <This message was edited>");
        assert!(edited);
        assert_eq!(body, "hello");
        let (body, edited) = strip_edit_marker("hello");
        assert!(!edited);
        assert_eq!(body, "hello");
    }

    #[test]
    fn ordinals_and_ids_are_per_source() {
        let out = assemble_text(
            "15/01/2024, 10:30 - Alice: a\n15/01/2024, 10:30 - Alice: b",
            &AttachmentIndex::new(),
        );
        assert_ne!(out.messages[0].id, out.messages[1].id);
    }

    #[test]
    fn timestamps_preserved() {
        let out = assemble_text("15/01/2024, 10:30:45 - Alice: a", &AttachmentIndex::new());
        assert_eq!(out.messages[0].timestamp, ts(10, 30, 45));
    }
}
