//! The export parsing pipeline.
//!
//! Raw per-source text flows through normalization, one-shot date-order
//! inference, per-line classification, and message assembly. The pipeline is
//! synchronous, performs no I/O, and has no shared mutable state, so whole
//! invocations can be moved onto a worker thread as an isolated unit of work.
//!
//! ```
//! use chatloom::attachments::AttachmentIndex;
//! use chatloom::config::ParseConfig;
//! use chatloom::parsing::parse_source;
//!
//! let text = "15/01/2024, 10:30 - Alice: Hello\n15/01/2024, 10:31 - Bob: Hi";
//! let parsed = parse_source("chat.txt", text, &AttachmentIndex::new(), &ParseConfig::new())
//!     .unwrap();
//! assert_eq!(parsed.messages.len(), 2);
//! ```

pub mod assembler;
pub mod date_order;
pub mod line;
pub mod normalize;

use crate::attachments::AttachmentIndex;
use crate::config::ParseConfig;
use crate::error::{ChatloomError, Result};
use crate::message::Message;

use assembler::assemble;
use date_order::{infer_date_order, DateOrder};
use line::{classify_line, ClassifiedLine};
use normalize::normalize_line;

/// Statistics about one parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParseStats {
    /// Total lines in the source.
    pub total_lines: usize,
    /// Finished user messages.
    pub message_count: usize,
    /// System lines.
    pub system_count: usize,
    /// Malformed timestamp-looking lines that were discarded.
    pub discarded_lines: usize,
    /// The date order used for the whole source.
    pub date_order: DateOrder,
}

/// The result of parsing one export source.
#[derive(Debug)]
pub struct ParsedSource {
    /// Name of the source, as supplied by the archive collaborator.
    pub source_name: String,
    /// Messages in file order.
    pub messages: Vec<Message>,
    /// Pipeline statistics.
    pub stats: ParseStats,
}

/// Parses one export source into messages.
///
/// The date order is taken from the config when set, otherwise inferred once
/// from the leading [`ParseConfig::sample_lines`] lines and fixed for the
/// remainder of the source.
///
/// # Errors
///
/// Returns [`ChatloomError::Parse`] when a non-empty source contains no
/// classifiable timestamp line at all — the text is not an export in any
/// recognized shape. Callers that must not abort ingestion degrade this via
/// [`Chat::failed`](crate::chat::Chat::failed).
pub fn parse_source(
    source_name: &str,
    raw_text: &str,
    attachments: &AttachmentIndex,
    config: &ParseConfig,
) -> Result<ParsedSource> {
    let normalized: Vec<String> = raw_text.lines().map(normalize_line).collect();
    let total_lines = normalized.len();

    let date_order = config.date_order.unwrap_or_else(|| {
        infer_date_order(
            normalized
                .iter()
                .take(config.sample_lines)
                .map(String::as_str),
        )
    });
    tracing::debug!(source_name, ?date_order, total_lines, "parsing source");

    let mut start_lines = 0usize;
    let classified = normalized.iter().map(|l| {
        let c = classify_line(l, date_order);
        if matches!(
            c,
            ClassifiedLine::UserMessageStart { .. } | ClassifiedLine::SystemLineStart { .. }
        ) {
            start_lines += 1;
        }
        c
    });

    let assembled = assemble(classified, attachments, &config.local_identity);

    if start_lines == 0 && normalized.iter().any(|l| !l.is_empty()) {
        return Err(ChatloomError::parse(
            source_name,
            "no classifiable timestamp lines; not a recognized chat export",
        ));
    }

    let system_count = assembled.messages.iter().filter(|m| m.is_system()).count();
    let stats = ParseStats {
        total_lines,
        message_count: assembled.messages.len() - system_count,
        system_count,
        discarded_lines: assembled.discarded_lines,
        date_order,
    };

    Ok(ParsedSource {
        source_name: source_name.to_string(),
        messages: assembled.messages,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedSource {
        parse_source("test.txt", text, &AttachmentIndex::new(), &ParseConfig::new()).unwrap()
    }

    #[test]
    fn end_to_end_simple_chat() {
        let parsed = parse(
            "15/01/2024, 10:30 - Alice: Hello\n15/01/2024, 10:31 - Bob: Hi\nsecond line",
        );
        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.messages[1].content, "Hi\nsecond line");
        assert_eq!(parsed.stats.message_count, 2);
        assert_eq!(parsed.stats.system_count, 0);
    }

    #[test]
    fn date_order_inferred_from_prefix() {
        // 31 in the first field fixes day-first for the whole file,
        // including the later ambiguous 02/03 date.
        let parsed = parse(
            "31/01/2024, 10:30 - Alice: start\n02/03/2024, 10:31 - Alice: later",
        );
        assert_eq!(parsed.stats.date_order, DateOrder::DayFirst);
        use chrono::Datelike;
        assert_eq!(parsed.messages[1].timestamp.day(), 2);
        assert_eq!(parsed.messages[1].timestamp.month(), 3);
    }

    #[test]
    fn config_override_skips_inference() {
        let config = ParseConfig::new().with_date_order(DateOrder::MonthFirst);
        let parsed = parse_source(
            "t.txt",
            "01/02/2024, 10:30 - Alice: hi",
            &AttachmentIndex::new(),
            &config,
        )
        .unwrap();
        use chrono::Datelike;
        assert_eq!(parsed.messages[0].timestamp.month(), 1);
        assert_eq!(parsed.messages[0].timestamp.day(), 2);
    }

    #[test]
    fn invisible_characters_do_not_break_classification() {
        let parsed = parse("\u{200E}[15/01/2024, 10:30:45] Alice: hi");
        assert_eq!(parsed.messages.len(), 1);
    }

    #[test]
    fn unclassifiable_text_is_a_structural_error() {
        let err = parse_source(
            "notes.txt",
            "just some notes\nnothing chat-shaped here",
            &AttachmentIndex::new(),
            &ParseConfig::new(),
        )
        .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn empty_source_is_fine() {
        let parsed = parse("");
        assert!(parsed.messages.is_empty());
        assert_eq!(parsed.stats.total_lines, 0);
    }

    #[test]
    fn stats_count_system_and_discarded() {
        let parsed = parse(
            "15/01/2024, 10:30 - Messages and calls are end-to-end encrypted\n15/01/2024, 10:31 - Alice: hi\n15/01/2024, bogus",
        );
        assert_eq!(parsed.stats.system_count, 1);
        assert_eq!(parsed.stats.message_count, 1);
        assert_eq!(parsed.stats.discarded_lines, 1);
    }
}
