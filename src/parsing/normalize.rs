//! Raw-line normalization.
//!
//! Exports are salted with invisible Unicode formatting characters (the
//! direction marks that phone keyboards and the exporter itself inject) that
//! would otherwise defeat the prefix checks in the classifier. Normalization
//! strips them, maps exotic spaces to plain ones, and collapses runs.

/// Returns `true` for invisible formatting characters that must be stripped
/// before classification.
///
/// Covers the bidi marks (LRM/RLM), embedding and isolate controls, zero
/// width space/joiner/non-joiner, and the BOM. These show up mid-timestamp
/// in real exports.
fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' // ZWSP, ZWNJ, ZWJ, LRM, RLM
            | '\u{202A}'..='\u{202E}' // embedding/override controls
            | '\u{2066}'..='\u{2069}' // isolate controls
            | '\u{FEFF}' // BOM
    )
}

/// Normalizes one raw export line.
///
/// - strips invisible formatting characters
/// - maps NBSP and narrow NBSP to a plain space
/// - drops remaining control characters (tabs become spaces)
/// - collapses runs of spaces and trims both ends
///
/// Allocation is avoided entirely for lines that are already clean, which is
/// the vast majority, so this is cheap to run in a tight loop.
pub fn normalize_line(raw: &str) -> String {
    let needs_work = raw.chars().any(|c| {
        is_invisible(c) || c == '\u{00A0}' || c == '\u{202F}' || c.is_control() || c == '\t'
    }) || raw != raw.trim()
        || raw.contains("  ");

    if !needs_work {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true; // leading spaces are dropped
    for c in raw.chars() {
        if is_invisible(c) {
            continue;
        }
        let c = match c {
            '\u{00A0}' | '\u{202F}' | '\t' => ' ',
            c if c.is_control() => continue,
            c => c,
        };
        if c == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(c);
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_line_passes_through() {
        assert_eq!(normalize_line("hello world"), "hello world");
    }

    #[test]
    fn strips_direction_marks() {
        // LRM before the bracket, as iOS exports produce
        assert_eq!(
            normalize_line("\u{200E}[1/15/24, 10:30:45] Alice: hi"),
            "[1/15/24, 10:30:45] Alice: hi"
        );
        assert_eq!(normalize_line("a\u{200F}b\u{202A}c"), "abc");
    }

    #[test]
    fn maps_nbsp_variants_to_space() {
        // Narrow NBSP separates time from meridiem in newer exports
        assert_eq!(normalize_line("10:30\u{202F}AM"), "10:30 AM");
        assert_eq!(normalize_line("a\u{00A0}b"), "a b");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(normalize_line("  a   b\t\tc  "), "a b c");
    }

    #[test]
    fn drops_control_characters() {
        assert_eq!(normalize_line("a\u{0007}b"), "ab");
    }

    #[test]
    fn empty_and_whitespace_only() {
        assert_eq!(normalize_line(""), "");
        assert_eq!(normalize_line("   \u{200E} "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_line("\u{200E} a \u{00A0} b ");
        assert_eq!(normalize_line(&once), once);
    }
}
