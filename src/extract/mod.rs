use regex::Regex;
use std::sync::OnceLock;

use crate::errors::{ArtefactError, Result};

/// Start of a numbered item: beginning of a line, optional indentation,
/// digits, a period and one whitespace character.
fn marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(?m)^[ \t]*\d+\.\s").expect("static regex"))
}

/// Pull the items of a numbered list out of free-form model output.
///
/// Items are returned in textual order; the numbers themselves are not
/// checked for sequence or uniqueness. An item runs until the next marker or
/// end of text, so multi-line bodies stay together. Text before the first
/// marker is ignored.
pub fn extract_numbered_list(text: &str) -> Result<Vec<String>> {
    let markers: Vec<_> = marker().find_iter(text).collect();
    if markers.is_empty() {
        return Err(ArtefactError::Extraction(
            "no numbered items found in model output".into(),
        ));
    }

    let mut items = Vec::with_capacity(markers.len());
    for (i, m) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map(|next| next.start()).unwrap_or(text.len());
        items.push(text[m.end()..end].trim().to_string());
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_list() {
        let items =
            extract_numbered_list("1. Open the app\n2. Search for an item\n3. Confirm purchase")
                .unwrap();
        assert_eq!(items, vec!["Open the app", "Search for an item", "Confirm purchase"]);
    }

    #[test]
    fn no_markers_is_an_error() {
        let err = extract_numbered_list("Some text with no list").unwrap_err();
        assert!(matches!(err, ArtefactError::Extraction(_)));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(extract_numbered_list("").is_err());
    }

    #[test]
    fn ignores_preamble_and_keeps_multiline_bodies() {
        let text = "Here is your scenario:\n\n1. Anna opens the app.\n   She sees the dashboard.\n2. She taps Search.\n";
        let items = extract_numbered_list(text).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], "Anna opens the app.\n   She sees the dashboard.");
        assert_eq!(items[1], "She taps Search.");
    }

    #[test]
    fn trusts_textual_order_not_numbers() {
        let items = extract_numbered_list("3. third\n1. first\n1. again").unwrap();
        assert_eq!(items, vec!["third", "first", "again"]);
    }

    #[test]
    fn mid_line_numbers_are_not_markers() {
        let items = extract_numbered_list("1. Pay 2. 5 euros at step 3. done\n2. Leave").unwrap();
        assert_eq!(items, vec!["Pay 2. 5 euros at step 3. done", "Leave"]);
    }

    #[test]
    fn decimals_are_not_markers() {
        assert!(extract_numbered_list("Version 1.5 is out").is_err());
    }

    #[test]
    fn indented_and_crlf_lists() {
        let items = extract_numbered_list("  1. alpha\r\n  2. beta\r\n").unwrap();
        assert_eq!(items, vec!["alpha", "beta"]);
    }

    #[test]
    fn item_count_matches_marker_count() {
        let text = "1. a\n2.\tb\n10. c\n11. d";
        assert_eq!(extract_numbered_list(text).unwrap().len(), 4);
    }
}
