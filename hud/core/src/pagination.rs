//! Text Pagination
//!
//! Splits a work's text into HUD-sized pages. The split is a pure function of
//! its input: page indices persisted in an earlier session must still point at
//! the same chunk when the same content is paginated again.

/// Maximum Unicode scalar values per HUD page
pub const MAX_CHARS_PER_PAGE: usize = 2000;

/// Single page returned for content that is empty after normalization
pub const EMPTY_CONTENT_PLACEHOLDER: &str = "本文がありません";

/// Normalize line endings (CR-LF and bare CR become LF) and trim surrounding whitespace
#[must_use]
pub fn normalize(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// Split content into consecutive pages of at most [`MAX_CHARS_PER_PAGE`] characters
///
/// Never returns an empty vector.
#[must_use]
pub fn paginate(content: &str) -> Vec<String> {
    let normalized = normalize(content);
    if normalized.is_empty() {
        return vec![EMPTY_CONTENT_PLACEHOLDER.to_string()];
    }

    let chars: Vec<char> = normalized.chars().collect();
    chars
        .chunks(MAX_CHARS_PER_PAGE)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Number of pages `paginate` would produce
#[must_use]
pub fn page_count(content: &str) -> usize {
    paginate(content).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_yields_placeholder() {
        assert_eq!(paginate(""), vec![EMPTY_CONTENT_PLACEHOLDER.to_string()]);
        assert_eq!(paginate(" \r\n\t \r "), vec![EMPTY_CONTENT_PLACEHOLDER.to_string()]);
        assert_eq!(page_count(""), 1);
    }

    #[test]
    fn test_line_endings_normalized() {
        assert_eq!(normalize("a\r\nb\rc\n"), "a\nb\nc");
        assert_eq!(paginate("  一\r\n二\r三  "), vec!["一\n二\n三".to_string()]);
    }

    #[test]
    fn test_exact_page_boundaries() {
        let text = "あ".repeat(5000);
        let pages = paginate(&text);
        let lengths: Vec<usize> = pages.iter().map(|p| p.chars().count()).collect();
        assert_eq!(lengths, vec![2000, 2000, 1000]);

        assert_eq!(page_count(&"x".repeat(2000)), 1);
        assert_eq!(page_count(&"x".repeat(2001)), 2);
    }

    #[test]
    fn test_concatenation_matches_normalized_text() {
        let samples: [&str; 5] = [
            "",
            "short",
            "\r\n\r\n吾輩は猫である。\r\n名前はまだ無い。\r\n",
            &"どこで生れたかとんと見当がつかぬ。\r".repeat(300),
            &"🐈".repeat(4001),
        ];

        for sample in samples {
            let normalized = normalize(sample);
            let pages = paginate(sample);
            let length = normalized.chars().count();

            if length == 0 {
                assert_eq!(pages.len(), 1);
                continue;
            }
            assert_eq!(pages.concat(), normalized);
            assert_eq!(pages.len(), length.div_ceil(MAX_CHARS_PER_PAGE));
        }
    }

    #[test]
    fn test_pagination_is_deterministic() {
        let text = "坊っちゃん\r\n".repeat(999);
        assert_eq!(paginate(&text), paginate(&text));
    }

    #[test]
    fn test_splits_on_scalar_values_not_bytes() {
        let text = format!("{}{}", "a".repeat(1999), "漢字");
        let pages = paginate(&text);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].ends_with('漢'));
        assert_eq!(pages[1], "字");
    }
}
