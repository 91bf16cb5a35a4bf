//! Paragraph-greedy text chunking.
//!
//! Text is split on blank lines (`"\n\n"`), paragraphs are trimmed and empty ones
//! dropped, then consecutive paragraphs are merged while their combined length stays
//! within `max_chars`. A paragraph longer than `max_chars` becomes its own chunk and is
//! never split, so the limit is a soft bound.

const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Soft upper bound on chunk length, in characters.
    pub max_chars: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self { max_chars: 1500 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.config.max_chars
    }

    /// Split `text` into chunks in document order. Blank input yields no chunks.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        merge_paragraphs(split_paragraphs(text), self.config.max_chars)
    }
}

fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

/// The separator is not counted against `max_chars`.
fn merge_paragraphs<'a>(paragraphs: impl Iterator<Item = &'a str>, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for paragraph in paragraphs {
        let paragraph_len = paragraph.chars().count();
        if current_len + paragraph_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(paragraph);
            current_len = paragraph_len;
        } else {
            if !current.is_empty() {
                current.push_str(PARAGRAPH_SEPARATOR);
            }
            current.push_str(paragraph);
            current_len += paragraph_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, max_chars: usize) -> Vec<String> {
        TextSplitter::new(SplitterConfig { max_chars }).split(text)
    }

    #[test]
    fn default_max_chars() {
        assert_eq!(TextSplitter::default().max_chars(), 1500);
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(split("", 1500).is_empty());
        assert!(split("   ", 1500).is_empty());
        assert!(split("\n\n", 1500).is_empty());
        assert!(split("\n\n  \n\n\t\n\n", 1500).is_empty());
    }

    #[test]
    fn small_paragraphs_merge_into_one_chunk() {
        let chunks = split("Paragraph A.\n\nParagraph B.", 1500);
        assert_eq!(chunks, vec!["Paragraph A.\n\nParagraph B."]);
    }

    #[test]
    fn two_large_paragraphs_stay_separate() {
        let a = "a".repeat(1000);
        let b = "b".repeat(1000);
        let chunks = split(&format!("{a}\n\n{b}"), 1500);
        assert_eq!(chunks, vec![a, b]);
    }

    #[test]
    fn oversized_paragraph_is_not_split() {
        let long = "x".repeat(4000);
        let chunks = split(&format!("short\n\n{long}\n\ntail"), 1500);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "short");
        assert_eq!(chunks[1], long);
        assert_eq!(chunks[2], "tail");
    }

    #[test]
    fn paragraphs_are_trimmed() {
        let chunks = split("  first  \n\n\n  second\n", 1500);
        assert_eq!(chunks, vec!["first\n\nsecond"]);
    }

    #[test]
    fn single_newlines_stay_inside_paragraph() {
        let chunks = split("line one\nline two", 5);
        assert_eq!(chunks, vec!["line one\nline two"]);
    }

    #[test]
    fn exact_fit_merges() {
        // 5 + 5 == max_chars, separator is not counted
        let chunks = split("aaaaa\n\nbbbbb", 10);
        assert_eq!(chunks, vec!["aaaaa\n\nbbbbb"]);
        let chunks = split("aaaaa\n\nbbbbbb", 10);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 4 Hangul syllables are 12 bytes but 4 chars each
        let chunks = split("가나다라\n\n마바사아", 8);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn greedy_packing_restarts_after_flush() {
        let chunks = split("aaaa\n\nbbbb\n\ncccc\n\ndddd", 8);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc\n\ndddd"]);
    }

    mod proptest_splitter {
        use super::*;
        use proptest::prelude::*;

        fn paragraphs_of(text: &str) -> Vec<String> {
            split_paragraphs(text).map(str::to_owned).collect()
        }

        fn document() -> impl Strategy<Value = String> {
            (
                proptest::collection::vec("[a-zA-Z .,]{0,300}", 0..20),
                proptest::sample::select(vec!["\n\n", "\n\n\n", "\n\n \n\n"]),
            )
                .prop_map(|(paras, sep)| paras.join(sep))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn split_never_panics(content in "\\PC{0,3000}", max_chars in 0usize..2000) {
                let _ = split(&content, max_chars);
            }

            #[test]
            fn rejoin_reproduces_paragraphs(content in document(), max_chars in 1usize..1000) {
                let chunks = split(&content, max_chars);
                let rejoined = chunks.join(PARAGRAPH_SEPARATOR);
                prop_assert_eq!(paragraphs_of(&rejoined), paragraphs_of(&content));
            }

            #[test]
            fn multi_paragraph_chunks_respect_limit(content in document(), max_chars in 1usize..1000) {
                for chunk in split(&content, max_chars) {
                    let paras = paragraphs_of(&chunk);
                    if paras.len() > 1 {
                        let total: usize = paras.iter().map(|p| p.chars().count()).sum();
                        prop_assert!(total <= max_chars);
                    }
                }
            }

            #[test]
            fn no_empty_chunks(content in document(), max_chars in 0usize..500) {
                for chunk in split(&content, max_chars) {
                    prop_assert!(!chunk.trim().is_empty());
                }
            }
        }
    }
}
