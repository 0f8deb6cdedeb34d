use unicode_segmentation::UnicodeSegmentation;

/// A token's byte range within the source text.
///
/// Spans never split a Unicode codepoint; `index` is the token's position
/// in the file, counted from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

impl TokenSpan {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Splits text into ordered token spans for counting and positioning.
///
/// Deterministic for a fixed configuration: identical input always yields
/// an identical span sequence. Tokens are unicode word bounds with
/// whitespace-only segments skipped, so punctuation runs count as tokens
/// the way subword tokenizers roughly would.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer;

impl Tokenizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Tokenize text into ordered spans.
    ///
    /// Replacement characters from a lossy upstream decode tokenize like any
    /// other codepoint; degraded input never aborts the pipeline.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<TokenSpan> {
        let mut spans = Vec::new();
        for (offset, segment) in text.split_word_bound_indices() {
            if segment.chars().all(char::is_whitespace) {
                continue;
            }
            spans.push(TokenSpan {
                start: offset,
                end: offset + segment.len(),
                index: spans.len(),
            });
        }
        spans
    }

    /// Count tokens without materializing spans.
    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        text.split_word_bounds()
            .filter(|segment| !segment.chars().all(char::is_whitespace))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tokenize_is_deterministic() {
        let tokenizer = Tokenizer::new();
        let text = "fn main() { println!(\"hello\"); }";
        assert_eq!(tokenizer.tokenize(text), tokenizer.tokenize(text));
    }

    #[test]
    fn spans_are_ordered_and_indexed() {
        let tokenizer = Tokenizer::new();
        let spans = tokenizer.tokenize("alpha beta gamma");
        assert_eq!(spans.len(), 3);
        for (i, span) in spans.iter().enumerate() {
            assert_eq!(span.index, i);
            assert!(span.start < span.end);
        }
        assert!(spans.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn whitespace_only_yields_no_spans() {
        let tokenizer = Tokenizer::new();
        assert!(tokenizer.tokenize("   \n\t  ").is_empty());
        assert!(tokenizer.tokenize("").is_empty());
    }

    #[test]
    fn spans_respect_codepoint_boundaries() {
        let tokenizer = Tokenizer::new();
        let text = "héllo wörld 日本語";
        for span in tokenizer.tokenize(text) {
            // Slicing panics on a non-boundary index, so this is the check.
            let _ = &text[span.start..span.end];
        }
    }

    #[test]
    fn replacement_characters_tokenize() {
        let tokenizer = Tokenizer::new();
        let text = "data \u{FFFD}\u{FFFD} more";
        let spans = tokenizer.tokenize(text);
        assert!(spans.len() >= 3);
    }

    #[test]
    fn count_matches_tokenize_len() {
        let tokenizer = Tokenizer::new();
        let text = "int add(int a, int b) { return a + b; }";
        assert_eq!(tokenizer.count(text), tokenizer.tokenize(text).len());
    }
}
