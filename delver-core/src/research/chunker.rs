//! Budgeted text chunking for learning extraction.
//!
//! Source pages can be far larger than a single completion request should
//! carry, so extraction works chunk by chunk. Chunks respect paragraph
//! boundaries where possible and fall back to sentence granularity for
//! oversized paragraphs. The budget is soft for unsplittable units: a
//! single sentence longer than the budget is emitted whole.

/// Approximate character-per-token ratio used to derive chunk budgets.
pub const CHARS_PER_TOKEN: usize = 4;

/// Splits text into chunks of at most `max_chars` characters.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    max_chars: usize,
}

impl TextChunker {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Budget expressed as a token allowance.
    pub fn for_token_allowance(max_tokens: usize) -> Self {
        Self::new(max_tokens * CHARS_PER_TOKEN)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Chunk `text`, preserving content order.
    ///
    /// Whitespace between units is normalized; the concatenated chunk
    /// contents reproduce the input's non-whitespace content exactly.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let normalized = text.replace("\r\n", "\n");
        let trimmed = normalized.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if char_len(trimmed) <= self.max_chars {
            return vec![trimmed.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for paragraph in trimmed.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            let paragraph_len = char_len(paragraph);
            if paragraph_len > self.max_chars {
                flush(&mut chunks, &mut current, &mut current_len);
                self.pack_sentences(paragraph, &mut chunks);
                continue;
            }

            let added = if current.is_empty() {
                paragraph_len
            } else {
                paragraph_len + 1
            };
            if current_len + added > self.max_chars {
                flush(&mut chunks, &mut current, &mut current_len);
            }
            if current.is_empty() {
                current.push_str(paragraph);
                current_len = paragraph_len;
            } else {
                current.push('\n');
                current.push_str(paragraph);
                current_len += paragraph_len + 1;
            }
        }
        flush(&mut chunks, &mut current, &mut current_len);
        chunks
    }

    /// Pack one oversized paragraph at sentence granularity.
    fn pack_sentences(&self, paragraph: &str, chunks: &mut Vec<String>) {
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in split_sentences(paragraph) {
            let sentence_len = char_len(&sentence);
            if sentence_len > self.max_chars {
                flush(chunks, &mut current, &mut current_len);
                chunks.push(sentence);
                continue;
            }

            let added = if current.is_empty() {
                sentence_len
            } else {
                sentence_len + 1
            };
            if current_len + added > self.max_chars {
                flush(chunks, &mut current, &mut current_len);
            }
            if current.is_empty() {
                current.push_str(&sentence);
                current_len = sentence_len;
            } else {
                current.push(' ');
                current.push_str(&sentence);
                current_len += sentence_len + 1;
            }
        }
        flush(chunks, &mut current, &mut current_len);
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn flush(chunks: &mut Vec<String>, current: &mut String, current_len: &mut usize) {
    if !current.is_empty() {
        chunks.push(std::mem::take(current));
        *current_len = 0;
    }
}

/// Split on sentence-ending punctuation followed by whitespace or end.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                let end = index + c.len_utf8();
                let sentence = paragraph[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                start = end;
            }
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_fast_path_returns_trimmed_input() {
        let chunker = TextChunker::new(100);
        let chunks = chunker.chunk("  A short passage about solar energy.  ");
        assert_eq!(chunks, vec!["A short passage about solar energy."]);
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunker = TextChunker::new(100);
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn test_token_allowance_scales_by_ratio() {
        let chunker = TextChunker::for_token_allowance(2000);
        assert_eq!(chunker.max_chars(), 8000);
    }

    #[test]
    fn test_paragraphs_pack_until_budget() {
        let first = "p".repeat(40);
        let second = "q".repeat(40);
        let text = format!("{first}\n\n{second}");

        let one = TextChunker::new(100).chunk(&text);
        assert_eq!(one.len(), 1);

        let two = TextChunker::new(60).chunk(&text);
        assert_eq!(two.len(), 2);
        assert_eq!(two[0], first);
        assert_eq!(two[1], second);
    }

    #[test]
    fn test_oversized_paragraph_splits_on_sentences() {
        let paragraph =
            "Solar capacity doubled. Storage costs fell sharply. Grid demand keeps rising. \
             Panel efficiency improved again. Subsidies vary by region.";
        let chunker = TextChunker::new(60);
        let chunks = chunker.chunk(paragraph);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 60, "chunk too long: {chunk:?}");
        }
        assert_eq!(
            strip_whitespace(&chunks.join(" ")),
            strip_whitespace(paragraph)
        );
    }

    #[test]
    fn test_single_giant_sentence_emitted_whole() {
        let sentence = format!("{}.", "x".repeat(200));
        let neighbor = "A normal sentence follows. Another one too.";
        let text = format!("{sentence} {neighbor}");

        let chunker = TextChunker::new(80);
        let chunks = chunker.chunk(&text);
        assert!(chunks.iter().any(|c| c.chars().count() > 80));
        assert!(chunks.contains(&sentence));
    }

    #[test]
    fn test_content_survives_chunking_in_order() {
        let text = "First paragraph sentence one. Sentence two here.\n\n\
                    Second paragraph with more words in it. It keeps going for a while.\n\n\
                    Third short one.";
        let chunker = TextChunker::new(50);
        let chunks = chunker.chunk(text);

        assert_eq!(
            strip_whitespace(&chunks.concat()),
            strip_whitespace(text)
        );
    }

    #[test]
    fn test_windows_line_endings_are_normalized() {
        let text = "First paragraph.\r\n\r\nSecond paragraph.";
        let chunker = TextChunker::new(20);
        let chunks = chunker.chunk(text);
        assert_eq!(chunks, vec!["First paragraph.", "Second paragraph."]);
    }
}
