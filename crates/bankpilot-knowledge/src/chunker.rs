//! Splitting normalized text into bounded-size segments.
//!
//! Two policies: fixed-size sliding windows, or accumulating whole lines
//! until the limit so line-oriented documents are not cut mid-line. Both
//! are deterministic (chunk index feeds id derivation), never emit a
//! chunk over `max_len` characters, and drop whitespace-only output. A
//! single line that alone exceeds the limit is force-split.

/// Chunk boundary policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkPolicy {
    /// Fixed-size character windows.
    Fixed,
    /// Accumulate whole lines up to the limit.
    #[default]
    LineAware,
}

/// Split `text` into ordered, non-empty chunks of at most `max_len` chars.
pub fn split_chunks(text: &str, max_len: usize, policy: ChunkPolicy) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }
    let chunks = match policy {
        ChunkPolicy::Fixed => split_fixed(text, max_len),
        ChunkPolicy::LineAware => split_line_aware(text, max_len),
    };
    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Sliding char windows. Counts characters, not bytes, so multi-byte
/// input never splits inside a code point.
fn split_fixed(text: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

fn split_line_aware(text: &str, max_len: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for line in text.lines() {
        let line_chars = line.chars().count();

        if line_chars > max_len {
            // Oversized line: flush what we have, then hard-split it.
            if buf_chars > 0 {
                out.push(std::mem::take(&mut buf));
                buf_chars = 0;
            }
            out.extend(split_fixed(line, max_len));
            continue;
        }

        // +1 for the joining space when the buffer is non-empty.
        let needed = if buf_chars == 0 { line_chars } else { line_chars + 1 };
        if buf_chars + needed > max_len {
            out.push(std::mem::take(&mut buf));
            buf_chars = 0;
        }
        if buf_chars > 0 {
            buf.push(' ');
            buf_chars += 1;
        }
        buf.push_str(line);
        buf_chars += line_chars;
    }

    if buf_chars > 0 {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn test_fixed_windows_cover_input() {
        let text = "abcdefghij";
        let chunks = split_chunks(text, 3, ChunkPolicy::Fixed);
        assert_eq!(chunks, vec!["abc", "def", "ghi", "j"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_fixed_respects_max_len_on_multibyte() {
        let text = "áéíóú".repeat(10);
        for chunk in split_chunks(&text, 7, ChunkPolicy::Fixed) {
            assert!(char_len(&chunk) <= 7);
        }
    }

    #[test]
    fn test_line_aware_keeps_lines_whole() {
        let text = "first line\nsecond line\nthird";
        let chunks = split_chunks(text, 24, ChunkPolicy::LineAware);
        assert_eq!(chunks, vec!["first line second line", "third"]);
    }

    #[test]
    fn test_line_aware_never_exceeds_max() {
        let text = (0..50).map(|i| format!("line number {i}")).collect::<Vec<_>>().join("\n");
        for chunk in split_chunks(&text, 40, ChunkPolicy::LineAware) {
            assert!(char_len(&chunk) <= 40, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn test_line_aware_force_splits_oversized_line() {
        let text = format!("short\n{}\ntail", "x".repeat(25));
        let chunks = split_chunks(&text, 10, ChunkPolicy::LineAware);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 10);
        }
        // Every character of the long line survives across chunks.
        let joined = chunks.concat();
        assert_eq!(joined.matches('x').count(), 25);
        assert!(joined.contains("short"));
        assert!(joined.contains("tail"));
    }

    #[test]
    fn test_whitespace_only_chunks_dropped() {
        assert!(split_chunks("   \n\t\n  ", 10, ChunkPolicy::LineAware).is_empty());
        assert!(split_chunks("", 10, ChunkPolicy::Fixed).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "alpha\nbeta\ngamma\ndelta";
        let a = split_chunks(text, 12, ChunkPolicy::LineAware);
        let b = split_chunks(text, 12, ChunkPolicy::LineAware);
        assert_eq!(a, b);
    }

    #[test]
    fn test_coverage_ignoring_whitespace() {
        // Concatenating chunks reconstructs the input up to whitespace
        // normalization: no character range is omitted.
        let text = "one two\nthree four\nfive six seven eight\nnine";
        let chunks = split_chunks(text, 15, ChunkPolicy::LineAware);
        let rebuilt: String = chunks.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
        let original: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_zero_max_len_yields_nothing() {
        assert!(split_chunks("abc", 0, ChunkPolicy::Fixed).is_empty());
    }
}
