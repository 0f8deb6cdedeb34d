use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A token-bounded slice of a source file.
///
/// Offsets and lines describe the chunk's base range in the original file
/// and never include overlap. `content` and `token_count` do include any
/// materialized overlap prefix/suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier: `{path}:{index}:{hash12}`.
    pub id: String,
    pub source_file_path: String,
    pub content: String,
    pub token_count: usize,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
    /// Byte offset into the source file, overlap excluded.
    pub start_offset: usize,
    /// Exclusive byte offset, overlap excluded.
    pub end_offset: usize,
    /// Position of this chunk within its file, starting at 0.
    pub chunk_index: usize,
    pub overlap_prefix_tokens: usize,
    pub overlap_suffix_tokens: usize,
}

impl Chunk {
    /// Token count of the base range, overlap excluded.
    #[must_use]
    pub const fn base_token_count(&self) -> usize {
        self.token_count - self.overlap_prefix_tokens - self.overlap_suffix_tokens
    }

    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.end_offset - self.start_offset
    }

    #[must_use]
    pub const fn has_overlap(&self) -> bool {
        self.overlap_prefix_tokens > 0 || self.overlap_suffix_tokens > 0
    }
}

/// Stable chunk id derived from path, position, and base content.
///
/// Identical content at the same position yields the identical id across
/// runs, which lets downstream stores skip unchanged chunks.
#[must_use]
pub fn stable_chunk_id(path: &str, chunk_index: usize, base_content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_content.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(12);
    for byte in digest.iter().take(6) {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    format!("{path}:{chunk_index}:{hex}")
}

/// Split an id back into `(path, chunk_index)`. Paths may themselves
/// contain colons, so parsing is right-to-left.
#[must_use]
pub fn parse_chunk_id(id: &str) -> Option<(&str, usize)> {
    let mut parts = id.rsplitn(3, ':');
    let _hash = parts.next()?;
    let index = parts.next()?.parse().ok()?;
    let path = parts.next()?;
    Some((path, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stable_id_is_deterministic() {
        let a = stable_chunk_id("src/lib.rs", 2, "fn main() {}");
        let b = stable_chunk_id("src/lib.rs", 2, "fn main() {}");
        assert_eq!(a, b);
    }

    #[test]
    fn stable_id_changes_with_content() {
        let a = stable_chunk_id("src/lib.rs", 0, "alpha");
        let b = stable_chunk_id("src/lib.rs", 0, "beta");
        assert_ne!(a, b);
    }

    #[test]
    fn id_round_trips_through_parse() {
        let id = stable_chunk_id("C:/work/app/main.cpp", 7, "void init() {}");
        let (path, index) = parse_chunk_id(&id).unwrap();
        assert_eq!(path, "C:/work/app/main.cpp");
        assert_eq!(index, 7);
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert_eq!(parse_chunk_id("no-separators"), None);
        assert_eq!(parse_chunk_id("path:not-a-number:abcdef012345"), None);
    }

    #[test]
    fn base_token_count_excludes_overlap() {
        let chunk = Chunk {
            id: "x:0:aaaaaaaaaaaa".into(),
            source_file_path: "x".into(),
            content: "body".into(),
            token_count: 550,
            start_line: 1,
            end_line: 10,
            start_offset: 0,
            end_offset: 100,
            chunk_index: 0,
            overlap_prefix_tokens: 25,
            overlap_suffix_tokens: 25,
        };
        assert_eq!(chunk.base_token_count(), 500);
        assert!(chunk.has_overlap());
    }
}
