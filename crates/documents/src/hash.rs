use sha2::{Digest, Sha256};

/// SHA-256 of the trimmed text as lowercase hex.
///
/// Used purely for equality: unchanged content hashes identically, any
/// one-character edit does not. Leading/trailing whitespace is ignored so
/// editor-added trailing newlines do not count as changes.
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(content_hash("fn main() {}"), content_hash("fn main() {}"));
    }

    #[test]
    fn hash_ignores_surrounding_whitespace() {
        assert_eq!(content_hash("body"), content_hash("\n  body \n"));
    }

    #[test]
    fn single_character_edit_changes_hash() {
        assert_ne!(content_hash("let x = 1;"), content_hash("let x = 2;"));
    }

    #[test]
    fn hash_is_lowercase_hex() {
        let h = content_hash("abc");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
