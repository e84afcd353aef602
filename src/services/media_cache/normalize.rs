use sha2::{Digest, Sha256};

/// Whitespace-insensitive form of a text used for cache keys. Case and
/// punctuation are kept: they change what the speech engine says.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn hash_norm(norm: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(norm.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn text_hash(text: &str) -> String {
    hash_norm(&normalize(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_does_not_change_the_key() {
        assert_eq!(text_hash("  A rapid\trise. "), text_hash("A rapid rise."));
        assert_ne!(text_hash("A rapid rise."), text_hash("a rapid rise."));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = text_hash("ubiquitous");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
