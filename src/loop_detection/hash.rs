//! Input fingerprinting for execution steps.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Length of the hex fingerprint produced by [`hash_input`].
pub const INPUT_HASH_LEN: usize = 16;

/// Deterministic short fingerprint of a step's input.
///
/// Object keys serialize in sorted order, so equal inputs hash equally
/// regardless of how they were built.
#[must_use]
pub fn hash_input(input: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.to_string().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..INPUT_HASH_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::{hash_input, INPUT_HASH_LEN};
    use serde_json::json;

    #[test]
    fn fixed_length_hex() {
        let hash = hash_input(&json!({"query": "rust"}));
        assert_eq!(hash.len(), INPUT_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_order_does_not_matter() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": 2}"#).expect("valid json");
        let b: serde_json::Value =
            serde_json::from_str(r#"{"b": 2, "a": 1}"#).expect("valid json");
        assert_eq!(hash_input(&a), hash_input(&b));
    }

    #[test]
    fn different_inputs_differ() {
        assert_ne!(hash_input(&json!({"a": 1})), hash_input(&json!({"a": 2})));
    }
}
