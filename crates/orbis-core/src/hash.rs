// crates/orbis-core/src/hash.rs

use sha2::{Digest, Sha256};

/// Compute the content hash recorded on the ledger for an article body.
///
/// Returns `0x`-prefixed lowercase hex of SHA-256(body).
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(2 + digest.len() * 2);
    out.push_str("0x");
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello!"));
    }

    #[test]
    fn hash_has_expected_shape() {
        let h = content_hash("abc");
        assert!(h.starts_with("0x"));
        assert_eq!(h.len(), 66);
        // Known SHA-256 of "abc".
        assert_eq!(
            h,
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
