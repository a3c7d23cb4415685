//! Domain-separated BLAKE3 digests.
//!
//! Transfer sets are signed over a digest rather than over their raw
//! encoding so that the signed message has a fixed size and cannot be
//! confused with any other signed payload.

/// Registered context strings.
pub mod contexts {
    pub const TRANSFER_SET_DIGEST: &str = "fanout v1 transfer-set-digest";
    pub const JOB_ID: &str = "fanout v1 schedule-job-id";
}

/// Derive a 32-byte value using BLAKE3's key derivation mode.
pub fn derive_key(context: &str, material: &[u8]) -> [u8; 32] {
    ::blake3::derive_key(context, material)
}

/// Length-prefixed concatenation of fields, so `("ab", "c")` and
/// `("a", "bc")` never encode identically.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total: usize = fields.iter().map(|f| 8 + f.len()).sum();
    let mut out = Vec::with_capacity(total);
    for field in fields {
        out.extend_from_slice(&(field.len() as u64).to_le_bytes());
        out.extend_from_slice(field);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_domain_separate() {
        let a = derive_key(contexts::TRANSFER_SET_DIGEST, b"x");
        let b = derive_key(contexts::JOB_ID, b"x");
        assert_ne!(a, b);
    }

    #[test]
    fn test_multi_field_unambiguous() {
        let a = encode_multi_field(&[b"ab", b"c"]);
        let b = encode_multi_field(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }
}
