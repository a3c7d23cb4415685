//! # fanout-crypto
//!
//! Key material and address handling for the distribution engine.
//!
//! ## Modules
//!
//! - [`address`] — Base58 ledger address encoding and validation
//! - [`blake3`] — Domain-separated BLAKE3 digests
//! - [`credentials`] — Signing credentials decoded from a base58 keypair
//! - [`ed25519`] — Ed25519 signing and verification

pub mod address;
pub mod blake3;
pub mod credentials;
pub mod ed25519;

pub use credentials::Credentials;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Base58 decoding failed.
    #[error("invalid base58: {0}")]
    Base58(String),

    /// The public half of a keypair does not match its secret half.
    #[error("keypair public key does not match secret key")]
    KeypairMismatch,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
