//! Ed25519 wallet keys and transfer-set signatures (RFC 8032).
//!
//! A signer's address is the base58 encoding of its verifying key, and
//! every transfer set is signed by the distributing wallet. Wallet secrets
//! travel in the 64-byte `secret || public` layout.
//!
//! The secret key is held by `ed25519-dalek`, which zeroizes it on drop.

use ed25519_dalek::{Signer, Verifier};
use fanout_types::Address;

use crate::{CryptoError, Result};

/// Length of a secret key followed by its public key.
pub const KEYPAIR_LEN: usize = 64;

/// Length of an encoded signature.
pub const SIGNATURE_LEN: usize = 64;

/// The public half of a wallet key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

/// A signature over a transfer-set digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

/// A distributing wallet's keypair.
#[derive(Clone)]
pub struct KeyPair {
    secret: ed25519_dalek::SigningKey,
    pub verifying_key: VerifyingKey,
}

impl VerifyingKey {
    /// The ledger address of this key.
    pub fn to_address(&self) -> Address {
        crate::address::encode(self.inner.as_bytes())
    }

    /// Check `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.inner
            .verify(message, &signature.inner)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    /// Base58 encoding, the form the ledger reports signatures in.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.inner.to_bytes()).into_string()
    }

    /// Parse a base58-encoded signature.
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CryptoError::Base58(e.to_string()))?;
        let actual = bytes.len();
        let bytes: [u8; SIGNATURE_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SIGNATURE_LEN,
                actual,
            })?;
        Ok(Self {
            inner: ed25519_dalek::Signature::from_bytes(&bytes),
        })
    }
}

impl KeyPair {
    fn from_secret(secret: ed25519_dalek::SigningKey) -> Self {
        let verifying_key = VerifyingKey {
            inner: secret.verifying_key(),
        };
        Self {
            secret,
            verifying_key,
        }
    }

    /// A fresh random wallet key.
    pub fn generate() -> Self {
        Self::from_secret(ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Derive the keypair from a bare 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_secret(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Parse the 64-byte `secret || public` wallet layout.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::KeypairMismatch`] if the public half does not
    ///   belong to the secret half
    pub fn from_keypair_bytes(bytes: &[u8; KEYPAIR_LEN]) -> Result<Self> {
        ed25519_dalek::SigningKey::from_keypair_bytes(bytes)
            .map(Self::from_secret)
            .map_err(|_| CryptoError::KeypairMismatch)
    }

    /// Export in the 64-byte `secret || public` wallet layout.
    pub fn to_keypair_bytes(&self) -> [u8; KEYPAIR_LEN] {
        self.secret.to_keypair_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.secret.sign(message),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.verifying_key.to_address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_bytes(kp: &KeyPair) -> [u8; 32] {
        crate::address::decode(&kp.verifying_key.to_address()).expect("decode")
    }

    #[test]
    fn test_signature_verifies_only_under_its_key() {
        let signer = KeyPair::generate();
        let other = KeyPair::generate();
        let sig = signer.sign(b"fanout transfer set");
        assert!(signer.verifying_key.verify(b"fanout transfer set", &sig).is_ok());
        assert!(signer.verifying_key.verify(b"tampered", &sig).is_err());
        assert!(matches!(
            other.verifying_key.verify(b"fanout transfer set", &sig),
            Err(CryptoError::SignatureVerification)
        ));
    }

    #[test]
    fn test_wallet_layout_restores_same_key() {
        let kp = KeyPair::generate();
        let restored = KeyPair::from_keypair_bytes(&kp.to_keypair_bytes()).expect("valid keypair");
        assert_eq!(kp.verifying_key, restored.verifying_key);
    }

    #[test]
    fn test_mismatched_public_half_rejected() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let mut bytes = kp.to_keypair_bytes();
        bytes[32..].copy_from_slice(&public_bytes(&other));
        assert!(matches!(
            KeyPair::from_keypair_bytes(&bytes),
            Err(CryptoError::KeypairMismatch)
        ));
    }

    #[test]
    fn test_rfc8032_vector_one() {
        let seed = hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
            .expect("valid hex");
        let seed: [u8; 32] = seed.try_into().expect("32 bytes");
        let kp = KeyPair::from_seed(&seed);

        assert_eq!(
            hex::encode(public_bytes(&kp)),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
        let sig = kp.sign(b"");
        assert_eq!(
            hex::encode(bs58::decode(sig.to_base58()).into_vec().expect("base58")),
            "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e06522490155\
             5fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
        );
    }

    #[test]
    fn test_signature_base58_length_checked() {
        let short = bs58::encode([3u8; 32]).into_string();
        assert!(matches!(
            Signature::from_base58(&short),
            Err(CryptoError::InvalidKeyLength { expected: 64, actual: 32 })
        ));
        assert!(matches!(
            Signature::from_base58("0OIl"),
            Err(CryptoError::Base58(_))
        ));
    }

    #[test]
    fn test_debug_shows_address_only() {
        let kp = KeyPair::from_seed(&[5u8; 32]);
        let debug = format!("{kp:?}");
        assert!(debug.contains(kp.verifying_key.to_address().as_str()));
    }
}
