//! Signing credentials for a distributing wallet.
//!
//! Wallet secrets are exchanged as base58 strings of the 64-byte
//! `secret || public` keypair. A bare 32-byte secret seed is accepted too.

use fanout_types::Address;
use zeroize::Zeroize;

use crate::ed25519::{KeyPair, Signature, KEYPAIR_LEN};
use crate::{CryptoError, Result};

/// A decoded signing identity and its ledger address.
#[derive(Clone)]
pub struct Credentials {
    keypair: KeyPair,
    address: Address,
}

impl Credentials {
    /// Decode credentials from a base58 secret.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::Base58`] if the input is not base58
    /// - [`CryptoError::InvalidKeyLength`] if it is neither 64 nor 32 bytes
    /// - [`CryptoError::KeypairMismatch`] if a 64-byte keypair is inconsistent
    pub fn from_base58(secret: &str) -> Result<Self> {
        let mut bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| CryptoError::Base58(e.to_string()))?;

        let keypair = match bytes.len() {
            KEYPAIR_LEN => {
                let mut raw = [0u8; KEYPAIR_LEN];
                raw.copy_from_slice(&bytes);
                let result = KeyPair::from_keypair_bytes(&raw);
                raw.zeroize();
                result
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                let kp = KeyPair::from_seed(&seed);
                seed.zeroize();
                Ok(kp)
            }
            actual => Err(CryptoError::InvalidKeyLength {
                expected: KEYPAIR_LEN,
                actual,
            }),
        };
        bytes.zeroize();

        Ok(Self::from_keypair(keypair?))
    }

    /// Wrap an existing keypair.
    pub fn from_keypair(keypair: KeyPair) -> Self {
        let address = keypair.verifying_key.to_address();
        Self { keypair, address }
    }

    /// Generate fresh random credentials.
    pub fn generate() -> Self {
        Self::from_keypair(KeyPair::generate())
    }

    /// The signer's ledger address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Sign a message with the wallet key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }

    /// Base58 export of the 64-byte keypair.
    pub fn to_base58(&self) -> String {
        let mut raw = self.keypair.to_keypair_bytes();
        let encoded = bs58::encode(&raw).into_string();
        raw.zeroize();
        encoded
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
