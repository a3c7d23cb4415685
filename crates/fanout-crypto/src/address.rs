//! Base58 ledger addresses.
//!
//! An address is the base58 encoding of a 32-byte public key. Validation
//! only checks the encoding and length: program-derived addresses are
//! valid recipients even though they are not on the curve.

use fanout_types::Address;

use crate::{CryptoError, Result};

/// Length in bytes of a decoded address.
pub const ADDRESS_LEN: usize = 32;

/// Decode an address into its 32 public key bytes.
///
/// # Errors
///
/// - [`CryptoError::Base58`] if the string is not valid base58
/// - [`CryptoError::InvalidKeyLength`] if it does not decode to 32 bytes
pub fn decode(address: &Address) -> Result<[u8; ADDRESS_LEN]> {
    let bytes = bs58::decode(address.as_str())
        .into_vec()
        .map_err(|e| CryptoError::Base58(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: ADDRESS_LEN,
            actual,
        })
}

/// Encode 32 public key bytes as an address.
pub fn encode(bytes: &[u8; ADDRESS_LEN]) -> Address {
    Address::from(bs58::encode(bytes).into_string())
}

/// Check that an address decodes to a 32-byte key.
pub fn validate(address: &Address) -> Result<()> {
    decode(address).map(|_| ())
}
