//! Strong type definitions for the Tally ledger.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::PublicKey;

/// A token amount. Balances and the supply counter are fixed-width, so
/// additions can overflow and must be checked.
pub type Amount = u64;

/// A 32-byte account identifier.
///
/// Account identifiers are opaque to the ledger: any 32 bytes name an
/// account. The external identity layer derives them from Ed25519 keys via
/// [`AccountId::from_public_key`]. The all-zero value is reserved as the
/// null account and is never a valid mint or transfer destination.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The null account (reserved, invalid destination).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an AccountId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive an account identifier from an Ed25519 public key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"tally-account-v0:");
        hasher.update(&key.0);
        Self(*hasher.finalize().as_bytes())
    }

    /// Whether this is the null account.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for AccountId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A 32-byte journal record identifier, computed as
/// Blake3(canonical_record_bytes(record)).
///
/// This is the content-address of a record: two records with identical
/// content have the same EventId on every platform.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub [u8; 32]);

impl EventId {
    /// Create an EventId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for EventId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for EventId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for EventId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn test_account_id_hex_roundtrip() {
        let id = AccountId::from_bytes([0x42; 32]);
        let hex = id.to_hex();
        let recovered = AccountId::from_hex(&hex).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_account_id_from_public_key_deterministic() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let a1 = AccountId::from_public_key(&keypair.public_key());
        let a2 = AccountId::from_public_key(&keypair.public_key());
        assert_eq!(a1, a2);

        let other = Keypair::from_seed(&[0x43; 32]);
        let a3 = AccountId::from_public_key(&other.public_key());
        assert_ne!(a1, a3);
    }

    #[test]
    fn test_null_account() {
        assert!(AccountId::ZERO.is_zero());
        assert!(!AccountId::from_bytes([1; 32]).is_zero());

        // Derived accounts never collide with the null account
        let keypair = Keypair::generate();
        assert!(!AccountId::from_public_key(&keypair.public_key()).is_zero());
    }

    #[test]
    fn test_event_id_display() {
        let id = EventId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
        assert!(format!("{:?}", id).starts_with("EventId("));
    }
}
