//! Grant and Revoke payloads.
//!
//! A grant gives a principal the right to change supply. Grants are signed
//! by the ledger's root authority and identified by the Blake3 hash of
//! their payload bytes, so a revocation can name exactly the grant it
//! withdraws.

use serde::{Deserialize, Serialize};
use std::fmt;

use tally_core::{Blake3Hash, Keypair, PublicKey, Signature};

use crate::error::{AuthError, Result};

/// Domain prefix for grant signatures.
const GRANT_SIGN_DOMAIN: &[u8] = b"tally-grant-v0:";

/// Domain prefix for revocation signatures.
const REVOKE_SIGN_DOMAIN: &[u8] = b"tally-revoke-v0:";

/// A 32-byte grant identifier: Blake3 of the grant payload bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(pub [u8; 32]);

impl GrantId {
    /// Create from raw bytes.
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
}

impl fmt::Debug for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GrantId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// The right a grant confers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Right {
    /// May create new supply.
    Mint,
    /// May destroy existing supply.
    Burn,
    /// May do both.
    Operator,
}

impl Right {
    /// Whether this right covers minting.
    pub fn allows_mint(self) -> bool {
        matches!(self, Right::Mint | Right::Operator)
    }

    /// Whether this right covers burning.
    pub fn allows_burn(self) -> bool {
        matches!(self, Right::Burn | Right::Operator)
    }
}

/// Conditions that may limit a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    /// When the grant expires (Unix milliseconds).
    pub expires_at: Option<i64>,

    /// Maximum number of uses allowed.
    pub max_uses: Option<u32>,
}

impl Conditions {
    /// Create conditions with an expiration time.
    pub fn expires_at(timestamp: i64) -> Self {
        Self {
            expires_at: Some(timestamp),
            max_uses: None,
        }
    }

    /// Create conditions with a usage limit.
    pub fn max_uses(count: u32) -> Self {
        Self {
            expires_at: None,
            max_uses: Some(count),
        }
    }

    /// Check if these conditions are still satisfied.
    pub fn is_valid(&self, now: i64, uses: u32) -> bool {
        if let Some(expires) = self.expires_at {
            if now > expires {
                return false;
            }
        }

        if let Some(max) = self.max_uses {
            if uses >= max {
                return false;
            }
        }

        true
    }
}

/// Payload of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPayload {
    /// The principal receiving the right.
    pub principal: PublicKey,

    /// The right being granted.
    pub right: Right,

    /// Optional conditions on the grant.
    pub conditions: Option<Conditions>,
}

impl GrantPayload {
    /// Grant mint rights to a principal.
    pub fn mint(principal: PublicKey) -> Self {
        Self {
            principal,
            right: Right::Mint,
            conditions: None,
        }
    }

    /// Grant burn rights to a principal.
    pub fn burn(principal: PublicKey) -> Self {
        Self {
            principal,
            right: Right::Burn,
            conditions: None,
        }
    }

    /// Grant both rights to a principal.
    pub fn operator(principal: PublicKey) -> Self {
        Self {
            principal,
            right: Right::Operator,
            conditions: None,
        }
    }

    /// Add conditions to this grant.
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| AuthError::Serialization(e.to_string()))
    }

    /// The content address of this grant.
    pub fn grant_id(&self) -> GrantId {
        GrantId(Blake3Hash::hash(&self.to_bytes()).0)
    }
}

/// Payload of a revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokePayload {
    /// The grant being revoked.
    pub grant_id: GrantId,

    /// Optional reason for revocation.
    pub reason: Option<String>,
}

impl RevokePayload {
    /// Create a new revocation.
    pub fn new(grant_id: GrantId) -> Self {
        Self {
            grant_id,
            reason: None,
        }
    }

    /// Add a reason for the revocation.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| AuthError::Serialization(e.to_string()))
    }
}

/// A grant signed by its issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedGrant {
    /// The grant payload.
    pub payload: GrantPayload,

    /// Who issued the grant.
    pub issuer: PublicKey,

    /// Ed25519 signature over (domain || payload bytes).
    pub signature: Signature,
}

impl SignedGrant {
    /// Sign a grant payload.
    pub fn sign(payload: GrantPayload, issuer: &Keypair) -> Self {
        let message = signed_message(GRANT_SIGN_DOMAIN, &payload.to_bytes());
        let signature = issuer.sign(&message);
        Self {
            payload,
            issuer: issuer.public_key(),
            signature,
        }
    }

    /// Verify the signature against the embedded issuer key.
    pub fn verify(&self) -> Result<()> {
        let message = signed_message(GRANT_SIGN_DOMAIN, &self.payload.to_bytes());
        self.issuer.verify(&message, &self.signature)?;
        Ok(())
    }

    /// The content address of the signed grant's payload.
    pub fn grant_id(&self) -> GrantId {
        self.payload.grant_id()
    }
}

/// A revocation signed by its issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRevoke {
    /// The revocation payload.
    pub payload: RevokePayload,

    /// Who issued the revocation.
    pub issuer: PublicKey,

    /// Ed25519 signature over (domain || payload bytes).
    pub signature: Signature,
}

impl SignedRevoke {
    /// Sign a revocation payload.
    pub fn sign(payload: RevokePayload, issuer: &Keypair) -> Self {
        let message = signed_message(REVOKE_SIGN_DOMAIN, &payload.to_bytes());
        let signature = issuer.sign(&message);
        Self {
            payload,
            issuer: issuer.public_key(),
            signature,
        }
    }

    /// Verify the signature against the embedded issuer key.
    pub fn verify(&self) -> Result<()> {
        let message = signed_message(REVOKE_SIGN_DOMAIN, &self.payload.to_bytes());
        self.issuer.verify(&message, &self.signature)?;
        Ok(())
    }
}

fn signed_message(domain: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(domain.len() + payload.len());
    message.extend_from_slice(domain);
    message.extend_from_slice(payload);
    message
}
