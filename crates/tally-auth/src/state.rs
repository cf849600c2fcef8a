//! Authority state computation.
//!
//! Authority is computed by replaying grants and revocations. This module
//! maintains and queries that state; it never decides trust in issuers —
//! callers verify signatures and issuer identity before applying.

use std::collections::HashMap;

use tally_core::PublicKey;

use crate::error::{AuthError, Result};
use crate::grant::{Conditions, GrantId, GrantPayload, RevokePayload, Right};

/// State of a single grant.
#[derive(Debug, Clone)]
pub struct GrantStatus {
    /// Content address of the grant payload.
    pub grant_id: GrantId,

    /// Who issued the grant.
    pub issuer: PublicKey,

    /// Who received the right.
    pub principal: PublicKey,

    /// The right conferred.
    pub right: Right,

    /// Optional conditions.
    pub conditions: Option<Conditions>,

    /// When the grant was applied (Unix ms, local).
    pub granted_at: i64,

    /// Whether this grant has been revoked.
    pub revoked: bool,

    /// When it was revoked (if revoked).
    pub revoked_at: Option<i64>,

    /// Number of times this grant has authorized an operation.
    pub use_count: u32,
}

impl GrantStatus {
    /// Check if this grant is currently valid.
    pub fn is_valid(&self, now: i64) -> bool {
        if self.revoked {
            return false;
        }

        if let Some(ref conditions) = self.conditions {
            if !conditions.is_valid(now, self.use_count) {
                return false;
            }
        }

        true
    }

    /// Record a use of this grant.
    pub fn record_use(&mut self) {
        self.use_count += 1;
    }
}

/// Aggregated authority state.
///
/// Built by replaying grant and revoke payloads in application order.
#[derive(Debug, Default)]
pub struct AuthorityState {
    /// All grants indexed by grant ID.
    grants: HashMap<GrantId, GrantStatus>,

    /// Index: principal -> their grant IDs.
    by_principal: HashMap<PublicKey, Vec<GrantId>>,
}

impl AuthorityState {
    /// Create a new empty authority state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a grant to the state.
    ///
    /// Re-applying an identical grant is a no-op (grants are content
    /// addressed, so "the same grant twice" is one grant).
    pub fn apply_grant(&mut self, issuer: PublicKey, payload: GrantPayload, now: i64) -> GrantId {
        let grant_id = payload.grant_id();

        if self.grants.contains_key(&grant_id) {
            return grant_id;
        }

        let status = GrantStatus {
            grant_id,
            issuer,
            principal: payload.principal,
            right: payload.right,
            conditions: payload.conditions,
            granted_at: now,
            revoked: false,
            revoked_at: None,
            use_count: 0,
        };

        self.grants.insert(grant_id, status);
        self.by_principal
            .entry(payload.principal)
            .or_default()
            .push(grant_id);

        grant_id
    }

    /// Apply a revocation to the state.
    pub fn apply_revoke(&mut self, payload: &RevokePayload, now: i64) -> Result<()> {
        let grant = self
            .grants
            .get_mut(&payload.grant_id)
            .ok_or_else(|| AuthError::GrantNotFound(payload.grant_id.to_string()))?;

        grant.revoked = true;
        grant.revoked_at = Some(now);
        Ok(())
    }

    /// Check if a principal may mint right now.
    pub fn can_mint(&self, principal: &PublicKey, now: i64) -> bool {
        self.find_valid(principal, now, |r| r.allows_mint()).is_some()
    }

    /// Check if a principal may burn right now.
    pub fn can_burn(&self, principal: &PublicKey, now: i64) -> bool {
        self.find_valid(principal, now, |r| r.allows_burn()).is_some()
    }

    /// Authorize a mint, consuming one use of a valid grant.
    pub fn authorize_mint(&mut self, principal: &PublicKey, now: i64) -> Result<GrantId> {
        self.authorize(principal, now, |r| r.allows_mint(), "mint")
    }

    /// Authorize a burn, consuming one use of a valid grant.
    pub fn authorize_burn(&mut self, principal: &PublicKey, now: i64) -> Result<GrantId> {
        self.authorize(principal, now, |r| r.allows_burn(), "burn")
    }

    fn authorize(
        &mut self,
        principal: &PublicKey,
        now: i64,
        allows: impl Fn(Right) -> bool,
        what: &str,
    ) -> Result<GrantId> {
        let grant_id = self.find_valid(principal, now, allows).ok_or_else(|| {
            AuthError::PermissionDenied(format!("{} not granted to {:?}", what, principal))
        })?;

        if let Some(grant) = self.grants.get_mut(&grant_id) {
            grant.record_use();
        }

        Ok(grant_id)
    }

    fn find_valid(
        &self,
        principal: &PublicKey,
        now: i64,
        allows: impl Fn(Right) -> bool,
    ) -> Option<GrantId> {
        self.by_principal.get(principal).and_then(|ids| {
            ids.iter()
                .filter_map(|id| self.grants.get(id))
                .find(|g| allows(g.right) && g.is_valid(now))
                .map(|g| g.grant_id)
        })
    }

    /// Get a grant by ID.
    pub fn get_grant(&self, grant_id: &GrantId) -> Option<&GrantStatus> {
        self.grants.get(grant_id)
    }

    /// List all grants for a principal.
    pub fn grants_for(&self, principal: &PublicKey) -> Vec<&GrantStatus> {
        self.by_principal
            .get(principal)
            .map(|ids| ids.iter().filter_map(|id| self.grants.get(id)).collect())
            .unwrap_or_default()
    }

    /// List currently valid grants for a principal.
    pub fn valid_grants_for(&self, principal: &PublicKey, now: i64) -> Vec<&GrantStatus> {
        self.grants_for(principal)
            .into_iter()
            .filter(|g| g.is_valid(now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Keypair;

    fn principals() -> (PublicKey, PublicKey) {
        (
            Keypair::from_seed(&[0x01; 32]).public_key(),
            Keypair::from_seed(&[0x02; 32]).public_key(),
        )
    }

    #[test]
    fn test_grant_and_check() {
        let (root, minter) = principals();
        let mut state = AuthorityState::new();

        state.apply_grant(root, GrantPayload::mint(minter), 1000);

        assert!(state.can_mint(&minter, 1000));
        assert!(!state.can_burn(&minter, 1000));
        assert!(!state.can_mint(&root, 1000));
    }

    #[test]
    fn test_operator_implies_both() {
        let (root, operator) = principals();
        let mut state = AuthorityState::new();

        state.apply_grant(root, GrantPayload::operator(operator), 1000);

        assert!(state.can_mint(&operator, 1000));
        assert!(state.can_burn(&operator, 1000));
    }

    #[test]
    fn test_revoke_removes_capability() {
        let (root, minter) = principals();
        let mut state = AuthorityState::new();

        let grant_id = state.apply_grant(root, GrantPayload::mint(minter), 1000);
        assert!(state.can_mint(&minter, 1001));

        state
            .apply_revoke(&RevokePayload::new(grant_id), 1002)
            .unwrap();
        assert!(!state.can_mint(&minter, 1003));
    }

    #[test]
    fn test_revoke_unknown_grant() {
        let mut state = AuthorityState::new();
        let missing = GrantId::from_bytes([0xaa; 32]);

        let err = state.apply_revoke(&RevokePayload::new(missing), 0).unwrap_err();
        assert!(matches!(err, AuthError::GrantNotFound(_)));
    }

    #[test]
    fn test_expired_grant() {
        let (root, minter) = principals();
        let mut state = AuthorityState::new();

        state.apply_grant(
            root,
            GrantPayload::mint(minter).with_conditions(Conditions::expires_at(2000)),
            1000,
        );

        assert!(state.can_mint(&minter, 1500));
        assert!(!state.can_mint(&minter, 2500));
    }

    #[test]
    fn test_use_limit_consumed_by_authorize() {
        let (root, minter) = principals();
        let mut state = AuthorityState::new();

        state.apply_grant(
            root,
            GrantPayload::mint(minter).with_conditions(Conditions::max_uses(2)),
            1000,
        );

        state.authorize_mint(&minter, 1001).unwrap();
        state.authorize_mint(&minter, 1002).unwrap();

        let err = state.authorize_mint(&minter, 1003).unwrap_err();
        assert!(matches!(err, AuthError::PermissionDenied(_)));
    }

    #[test]
    fn test_reapplied_grant_is_one_grant() {
        let (root, minter) = principals();
        let mut state = AuthorityState::new();

        let id1 = state.apply_grant(root, GrantPayload::mint(minter), 1000);
        let id2 = state.apply_grant(root, GrantPayload::mint(minter), 2000);

        assert_eq!(id1, id2);
        assert_eq!(state.grants_for(&minter).len(), 1);
    }

    #[test]
    fn test_falls_back_to_second_valid_grant() {
        let (root, minter) = principals();
        let mut state = AuthorityState::new();

        let limited = state.apply_grant(
            root,
            GrantPayload::mint(minter).with_conditions(Conditions::max_uses(1)),
            1000,
        );
        state.apply_grant(root, GrantPayload::operator(minter), 1000);

        state.authorize_mint(&minter, 1001).unwrap();
        state.authorize_mint(&minter, 1002).unwrap();
        state.authorize_mint(&minter, 1003).unwrap();

        // The limited grant stopped at one use; the operator grant carried on
        assert_eq!(state.get_grant(&limited).unwrap().use_count, 1);
        assert_eq!(state.valid_grants_for(&minter, 1004).len(), 1);
    }
}
