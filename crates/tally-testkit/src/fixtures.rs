//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use tally::{KernelConfig, LedgerKernel};
use tally_auth::{GrantPayload, SignedGrant};
use tally_core::{AccountId, EventRecord, Keypair, LedgerEvent, PublicKey};
use tally_store::MemoryStore;

/// A test fixture with a root authority keypair and account helpers.
pub struct TestFixture {
    pub root: Keypair,
}

impl TestFixture {
    /// Create a new test fixture with a random root keypair.
    pub fn new() -> Self {
        Self {
            root: Keypair::generate(),
        }
    }

    /// Create with a deterministic root keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            root: Keypair::from_seed(&seed),
        }
    }

    /// The root authority's public key.
    pub fn root_key(&self) -> PublicKey {
        self.root.public_key()
    }

    /// A deterministic account for index `n` (derived from a seeded key).
    pub fn account(&self, n: u8) -> AccountId {
        let mut seed = [0u8; 32];
        seed[0] = n;
        seed[1] = 0xac;
        AccountId::from_public_key(&Keypair::from_seed(&seed).public_key())
    }

    /// A deterministic principal keypair for index `n`.
    pub fn principal(&self, n: u8) -> Keypair {
        let mut seed = [0u8; 32];
        seed[0] = n;
        seed[1] = 0x99;
        Keypair::from_seed(&seed)
    }

    /// Open an ungated kernel over a fresh in-memory store.
    pub async fn kernel(&self) -> LedgerKernel<MemoryStore> {
        LedgerKernel::open(MemoryStore::new(), KernelConfig::default())
            .await
            .expect("open on empty store")
    }

    /// Open a kernel that enforces authority, rooted at this fixture.
    pub async fn gated_kernel(&self) -> LedgerKernel<MemoryStore> {
        let config = KernelConfig {
            enforce_authority: true,
            authority_root: Some(self.root.public_key()),
            ..KernelConfig::default()
        };
        LedgerKernel::open(MemoryStore::new(), config)
            .await
            .expect("open on empty store")
    }

    /// A mint grant for `principal`, signed by the fixture root.
    pub fn mint_grant(&self, principal: PublicKey) -> SignedGrant {
        SignedGrant::sign(GrantPayload::mint(principal), &self.root)
    }

    /// An operator grant for `principal`, signed by the fixture root.
    pub fn operator_grant(&self, principal: PublicKey) -> SignedGrant {
        SignedGrant::sign(GrantPayload::operator(principal), &self.root)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct deterministic accounts for multi-party tests.
pub fn multi_party_accounts(count: usize) -> Vec<AccountId> {
    let fixture = TestFixture::with_seed([0u8; 32]);
    (0..count).map(|i| fixture.account(i as u8 + 1)).collect()
}

/// A random account identifier.
pub fn random_account() -> AccountId {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    AccountId::from_bytes(bytes)
}

/// Build a hash-chained record sequence from events, with fixed timestamps.
///
/// The events are not validated against ledger state; this is for store
/// and codec tests that only care about journal structure.
pub fn make_chain(events: &[LedgerEvent]) -> Vec<EventRecord> {
    let mut records = Vec::with_capacity(events.len());
    let mut prev = None;

    for (i, event) in events.iter().enumerate() {
        let seq = i as u64 + 1;
        let record = EventRecord::new(seq, 1_736_870_400_000 + seq as i64, *event, prev);
        prev = Some(record.compute_id());
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_kernel_mints() {
        let fixture = TestFixture::with_seed([1; 32]);
        let kernel = fixture.kernel().await;
        let caller = fixture.principal(1).public_key();

        kernel.mint(&caller, fixture.account(1), 500).await.unwrap();
        assert_eq!(kernel.balance_of(&fixture.account(1)).await, 500);
    }

    #[tokio::test]
    async fn test_gated_kernel_accepts_fixture_grants() {
        let fixture = TestFixture::with_seed([1; 32]);
        let kernel = fixture.gated_kernel().await;
        let minter = fixture.principal(1);

        kernel
            .apply_grant(&fixture.mint_grant(minter.public_key()))
            .await
            .unwrap();

        kernel
            .mint(&minter.public_key(), fixture.account(1), 100)
            .await
            .unwrap();
        assert_eq!(kernel.total_supply().await, 100);
    }

    #[test]
    fn test_multi_party_accounts_distinct() {
        let accounts = multi_party_accounts(4);
        for (i, a) in accounts.iter().enumerate() {
            for b in accounts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
            assert!(!a.is_zero());
        }
    }

    #[test]
    fn test_make_chain_links_records() {
        let a = random_account();
        let b = random_account();
        let chain = make_chain(&[
            LedgerEvent::Mint {
                account: a,
                amount: 100,
            },
            LedgerEvent::Transfer {
                from: a,
                to: b,
                amount: 40,
            },
        ]);

        assert_eq!(chain[0].seq, 1);
        assert_eq!(chain[0].prev_event_id, None);
        assert_eq!(chain[1].prev_event_id, Some(chain[0].compute_id()));
    }
}
