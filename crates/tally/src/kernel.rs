//! The Kernel: unified API for the Tally ledger.
//!
//! The Kernel brings together the balance state machine, the journal, and
//! the supply authority into a cohesive interface for embedding
//! applications. It is the only writer of ledger state: mutating
//! operations are serialized behind a write lock, and each one commits as
//! exactly one journal record before the new state becomes visible.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use tally_auth::{AuthError, AuthorityState, GrantId, SignedGrant, SignedRevoke};
use tally_core::{
    canonical_record_bytes, validate_succession, AccountId, Amount, EventId, EventRecord, Ledger,
    LedgerEvent, PublicKey,
};
use tally_store::{AppendResult, Snapshot, Store};

use crate::error::{KernelError, Result};

/// Configuration for the Kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Whether mint/burn callers must hold a valid grant.
    ///
    /// When false the kernel assumes the embedding layer has already
    /// decided the caller is permitted.
    pub enforce_authority: bool,

    /// The only principal trusted to issue grants and revocations.
    ///
    /// When `None`, any self-consistent signed grant is accepted.
    pub authority_root: Option<PublicKey>,

    /// Persist a snapshot every N committed records (None = never).
    pub snapshot_every: Option<u64>,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            enforce_authority: false,
            authority_root: None,
            snapshot_every: None,
            event_channel_capacity: 256,
        }
    }
}

/// The committed ledger state plus the journal head it corresponds to.
struct KernelState {
    ledger: Ledger,
    head_seq: u64,
    head_event_id: Option<EventId>,
}

impl KernelState {
    fn head(&self) -> Option<(u64, EventId)> {
        self.head_event_id.map(|id| (self.head_seq, id))
    }
}

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Minting, burning, and transferring balances
/// - Querying balances, supply, and journal records
/// - Applying signed authority grants and revocations
/// - Subscribing to committed event records
pub struct LedgerKernel<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: KernelConfig,
    /// Committed state; the write lock serializes mutating operations.
    state: RwLock<KernelState>,
    /// Authority state (computed from applied grants).
    authority: RwLock<AuthorityState>,
    /// Broadcast of committed records to subscribers.
    events_tx: broadcast::Sender<EventRecord>,
}

impl<S: Store> LedgerKernel<S> {
    /// Open a kernel over a store, rebuilding state from the journal.
    ///
    /// Loads the latest snapshot (if any) and replays every record after
    /// it through the core state machine, validating succession along the
    /// way. An empty store yields an empty ledger.
    pub async fn open(store: S, config: KernelConfig) -> Result<Self> {
        let store = Arc::new(store);

        let (mut ledger, mut head_seq, mut head_event_id) =
            match store.load_snapshot().await? {
                Some(snapshot) => {
                    let ledger = Ledger::from_balances(snapshot.balances.iter().copied());
                    if ledger.total_supply() != snapshot.total_supply {
                        return Err(KernelError::Corrupt(format!(
                            "snapshot supply {} does not match balance sum {}",
                            snapshot.total_supply,
                            ledger.total_supply()
                        )));
                    }

                    let head_id = if snapshot.at_seq > 0 {
                        let record = store
                            .get_event_at(snapshot.at_seq)
                            .await?
                            .ok_or_else(|| {
                                KernelError::Corrupt(format!(
                                    "snapshot at seq {} but journal has no such record",
                                    snapshot.at_seq
                                ))
                            })?;
                        Some(record.compute_id())
                    } else {
                        None
                    };

                    (ledger, snapshot.at_seq, head_id)
                }
                None => (Ledger::new(), 0, None),
            };

        let mut replayed = 0u64;
        if let Some((last_seq, _)) = store.head().await? {
            for record in store.get_events_range(head_seq + 1, last_seq).await? {
                let head = head_event_id.map(|id| (head_seq, id));
                validate_succession(head, &record)?;
                ledger.apply(&record.event)?;
                head_seq = record.seq;
                head_event_id = Some(record.compute_id());
                replayed += 1;
            }

            if head_seq != last_seq {
                return Err(KernelError::Corrupt(format!(
                    "journal head is {} but replay stopped at {}",
                    last_seq, head_seq
                )));
            }
        }

        info!(
            head_seq,
            replayed,
            total_supply = ledger.total_supply(),
            "ledger kernel opened"
        );

        let (events_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));

        Ok(Self {
            store,
            config,
            state: RwLock::new(KernelState {
                ledger,
                head_seq,
                head_event_id,
            }),
            authority: RwLock::new(AuthorityState::new()),
            events_tx,
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// The current balance of `account`, or 0 if never credited.
    pub async fn balance_of(&self, account: &AccountId) -> Amount {
        self.state.read().await.ledger.balance_of(account)
    }

    /// The current total supply.
    pub async fn total_supply(&self) -> Amount {
        self.state.read().await.ledger.total_supply()
    }

    /// Number of accounts holding a non-zero balance.
    pub async fn holder_count(&self) -> usize {
        self.state.read().await.ledger.holder_count()
    }

    /// The journal head: highest committed seq and its record ID.
    pub async fn head(&self) -> Option<(u64, EventId)> {
        self.state.read().await.head()
    }

    /// Get a committed record by ID.
    pub async fn event(&self, id: &EventId) -> Result<Option<EventRecord>> {
        Ok(self.store.get_event(id).await?)
    }

    /// Get a committed record by journal position.
    pub async fn event_at(&self, seq: u64) -> Result<Option<EventRecord>> {
        Ok(self.store.get_event_at(seq).await?)
    }

    /// Get a range of committed records, `start <= seq <= end`.
    pub async fn events_range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>> {
        Ok(self.store.get_events_range(start, end).await?)
    }

    /// Subscribe to committed event records.
    ///
    /// Delivery is best-effort: a receiver that lags past the channel
    /// capacity misses records. The journal remains the authoritative
    /// event history.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events_tx.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutating Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint `amount` new tokens to `account`.
    ///
    /// `caller` is the authenticated principal supplied by the embedding
    /// layer. With authority enforcement on, the caller must hold a valid
    /// mint grant.
    pub async fn mint(
        &self,
        caller: &PublicKey,
        account: AccountId,
        amount: Amount,
    ) -> Result<EventRecord> {
        if self.config.enforce_authority {
            let mut authority = self.authority.write().await;
            authority
                .authorize_mint(caller, now_millis())
                .map_err(not_authorized)?;
        }

        self.commit(LedgerEvent::Mint { account, amount }).await
    }

    /// Burn `amount` tokens from `account`.
    ///
    /// With authority enforcement on, the caller must hold a valid burn
    /// grant.
    pub async fn burn(
        &self,
        caller: &PublicKey,
        account: AccountId,
        amount: Amount,
    ) -> Result<EventRecord> {
        if self.config.enforce_authority {
            let mut authority = self.authority.write().await;
            authority
                .authorize_burn(caller, now_millis())
                .map_err(not_authorized)?;
        }

        self.commit(LedgerEvent::Burn { account, amount }).await
    }

    /// Move `amount` tokens from `from` to `to`.
    ///
    /// `from` is the authenticated identity supplied by the embedding
    /// layer; no grant is required to spend one's own balance.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<EventRecord> {
        self.commit(LedgerEvent::Transfer { from, to, amount }).await
    }

    /// Validate, journal, and apply one operation.
    ///
    /// Ordering matters: preconditions are checked first (an invalid
    /// operation never reaches the journal), the record is appended next
    /// (the journal leads the in-memory state), and only then is the
    /// state mutated and the record broadcast.
    async fn commit(&self, event: LedgerEvent) -> Result<EventRecord> {
        let mut state = self.state.write().await;

        state.ledger.check(&event)?;

        let seq = state.head_seq + 1;
        let record = EventRecord::new(seq, now_millis(), event, state.head_event_id);
        let canonical = canonical_record_bytes(&record);

        match self.store.append_event(&record, &canonical).await? {
            AppendResult::Appended | AppendResult::AlreadyExists => {}
            AppendResult::Conflict { existing } => {
                warn!(seq, %existing, "append conflict under write lock");
                return Err(KernelError::Conflict { seq, existing });
            }
        }

        state.ledger.apply(&record.event)?;
        let event_id = record.compute_id();
        state.head_seq = seq;
        state.head_event_id = Some(event_id);

        debug!(
            seq,
            kind = ?record.kind(),
            amount = record.event.amount(),
            total_supply = state.ledger.total_supply(),
            "committed"
        );

        if let Some(every) = self.config.snapshot_every {
            if every > 0 && seq % every == 0 {
                let snapshot = snapshot_of(&state.ledger, seq);
                self.store.save_snapshot(&snapshot).await?;
                debug!(at_seq = seq, "snapshot persisted");
            }
        }

        // Best-effort delivery; send only fails with no subscribers.
        let _ = self.events_tx.send(record.clone());

        Ok(record)
    }

    /// Persist a snapshot of the current state.
    pub async fn snapshot_now(&self) -> Result<Snapshot> {
        let state = self.state.read().await;
        let snapshot = snapshot_of(&state.ledger, state.head_seq);
        self.store.save_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authority Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a signed grant.
    ///
    /// The signature must verify, and when an authority root is
    /// configured the issuer must be that root.
    pub async fn apply_grant(&self, signed: &SignedGrant) -> Result<GrantId> {
        signed.verify()?;
        self.check_issuer(&signed.issuer)?;

        let mut authority = self.authority.write().await;
        let grant_id = authority.apply_grant(signed.issuer, signed.payload.clone(), now_millis());
        debug!(%grant_id, "grant applied");
        Ok(grant_id)
    }

    /// Apply a signed revocation.
    pub async fn apply_revoke(&self, signed: &SignedRevoke) -> Result<()> {
        signed.verify()?;
        self.check_issuer(&signed.issuer)?;

        let mut authority = self.authority.write().await;
        authority.apply_revoke(&signed.payload, now_millis())?;
        debug!(grant_id = %signed.payload.grant_id, "grant revoked");
        Ok(())
    }

    /// Check if a principal may mint right now.
    pub async fn can_mint(&self, principal: &PublicKey) -> bool {
        self.authority.read().await.can_mint(principal, now_millis())
    }

    /// Check if a principal may burn right now.
    pub async fn can_burn(&self, principal: &PublicKey) -> bool {
        self.authority.read().await.can_burn(principal, now_millis())
    }

    fn check_issuer(&self, issuer: &PublicKey) -> Result<()> {
        if let Some(root) = &self.config.authority_root {
            if issuer != root {
                return Err(KernelError::Auth(AuthError::UntrustedIssuer(
                    issuer.to_hex(),
                )));
            }
        }
        Ok(())
    }
}

fn snapshot_of(ledger: &Ledger, at_seq: u64) -> Snapshot {
    let balances = ledger
        .balances()
        .map(|(account, balance)| (*account, *balance))
        .collect();
    Snapshot::new(at_seq, ledger.total_supply(), balances, now_millis())
}

fn not_authorized(err: AuthError) -> KernelError {
    match err {
        AuthError::PermissionDenied(msg) => {
            warn!(%msg, "operation rejected by authority");
            KernelError::NotAuthorized(msg)
        }
        other => KernelError::Auth(other),
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
