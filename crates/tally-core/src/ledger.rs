//! The ledger state machine: balance table and supply counter.
//!
//! A [`Ledger`] owns all balance state and is the sole mutator of it. Every
//! operation is a single atomic transition between consistent states: the
//! sum of all balances equals `total_supply` before and after, and a
//! rejected operation changes nothing.
//!
//! The balance table is sparse: an absent account holds 0, and accounts
//! debited to 0 are dropped from the table.

use std::collections::HashMap;

use crate::error::LedgerError;
use crate::event::LedgerEvent;
use crate::types::{AccountId, Amount};

/// The fungible-token ledger state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    /// Account balances. Absent key means balance 0.
    balances: HashMap<AccountId, Amount>,

    /// Sum of all balances.
    total_supply: Amount,
}

impl Ledger {
    /// Create an empty ledger: no accounts, supply 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted balances.
    ///
    /// Used when restoring from a snapshot. Zero balances are dropped;
    /// the supply counter is recomputed from the entries.
    pub fn from_balances(entries: impl IntoIterator<Item = (AccountId, Amount)>) -> Self {
        let mut ledger = Self::new();
        for (account, balance) in entries {
            if balance > 0 {
                ledger.balances.insert(account, balance);
                ledger.total_supply += balance;
            }
        }
        ledger
    }

    /// The current balance of `account`, or 0 if never credited.
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// The current total supply.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Number of accounts holding a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterate over all non-zero balances.
    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter()
    }

    /// Recompute the supply by summing the balance table.
    ///
    /// Always equals [`Ledger::total_supply`]; exposed for diagnostics and
    /// invariant checks in tests.
    pub fn computed_supply(&self) -> Amount {
        self.balances.values().copied().sum()
    }

    /// Mint `amount` new tokens to `account`.
    ///
    /// Rejects the null account and supply overflow. On success the supply
    /// increases by exactly `amount` and no other balance changes.
    pub fn mint(&mut self, account: AccountId, amount: Amount) -> Result<LedgerEvent, LedgerError> {
        let event = LedgerEvent::Mint { account, amount };
        self.apply(&event)?;
        Ok(event)
    }

    /// Burn `amount` tokens from `account`.
    ///
    /// Rejects if the account balance is below `amount`. On success the
    /// supply decreases by exactly `amount` and no other balance changes.
    pub fn burn(&mut self, account: AccountId, amount: Amount) -> Result<LedgerEvent, LedgerError> {
        let event = LedgerEvent::Burn { account, amount };
        self.apply(&event)?;
        Ok(event)
    }

    /// Move `amount` tokens from `from` to `to`. Supply is unchanged.
    ///
    /// `from` is supplied by the caller-authentication layer; the ledger
    /// does not authenticate. A self-transfer succeeds with net-zero
    /// effect and still produces the event.
    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        let event = LedgerEvent::Transfer { from, to, amount };
        self.apply(&event)?;
        Ok(event)
    }

    /// Check whether an event could be applied to the current state.
    ///
    /// Runs every precondition without mutating. [`Ledger::apply`] is
    /// exactly `check` followed by the state write, so callers that need
    /// to interleave other work (e.g. journaling) between validation and
    /// mutation can call `check` first and rely on `apply` succeeding.
    pub fn check(&self, event: &LedgerEvent) -> Result<(), LedgerError> {
        match *event {
            LedgerEvent::Mint { account, amount } => {
                if account.is_zero() {
                    return Err(LedgerError::InvalidRecipient);
                }
                // Every balance is bounded by the supply, so the supply
                // check covers the credited balance too.
                self.total_supply
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
            }
            LedgerEvent::Burn { account, amount } => {
                let balance = self.balance_of(&account);
                if balance < amount {
                    return Err(LedgerError::InsufficientBalance {
                        account,
                        balance,
                        required: amount,
                    });
                }
            }
            LedgerEvent::Transfer { from, to, amount } => {
                if to.is_zero() {
                    return Err(LedgerError::InvalidRecipient);
                }
                let balance = self.balance_of(&from);
                if balance < amount {
                    return Err(LedgerError::InsufficientBalance {
                        account: from,
                        balance,
                        required: amount,
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply an event to the ledger state.
    ///
    /// This is the single transition function: live operations and journal
    /// replay both go through it, so replaying a journal reproduces state
    /// exactly. All checks run before any mutation; a rejected event
    /// changes nothing.
    pub fn apply(&mut self, event: &LedgerEvent) -> Result<(), LedgerError> {
        self.check(event)?;

        match *event {
            LedgerEvent::Mint { account, amount } => {
                let balance = self.balance_of(&account) + amount;
                self.set_balance(account, balance);
                self.total_supply += amount;
            }
            LedgerEvent::Burn { account, amount } => {
                let remaining = self.balance_of(&account) - amount;
                self.set_balance(account, remaining);
                self.total_supply -= amount;
            }
            LedgerEvent::Transfer { from, to, amount } => {
                if from != to {
                    let debited = self.balance_of(&from) - amount;
                    let credited = self.balance_of(&to) + amount;
                    self.set_balance(from, debited);
                    self.set_balance(to, credited);
                }
            }
        }

        Ok(())
    }

    /// Write a balance, keeping the table sparse.
    fn set_balance(&mut self, account: AccountId, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}
