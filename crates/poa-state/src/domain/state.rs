//! # Copy-on-Write State Overlay
//!
//! A [`State`] reads through to an immutable committed snapshot and keeps
//! every write in a private dirty map. A journal of previous values supports
//! nested checkpoints; reverting replays the journal backwards.
//!
//! Nothing reaches the [`StateStore`] until [`Stage::commit`] is called, so
//! discarding speculative work is simply dropping the overlay.

use super::{Account, Result, StateError};
use crate::ports::{Snapshot, StateStore};
use shared_types::{merkle_root, Address, Hash};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Opens state overlays on top of committed roots.
#[derive(Clone)]
pub struct Stater {
    store: Arc<dyn StateStore>,
}

impl Stater {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Open an overlay rooted at `root`.
    pub fn new_state(&self, root: Hash) -> Result<State> {
        let base = self
            .store
            .load(&root)?
            .ok_or(StateError::UnknownRoot(root))?;
        Ok(State {
            base_root: root,
            base,
            dirty: BTreeMap::new(),
            journal: Vec::new(),
            store: Arc::clone(&self.store),
        })
    }
}

impl fmt::Debug for Stater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stater").finish_non_exhaustive()
    }
}

struct JournalEntry {
    address: Address,
    previous: Option<Account>,
}

/// Mutable, uncommitted view of account state.
pub struct State {
    base_root: Hash,
    base: Arc<Snapshot>,
    dirty: BTreeMap<Address, Account>,
    journal: Vec<JournalEntry>,
    store: Arc<dyn StateStore>,
}

impl State {
    /// Root the overlay was opened at.
    pub fn base_root(&self) -> Hash {
        self.base_root
    }

    pub fn account(&self, address: &Address) -> Account {
        self.dirty
            .get(address)
            .or_else(|| self.base.get(address))
            .copied()
            .unwrap_or_default()
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.account(address).balance
    }

    pub fn set_balance(&mut self, address: Address, balance: u128) {
        let previous = self.dirty.insert(address, Account::new(balance));
        self.journal.push(JournalEntry { address, previous });
    }

    pub fn add_balance(&mut self, address: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self
            .balance(&address)
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(address))?;
        self.set_balance(address, balance);
        Ok(())
    }

    pub fn sub_balance(&mut self, address: Address, amount: u128) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance(&address);
        let balance = available
            .checked_sub(amount)
            .ok_or(StateError::InsufficientBalance {
                address,
                required: amount,
                available,
            })?;
        self.set_balance(address, balance);
        Ok(())
    }

    /// Mark the current journal position.
    pub fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Undo every write made after `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: usize) -> Result<()> {
        if checkpoint > self.journal.len() {
            return Err(StateError::InvalidCheckpoint {
                checkpoint,
                len: self.journal.len(),
            });
        }
        while self.journal.len() > checkpoint {
            if let Some(entry) = self.journal.pop() {
                match entry.previous {
                    Some(account) => {
                        self.dirty.insert(entry.address, account);
                    }
                    None => {
                        self.dirty.remove(&entry.address);
                    }
                }
            }
        }
        trace!(checkpoint, "state reverted");
        Ok(())
    }

    /// Drop every pending write, back to the base root.
    pub fn reset(&mut self) {
        self.dirty.clear();
        self.journal.clear();
    }

    /// Whether any write is pending.
    pub fn is_modified(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// State root the overlay would commit to.
    pub fn root(&self) -> Hash {
        if self.dirty.is_empty() {
            return self.base_root;
        }
        compute_root(&self.merged())
    }

    /// Materialize the overlay without committing it.
    pub fn stage(&self) -> Stage {
        let snapshot = self.merged();
        Stage {
            root: compute_root(&snapshot),
            snapshot: Arc::new(snapshot),
            store: Arc::clone(&self.store),
        }
    }

    fn merged(&self) -> Snapshot {
        let mut snapshot = (*self.base).clone();
        for (address, account) in &self.dirty {
            if account.is_empty() {
                snapshot.remove(address);
            } else {
                snapshot.insert(*address, *account);
            }
        }
        snapshot
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("base_root", &self.base_root)
            .field("dirty", &self.dirty.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}

/// Uncommitted, materialized state produced by [`State::stage`].
#[derive(Clone)]
pub struct Stage {
    root: Hash,
    snapshot: Arc<Snapshot>,
    store: Arc<dyn StateStore>,
}

impl Stage {
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Persist the staged accounts and return the new root.
    ///
    /// Idempotent: committing the same stage again stores nothing new.
    pub fn commit(&self) -> Result<Hash> {
        self.store.store(self.root, Arc::clone(&self.snapshot))?;
        Ok(self.root)
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("root", &self.root)
            .field("accounts", &self.snapshot.len())
            .finish()
    }
}

fn compute_root(snapshot: &Snapshot) -> Hash {
    let leaves: Vec<Hash> = snapshot
        .iter()
        .filter(|(_, account)| !account.is_empty())
        .map(|(address, account)| account.leaf_hash(address))
        .collect();
    merkle_root(&leaves)
}
