use std::collections::{BTreeMap, HashMap, HashSet};

use bytes::Bytes;
use rustc_hash::FxHashMap;
use sha3::{Digest, Keccak256};
use tracing::{debug, trace};

use statecraft_common::{
    Address, H256, U256,
    types::{Account, AccountUpdate, Genesis, code_hash, compute_storage_root},
};
use statecraft_rlp::encode::RLPEncode;
use statecraft_trie::Trie;

use crate::error::StoreError;

/// Trie path for an account: the Keccak256 digest of its address.
pub fn hash_address(address: &Address) -> Vec<u8> {
    Keccak256::new_with_prefix(address.to_fixed_bytes())
        .finalize()
        .to_vec()
}

/// In-memory account state database.
///
/// Holds accounts, contract storage, contract code and EIP-1153 transient
/// storage, with snapshot/rollback support and an optional ephemeral
/// overlay for speculative writes. State roots are recomputed on demand
/// from the full account set.
#[derive(Debug, Default)]
pub struct Store {
    accounts: HashMap<Address, Account>,
    storage: HashMap<Address, BTreeMap<U256, U256>>,
    codes: HashMap<H256, Bytes>,
    transient: FxHashMap<(Address, U256), U256>,
    snapshots: HashMap<u64, Snapshot>,
    last_snapshot_id: u64,
    overlay: Option<Overlay>,
}

/// Full copy of the persistent account state taken by
/// [`Store::create_snapshot`]. Code is content addressed and never rolled
/// back; transient storage is scoped to the running transaction and not
/// part of the copy.
#[derive(Debug)]
struct Snapshot {
    accounts: HashMap<Address, Account>,
    storage: HashMap<Address, BTreeMap<U256, U256>>,
}

/// Write buffer layered over the base state while an ephemeral view is
/// active. Deleted accounts are tombstoned with `None`; `cleared_storage`
/// hides the base slots of accounts deleted inside the view.
#[derive(Debug, Default)]
struct Overlay {
    accounts: HashMap<Address, Option<Account>>,
    storage: HashMap<Address, BTreeMap<U256, U256>>,
    cleared_storage: HashSet<Address>,
    codes: HashMap<H256, Bytes>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store seeded with a genesis allocation.
    pub fn from_genesis(genesis: &Genesis) -> Self {
        debug!(
            accounts = genesis.alloc.len(),
            "Seeding store from genesis allocation"
        );
        let mut store = Self::new();
        for (address, account) in &genesis.alloc {
            store
                .codes
                .insert(code_hash(&account.code), account.code.clone());
            for (key, value) in &account.storage {
                if !value.is_zero() {
                    store
                        .storage
                        .entry(*address)
                        .or_default()
                        .insert(*key, *value);
                }
            }
            store.accounts.insert(*address, Account::from(account));
        }
        store
    }

    /// Returns the stored account record, reading through the ephemeral
    /// overlay when one is active.
    pub fn get_account(&self, address: Address) -> Option<Account> {
        if let Some(overlay) = &self.overlay {
            if let Some(entry) = overlay.accounts.get(&address) {
                return entry.clone();
            }
        }
        self.accounts.get(&address).cloned()
    }

    pub fn set_account(&mut self, address: Address, account: Account) {
        match &mut self.overlay {
            Some(overlay) => {
                overlay.accounts.insert(address, Some(account));
            }
            None => {
                self.accounts.insert(address, account);
            }
        }
    }

    /// Removes an account record together with its contract storage.
    /// Deleting an absent account is a no-op.
    pub fn delete_account(&mut self, address: Address) {
        match &mut self.overlay {
            Some(overlay) => {
                overlay.accounts.insert(address, None);
                overlay.storage.remove(&address);
                overlay.cleared_storage.insert(address);
            }
            None => {
                self.accounts.remove(&address);
                self.storage.remove(&address);
            }
        }
    }

    pub fn account_exists(&self, address: Address) -> bool {
        self.get_account(address).is_some()
    }

    /// An account is empty per EIP-161 when it has zero balance, zero
    /// nonce, no code and no delegation. Absent accounts count as empty.
    pub fn is_empty(&self, address: Address) -> bool {
        self.get_account(address)
            .is_none_or(|account| account.is_empty())
    }

    pub fn get_balance(&self, address: Address) -> U256 {
        self.get_account(address).unwrap_or_default().balance
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        let mut account = self.get_account(address).unwrap_or_default();
        account.balance = balance;
        self.set_account(address, account);
    }

    pub fn get_nonce(&self, address: Address) -> u64 {
        self.get_account(address).unwrap_or_default().nonce
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        let mut account = self.get_account(address).unwrap_or_default();
        account.nonce = nonce;
        self.set_account(address, account);
    }

    /// Code hash of the account, the canonical empty code hash when the
    /// account is absent or has no code.
    pub fn get_code_hash(&self, address: Address) -> H256 {
        self.get_account(address).unwrap_or_default().code_hash
    }

    /// Current value of a contract storage slot, zero when unset.
    pub fn get_storage(&self, address: Address, key: U256) -> U256 {
        if let Some(overlay) = &self.overlay {
            if let Some(value) = overlay
                .storage
                .get(&address)
                .and_then(|slots| slots.get(&key))
            {
                return *value;
            }
            if overlay.cleared_storage.contains(&address) {
                return U256::zero();
            }
        }
        self.storage
            .get(&address)
            .and_then(|slots| slots.get(&key))
            .copied()
            .unwrap_or_default()
    }

    /// Writes a contract storage slot. Zero values are removed from the
    /// backing map so absent and explicitly zeroed slots are
    /// indistinguishable.
    pub fn set_storage(&mut self, address: Address, key: U256, value: U256) {
        if let Some(overlay) = &mut self.overlay {
            // Zeroes must stay in the overlay to shadow non-zero base slots.
            overlay
                .storage
                .entry(address)
                .or_default()
                .insert(key, value);
        } else if value.is_zero() {
            if let Some(slots) = self.storage.get_mut(&address) {
                slots.remove(&key);
                if slots.is_empty() {
                    self.storage.remove(&address);
                }
            }
        } else {
            self.storage
                .entry(address)
                .or_default()
                .insert(key, value);
        }
    }

    /// EIP-1153 transient storage read. Unset keys are zero.
    pub fn get_transient_storage(&self, address: Address, key: U256) -> U256 {
        self.transient
            .get(&(address, key))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_transient_storage(&mut self, address: Address, key: U256, value: U256) {
        self.transient.insert((address, key), value);
    }

    /// Drops every transient slot. Called at transaction boundaries,
    /// never by snapshot rollback.
    pub fn clear_transient_storage(&mut self) {
        self.transient.clear();
    }

    /// Stores contract code keyed by its Keccak256 digest, returning the
    /// hash. Identical blobs share a single entry.
    pub fn set_code(&mut self, code: Bytes) -> H256 {
        let hash = code_hash(&code);
        match &mut self.overlay {
            Some(overlay) => {
                overlay.codes.entry(hash).or_insert(code);
            }
            None => {
                self.codes.entry(hash).or_insert(code);
            }
        }
        hash
    }

    pub fn get_code(&self, code_hash: H256) -> Result<Bytes, StoreError> {
        if let Some(overlay) = &self.overlay {
            if let Some(code) = overlay.codes.get(&code_hash) {
                return Ok(code.clone());
            }
        }
        self.codes
            .get(&code_hash)
            .cloned()
            .ok_or(StoreError::CodeNotFound(code_hash))
    }

    /// Code that executes for the account, following EIP-7702 delegation
    /// until a non-delegating account is reached. Accounts without code
    /// yield an empty blob; a delegation loop is reported as
    /// [`StoreError::InvalidAddress`].
    pub fn get_code_by_address(&self, address: Address) -> Result<Bytes, StoreError> {
        let mut visited: Vec<Address> = Vec::new();
        let mut current = address;
        loop {
            if visited.contains(&current) {
                return Err(StoreError::InvalidAddress(current));
            }
            let account = self
                .get_account(current)
                .ok_or(StoreError::AccountNotFound(current))?;
            match account.delegated_address {
                Some(target) => {
                    visited.push(current);
                    current = target;
                }
                None if account.has_code() => return self.get_code(account.code_hash),
                None => return Ok(Bytes::new()),
            }
        }
    }

    /// Points an externally owned account at a delegate per EIP-7702.
    /// Creates the record when absent. Fails with
    /// [`StoreError::InvalidAddress`] if the account carries contract code.
    pub fn set_delegation(&mut self, address: Address, target: Address) -> Result<(), StoreError> {
        let mut account = self.get_account(address).unwrap_or_default();
        if account.has_code() {
            return Err(StoreError::InvalidAddress(address));
        }
        account.delegated_address = Some(target);
        self.set_account(address, account);
        Ok(())
    }

    /// Removes an account's delegation. A record holding nothing but the
    /// delegation is dropped entirely, so the address reads as absent
    /// again. Clearing an absent or non-delegating account is a no-op.
    pub fn clear_delegation(&mut self, address: Address) {
        let Some(mut account) = self.get_account(address) else {
            return;
        };
        if account.delegated_address.take().is_none() {
            return;
        }
        if account.is_empty() {
            self.delete_account(address);
        } else {
            self.set_account(address, account);
        }
    }

    pub fn has_delegation(&self, address: Address) -> bool {
        self.get_account(address)
            .is_some_and(|account| account.delegated_address.is_some())
    }

    /// Root of the storage trie for an account, derived from the slots the
    /// store currently holds. Accounts without storage get the empty trie
    /// root.
    pub fn storage_root(&self, address: Address) -> H256 {
        compute_storage_root(&self.current_slots(address))
    }

    /// Recomputes the state root over the full account set: a fresh trie
    /// keyed by `Keccak256(address)` holding each account's trie encoding,
    /// with storage roots derived from the current slots. An empty store
    /// yields the canonical empty trie root.
    pub fn get_state_root(&self) -> H256 {
        let Some(overlay) = &self.overlay else {
            let iter = self.accounts.iter().map(|(address, account)| {
                (hash_address(address), self.trie_account_rlp(*address, account))
            });
            return Trie::compute_hash_from_unsorted_iter(iter);
        };
        let mut merged = self.accounts.clone();
        for (address, entry) in &overlay.accounts {
            match entry {
                Some(account) => {
                    merged.insert(*address, account.clone());
                }
                None => {
                    merged.remove(address);
                }
            }
        }
        let iter = merged.iter().map(|(address, account)| {
            (hash_address(address), self.trie_account_rlp(*address, account))
        });
        Trie::compute_hash_from_unsorted_iter(iter)
    }

    /// Computes the state root for the current contents. Alias of
    /// [`Store::get_state_root`] kept for callers that treat root
    /// computation as a commit point.
    pub fn commit_changes(&self) -> H256 {
        self.get_state_root()
    }

    /// Takes a full copy of the account and storage maps and registers it
    /// under a fresh monotonically increasing ID.
    pub fn create_snapshot(&mut self) -> u64 {
        self.last_snapshot_id += 1;
        let id = self.last_snapshot_id;
        self.snapshots.insert(
            id,
            Snapshot {
                accounts: self.accounts.clone(),
                storage: self.storage.clone(),
            },
        );
        trace!(id, "Created state snapshot");
        id
    }

    /// Restores the state captured by `id` and discards that snapshot
    /// together with every later one. IDs are never reused.
    pub fn revert_to_snapshot(&mut self, id: u64) -> Result<(), StoreError> {
        let snapshot = self
            .snapshots
            .remove(&id)
            .ok_or(StoreError::SnapshotNotFound(id))?;
        self.accounts = snapshot.accounts;
        self.storage = snapshot.storage;
        // Later snapshots captured state that no longer exists.
        self.snapshots.retain(|snapshot_id, _| *snapshot_id < id);
        trace!(id, "Reverted to state snapshot");
        Ok(())
    }

    /// Drops the snapshot without touching current state, keeping the
    /// changes made since it was taken.
    pub fn commit_snapshot(&mut self, id: u64) -> Result<(), StoreError> {
        self.snapshots
            .remove(&id)
            .ok_or(StoreError::SnapshotNotFound(id))?;
        trace!(id, "Committed state snapshot");
        Ok(())
    }

    /// Transactions alias snapshots one to one.
    pub fn begin_transaction(&mut self) -> u64 {
        self.create_snapshot()
    }

    /// Keeps the transaction's writes and drops its snapshot.
    pub fn commit_transaction(&mut self, id: u64) -> Result<(), StoreError> {
        self.commit_snapshot(id)
    }

    /// Rolls the transaction's writes back to its snapshot.
    pub fn rollback_transaction(&mut self, id: u64) -> Result<(), StoreError> {
        self.revert_to_snapshot(id)
    }

    /// Opens the ephemeral overlay. While active, writes land in the
    /// overlay and reads prefer it, leaving the base state untouched.
    /// Calling this while a view is already open keeps the existing
    /// overlay contents.
    pub fn begin_ephemeral_view(&mut self) {
        if self.overlay.is_none() {
            trace!("Opened ephemeral view");
            self.overlay = Some(Overlay::default());
        }
    }

    /// Throws the overlay away, returning all reads to the base state.
    pub fn discard_ephemeral_view(&mut self) {
        if self.overlay.take().is_some() {
            trace!("Discarded ephemeral view");
        }
    }

    /// Applies a batch of account updates in order. Removal drops the
    /// record and its storage; info changes create the record when absent;
    /// new code flows through the deduplicating code map; written slots go
    /// through the regular zero-removing storage write path.
    pub fn apply_account_updates(&mut self, updates: &[AccountUpdate]) {
        for update in updates {
            if update.removed {
                self.delete_account(update.address);
            }
            if let Some(code) = &update.code {
                self.set_code(code.clone());
            }
            if let Some(info) = &update.info {
                let mut account = self.get_account(update.address).unwrap_or_default();
                account.nonce = info.nonce;
                account.balance = info.balance;
                account.code_hash = info.code_hash;
                self.set_account(update.address, account);
            }
            for (key, value) in &update.added_storage {
                self.set_storage(update.address, *key, *value);
            }
            if !update.added_storage.is_empty() {
                if let Some(mut account) = self.get_account(update.address) {
                    account.storage_root = self.storage_root(update.address);
                    self.set_account(update.address, account);
                }
            }
        }
        debug!(count = updates.len(), "Applied account updates");
    }

    /// Effective slots for an account, base and overlay merged.
    fn current_slots(&self, address: Address) -> BTreeMap<U256, U256> {
        let overlay = self.overlay.as_ref();
        let cleared = overlay.is_some_and(|overlay| overlay.cleared_storage.contains(&address));
        let mut slots = if cleared {
            BTreeMap::new()
        } else {
            self.storage.get(&address).cloned().unwrap_or_default()
        };
        if let Some(writes) = overlay.and_then(|overlay| overlay.storage.get(&address)) {
            for (key, value) in writes {
                if value.is_zero() {
                    slots.remove(key);
                } else {
                    slots.insert(*key, *value);
                }
            }
        }
        slots
    }

    /// Trie value for one account: the canonical four field RLP list with
    /// the storage root refreshed from the current slots.
    fn trie_account_rlp(&self, address: Address, account: &Account) -> Vec<u8> {
        Account {
            storage_root: self.storage_root(address),
            ..account.clone()
        }
        .encode_to_vec()
    }
}
