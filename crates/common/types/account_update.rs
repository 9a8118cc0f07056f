use bytes::Bytes;
use rustc_hash::FxHashMap;

use crate::types::AccountInfo;
use crate::{Address, U256};

/// Pending changes to one account, produced by transaction execution and
/// applied to the store as a unit. Absent fields leave the current value
/// in place.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub address: Address,
    pub removed: bool,
    pub info: Option<AccountInfo>,
    pub code: Option<Bytes>,
    pub added_storage: FxHashMap<U256, U256>,
}

impl AccountUpdate {
    /// Empty update for the given account.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Update that deletes the account outright.
    pub fn removed(address: Address) -> Self {
        Self {
            address,
            removed: true,
            ..Self::default()
        }
    }

    /// Folds `other` into self, with `other` winning wherever both touch
    /// the same field or storage slot.
    pub fn merge(&mut self, other: AccountUpdate) {
        self.removed = other.removed;
        if other.info.is_some() {
            self.info = other.info;
        }
        if other.code.is_some() {
            self.code = other.code;
        }
        self.added_storage.extend(other.added_storage);
    }

    /// Collapses a sequence of updates for one account into a single update,
    /// later entries overriding earlier ones. `None` when the sequence is
    /// empty.
    pub fn merge_batch(updates: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut updates = updates.into_iter();
        let first = updates.next()?;
        Some(updates.fold(first, |mut merged, update| {
            merged.merge(update);
            merged
        }))
    }
}
