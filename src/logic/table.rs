use crate::pair::PairKey;
use ahash::AHashMap;
use alloy_primitives::Address;
use std::hash::Hash;

/// Key of a global per-pair aggregate: (pair, user, bucket).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserKey {
    pub pair: PairKey,
    pub user: Address,
    pub bucket: i64,
}

impl UserKey {
    pub fn new(pair: PairKey, user: Address, bucket: i64) -> UserKey {
        UserKey { pair, user, bucket }
    }
}

/// Key of a relayer-scoped aggregate: (relayer, pair, user, bucket).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RelayerUserKey {
    pub relayer: Address,
    pub pair: PairKey,
    pub user: Address,
    pub bucket: i64,
}

impl RelayerUserKey {
    pub fn new(relayer: Address, pair: PairKey, user: Address, bucket: i64) -> RelayerUserKey {
        RelayerUserKey { relayer, pair, user, bucket }
    }
}

/// Key of a lending aggregate: (relayer, user, bucket). No pair dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LendingKey {
    pub relayer: Address,
    pub user: Address,
    pub bucket: i64,
}

impl LendingKey {
    pub fn new(relayer: Address, user: Address, bucket: i64) -> LendingKey {
        LendingKey { relayer, user, bucket }
    }
}

/// Flat keyed table of aggregate records.
///
/// Replaces free-form nested maps: each record is addressed by one composite
/// key, which makes the flatten/absorb cycle used by snapshots lossless by
/// construction and keeps key handling out of the update algorithm.
#[derive(Clone, Debug)]
pub struct AggregateTable<K, R> {
    entries: AHashMap<K, R>,
}

impl<K: Copy + Eq + Hash, R> AggregateTable<K, R> {
    pub fn new() -> Self {
        Self { entries: AHashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&R> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: K, record: R) {
        self.entries.insert(key, record);
    }

    /// Fetch the record for `key`, creating it lazily on first touch.
    pub fn entry_or_insert_with(&mut self, key: K, create: impl FnOnce() -> R) -> &mut R {
        self.entries.entry(key).or_insert_with(create)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &R)> {
        self.entries.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.entries.values()
    }
}

impl<K: Copy + Eq + Hash, R> Default for AggregateTable<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_created_once() {
        let mut table: AggregateTable<UserKey, u64> = AggregateTable::new();
        let key = UserKey::new(PairKey::new(Address::repeat_byte(0x01), Address::repeat_byte(0x02)), Address::repeat_byte(0x03), 3600);

        *table.entry_or_insert_with(key, || 0) += 1;
        *table.entry_or_insert_with(key, || 0) += 1;

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&key), Some(&2));
    }

    #[test]
    fn test_distinct_buckets_distinct_entries() {
        let mut table: AggregateTable<UserKey, u64> = AggregateTable::new();
        let pair = PairKey::new(Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        let user = Address::repeat_byte(0x03);

        table.entry_or_insert_with(UserKey::new(pair, user, 0), || 1);
        table.entry_or_insert_with(UserKey::new(pair, user, 3600), || 1);

        assert_eq!(table.len(), 2);
    }
}
