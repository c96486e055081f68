//! 期限索引
//! Deadline index
//!
//! 从量化期限（微秒）到桶地址的有序映射。最小键即下一次触发时刻。
//!
//! Ordered mapping from quantized deadline (µs) to bucket address. The
//! minimum key is the next fire time.

use crate::timer::pool::{BucketArena, BucketId};
use std::collections::BTreeMap;

/// Ordered `deadline → bucket` index. No duplicate keys; a bucket present
/// in the index is non-empty.
///
/// 有序的 `期限 → 桶` 索引。键不重复；索引中的桶必定非空。
pub(crate) struct DeadlineIndex {
    map: BTreeMap<u64, BucketId>,
}

impl DeadlineIndex {
    pub(crate) fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Looks up the slot at `key`, acquiring a fresh bucket from the arena
    /// if absent. Returns the bucket and whether it was freshly acquired.
    ///
    /// 查找 `key` 处的槽位，缺失时从竞技场获取新桶。返回桶及其是否新取。
    pub(crate) fn insert(&mut self, key: u64, arena: &mut BucketArena) -> (BucketId, bool) {
        let mut fresh = false;
        let bucket = *self.map.entry(key).or_insert_with(|| {
            fresh = true;
            arena.acquire()
        });
        (bucket, fresh)
    }

    /// Append-at-tail variant of [`insert`](Self::insert) for the common
    /// case of non-decreasing keys. The balanced map needs no positional
    /// hint; the separate entry point keeps the call-site distinction and
    /// asserts the monotonicity the caller claims.
    ///
    /// [`insert`](Self::insert) 的尾部追加变体，用于键不递减的常见情形。
    /// 平衡映射无需位置提示；独立入口保留调用点区别并断言调用方声称的
    /// 单调性。
    pub(crate) fn insert_tail(&mut self, key: u64, arena: &mut BucketArena) -> (BucketId, bool) {
        debug_assert!(self.map.last_key_value().map_or(true, |(&k, _)| key >= k));
        self.insert(key, arena)
    }

    pub(crate) fn remove(&mut self, key: u64) -> Option<BucketId> {
        self.map.remove(&key)
    }

    pub(crate) fn get(&self, key: u64) -> Option<BucketId> {
        self.map.get(&key).copied()
    }

    /// The earliest deadline and its bucket, if any.
    /// 最早的期限及其桶（如有）。
    pub(crate) fn first(&self) -> Option<(u64, BucketId)> {
        self.map.first_key_value().map(|(&k, &b)| (k, b))
    }

    /// The latest deadline, if any.
    /// 最晚的期限（如有）。
    pub(crate) fn last_key(&self) -> Option<u64> {
        self.map.last_key_value().map(|(&k, _)| k)
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
