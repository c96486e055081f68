//! 桶对象池
//! Bucket object pool
//!
//! 提供桶的获取、寻址与回收：到期桶在清扫结束前仍可通过
//! [`BucketId`] 寻址，这正是句柄在清扫中途仍能 O(1) 取消的原因。
//!
//! Provides bucket acquisition, addressing and recycling: an expired
//! bucket stays addressable through its [`BucketId`] until its sweep
//! finishes, which is what keeps mid-sweep cancellation O(1).

use crate::config::PoolConfig;
use crate::timer::list::HandlerList;
use tracing::trace;

/// Stable, epoch-stamped address of a pooled bucket.
///
/// The epoch is bumped whenever the underlying slot is recycled, so a
/// handle referencing a released bucket misses instead of aliasing its
/// successor.
///
/// 池化桶的稳定地址，带纪元印章。
///
/// 底层槽位每次回收时纪元递增，因此引用已释放桶的句柄会未命中，
/// 而不会与后继桶发生混叠。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BucketId {
    index: u32,
    epoch: u32,
}

struct Slot {
    list: HandlerList,
    epoch: u32,
    live: bool,
}

/// Pool statistics.
/// 对象池统计信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total buckets handed out since creation.
    /// 创建以来发放的桶总数。
    pub acquired: u64,
    /// Total buckets returned since creation.
    /// 创建以来归还的桶总数。
    pub released: u64,
    /// Released buckets currently retained for reuse.
    /// 当前为复用而保留的已释放桶数。
    pub retained: usize,
}

impl PoolStats {
    /// Buckets currently handed out.
    /// 当前在外的桶数。
    pub fn live(&self) -> u64 {
        self.acquired - self.released
    }
}

/// Single-strand arena of recyclable handler-list buckets.
/// 单 strand 的可回收 handler 列表桶竞技场。
pub(crate) struct BucketArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    max_retained: usize,
    initial_bucket_capacity: usize,
    acquired: u64,
    released: u64,
}

impl BucketArena {
    pub(crate) fn new(pool: &PoolConfig, initial_bucket_capacity: usize) -> Self {
        let mut arena = Self {
            slots: Vec::with_capacity(pool.initial_lists),
            free: Vec::with_capacity(pool.initial_lists),
            max_retained: pool.max_retained,
            initial_bucket_capacity,
            acquired: 0,
            released: 0,
        };
        for _ in 0..pool.initial_lists {
            let index = arena.push_slot();
            arena.free.push(index);
        }
        arena
    }

    /// Hands out an empty bucket. O(1) amortized; cannot fail.
    /// 发放一个空桶。摊还 O(1)，不会失败。
    pub(crate) fn acquire(&mut self) -> BucketId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => self.push_slot(),
        };
        let slot = &mut self.slots[index as usize];
        debug_assert!(!slot.live && slot.list.is_empty());
        slot.live = true;
        self.acquired += 1;
        BucketId {
            index,
            epoch: slot.epoch,
        }
    }

    /// Returns a bucket, clearing it. Beyond the retention cap the bucket's
    /// backing storage is discarded.
    ///
    /// 归还并清空一个桶。超过保留上限后丢弃桶的底层存储。
    pub(crate) fn release(&mut self, id: BucketId) {
        let slot = &mut self.slots[id.index as usize];
        debug_assert!(slot.live && slot.epoch == id.epoch);
        slot.list.clear();
        if self.free.len() >= self.max_retained {
            slot.list.shrink();
            trace!(bucket = id.index, "bucket storage discarded beyond pool cap");
        }
        slot.epoch = slot.epoch.wrapping_add(1);
        slot.live = false;
        self.free.push(id.index);
        self.released += 1;
    }

    /// The bucket at `id`. Debug-asserts the address is current.
    /// `id` 处的桶。debug 断言地址仍然有效。
    pub(crate) fn get_mut(&mut self, id: BucketId) -> &mut HandlerList {
        let slot = &mut self.slots[id.index as usize];
        debug_assert!(slot.live && slot.epoch == id.epoch, "stale bucket reference");
        &mut slot.list
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired,
            released: self.released,
            retained: self.free.len(),
        }
    }

    fn push_slot(&mut self) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            list: HandlerList::with_capacity(self.initial_bucket_capacity),
            epoch: 0,
            live: false,
        });
        index
    }
}
