//! 定时器核心实现
//! Timer core implementation
//!
//! 公开表面：[`schedule`](ActorTimer::schedule) 与
//! [`cancel`](ActorTimer::cancel)，以及重新武装决策、到期清扫、区分
//! 过期回调的代号计数器和 strand 生命周期管理。
//!
//! The public surface: [`schedule`](ActorTimer::schedule) and
//! [`cancel`](ActorTimer::cancel), plus the rearm decision, the expiry
//! sweep, the generation counter that disambiguates stale completions,
//! and strand-lifetime management.

use crate::config::TimerConfig;
use crate::strand::{Strand, WeakStrand};
use crate::timer::actor::ActorRef;
use crate::timer::clock;
use crate::timer::driver::WaitTimer;
use crate::timer::handle::TimerHandle;
use crate::timer::index::DeadlineIndex;
use crate::timer::pool::{BucketArena, PoolStats};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, trace};

/// Deadlines are quantized by clearing their low 8 bits, giving ~256 µs
/// buckets: deadlines within the same quantum share one bucket and one
/// wait, so the underlying timer is rearmed far less often.
///
/// 期限通过清除低 8 位被量化为约 256 µs 的桶：同一量子内的期限共享
/// 一个桶和一次等待，底层定时器的重新武装因此大为减少。
pub const DEADLINE_QUANTUM_MASK: u64 = !0xFF;

/// A sweep also fires buckets due within this many microseconds of "now"
/// instead of rearming for them. Together with the 256 µs quantization the
/// worst-case lateness is ≈ 768 µs, in exchange for far fewer rearms when
/// deadlines clump.
///
/// 清扫同时触发距"现在"不超过此微秒数内到期的桶，而不是为其重新武装。
/// 与 256 µs 量化相加，最坏迟到约 768 µs，换来期限密集时更少的重武装。
pub const EXPIRE_SLACK_US: u64 = 500;

/// Upper bound (exclusive) on a single timeout duration in microseconds.
/// 单次超时时长的微秒上界（不含）。
pub const MAX_TIMEOUT_US: u64 = (1u64 << 63) / 1000;

/// Timer service counters.
/// 定时器服务计数器。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Deadlines accepted by `schedule`.
    /// `schedule` 接受的期限数。
    pub scheduled: u64,
    /// Handlers fired by expiry sweeps.
    /// 到期清扫触发的 handler 数。
    pub fired: u64,
    /// Handlers removed by `cancel`.
    /// `cancel` 移除的 handler 数。
    pub cancelled: u64,
}

/// The per-strand timer service.
///
/// Lives inside its strand's context and is only reachable by `&mut` from
/// tasks running on that strand, so every operation is serialized by
/// construction; no locks anywhere.
///
/// 每 strand 的定时器服务。
///
/// 存放于其 strand 的上下文中，只能从运行在该 strand 上的任务以 `&mut`
/// 访问，因此所有操作天然串行化——无任何锁。
pub struct ActorTimer {
    strand: WeakStrand,
    /// Held exactly while work is live; keeps the strand's driver running.
    /// 仅在存在在途工作时持有；维持 strand 驱动运行。
    strong: Option<Strand>,
    wait: WaitTimer,
    index: DeadlineIndex,
    arena: BucketArena,
    /// Stamped into each wait; the completion compares its stamp against
    /// the current value to decide authority.
    ///
    /// 印入每次等待；完成回调将其印章与当前值比较以判定权威性。
    generation: u32,
    /// Completions posted but not yet delivered. The strong strand
    /// reference is balanced against this count.
    ///
    /// 已投递但尚未送达的完成回调数。strand 强引用与此计数配平。
    inflight: u32,
    /// True iff a wait is outstanding.
    /// 当且仅当存在未决等待时为真。
    looping: bool,
    /// Largest deadline currently present, `u64::MAX` when empty; fast
    /// path for append-at-tail inserts.
    ///
    /// 当前存在的最大期限，空时为 `u64::MAX`；尾部追加插入的快捷路径。
    max_tick: u64,
    /// The deadline the wait is currently armed for; `0` is the in-sweep
    /// sentinel that suppresses preempting rearms.
    ///
    /// 当前等待所武装的期限；`0` 是清扫中的哨兵值，用于抑制抢占性重武装。
    finish_time: u64,
    stats: TimerStats,
}

impl ActorTimer {
    /// Constructs in idle state; no resources are held until the first
    /// `schedule`.
    ///
    /// 以空闲状态构造；首次 `schedule` 之前不持有任何资源。
    pub(crate) fn new(strand: WeakStrand, config: TimerConfig) -> Self {
        Self {
            wait: WaitTimer::new(strand.clone()),
            strand,
            strong: None,
            index: DeadlineIndex::new(),
            arena: BucketArena::new(&config.pool, config.initial_bucket_capacity),
            generation: 0,
            inflight: 0,
            looping: false,
            max_tick: u64::MAX,
            finish_time: u64::MAX,
            stats: TimerStats::default(),
        }
    }

    /// Schedules `actor` to be fired `us` microseconds from now. Returns
    /// the cancellation handle.
    ///
    /// Must be called on the owning strand; `us` must be below
    /// [`MAX_TIMEOUT_US`].
    ///
    /// 调度 `actor` 在 `us` 微秒后触发。返回取消句柄。
    ///
    /// 必须在所属 strand 上调用；`us` 必须小于 [`MAX_TIMEOUT_US`]。
    pub fn schedule(&mut self, us: u64, actor: ActorRef) -> TimerHandle {
        self.assert_on_strand();
        assert!(us < MAX_TIMEOUT_US, "timeout duration out of range: {us}");

        let deadline = (clock::now_us() + us) & DEADLINE_QUANTUM_MASK;
        let (bucket, fresh) = if self.index.is_empty() || deadline >= self.max_tick {
            self.max_tick = deadline;
            self.index.insert_tail(deadline, &mut self.arena)
        } else {
            self.index.insert(deadline, &mut self.arena)
        };
        let (node, seq) = self.arena.get_mut(bucket).push_back(actor);
        self.stats.scheduled += 1;

        if !self.looping {
            // 定时器已退出循环，重新启动。
            // The wait loop had exited; restart it.
            debug_assert_eq!(self.index.len(), 1);
            self.promote_strand();
            self.looping = true;
            self.finish_time = deadline;
            self.arm(us);
        } else if deadline < self.finish_time {
            // 新期限早于当前武装期限，取消后重新计时。
            // The new deadline precedes the armed one; cancel and rearm.
            self.wait.cancel();
            self.finish_time = deadline;
            self.arm(us);
        }

        trace!(
            us,
            deadline,
            fresh_bucket = fresh,
            generation = self.generation,
            "timeout scheduled"
        );
        TimerHandle::new(bucket, node, seq, deadline)
    }

    /// Cancels the deadline referenced by `handle` and nulls it. O(1) on
    /// the handler node. Cancelling a null handle is a no-op; cancelling a
    /// handle whose deadline already fired is a caller bug (asserted in
    /// debug builds, ignored in release).
    ///
    /// 取消 `handle` 引用的期限并将其置空。对 handler 节点为 O(1)。
    /// 取消空句柄是空操作；取消已触发期限的句柄是调用方缺陷
    /// （debug 构建中断言，release 中忽略）。
    pub fn cancel(&mut self, handle: &mut TimerHandle) {
        let Some(slot) = handle.take() else {
            return;
        };
        self.assert_on_strand();

        let removed = self.arena.get_mut(slot.bucket).remove(slot.node, slot.seq);
        debug_assert!(
            removed.is_some(),
            "cancel of an already-consumed timer handle"
        );
        if removed.is_none() {
            return;
        }
        self.stats.cancelled += 1;

        let emptied = self.arena.get_mut(slot.bucket).is_empty();
        // 桶若已为清扫而脱离索引，其空壳由清扫循环回收，而非这里。
        // A bucket already detached for firing is reclaimed by the sweep
        // loop, not here.
        if emptied && self.index.get(slot.deadline) == Some(slot.bucket) {
            self.index.remove(slot.deadline);
            self.arena.release(slot.bucket);
            if self.index.is_empty() {
                // 没有任何定时任务，退出等待循环。
                // Nothing pending; leave the wait loop.
                self.max_tick = u64::MAX;
                self.wait.cancel();
                self.generation = self.generation.wrapping_add(1);
                self.looping = false;
                // 强引用在被取消等待的完成回调送达时才释放。
                // The strong ref is released once the cancelled wait's
                // completion drains.
            } else if slot.deadline == self.max_tick {
                self.max_tick = self.index.last_key().unwrap_or(u64::MAX);
            }
        }

        trace!(deadline = slot.deadline, "timeout cancelled");
    }

    /// Strand-scheduled completion of an armed wait.
    /// 武装等待的完成回调，由 strand 调度执行。
    pub(crate) fn on_fire(&mut self, gen: u32) {
        self.assert_on_strand();
        debug_assert!(self.inflight > 0, "completion without an outstanding wait");
        self.inflight = self.inflight.saturating_sub(1);

        if gen != self.generation {
            // 被取代的等待；只结平 strand 保活账目。
            // A superseded wait; only settles the keep-alive balance.
            trace!(gen, current = self.generation, "stale wait completion dropped");
            self.release_strand_if_idle();
            return;
        }

        self.finish_time = 0;
        let now = clock::now_us();
        loop {
            let Some((key, bucket)) = self.index.first() else {
                self.looping = false;
                self.max_tick = u64::MAX;
                break;
            };
            if key > now + EXPIRE_SLACK_US {
                // 首个期限尚远，为其重新武装后退出。
                // The head deadline is still out; rearm for it and leave.
                self.finish_time = key;
                self.arm(key - now);
                return;
            }

            // 触发前与索引脱钩：重入的 schedule/cancel 看不到该桶，
            // 但它在竞技场中保持可寻址直至清空。
            // Detach from the index before firing: re-entrant
            // schedule/cancel cannot see the bucket, yet it stays
            // addressable in the arena until drained.
            self.index.remove(key);
            let mut fired: u64 = 0;
            loop {
                let Some(actor) = self.arena.get_mut(bucket).pop_front() else {
                    break;
                };
                if catch_unwind(AssertUnwindSafe(|| actor.on_timeout(&mut *self))).is_err() {
                    error!(deadline = key, "timeout handler panicked during sweep");
                }
                fired += 1;
            }
            self.arena.release(bucket);
            self.stats.fired += fired;
            trace!(deadline = key, count = fired, "expired bucket fired");
        }
        self.release_strand_if_idle();
    }

    /// Counters accumulated since construction.
    /// 构造以来累计的计数器。
    pub fn stats(&self) -> TimerStats {
        self.stats
    }

    /// Bucket pool statistics.
    /// 桶对象池统计信息。
    pub fn pool_stats(&self) -> PoolStats {
        self.arena.stats()
    }

    /// Handlers currently awaiting their deadline.
    /// 当前等待期限的 handler 数。
    pub fn pending(&self) -> u64 {
        self.stats.scheduled - self.stats.fired - self.stats.cancelled
    }

    /// Whether the timer holds no resources at all.
    /// 定时器是否完全不持有资源。
    pub fn is_idle(&self) -> bool {
        self.index.is_empty() && !self.looping && self.inflight == 0 && self.strong.is_none()
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    #[cfg(test)]
    pub(crate) fn distinct_deadlines(&self) -> usize {
        self.index.len()
    }

    /// Arms the wait with the next generation and accounts the completion.
    /// 以下一代号武装等待，并为完成回调记账。
    fn arm(&mut self, delay_us: u64) {
        self.generation = self.generation.wrapping_add(1);
        self.inflight += 1;
        self.wait.arm(delay_us, self.generation);
    }

    fn promote_strand(&mut self) {
        if self.strong.is_none() {
            self.strong = self.strand.upgrade();
            debug_assert!(
                self.strong.is_some(),
                "strand destroyed with its timer still in use"
            );
        }
    }

    fn release_strand_if_idle(&mut self) {
        if self.inflight == 0 && !self.looping && self.strong.take().is_some() {
            trace!("strand keep-alive released");
        }
    }

    fn assert_on_strand(&self) {
        debug_assert!(
            self.strand.running_on_strand(),
            "timer operation off its owning strand"
        );
    }
}

impl Drop for ActorTimer {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        debug_assert!(self.index.is_empty(), "timer dropped with pending deadlines");
        debug_assert!(
            !self.looping && self.inflight == 0,
            "timer dropped with an outstanding wait"
        );
        debug_assert!(self.strong.is_none(), "timer dropped while holding its strand");
    }
}
