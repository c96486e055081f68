//! 取消句柄
//! Cancellation handle

use crate::timer::pool::BucketId;

/// Addressing triple recorded at schedule time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HandleSlot {
    pub(crate) bucket: BucketId,
    pub(crate) node: u32,
    pub(crate) seq: u32,
    pub(crate) deadline: u64,
}

/// The opaque cancellation token returned by
/// [`schedule`](crate::timer::core::ActorTimer::schedule).
///
/// A handle is consumed at most once by
/// [`cancel`](crate::timer::core::ActorTimer::cancel); cancelling a null
/// handle is a no-op. Dropping a handle does nothing; cancellation is
/// always explicit. Consumers are expected to [`reset`](Self::reset) their
/// stored handle when the corresponding `on_timeout` runs; the firing has
/// already consumed it.
///
/// [`schedule`](crate::timer::core::ActorTimer::schedule) 返回的不透明
/// 取消令牌。
///
/// 句柄至多被 [`cancel`](crate::timer::core::ActorTimer::cancel) 消耗一次；
/// 取消空句柄是空操作。丢弃句柄不做任何事——取消总是显式的。消费方应在
/// 对应的 `on_timeout` 运行时 [`reset`](Self::reset) 其保存的句柄；触发
/// 已将其消耗。
#[derive(Debug, Default)]
pub struct TimerHandle {
    slot: Option<HandleSlot>,
}

impl TimerHandle {
    pub(crate) fn new(bucket: BucketId, node: u32, seq: u32, deadline: u64) -> Self {
        Self {
            slot: Some(HandleSlot {
                bucket,
                node,
                seq,
                deadline,
            }),
        }
    }

    /// A handle referring to nothing.
    /// 不指向任何目标的句柄。
    pub const fn null() -> Self {
        Self { slot: None }
    }

    /// Whether this handle refers to nothing.
    /// 本句柄是否不指向任何目标。
    pub fn is_null(&self) -> bool {
        self.slot.is_none()
    }

    /// Nulls the handle without touching the timer.
    /// 置空句柄，不触碰定时器。
    pub fn reset(&mut self) {
        self.slot = None;
    }

    /// The quantized absolute deadline this handle was scheduled for.
    /// 本句柄被调度到的量化绝对期限。
    pub fn deadline_us(&self) -> Option<u64> {
        self.slot.map(|s| s.deadline)
    }

    pub(crate) fn take(&mut self) -> Option<HandleSlot> {
        self.slot.take()
    }
}
