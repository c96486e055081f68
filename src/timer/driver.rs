//! 一次性等待驱动
//! One-shot wait driver
//!
//! 定时器核心每次只武装一个底层等待。等待在独立任务中休眠，完成时把
//! 携带代号的回调投递回所属 strand；取消只是拨动一个 oneshot 扳机，
//! 被取消的等待仍会立刻投递其（过期的）完成回调——权威性完全由代号
//! 判定，完成状态本身不被携带。
//!
//! The timer core arms at most one underlying wait at a time. The wait
//! sleeps in its own task and, on completion, posts a generation-tagged
//! callback back onto the owning strand; cancellation merely flips a
//! oneshot lever, and a cancelled wait still delivers its (stale)
//! completion promptly. Authority is decided entirely by the generation;
//! the completion status itself is not even carried.

use crate::strand::WeakStrand;
use crate::timer::core::MAX_TIMEOUT_US;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::trace;

/// One-shot waitable timer bound to a strand.
/// 绑定到 strand 的一次性可等待定时器。
pub(crate) struct WaitTimer {
    strand: WeakStrand,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl WaitTimer {
    pub(crate) fn new(strand: WeakStrand) -> Self {
        Self {
            strand,
            cancel_tx: None,
        }
    }

    /// Arms a single-shot wait of `delay_us` microseconds carrying `gen`.
    /// A prior outstanding wait is cancelled; its completion still runs
    /// with the prior generation.
    ///
    /// 武装一次 `delay_us` 微秒、携带 `gen` 的一次性等待。先前未决的
    /// 等待会被取消；其完成回调仍会携带旧代号运行。
    pub(crate) fn arm(&mut self, delay_us: u64, gen: u32) {
        self.cancel();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.cancel_tx = Some(cancel_tx);

        let strand = self.strand.clone();
        let delay = Duration::from_micros(delay_us.min(MAX_TIMEOUT_US - 1));
        trace!(gen, delay_us, "arming one-shot wait");
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel_rx => {}
            }
            // 被取代的完成回调照常投递；代号将其判为过期。
            // A superseded completion is posted all the same; the
            // generation marks it stale.
            if let Some(strand) = strand.upgrade() {
                let _ = strand.post(move |ctx| ctx.timer().on_fire(gen));
            }
        });
    }

    /// Best-effort cancel of the outstanding wait, if any.
    /// 尽力取消未决等待（如有）。
    pub(crate) fn cancel(&mut self) {
        if let Some(lever) = self.cancel_tx.take() {
            let _ = lever.send(());
        }
    }
}
