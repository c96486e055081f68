//! 定时器回调契约
//! Timer callback contract

use crate::timer::core::ActorTimer;
use std::sync::Arc;

/// The callback contract an actor offers the timer service.
///
/// `on_timeout` runs inline on the owning strand during an expiry sweep.
/// It receives the timer back by `&mut` and may re-entrantly schedule new
/// deadlines or cancel other outstanding handles; the one thing it must
/// not do is cancel the handle being fired: the firing already consumed
/// it, and the consumer is expected to reset its stored handle when
/// `on_timeout` runs.
///
/// actor 向定时器服务提供的回调契约。
///
/// `on_timeout` 在到期清扫期间于所属 strand 上内联运行。它以 `&mut`
/// 收回定时器，可重入地调度新期限或取消其他未决句柄；唯一禁止的是
/// 取消正在触发的句柄——触发已消耗了它，消费方应在 `on_timeout`
/// 运行时重置其保存的句柄。
pub trait TimerActor: Send + Sync {
    /// Handle the expiry of a previously scheduled deadline.
    /// 处理先前调度的期限到期。
    fn on_timeout(&self, timer: &mut ActorTimer);
}

/// A strong, shared reference to an actor awaiting a timeout.
///
/// While a deadline is pending its bucket holds one of these, so the actor
/// cannot be destroyed from under the timer.
///
/// 指向等待超时的 actor 的共享强引用。
///
/// 期限未决期间其所在桶会持有一个此引用，因此 actor 不会在定时器
/// 之下被销毁。
pub type ActorRef = Arc<dyn TimerActor + Send + Sync>;
