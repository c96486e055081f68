//! 单调时钟
//! Monotonic clock
//!
//! 微秒刻度来自 [`tokio::time::Instant`] 相对进程纪元的流逝时间，
//! 因而在暂停的测试运行时下跟随虚拟时间。
//!
//! Microsecond ticks are the elapsed time of [`tokio::time::Instant`]
//! against a process epoch, so under a paused test runtime they follow
//! virtual time.

use std::sync::OnceLock;
use tokio::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Current monotonic tick in microseconds.
///
/// Non-decreasing across calls within the process. The epoch is captured
/// lazily on first use; absolute values are meaningless, only differences
/// matter.
///
/// 当前单调刻度（微秒）。
///
/// 在进程内各次调用间不递减。纪元在首次使用时惰性捕获；绝对值无意义，
/// 只有差值有意义。
pub fn now_us() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_micros() as u64
}
