//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the timer service library.
///
/// The timer core itself is assertion-based: scheduling preconditions are
/// caller contracts, not recoverable conditions. What can genuinely fail at
/// runtime is talking to a strand whose driver has already exited.
///
/// 定时器服务库的主要错误类型。
///
/// 定时器核心本身基于断言：调度前置条件是调用方契约，而非可恢复情况。
/// 真正可能在运行时失败的是与驱动已退出的 strand 通信。
#[derive(Debug, Error)]
pub enum Error {
    /// The strand's driver task has exited; no further work can be posted.
    /// strand 的驱动任务已退出，无法再提交任务。
    #[error("strand executor has shut down")]
    StrandClosed,

    /// A dispatched task was dropped before it could send its reply.
    /// 派发的任务在发送回复之前被丢弃。
    #[error("internal reply channel is broken")]
    ChannelClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
