//! Strand —— 串行执行上下文
//! Strand: serial execution context
//!
//! 该模块实现定时器所嵌入的串行执行上下文：提交到同一 strand 的任务
//! 绝不并发运行。每个 strand 的驱动任务拥有一个 [`StrandContext`]，
//! 其中持有该 strand 专属的 [`ActorTimer`]。
//!
//! This module implements the serial execution context the timer embeds
//! into: tasks posted to the same strand never run concurrently. Each
//! strand's driver task owns a [`StrandContext`] holding that strand's
//! dedicated [`ActorTimer`].

use crate::config::TimerConfig;
use crate::error::{Error, Result};
use crate::timer::core::ActorTimer;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// A unit of work executed on a strand.
/// 在 strand 上执行的工作单元。
pub(crate) type StrandTask = Box<dyn FnOnce(&mut StrandContext) + Send + 'static>;

/// Process-unique identifier of a strand, used for on-strand assertions.
/// strand 的进程内唯一标识，用于在线程断言。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrandId(u64);

impl StrandId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

thread_local! {
    /// The strand currently executing a task on this thread, if any.
    /// 当前在本线程上执行任务的 strand（如有）。
    static ACTIVE_STRAND: Cell<Option<StrandId>> = const { Cell::new(None) };
}

/// Scope guard marking the running strand for the duration of one task.
struct ActiveStrandGuard {
    prev: Option<StrandId>,
}

impl ActiveStrandGuard {
    fn enter(id: StrandId) -> Self {
        let prev = ACTIVE_STRAND.with(|c| c.replace(Some(id)));
        Self { prev }
    }
}

impl Drop for ActiveStrandGuard {
    fn drop(&mut self) {
        ACTIVE_STRAND.with(|c| c.set(self.prev));
    }
}

struct StrandShared {
    tx: mpsc::UnboundedSender<StrandTask>,
    id: StrandId,
}

/// A cloneable strong handle to a strand.
///
/// The strand's driver task keeps running for as long as at least one
/// strong handle exists: either a user-held [`Strand`] or the promotion
/// the strand's own timer holds while deadlines are outstanding.
///
/// strand 的可克隆强句柄。
///
/// 只要存在至少一个强句柄（用户持有的 [`Strand`]，或该 strand 自身定时器
/// 在存在未决期限时所持的提升引用），驱动任务就会持续运行。
#[derive(Clone)]
pub struct Strand {
    shared: Arc<StrandShared>,
}

/// A non-owning handle to a strand.
/// strand 的非拥有句柄。
#[derive(Clone)]
pub struct WeakStrand {
    shared: Weak<StrandShared>,
    id: StrandId,
}

/// Per-strand state owned by the driver task and handed to every posted
/// task by `&mut`. Serial execution makes this the timer's single-owner
/// home: no locks anywhere in the timer core.
///
/// 驱动任务拥有、并以 `&mut` 交给每个已提交任务的 strand 级状态。
/// 串行执行使其成为定时器的单一所有者居所：定时器核心中没有任何锁。
pub struct StrandContext {
    timer: ActorTimer,
}

impl StrandContext {
    fn new(strand: WeakStrand, config: TimerConfig) -> Self {
        Self {
            timer: ActorTimer::new(strand, config),
        }
    }

    /// The timer service bound to this strand.
    /// 绑定到本 strand 的定时器服务。
    pub fn timer(&mut self) -> &mut ActorTimer {
        &mut self.timer
    }
}

impl Strand {
    /// Spawns a new strand with the default timer configuration.
    /// 以默认定时器配置启动一个新的 strand。
    ///
    /// Must be called from within a tokio runtime.
    /// 必须在 tokio 运行时内调用。
    pub fn spawn() -> Self {
        Self::spawn_with_config(TimerConfig::default())
    }

    /// Spawns a new strand with the given timer configuration.
    /// 以给定的定时器配置启动一个新的 strand。
    pub fn spawn_with_config(config: TimerConfig) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StrandTask>();
        let id = StrandId::next();
        let shared = Arc::new(StrandShared { tx, id });
        let strand = Self { shared };
        let weak = strand.downgrade();

        tokio::spawn(async move {
            let mut ctx = StrandContext::new(weak, config);
            debug!(strand = id.0, "strand driver started");
            // recv 只有在全部强句柄消失且队列排空后才返回 None。
            // recv returns None only once every strong handle is gone and
            // the queue has drained.
            while let Some(task) = rx.recv().await {
                let _guard = ActiveStrandGuard::enter(id);
                task(&mut ctx);
            }
            debug!(strand = id.0, "strand driver stopped");
        });

        strand
    }

    /// Posts a task onto the strand. Tasks run in post order, one at a time.
    /// 向 strand 提交一个任务。任务按提交顺序逐一运行。
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StrandContext) + Send + 'static,
    {
        self.shared
            .tx
            .send(Box::new(f))
            .map_err(|_| Error::StrandClosed)
    }

    /// Posts a task and awaits its return value.
    /// 提交一个任务并等待其返回值。
    pub async fn dispatch<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut StrandContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(move |ctx| {
            let _ = reply_tx.send(f(ctx));
        })?;
        reply_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Whether the calling code is currently executing a task of this strand.
    /// 调用方当前是否正在执行本 strand 的任务。
    pub fn running_on_strand(&self) -> bool {
        ACTIVE_STRAND.with(|c| c.get()) == Some(self.shared.id)
    }

    /// This strand's identifier.
    /// 本 strand 的标识。
    pub fn id(&self) -> StrandId {
        self.shared.id
    }

    /// Creates a non-owning handle to this strand.
    /// 创建本 strand 的非拥有句柄。
    pub fn downgrade(&self) -> WeakStrand {
        WeakStrand {
            shared: Arc::downgrade(&self.shared),
            id: self.shared.id,
        }
    }
}

impl WeakStrand {
    /// Attempts to promote to a strong handle.
    /// 尝试提升为强句柄。
    pub fn upgrade(&self) -> Option<Strand> {
        let strand = self.shared.upgrade().map(|shared| Strand { shared });
        if strand.is_none() {
            trace!(strand = self.id.0, "weak strand upgrade failed");
        }
        strand
    }

    /// Whether the calling code is currently executing a task of this strand.
    /// Usable without promoting, even after the strand has died.
    ///
    /// 调用方当前是否正在执行本 strand 的任务。无需提升即可使用，
    /// 即使 strand 已终止。
    pub fn running_on_strand(&self) -> bool {
        ACTIVE_STRAND.with(|c| c.get()) == Some(self.id)
    }

    /// The identified strand's id.
    /// 所标识 strand 的 id。
    pub fn id(&self) -> StrandId {
        self.id
    }
}

impl std::fmt::Debug for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strand").field("id", &self.shared.id).finish()
    }
}

impl std::fmt::Debug for WeakStrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakStrand").field("id", &self.id).finish()
    }
}
