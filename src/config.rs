//! 定义了 strand 定时器的可配置参数。
//! Defines configurable parameters for the strand timer.

/// A structure containing all configurable parameters for a strand's timer.
///
/// 包含一个 strand 的定时器所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Bucket pool-related parameters.
    /// 桶对象池相关参数。
    pub pool: PoolConfig,

    /// Node capacity pre-allocated inside a freshly created bucket. Buckets
    /// recycled through the pool keep whatever capacity they grew to.
    ///
    /// 新创建的桶内预分配的节点容量。经对象池回收的桶保留其已增长到的容量。
    pub initial_bucket_capacity: usize,
}

/// Bucket pool-related parameters.
///
/// 桶对象池相关参数。
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// The maximum number of released buckets the pool retains for reuse.
    /// A bucket released beyond this cap has its backing storage discarded.
    ///
    /// 对象池为复用而保留的已释放桶的最大数量。
    /// 超过此上限释放的桶会丢弃其底层存储。
    pub max_retained: usize,

    /// The number of empty buckets created up front, so the first schedule
    /// bursts do not pay for slot growth.
    ///
    /// 预先创建的空桶数量，使首批调度无需为槽位增长付出代价。
    pub initial_lists: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            initial_bucket_capacity: 8,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retained: 4096,
            initial_lists: 16,
        }
    }
}
