//! 邮箱（Latest-Wins）发布机制
//!
//! 本模块提供两种跨线程交接原语，均为“新值覆盖旧值”，不排队、不反压：
//!
//! - [`Mailbox`]：快照邮箱。生产者发布不可变快照（`ArcSwap` 原子交换），
//!   任意数量的消费者读取最新快照。读取方永远看到某一次完整发布，
//!   不会看到两次发布混合的半成品。
//! - [`Slot`]：单槽邮箱。一个写入方 `put`，一个指定消费者 `take`，
//!   `take` 后插槽清空。用于标定点击、状态切换请求等离散事件。
//!
//! 慢消费者只会错过中间值，永远不会阻塞或拖慢生产者。

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// 一次发布的信封
///
/// `seq` 从 1 开始单调递增，每个邮箱独立计数。
#[derive(Debug)]
pub struct Envelope<T> {
    /// 发布序号（邮箱内单调递增）
    pub seq: u64,
    /// 发布时刻（单调时钟）
    pub published_at: Instant,
    /// 快照内容
    pub value: T,
}

impl<T> Envelope<T> {
    /// 距发布已经过去的时间
    pub fn age(&self) -> std::time::Duration {
        self.published_at.elapsed()
    }
}

/// 快照邮箱（单写者，多读者）
///
/// # 语义
///
/// - `publish()` 用新快照整体替换旧快照（原子指针交换，无锁）
/// - `latest()` 读取最新快照，不改变邮箱状态
/// - `read_newer()` 只返回比调用方已见序号更新的快照，并标记为已消费
///
/// 如果生产者发布时上一个快照还没有被任何 `read_newer()` 消费，
/// 旧快照被丢弃并计入 `overwrites()`。
///
/// # 示例
///
/// ```
/// use station_driver::mailbox::Mailbox;
///
/// let mailbox = Mailbox::new();
/// mailbox.publish(1u32);
/// mailbox.publish(2u32);
///
/// let latest = mailbox.latest().unwrap();
/// assert_eq!(latest.value, 2);
/// assert_eq!(mailbox.overwrites(), 1);
/// ```
pub struct Mailbox<T> {
    slot: ArcSwapOption<Envelope<T>>,
    next_seq: AtomicU64,
    consumed_seq: AtomicU64,
    overwrites: AtomicU64,
}

impl<T> Mailbox<T> {
    /// 创建空邮箱
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
            next_seq: AtomicU64::new(0),
            consumed_seq: AtomicU64::new(0),
            overwrites: AtomicU64::new(0),
        }
    }

    /// 发布新快照，返回其序号
    ///
    /// 从不阻塞：替换动作只是一次原子指针交换。
    pub fn publish(&self, value: T) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = Arc::new(Envelope {
            seq,
            published_at: Instant::now(),
            value,
        });

        if let Some(previous) = self.slot.swap(Some(envelope))
            && previous.seq > self.consumed_seq.load(Ordering::Acquire)
        {
            self.overwrites.fetch_add(1, Ordering::Relaxed);
        }

        seq
    }

    /// 读取最新快照（不标记消费）
    pub fn latest(&self) -> Option<Arc<Envelope<T>>> {
        self.slot.load_full()
    }

    /// 读取比 `after_seq` 更新的快照，并标记为已消费
    ///
    /// 没有新快照时返回 `None`。
    pub fn read_newer(&self, after_seq: u64) -> Option<Arc<Envelope<T>>> {
        let envelope = self.slot.load_full()?;
        if envelope.seq <= after_seq {
            return None;
        }
        self.consumed_seq.fetch_max(envelope.seq, Ordering::AcqRel);
        Some(envelope)
    }

    /// 已分配的最大序号（0 表示从未发布）
    pub fn last_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    /// 未被消费就被覆盖的快照数量
    pub fn overwrites(&self) -> u64 {
        self.overwrites.load(Ordering::Relaxed)
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 邮箱订阅者
///
/// 记住自己已经看过的序号，每次 `poll()` 只返回新快照。
/// 每个消费者持有自己的订阅者，互不影响。
pub struct MailboxReader<T> {
    mailbox: Arc<Mailbox<T>>,
    last_seen: u64,
}

impl<T> MailboxReader<T> {
    /// 创建订阅者（从当前状态开始，尚未看过任何快照）
    pub fn new(mailbox: Arc<Mailbox<T>>) -> Self {
        Self {
            mailbox,
            last_seen: 0,
        }
    }

    /// 获取新快照（如果有）
    pub fn poll(&mut self) -> Option<Arc<Envelope<T>>> {
        let envelope = self.mailbox.read_newer(self.last_seen)?;
        self.last_seen = envelope.seq;
        Some(envelope)
    }

    /// 上次读取到的序号
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

impl<T> Clone for MailboxReader<T> {
    fn clone(&self) -> Self {
        Self {
            mailbox: self.mailbox.clone(),
            last_seen: self.last_seen,
        }
    }
}

/// 单槽邮箱（一个写入方，一个消费者）
///
/// 锁只在放入/取出的一瞬间持有，从不跨越生产者的计算过程。
pub struct Slot<T> {
    inner: Mutex<Option<T>>,
    overwrites: AtomicU64,
}

impl<T> Slot<T> {
    /// 创建空插槽
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
            overwrites: AtomicU64::new(0),
        }
    }

    /// 放入新值，覆盖未取走的旧值
    ///
    /// # 返回
    ///
    /// 如果覆盖了未被消费的旧值，返回 `true`
    pub fn put(&self, value: T) -> bool {
        let replaced = self.inner.lock().replace(value).is_some();
        if replaced {
            self.overwrites.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// 取出当前值，插槽变为空
    pub fn take(&self) -> Option<T> {
        self.inner.lock().take()
    }

    /// 是否有未消费的值
    pub fn is_pending(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// 丢弃未消费的值
    pub fn clear(&self) {
        self.inner.lock().take();
    }

    /// 被覆盖（未消费即丢失）的次数
    pub fn overwrites(&self) -> u64 {
        self.overwrites.load(Ordering::Relaxed)
    }
}

impl<T: Clone> Slot<T> {
    /// 查看当前值但不取出
    pub fn peek(&self) -> Option<T> {
        self.inner.lock().clone()
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}
