//! 急停锁存
//!
//! 急停是一个显式的两状态机：`Normal → Estopped → Normal`。
//!
//! - 任何线程都可以置位（操作员按钮、控制循环检测到执行器故障）
//! - 只有操作员的复位动作可以清除，任何循环都不会自动清除

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// 安全状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SafetyState {
    /// 正常运行（默认）
    #[default]
    Normal = 0,

    /// 急停已锁存
    ///
    /// 控制循环每个周期都驱动执行器进入安全/空闲状态，拒绝一切运动指令。
    Estopped = 1,
}

impl SafetyState {
    /// 从 u8 转换
    ///
    /// 未知值按 `Estopped` 处理（安全侧）。
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Normal,
            _ => Self::Estopped,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否处于急停状态
    pub fn is_estopped(self) -> bool {
        self == Self::Estopped
    }
}

/// 急停锁存（原子版本，用于线程间共享）
///
/// # 示例
///
/// ```
/// use station_driver::estop::{EstopLatch, SafetyState};
///
/// let latch = EstopLatch::new();
/// assert!(latch.assert_estop());      // 首次置位
/// assert!(!latch.assert_estop());     // 重复置位无效果
/// assert_eq!(latch.state(), SafetyState::Estopped);
///
/// assert!(latch.reset());
/// assert_eq!(latch.state(), SafetyState::Normal);
/// ```
#[derive(Debug, Default)]
pub struct EstopLatch {
    state: AtomicU8,
    /// 锁存次数（Normal → Estopped 的转换次数）
    trips: AtomicU64,
}

impl EstopLatch {
    /// 创建新的锁存（Normal）
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态
    pub fn state(&self) -> SafetyState {
        SafetyState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 是否处于急停
    pub fn is_asserted(&self) -> bool {
        self.state().is_estopped()
    }

    /// 置位急停
    ///
    /// # 返回
    ///
    /// 如果本次调用完成了 `Normal → Estopped` 的转换，返回 `true`；
    /// 已经处于急停时返回 `false`。
    pub fn assert_estop(&self) -> bool {
        let tripped = self
            .state
            .compare_exchange(
                SafetyState::Normal.as_u8(),
                SafetyState::Estopped.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if tripped {
            self.trips.fetch_add(1, Ordering::Relaxed);
        }
        tripped
    }

    /// 复位急停（操作员动作）
    ///
    /// # 返回
    ///
    /// 如果本次调用完成了 `Estopped → Normal` 的转换，返回 `true`。
    pub fn reset(&self) -> bool {
        self.state
            .compare_exchange(
                SafetyState::Estopped.as_u8(),
                SafetyState::Normal.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// 累计锁存次数
    pub fn trips(&self) -> u64 {
        self.trips.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_safety_state_conversions() {
        assert_eq!(SafetyState::Normal.as_u8(), 0);
        assert_eq!(SafetyState::Estopped.as_u8(), 1);
        assert_eq!(SafetyState::from_u8(0), SafetyState::Normal);
        assert_eq!(SafetyState::from_u8(1), SafetyState::Estopped);
        assert_eq!(SafetyState::from_u8(42), SafetyState::Estopped); // 未知值 -> 安全侧
        assert_eq!(SafetyState::default(), SafetyState::Normal);
    }

    #[test]
    fn test_latch_is_sticky() {
        let latch = EstopLatch::new();
        assert!(!latch.is_asserted());

        assert!(latch.assert_estop());
        for _ in 0..10 {
            assert!(!latch.assert_estop());
            assert!(latch.is_asserted());
        }
        assert_eq!(latch.trips(), 1);
    }

    #[test]
    fn test_reset_only_from_estopped() {
        let latch = EstopLatch::new();
        assert!(!latch.reset());

        latch.assert_estop();
        assert!(latch.reset());
        assert!(!latch.is_asserted());
        assert!(!latch.reset());
    }

    #[test]
    fn test_concurrent_assert_trips_once() {
        let latch = Arc::new(EstopLatch::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.assert_estop())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(latch.trips(), 1);
    }
}
