use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 行情回溯窗口的结束日期必须通过此接口获取。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// 正常运行时使用的真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试用固定时钟，保证回溯窗口可复现。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 保护当前时间，锁中毒时沿用中毒前的值。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 拨动时钟
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = match self.current_time.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        match self.current_time.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fake_clock_is_settable() {
        let start = Utc::now();
        let clock = FakeClockProvider::new(start);
        assert_eq!(clock.now(), start);

        clock.set_time(start + Duration::days(1));
        assert_eq!(clock.now(), start + Duration::days(1));
    }
}
