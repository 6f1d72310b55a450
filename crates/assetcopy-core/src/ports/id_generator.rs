//! NameGenerator port - 名前生成の抽象化
//!
//! Asset 名は「固定プレフィックス + 一意 ID」です。
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidNameGenerator**: ULID ベース（本番用）

use crate::ports::Clock;
use ulid::Ulid;

/// NameGenerator は実行ごとに一意な名前を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（context に Arc で保持するため）
pub trait NameGenerator: Send + Sync {
    /// `prefix` の後ろに一意な ID を付けた名前を返す
    fn unique_name(&self, prefix: &str) -> String;
}

/// UlidNameGenerator は ULID ベースの名前生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// FixedClock を使うと timestamp 部分が固定になります。
pub struct UlidNameGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidNameGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> NameGenerator for UlidNameGenerator<C> {
    fn unique_name(&self, prefix: &str) -> String {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        format!("{prefix}{ulid}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn names_are_unique_and_prefixed() {
        let names = UlidNameGenerator::new(SystemClock);

        let a = names.unique_name("Burrito_");
        let b = names.unique_name("Burrito_");

        assert_ne!(a, b);
        assert!(a.starts_with("Burrito_"));
        assert_eq!(a.len(), "Burrito_".len() + 26);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let names = UlidNameGenerator::new(FixedClock::new(fixed_time));

        let a = names.unique_name("");
        let b = names.unique_name("");
        assert_ne!(a, b);

        let ts_a = Ulid::from_string(&a).unwrap().timestamp_ms();
        let ts_b = Ulid::from_string(&b).unwrap().timestamp_ms();
        assert_eq!(ts_a, ts_b);
        assert_eq!(ts_a, fixed_time.timestamp_millis() as u64);
    }
}
