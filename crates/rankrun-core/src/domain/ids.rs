//! RunId - 1 回の実行を識別する ID
//!
//! 同じ manifest を複数ランクが同時に読むので、ログを後から突き合わせるために
//! 実行ごとに ULID を振ります。ULID は先頭が timestamp なので、生成順でソートできます。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use crate::ports::Clock;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    /// Clock の時刻で RunId を生成
    ///
    /// テストでは FixedClock を渡すと timestamp 部分が固定されます。
    pub fn generate<C: Clock + ?Sized>(clock: &C) -> Self {
        let timestamp_ms = clock.now().timestamp_millis().max(0) as u64;
        Self(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};

    #[test]
    fn generated_id_carries_clock_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = FixedClock::new(at);

        let id = RunId::generate(&clock);
        assert_eq!(id.as_ulid().timestamp_ms(), at.timestamp_millis() as u64);
    }

    #[test]
    fn ids_from_same_instant_differ() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert_ne!(RunId::generate(&clock), RunId::generate(&clock));
    }

    #[test]
    fn display_has_run_prefix() {
        let id = RunId::from_ulid(Ulid::nil());
        assert_eq!(id.to_string(), format!("run-{}", Ulid::nil()));
    }

    #[test]
    fn serializes_as_plain_ulid_string() {
        let id = RunId::from_ulid(Ulid::nil());
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, format!("\"{}\"", Ulid::nil()));
    }
}
