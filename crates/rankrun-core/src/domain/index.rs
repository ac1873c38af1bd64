//! BatchIndex / IndexMode - 担当する manifest 行の決定
//!
//! 既定（Batch）では batch index M がそのまま行番号になります。rank は行の選択に
//! 使わず、起動するジョブへの引数としてだけ渡します。
//! Strided は `M * world_size + rank` で、同じ M のランクがそれぞれ別の行を担当します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::RankrunError;
use super::fabric::FabricContext;

/// Non-negative batch offset supplied on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchIndex(u64);

impl BatchIndex {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BatchIndex {
    type Err = RankrunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i128 = trimmed
            .parse()
            .map_err(|e| RankrunError::invalid_index(s, format!("not an integer ({e})")))?;
        if value < 0 {
            return Err(RankrunError::invalid_index(s, "must not be negative"));
        }
        let value = u64::try_from(value)
            .map_err(|_| RankrunError::invalid_index(s, "too large"))?;
        Ok(Self(value))
    }
}

/// 行番号の計算方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// line = M
    #[default]
    Batch,
    /// line = M * world_size + rank
    Strided,
}

impl IndexMode {
    /// 0 始まりの行番号を返す
    pub fn line_index(&self, batch: BatchIndex, ctx: &FabricContext) -> Result<u64, RankrunError> {
        match self {
            Self::Batch => Ok(batch.get()),
            Self::Strided => batch
                .get()
                .checked_mul(u64::from(ctx.world_size()))
                .and_then(|base| base.checked_add(u64::from(ctx.rank())))
                .ok_or_else(|| {
                    RankrunError::invalid_index(
                        batch.to_string(),
                        format!("strided line index overflows for world size {}", ctx.world_size()),
                    )
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("1", 1)]
    #[case(" 42 ", 42)]
    #[case("18446744073709551615", u64::MAX)]
    fn parses_non_negative_integers(#[case] input: &str, #[case] expected: u64) {
        let batch: BatchIndex = input.parse().unwrap();
        assert_eq!(batch.get(), expected);
    }

    #[rstest]
    #[case::negative("-1")]
    #[case::negative_large("-9999999999")]
    #[case::not_a_number("abc")]
    #[case::empty("")]
    #[case::fraction("1.5")]
    #[case::too_large("18446744073709551616")]
    fn rejects_malformed_input(#[case] input: &str) {
        let err = input.parse::<BatchIndex>().unwrap_err();
        assert!(matches!(err, RankrunError::InvalidIndex { .. }), "{err}");
    }

    #[rstest]
    #[case::batch_ignores_rank(IndexMode::Batch, 5, 3, 4, 5)]
    #[case::strided_first_batch(IndexMode::Strided, 0, 3, 4, 3)]
    #[case::strided_second_batch(IndexMode::Strided, 2, 1, 4, 9)]
    fn computes_line_index(
        #[case] mode: IndexMode,
        #[case] batch: u64,
        #[case] rank: u32,
        #[case] world_size: u32,
        #[case] expected: u64,
    ) {
        let ctx = FabricContext::new(rank, world_size).unwrap();
        assert_eq!(mode.line_index(BatchIndex::new(batch), &ctx).unwrap(), expected);
    }

    #[test]
    fn strided_overflow_is_invalid_index() {
        let ctx = FabricContext::new(1, 2).unwrap();
        let err = IndexMode::Strided
            .line_index(BatchIndex::new(u64::MAX), &ctx)
            .unwrap_err();
        assert!(matches!(err, RankrunError::InvalidIndex { .. }));
    }
}
