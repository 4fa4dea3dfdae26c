use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use common::Candle;

/// Simple moving average over the most recent `window_size` closes.
///
/// When fewer than `window_size` candles are available `sufficient_data` is
/// false and `value` is zero; use [`MovingAverageSample::value`] to read it
/// safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovingAverageSample {
    pub value: Decimal,
    pub window_size: usize,
    pub sufficient_data: bool,
}

impl MovingAverageSample {
    fn insufficient(window_size: usize) -> Self {
        Self {
            value: Decimal::ZERO,
            window_size,
            sufficient_data: false,
        }
    }

    /// The average, or `None` when there was not enough data to compute it.
    pub fn value(&self) -> Option<Decimal> {
        self.sufficient_data.then_some(self.value)
    }
}

/// Short MA relative to long MA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Above,
    Below,
    /// Either average is missing, or the two are exactly equal.
    #[default]
    Unknown,
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relationship::Above => write!(f, "above"),
            Relationship::Below => write!(f, "below"),
            Relationship::Unknown => write!(f, "unknown"),
        }
    }
}

/// Arithmetic mean of the `window_size` most recent closes.
///
/// "Most recent" is decided by `open_time`, not by slice position: the venue
/// returns candles newest-first, but the candles are re-ordered here so a feed
/// that changes its ordering cannot silently shift the window onto old data.
pub fn moving_average(candles: &[Candle], window_size: usize) -> MovingAverageSample {
    if window_size == 0 || candles.len() < window_size {
        return MovingAverageSample::insufficient(window_size);
    }

    let mut newest_first: Vec<&Candle> = candles.iter().collect();
    newest_first.sort_by(|a, b| b.open_time.cmp(&a.open_time));

    // Closes outside the representable range are unusable data, not a crash.
    let Some(sum) = newest_first
        .iter()
        .take(window_size)
        .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(c.close))
    else {
        return MovingAverageSample::insufficient(window_size);
    };

    MovingAverageSample {
        value: sum / Decimal::from(window_size),
        window_size,
        sufficient_data: true,
    }
}

/// Classify short vs long. Equality is no signal.
pub fn classify_relationship(short: &MovingAverageSample, long: &MovingAverageSample) -> Relationship {
    match (short.value(), long.value()) {
        (Some(s), Some(l)) if s > l => Relationship::Above,
        (Some(s), Some(l)) if s < l => Relationship::Below,
        _ => Relationship::Unknown,
    }
}
