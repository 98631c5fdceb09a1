//! Tunables of the optimizer.

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub acceptance: AcceptancePolicy,
    pub reconciliation: Reconciliation,
    /// The priority phase may lose at most this much value compared to the
    /// value maximizing phase before its result is thrown away.
    pub priority_tolerance: f64,
}

impl Config {
    pub const DEFAULT_PRIORITY_TOLERANCE: f64 = 0.001;

    /// Checks that all values are usable.
    pub fn validate(self) -> Result<Self, Error> {
        if !(self.priority_tolerance.is_finite() && self.priority_tolerance >= 0.0) {
            return Err(Error::PriorityTolerance(self.priority_tolerance));
        }
        if let AcceptancePolicy::Threshold {
            min_gain,
            min_gain_ratio,
        } = self.acceptance
        {
            if !min_gain.is_finite() {
                return Err(Error::MinGain(min_gain));
            }
            if !min_gain_ratio.is_finite() {
                return Err(Error::MinGainRatio(min_gain_ratio));
            }
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acceptance: AcceptancePolicy::default(),
            reconciliation: Reconciliation::default(),
            priority_tolerance: Self::DEFAULT_PRIORITY_TOLERANCE,
        }
    }
}

/// When an optimized assignment replaces the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AcceptancePolicy {
    /// Accept whenever the optimized assignment is worth at least as much as
    /// the baseline.
    #[default]
    NonNegative,
    /// Accept only when the gain exceeds both an absolute amount and a ratio
    /// of the baseline value. A zero baseline has no ratio and is rejected.
    Threshold { min_gain: f64, min_gain_ratio: f64 },
}

impl AcceptancePolicy {
    pub const DEFAULT_MIN_GAIN: f64 = 0.075;
    pub const DEFAULT_MIN_GAIN_RATIO: f64 = 0.005;

    pub fn threshold() -> Self {
        Self::Threshold {
            min_gain: Self::DEFAULT_MIN_GAIN,
            min_gain_ratio: Self::DEFAULT_MIN_GAIN_RATIO,
        }
    }

    /// Whether a gain of `gain_amount` (and `gain_ratio` of the baseline)
    /// is enough.
    pub fn accepts(&self, gain_amount: f64, gain_ratio: Option<f64>) -> bool {
        match *self {
            AcceptancePolicy::NonNegative => gain_amount >= 0.0,
            AcceptancePolicy::Threshold {
                min_gain,
                min_gain_ratio,
            } => gain_amount > min_gain && gain_ratio.is_some_and(|ratio| ratio > min_gain_ratio),
        }
    }
}

/// What happens to placements after value maximization when no priority
/// function is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reconciliation {
    /// Keep bids on their original placement wherever possible and fill the
    /// remaining placements in encounter order.
    #[default]
    Positional,
    /// Swap pairs of bids back onto the placements they came from.
    Swap,
    /// Use the value maximizing assignment as solved.
    None,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("priority tolerance must be a non-negative number, got {0}")]
    PriorityTolerance(f64),
    #[error("minimum gain must be a finite number, got {0}")]
    MinGain(f64),
    #[error("minimum gain ratio must be a finite number, got {0}")]
    MinGainRatio(f64),
}
