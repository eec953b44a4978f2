//! Completeness gate for acquired snapshots.
//!
//! A partial page load yields a truncated item list. Applying it would make
//! every missing item look removed, so snapshots that fall short of the
//! source's own reported total are rejected before they reach the catalog.

use super::snapshot::RawSnapshot;
use crate::error::SentinelError;

/// Fixed-point scale for tolerances (1.0 == 10 000).
const BPS_SCALE: u64 = 10_000;

/// Decides whether a [`RawSnapshot`] is complete enough to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletenessValidator {
    tolerance_bps: u64,
}

impl CompletenessValidator {
    /// Reference tolerance: at least 90 % of the reported total.
    pub const DEFAULT_TOLERANCE: f64 = 0.90;

    /// Creates a validator accepting snapshots with at least
    /// `tolerance * reported_total` items.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Config`] unless `0 < tolerance <= 1`.
    pub fn new(tolerance: f64) -> Result<Self, SentinelError> {
        if !tolerance.is_finite() || tolerance <= 0.0 || tolerance > 1.0 {
            return Err(SentinelError::Config(format!(
                "completeness tolerance must be in (0, 1], got {tolerance}"
            )));
        }
        // Bounded to 1..=10_000 by the check above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tolerance_bps = ((tolerance * BPS_SCALE as f64).round() as u64).max(1);
        Ok(Self { tolerance_bps })
    }

    /// Returns the configured tolerance as a fraction.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tolerance(&self) -> f64 {
        self.tolerance_bps as f64 / BPS_SCALE as f64
    }

    /// Accepts or rejects a snapshot.
    ///
    /// A `reported_total` of zero means the source count is unknown and the
    /// snapshot is accepted unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::IncompleteScrape`] when the observed count
    /// is below the tolerated fraction of the reported total.
    pub fn validate(&self, snapshot: &RawSnapshot) -> Result<(), SentinelError> {
        let expected = snapshot.reported_total;
        if expected == 0 {
            return Ok(());
        }

        let observed = snapshot.observed();
        let observed_scaled = u128::from(observed as u64) * u128::from(BPS_SCALE);
        let required_scaled = u128::from(expected) * u128::from(self.tolerance_bps);

        if observed_scaled >= required_scaled {
            Ok(())
        } else {
            Err(SentinelError::IncompleteScrape { observed, expected })
        }
    }
}

impl Default for CompletenessValidator {
    fn default() -> Self {
        Self {
            tolerance_bps: 9_000,
        }
    }
}
