//! Pure tier-table lookup (§4.8): the highest `min_score` band the hunter's
//! score clears, used for `entry_sol`/`add_sol`/`max_sol`/`stop_loss_pct`.

use crate::config::TierBand;

/// The best-qualifying tier for `score`, or `None` if it clears no band's
/// `min_score` (including the table's own `min_entry_score` floor, checked
/// by the caller before this runs).
pub fn find_tier(score: f64, tiers: &[TierBand]) -> Option<&TierBand> {
    tiers.iter().filter(|t| score >= t.min_score).max_by(|a, b| a.min_score.partial_cmp(&b.min_score).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Vec<TierBand> {
        vec![
            TierBand { min_score: 60.0, entry_sol: 0.04, add_sol: 0.04, max_sol: 0.12, stop_loss_pct: 85.0 },
            TierBand { min_score: 80.0, entry_sol: 0.08, add_sol: 0.08, max_sol: 0.24, stop_loss_pct: 80.0 },
            TierBand { min_score: 90.0, entry_sol: 0.15, add_sol: 0.15, max_sol: 0.45, stop_loss_pct: 75.0 },
        ]
    }

    #[test]
    fn picks_highest_qualifying_band() {
        let t = find_tier(85.0, &tiers()).unwrap();
        assert_eq!(t.min_score, 80.0);
    }

    #[test]
    fn exact_boundary_score_qualifies() {
        let t = find_tier(90.0, &tiers()).unwrap();
        assert_eq!(t.min_score, 90.0);
    }

    #[test]
    fn below_lowest_band_qualifies_for_nothing() {
        assert!(find_tier(40.0, &tiers()).is_none());
    }
}
