//! Pure scoring rules for fills, captures and cues.

use errand_core::{Cue, EntityKind};

/// Flat award for covering every claimable tile within a single capture.
pub const PERFECT_BONUS: u32 = 5_000;

/// Tiered score for a fill of `tiles` freshly claimed tiles, before the combo multiplier.
///
/// Each tier starts at or above the top of the tier below it, so the score never
/// decreases as fills grow. The per-tile rate rises tier by tier until the cap at
/// 135 tiles.
#[must_use]
pub const fn fill_score(tiles: u32) -> u32 {
    match tiles {
        135.. => 5_600,
        124.. => 4_500 + 100 * (tiles - 124),
        64.. => 1_500 + 50 * (tiles - 64),
        32.. => 500 + 25 * (tiles - 32),
        16.. => 100 + 10 * (tiles - 16),
        8.. => 10 + 5 * (tiles - 8),
        _ => tiles,
    }
}

/// Score for the `order`-th capture (1-indexed) of a single pipeline run.
#[must_use]
pub const fn kill_score(kind: EntityKind, order: u32) -> u32 {
    kind.kill_score().saturating_mul(order)
}

/// Cue announcing a fill of the given size.
#[must_use]
pub const fn fill_cue(tiles: usize) -> Cue {
    match tiles {
        0..=5 => Cue::FillSmall,
        6..=15 => Cue::FillMedium,
        16..=30 => Cue::FillLarge,
        _ => Cue::FillHuge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_fills_score_one_point_per_tile() {
        assert_eq!(fill_score(0), 0);
        assert_eq!(fill_score(1), 1);
        assert_eq!(fill_score(7), 7);
    }

    #[test]
    fn tier_anchors() {
        assert_eq!(fill_score(8), 10);
        assert_eq!(fill_score(9), 15);
        assert_eq!(fill_score(16), 100);
        assert_eq!(fill_score(32), 500);
        assert_eq!(fill_score(64), 1_500);
        assert_eq!(fill_score(123), 4_450);
        assert_eq!(fill_score(124), 4_500);
        assert_eq!(fill_score(134), 5_500);
        assert_eq!(fill_score(135), 5_600);
        assert_eq!(fill_score(400), 5_600);
    }

    #[test]
    fn fill_score_never_decreases() {
        let mut previous = 0;
        for tiles in 0..=400 {
            let score = fill_score(tiles);
            assert!(score >= previous, "score dropped at {tiles} tiles");
            previous = score;
        }
    }

    #[test]
    fn every_tier_starts_above_the_previous_top() {
        for start in [8, 16, 32, 64, 124, 135] {
            assert!(
                fill_score(start) > fill_score(start - 1),
                "tier starting at {start} does not clear the tier below"
            );
        }
    }

    #[test]
    fn per_tile_slope_grows_by_tier() {
        let slopes: Vec<u32> = [2, 10, 20, 40, 70, 126]
            .iter()
            .map(|&tiles| fill_score(tiles) - fill_score(tiles - 1))
            .collect();
        assert_eq!(slopes, vec![1, 5, 10, 25, 50, 100]);
    }

    #[test]
    fn kill_score_scales_with_order() {
        assert_eq!(kill_score(EntityKind::Red, 1), 200);
        assert_eq!(kill_score(EntityKind::Red, 2), 400);
        assert_eq!(kill_score(EntityKind::Blue, 3), 1_800);
        assert_eq!(kill_score(EntityKind::Snail, 4), 0);
    }

    #[test]
    fn fill_cue_tiers() {
        assert_eq!(fill_cue(1), Cue::FillSmall);
        assert_eq!(fill_cue(5), Cue::FillSmall);
        assert_eq!(fill_cue(6), Cue::FillMedium);
        assert_eq!(fill_cue(15), Cue::FillMedium);
        assert_eq!(fill_cue(30), Cue::FillLarge);
        assert_eq!(fill_cue(31), Cue::FillHuge);
    }
}
