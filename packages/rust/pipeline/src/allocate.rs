//! Regional quota allocation with shortfall backfill.

use orgscout_shared::Region;
use serde::Serialize;

/// Per-region row quotas for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionTargets {
    pub na: usize,
    pub emea: usize,
}

impl RegionTargets {
    pub fn total(self) -> usize {
        self.na + self.emea
    }
}

/// Counts of rows (or candidates) per region. Candidates without a
/// definite side belong to neither bucket, so `na + emea` can fall short
/// of a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionMix {
    pub na: usize,
    pub emea: usize,
}

/// Split `total` rows between NA and EMEA: NA gets `ceil(total * ratio)`,
/// EMEA the rest.
pub fn allocate(total: usize, na_ratio: f64) -> RegionTargets {
    let na = ((total as f64) * na_ratio).ceil() as usize;
    let na = na.min(total);
    RegionTargets {
        na,
        emea: total - na,
    }
}

/// Quotas for a run: single-region runs put everything on their side,
/// `both` splits by ratio.
pub fn targets_for(region: Region, total: usize, na_ratio: f64) -> RegionTargets {
    match region {
        Region::Na => RegionTargets { na: total, emea: 0 },
        Region::Emea => RegionTargets { na: 0, emea: total },
        Region::Both => allocate(total, na_ratio),
    }
}

/// Shift quota a region cannot fill over to the other region, capped at
/// what that region's supply can absorb. The combined quota never grows.
pub fn backfill(targets: RegionTargets, available: RegionMix) -> RegionTargets {
    let total = targets.total();
    let mut na = targets.na.min(available.na);
    let mut emea = targets.emea.min(available.emea);

    let mut shortfall = total - na - emea;
    let extra_na = shortfall.min(available.na - na);
    na += extra_na;
    shortfall -= extra_na;
    emea += shortfall.min(available.emea - emea);

    RegionTargets { na, emea }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ratio_splits_fifty() {
        assert_eq!(allocate(50, 0.8), RegionTargets { na: 40, emea: 10 });
    }

    #[test]
    fn small_totals_round_toward_na() {
        assert_eq!(allocate(3, 0.8), RegionTargets { na: 3, emea: 0 });
        assert_eq!(allocate(1, 0.8), RegionTargets { na: 1, emea: 0 });
        assert_eq!(allocate(0, 0.8), RegionTargets { na: 0, emea: 0 });
    }

    #[test]
    fn single_region_runs_take_everything() {
        assert_eq!(
            targets_for(Region::Na, 10, 0.8),
            RegionTargets { na: 10, emea: 0 }
        );
        assert_eq!(
            targets_for(Region::Emea, 10, 0.8),
            RegionTargets { na: 0, emea: 10 }
        );
        assert_eq!(
            targets_for(Region::Both, 10, 0.8),
            RegionTargets { na: 8, emea: 2 }
        );
    }

    #[test]
    fn backfill_shifts_shortfall_to_the_supplied_side() {
        let targets = RegionTargets { na: 40, emea: 10 };
        // EMEA has only 2 candidates; NA supply covers the difference.
        let shifted = backfill(targets, RegionMix { na: 60, emea: 2 });
        assert_eq!(shifted, RegionTargets { na: 48, emea: 2 });
        assert_eq!(shifted.total(), 50);
    }

    #[test]
    fn backfill_never_exceeds_supply_or_total() {
        let targets = RegionTargets { na: 8, emea: 2 };
        let shifted = backfill(targets, RegionMix { na: 3, emea: 1 });
        assert_eq!(shifted, RegionTargets { na: 3, emea: 1 });

        // Oversupply on both sides leaves the base targets untouched.
        let kept = backfill(targets, RegionMix { na: 100, emea: 100 });
        assert_eq!(kept, targets);
    }
}
