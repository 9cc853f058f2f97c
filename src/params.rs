//! Compile-time load-factor tuning.
//!
//! Graveyard tables are generic over a `GraveyardParams` implementation
//! rather than taking load-factor arguments at runtime: the ratios are
//! baked into the probe-length math (`full_threshold`, `rehashed_target`,
//! tombstone seeding period) closely enough that letting them vary at
//! runtime would mean carrying them as fields on every table instead of
//! as zero-cost associated constants.

/// Load-factor and tombstone-seeding knobs for a graveyard table.
///
/// `FULL_NUM/FULL_DEN` is the ceiling load factor: once `len` would exceed
/// `logical_size * FULL_NUM / FULL_DEN`, the table rehashes before the
/// insert that would cross it. `REHASHED_NUM/REHASHED_DEN` is the load
/// factor a rehash targets for the *new* table, which must be strictly
/// below the ceiling to leave room to grow again. `TOMBSTONE_RATIO`, if
/// set, seeds graveyard slack into the rehashed table; `None` disables
/// seeding entirely.
pub trait GraveyardParams: Clone + Default {
    const FULL_NUM: usize;
    const FULL_DEN: usize;
    const REHASHED_NUM: usize;
    const REHASHED_DEN: usize;
    const TOMBSTONE_RATIO: Option<(usize, usize)>;
}

/// Balanced default: fills to 7/8 before rehashing, rehashes back down to
/// 3/4, no tombstone seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultParams;

impl GraveyardParams for DefaultParams {
    const FULL_NUM: usize = 7;
    const FULL_DEN: usize = 8;
    const REHASHED_NUM: usize = 3;
    const REHASHED_DEN: usize = 4;
    const TOMBSTONE_RATIO: Option<(usize, usize)> = None;
}

/// Moderately dense, still without tombstone seeding: 9/10 ceiling, 9/11
/// rehash target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumLoadParams;

impl GraveyardParams for MediumLoadParams {
    const FULL_NUM: usize = 9;
    const FULL_DEN: usize = 10;
    const REHASHED_NUM: usize = 9;
    const REHASHED_DEN: usize = 11;
    const TOMBSTONE_RATIO: Option<(usize, usize)> = None;
}

/// High load factor (37/40 ceiling, 9/10 rehash target) with tombstone
/// seeding to keep hovering workloads from degrading probe lengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighLoadParams;

impl GraveyardParams for HighLoadParams {
    const FULL_NUM: usize = 37;
    const FULL_DEN: usize = 40;
    const REHASHED_NUM: usize = 9;
    const REHASHED_DEN: usize = 10;
    const TOMBSTONE_RATIO: Option<(usize, usize)> = Some((7, 10));
}

/// Very high load factor (97/100 ceiling, 96/100 rehash target), the
/// heaviest tombstone seeding of the three presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VeryHighLoadParams;

impl GraveyardParams for VeryHighLoadParams {
    const FULL_NUM: usize = 97;
    const FULL_DEN: usize = 100;
    const REHASHED_NUM: usize = 96;
    const REHASHED_DEN: usize = 100;
    const TOMBSTONE_RATIO: Option<(usize, usize)> = Some((72, 256));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceiling_below_one<P: GraveyardParams>() {
        assert!(P::FULL_NUM < P::FULL_DEN);
        assert!(P::REHASHED_NUM < P::REHASHED_DEN || P::REHASHED_NUM == P::REHASHED_DEN);
    }

    #[test]
    fn presets_have_sane_ratios() {
        ceiling_below_one::<DefaultParams>();
        ceiling_below_one::<MediumLoadParams>();
        ceiling_below_one::<HighLoadParams>();
        ceiling_below_one::<VeryHighLoadParams>();
    }

    #[test]
    fn rehash_target_stays_under_ceiling() {
        fn check<P: GraveyardParams>() {
            let logical_size = 1000;
            let ceiling = logical_size * P::FULL_NUM / P::FULL_DEN;
            let target = logical_size * P::REHASHED_NUM / P::REHASHED_DEN;
            assert!(target <= ceiling);
        }
        check::<DefaultParams>();
        check::<MediumLoadParams>();
        check::<HighLoadParams>();
        check::<VeryHighLoadParams>();
    }
}
