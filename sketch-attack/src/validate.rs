//! Sketch parameter sanity check.
//!
//! Before spending simulation time on a geometry we make sure the sketch
//! recovers a synthetic weight vector exactly over several independent draws.
//! A geometry that cannot (too many keys per bucket for the median to hide
//! collisions) would bias every attack run on it.

use crate::{
    config::{SketchConfig, WeightProfile},
    error::SketchError,
    sketch::{Sketch, WeightVector},
};
use rand::Rng;
use tracing::{debug, info, warn};

/// Cumulative absolute decode error of the validation vector over
/// `nof_checks` fresh draws.
pub fn round_trip_error<R: Rng + ?Sized>(
    config: &SketchConfig,
    tail_size: u64,
    profile: &WeightProfile,
    nof_checks: usize,
    rng: &mut R,
) -> Result<f64, SketchError> {
    let weights = WeightVector::generate(config, tail_size, profile);
    let mut sketch = Sketch::draw(config, rng)?;
    let mut total = 0.0;
    for check in 0..nof_checks {
        if check > 0 {
            sketch.redraw(rng);
        }
        let estimates = sketch.decode(&sketch.encode(&weights)?)?;
        let error = estimates.total_abs_error(&weights);
        debug!(check, error, "round trip check");
        total += error;
    }
    Ok(total)
}

/// Pass iff every one of `nof_checks` draws decodes the validation vector
/// exactly.
///
/// Geometries that cannot be drawn at all are reported as failures rather
/// than errors.
pub fn check_parameters<R: Rng + ?Sized>(
    config: &SketchConfig,
    tail_size: u64,
    profile: &WeightProfile,
    nof_checks: usize,
    rng: &mut R,
) -> bool {
    info!(
        "testing parameters l = {}, b = {}, k = {}",
        config.depth, config.width, config.keys
    );
    match round_trip_error(config, tail_size, profile, nof_checks, rng) {
        Ok(total) => {
            if total != 0.0 {
                debug!(total, "validation vector not recovered");
            }
            total == 0.0
        }
        Err(err) => {
            warn!("cannot validate sketch l = {}, b = {}: {}", config.depth, config.width, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VALIDATION_CHECKS;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn check(config: SketchConfig, seed: u64) -> bool {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        check_parameters(
            &config,
            1000,
            &WeightProfile::default(),
            DEFAULT_VALIDATION_CHECKS,
            &mut rng,
        )
    }

    #[test]
    fn test_reference_geometry_passes() {
        let config = SketchConfig::from_ratio(30, 100, 3).unwrap();
        assert!(check(config, 1));
        assert!(check(SketchConfig::from_ratio(60, 100, 3).unwrap(), 2));
    }

    #[test]
    fn test_overfull_lines_fail() {
        // Two keys, one bucket: every line collides, and with an odd depth
        // each weak estimate is 0 or 2x the true weight.
        assert!(!check(SketchConfig::new(1, 101, 2), 3));
        // More keys than buckets on a wider sketch.
        assert!(!check(SketchConfig::new(5, 1, 8), 4));
    }

    #[test]
    fn test_single_line_with_likely_collisions_fails() {
        // One line of four keys in four buckets is collision-free with
        // probability 4!/4^4 per draw.
        assert!(!check(SketchConfig::new(4, 1, 4), 5));
    }

    #[test]
    fn test_undrawable_geometry_reports_failure() {
        assert!(!check(SketchConfig::new(0, 100, 2), 6));
        assert!(!check(SketchConfig::new(30, 0, 10), 6));
    }

    #[test]
    fn test_round_trip_error_is_zero_without_collisions() {
        // One key per line can never collide.
        let config = SketchConfig::new(10, 7, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let error =
            round_trip_error(&config, 1000, &WeightProfile::default(), 25, &mut rng).unwrap();
        assert_eq!(error, 0.0);
    }
}
