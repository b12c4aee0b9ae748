//! Random row selection for statistical testing of fitted surfaces

use offsetfield_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// A shuffled subset holding `round(frac * n)` of `items`.
///
/// `frac = 1.0` returns every row in a random order, which removes any
/// ordering bias before contiguous fold splitting.
pub fn randomly_select_rows<T: Clone>(items: &[T], frac: f64, seed: u64) -> Result<Vec<T>> {
    if !(frac > 0.0 && frac <= 1.0) {
        return Err(Error::InvalidParameter {
            name: "frac",
            value: frac.to_string(),
            reason: "must be in (0, 1]".into(),
        });
    }
    let count = (frac * items.len() as f64).round() as usize;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(items
        .choose_multiple(&mut rng, count.min(items.len()))
        .cloned()
        .collect())
}
