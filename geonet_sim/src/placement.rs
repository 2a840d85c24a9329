//! Deterministic sensor placement.

use crate::error::SimError;
use geonet_core::{Callbacks, Sensor};
use geonet_env::{Bounds, Coordinate, SensorId};
use rand::Rng;

/// Picks `amount` distinct integer cells of `bounds`, uniformly at random.
///
/// The same RNG state always yields the same cells in the same order.
pub fn random_cells<R: Rng + ?Sized>(
    rng: &mut R,
    bounds: Bounds,
    amount: usize,
) -> Result<Vec<Coordinate>, SimError> {
    let cells = bounds.area();
    if amount as u64 > cells {
        return Err(SimError::FieldTooSmall {
            requested: amount,
            cells,
        });
    }

    let width = bounds.width as usize;
    Ok(rand::seq::index::sample(rng, cells as usize, amount)
        .into_iter()
        .map(|i| Coordinate::new((i % width) as f64, (i / width) as f64))
        .collect())
}

/// Creates `amount` sensors on distinct random cells, each starting with a
/// copy of `initial_state` and sharing `callbacks`.
///
/// Ids are derived from `id_base + index` so reruns with the same seed
/// produce the same network.
pub fn create_sensors<S: Clone, R: Rng + ?Sized>(
    rng: &mut R,
    bounds: Bounds,
    amount: usize,
    id_base: u64,
    initial_state: S,
    callbacks: &Callbacks<S>,
) -> Result<Vec<Sensor<S>>, SimError> {
    random_cells(rng, bounds, amount)?
        .into_iter()
        .enumerate()
        .map(|(i, position)| -> Result<Sensor<S>, SimError> {
            let id = SensorId::from_seed(id_base.wrapping_add(i as u64));
            Ok(Sensor::with_id(id, position, initial_state.clone())?.with_callbacks(callbacks.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_cells_are_distinct_and_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let bounds = Bounds::square(10);
        let cells = random_cells(&mut rng, bounds, 60).unwrap();

        assert_eq!(cells.len(), 60);
        assert!(cells.iter().all(|c| bounds.contains(*c)));
        let unique: HashSet<Coordinate> = cells.iter().copied().collect();
        assert_eq!(unique.len(), 60);
    }

    #[test]
    fn test_full_field_is_allowed_overflow_is_not() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(random_cells(&mut rng, Bounds::square(4), 16).unwrap().len(), 16);
        assert!(matches!(
            random_cells(&mut rng, Bounds::square(4), 17),
            Err(SimError::FieldTooSmall { requested: 17, cells: 16 })
        ));
    }

    #[test]
    fn test_placement_is_deterministic() {
        let a = random_cells(&mut ChaCha8Rng::seed_from_u64(42), Bounds::square(55), 30).unwrap();
        let b = random_cells(&mut ChaCha8Rng::seed_from_u64(42), Bounds::square(55), 30).unwrap();
        let c = random_cells(&mut ChaCha8Rng::seed_from_u64(43), Bounds::square(55), 30).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_create_sensors_shares_state_template() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sensors = create_sensors(&mut rng, Bounds::square(20), 5, 100, 3u8, &Callbacks::new()).unwrap();

        assert_eq!(sensors.len(), 5);
        assert!(sensors.iter().all(|s| *s.state() == 3));
        assert_eq!(sensors[0].id(), SensorId::from_seed(100));
        assert_eq!(sensors[4].id(), SensorId::from_seed(104));
    }
}
