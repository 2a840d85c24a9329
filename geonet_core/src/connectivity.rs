//! Geometric connection rules.
//!
//! A rule decides, for an unordered pair of sensors drawn from a candidate
//! set, whether they should be linked. Rules are pure: they see positions
//! only, never queues or state, so evaluating one cannot disturb the graph.
//!
//! | Rule                    | Links `a`-`b` iff                                   |
//! |-------------------------|-----------------------------------------------------|
//! | [`UnitDisk`]            | `distance(a, b) <= r`                               |
//! | [`UnitDisk::autotuned`] | as above, `r` = largest MST edge of the candidates  |
//! | [`Gabriel`]             | no other candidate lies in the circle with diameter `ab` |

use crate::mst;
use geonet_env::{Coordinate, GeoNetError, SensorId};

/// A sensor as seen by a connection rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPoint {
    pub id: SensorId,
    pub position: Coordinate,
}

impl SensorPoint {
    pub fn new(id: SensorId, position: Coordinate) -> Self {
        Self { id, position }
    }
}

/// Decides whether two candidate sensors should share an edge.
pub trait ConnectionRule {
    fn should_connect(&self, a: &SensorPoint, b: &SensorPoint, candidates: &[SensorPoint]) -> bool;
}

impl<F> ConnectionRule for F
where
    F: Fn(&SensorPoint, &SensorPoint, &[SensorPoint]) -> bool,
{
    fn should_connect(&self, a: &SensorPoint, b: &SensorPoint, candidates: &[SensorPoint]) -> bool {
        self(a, b, candidates)
    }
}

/// Fixed-radius unit-disk rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDisk {
    radius: f64,
}

impl UnitDisk {
    /// Creates a rule with the given radius. Rejects negative or non-finite radii.
    pub fn new(radius: f64) -> Result<Self, GeoNetError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(GeoNetError::invalid(format!(
                "unit-disk radius must be finite and non-negative, got {}",
                radius
            )));
        }
        Ok(Self { radius })
    }

    /// Picks the smallest radius that keeps `candidates` connected.
    ///
    /// The radius is the heaviest edge of a minimum spanning tree over the
    /// complete distance graph of the candidates. The tree is built on a
    /// scratch edge list, so no graph is touched. Fewer than two candidates
    /// give a radius of `0.0`.
    pub fn autotuned(candidates: &[SensorPoint]) -> Self {
        let points: Vec<Coordinate> = candidates.iter().map(|p| p.position).collect();
        let radius = mst::bottleneck_radius(&points);
        tracing::debug!(candidates = candidates.len(), radius, "Auto-tuned unit-disk radius");
        Self { radius }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl ConnectionRule for UnitDisk {
    fn should_connect(&self, a: &SensorPoint, b: &SensorPoint, _candidates: &[SensorPoint]) -> bool {
        a.position.distance(&b.position) <= self.radius
    }
}

/// Empty-circle rule: `a` and `b` connect iff no third candidate lies in or
/// on the circle whose diameter is the segment `ab`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Gabriel;

impl ConnectionRule for Gabriel {
    fn should_connect(&self, a: &SensorPoint, b: &SensorPoint, candidates: &[SensorPoint]) -> bool {
        // Radius measured from `a` to the midpoint, not halved from |ab|
        let mid = a.position.midpoint(&b.position);
        let radius = a.position.distance(&mid);

        candidates
            .iter()
            .filter(|c| c.id != a.id && c.id != b.id)
            .all(|c| c.position.distance(&mid) > radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(seed: u64, x: f64, y: f64) -> SensorPoint {
        SensorPoint::new(SensorId::from_seed(seed), Coordinate::new(x, y))
    }

    fn points_from(coords: &[(f64, f64)]) -> Vec<SensorPoint> {
        coords
            .iter()
            .enumerate()
            .map(|(i, (x, y))| point(i as u64, *x, *y))
            .collect()
    }

    #[test]
    fn test_unit_disk_threshold_is_inclusive() {
        let rule = UnitDisk::new(1.5).unwrap();
        let a = point(0, 0.0, 0.0);
        let b = point(1, 1.5, 0.0);
        let c = point(2, 1.6, 0.0);

        assert!(rule.should_connect(&a, &b, &[]));
        assert!(!rule.should_connect(&a, &c, &[]));
    }

    #[test]
    fn test_unit_disk_rejects_bad_radius() {
        assert!(UnitDisk::new(-1.0).is_err());
        assert!(UnitDisk::new(f64::NAN).is_err());
        assert!(UnitDisk::new(0.0).is_ok());
    }

    #[test]
    fn test_autotuned_radius() {
        let pts = points_from(&[(0.0, 0.0), (1.0, 0.0), (1.0, 3.0)]);
        assert_eq!(UnitDisk::autotuned(&pts).radius(), 3.0);

        assert_eq!(UnitDisk::autotuned(&pts[..1]).radius(), 0.0);
        assert_eq!(UnitDisk::autotuned(&[]).radius(), 0.0);
    }

    #[test]
    fn test_gabriel_blocks_on_point_inside_circle() {
        let a = point(0, 0.0, 0.0);
        let b = point(1, 4.0, 0.0);
        let inside = point(2, 2.0, 1.0);
        let outside = point(3, 2.0, 2.5);

        assert!(!Gabriel.should_connect(&a, &b, &[a, b, inside]));
        assert!(Gabriel.should_connect(&a, &b, &[a, b, outside]));
    }

    #[test]
    fn test_gabriel_boundary_point_blocks() {
        // (2, 2) lies exactly on the circle with diameter (0,0)-(4,0)
        let a = point(0, 0.0, 0.0);
        let b = point(1, 4.0, 0.0);
        let on_circle = point(2, 2.0, 2.0);

        assert!(!Gabriel.should_connect(&a, &b, &[a, b, on_circle]));
    }

    #[test]
    fn test_gabriel_point_sharing_first_endpoint_blocks() {
        // Lies on the circle exactly, whatever rounding the midpoint takes
        let a = point(0, 0.1, 0.7);
        let b = point(1, 3.3, 1.9);
        let twin = point(2, 0.1, 0.7);

        assert!(!Gabriel.should_connect(&a, &b, &[a, b, twin]));
    }

    #[test]
    fn test_gabriel_ignores_endpoints_by_id() {
        let a = point(0, 0.0, 0.0);
        let b = point(1, 2.0, 0.0);
        assert!(Gabriel.should_connect(&a, &b, &[a, b]));
    }

    #[test]
    fn test_closure_rule() {
        let same_row = |a: &SensorPoint, b: &SensorPoint, _: &[SensorPoint]| a.position.y == b.position.y;
        let a = point(0, 0.0, 1.0);
        let b = point(1, 9.0, 1.0);
        let c = point(2, 0.0, 2.0);

        assert!(same_row.should_connect(&a, &b, &[]));
        assert!(!same_row.should_connect(&a, &c, &[]));
    }

    fn coords_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((0.0..55.0f64, 0.0..55.0f64), 2..25)
    }

    proptest! {
        #[test]
        fn test_unit_disk_is_symmetric(coords in coords_strategy(), radius in 0.0..30.0f64) {
            let pts = points_from(&coords);
            let rule = UnitDisk::new(radius).unwrap();
            for a in &pts {
                for b in &pts {
                    prop_assert_eq!(rule.should_connect(a, b, &pts), rule.should_connect(b, a, &pts));
                }
            }
        }

        #[test]
        fn test_gabriel_is_symmetric(coords in coords_strategy()) {
            let pts = points_from(&coords);
            for a in &pts {
                for b in &pts {
                    prop_assert_eq!(Gabriel.should_connect(a, b, &pts), Gabriel.should_connect(b, a, &pts));
                }
            }
        }

        #[test]
        fn test_autotuned_radius_covers_every_tree_edge(coords in coords_strategy()) {
            let pts = points_from(&coords);
            let rule = UnitDisk::autotuned(&pts);
            let positions: Vec<Coordinate> = pts.iter().map(|p| p.position).collect();

            for edge in mst::minimum_spanning_tree(&positions) {
                prop_assert!(rule.should_connect(&pts[edge.a], &pts[edge.b], &pts));
            }
        }
    }
}
