//! Minimum spanning tree over a point set.
//!
//! Kruskal's algorithm on the complete Euclidean graph, backed by a
//! union-find with path compression and union by rank.

use geonet_env::Coordinate;

/// Union-find over `0..n`.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Returns the representative of `i`'s set.
    pub fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    /// Merges the sets of `i` and `j`. Returns false if they were already joined.
    pub fn union(&mut self, i: usize, j: usize) -> bool {
        let pi = self.find(i);
        let pj = self.find(j);
        if pi == pj {
            return false;
        }

        match self.rank[pi].cmp(&self.rank[pj]) {
            std::cmp::Ordering::Less => self.parent[pi] = pj,
            std::cmp::Ordering::Greater => self.parent[pj] = pi,
            std::cmp::Ordering::Equal => {
                self.parent[pj] = pi;
                self.rank[pi] += 1;
            }
        }
        true
    }
}

/// An edge between two point indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Computes a minimum spanning tree of the complete graph over `points`,
/// weighted by Euclidean distance.
///
/// Returns `points.len() - 1` edges (none for fewer than two points).
pub fn minimum_spanning_tree(points: &[Coordinate]) -> Vec<WeightedEdge> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }

    let mut candidates = Vec::with_capacity(n * (n - 1) / 2);
    for a in 0..n {
        for b in (a + 1)..n {
            candidates.push(WeightedEdge {
                a,
                b,
                weight: points[a].distance(&points[b]),
            });
        }
    }
    candidates.sort_by(|x, y| x.weight.total_cmp(&y.weight));

    let mut sets = DisjointSet::new(n);
    let mut tree = Vec::with_capacity(n - 1);
    for edge in candidates {
        if sets.union(edge.a, edge.b) {
            tree.push(edge);
            if tree.len() == n - 1 {
                break;
            }
        }
    }
    tree
}

/// The largest edge weight in the MST of `points`, i.e. the smallest radius
/// whose unit-disk graph over `points` is connected. `0.0` for fewer than two points.
pub fn bottleneck_radius(points: &[Coordinate]) -> f64 {
    minimum_spanning_tree(points)
        .iter()
        .map(|e| e.weight)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_disjoint_set() {
        let mut sets = DisjointSet::new(4);
        assert!(sets.union(0, 1));
        assert!(sets.union(2, 3));
        assert!(!sets.union(1, 0));
        assert_ne!(sets.find(0), sets.find(2));

        assert!(sets.union(1, 3));
        assert_eq!(sets.find(0), sets.find(2));
    }

    #[test]
    fn test_mst_on_line() {
        let points = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(3.0, 0.0),
            Coordinate::new(6.0, 0.0),
        ];
        let tree = minimum_spanning_tree(&points);

        assert_eq!(tree.len(), 3);
        let total: f64 = tree.iter().map(|e| e.weight).sum();
        assert_relative_eq!(total, 6.0);
        assert_relative_eq!(bottleneck_radius(&points), 3.0);
    }

    #[test]
    fn test_mst_square_skips_diagonals() {
        let points = [
            Coordinate::new(0.0, 0.0),
            Coordinate::new(2.0, 0.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(0.0, 2.0),
        ];
        let tree = minimum_spanning_tree(&points);

        assert_eq!(tree.len(), 3);
        assert!(tree.iter().all(|e| (e.weight - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(minimum_spanning_tree(&[]).is_empty());
        assert!(minimum_spanning_tree(&[Coordinate::new(1.0, 1.0)]).is_empty());
        assert_eq!(bottleneck_radius(&[Coordinate::new(1.0, 1.0)]), 0.0);
    }
}
