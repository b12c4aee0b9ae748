//! 2D k-d tree over `(lon, lat)` coordinates
//!
//! Backs the KNN control-point regressor and vertex lookup in the
//! triangulation. Distances are planar Euclidean in coordinate units.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;

use offsetfield_core::SpatialSample;

/// A 2D k-d tree for nearest-neighbor queries on samples.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<SpatialSample>,
}

#[derive(Debug, Clone)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// 0 = lon, 1 = lat
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbor query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: SpatialSample,
    pub distance_sq: f64,
    /// Position of the point in the slice the tree was built from
    pub index: usize,
}

fn by_distance(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.cmp(&b.1))
}

impl KdTree {
    /// Build a tree from samples. O(n log² n) with per-level sorting.
    pub fn build(points: &[SpatialSample]) -> Self {
        let points = points.to_vec();
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(&points, &mut indices, 0, &mut nodes);
        }
        Self { nodes, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closest sample to `(lon, lat)`, or `None` for an empty tree.
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<NearestResult> {
        self.k_nearest(lon, lat, 1).into_iter().next()
    }

    /// Up to `k` closest samples, sorted by ascending distance.
    ///
    /// Equidistant samples are ordered by their input position so results
    /// are reproducible.
    pub fn k_nearest(&self, lon: f64, lat: f64, k: usize) -> Vec<NearestResult> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // Ascending by (distance, index); the last entry is the current worst.
        let mut best: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, lon, lat, k, &mut best);

        best.into_iter()
            .map(|(distance_sq, idx)| NearestResult {
                point: self.points[idx],
                distance_sq,
                index: idx,
            })
            .collect()
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        lon: f64,
        lat: f64,
        k: usize,
        best: &mut Vec<(f64, usize)>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dx = lon - p.lon;
        let dy = lat - p.lat;
        let candidate = (dx * dx + dy * dy, node.point_idx);

        let accept = best.len() < k
            || best
                .last()
                .map_or(true, |worst| by_distance(&candidate, worst) == Ordering::Less);
        if accept {
            let pos = best
                .binary_search_by(|entry| by_distance(entry, &candidate))
                .unwrap_or_else(|e| e);
            best.insert(pos, candidate);
            best.truncate(k);
        }

        let diff = if node.split_dim == 0 { dx } else { dy };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, lon, lat, k, best);
        }

        let threshold = if best.len() >= k {
            best.last().map_or(f64::MAX, |w| w.0)
        } else {
            f64::MAX
        };

        // `<=` so equidistant ties on the far side are still considered
        if diff * diff <= threshold {
            if let Some(child) = second {
                self.knn_recursive(child, lon, lat, k, best);
            }
        }
    }
}

fn build_recursive(
    points: &[SpatialSample],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = (depth % 2) as u8;
    let coord = |i: usize| {
        if split_dim == 0 {
            points[i].lon
        } else {
            points[i].lat
        }
    };

    indices.sort_by(|&a, &b| coord(a).partial_cmp(&coord(b)).unwrap_or(Ordering::Equal));

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        let child = build_recursive(points, left, depth + 1, nodes);
        nodes[node_idx].left = Some(child);
    }
    if !right.is_empty() {
        let child = build_recursive(points, right, depth + 1, nodes);
        nodes[node_idx].right = Some(child);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<SpatialSample> {
        vec![
            SpatialSample::new(2.0, 3.0, 10.0),
            SpatialSample::new(5.0, 4.0, 20.0),
            SpatialSample::new(9.0, 6.0, 30.0),
            SpatialSample::new(4.0, 7.0, 40.0),
            SpatialSample::new(8.0, 1.0, 50.0),
            SpatialSample::new(7.0, 2.0, 60.0),
            SpatialSample::new(1.0, 8.0, 70.0),
            SpatialSample::new(6.0, 5.0, 80.0),
        ]
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
        assert!(tree.k_nearest(0.0, 0.0, 3).is_empty());
    }

    #[test]
    fn test_nearest_exact() {
        let tree = KdTree::build(&sample_points());
        let result = tree.nearest(5.0, 4.0).unwrap();
        assert_eq!(result.distance_sq, 0.0);
        assert_eq!(result.point.value, 20.0);
        assert_eq!(result.index, 1);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);

        for qx in 0..10 {
            for qy in 0..10 {
                let qx = qx as f64 + 0.5;
                let qy = qy as f64 + 0.5;
                let tree_result = tree.nearest(qx, qy).unwrap();
                let bf = pts
                    .iter()
                    .map(|p| p.dist_sq(qx, qy))
                    .fold(f64::MAX, f64::min);
                assert!(
                    (tree_result.distance_sq - bf).abs() < 1e-10,
                    "Mismatch at ({}, {}): tree={:.4}, bf={:.4}",
                    qx,
                    qy,
                    tree_result.distance_sq,
                    bf
                );
            }
        }
    }

    #[test]
    fn test_k_nearest_sorted_and_correct() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);

        let results = tree.k_nearest(5.0, 5.0, 3);
        assert_eq!(results.len(), 3);

        let mut dists: Vec<f64> = pts.iter().map(|p| p.dist_sq(5.0, 5.0)).collect();
        dists.sort_by(|a, b| a.partial_cmp(b).unwrap());

        for (r, d) in results.iter().zip(&dists) {
            assert!((r.distance_sq - d).abs() < 1e-10);
        }
    }

    #[test]
    fn test_k_nearest_more_than_points() {
        let pts = sample_points();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.k_nearest(5.0, 5.0, 100).len(), pts.len());
    }

    #[test]
    fn test_ties_resolved_by_input_order() {
        let pts = vec![
            SpatialSample::new(1.0, 0.0, 1.0),
            SpatialSample::new(-1.0, 0.0, 2.0),
            SpatialSample::new(0.0, 1.0, 3.0),
            SpatialSample::new(0.0, -1.0, 4.0),
        ];
        let tree = KdTree::build(&pts);
        let idx: Vec<usize> = tree.k_nearest(0.0, 0.0, 2).iter().map(|r| r.index).collect();
        assert_eq!(idx, vec![0, 1]);
    }

    #[test]
    fn test_collinear_points() {
        let pts: Vec<SpatialSample> = (0..10)
            .map(|i| SpatialSample::new(i as f64, 0.0, i as f64))
            .collect();
        let tree = KdTree::build(&pts);

        let result = tree.nearest(4.5, 0.0).unwrap();
        assert!(result.distance_sq <= 0.25 + 1e-10);
        assert_eq!(tree.k_nearest(4.5, 0.0, 3).len(), 3);
    }

    #[test]
    fn test_large_dataset() {
        let pts: Vec<SpatialSample> = (0..1000)
            .map(|i| {
                let x = ((i * 7 + 13) % 100) as f64;
                let y = ((i * 11 + 37) % 100) as f64;
                SpatialSample::new(x, y, i as f64)
            })
            .collect();
        let tree = KdTree::build(&pts);
        assert_eq!(tree.len(), 1000);

        let result = tree.nearest(50.0, 50.0).unwrap();
        let bf = pts
            .iter()
            .map(|p| p.dist_sq(50.0, 50.0))
            .fold(f64::MAX, f64::min);
        assert!((result.distance_sq - bf).abs() < 1e-10);
    }
}
