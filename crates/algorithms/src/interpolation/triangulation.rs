//! Delaunay triangulation of scattered samples
//!
//! A lexicographic sweep triangulates the convex hull, Lawson edge flips
//! then make it Delaunay, and adjacency is built so interpolants can walk
//! to neighbouring triangles. Predicates run on bbox-normalized
//! coordinates, so long thin or very small point clouds behave like any
//! other. Triangles are stored counter-clockwise; `neighbors[t][k]` is
//! the triangle across the edge opposite vertex `k` of triangle `t`.

use std::collections::HashMap;

use offsetfield_core::{Error, Result, SpatialSample};
use tracing::{debug, warn};

use super::kdtree::KdTree;

/// Fewest distinct points accepted for a triangulated interpolant.
pub const MIN_TRIANGULATION_POINTS: usize = 4;

/// Barycentric tolerance for point-in-triangle tests.
const INSIDE_EPS: f64 = -1e-10;

/// A triangulated point set.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<SpatialSample>,
    triangles: Vec<[usize; 3]>,
    neighbors: Vec<[Option<usize>; 3]>,
    vertex_triangles: Vec<Vec<usize>>,
    index: KdTree,
}

/// Twice the signed area of `(a, b, c)`; positive when counter-clockwise.
#[inline]
fn orient(a: &SpatialSample, b: &SpatialSample, c: &SpatialSample) -> f64 {
    (b.lon - a.lon) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lon - a.lon)
}

/// Barycentric coordinates of `(px, py)` relative to `(p0, p1, p2)`.
///
/// The interpolated value of a linear field is `u*v0 + v*v1 + w*v2`.
pub(crate) fn barycentric(
    px: f64,
    py: f64,
    p0: &SpatialSample,
    p1: &SpatialSample,
    p2: &SpatialSample,
) -> [f64; 3] {
    let v0x = p1.lon - p0.lon;
    let v0y = p1.lat - p0.lat;
    let v1x = p2.lon - p0.lon;
    let v1y = p2.lat - p0.lat;
    let v2x = px - p0.lon;
    let v2y = py - p0.lat;

    let dot00 = v0x * v0x + v0y * v0y;
    let dot01 = v0x * v1x + v0y * v1y;
    let dot02 = v0x * v2x + v0y * v2y;
    let dot11 = v1x * v1x + v1y * v1y;
    let dot12 = v1x * v2x + v1y * v2y;

    let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
    let v = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let w = (dot00 * dot12 - dot01 * dot02) * inv_denom;
    [1.0 - v - w, v, w]
}

/// Remove exact duplicate coordinates, keeping the first occurrence.
fn dedup_coordinates(samples: &[SpatialSample]) -> Vec<SpatialSample> {
    let mut seen = HashMap::with_capacity(samples.len());
    let unique: Vec<SpatialSample> = samples
        .iter()
        .filter(|s| {
            // -0.0 and 0.0 are the same location
            let key = ((s.lon + 0.0).to_bits(), (s.lat + 0.0).to_bits());
            seen.insert(key, ()).is_none()
        })
        .copied()
        .collect();
    if unique.len() < samples.len() {
        warn!(
            "triangulation: dropped {} duplicate coordinates",
            samples.len() - unique.len()
        );
    }
    unique
}

/// Whether all points lie on one line, relative to the point spread.
fn all_collinear(points: &[SpatialSample]) -> bool {
    let p0 = &points[0];
    let Some(far) = points
        .iter()
        .max_by(|a, b| {
            a.dist_sq(p0.lon, p0.lat)
                .partial_cmp(&b.dist_sq(p0.lon, p0.lat))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    else {
        return true;
    };
    let span_sq = far.dist_sq(p0.lon, p0.lat);
    if span_sq == 0.0 {
        return true;
    }
    points
        .iter()
        .all(|p| orient(p0, far, p).abs() <= 1e-12 * span_sq)
}

/// Orientation below this (in bbox-normalized units) counts as collinear.
const COLLINEAR_EPS: f64 = 1e-12;
/// Incircle margin an edge must exceed before it is flipped.
const INCIRCLE_EPS: f64 = 1e-14;

/// Coordinates translated to the bbox origin and scaled by its larger side,
/// so every geometric predicate works on values in `[0, 1]`.
fn normalized_coordinates(points: &[SpatialSample]) -> Vec<[f64; 2]> {
    let (mut min_x, mut max_x, mut min_y, mut max_y) =
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for p in points {
        min_x = min_x.min(p.lon);
        max_x = max_x.max(p.lon);
        min_y = min_y.min(p.lat);
        max_y = max_y.max(p.lat);
    }
    let scale = (max_x - min_x).max(max_y - min_y);
    let scale = if scale > 0.0 { scale } else { 1.0 };
    points
        .iter()
        .map(|p| [(p.lon - min_x) / scale, (p.lat - min_y) / scale])
        .collect()
}

#[inline]
fn orient_xy(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Positive when `d` lies inside the circumcircle of counter-clockwise `(a, b, c)`.
fn incircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);
    (adx * adx + ady * ady) * (bdx * cdy - cdx * bdy)
        + (bdx * bdx + bdy * bdy) * (cdx * ady - adx * cdy)
        + (cdx * cdx + cdy * cdy) * (adx * bdy - bdx * ady)
}

/// Triangulate the convex hull of `xy` by a lexicographic sweep.
///
/// Each new point is lexicographically largest so far, hence outside the
/// current hull; it is joined to every hull edge it can see. The union of
/// triangles is therefore always the full convex hull. Returned triangles
/// are counter-clockwise and index into `xy`.
fn sweep_triangulate(xy: &[[f64; 2]]) -> Vec<[usize; 3]> {
    let mut order: Vec<usize> = (0..xy.len()).collect();
    order.sort_by(|&a, &b| {
        xy[a][0]
            .total_cmp(&xy[b][0])
            .then(xy[a][1].total_cmp(&xy[b][1]))
    });

    // Seed: the leading run of collinear points plus the first point off it
    let off_line = |i: usize| orient_xy(xy[order[0]], xy[order[1]], xy[order[i]]);
    let Some(m) = (2..order.len()).find(|&i| off_line(i).abs() > COLLINEAR_EPS) else {
        return Vec::new();
    };
    let apex = order[m];
    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(2 * xy.len());
    let mut hull: Vec<usize> = Vec::with_capacity(xy.len());
    if off_line(m) > 0.0 {
        for i in 0..m - 1 {
            triangles.push([order[i], order[i + 1], apex]);
        }
        hull.extend_from_slice(&order[..m]);
        hull.push(apex);
    } else {
        for i in 0..m - 1 {
            triangles.push([order[i + 1], order[i], apex]);
        }
        hull.push(order[0]);
        hull.push(apex);
        hull.extend(order[1..m].iter().rev());
    }

    for &q in &order[m + 1..] {
        let h = hull.len();
        let edge_orient = |i: usize| orient_xy(xy[hull[i]], xy[hull[(i + 1) % h]], xy[q]);
        let mut visible: Vec<bool> =
            (0..h).map(|i| edge_orient(i) < -COLLINEAR_EPS).collect();
        if !visible.iter().any(|&v| v) {
            // Nearly collinear with the hull: take the edge it is most clearly beyond
            let best = (0..h)
                .min_by(|&a, &b| edge_orient(a).total_cmp(&edge_orient(b)))
                .unwrap_or(0);
            visible[best] = true;
        }

        let start = (0..h)
            .find(|&i| visible[i] && !visible[(i + h - 1) % h])
            .unwrap_or(0);
        let run = (0..h).take_while(|&r| visible[(start + r) % h]).count();

        for r in 0..run {
            let a = hull[(start + r) % h];
            let b = hull[(start + r + 1) % h];
            triangles.push([a, q, b]);
        }

        // Keep the chain endpoints, drop the vertices between them, insert q
        let mut next = Vec::with_capacity(h + 1);
        let resume = (start + run) % h;
        let kept = h - run + 1;
        next.extend((0..kept).map(|i| hull[(resume + i) % h]));
        next.push(q);
        hull = next;
    }

    triangles
}

/// Lawson edge flips until every interior edge is locally Delaunay.
///
/// Flipping only replaces the diagonal of a convex quadrilateral, so the
/// covered region is unchanged.
fn flip_to_delaunay(xy: &[[f64; 2]], triangles: &mut [[usize; 3]]) {
    let max_passes = 10 * triangles.len() + 100;
    for pass in 0..max_passes {
        let neighbors = build_neighbors(triangles);
        let mut dirty = vec![false; triangles.len()];
        let mut flips = 0usize;

        for ti in 0..triangles.len() {
            for k in 0..3 {
                let Some(nt) = neighbors[ti][k] else {
                    continue;
                };
                if nt < ti || dirty[ti] || dirty[nt] {
                    continue;
                }
                let t = triangles[ti];
                let (a, e1, e2) = (t[k], t[(k + 1) % 3], t[(k + 2) % 3]);
                let Some(&d) = triangles[nt].iter().find(|&&v| v != e1 && v != e2) else {
                    continue;
                };
                if incircle(xy[a], xy[e1], xy[e2], xy[d]) <= INCIRCLE_EPS {
                    continue;
                }
                let convex =
                    orient_xy(xy[a], xy[e1], xy[d]) > 0.0 && orient_xy(xy[a], xy[d], xy[e2]) > 0.0;
                if !convex {
                    continue;
                }
                triangles[ti] = [a, e1, d];
                triangles[nt] = [a, d, e2];
                dirty[ti] = true;
                dirty[nt] = true;
                flips += 1;
            }
        }

        if flips == 0 {
            debug!("delaunay flips settled after {} passes", pass + 1);
            return;
        }
    }
    warn!("delaunay flips did not settle after {} passes", max_passes);
}

impl Triangulation {
    /// Triangulate the coordinates of `samples`.
    ///
    /// Duplicate coordinates are dropped (first wins). Fails with
    /// `InsufficientPoints` below [`MIN_TRIANGULATION_POINTS`] distinct
    /// points and with `DegenerateGeometry` when they are all collinear.
    pub fn build(samples: &[SpatialSample]) -> Result<Self> {
        let points = dedup_coordinates(samples);
        if points.len() < MIN_TRIANGULATION_POINTS {
            return Err(Error::InsufficientPoints {
                required: MIN_TRIANGULATION_POINTS,
                found: points.len(),
            });
        }
        if all_collinear(&points) {
            return Err(Error::DegenerateGeometry(format!(
                "all {} points are collinear",
                points.len()
            )));
        }

        let scale = {
            let (mut min_x, mut max_x, mut min_y, mut max_y) =
                (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
            for p in &points {
                min_x = min_x.min(p.lon);
                max_x = max_x.max(p.lon);
                min_y = min_y.min(p.lat);
                max_y = max_y.max(p.lat);
            }
            (max_x - min_x).max(max_y - min_y)
        };

        let xy = normalized_coordinates(&points);
        let mut triangles = sweep_triangulate(&xy);
        flip_to_delaunay(&xy, &mut triangles);

        let triangles: Vec<[usize; 3]> = triangles
            .into_iter()
            .filter_map(|[a, b, c]| {
                let area2 = orient(&points[a], &points[b], &points[c]);
                if area2.abs() <= 1e-14 * scale * scale {
                    None
                } else if area2 > 0.0 {
                    Some([a, b, c])
                } else {
                    Some([a, c, b])
                }
            })
            .collect();

        if triangles.is_empty() {
            return Err(Error::DegenerateGeometry(
                "triangulation produced no triangles".into(),
            ));
        }

        let neighbors = build_neighbors(&triangles);
        let mut vertex_triangles = vec![Vec::new(); points.len()];
        for (ti, t) in triangles.iter().enumerate() {
            for &v in t {
                vertex_triangles[v].push(ti);
            }
        }

        debug!(
            "triangulation: {} vertices, {} triangles",
            points.len(),
            triangles.len()
        );

        let index = KdTree::build(&points);
        Ok(Self {
            points,
            triangles,
            neighbors,
            vertex_triangles,
            index,
        })
    }

    /// Distinct vertices, in first-occurrence order.
    pub fn points(&self) -> &[SpatialSample] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Triangle across the edge opposite each vertex, `None` on the hull.
    pub fn neighbors(&self) -> &[[Option<usize>; 3]] {
        &self.neighbors
    }

    /// Vertex whose coordinates equal `(lon, lat)` exactly.
    pub fn vertex_at(&self, lon: f64, lat: f64) -> Option<usize> {
        self.index
            .nearest(lon, lat)
            .filter(|r| r.distance_sq == 0.0)
            .map(|r| r.index)
    }

    /// Sorted, unique vertices sharing an edge with `vertex`.
    pub fn vertex_neighbors(&self, vertex: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.vertex_triangles[vertex]
            .iter()
            .flat_map(|&ti| self.triangles[ti])
            .filter(|&v| v != vertex)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Barycentric coordinates of `(lon, lat)` in triangle `tri`.
    pub fn barycentric(&self, tri: usize, lon: f64, lat: f64) -> [f64; 3] {
        let [a, b, c] = self.triangles[tri];
        barycentric(lon, lat, &self.points[a], &self.points[b], &self.points[c])
    }

    /// Triangle containing `(lon, lat)` with its barycentric coordinates,
    /// or `None` outside the convex hull.
    pub fn locate(&self, lon: f64, lat: f64) -> Option<(usize, [f64; 3])> {
        let inside = |ti: usize| {
            let b = self.barycentric(ti, lon, lat);
            b.iter().all(|&c| c >= INSIDE_EPS).then_some((ti, b))
        };

        // Triangles around the nearest vertex usually contain the query
        if let Some(near) = self.index.nearest(lon, lat) {
            if let Some(hit) = self.vertex_triangles[near.index].iter().find_map(|&ti| inside(ti)) {
                return Some(hit);
            }
        }

        (0..self.triangles.len()).find_map(|ti| {
            let [a, b, c] = self.triangles[ti];
            let (pa, pb, pc) = (&self.points[a], &self.points[b], &self.points[c]);
            let out_of_box = lon < pa.lon.min(pb.lon).min(pc.lon)
                || lon > pa.lon.max(pb.lon).max(pc.lon)
                || lat < pa.lat.min(pb.lat).min(pc.lat)
                || lat > pa.lat.max(pb.lat).max(pc.lat);
            if out_of_box {
                None
            } else {
                inside(ti)
            }
        })
    }
}

fn build_neighbors(triangles: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let mut edges: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for (ti, t) in triangles.iter().enumerate() {
        for k in 0..3 {
            let a = t[(k + 1) % 3];
            let b = t[(k + 2) % 3];
            edges.entry((a.min(b), a.max(b))).or_default().push((ti, k));
        }
    }

    let mut neighbors = vec![[None; 3]; triangles.len()];
    for owners in edges.values() {
        if let [(t0, k0), (t1, k1)] = owners.as_slice() {
            neighbors[*t0][*k0] = Some(*t1);
            neighbors[*t1][*k1] = Some(*t0);
        }
    }
    neighbors
}
