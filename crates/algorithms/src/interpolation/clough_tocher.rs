//! Clough-Tocher C1 interpolation on a Delaunay triangulation
//!
//! Each triangle is split at its centroid into three cubic Bézier patches.
//! Vertex gradients are estimated globally by minimizing the curvature of
//! the piecewise-cubic edge curves; cross-edge derivatives are chosen along
//! the direction joining neighbouring centroids, which keeps the surface
//! C1 and affine-invariant.
//!
//! References:
//! Clough, R.W. & Tocher, J.L. (1965). Finite element stiffness matrices
//! for analysis of plates in bending.
//! Nielson, G.M. (1983). A method for interpolating scattered data based
//! upon a minimum norm network. Math. Comp., 40(161).

use offsetfield_core::{Result, SpatialSample};
use tracing::debug;

use super::triangulation::Triangulation;

/// Convergence tolerance of the gradient solver.
const GRADIENT_TOL: f64 = 1e-6;
/// Iteration cap of the gradient solver.
const GRADIENT_MAX_ITER: usize = 400;

/// A fitted Clough-Tocher interpolant.
#[derive(Debug, Clone)]
pub struct CloughTocherInterpolant {
    tri: Triangulation,
    gradients: Vec<[f64; 2]>,
    fill_value: f64,
}

impl CloughTocherInterpolant {
    /// Triangulate `samples` (no missing values), estimate gradients and fit.
    pub fn fit(samples: &[SpatialSample], fill_value: f64) -> Result<Self> {
        let tri = Triangulation::build(samples)?;
        let gradients = estimate_gradients(&tri);
        Ok(Self {
            tri,
            gradients,
            fill_value,
        })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// Estimated `(d/dlon, d/dlat)` at each triangulation vertex.
    pub fn gradients(&self) -> &[[f64; 2]] {
        &self.gradients
    }

    /// Value at `(lon, lat)`.
    pub fn evaluate(&self, lon: f64, lat: f64) -> f64 {
        if let Some(v) = self.tri.vertex_at(lon, lat) {
            return self.tri.points()[v].value;
        }
        match self.tri.locate(lon, lat) {
            Some((ti, b)) => self.evaluate_in(ti, b),
            None => self.fill_value,
        }
    }

    fn evaluate_in(&self, ti: usize, b: [f64; 3]) -> f64 {
        let pts = self.tri.points();
        let [i0, i1, i2] = self.tri.triangles()[ti];
        let (p1, p2, p3) = (&pts[i0], &pts[i1], &pts[i2]);

        let e12 = [p2.lon - p1.lon, p2.lat - p1.lat];
        let e23 = [p3.lon - p2.lon, p3.lat - p2.lat];
        let e31 = [p1.lon - p3.lon, p1.lat - p3.lat];

        let (f1, f2, f3) = (p1.value, p2.value, p3.value);
        let (g1, g2, g3) = (self.gradients[i0], self.gradients[i1], self.gradients[i2]);
        let dot = |g: [f64; 2], e: [f64; 2]| g[0] * e[0] + g[1] * e[1];

        let df12 = dot(g1, e12);
        let df21 = -dot(g2, e12);
        let df23 = dot(g2, e23);
        let df32 = -dot(g3, e23);
        let df31 = dot(g3, e31);
        let df13 = -dot(g1, e31);

        // Bézier ordinates on the outer edges
        let c3000 = f1;
        let c2100 = (df12 + 3.0 * c3000) / 3.0;
        let c2010 = (df13 + 3.0 * c3000) / 3.0;
        let c0300 = f2;
        let c1200 = (df21 + 3.0 * c0300) / 3.0;
        let c0210 = (df23 + 3.0 * c0300) / 3.0;
        let c0030 = f3;
        let c1020 = (df31 + 3.0 * c0030) / 3.0;
        let c0120 = (df32 + 3.0 * c0030) / 3.0;

        let c2001 = (c2100 + c2010 + c3000) / 3.0;
        let c0201 = (c1200 + c0300 + c0210) / 3.0;
        let c0021 = (c1020 + c0120 + c0030) / 3.0;

        let g = self.cross_edge_factors(ti);

        let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
            + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
            / 2.0;
        let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
            + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
            / 2.0;
        let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
            + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
            / 2.0;

        let c1002 = (c1101 + c1011 + c2001) / 3.0;
        let c0102 = (c1101 + c0111 + c0201) / 3.0;
        let c0012 = (c1011 + c0111 + c0021) / 3.0;
        let c0003 = (c1002 + c0102 + c0012) / 3.0;

        // Extended barycentric coordinates; one of b1..b3 is zero and b4
        // weights the centroid.
        let minval = b[0].min(b[1]).min(b[2]);
        let b1 = b[0] - minval;
        let b2 = b[1] - minval;
        let b3 = b[2] - minval;
        let b4 = 3.0 * minval;

        b1.powi(3) * c3000
            + 3.0 * b1 * b1 * b2 * c2100
            + 3.0 * b1 * b1 * b3 * c2010
            + 3.0 * b1 * b1 * b4 * c2001
            + 3.0 * b1 * b2 * b2 * c1200
            + 6.0 * b1 * b2 * b4 * c1101
            + 3.0 * b1 * b3 * b3 * c1020
            + 6.0 * b1 * b3 * b4 * c1011
            + 3.0 * b1 * b4 * b4 * c1002
            + b2.powi(3) * c0300
            + 3.0 * b2 * b2 * b3 * c0210
            + 3.0 * b2 * b2 * b4 * c0201
            + 3.0 * b2 * b3 * b3 * c0120
            + 6.0 * b2 * b3 * b4 * c0111
            + 3.0 * b2 * b4 * b4 * c0102
            + b3.powi(3) * c0030
            + 3.0 * b3 * b3 * b4 * c0021
            + 3.0 * b3 * b4 * b4 * c0012
            + b4.powi(3) * c0003
    }

    /// Direction factors for the derivative across each edge.
    ///
    /// Across an interior edge the direction is toward the neighbour's
    /// centroid, expressed in this triangle's barycentric coordinates. On
    /// the hull it points at the triangle centroid.
    fn cross_edge_factors(&self, ti: usize) -> [f64; 3] {
        let pts = self.tri.points();
        let mut g = [-0.5; 3];
        for (k, gk) in g.iter_mut().enumerate() {
            let Some(nt) = self.tri.neighbors()[ti][k] else {
                continue;
            };
            let [a, b, c] = self.tri.triangles()[nt];
            let cx = (pts[a].lon + pts[b].lon + pts[c].lon) / 3.0;
            let cy = (pts[a].lat + pts[b].lat + pts[c].lat) / 3.0;
            let bc = self.tri.barycentric(ti, cx, cy);

            *gk = match k {
                0 => (2.0 * bc[2] + bc[1] - 1.0) / (2.0 - 3.0 * bc[2] - 3.0 * bc[1]),
                1 => (2.0 * bc[0] + bc[2] - 1.0) / (2.0 - 3.0 * bc[0] - 3.0 * bc[2]),
                _ => (2.0 * bc[1] + bc[0] - 1.0) / (2.0 - 3.0 * bc[1] - 3.0 * bc[0]),
            };
        }
        g
    }
}

/// Global gradient estimate (Nielson's minimum-norm network).
///
/// Gauss-Seidel sweeps over vertices; each solves a 2x2 system built from
/// the cubic edge curves to its neighbours.
fn estimate_gradients(tri: &Triangulation) -> Vec<[f64; 2]> {
    let pts = tri.points();
    let neighbors: Vec<Vec<usize>> = (0..pts.len()).map(|v| tri.vertex_neighbors(v)).collect();
    let mut grad = vec![[0.0f64; 2]; pts.len()];

    for iter in 0..GRADIENT_MAX_ITER {
        let mut err = 0.0f64;

        for (i, nbrs) in neighbors.iter().enumerate() {
            let mut q = [0.0f64; 3]; // q00, q01, q11
            let mut s = [0.0f64; 2];

            for &j in nbrs {
                let ex = pts[j].lon - pts[i].lon;
                let ey = pts[j].lat - pts[i].lat;
                let l = (ex * ex + ey * ey).sqrt();
                let l3 = l * l * l;

                let f1 = pts[i].value;
                let f2 = pts[j].value;
                let df2 = -ex * grad[j][0] - ey * grad[j][1];

                q[0] += 4.0 * ex * ex / l3;
                q[1] += 4.0 * ex * ey / l3;
                q[2] += 4.0 * ey * ey / l3;

                let rhs = 6.0 * (f1 - f2) - 2.0 * df2;
                s[0] += rhs * ex / l3;
                s[1] += rhs * ey / l3;
            }

            let det = q[0] * q[2] - q[1] * q[1];
            if det == 0.0 || !det.is_finite() {
                continue;
            }
            let r0 = (q[2] * s[0] - q[1] * s[1]) / det;
            let r1 = (-q[1] * s[0] + q[0] * s[1]) / det;

            let change = (grad[i][0] + r0).abs().max((grad[i][1] + r1).abs());
            grad[i] = [-r0, -r1];

            err = err.max(change / r0.abs().max(r1.abs()).max(1.0));
        }

        if err < GRADIENT_TOL {
            debug!("gradient estimate converged after {} sweeps", iter + 1);
            return grad;
        }
    }

    debug!(
        "gradient estimate stopped at {} sweeps without converging",
        GRADIENT_MAX_ITER
    );
    grad
}
