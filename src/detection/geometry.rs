use imageproc::geometry::approximate_polygon_dp;
use imageproc::point::Point;

fn distance_sq(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = (b.x - a.x) as i64;
    let dy = (b.y - a.y) as i64;
    dx * dx + dy * dy
}

fn farthest_from(points: &[Point<i32>], from: usize) -> usize {
    let origin = points[from];
    let mut best = from;
    let mut best_distance = 0;
    for (i, p) in points.iter().enumerate() {
        let d = distance_sq(origin, *p);
        if d > best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

/// Simplify a closed boundary to the vertices that deviate more than
/// `epsilon` from the straight segments between them.
///
/// The curve is cut at an (approximately) most distant pair of points and
/// each half is simplified on its own, so the result does not depend on
/// where the tracer started the boundary. The closing vertex is not
/// repeated.
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }

    let mut a = 0;
    let mut b = farthest_from(points, a);
    for _ in 0..2 {
        let next = farthest_from(points, b);
        a = b;
        b = next;
    }
    if a == b {
        return vec![points[a]];
    }

    // Closed-mode approximate_polygon_dp always keeps the first traced point
    let (lo, hi) = (a.min(b), a.max(b));
    let forward = approximate_polygon_dp(&points[lo..=hi], epsilon, false);

    let mut wrapped: Vec<Point<i32>> = points[hi..].to_vec();
    wrapped.extend_from_slice(&points[..=lo]);
    let backward = approximate_polygon_dp(&wrapped, epsilon, false);

    let mut polygon = forward;
    if backward.len() > 2 {
        polygon.extend_from_slice(&backward[1..backward.len() - 1]);
    }
    polygon
}

/// Arrange four corners as top-left, top-right, bottom-right, bottom-left.
///
/// Top-left has the smallest x + y and bottom-right the largest; top-right
/// has the smallest y - x and bottom-left the largest. Ties go to the
/// earliest point.
pub fn order_corners(corners: [Point<f32>; 4]) -> [Point<f32>; 4] {
    let sum = |p: &Point<f32>| p.x + p.y;
    let diff = |p: &Point<f32>| p.y - p.x;

    let top_left = arg_extreme(&corners, sum, |a, b| a < b);
    let bottom_right = arg_extreme(&corners, sum, |a, b| a > b);
    let top_right = arg_extreme(&corners, diff, |a, b| a < b);
    let bottom_left = arg_extreme(&corners, diff, |a, b| a > b);

    [
        corners[top_left],
        corners[top_right],
        corners[bottom_right],
        corners[bottom_left],
    ]
}

fn arg_extreme(
    corners: &[Point<f32>; 4],
    key: impl Fn(&Point<f32>) -> f32,
    better: impl Fn(f32, f32) -> bool,
) -> usize {
    let mut best = 0;
    for i in 1..corners.len() {
        if better(key(&corners[i]), key(&corners[best])) {
            best = i;
        }
    }
    best
}

pub fn distance(a: Point<f32>, b: Point<f32>) -> f32 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

fn cross(a: (f32, f32), b: (f32, f32)) -> f32 {
    a.0 * b.1 - a.1 * b.0
}

/// Move every edge of an ordered quadrilateral `margin` pixels towards its
/// interior and return the corners of the smaller quadrilateral.
///
/// Returns `None` when two neighbouring edges are parallel or have no
/// length, or when the quadrilateral is too small to shrink that far.
pub fn inset_quad(corners: [Point<f32>; 4], margin: f32) -> Option<[Point<f32>; 4]> {
    let winding: f32 = (0..4)
        .map(|i| {
            let (p, q) = (corners[i], corners[(i + 1) % 4]);
            cross((p.x, p.y), (q.x, q.y))
        })
        .sum();
    if winding.abs() < 1e-3 {
        return None;
    }
    let side = winding.signum();

    // Each edge as (point on the shifted line, unit direction)
    let mut edges = [((0.0, 0.0), (0.0, 0.0)); 4];
    for (i, edge) in edges.iter_mut().enumerate() {
        let (p, q) = (corners[i], corners[(i + 1) % 4]);
        let length = distance(p, q);
        if length < 1e-3 {
            return None;
        }
        let dir = ((q.x - p.x) / length, (q.y - p.y) / length);
        let inward = (-dir.1 * side, dir.0 * side);
        *edge = ((p.x + inward.0 * margin, p.y + inward.1 * margin), dir);
    }

    let mut inset = corners;
    for (i, corner) in inset.iter_mut().enumerate() {
        let (p, d) = edges[(i + 3) % 4];
        let (q, e) = edges[i];
        let denom = cross(d, e);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = cross((q.0 - p.0, q.1 - p.1), e) / denom;
        *corner = Point::new(p.0 + t * d.0, p.1 + t * d.1);
    }

    // A margin wider than the quadrilateral turns it inside out
    let shrunk: f32 = (0..4)
        .map(|i| {
            let (p, q) = (inset[i], inset[(i + 1) % 4]);
            cross((p.x, p.y), (q.x, q.y))
        })
        .sum();
    (shrunk * side > 0.0).then_some(inset)
}
