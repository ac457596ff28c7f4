//! Small numeric helpers shared by the profile synthesis and corner blending.

use crate::{Coord3, Float};

/// Solves `a·x² + b·x + c = 0`, returning the real roots in ascending order.
///
/// Uses the cancellation-free form `-½(b + sign(b)·√disc)` for one root and
/// `c` divided by that quantity for the other; the naive `(-b ± √disc)/2a`
/// loses precision when `4ac ≪ b²`. A linear equation (`a = 0`) yields its
/// single root twice. Returns `None` when there are no real roots.
pub fn solve_quadratic(a: Float, b: Float, c: Float) -> Option<(Float, Float)> {
    if a == 0.0 {
        if b == 0.0 {
            return None;
        }
        let r = -c / b;
        return Some((r, r));
    }

    let disc = b * b - 4.0 * a * c;

    if disc > 0.0 {
        if b == 0.0 {
            let r = (-c / a).sqrt();
            Some((-r, r))
        } else {
            let sgnb = if b > 0.0 { 1.0 } else { -1.0 };
            let temp = -0.5 * (b + sgnb * disc.sqrt());
            let r1 = temp / a;
            let r2 = c / temp;
            Some(if r1 < r2 { (r1, r2) } else { (r2, r1) })
        }
    } else if disc == 0.0 {
        let r = -0.5 * b / a;
        Some((r, r))
    } else {
        None
    }
}

/// Normalizes `v` in place, returning its prior length.
///
/// A zero-length vector is left untouched so callers never see NaN
/// components.
pub fn normalize(v: &mut Coord3) -> Float {
    let len = v.norm();
    if len > 0.0 {
        *v /= len;
    }
    len
}

/// Returns the longest vector along `dir` whose components all stay within
/// the per-axis caps `lim`, i.e. `k·dir` with
/// `k = min_i lim_i / |dir_i|` over the non-zero components.
pub fn bounded_vector(dir: Coord3, lim: Coord3) -> Coord3 {
    let mut k = Float::INFINITY;
    for i in 0..3 {
        if dir[i] != 0.0 {
            k = k.min(lim[i] / dir[i].abs());
        }
    }
    if k.is_finite() {
        k * dir
    } else {
        Coord3::zeros()
    }
}

/// Projects `point` onto the infinite line through `start` along the unit
/// vector `dir`, returning the closest point and the signed distance of the
/// projection from `start`.
pub fn closest_point_on_line(start: Coord3, dir: Coord3, point: Coord3) -> (Coord3, Float) {
    let d = (point - start).dot(&dir);
    (start + d * dir, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn quadratic_two_roots() {
        let (x0, x1) = solve_quadratic(1.0, -5.0, 6.0).unwrap();
        assert_approx_eq!(f64, x0, 2.0, epsilon = 1e-12);
        assert_approx_eq!(f64, x1, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_is_stable_for_small_c() {
        // 4ac ≪ b²; the naive formula would cancel the small root away.
        let (x0, x1) = solve_quadratic(1.0, 1e8, 1.0).unwrap();
        assert_approx_eq!(f64, x0, -1e8, epsilon = 1.0);
        assert_approx_eq!(f64, x1, -1e-8, epsilon = 1e-16);
    }

    #[test]
    fn quadratic_linear_and_degenerate() {
        let (x0, x1) = solve_quadratic(0.0, 2.0, -8.0).unwrap();
        assert_approx_eq!(f64, x0, 4.0, epsilon = 1e-12);
        assert_approx_eq!(f64, x1, 4.0, epsilon = 1e-12);

        assert!(solve_quadratic(0.0, 0.0, 1.0).is_none());
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_none());
    }

    #[test]
    fn quadratic_no_linear_term() {
        let (x0, x1) = solve_quadratic(2.0, 0.0, -8.0).unwrap();
        assert_approx_eq!(f64, x0, -2.0, epsilon = 1e-12);
        assert_approx_eq!(f64, x1, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn bounded_vector_axis_aligned() {
        let v = bounded_vector(Coord3::new(1.0, 0.0, 0.0), Coord3::new(5.0, 9.0, 9.0));
        assert_approx_eq!(f64, v.x, 5.0, epsilon = 1e-12);
        assert_approx_eq!(f64, v.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bounded_vector_diagonal_limited_by_tightest_axis() {
        let dir = Coord3::new(1.0, 1.0, 0.0).normalize();
        let v = bounded_vector(dir, Coord3::new(10.0, 5.0, 7.0));
        assert_approx_eq!(f64, v.x, 5.0, epsilon = 1e-9);
        assert_approx_eq!(f64, v.y, 5.0, epsilon = 1e-9);
        assert_approx_eq!(f64, v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bounded_vector_zero_direction() {
        assert_eq!(bounded_vector(Coord3::zeros(), Coord3::new(1.0, 1.0, 1.0)), Coord3::zeros());
    }

    #[test]
    fn normalize_returns_prior_length() {
        let mut v = Coord3::new(3.0, 4.0, 0.0);
        assert_approx_eq!(f64, normalize(&mut v), 5.0, epsilon = 1e-12);
        assert_approx_eq!(f64, v.norm(), 1.0, epsilon = 1e-12);

        let mut z = Coord3::zeros();
        assert_approx_eq!(f64, normalize(&mut z), 0.0, epsilon = 1e-12);
        assert_eq!(z, Coord3::zeros());
    }

    #[test]
    fn closest_point() {
        let (p, d) = closest_point_on_line(
            Coord3::zeros(),
            Coord3::new(1.0, 0.0, 0.0),
            Coord3::new(4.0, 3.0, 0.0),
        );
        assert_approx_eq!(f64, d, 4.0, epsilon = 1e-12);
        assert_approx_eq!(f64, p.x, 4.0, epsilon = 1e-12);
        assert_approx_eq!(f64, p.y, 0.0, epsilon = 1e-12);
    }
}
