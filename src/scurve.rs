//! Seven-segment S-curve synthesis for a single move.
//!
//! The straight-line profile construction follows the treatment in
//! <http://www.et.byu.edu/~ered/ME537/Notes/Ch5.pdf>: a concave constant-jerk
//! rise, an optional linear-acceleration phase, a convex constant-jerk rise
//! to the target velocity, an optional cruise, then the mirror image back
//! down to rest.

use crate::math;
use crate::moves::Move;
use crate::segment::Segment;
use crate::{Coord3, Float};

/// Rebuilds `m.segments` as a chain of constant-jerk segments from `m.src`
/// to `m.dst`, honoring both the per-move scalar limits and the global
/// per-axis limits.
///
/// A degenerate move (zero displacement) produces an empty chain.
pub(crate) fn plan_move(m: &mut Move, vel_limit: &Coord3, acc_limit: &Coord3, jerk_limit: &Coord3) {
    m.segments.clear();

    let origin = m.src;
    let mut ldir = m.dst - m.src;
    let llen = math::normalize(&mut ldir);
    if llen <= 0.0 {
        return;
    }

    // Project the direction through the per-axis caps, then intersect with
    // the per-move scalar limits.
    let v = math::bounded_vector(ldir, *vel_limit).norm().min(m.vel);
    let a = math::bounded_vector(ldir, *acc_limit).norm().min(m.acc);
    let j = math::bounded_vector(ldir, *jerk_limit).norm().min(m.jerk);

    let half_distance: Float = 0.5 * llen;

    let t_total = 2.0 * a / j;
    let mut t1 = 0.5 * t_total; // concave curve duration
    let mut tl = 0.0; // linear acceleration duration
    let mut t2 = 0.5 * t_total; // convex curve duration

    // Running state at the start of the next segment to emit.
    let mut t = t1;
    let mut ps = j * t * t * t / 6.0;
    let mut vs = j * t * t / 2.0;
    let mut accel = j * t;

    let dv_in_curve = (a * a) / (2.0 * j); // velocity change over one curve
    let v1 = dv_in_curve; // velocity at end of concave curve
    let v2 = v - dv_in_curve; // velocity at start of convex curve

    if v1 > v2 {
        // Fully performing both curves would overshoot the velocity
        // set-point; shorten them so they meet with a tangential transition.
        let t_pair = (4.0 * v * j).sqrt() / j;
        t1 = 0.5 * t_pair;
        t2 = t_pair - t1;

        t = t1;
        ps = j * t * t * t / 6.0;
        vs = j * t * t / 2.0;
        accel = j * t;
    } else if v2 > v1 {
        // The curves alone do not reach the set-point; insert a linear
        // acceleration phase between them.
        let vr = v2 - v1;
        tl = vr / accel;

        // The three rising segments must not overshoot half the move. Their
        // total distance condenses to a quadratic in the linear duration:
        //   0.5·j·t·TL² + 1.5·j·t²·TL + j·t³ = halfDistance
        let total_distance = 0.5 * j * t * tl * tl + 1.5 * j * t * t * tl + j * t * t * t;

        if total_distance > half_distance {
            let qa = 0.5 * j * t;
            let qb = 1.5 * j * t * t;
            let qc = j * t * t * t - half_distance;
            if let Some((x0, x1)) = math::solve_quadratic(qa, qb, qc) {
                let best = x0.max(x1);
                if best >= 0.0 {
                    tl = best;
                }
            }
        }
    }

    let both_curves_distance = j * t * t * t;
    if both_curves_distance > half_distance {
        // Too short to fully perform even the two curves; shrink them and
        // use no linear phases anywhere.
        let t_curve = (half_distance / j).cbrt();
        t1 = t_curve;
        t2 = t_curve;
        tl = 0.0;

        t = t1;
        ps = j * t * t * t / 6.0;
        vs = j * t * t / 2.0;
        accel = j * t;
    }

    // Segment 1, concave rising.
    m.segments.push(Segment {
        pos: origin,
        jerk: j * ldir,
        duration: t1,
        ..Segment::default()
    });

    // Segment 2, rising linear phase (maybe).
    if tl > 0.0 {
        m.segments.push(Segment {
            pos: origin + ps * ldir,
            vel: vs * ldir,
            acc: accel * ldir,
            duration: tl,
            ..Segment::default()
        });

        t = tl;
        ps += vs * t + accel * t * t / 2.0;
        vs += accel * t;
    }

    // Segment 3, convex rising.
    m.segments.push(Segment {
        pos: origin + ps * ldir,
        vel: vs * ldir,
        acc: accel * ldir,
        jerk: -j * ldir,
        duration: t2,
        ..Segment::default()
    });

    t = t2;
    ps += vs * t + accel * t * t / 2.0 - j * t * t * t / 6.0;
    vs += j * t * t / 2.0;
    accel = 0.0;

    // Segment 4, cruise (maybe).
    let total_rise_distance = 2.0 * ps;
    let remaining_distance = llen - total_rise_distance;
    if remaining_distance > 0.000001 {
        let c4 = Segment {
            pos: origin + ps * ldir,
            vel: vs * ldir,
            duration: remaining_distance / v,
            ..Segment::default()
        };
        ps += vs * c4.duration;
        m.segments.push(c4);
    }

    // Segment 5, convex falling.
    m.segments.push(Segment {
        pos: origin + ps * ldir,
        vel: vs * ldir,
        acc: accel * ldir,
        jerk: -j * ldir,
        duration: t2,
        ..Segment::default()
    });

    t = t2;
    ps += vs * t + accel * t * t / 2.0 - j * t * t * t / 6.0;
    vs += -j * t * t / 2.0;
    accel += -j * t;

    // Segment 6, falling linear phase (maybe).
    if tl > 0.0 {
        m.segments.push(Segment {
            pos: origin + ps * ldir,
            vel: vs * ldir,
            acc: accel * ldir,
            duration: tl,
            ..Segment::default()
        });

        t = tl;
        ps += vs * t + accel * t * t / 2.0;
        vs += accel * t;
    }

    // Segment 7, concave falling.
    m.segments.push(Segment {
        pos: origin + ps * ldir,
        vel: vs * ldir,
        acc: accel * ldir,
        jerk: j * ldir,
        duration: t1,
        ..Segment::default()
    });
}
