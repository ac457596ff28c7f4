//! Constant-jerk corner blending between two adjacent moves.
//!
//! A blend replaces the deceleration ramp of the incoming move and the
//! acceleration ramp of the outgoing move with a pair of constant-jerk
//! segments (`+j` for `T`, then `-j` for `T`) that swing the velocity from
//! one cruise to the other. The surrounding cruise segments are shortened to
//! meet the curve's endpoints.

use std::f64::consts::PI;

use crate::math;
use crate::moves::{CornerBlendType, Move};
use crate::segment::Segment;
use crate::{Coord3, Float};

/// Blend duration for a jerk vector and the velocity delta it must produce.
/// Both are collinear by construction, so any non-zero component serves.
fn blend_duration(j: &Coord3, dv: &Coord3) -> Float {
    if j.x != 0.0 {
        (dv.x / j.x).sqrt()
    } else if j.y != 0.0 {
        (dv.y / j.y).sqrt()
    } else if j.z != 0.0 {
        (dv.z / j.z).sqrt()
    } else {
        0.0
    }
}

/// Flags the ramp segments a blend makes redundant. `head` removes the
/// acceleration ramp of the outgoing move, otherwise the deceleration ramp
/// of the incoming move. Only valid on 5- or 7-segment chains.
fn mark_skipped_segments(m: &mut Move, head: bool) {
    let n = m.segments.len();
    let indices: &[usize] = if head {
        if n == 5 {
            &[0, 1]
        } else {
            &[0, 1, 2]
        }
    } else if n == 5 {
        &[3, 4]
    } else {
        &[4, 5, 6]
    };
    for &i in indices {
        m.segments[i].to_delete = true;
    }
}

/// Inserts a constant-jerk blend curve between `m0` and `m1`.
///
/// Returns `false` (leaving both moves untouched apart from earlier blend
/// bookkeeping) when the corner geometry leaves no room for the curve; the
/// sharp corner then remains and position continuity still holds.
pub(crate) fn blend_corner(
    m0: &mut Move,
    m1: &mut Move,
    acc_limit: &Coord3,
    jerk_limit: &Coord3,
    is_first: bool,
    is_last: bool,
) -> bool {
    let n0 = m0.segments.len();
    let n1 = m1.segments.len();

    // Only chains with a cruise can host a blend.
    if !(n0 == 5 || n0 == 7) || !(n1 == 5 || n1 == 7) {
        return false;
    }

    let i0 = if n0 == 5 { 2 } else { 3 }; // m0's cruise
    let i1 = if n1 == 5 { 2 } else { 3 }; // m1's cruise
    let i2 = i1 + 1; // segment after m1's cruise

    let mut m0dir = m0.dst - m0.src;
    math::normalize(&mut m0dir);
    let mut m1dir = m1.dst - m1.src;
    math::normalize(&mut m1dir);

    let v0 = m0.segments[i0].vel;
    let v1 = m1.segments[i1].vel;

    let dv = v1 - v0;
    let mut jerk_dir = dv;
    math::normalize(&mut jerk_dir);

    // Oversize the blend vectors, then trim per axis, per move, and finally
    // by the jerk budget the acceleration swing leaves available.
    let mut a = jerk_dir * (1.5 * acc_limit.x.max(acc_limit.y).max(acc_limit.z));
    let mut j = jerk_dir * (1.5 * jerk_limit.x.max(jerk_limit.y).max(jerk_limit.z));

    for i in 0..3 {
        if a[i].abs() > acc_limit[i] {
            a *= acc_limit[i] / a[i].abs();
        }
        if j[i].abs() > jerk_limit[i] {
            j *= jerk_limit[i] / j[i].abs();
        }
    }

    let amag = a.norm();
    let jmag = j.norm();
    if m0.acc < amag {
        a *= m0.acc / amag;
    }
    if m0.jerk < jmag {
        j *= m0.jerk / jmag;
    }

    // Largest jerk fraction that keeps |a_i²/Δv_i| within the axis budget.
    let mut max_jerk_lim: Float = 1.0;
    for i in 0..3 {
        if dv[i].abs() > 0.0 {
            let mj = (a[i] * a[i]) / dv[i];
            max_jerk_lim = max_jerk_lim.min((mj / j[i]).abs());
        }
    }
    if max_jerk_lim < 1.0 {
        j *= max_jerk_lim;
    }

    let mut earliest_start = Coord3::zeros();
    let mut latest_start = Coord3::zeros();
    let mut earliest_end = Coord3::zeros();
    let mut latest_end = Coord3::zeros();

    let mut max_jerk_length: Float = 0.0;

    let mut start_point = 0.5 * (m0.src + m0.dst);
    let mut end_point = 0.5 * (m1.src + m1.dst);

    let mut t_blend = if dv.norm() < 0.00001 {
        // Straight continuation at constant speed.
        0.5 * (end_point - start_point).norm() / v0.norm()
    } else {
        blend_duration(&j, &dv)
    };

    let mut double_back = false;

    let dot = m1dir.dot(&m0dir).clamp(-1.0, 1.0);
    let angle_to_turn = dot.acos();

    if angle_to_turn < 0.00001 {
        // Movement does not turn; the curve is a straight insert between the
        // two cruises.
        let t = t_blend;
        let max_jerk_end_point = 2.0 * t * v0 + (t * t * t) * j;
        max_jerk_length = max_jerk_end_point.norm();

        let after0 = if n0 == 5 { 3 } else { 4 };

        earliest_start = start_point;
        latest_end = end_point;
        latest_start = m0.segments[after0].pos;
        earliest_end = m1.segments[i1].pos;
    } else if angle_to_turn > PI - 0.00001 {
        // Movement doubles back in the direction it came from. Work out how
        // far past the corner the decelerate-and-return curve reaches.
        let mut curve_span: Float = 0.0;

        let qa = j.norm() / 2.0;
        if let Some((x0, x1)) = math::solve_quadratic(qa, 0.0, -v0.norm()) {
            let t = x0.max(x1);
            let p0 = t * v0 + (t * t * t / 6.0) * j;
            curve_span = curve_span.max(p0.norm());
        }
        if let Some((x0, x1)) = math::solve_quadratic(qa, 0.0, -v1.norm()) {
            let t = x0.max(x1);
            let p1 = t * v1 + (t * t * t / 6.0) * -j;
            curve_span = curve_span.max(p1.norm());
        }

        let t = t_blend;
        let mut max_jerk_delta = 2.0 * t * v0 + (t * t * t) * j;

        let longest_allowable_length = (start_point - m0.dst)
            .norm()
            .min((end_point - m0.dst).norm());
        if longest_allowable_length == 0.0 {
            log::debug!("reversal blend impossible, corner coincides with a midpoint");
            return false;
        }

        let ratio = (curve_span + max_jerk_delta.norm()) / longest_allowable_length;
        if ratio > 1.0 {
            log::debug!("reversal blend skipped, not enough room before the corner");
            return false;
        }

        if m1.blend_type == CornerBlendType::MinJerk {
            j *= ratio * ratio;
            t_blend = blend_duration(&j, &dv);
            curve_span /= ratio;
            max_jerk_delta *= 1.0 / ratio;
        }

        let mut v0dir = v0;
        math::normalize(&mut v0dir);
        start_point = m0.dst + -curve_span * v0dir;
        end_point = start_point;

        if max_jerk_delta.dot(&v0dir) < 0.0 {
            max_jerk_delta = -max_jerk_delta;
        }
        if v0.norm_squared() > v1.norm_squared() {
            start_point += -max_jerk_delta;
        } else {
            end_point += -max_jerk_delta;
        }

        double_back = true;
    } else {
        // A genuine corner. Work out where along each cruise the curve may
        // start and end, by projecting the usable cruise spans onto an axis
        // perpendicular to the curve's chord.
        let t = t_blend;
        let curve_end_point = 2.0 * t * v0 + (t * t * t) * j;

        let mut seg0_start = 0.5 * (m0.src + m0.dst);
        let seg0_end = m0.dst;
        let seg1_start = m0.dst;
        let mut seg1_end = 0.5 * (m1.src + m1.dst);

        if is_first && m1.blend_type == CornerBlendType::MinJerk {
            if let Some(clearance) = m1.blend_clearance {
                let distance_to_mid = (seg0_start - m0.src).norm();
                let distance_to_earliest = (m0.segments[i0].pos - m0.src).norm();
                let use_clearance = distance_to_earliest.max(clearance.min(distance_to_mid));
                seg0_start = m0.src + use_clearance * m0dir;
            } else {
                seg0_start = m0.segments[i0].pos;
            }
        } else if is_last && m1.blend_type == CornerBlendType::MinJerk {
            if let Some(clearance) = m1.blend_clearance {
                let distance_to_mid = (seg1_end - m1.dst).norm();
                let distance_to_latest = (m1.segments[i2].pos - m1.dst).norm();
                let use_clearance = distance_to_latest.max(clearance.min(distance_to_mid));
                seg1_end = m1.dst - use_clearance * m1dir;
            } else {
                seg1_end = m1.segments[i2].pos;
            }
        }

        let proj_base = m0.dst;

        let mut chord_dir = curve_end_point;
        math::normalize(&mut chord_dir);
        let (cpo_span, _) = math::closest_point_on_line(m0.src, chord_dir, proj_base);

        let mut proj_dir = proj_base - cpo_span;
        if math::normalize(&mut proj_dir) <= 0.0 {
            log::debug!("corner blend skipped, corner lies on the chord line");
            return false;
        }

        let (_, a0) = math::closest_point_on_line(proj_base, proj_dir, seg0_start);
        let (_, a1) = math::closest_point_on_line(proj_base, proj_dir, seg0_end);
        let (_, b0) = math::closest_point_on_line(proj_base, proj_dir, seg1_start);
        let (_, b1) = math::closest_point_on_line(proj_base, proj_dir, seg1_end);

        // Projection spans used to rescale distances back onto the cruises.
        let d0 = a0;
        let d1 = b1;
        if d0 == 0.0 || d1 == 0.0 {
            log::debug!("corner blend skipped, degenerate cruise projection");
            return false;
        }

        let (a0, a1) = if a0 > a1 { (a1, a0) } else { (a0, a1) };
        let (b0, b1) = if b0 > b1 { (b1, b0) } else { (b0, b1) };

        if (a0 > b0 && a0 > b1) || (a1 < b0 && a1 < b1) {
            log::debug!("corner blend skipped, cruises do not overlap");
            return false;
        }

        let mut ds = [a0, a1, b0, b1];
        ds.sort_by(|x, y| x.total_cmp(y));

        let mut inner = ds[1];
        let mut outer = ds[2];
        if inner.abs() > outer.abs() {
            core::mem::swap(&mut inner, &mut outer);
        }

        earliest_start = proj_base + (outer / d0) * (seg0_start - proj_base);
        latest_start = proj_base + (inner / d0) * (seg0_start - proj_base);
        earliest_end = proj_base + (inner / d1) * (seg1_end - proj_base);
        latest_end = proj_base + (outer / d1) * (seg1_end - proj_base);

        max_jerk_length = curve_end_point.norm();
    }

    let shortest_allowable_length = (latest_start - earliest_end).norm(); // higher jerk
    let longest_allowable_length = (earliest_start - latest_end).norm(); // lower jerk

    if longest_allowable_length != 0.0 && max_jerk_length > longest_allowable_length + 0.0000001 {
        log::debug!("corner blend skipped, jerk limit cannot turn this tightly");
        return false;
    }

    if double_back {
        // Endpoints already placed.
    } else if m1.blend_type == CornerBlendType::MaxJerk {
        if max_jerk_length <= shortest_allowable_length {
            // Lower the jerk until the curve fills the shortest allowed span.
            let ratio = max_jerk_length / shortest_allowable_length;
            j *= ratio * ratio;
            t_blend = blend_duration(&j, &dv);
            start_point = latest_start;
            end_point = earliest_end;
        } else {
            // Jerk already fits; slide the endpoints to match the curve.
            let f = ((max_jerk_length - shortest_allowable_length)
                / (longest_allowable_length - shortest_allowable_length))
                .abs();
            start_point = latest_start + f * (earliest_start - latest_start);
            end_point = earliest_end + f * (latest_end - earliest_end);
        }
    } else {
        // MinJerk: stretch the curve over the longest allowed span.
        if j.norm_squared() == 0.0 {
            // Straight continuation; T was already fixed from the distance.
        } else if longest_allowable_length != 0.0 {
            let ratio = max_jerk_length / longest_allowable_length;
            j *= ratio * ratio;
            t_blend = blend_duration(&j, &dv);
        }

        start_point = earliest_start;
        end_point = latest_end;
    }

    // Shorten m0's cruise to stop at the curve start.
    let linear0_len = (start_point - m0.segments[i0].pos).norm();
    m0.segments[i0].duration = linear0_len / v0.norm();

    // Shorten m1's cruise to begin at the curve end.
    let linear1_len = (m1.segments[i2].pos - end_point).norm();
    m1.segments[i1].duration = linear1_len / v1.norm();
    m1.segments[i1].pos = end_point;

    mark_skipped_segments(m0, false);
    mark_skipped_segments(m1, true);

    // Midpoint state of the curve, where the jerk flips sign.
    let t = t_blend;
    let sh = t * v0 + (t * t * t / 6.0) * j;
    let vh = v0 + (t * t / 2.0) * j;
    let ah = t * j;

    m0.segments.push(Segment {
        pos: start_point,
        vel: v0,
        jerk: j,
        duration: t_blend,
        ..Segment::default()
    });
    m0.segments.push(Segment {
        pos: start_point + sh,
        vel: vh,
        acc: ah,
        jerk: -j,
        duration: t_blend,
        ..Segment::default()
    });

    true
}
