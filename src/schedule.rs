//! Overlap scheduling for the interpolated blend mode.
//!
//! Instead of splicing segments, interpolated blending starts each move
//! before its predecessor has finished; the sampler sums the overlapping
//! poses. This module assigns the start times.

use crate::moves::{CornerBlendType, Move};
use crate::Float;

/// Sums each move's duration and assigns `scheduled_time`s so that blendable
/// neighbours overlap.
///
/// The overlap may eat up to 99% of a move that faces a chain boundary (or a
/// non-blending neighbour) and up to 50% of a move squeezed from both sides,
/// both capped by `max_overlap_fraction`. The 50% middle cap is what keeps
/// any instant inside at most two moves.
pub(crate) fn calculate_schedules(moves: &mut [Move], max_overlap_fraction: Float) {
    if moves.is_empty() {
        return;
    }

    for m in moves.iter_mut() {
        m.duration = m.segments.iter().map(|s| s.duration).sum();
    }

    moves[0].scheduled_time = 0.0;

    let mut last_move_had_no_blend = false;

    for i in 1..moves.len() {
        let prev_end = moves[i - 1].scheduled_time + moves[i - 1].duration;

        if moves[i].blend_type == CornerBlendType::None {
            moves[i].scheduled_time = prev_end;
            last_move_had_no_blend = true;
            continue;
        }

        let is_first = i == 1 || last_move_had_no_blend;
        let is_last =
            i == moves.len() - 1 || moves[i + 1].blend_type == CornerBlendType::None;

        last_move_had_no_blend = false;

        let f0 = if is_first { 0.99 } else { 0.5 };
        let f1 = if is_last { 0.99 } else { 0.5 };
        let f0 = Float::min(f0, max_overlap_fraction);
        let f1 = Float::min(f1, max_overlap_fraction);

        let blend_time = Float::min(f0 * moves[i - 1].duration, f1 * moves[i].duration);

        moves[i].scheduled_time = prev_end - blend_time.max(0.0);
    }
}
