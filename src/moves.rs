//! Point-to-point move commands.

use crate::segment::{Segment, State};
use crate::{Coord3, Float};

/// How the corner leading into a move is blended (constant-jerk mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerBlendType {
    /// Keep the sharp corner.
    None,
    /// Stretch the blend curve over all available room, minimizing jerk.
    MinJerk,
    /// Keep the blend curve as tight as the jerk limit allows.
    #[default]
    MaxJerk,
}

/// A single linear move with its kinematic limits and blend policy.
///
/// `segments`, `duration`, `scheduled_time` and the traversal cursors are
/// filled in by the planner; callers only provide the endpoints, the scalar
/// limits and the blend settings.
#[derive(Debug, Clone, Default)]
pub struct Move {
    pub src: Coord3,
    pub dst: Coord3,

    /// Velocity limit along the move, must be positive.
    pub vel: Float,
    /// Acceleration limit along the move, must be positive.
    pub acc: Float,
    /// Jerk limit along the move, must be positive.
    pub jerk: Float,
    pub blend_type: CornerBlendType,
    /// Minimum distance blend endpoints keep from the chain's first and last
    /// points. `None` disables the clearance.
    pub blend_clearance: Option<Float>,

    /// Auxiliary scaler coordinate at the end of this move.
    pub scaler: Float,

    pub segments: Vec<Segment>,

    pub duration: Float,
    pub scheduled_time: Float,
    pub traversal_segment_index: usize,
    pub traversal_segment_time: Float,
}

impl Move {
    pub fn new(src: Coord3, dst: Coord3, vel: Float, acc: Float, jerk: Float) -> Self {
        Self {
            src,
            dst,
            vel,
            acc,
            jerk,
            ..Self::default()
        }
    }

    /// Evaluates this move's own segment chain `t` seconds after its start.
    ///
    /// Returns the pose and whether `t` falls inside the chain; out-of-range
    /// times clamp to the first or last pose.
    pub fn state_at(&self, t: Float) -> (State, bool) {
        let Some(first) = self.segments.first() else {
            return (State::default(), false);
        };

        if t <= 0.0 {
            return (first.state_at(0.0), t == 0.0);
        }

        let mut total_t = 0.0;
        for s in &self.segments {
            let end_t = total_t + s.duration;
            if t >= total_t && t < end_t {
                return (s.state_at(t - total_t), true);
            }
            total_t = end_t;
        }

        let last = self.segments[self.segments.len() - 1];
        (last.state_at(last.duration), false)
    }

    /// Advances this move's traversal cursor by `dt` and returns the new
    /// position, plus `false` once the cursor has passed the final segment.
    pub fn advance_traverse(&mut self, dt: Float) -> (Coord3, bool) {
        if self.segments.is_empty() {
            return (Coord3::zeros(), false);
        }

        self.traversal_segment_time += dt;
        let mut seg = self.segments[self.traversal_segment_index];

        // Consume short segments with a loop instead of assuming dt lands in
        // the next one; stepping beyond a segment's end and then re-entering
        // the following segment near its start would briefly reverse the
        // direction of travel.
        while self.traversal_segment_time > seg.duration {
            if self.traversal_segment_index < self.segments.len() - 1 {
                self.traversal_segment_index += 1;
                self.traversal_segment_time -= seg.duration;
                seg = self.segments[self.traversal_segment_index];
            } else {
                return (seg.end_position(), false);
            }
        }

        (seg.position_at(self.traversal_segment_time), true)
    }

    pub fn reset_traverse(&mut self) {
        self.traversal_segment_index = 0;
        self.traversal_segment_time = 0.0;
    }
}
