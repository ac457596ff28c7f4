//! The planner facade: move queue, limits, pipeline, sampling, traversal.

use crate::corner_blend::blend_corner;
use crate::error::PlannerError;
use crate::moves::{CornerBlendType, Move};
use crate::schedule::calculate_schedules;
use crate::scurve::plan_move;
use crate::segment::Segment;
use crate::{Coord3, Float};

/// How corners between consecutive moves are smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerBlendMethod {
    /// No smoothing; each move decelerates to rest at its destination.
    #[default]
    None,
    /// Splice constant-jerk curves into the segment list.
    ConstantJerkSegments,
    /// Overlap neighbouring moves in time and sum their poses.
    InterpolatedMoves,
}

/// Trajectory state returned by [`Planner::sample`].
///
/// Sampling never fails: times before the trajectory clamp to the starting
/// pose, times past its end clamp to the final pose, both with `running`
/// false. `segment_index` is only meaningful in constant-jerk mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sample {
    pub segment_index: Option<usize>,
    pub pos: Coord3,
    pub vel: Coord3,
    pub acc: Coord3,
    pub jerk: Coord3,
    pub scaler: Float,
    pub running: bool,
}

/// Jerk-limited trajectory planner over a chain of linear moves.
///
/// Usage: set the global limits and blend method, [`append_move`] the chain,
/// run [`calculate`], then read the trajectory through [`sample`] or
/// [`advance_traverse`].
///
/// [`append_move`]: Planner::append_move
/// [`calculate`]: Planner::calculate
/// [`sample`]: Planner::sample
/// [`advance_traverse`]: Planner::advance_traverse
#[derive(Debug, Clone)]
pub struct Planner {
    pub blend_method: CornerBlendMethod,
    pub pos_limit_lower: Coord3,
    pub pos_limit_upper: Coord3,
    pub vel_limit: Coord3,
    pub acc_limit: Coord3,
    pub jerk_limit: Coord3,

    moves: Vec<Move>,
    segments: Vec<Segment>,

    max_overlap_fraction: Float,

    traversal_segment_index: usize,
    traversal_segment_time: Float,
    traversal_time: Float,
    traversal_pos: Coord3,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

impl Planner {
    pub fn new() -> Self {
        Self {
            blend_method: CornerBlendMethod::None,
            pos_limit_lower: Coord3::zeros(),
            pos_limit_upper: Coord3::zeros(),
            vel_limit: Coord3::zeros(),
            acc_limit: Coord3::zeros(),
            jerk_limit: Coord3::zeros(),
            moves: Vec::new(),
            segments: Vec::new(),
            max_overlap_fraction: 0.28,
            traversal_segment_index: 0,
            traversal_segment_time: 0.0,
            traversal_time: 0.0,
            traversal_pos: Coord3::zeros(),
        }
    }

    pub fn set_position_limits(
        &mut self,
        lx: Float,
        ly: Float,
        lz: Float,
        ux: Float,
        uy: Float,
        uz: Float,
    ) {
        self.pos_limit_lower = Coord3::new(lx, ly, lz);
        self.pos_limit_upper = Coord3::new(ux, uy, uz);
    }

    pub fn set_velocity_limits(&mut self, x: Float, y: Float, z: Float) {
        self.vel_limit = Coord3::new(x, y, z);
    }

    pub fn set_acceleration_limits(&mut self, x: Float, y: Float, z: Float) {
        self.acc_limit = Coord3::new(x, y, z);
    }

    pub fn set_jerk_limits(&mut self, x: Float, y: Float, z: Float) {
        self.jerk_limit = Coord3::new(x, y, z);
    }

    pub fn set_corner_blend_method(&mut self, method: CornerBlendMethod) {
        self.blend_method = method;
    }

    /// Caps the fraction of a move the interpolated scheduler may overlap
    /// with its neighbour. Clamped to `[0, 1]`.
    pub fn set_max_overlap_fraction(&mut self, fraction: Float) {
        self.max_overlap_fraction = fraction.clamp(0.0, 1.0);
    }

    /// Queues a move, chaining its `src` to the previous destination.
    ///
    /// Moves with non-positive limits and moves that would not go anywhere
    /// are rejected with a warning and `false`.
    pub fn append_move(&mut self, mut m: Move) -> bool {
        if m.vel <= 0.0 {
            log::warn!("ignoring move with non-positive velocity limit");
            return false;
        }
        if m.acc <= 0.0 {
            log::warn!("ignoring move with non-positive acceleration limit");
            return false;
        }
        if m.jerk <= 0.0 {
            log::warn!("ignoring move with non-positive jerk limit");
            return false;
        }

        if let Some(last) = self.moves.last() {
            m.src = last.dst;
            if m.src == m.dst {
                log::warn!("ignoring move with no displacement");
                return false;
            }
        }

        self.moves.push(m);
        true
    }

    /// Drops all queued moves and calculated segments.
    pub fn clear(&mut self) {
        self.moves.clear();
        self.segments.clear();
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// The collated segment list, the canonical read surface in constant-jerk
    /// mode.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Runs the planning pipeline over the queued moves.
    ///
    /// Rebuilds every move's segment chain, so calling it again on unchanged
    /// input reproduces the same trajectory.
    pub fn calculate(&mut self) -> Result<(), PlannerError> {
        self.segments.clear();

        if self.vel_limit.iter().any(|c| *c == 0.0) {
            return Err(PlannerError::ZeroVelocityLimit);
        }
        if self.acc_limit.iter().any(|c| *c == 0.0) {
            return Err(PlannerError::ZeroAccelerationLimit);
        }
        if self.jerk_limit.iter().any(|c| *c == 0.0) {
            return Err(PlannerError::ZeroJerkLimit);
        }
        for (index, m) in self.moves.iter().enumerate() {
            if m.vel <= 0.0 || m.acc <= 0.0 || m.jerk <= 0.0 {
                return Err(PlannerError::InvalidMoveLimit { index });
            }
        }

        for i in 0..self.moves.len() {
            plan_move(
                &mut self.moves[i],
                &self.vel_limit,
                &self.acc_limit,
                &self.jerk_limit,
            );

            if self.blend_method == CornerBlendMethod::ConstantJerkSegments
                && i > 0
                && self.moves[i].blend_type != CornerBlendType::None
            {
                let is_first = i == 1;
                let is_last = i == self.moves.len() - 1;
                let (head, tail) = self.moves.split_at_mut(i);
                if !blend_corner(
                    &mut head[i - 1],
                    &mut tail[0],
                    &self.acc_limit,
                    &self.jerk_limit,
                    is_first,
                    is_last,
                ) {
                    log::debug!("corner between moves {} and {} left sharp", i - 1, i);
                }
            }
        }

        if self.blend_method == CornerBlendMethod::ConstantJerkSegments {
            for m in &mut self.moves {
                m.segments.retain(|s| !s.to_delete && s.duration > 0.0);
            }
        }

        self.collate_segments();

        if self.blend_method == CornerBlendMethod::InterpolatedMoves {
            calculate_schedules(&mut self.moves, self.max_overlap_fraction);
        }

        self.reset_traverse();

        Ok(())
    }

    /// Tags every per-move segment with its owner, ordering and scaler span.
    fn tag_scalars(&mut self) {
        let mut id = 0;
        let mut scaler_start: Float = 0.0;
        for (i, m) in self.moves.iter_mut().enumerate() {
            for s in &mut m.segments {
                s.end_pos = m.dst;
                s.start_pos = m.src;
                s.scaler = m.scaler - scaler_start;
                s.scaler_start = scaler_start;
                s.consecutive_number = id;
                s.move_owner = i;
                id += 1;
            }
            scaler_start = m.scaler;
        }
    }

    /// Segments that begin exactly at their owner's destination (the tail
    /// halves of corner blends) interpolate their scaler over the following
    /// move's span instead.
    fn rebind_scaler_spans(&mut self) {
        for i in 0..self.segments.len().saturating_sub(1) {
            let s = self.segments[i];
            if s.duration > 0.0 && s.end_pos == s.pos {
                if let Some(next) = self.moves.get(s.move_owner + 1) {
                    let scaler_start = self.moves[s.move_owner].scaler;
                    let (start_pos, end_pos) = (next.src, next.dst);
                    let s = &mut self.segments[i];
                    s.end_pos = end_pos;
                    s.start_pos = start_pos;
                    s.scaler_start = scaler_start;
                }
            }
        }
    }

    /// Flattens the surviving per-move segments into the planner-wide list.
    fn collate_segments(&mut self) {
        self.tag_scalars();

        for i in 0..self.moves.len() {
            for k in 0..self.moves[i].segments.len() {
                let s = self.moves[i].segments[k];
                if s.duration > 0.0 {
                    self.segments.push(s);
                }
            }
        }

        self.rebind_scaler_spans();
    }

    /// Evaluates the trajectory at time `t`.
    pub fn sample(&self, t: Float) -> Sample {
        match self.blend_method {
            CornerBlendMethod::InterpolatedMoves => self.sample_interpolated(t),
            _ => self.sample_constant_jerk(t),
        }
    }

    fn sample_constant_jerk(&self, t: Float) -> Sample {
        let Some(first) = self.segments.first() else {
            return Sample::default();
        };

        if t <= 0.0 {
            let state = first.state_at(0.0);
            return Sample {
                segment_index: Some(0),
                pos: state.pos,
                vel: state.vel,
                acc: state.acc,
                jerk: state.jerk,
                scaler: first.scaler_at(0.0),
                running: t == 0.0,
            };
        }

        let mut total_t = 0.0;
        for (i, s) in self.segments.iter().enumerate() {
            let end_t = total_t + s.duration;
            if t >= total_t && t < end_t {
                let local = t - total_t;
                let state = s.state_at(local);
                return Sample {
                    segment_index: Some(i),
                    pos: state.pos,
                    vel: state.vel,
                    acc: state.acc,
                    jerk: state.jerk,
                    scaler: s.scaler_at(local),
                    running: true,
                };
            }
            total_t = end_t;
        }

        let last = self.segments[self.segments.len() - 1];
        let state = last.state_at(last.duration);
        Sample {
            segment_index: Some(self.segments.len() - 1),
            pos: state.pos,
            vel: state.vel,
            acc: state.acc,
            jerk: state.jerk,
            scaler: last.scaler_at(last.duration),
            running: false,
        }
    }

    fn sample_interpolated(&self, t: Float) -> Sample {
        let mut state = crate::segment::State::default();
        let mut running = false;

        let mut last_src = Coord3::zeros();
        let mut moves_used = 0;

        for m in &self.moves {
            let end = m.scheduled_time + m.duration;
            if t < m.scheduled_time || t > end {
                continue;
            }

            last_src = m.src;
            moves_used += 1;

            let (s, r) = m.state_at(t - m.scheduled_time);
            running |= r;
            state = state + s;
        }

        if moves_used == 0 {
            // Outside every window: clamp to the chain's first or last pose.
            let pos = match (self.moves.first(), self.moves.last()) {
                (Some(first), _) if t < first.scheduled_time => first.src,
                (_, Some(last)) => last.dst,
                _ => Coord3::zeros(),
            };
            return Sample {
                pos,
                ..Sample::default()
            };
        }

        if moves_used > 1 {
            // Both overlapping moves start near the shared corner; the sum
            // counts it twice.
            state.pos -= last_src;
        }

        Sample {
            segment_index: None,
            pos: state.pos,
            vel: state.vel,
            acc: state.acc,
            jerk: state.jerk,
            scaler: 0.0,
            running,
        }
    }

    /// Total duration of the planned trajectory.
    pub fn traverse_time(&self) -> Float {
        match self.blend_method {
            CornerBlendMethod::InterpolatedMoves => self
                .moves
                .iter()
                .map(|m| m.scheduled_time + m.duration)
                .fold(0.0, Float::max),
            _ => self.segments.iter().map(|s| s.duration).sum(),
        }
    }

    /// Rewinds the stateful traversal to the start of the trajectory.
    pub fn reset_traverse(&mut self) {
        self.traversal_segment_index = 0;
        self.traversal_segment_time = 0.0;
        self.traversal_time = 0.0;
        self.traversal_pos = Coord3::zeros();
        for m in &mut self.moves {
            m.reset_traverse();
        }
    }

    /// Steps the traversal forward by `dt` and returns the new position,
    /// plus `false` once the end of the trajectory has been passed.
    pub fn advance_traverse(&mut self, dt: Float) -> (Coord3, bool) {
        match self.blend_method {
            CornerBlendMethod::InterpolatedMoves => self.advance_traverse_interpolated(dt),
            _ => self.advance_traverse_constant_jerk(dt),
        }
    }

    fn advance_traverse_constant_jerk(&mut self, dt: Float) -> (Coord3, bool) {
        if self.segments.is_empty() {
            return (Coord3::zeros(), false);
        }
        if self.traversal_segment_index >= self.segments.len() {
            return (self.traversal_pos, false);
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
                self.traversal_pos = seg.end_position();
                return (self.traversal_pos, false);
            }
        }

        self.traversal_pos = seg.position_at(self.traversal_segment_time);
        (self.traversal_pos, true)
    }

    fn advance_traverse_interpolated(&mut self, dt: Float) -> (Coord3, bool) {
        let mut pos = Coord3::zeros();
        let mut running = false;

        let mut last_src = Coord3::zeros();
        let mut moves_used = 0;
        let mut moves_remain = false;

        self.traversal_time += dt;

        for m in &mut self.moves {
            if self.traversal_time < m.scheduled_time {
                moves_remain = true;
                break;
            }
            if self.traversal_time > m.scheduled_time + m.duration {
                continue;
            }

            last_src = m.src;
            moves_used += 1;

            let (p, r) = m.advance_traverse(dt);
            running |= r;
            pos += p;
        }

        if moves_used > 0 {
            if moves_used > 1 {
                pos -= last_src;
            }
            self.traversal_pos = pos;
        } else {
            pos = self.traversal_pos;
            if moves_remain {
                return (pos, true);
            }
        }

        (pos, running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn basic_planner() -> Planner {
        let mut p = Planner::new();
        p.set_position_limits(-100.0, -100.0, -100.0, 100.0, 100.0, 100.0);
        p.set_velocity_limits(20.0, 20.0, 20.0);
        p.set_acceleration_limits(500.0, 500.0, 500.0);
        p.set_jerk_limits(5000.0, 5000.0, 5000.0);
        p
    }

    fn line_move(dst: Coord3) -> Move {
        Move::new(Coord3::zeros(), dst, 10.0, 100.0, 1000.0)
    }

    #[test]
    fn zero_limit_component_fails_calculation() {
        let mut p = basic_planner();
        p.set_velocity_limits(0.0, 20.0, 20.0);
        p.append_move(line_move(Coord3::new(10.0, 0.0, 0.0)));

        assert_eq!(p.calculate(), Err(PlannerError::ZeroVelocityLimit));
        assert!(p.segments().is_empty());
    }

    #[test]
    fn append_chains_sources_and_rejects_noops() {
        let mut p = basic_planner();

        assert!(p.append_move(line_move(Coord3::new(10.0, 0.0, 0.0))));

        // src is overwritten by the previous destination.
        let mut m = line_move(Coord3::new(10.0, 10.0, 0.0));
        m.src = Coord3::new(5.0, 5.0, 5.0);
        assert!(p.append_move(m));
        assert_eq!(p.moves()[1].src, Coord3::new(10.0, 0.0, 0.0));

        // A chained move that goes nowhere is dropped.
        assert!(!p.append_move(line_move(Coord3::new(10.0, 10.0, 0.0))));
        assert_eq!(p.moves().len(), 2);

        // Non-positive limits are dropped.
        let mut bad = line_move(Coord3::new(0.0, 0.0, 5.0));
        bad.jerk = 0.0;
        assert!(!p.append_move(bad));
    }

    #[test]
    fn calculate_is_idempotent() {
        let mut p = basic_planner();
        p.set_corner_blend_method(CornerBlendMethod::ConstantJerkSegments);
        let mut m0 = line_move(Coord3::new(10.0, 0.0, 0.0));
        m0.blend_type = CornerBlendType::MinJerk;
        let mut m1 = line_move(Coord3::new(10.0, 10.0, 0.0));
        m1.blend_type = CornerBlendType::MinJerk;
        p.append_move(m0);
        p.append_move(m1);

        p.calculate().unwrap();
        let first = p.segments().to_vec();
        p.calculate().unwrap();

        assert_eq!(first, p.segments());
    }

    #[test]
    fn clear_drops_everything() {
        let mut p = basic_planner();
        p.append_move(line_move(Coord3::new(10.0, 0.0, 0.0)));
        p.calculate().unwrap();
        assert!(!p.segments().is_empty());

        p.clear();
        assert!(p.moves().is_empty());
        assert!(p.segments().is_empty());
        assert_approx_eq!(f64, p.traverse_time(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn sampling_an_empty_planner_is_harmless() {
        let p = basic_planner();
        let s = p.sample(1.0);
        assert!(!s.running);
        assert_eq!(s.segment_index, None);
        assert_eq!(s.pos, Coord3::zeros());
    }

    #[test]
    fn scaler_channel_follows_path_length() {
        let mut p = basic_planner();
        let mut m0 = line_move(Coord3::new(10.0, 0.0, 0.0));
        m0.scaler = 2.0;
        let mut m1 = line_move(Coord3::new(10.0, 10.0, 0.0));
        m1.scaler = 3.0;
        p.append_move(m0);
        p.append_move(m1);
        p.calculate().unwrap();

        // Ramps cover x = 0..1 in 0.2 s; x = 5 of 10 at t = 0.6.
        let s = p.sample(0.6);
        assert_approx_eq!(f64, s.pos.x, 5.0, epsilon = 1e-6);
        assert_approx_eq!(f64, s.scaler, 1.0, epsilon = 1e-6);

        // Halfway through the second move: y = 5 of 10, scaler 2 → 3.
        let s = p.sample(1.2 + 0.6);
        assert_approx_eq!(f64, s.pos.y, 5.0, epsilon = 1e-6);
        assert_approx_eq!(f64, s.scaler, 2.5, epsilon = 1e-6);
    }
}
