//! Planning failures surfaced by [`Planner::calculate`](crate::Planner::calculate).

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlannerError {
    /// The global velocity limit has a zero component.
    #[error("global velocity limit has a zero component")]
    ZeroVelocityLimit,

    /// The global acceleration limit has a zero component.
    #[error("global acceleration limit has a zero component")]
    ZeroAccelerationLimit,

    /// The global jerk limit has a zero component.
    #[error("global jerk limit has a zero component")]
    ZeroJerkLimit,

    /// A queued move has a non-positive velocity, acceleration or jerk limit.
    #[error("move {index} has a non-positive velocity, acceleration or jerk limit")]
    InvalidMoveLimit { index: usize },
}
