//! Pupil actuation: socket-relative targets with first-order smoothing.

use crate::{
    constants::{DEFAULT_LEFT_SOCKET, DEFAULT_MAX_OFFSET, DEFAULT_RIGHT_SOCKET, DEFAULT_SMOOTHING_ALPHA},
    direction::Direction,
    utils::safe_cast::round_to_i32,
    Result,
};
use serde::{Deserialize, Serialize};

/// A position on the display, in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PupilPosition {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl PupilPosition {
    /// Create a position
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another position
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Round to whole pixels
    ///
    /// # Errors
    ///
    /// Returns an error if a coordinate is not finite or outside i32 range
    pub fn to_pixels(&self) -> Result<(i32, i32)> {
        Ok((round_to_i32(self.x)?, round_to_i32(self.y)?))
    }
}

impl From<(f64, f64)> for PupilPosition {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Current and target position of one pupil
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PupilState {
    /// Where the pupil is drawn this frame
    pub current: PupilPosition,
    /// Where the pupil is heading
    pub target: PupilPosition,
}

/// Both rendered pupils
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    /// Left rendered pupil
    pub left: PupilState,
    /// Right rendered pupil
    pub right: PupilState,
}

impl ActuatorState {
    /// Whether both pupils are within `epsilon` pixels of their targets
    #[must_use]
    pub fn is_settled(&self, epsilon: f64) -> bool {
        self.left.current.distance(&self.left.target) <= epsilon
            && self.right.current.distance(&self.right.target) <= epsilon
    }

    /// Current positions rounded to whole pixels (left, right)
    ///
    /// # Errors
    ///
    /// Returns an error if a position cannot be represented as i32
    pub fn pixel_positions(&self) -> Result<[(i32, i32); 2]> {
        Ok([self.left.current.to_pixels()?, self.right.current.to_pixels()?])
    }
}

/// Moves the rendered pupils toward `socket + direction × max_offset`
#[derive(Debug, Clone)]
pub struct PupilActuator {
    left_socket: PupilPosition,
    right_socket: PupilPosition,
    max_offset: f64,
    alpha: f64,
    state: ActuatorState,
}

impl Default for PupilActuator {
    fn default() -> Self {
        Self::new(
            DEFAULT_LEFT_SOCKET.into(),
            DEFAULT_RIGHT_SOCKET.into(),
            DEFAULT_MAX_OFFSET,
            DEFAULT_SMOOTHING_ALPHA,
        )
    }
}

impl PupilActuator {
    /// Create an actuator with both pupils resting in their sockets
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range (0, 1]
    #[must_use]
    pub fn new(left_socket: PupilPosition, right_socket: PupilPosition, max_offset: f64, alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        let rest = |socket| PupilState {
            current: socket,
            target: socket,
        };
        Self {
            left_socket,
            right_socket,
            max_offset,
            alpha,
            state: ActuatorState {
                left: rest(left_socket),
                right: rest(right_socket),
            },
        }
    }

    /// State after the most recent step
    #[must_use]
    pub const fn state(&self) -> &ActuatorState {
        &self.state
    }

    /// Smoothing factor
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Advance one frame. `None` sends both pupils back to their sockets.
    pub fn step(&mut self, direction: Option<Direction>) -> ActuatorState {
        let direction = direction.unwrap_or(Direction::CENTER);
        let (max_offset, alpha) = (self.max_offset, self.alpha);

        let advance = |pupil: &mut PupilState, socket: PupilPosition| {
            pupil.target = PupilPosition::new(
                direction.x.mul_add(max_offset, socket.x),
                direction.y.mul_add(max_offset, socket.y),
            );
            pupil.current = PupilPosition::new(
                alpha.mul_add(pupil.target.x - pupil.current.x, pupil.current.x),
                alpha.mul_add(pupil.target.y - pupil.current.y, pupil.current.y),
            );
        };
        advance(&mut self.state.left, self.left_socket);
        advance(&mut self.state.right, self.right_socket);

        self.state
    }

    /// Snap both pupils back into their sockets
    pub fn reset(&mut self) {
        *self = Self::new(self.left_socket, self.right_socket, self.max_offset, self.alpha);
    }
}
