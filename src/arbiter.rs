//! Manual override of the tracked look direction.

use crate::direction::Direction;
use serde::{Deserialize, Serialize};

/// Who decides where the pupils look
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Follow the estimated direction
    #[default]
    Tracking,
    /// Hold an operator-chosen direction
    Manual,
}

/// Operator-chosen look direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualDirection {
    /// Look left
    Left,
    /// Look right
    Right,
    /// Look up, toward the top of the display
    Up,
    /// Look straight ahead
    #[default]
    Center,
}

impl ManualDirection {
    /// Direction vector for the rendered pupils
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Left => Direction::new(-1.0, 0.0),
            Self::Right => Direction::new(1.0, 0.0),
            Self::Up => Direction::new(0.0, -1.0),
            Self::Center => Direction::CENTER,
        }
    }
}

/// Operator input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlInput {
    /// Hold a direction until released
    Manual(ManualDirection),
    /// Go back to tracking
    Release,
}

/// Tracking/manual state machine. Manual mode has no timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeArbiter {
    mode: Mode,
    manual: ManualDirection,
}

impl ModeArbiter {
    /// Start in tracking mode
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Last manual direction chosen, kept across releases
    #[must_use]
    pub const fn manual_direction(&self) -> ManualDirection {
        self.manual
    }

    /// Apply an operator input
    pub fn handle(&mut self, input: ControlInput) {
        match input {
            ControlInput::Manual(direction) => {
                self.mode = Mode::Manual;
                self.manual = direction;
            }
            ControlInput::Release => self.mode = Mode::Tracking,
        }
        log::debug!("Mode {:?} (manual direction {:?})", self.mode, self.manual);
    }

    /// Direction for this frame. `tracked` only runs in tracking mode.
    pub fn resolve<F>(&self, tracked: F) -> Option<Direction>
    where
        F: FnOnce() -> Option<Direction>,
    {
        match self.mode {
            Mode::Manual => Some(self.manual.direction()),
            Mode::Tracking => tracked(),
        }
    }
}
