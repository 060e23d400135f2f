//! Per-frame orchestration: arbiter, direction strategy, actuator.

use crate::{
    actuator::{ActuatorState, PupilActuator},
    arbiter::{ControlInput, Mode, ModeArbiter},
    direction::{Direction, DirectionStrategy},
    landmarks::LandmarkSet,
    Error,
};
use serde::Serialize;

/// What happened in one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    /// Zero-based frame counter
    pub frame: u64,
    /// Mode the frame was processed in
    pub mode: Mode,
    /// Direction fed to the actuator, `None` when nothing was estimated
    pub direction: Option<Direction>,
    /// Pupil positions after this frame
    pub pupils: ActuatorState,
    /// Pupil positions rounded to whole pixels (left, right)
    pub pixels: Option<[(i32, i32); 2]>,
    /// Why tracking produced no estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Drives the rendered pupils from landmark frames and operator input
pub struct EyeAnimator {
    strategy: Box<dyn DirectionStrategy>,
    actuator: PupilActuator,
    arbiter: ModeArbiter,
    frame: u64,
}

impl EyeAnimator {
    /// Create an animator in tracking mode
    #[must_use]
    pub fn new(strategy: Box<dyn DirectionStrategy>, actuator: PupilActuator) -> Self {
        log::info!("Eye animator using '{}' direction strategy", strategy.name());
        Self {
            strategy,
            actuator,
            arbiter: ModeArbiter::new(),
            frame: 0,
        }
    }

    /// Direction strategy in use
    #[must_use]
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.arbiter.mode()
    }

    /// Pupil state after the last frame
    #[must_use]
    pub const fn state(&self) -> &ActuatorState {
        self.actuator.state()
    }

    /// Apply an operator input
    pub fn control(&mut self, input: ControlInput) {
        self.arbiter.handle(input);
    }

    /// Process one frame. `None` means the detector found no face.
    ///
    /// Estimation failures never propagate: the frame contributes no direction
    /// and the pupils drift back toward their sockets.
    pub fn process_frame(&mut self, landmarks: Option<&LandmarkSet>, width: i32, height: i32) -> FrameReport {
        let strategy = self.strategy.as_ref();
        let mut failure: Option<Error> = None;

        let direction = self.arbiter.resolve(|| {
            let result = landmarks
                .ok_or(Error::NoLandmarks)
                .and_then(|set| strategy.estimate(set, width, height));
            match result {
                Ok(direction) => Some(direction),
                Err(e) => {
                    if e.is_recoverable() {
                        log::debug!("Frame skipped: {e}");
                    } else {
                        log::warn!("Frame skipped: {e}");
                    }
                    failure = Some(e);
                    None
                }
            }
        });

        let pupils = self.actuator.step(direction);
        let report = FrameReport {
            frame: self.frame,
            mode: self.arbiter.mode(),
            direction,
            pupils,
            pixels: pupils.pixel_positions().ok(),
            failure: failure.map(|e| e.kind().to_string()),
        };
        self.frame += 1;
        report
    }
}
