//! Main application module: replays a landmark stream through the animator.

use crate::{
    animator::{EyeAnimator, FrameReport},
    config::Config,
    error::{Error, Result},
    source::{EventSource, InputEvent},
};
use log::{info, warn};
use std::io::{BufRead, Write};
use std::time::Instant;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames processed
    pub frames: u64,
    /// Frames that produced no tracked estimate
    pub skipped: u64,
    /// Control events applied
    pub controls: u64,
    /// Lines that could not be parsed
    pub invalid_lines: u64,
}

/// Gaze mirror application
pub struct GazeMirrorApp {
    animator: EyeAnimator,
}

impl GazeMirrorApp {
    /// Build the application from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the face model cannot be loaded
    pub fn new(config: &Config) -> Result<Self> {
        config.validate_settings()?;
        let model = config.load_face_model()?;
        let strategy = config.create_strategy_with_model(model)?;
        let actuator = config.create_actuator();
        Ok(Self {
            animator: EyeAnimator::new(strategy, actuator),
        })
    }

    /// The animator driven by this application
    #[must_use]
    pub const fn animator(&self) -> &EyeAnimator {
        &self.animator
    }

    /// Process every event from `reader`, writing one JSON report per frame to `writer`
    ///
    /// Malformed lines are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails
    pub fn run<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let started = Instant::now();

        for event in EventSource::new(reader) {
            match event {
                Ok(InputEvent::Control(input)) => {
                    self.animator.control(input);
                    summary.controls += 1;
                }
                Ok(InputEvent::Frame(frame)) => {
                    let report = self
                        .animator
                        .process_frame(frame.landmarks.as_ref(), frame.width, frame.height);
                    if report.failure.is_some() {
                        summary.skipped += 1;
                    }
                    summary.frames += 1;
                    Self::write_report(&mut writer, &report)?;
                }
                Err(Error::InvalidInput(msg)) => {
                    warn!("Skipping input: {msg}");
                    summary.invalid_lines += 1;
                }
                Err(e) => return Err(e),
            }
        }
        writer.flush()?;

        info!(
            "Processed {} frames ({} without estimate, {} controls, {} invalid lines) in {:.2?}",
            summary.frames,
            summary.skipped,
            summary.controls,
            summary.invalid_lines,
            started.elapsed()
        );
        Ok(summary)
    }

    fn write_report<W: Write>(writer: &mut W, report: &FrameReport) -> Result<()> {
        serde_json::to_writer(&mut *writer, report).map_err(|e| Error::Io(e.into()))?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
