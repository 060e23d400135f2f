//! Error types for the gaze mirror library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// The landmark detector found no face in the frame
    #[error("No face landmarks in frame")]
    NoLandmarks,

    /// A landmark index the pipeline needs is not present in the set
    #[error("Missing landmark index {0}")]
    MissingLandmark(usize),

    /// Pose or affine solve could not produce a usable result
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Frame width or height is not positive
    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidFrameDimensions {
        /// Frame width in pixels
        width: i32,
        /// Frame height in pixels
        height: i32,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error only affects the current frame.
    ///
    /// Frame-level failures are skipped: the frame contributes no estimate and
    /// the pupils drift back to their sockets.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoLandmarks
                | Self::MissingLandmark(_)
                | Self::DegenerateGeometry(_)
                | Self::InvalidFrameDimensions { .. }
        )
    }

    /// Short stable name used in frame reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoLandmarks => "no_landmarks",
            Self::MissingLandmark(_) => "missing_landmark",
            Self::DegenerateGeometry(_) => "degenerate_geometry",
            Self::InvalidFrameDimensions { .. } => "invalid_frame_dimensions",
            Self::InvalidInput(_) => "invalid_input",
            Self::ConfigError(_) => "config_error",
            Self::Io(_) => "io",
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
