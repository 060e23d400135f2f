//! Configuration management for the gaze mirror application

use crate::{
    actuator::{PupilActuator, PupilPosition},
    affine::AffineOptions,
    constants::{
        DEFAULT_BLINK_THRESHOLD, DEFAULT_LEFT_SOCKET, DEFAULT_MAX_OFFSET, DEFAULT_QUANTIZE_THRESHOLD,
        DEFAULT_RIGHT_SOCKET, DEFAULT_SMOOTHING_ALPHA,
    },
    direction::{create_strategy_with, DirectionStrategy, StrategyThresholds},
    face_model::FaceModel,
    gaze::{GazeEstimator, GazeOptions},
    pose_estimation::PoseOptions,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Face model configuration
    pub face_model: FaceModelConfig,

    /// Pose solver configuration
    pub pose: PoseOptions,

    /// Image-to-model affine configuration
    pub affine: AffineOptions,

    /// Gaze projection configuration
    pub gaze: GazeOptions,

    /// Direction strategy configuration
    pub direction: DirectionConfig,

    /// Pupil actuator configuration
    pub actuator: ActuatorConfig,
}

/// Face model source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceModelConfig {
    /// Text file with 24 model values; the built-in model when absent
    pub path: Option<PathBuf>,
}

/// Direction strategy selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionConfig {
    /// Strategy name (reprojection, quantized, iris, face)
    pub strategy: String,

    /// Dead-zone threshold for the quantized strategy
    pub quantize_threshold: f64,

    /// Normalized eyelid gap below which the iris strategy treats an eye as closed
    pub blink_threshold: f64,
}

/// Rendered pupil configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Left socket center in display pixels
    pub left_socket: (f64, f64),

    /// Right socket center in display pixels
    pub right_socket: (f64, f64),

    /// Pupil excursion for a unit direction, in pixels
    pub max_offset: f64,

    /// Low-pass smoothing factor in (0, 1]
    pub alpha: f64,
}

impl Default for DirectionConfig {
    fn default() -> Self {
        Self {
            strategy: "quantized".to_string(),
            quantize_threshold: DEFAULT_QUANTIZE_THRESHOLD,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            left_socket: DEFAULT_LEFT_SOCKET,
            right_socket: DEFAULT_RIGHT_SOCKET,
            max_offset: DEFAULT_MAX_OFFSET,
            alpha: DEFAULT_SMOOTHING_ALPHA,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Load the configured face model, or share the built-in one
    ///
    /// # Errors
    ///
    /// Returns an error if the model file cannot be read or parsed
    pub fn load_face_model(&self) -> Result<Arc<FaceModel>> {
        match &self.face_model.path {
            Some(path) => Ok(Arc::new(FaceModel::from_file(path)?)),
            None => Ok(FaceModel::canonical()),
        }
    }

    /// Gaze estimator with the configured model and solver options
    ///
    /// # Errors
    ///
    /// Returns an error if the face model cannot be loaded
    pub fn gaze_estimator(&self) -> Result<GazeEstimator> {
        Ok(self.gaze_estimator_with(self.load_face_model()?))
    }

    /// Gaze estimator over an already loaded face model
    #[must_use]
    pub fn gaze_estimator_with(&self, model: Arc<FaceModel>) -> GazeEstimator {
        GazeEstimator::new(model, self.pose, self.affine, self.gaze)
    }

    /// Create a direction strategy from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is unknown or the face model cannot be loaded
    pub fn create_strategy(&self) -> Result<Box<dyn DirectionStrategy>> {
        self.create_strategy_with_model(self.load_face_model()?)
    }

    /// Create a direction strategy over an already loaded face model.
    ///
    /// `direction.strategy` may carry a parameter (`quantized:0.2`,
    /// `iris:0.02`) that overrides the matching threshold setting.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the strategy is unknown or a threshold is out of range
    pub fn create_strategy_with_model(&self, model: Arc<FaceModel>) -> Result<Box<dyn DirectionStrategy>> {
        let thresholds = StrategyThresholds {
            quantize: self.direction.quantize_threshold,
            blink: self.direction.blink_threshold,
        };
        create_strategy_with(&self.direction.strategy, self.gaze_estimator_with(model), thresholds)
    }

    /// Create the pupil actuator from configuration
    #[must_use]
    pub fn create_actuator(&self) -> PupilActuator {
        PupilActuator::new(
            PupilPosition::from(self.actuator.left_socket),
            PupilPosition::from(self.actuator.right_socket),
            self.actuator.max_offset,
            self.actuator.alpha,
        )
    }

    /// Validate configuration, including the face model file and strategy name
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        self.validate_settings()?;
        self.create_strategy().map(|_| ())
    }

    /// Validate every setting that can be checked without reading the face model
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid setting
    pub fn validate_settings(&self) -> Result<()> {
        // Validate solver parameters
        if self.pose.max_iterations == 0 {
            return Err(Error::ConfigError("Pose max iterations must be greater than 0".to_string()));
        }
        if !(self.pose.max_reprojection_error > 0.0) {
            return Err(Error::ConfigError(
                "Max reprojection error must be greater than 0".to_string(),
            ));
        }
        if !(self.affine.inlier_threshold > 0.0) {
            return Err(Error::ConfigError("Inlier threshold must be greater than 0".to_string()));
        }
        if !self.affine.placeholder_depth.is_finite() {
            return Err(Error::ConfigError("Placeholder depth must be finite".to_string()));
        }
        if !(self.gaze.extrapolation_factor > 0.0) || !self.gaze.extrapolation_factor.is_finite() {
            return Err(Error::ConfigError(
                "Extrapolation factor must be a positive number".to_string(),
            ));
        }
        if !self.gaze.head_reference_depth.is_finite() {
            return Err(Error::ConfigError("Head reference depth must be finite".to_string()));
        }

        // Validate direction settings
        if !(self.direction.quantize_threshold > 0.0 && self.direction.quantize_threshold <= 1.0) {
            return Err(Error::ConfigError(
                "Quantize threshold must be in (0, 1]".to_string(),
            ));
        }
        if !(self.direction.blink_threshold > 0.0) {
            return Err(Error::ConfigError("Blink threshold must be greater than 0".to_string()));
        }

        // Validate actuator settings
        if !(self.actuator.alpha > 0.0 && self.actuator.alpha <= 1.0) {
            return Err(Error::ConfigError("Alpha must be in (0, 1]".to_string()));
        }
        if !(self.actuator.max_offset >= 0.0) {
            return Err(Error::ConfigError("Max offset must not be negative".to_string()));
        }

        // Validate model path exists
        if let Some(path) = &self.face_model.path {
            if !path.exists() {
                return Err(Error::ConfigError(format!("Face model not found: {}", path.display())));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Mirror Configuration

# Face model (omit path for the built-in model)
face_model:
  path: null

# Head pose solver
pose:
  max_iterations: 100
  max_reprojection_error: 20.0

# Image-to-model affine fit
affine:
  inlier_threshold: 3.0
  reject_outliers: true
  depth_source: placeholder   # placeholder | landmark
  placeholder_depth: 0.0

# Gaze ray projection
gaze:
  extrapolation_factor: 10.0
  head_reference_depth: 40.0

# Direction strategy (reprojection, quantized, iris, face)
direction:
  strategy: "quantized"
  quantize_threshold: 0.1
  blink_threshold: 0.01

# Rendered pupils
actuator:
  left_socket: [217.0, 240.0]
  right_socket: [592.0, 240.0]
  max_offset: 75.0
  alpha: 0.2
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = Config::from_yaml("direction:\n  strategy: iris\n").unwrap();
        assert_eq!(parsed.direction.strategy, "iris");
        assert_eq!(parsed.direction.quantize_threshold, DEFAULT_QUANTIZE_THRESHOLD);
        assert_eq!(parsed.actuator, ActuatorConfig::default());
        assert_eq!(parsed.create_strategy().unwrap().name(), "iris");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.actuator.alpha = 0.0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.direction.quantize_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.direction.strategy = "telepathy".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.face_model.path = Some(PathBuf::from("/nonexistent/face_model.txt"));
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pose.max_reprojection_error = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("gaze_mirror_config_{}.yaml", std::process::id()));
        let mut config = Config::default();
        config.direction.strategy = "reprojection".to_string();
        config.actuator.max_offset = 60.0;

        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);

        assert!(matches!(Config::from_file(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml("pose: [1, 2"),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_strategy_parameter_in_config() {
        let mut config = Config::default();
        config.direction.strategy = "quantized:0.2".to_string();
        assert_eq!(config.create_strategy().unwrap().name(), "quantized");

        config.direction.strategy = "quantized:1.5".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        config.direction.strategy = "reprojection:0.2".to_string();
        assert!(config.validate().is_err());

        config.direction.strategy = "iris:0.02".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_strategy_uses_given_model() {
        let mut config = Config::default();
        config.face_model.path = Some(PathBuf::from("/nonexistent/face_model.txt"));
        config.validate_settings().unwrap_err();

        // A model handed in is used as is; the configured path is not read again
        let strategy = config.create_strategy_with_model(FaceModel::canonical()).unwrap();
        assert_eq!(strategy.name(), "quantized");
        assert!(matches!(config.create_strategy(), Err(Error::Io(_))));
    }

    #[test]
    fn test_create_from_config() {
        let config = Config::default();
        assert_eq!(config.create_strategy().unwrap().name(), "quantized");
        let actuator = config.create_actuator();
        assert_eq!(actuator.alpha(), 0.2);
    }
}
