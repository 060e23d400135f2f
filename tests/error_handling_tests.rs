//! Error handling tests for all modules


use gaze_mirror::{
    camera::CameraIntrinsics,
    direction::{create_strategy, reprojection::ReprojectionStrategy, DirectionStrategy},
    error::{Error, Result},
    face_model::FaceModel,
    gaze::GazeEstimator,
    landmarks::{Landmark, LandmarkSet},
    pose_estimation::PoseEstimator,
    source::parse_event,
    utils::safe_cast::{f64_to_i32, round_to_i32},
};
use nalgebra::Point2;
use test_helpers::{SyntheticFace, HEIGHT, WIDTH};

#[test]
fn test_strategy_creation_errors() {
    // Unknown strategy
    match create_strategy("invalid_strategy") {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("invalid_strategy")),
        _ => panic!("Expected ConfigError"),
    }

    // Invalid quantize thresholds
    assert!(create_strategy("quantized:0").is_err());
    assert!(create_strategy("quantized:-0.1").is_err());
    assert!(create_strategy("quantized:1.5").is_err());
    assert!(create_strategy("quantized:abc").is_err());

    // Parameters where none are taken
    assert!(create_strategy("reprojection:0.5").is_err());
    assert!(create_strategy("face:1").is_err());

    // Valid specs
    assert!(create_strategy("quantized:1.0").is_ok());
    assert!(create_strategy("iris:0.02").is_ok());
    assert!(create_strategy("FACE").is_ok());
}

#[test]
fn test_invalid_frame_dimensions() {
    let landmarks = SyntheticFace::frontal().landmarks().unwrap();
    let strategy = ReprojectionStrategy::default();

    for (width, height) in [(0, 480), (640, 0), (-640, 480)] {
        match strategy.estimate(&landmarks, width, height) {
            Err(Error::InvalidFrameDimensions { width: w, height: h }) => assert_eq!((w, h), (width, height)),
            other => panic!("Expected InvalidFrameDimensions, got {other:?}"),
        }
    }
    assert!(CameraIntrinsics::from_frame(0, 0).is_err());
}

#[test]
fn test_missing_landmarks() {
    let strategy = ReprojectionStrategy::default();

    assert!(matches!(
        strategy.estimate(&LandmarkSet::default(), WIDTH, HEIGHT),
        Err(Error::MissingLandmark(_))
    ));

    // Face points present but the irises are not
    let mut points = SyntheticFace::frontal().landmarks().unwrap().points().to_vec();
    points.truncate(468);
    let result = strategy.estimate(&LandmarkSet::new(points), WIDTH, HEIGHT);
    assert!(matches!(result, Err(Error::MissingLandmark(473))), "{result:?}");
}

#[test]
fn test_degenerate_face_points() {
    let estimator = GazeEstimator::default();

    // Every landmark in the same place
    let collapsed = LandmarkSet::new(vec![Landmark::new(0.5, 0.5, 0.0); 478]);
    assert!(matches!(
        estimator.estimate_eyes(&collapsed, WIDTH, HEIGHT),
        Err(Error::DegenerateGeometry(_))
    ));

    // Non-finite coordinates
    let mut points = SyntheticFace::frontal().landmarks().unwrap().points().to_vec();
    points[4] = Landmark::new(f64::NAN, 0.5, 0.0);
    assert!(matches!(
        estimator.estimate_eyes(&LandmarkSet::new(points), WIDTH, HEIGHT),
        Err(Error::DegenerateGeometry(_))
    ));
}

#[test]
fn test_pose_on_collinear_points() {
    let k = CameraIntrinsics::from_frame(WIDTH, HEIGHT).unwrap();
    let line: [Point2<f64>; 6] = std::array::from_fn(|i| Point2::new(100.0 + 20.0 * i as f64, 240.0));
    let result = PoseEstimator::default().estimate_pose(&line, &FaceModel::canonical(), &k);
    assert!(matches!(result, Err(Error::DegenerateGeometry(_))));
}

#[test]
fn test_face_model_parse_errors() {
    assert!(matches!(FaceModel::parse(""), Err(Error::ConfigError(_))));
    assert!(matches!(FaceModel::parse("1.0\n2.0\n3.0"), Err(Error::ConfigError(_))));
    assert!(matches!(
        FaceModel::from_file("/nonexistent/face_model.txt"),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_input_errors() {
    for text in ["", "[]", "{\"width\": \"wide\"}", "{\"control\": 3}"] {
        match parse_event(text, 12) {
            Err(Error::InvalidInput(msg)) => assert!(msg.starts_with("line 12"), "{msg}"),
            other => panic!("Expected InvalidInput for {text:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_safe_cast_errors() {
    assert!(f64_to_i32(f64::NAN).is_err());
    assert!(f64_to_i32(f64::INFINITY).is_err());
    assert!(f64_to_i32(1e12).is_err());
    assert!(round_to_i32(-1e12).is_err());
    assert_eq!(round_to_i32(2.5).unwrap(), 3);
}

#[test]
fn test_recoverable_errors() -> Result<()> {
    assert!(Error::NoLandmarks.is_recoverable());
    assert!(Error::DegenerateGeometry("x".into()).is_recoverable());
    assert!(!Error::ConfigError("x".into()).is_recoverable());

    let err = create_strategy("nope").err().ok_or(Error::InvalidInput("strategy created".into()))?;
    assert_eq!(err.kind(), "config_error");
    Ok(())
}
