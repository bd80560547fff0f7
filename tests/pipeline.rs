// tests/pipeline.rs - Landmarks in, snapshot out, through the public API
use ergo_tracker::capture::{CaptureSession, CaptureState, ManualScheduler, TickOutcome};
use ergo_tracker::landmark::{hand, pose};
use ergo_tracker::overlay::SkeletonOverlay;
use ergo_tracker::simulation::SimulatedDetector;
use ergo_tracker::video::SyntheticCamera;
use ergo_tracker::{CaptureRegion, FrameAnalyzer, Landmark, LandmarkSet, Layout, ReferenceResolution};

/// Standing subject with ears, shoulders, hips and knees stacked vertically
/// and the hands hanging straight down.
fn neutral_pose() -> LandmarkSet {
    let mut raw = [[0.5, 0.5, 0.0]; pose::COUNT];
    for (sign, ear, shoulder, elbow, wrist, index, pinky, hip, knee, ankle) in [
        (
            -1.0,
            pose::LEFT_EAR,
            pose::LEFT_SHOULDER,
            pose::LEFT_ELBOW,
            pose::LEFT_WRIST,
            pose::LEFT_INDEX,
            pose::LEFT_PINKY,
            pose::LEFT_HIP,
            pose::LEFT_KNEE,
            pose::LEFT_ANKLE,
        ),
        (
            1.0,
            pose::RIGHT_EAR,
            pose::RIGHT_SHOULDER,
            pose::RIGHT_ELBOW,
            pose::RIGHT_WRIST,
            pose::RIGHT_INDEX,
            pose::RIGHT_PINKY,
            pose::RIGHT_HIP,
            pose::RIGHT_KNEE,
            pose::RIGHT_ANKLE,
        ),
    ] {
        let x = 0.5 + sign * 0.05;
        raw[ear] = [x, 0.18, 0.0];
        raw[shoulder] = [x, 0.3, 0.0];
        raw[elbow] = [x + sign * 0.02, 0.42, 0.0];
        raw[wrist] = [x + sign * 0.02, 0.54, 0.0];
        raw[index] = [x + sign * 0.02, 0.6, 0.0];
        raw[pinky] = [x + sign * 0.03, 0.59, 0.0];
        raw[hip] = [x, 0.55, 0.0];
        raw[knee] = [x, 0.75, 0.0];
        raw[ankle] = [x, 0.9, 0.0];
    }
    raw[pose::NOSE] = [0.45, 0.15, 0.0];
    LandmarkSet::from_raw(Layout::Pose, &raw).unwrap()
}

#[test]
fn neutral_posture_reads_zero() {
    let snapshot = FrameAnalyzer::default().analyze(Some(&neutral_pose()), &[], 0.0);
    assert!(snapshot.subject_present);

    for name in [
        "neck_flexion",
        "neck_extension",
        "lumbar_flexion",
        "lumbar_extension",
        "lumbar_lateral",
        "left_wrist_flexion",
        "right_wrist_flexion",
    ] {
        assert_eq!(snapshot.degrees(name), Some(0.0), "{name}");
    }
}

fn pixel_pose(x_px: f64, y_px: f64) -> LandmarkSet {
    LandmarkSet::from_raw(Layout::Pose, &[[x_px / 1280.0, y_px / 720.0, 0.0]; pose::COUNT]).unwrap()
}

#[test]
fn one_pixel_outside_any_edge_fails_compliance() {
    let analyzer = FrameAnalyzer::new(
        CaptureRegion {
            left: 300.0,
            top: 20.0,
            width: 680.0,
            height: 660.0,
        },
        ReferenceResolution {
            width: 1280.0,
            height: 720.0,
        },
    );

    let inside = pixel_pose(640.0, 360.0);
    assert!(analyzer.analyze(Some(&inside), &[], 0.0).inside_capture_region);

    let hugging = [(301.0, 360.0), (979.0, 360.0), (640.0, 21.0), (640.0, 679.0)];
    let outside = [(299.0, 360.0), (981.0, 360.0), (640.0, 19.0), (640.0, 681.0)];

    for (x, y) in hugging {
        let mut set = inside.clone();
        set.set(pose::RIGHT_FOOT_INDEX, Some(Landmark::new(x / 1280.0, y / 720.0, 0.0)));
        assert!(analyzer.analyze(Some(&set), &[], 0.0).inside_capture_region, "({x}, {y})");
    }
    for (x, y) in outside {
        let mut set = inside.clone();
        set.set(pose::RIGHT_FOOT_INDEX, Some(Landmark::new(x / 1280.0, y / 720.0, 0.0)));
        let snapshot = analyzer.analyze(Some(&set), &[], 0.0);
        assert!(snapshot.subject_present);
        assert!(!snapshot.inside_capture_region, "({x}, {y})");
    }
}

#[test]
fn hand_near_right_wrist_gets_right_readings() {
    let mut body = neutral_pose();
    body.set(pose::LEFT_WRIST, Some(Landmark::new(0.2, 0.5, 0.0)));
    body.set(pose::RIGHT_WRIST, Some(Landmark::new(0.8, 0.5, 0.0)));

    let mut raw = [[0.79, 0.5, 0.0]; hand::COUNT];
    raw[hand::INDEX_TIP] = [0.85, 0.5, 0.0];
    raw[hand::MIDDLE_TIP] = [0.86, 0.5, 0.0];
    raw[hand::THUMB_TIP] = [0.8, 0.44, 0.0];
    let hand_set = LandmarkSet::from_raw(Layout::Hand, &raw).unwrap();

    let snapshot = FrameAnalyzer::default().analyze(Some(&body), &[hand_set], 10.0);
    assert_eq!(snapshot.hands.len(), 1);
    assert_eq!(snapshot.degrees("right_hand_wrist_angle"), Some(0.0));
    assert_eq!(snapshot.degrees("right_hand_supination"), Some(20.0));
    assert!(snapshot.readings.keys().all(|name| !name.starts_with("left_hand_")));
}

#[test]
fn missing_pose_yields_empty_snapshot() {
    let analyzer = FrameAnalyzer::default();
    for pose in [None, Some(LandmarkSet::empty(Layout::Pose))] {
        let snapshot = analyzer.analyze(pose.as_ref(), &[], 0.0);
        assert!(!snapshot.subject_present);
        assert!(snapshot.readings.is_empty());
    }
}

#[tokio::test]
async fn simulated_session_end_to_end() {
    let analyzer = FrameAnalyzer::default();
    let overlay = SkeletonOverlay::new(analyzer.region(), analyzer.resolution());
    let mut session = CaptureSession::new(
        SyntheticCamera::new(1280, 720),
        SimulatedDetector::new(),
        overlay,
        ManualScheduler::new(),
        analyzer,
    );

    session.start().await.unwrap();
    for _ in 0..3 {
        assert_eq!(session.tick().await, TickOutcome::Rendered);
    }

    let snapshot = session.latest_snapshot().unwrap();
    assert!(snapshot.subject_present);
    assert!(snapshot.inside_capture_region);
    assert_eq!(snapshot.hands.len(), 2);
    for name in ["left_hand_wrist_angle", "right_hand_pronation_supination", "left_elbow_angle", "lumbar_rotation"] {
        assert!(snapshot.readings.contains_key(name), "{name}");
    }
    assert!(!session.renderer().shapes().is_empty());

    session.stop();
    assert_eq!(session.state(), CaptureState::Idle);
    assert!(session.renderer().shapes().is_empty());
}
