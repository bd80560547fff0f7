// src/simulation.rs - Deterministic stand-in for the landmark model
use async_trait::async_trait;
use nalgebra::Vector2;

use crate::capture::{Frame, LandmarkDetector};
use crate::landmark::{hand, pose, Landmark, LandmarkSet, Layout, Side};

const HAND_SIZE: f64 = 0.07;

// (offset along the hand, offset across it) of each finger's first joint,
// thumb first, in hand sizes.
const FINGER_BASES: [(f64, f64); 5] = [(0.15, -0.45), (0.45, -0.25), (0.47, 0.0), (0.45, 0.22), (0.40, 0.40)];
const FINGER_SEGMENT: f64 = 0.17;

/// Produces a gently swaying skeleton with both hands attached.
///
/// Everything is a function of the frame timestamp, so the same timestamps
/// always yield the same landmarks.
#[derive(Debug, Clone)]
pub struct SimulatedDetector {
    wander: bool,
    hands: bool,
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDetector {
    pub fn new() -> Self {
        Self {
            wander: false,
            hands: true,
        }
    }

    /// Let the subject periodically drift out of the capture region.
    pub fn with_wander(mut self, wander: bool) -> Self {
        self.wander = wander;
        self
    }

    pub fn with_hands(mut self, hands: bool) -> Self {
        self.hands = hands;
        self
    }

    fn body_shift(&self, t: f64) -> f64 {
        if self.wander {
            0.32 * (t * 0.2).sin()
        } else {
            0.0
        }
    }

    pub fn pose_at(&self, timestamp_ms: f64) -> LandmarkSet {
        let t = timestamp_ms / 1000.0;
        let shift = self.body_shift(t);
        let lean = 0.03 * (t * 0.6).sin();

        let mut points = [Landmark::new(0.0, 0.0, 0.0); pose::COUNT];
        let mut put = |index: usize, x: f64, y: f64| {
            // upper body leans with height above the hips
            let above_hips = (0.6 - y).max(0.0) / 0.4;
            points[index] = Landmark::new(0.5 + x + shift + lean * above_hips, y, 0.0).with_visibility(0.95);
        };

        put(pose::NOSE, 0.0, 0.2);
        put(pose::LEFT_EYE_INNER, 0.01, 0.185);
        put(pose::LEFT_EYE, 0.02, 0.183);
        put(pose::LEFT_EYE_OUTER, 0.03, 0.185);
        put(pose::RIGHT_EYE_INNER, -0.01, 0.185);
        put(pose::RIGHT_EYE, -0.02, 0.183);
        put(pose::RIGHT_EYE_OUTER, -0.03, 0.185);
        put(pose::LEFT_EAR, 0.045, 0.2);
        put(pose::RIGHT_EAR, -0.045, 0.2);
        put(pose::MOUTH_LEFT, 0.015, 0.23);
        put(pose::MOUTH_RIGHT, -0.015, 0.23);

        // Subject faces the camera: their left side is on the image right.
        for (side, sign, phase) in [(Side::Left, 1.0, 0.0), (Side::Right, -1.0, 1.5)] {
            let elbow_y = 0.45 + 0.03 * (t + phase).sin();
            let wrist = Vector2::new(sign * (0.12 + 0.03 * (t * 0.5 + phase).cos()), 0.57 + 0.04 * (t + phase).sin());
            put(side.shoulder(), sign * 0.09, 0.32);
            put(side.elbow(), sign * 0.11, elbow_y);
            put(side.wrist(), wrist.x, wrist.y);
            put(side.pinky(), wrist.x + sign * 0.012, wrist.y + 0.035);
            put(side.index(), wrist.x - sign * 0.004, wrist.y + 0.045);
            let thumb = match side {
                Side::Left => pose::LEFT_THUMB,
                Side::Right => pose::RIGHT_THUMB,
            };
            put(thumb, wrist.x - sign * 0.015, wrist.y + 0.03);
        }

        for (sign, hip, knee, ankle, heel, foot) in [
            (1.0, pose::LEFT_HIP, pose::LEFT_KNEE, pose::LEFT_ANKLE, pose::LEFT_HEEL, pose::LEFT_FOOT_INDEX),
            (-1.0, pose::RIGHT_HIP, pose::RIGHT_KNEE, pose::RIGHT_ANKLE, pose::RIGHT_HEEL, pose::RIGHT_FOOT_INDEX),
        ] {
            put(hip, sign * 0.06, 0.6);
            put(knee, sign * 0.062, 0.76);
            put(ankle, sign * 0.064, 0.9);
            put(heel, sign * 0.06, 0.92);
            put(foot, sign * 0.075, 0.93);
        }

        // Every slot was filled above.
        LandmarkSet::from_landmarks(Layout::Pose, points.to_vec()).unwrap_or_else(|_| LandmarkSet::empty(Layout::Pose))
    }

    /// Hands hanging off both pose wrists, bending slowly at the wrist.
    pub fn hands_at(&self, timestamp_ms: f64) -> Vec<LandmarkSet> {
        let t = timestamp_ms / 1000.0;
        let body = self.pose_at(timestamp_ms);
        let mut hands = Vec::with_capacity(2);

        for (side, sign, phase) in [(Side::Left, 1.0, 0.0), (Side::Right, -1.0, 1.0)] {
            let Some(wrist) = body.get(side.wrist()) else {
                continue;
            };
            // downward, tipping up to 35 degrees either way
            let bend = (90.0 + 35.0 * (t * 0.3 + phase).sin()).to_radians();
            let along = Vector2::new(bend.cos(), bend.sin());
            let across = Vector2::new(-along.y, along.x) * sign;
            let origin = wrist.xy() + Vector2::new(0.002 * sign, 0.004);

            let mut points = vec![Landmark::new(origin.x, origin.y, 0.0); hand::COUNT];
            for (finger, &(base, offset)) in FINGER_BASES.iter().enumerate() {
                for joint in 0..4 {
                    let reach = (base + joint as f64 * FINGER_SEGMENT) * HAND_SIZE;
                    let p = origin + along * reach + across * offset * HAND_SIZE;
                    points[1 + finger * 4 + joint] = Landmark::new(p.x, p.y, -0.01 * joint as f64);
                }
            }
            if let Ok(set) = LandmarkSet::from_landmarks(Layout::Hand, points) {
                hands.push(set);
            }
        }

        // detectors hand back hands in no particular order
        if (t * 0.7).sin() > 0.0 {
            hands.reverse();
        }
        hands
    }
}

#[async_trait(?Send)]
impl LandmarkDetector for SimulatedDetector {
    async fn detect_pose(&mut self, _frame: &Frame, timestamp_ms: f64) -> anyhow::Result<Option<LandmarkSet>> {
        Ok(Some(self.pose_at(timestamp_ms)))
    }

    async fn detect_hands(&mut self, _frame: &Frame, timestamp_ms: f64) -> anyhow::Result<Vec<LandmarkSet>> {
        if !self.hands {
            return Ok(Vec::new());
        }
        Ok(self.hands_at(timestamp_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FrameAnalyzer;
    use crate::correspondence::resolve_hands;

    #[test]
    fn same_timestamp_same_landmarks() {
        let detector = SimulatedDetector::new();
        assert_eq!(detector.pose_at(1234.0), detector.pose_at(1234.0));
        assert_eq!(detector.hands_at(1234.0), detector.hands_at(1234.0));
    }

    #[test]
    fn steady_subject_stays_in_region() {
        let detector = SimulatedDetector::new();
        let analyzer = FrameAnalyzer::default();
        for step in 0..200 {
            let ts = step as f64 * 97.0;
            let snapshot = analyzer.analyze(Some(&detector.pose_at(ts)), &[], ts);
            assert!(snapshot.inside_capture_region, "left region at {ts}");
        }
    }

    #[test]
    fn wandering_subject_leaves_region() {
        let detector = SimulatedDetector::new().with_wander(true);
        let analyzer = FrameAnalyzer::default();
        // sin(0.2 t) peaks at t = 7.85 s
        let ts = 7850.0;
        let snapshot = analyzer.analyze(Some(&detector.pose_at(ts)), &[], ts);
        assert!(snapshot.subject_present);
        assert!(!snapshot.inside_capture_region);
    }

    #[test]
    fn hands_resolve_to_both_sides() {
        let detector = SimulatedDetector::new();
        for ts in [0.0, 2500.0, 5000.0] {
            let body = detector.pose_at(ts);
            let assignments = resolve_hands(&body, &detector.hands_at(ts));
            assert_eq!(assignments.len(), 2);
            assert_ne!(assignments[0].side, assignments[1].side);
        }
    }
}
