// src/analysis.rs - Per-frame analysis: readings snapshot and capture-region compliance
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::catalog::{JointCatalog, Reading, Role, STANDARD_CATALOG};
use crate::correspondence::{self, HandAssignment};
use crate::geometry::{self, NeckDirection};
use crate::landmark::{pose as pose_index, Landmark, LandmarkSet, Layout};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceResolution {
    pub width: f64,
    pub height: f64,
}

impl Default for ReferenceResolution {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

// Reference-resolution pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self {
            left: 300.0,
            top: 20.0,
            width: 680.0,
            height: 660.0,
        }
    }
}

impl CaptureRegion {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Strict containment; a point on an edge is outside.
    pub fn contains_point(&self, x_px: f64, y_px: f64) -> bool {
        x_px > self.left && x_px < self.right() && y_px > self.top && y_px < self.bottom()
    }

    pub fn contains_landmark(&self, landmark: &Landmark, resolution: ReferenceResolution) -> bool {
        self.contains_point(landmark.x * resolution.width, landmark.y * resolution.height)
    }

    /// True only when every slot of `set` holds a landmark inside the region.
    ///
    /// This is all-or-nothing: one limb outside, or one landmark the
    /// detector could not place, fails the whole frame.
    pub fn contains_all(&self, set: &LandmarkSet, resolution: ReferenceResolution) -> bool {
        !set.is_empty()
            && set.slots().iter().all(|slot| {
                slot.as_ref()
                    .is_some_and(|lm| self.contains_landmark(lm, resolution))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSnapshot {
    pub timestamp_ms: f64,
    pub subject_present: bool,
    pub inside_capture_region: bool,
    pub readings: BTreeMap<String, Reading>,
    /// Side the head leans or turns towards; goes with the neck rotation and
    /// lateral bending magnitudes.
    pub neck_direction: Option<NeckDirection>,
    pub hands: Vec<HandAssignment>,
    /// Landmarks the readings were computed from, after visibility filtering.
    pub pose: Option<LandmarkSet>,
    pub hand_sets: Vec<LandmarkSet>,
}

impl FrameSnapshot {
    pub fn empty(timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            ..Self::default()
        }
    }

    pub fn degrees(&self, name: &str) -> Option<f64> {
        self.readings.get(name).map(|r| r.degrees)
    }
}

pub struct FrameAnalyzer {
    catalog: &'static JointCatalog,
    region: CaptureRegion,
    resolution: ReferenceResolution,
    visibility_threshold: f64,
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new(CaptureRegion::default(), ReferenceResolution::default())
    }
}

impl FrameAnalyzer {
    pub fn new(region: CaptureRegion, resolution: ReferenceResolution) -> Self {
        Self {
            catalog: &STANDARD_CATALOG,
            region,
            resolution,
            visibility_threshold: 0.0,
        }
    }

    pub fn with_visibility_threshold(mut self, threshold: f64) -> Self {
        self.visibility_threshold = threshold;
        self
    }

    pub fn region(&self) -> CaptureRegion {
        self.region
    }

    pub fn resolution(&self) -> ReferenceResolution {
        self.resolution
    }

    pub fn analyze(&self, pose: Option<&LandmarkSet>, hands: &[LandmarkSet], timestamp_ms: f64) -> FrameSnapshot {
        let pose = pose
            .filter(|set| set.layout() == Layout::Pose)
            .map(|set| set.clone().filtered(self.visibility_threshold))
            .filter(|set| !set.is_empty());

        let Some(pose) = pose else {
            debug!(timestamp_ms, "no subject in frame");
            return FrameSnapshot::empty(timestamp_ms);
        };

        let hand_sets: Vec<LandmarkSet> = hands
            .iter()
            .filter(|set| set.layout() == Layout::Hand)
            .map(|set| set.clone().filtered(self.visibility_threshold))
            .collect();

        let mut readings = BTreeMap::new();
        for reading in self.catalog.evaluate(&pose, Role::Pose, timestamp_ms) {
            readings.insert(reading.name.clone(), reading);
        }

        let assignments = correspondence::resolve_hands(&pose, &hand_sets);
        for assignment in &assignments {
            let hand_set = &hand_sets[assignment.hand_index];
            for reading in self.catalog.evaluate(hand_set, Role::Hand { assignment }, timestamp_ms) {
                readings.insert(reading.name.clone(), reading);
            }
        }

        let neck_direction = match (
            pose.get(pose_index::NOSE),
            pose.get(pose_index::LEFT_SHOULDER),
            pose.get(pose_index::RIGHT_SHOULDER),
        ) {
            (Some(nose), Some(left), Some(right)) => Some(geometry::neck_direction(nose, left, right)),
            _ => None,
        };

        let inside_capture_region = self.region.contains_all(&pose, self.resolution);
        debug!(
            timestamp_ms,
            readings = readings.len(),
            hands = assignments.len(),
            inside_capture_region,
            "frame analyzed"
        );

        FrameSnapshot {
            timestamp_ms,
            subject_present: true,
            inside_capture_region,
            readings,
            neck_direction,
            hands: assignments,
            pose: Some(pose),
            hand_sets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{hand, pose};

    // Every point at the centre of the default region.
    fn centred_pose() -> LandmarkSet {
        LandmarkSet::from_raw(Layout::Pose, &[[640.0 / 1280.0, 350.0 / 720.0, 0.0]; pose::COUNT]).unwrap()
    }

    #[test]
    fn region_edges_are_exclusive() {
        let region = CaptureRegion::default();
        assert!(region.contains_point(301.0, 21.0));
        assert!(!region.contains_point(300.0, 100.0));
        assert!(!region.contains_point(980.0, 100.0));
        assert!(!region.contains_point(500.0, 20.0));
        assert!(!region.contains_point(500.0, 680.0));
        assert!(region.contains_point(979.0, 679.0));
    }

    #[test]
    fn one_landmark_outside_fails_compliance() {
        let analyzer = FrameAnalyzer::default();
        let mut set = centred_pose();
        assert!(analyzer.analyze(Some(&set), &[], 0.0).inside_capture_region);

        set.set(pose::LEFT_ANKLE, Some(Landmark::new(299.0 / 1280.0, 0.5, 0.0)));
        let snapshot = analyzer.analyze(Some(&set), &[], 0.0);
        assert!(snapshot.subject_present);
        assert!(!snapshot.inside_capture_region);
    }

    #[test]
    fn absent_landmark_fails_compliance() {
        let analyzer = FrameAnalyzer::default();
        let mut set = centred_pose();
        set.set(pose::RIGHT_HEEL, None);
        assert!(!analyzer.analyze(Some(&set), &[], 0.0).inside_capture_region);
    }

    #[test]
    fn low_visibility_counts_as_absent() {
        let analyzer = FrameAnalyzer::default().with_visibility_threshold(0.5);
        let mut set = centred_pose();
        set.set(pose::NOSE, Some(Landmark::new(0.5, 0.2, 0.0).with_visibility(0.1)));
        let snapshot = analyzer.analyze(Some(&set), &[], 0.0);
        assert!(snapshot.subject_present);
        assert!(!snapshot.inside_capture_region);
        assert!(snapshot.degrees("neck_flexion").is_none());
    }

    #[test]
    fn no_pose_is_empty_snapshot() {
        let analyzer = FrameAnalyzer::default();
        for pose in [None, Some(LandmarkSet::empty(Layout::Pose))] {
            let snapshot = analyzer.analyze(pose.as_ref(), &[], 12.0);
            assert!(!snapshot.subject_present);
            assert!(!snapshot.inside_capture_region);
            assert!(snapshot.readings.is_empty());
            assert_eq!(snapshot.timestamp_ms, 12.0);
        }
    }

    #[test]
    fn snapshot_labels_neck_direction() {
        let analyzer = FrameAnalyzer::default();
        let mut set = centred_pose();
        set.set(pose::LEFT_SHOULDER, Some(Landmark::new(0.45, 0.5, 0.0)));
        set.set(pose::RIGHT_SHOULDER, Some(Landmark::new(0.55, 0.5, 0.0)));

        for (nose_x, expected) in [
            (0.4, NeckDirection::Left),
            (0.6, NeckDirection::Right),
            (0.5, NeckDirection::Center),
        ] {
            set.set(pose::NOSE, Some(Landmark::new(nose_x, 0.3, 0.0)));
            let snapshot = analyzer.analyze(Some(&set), &[], 0.0);
            assert_eq!(snapshot.neck_direction, Some(expected), "nose at {nose_x}");
            assert!(snapshot.degrees("neck_rotation").is_some());
        }

        set.set(pose::NOSE, None);
        assert_eq!(analyzer.analyze(Some(&set), &[], 0.0).neck_direction, None);
    }

    #[test]
    fn hands_without_pose_are_ignored() {
        let hand_set = LandmarkSet::from_raw(Layout::Hand, &[[0.5, 0.5, 0.0]; hand::COUNT]).unwrap();
        let snapshot = FrameAnalyzer::default().analyze(None, &[hand_set], 0.0);
        assert!(snapshot.hands.is_empty());
        assert!(snapshot.readings.is_empty());
    }
}
