// src/landmark.rs - Fixed-layout landmark sets handed over by the detector
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// MediaPipe pose landmark indices (33 points)
pub mod pose {
    pub const COUNT: usize = 33;

    pub const NOSE: usize = 0;
    pub const LEFT_EYE_INNER: usize = 1;
    pub const LEFT_EYE: usize = 2;
    pub const LEFT_EYE_OUTER: usize = 3;
    pub const RIGHT_EYE_INNER: usize = 4;
    pub const RIGHT_EYE: usize = 5;
    pub const RIGHT_EYE_OUTER: usize = 6;
    pub const LEFT_EAR: usize = 7;
    pub const RIGHT_EAR: usize = 8;
    pub const MOUTH_LEFT: usize = 9;
    pub const MOUTH_RIGHT: usize = 10;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_PINKY: usize = 17;
    pub const RIGHT_PINKY: usize = 18;
    pub const LEFT_INDEX: usize = 19;
    pub const RIGHT_INDEX: usize = 20;
    pub const LEFT_THUMB: usize = 21;
    pub const RIGHT_THUMB: usize = 22;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
    pub const LEFT_HEEL: usize = 29;
    pub const RIGHT_HEEL: usize = 30;
    pub const LEFT_FOOT_INDEX: usize = 31;
    pub const RIGHT_FOOT_INDEX: usize = 32;
}

// MediaPipe hand landmark indices (21 points)
pub mod hand {
    pub const COUNT: usize = 21;

    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("{layout:?} landmark set needs {expected} points, detector returned {got}")]
    WrongLength {
        layout: Layout,
        expected: usize,
        got: usize,
    },
}

/// A single detected point. `x`/`y` are normalized to the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, visibility: None }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Planar position; depth is ignored by every angle in the kernel.
    pub fn xy(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    Pose,
    Hand,
}

impl Layout {
    pub fn point_count(&self) -> usize {
        match self {
            Layout::Pose => pose::COUNT,
            Layout::Hand => hand::COUNT,
        }
    }
}

/// One person's (or one hand's) landmarks for a single frame.
///
/// Slots are positional: `points[i]` always holds the anatomical role `i` of
/// the layout. A slot is `None` when the detector reported it below the
/// visibility threshold or could not place it.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    layout: Layout,
    points: Vec<Option<Landmark>>,
}

impl LandmarkSet {
    /// Validates a raw detector result against its layout.
    pub fn from_landmarks(layout: Layout, landmarks: Vec<Landmark>) -> Result<Self, LandmarkError> {
        Self::from_slots(layout, landmarks.into_iter().map(Some).collect())
    }

    pub fn from_slots(layout: Layout, points: Vec<Option<Landmark>>) -> Result<Self, LandmarkError> {
        if points.len() != layout.point_count() {
            return Err(LandmarkError::WrongLength {
                layout,
                expected: layout.point_count(),
                got: points.len(),
            });
        }
        Ok(Self { layout, points })
    }

    /// Converts the `[x, y, z]` triples most detector bindings hand back.
    pub fn from_raw(layout: Layout, raw: &[[f64; 3]]) -> Result<Self, LandmarkError> {
        Self::from_landmarks(
            layout,
            raw.iter().map(|p| Landmark::new(p[0], p[1], p[2])).collect(),
        )
    }

    /// A set with every slot absent, the shape an empty detection takes.
    pub fn empty(layout: Layout) -> Self {
        Self {
            layout,
            points: vec![None; layout.point_count()],
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn is_present(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// True when no slot carries a landmark.
    pub fn is_empty(&self) -> bool {
        self.points.iter().all(|slot| slot.is_none())
    }

    pub fn slots(&self) -> &[Option<Landmark>] {
        &self.points
    }

    pub fn iter_present(&self) -> impl Iterator<Item = (usize, &Landmark)> {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|lm| (i, lm)))
    }

    /// Drops landmarks whose reported visibility falls below `threshold`,
    /// along with any non-finite coordinates.
    pub fn filtered(mut self, threshold: f64) -> Self {
        for slot in self.points.iter_mut() {
            let keep = match slot {
                Some(lm) => lm.is_finite() && lm.visibility.map_or(true, |v| v >= threshold),
                None => false,
            };
            if !keep {
                *slot = None;
            }
        }
        self
    }

    pub fn set(&mut self, index: usize, landmark: Option<Landmark>) {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = landmark;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn prefix(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn shoulder(&self) -> usize {
        match self {
            Side::Left => pose::LEFT_SHOULDER,
            Side::Right => pose::RIGHT_SHOULDER,
        }
    }

    pub fn elbow(&self) -> usize {
        match self {
            Side::Left => pose::LEFT_ELBOW,
            Side::Right => pose::RIGHT_ELBOW,
        }
    }

    pub fn wrist(&self) -> usize {
        match self {
            Side::Left => pose::LEFT_WRIST,
            Side::Right => pose::RIGHT_WRIST,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::Left => pose::LEFT_INDEX,
            Side::Right => pose::RIGHT_INDEX,
        }
    }

    pub fn pinky(&self) -> usize {
        match self {
            Side::Left => pose::LEFT_PINKY,
            Side::Right => pose::RIGHT_PINKY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_layout_length() {
        let err = LandmarkSet::from_raw(Layout::Hand, &[[0.0; 3]; 20]).unwrap_err();
        assert_eq!(
            err,
            LandmarkError::WrongLength {
                layout: Layout::Hand,
                expected: 21,
                got: 20
            }
        );
    }

    #[test]
    fn out_of_bounds_index_is_absent() {
        let set = LandmarkSet::from_raw(Layout::Hand, &[[0.5; 3]; 21]).unwrap();
        assert!(set.is_present(hand::PINKY_TIP));
        assert!(!set.is_present(21));
        assert!(set.get(99).is_none());
    }

    #[test]
    fn filtering_drops_low_visibility_and_nan() {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); pose::COUNT];
        points[pose::NOSE] = Landmark::new(0.5, 0.1, 0.0).with_visibility(0.2);
        points[pose::LEFT_EAR] = Landmark::new(f64::NAN, 0.1, 0.0);
        points[pose::RIGHT_EAR] = Landmark::new(0.4, 0.1, 0.0).with_visibility(0.9);

        let set = LandmarkSet::from_landmarks(Layout::Pose, points).unwrap().filtered(0.5);
        assert!(!set.is_present(pose::NOSE));
        assert!(!set.is_present(pose::LEFT_EAR));
        assert!(set.is_present(pose::RIGHT_EAR));
        assert!(set.is_present(pose::LEFT_HIP));
    }

    #[test]
    fn empty_set_reports_empty() {
        assert!(LandmarkSet::empty(Layout::Pose).is_empty());
        assert_eq!(LandmarkSet::empty(Layout::Pose).slots().len(), 33);
    }
}
