// src/correspondence.rs - Matches unlabeled hand detections to the body's wrists
use serde::Serialize;
use tracing::debug;

use crate::landmark::{hand, Landmark, LandmarkSet, Side};

/// The pose elbow/wrist pair a hand hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParentLimb {
    pub side: Side,
    pub elbow: Option<Landmark>,
    pub wrist: Landmark,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandAssignment {
    /// Position of the hand in the detector's output for this frame.
    pub hand_index: usize,
    pub side: Side,
    /// Distance from the hand wrist to the chosen pose wrist.
    pub distance: f64,
    pub parent: ParentLimb,
}

fn planar_distance(a: &Landmark, b: &Landmark) -> f64 {
    (a.xy() - b.xy()).norm()
}

/// Picks the side whose pose wrist is nearest to the hand's wrist.
///
/// Returns `None` when either pose wrist or the hand wrist is absent.
/// Exactly equal distances resolve to the right side.
pub fn resolve_side(pose: &LandmarkSet, hand_set: &LandmarkSet) -> Option<(Side, f64)> {
    let left_wrist = pose.get(Side::Left.wrist())?;
    let right_wrist = pose.get(Side::Right.wrist())?;
    let hand_wrist = hand_set.get(hand::WRIST)?;

    let dist_left = planar_distance(hand_wrist, left_wrist);
    let dist_right = planar_distance(hand_wrist, right_wrist);

    if dist_left < dist_right {
        Some((Side::Left, dist_left))
    } else {
        Some((Side::Right, dist_right))
    }
}

pub fn parent_limb(pose: &LandmarkSet, side: Side) -> Option<ParentLimb> {
    Some(ParentLimb {
        side,
        elbow: pose.get(side.elbow()).copied(),
        wrist: *pose.get(side.wrist())?,
    })
}

/// Assigns every detected hand to a side of the tracked body.
///
/// Hands that cannot be matched are left out. When two hands land on the
/// same side only the closer one is kept, so a side never carries two sets of
/// combined readings.
pub fn resolve_hands(pose: &LandmarkSet, hands: &[LandmarkSet]) -> Vec<HandAssignment> {
    let mut assignments: Vec<HandAssignment> = Vec::with_capacity(hands.len().min(2));

    for (hand_index, hand_set) in hands.iter().enumerate() {
        let Some((side, distance)) = resolve_side(pose, hand_set) else {
            debug!(hand_index, "skipping hand: wrist correspondence unavailable");
            continue;
        };
        let Some(parent) = parent_limb(pose, side) else {
            continue;
        };

        debug!(hand_index, ?side, distance, "hand assigned");

        match assignments.iter_mut().find(|a| a.side == side) {
            Some(existing) if existing.distance <= distance => {
                debug!(hand_index, ?side, "dropping farther duplicate hand");
            }
            Some(existing) => {
                *existing = HandAssignment { hand_index, side, distance, parent };
            }
            None => assignments.push(HandAssignment { hand_index, side, distance, parent }),
        }
    }

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{pose, Layout};

    fn pose_with_wrists(left: (f64, f64), right: (f64, f64)) -> LandmarkSet {
        let mut set = LandmarkSet::from_raw(Layout::Pose, &[[0.5, 0.5, 0.0]; pose::COUNT]).unwrap();
        set.set(pose::LEFT_WRIST, Some(Landmark::new(left.0, left.1, 0.0)));
        set.set(pose::RIGHT_WRIST, Some(Landmark::new(right.0, right.1, 0.0)));
        set.set(pose::LEFT_ELBOW, Some(Landmark::new(left.0, left.1 - 0.15, 0.0)));
        set.set(pose::RIGHT_ELBOW, Some(Landmark::new(right.0, right.1 - 0.15, 0.0)));
        set
    }

    fn hand_at(x: f64, y: f64) -> LandmarkSet {
        LandmarkSet::from_raw(Layout::Hand, &[[x, y, 0.0]; hand::COUNT]).unwrap()
    }

    #[test]
    fn nearest_wrist_wins() {
        let pose = pose_with_wrists((0.2, 0.5), (0.8, 0.5));
        let (side, distance) = resolve_side(&pose, &hand_at(0.79, 0.5)).unwrap();
        assert_eq!(side, Side::Right);
        assert!((distance - 0.01).abs() < 1e-9);

        let (side, _) = resolve_side(&pose, &hand_at(0.25, 0.45)).unwrap();
        assert_eq!(side, Side::Left);
    }

    #[test]
    fn equal_distance_goes_right() {
        // quarter offsets are exact in binary, so both distances are 0.25
        let pose = pose_with_wrists((0.25, 0.5), (0.75, 0.5));
        let (side, _) = resolve_side(&pose, &hand_at(0.5, 0.5)).unwrap();
        assert_eq!(side, Side::Right);
    }

    #[test]
    fn uses_euclidean_not_horizontal_distance() {
        // horizontally the hand is nearer the right wrist, but the left wrist is
        // much closer vertically
        let pose = pose_with_wrists((0.45, 0.2), (0.6, 0.9));
        let (side, _) = resolve_side(&pose, &hand_at(0.55, 0.25)).unwrap();
        assert_eq!(side, Side::Left);
    }

    #[test]
    fn missing_pose_wrist_skips_hand() {
        let mut pose = pose_with_wrists((0.2, 0.5), (0.8, 0.5));
        pose.set(pose::LEFT_WRIST, None);
        assert!(resolve_side(&pose, &hand_at(0.79, 0.5)).is_none());
        assert!(resolve_hands(&pose, &[hand_at(0.79, 0.5)]).is_empty());
    }

    #[test]
    fn parent_limb_follows_side() {
        let pose = pose_with_wrists((0.2, 0.5), (0.8, 0.5));
        let assignments = resolve_hands(&pose, &[hand_at(0.21, 0.52), hand_at(0.78, 0.49)]);
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].side, Side::Left);
        assert_eq!(assignments[0].parent.wrist.x, 0.2);
        assert_eq!(assignments[1].side, Side::Right);
        assert_eq!(assignments[1].parent.wrist.x, 0.8);
        assert!(assignments[1].parent.elbow.is_some());
    }

    #[test]
    fn duplicate_side_keeps_closer_hand() {
        let pose = pose_with_wrists((0.2, 0.5), (0.8, 0.5));
        let assignments = resolve_hands(&pose, &[hand_at(0.7, 0.5), hand_at(0.79, 0.5)]);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].hand_index, 1);
    }
}
