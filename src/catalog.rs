// src/catalog.rs - Named joint measurements and the landmarks each one reads
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::trace;

use crate::correspondence::HandAssignment;
use crate::geometry;
use crate::landmark::{hand, pose, Landmark, LandmarkSet, Layout, Side};

/// Where a measurement input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Pose(usize),
    Hand(usize),
    /// The pose wrist of the limb a hand was matched to.
    ParentWrist,
}

/// Which landmark set a measurement is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Pose,
    Hand(Side),
}

pub type ComputeFn = fn(&[&Landmark]) -> Option<f64>;

pub struct JointMeasurementSpec {
    pub name: String,
    pub scope: Scope,
    pub inputs: Vec<Input>,
    pub compute: ComputeFn,
}

impl std::fmt::Debug for JointMeasurementSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JointMeasurementSpec")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("inputs", &self.inputs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub name: String,
    pub degrees: f64,
    pub timestamp_ms: f64,
}

/// What the catalog is evaluated over.
#[derive(Debug, Clone, Copy)]
pub enum Role<'a> {
    Pose,
    /// A hand set, together with the pose it was matched against.
    Hand {
        assignment: &'a HandAssignment,
    },
}

#[derive(Debug)]
pub struct JointCatalog {
    entries: Vec<JointMeasurementSpec>,
}

/// The full catalog, built once on first use.
pub static STANDARD_CATALOG: Lazy<JointCatalog> = Lazy::new(JointCatalog::standard);

fn entry(name: impl Into<String>, scope: Scope, inputs: &[Input], compute: ComputeFn) -> JointMeasurementSpec {
    JointMeasurementSpec {
        name: name.into(),
        scope,
        inputs: inputs.to_vec(),
        compute,
    }
}

impl JointCatalog {
    pub fn new(entries: Vec<JointMeasurementSpec>) -> Self {
        Self { entries }
    }

    pub fn standard() -> Self {
        use Input::{Hand, ParentWrist, Pose};

        let mut entries = vec![
            entry("neck_flexion", Scope::Pose, &[Pose(pose::LEFT_SHOULDER), Pose(pose::NOSE)], |p| {
                geometry::neck_flexion(p[0], p[1])
            }),
            entry("neck_extension", Scope::Pose, &[Pose(pose::LEFT_EAR), Pose(pose::LEFT_SHOULDER)], |p| {
                geometry::neck_extension(p[0], p[1])
            }),
            entry(
                "neck_rotation",
                Scope::Pose,
                &[Pose(pose::NOSE), Pose(pose::LEFT_SHOULDER), Pose(pose::RIGHT_SHOULDER)],
                |p| geometry::neck_rotation(p[0], p[1], p[2]),
            ),
            entry(
                "neck_lateral_bending",
                Scope::Pose,
                &[Pose(pose::NOSE), Pose(pose::LEFT_SHOULDER), Pose(pose::RIGHT_SHOULDER)],
                |p| geometry::neck_lateral_bending(p[0], p[1], p[2]),
            ),
            entry(
                "lumbar_flexion",
                Scope::Pose,
                &[Pose(pose::LEFT_HIP), Pose(pose::LEFT_SHOULDER), Pose(pose::LEFT_KNEE)],
                |p| geometry::lumbar_flexion(p[0], p[1], p[2]),
            ),
            entry(
                "lumbar_extension",
                Scope::Pose,
                &[Pose(pose::LEFT_HIP), Pose(pose::LEFT_SHOULDER), Pose(pose::LEFT_KNEE)],
                |p| geometry::lumbar_extension(p[0], p[1], p[2]),
            ),
            entry("lumbar_lateral", Scope::Pose, &[Pose(pose::NOSE), Pose(pose::LEFT_HIP)], |p| {
                geometry::lumbar_lateral(p[0], p[1])
            }),
            entry(
                "lumbar_rotation",
                Scope::Pose,
                &[
                    Pose(pose::LEFT_SHOULDER),
                    Pose(pose::RIGHT_SHOULDER),
                    Pose(pose::LEFT_HIP),
                    Pose(pose::RIGHT_HIP),
                ],
                |p| geometry::lumbar_rotation(p[0], p[1], p[2], p[3]),
            ),
        ];

        for side in [Side::Left, Side::Right] {
            let s = side.prefix();
            let (shoulder, elbow, wrist) = (side.shoulder(), side.elbow(), side.wrist());
            let (index, pinky) = (side.index(), side.pinky());

            entries.extend([
                entry(format!("{s}_wrist_flexion"), Scope::Pose, &[Pose(wrist), Pose(index)], |p| {
                    geometry::wrist_flexion(p[0], p[1])
                }),
                entry(format!("{s}_wrist_extension"), Scope::Pose, &[Pose(wrist), Pose(index)], |p| {
                    geometry::wrist_extension(p[0], p[1])
                }),
                entry(
                    format!("{s}_ulnar_deviation"),
                    Scope::Pose,
                    &[Pose(index), Pose(pinky), Pose(wrist)],
                    |p| geometry::ulnar_deviation(p[0], p[1], p[2]),
                ),
                entry(
                    format!("{s}_radial_deviation"),
                    Scope::Pose,
                    &[Pose(index), Pose(pinky), Pose(wrist)],
                    |p| geometry::radial_deviation(p[0], p[1], p[2]),
                ),
                entry(
                    format!("{s}_pronation"),
                    Scope::Pose,
                    &[Pose(elbow), Pose(wrist), Pose(index)],
                    |p| geometry::pronation(p[0], p[1], p[2]),
                ),
                entry(
                    format!("{s}_supination"),
                    Scope::Pose,
                    &[Pose(elbow), Pose(wrist), Pose(index)],
                    |p| geometry::supination(p[0], p[1], p[2]),
                ),
                entry(
                    format!("{s}_elbow_angle"),
                    Scope::Pose,
                    &[Pose(shoulder), Pose(elbow), Pose(wrist)],
                    |p| geometry::elbow_angle(p[0], p[1], p[2]),
                ),
            ]);
        }

        for side in [Side::Left, Side::Right] {
            let s = side.prefix();
            let scope = Scope::Hand(side);
            let index_tip = [ParentWrist, Hand(hand::INDEX_TIP)];
            let middle_tip = [ParentWrist, Hand(hand::MIDDLE_TIP)];
            let thumb_tip = [ParentWrist, Hand(hand::THUMB_TIP)];

            entries.extend([
                entry(format!("{s}_hand_wrist_angle"), scope, &index_tip, |p| {
                    Some(geometry::combined_wrist_angle(p[0], p[1]))
                }),
                entry(format!("{s}_hand_wrist_flexion"), scope, &index_tip, |p| {
                    Some(geometry::positive_part(geometry::combined_wrist_angle(p[0], p[1])))
                }),
                entry(format!("{s}_hand_wrist_extension"), scope, &index_tip, |p| {
                    Some(geometry::negative_magnitude(geometry::combined_wrist_angle(p[0], p[1])))
                }),
                entry(format!("{s}_hand_radial_ulnar"), scope, &middle_tip, |p| {
                    Some(geometry::radial_ulnar(p[0], p[1]))
                }),
                entry(format!("{s}_hand_radial_deviation"), scope, &middle_tip, |p| {
                    Some(geometry::positive_part(geometry::radial_ulnar(p[0], p[1])))
                }),
                entry(format!("{s}_hand_ulnar_deviation"), scope, &middle_tip, |p| {
                    Some(geometry::negative_magnitude(geometry::radial_ulnar(p[0], p[1])))
                }),
                entry(format!("{s}_hand_pronation_supination"), scope, &thumb_tip, |p| {
                    Some(geometry::pronation_supination(p[0], p[1]))
                }),
                entry(format!("{s}_hand_pronation"), scope, &thumb_tip, |p| {
                    Some(geometry::positive_part(geometry::pronation_supination(p[0], p[1])))
                }),
                entry(format!("{s}_hand_supination"), scope, &thumb_tip, |p| {
                    Some(geometry::negative_magnitude(geometry::pronation_supination(p[0], p[1])))
                }),
            ]);
        }

        Self::new(entries)
    }

    pub fn entries(&self) -> &[JointMeasurementSpec] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&JointMeasurementSpec> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Every measurement name, in catalog order.
    pub fn measurement_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Evaluates every entry that applies to `role` and whose inputs are all
    /// present in `set`.
    ///
    /// Entries with a missing input, or whose computation yields no finite
    /// value, are skipped without affecting the others.
    pub fn evaluate(&self, set: &LandmarkSet, role: Role<'_>, timestamp_ms: f64) -> Vec<Reading> {
        let expected_layout = match role {
            Role::Pose => Layout::Pose,
            Role::Hand { .. } => Layout::Hand,
        };
        if set.layout() != expected_layout {
            trace!(layout = ?set.layout(), "landmark set does not match catalog role");
            return Vec::new();
        }

        let mut readings = Vec::new();
        let mut inputs: Vec<&Landmark> = Vec::with_capacity(4);

        for spec in &self.entries {
            let applies = match (role, spec.scope) {
                (Role::Pose, Scope::Pose) => true,
                (Role::Hand { assignment }, Scope::Hand(side)) => assignment.side == side,
                _ => false,
            };
            if !applies {
                continue;
            }

            inputs.clear();
            let resolved = spec.inputs.iter().all(|input| {
                let landmark = match (input, role) {
                    (Input::Pose(i), Role::Pose) | (Input::Hand(i), Role::Hand { .. }) => set.get(*i),
                    (Input::ParentWrist, Role::Hand { assignment }) => Some(&assignment.parent.wrist),
                    _ => None,
                };
                match landmark {
                    Some(lm) => {
                        inputs.push(lm);
                        true
                    }
                    None => false,
                }
            });
            if !resolved {
                trace!(measurement = %spec.name, "skipping: input landmark missing");
                continue;
            }

            match (spec.compute)(&inputs) {
                Some(degrees) if degrees.is_finite() => readings.push(Reading {
                    name: spec.name.clone(),
                    degrees,
                    timestamp_ms,
                }),
                _ => trace!(measurement = %spec.name, "skipping: degenerate geometry"),
            }
        }

        readings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::ParentLimb;

    fn upright_pose() -> LandmarkSet {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); pose::COUNT];
        points[pose::NOSE] = Landmark::new(0.5, 0.15, 0.0);
        points[pose::LEFT_EAR] = Landmark::new(0.45, 0.18, 0.0);
        points[pose::LEFT_SHOULDER] = Landmark::new(0.45, 0.3, 0.0);
        points[pose::RIGHT_SHOULDER] = Landmark::new(0.55, 0.3, 0.0);
        points[pose::LEFT_ELBOW] = Landmark::new(0.43, 0.42, 0.0);
        points[pose::RIGHT_ELBOW] = Landmark::new(0.57, 0.42, 0.0);
        points[pose::LEFT_WRIST] = Landmark::new(0.43, 0.54, 0.0);
        points[pose::RIGHT_WRIST] = Landmark::new(0.57, 0.54, 0.0);
        points[pose::LEFT_INDEX] = Landmark::new(0.43, 0.6, 0.0);
        points[pose::RIGHT_INDEX] = Landmark::new(0.57, 0.6, 0.0);
        points[pose::LEFT_PINKY] = Landmark::new(0.42, 0.59, 0.0);
        points[pose::RIGHT_PINKY] = Landmark::new(0.58, 0.59, 0.0);
        points[pose::LEFT_HIP] = Landmark::new(0.45, 0.55, 0.0);
        points[pose::RIGHT_HIP] = Landmark::new(0.55, 0.55, 0.0);
        points[pose::LEFT_KNEE] = Landmark::new(0.45, 0.75, 0.0);
        points[pose::RIGHT_KNEE] = Landmark::new(0.55, 0.75, 0.0);
        LandmarkSet::from_landmarks(Layout::Pose, points).unwrap()
    }

    fn find<'a>(readings: &'a [Reading], name: &str) -> Option<&'a Reading> {
        readings.iter().find(|r| r.name == name)
    }

    #[test]
    fn names_are_unique() {
        let catalog = JointCatalog::standard();
        let mut names: Vec<&str> = catalog.measurement_names().collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(catalog.get("lumbar_rotation").is_some());
        assert!(catalog.get("right_hand_supination").is_some());
    }

    #[test]
    fn full_pose_produces_every_pose_entry() {
        let catalog = JointCatalog::standard();
        let readings = catalog.evaluate(&upright_pose(), Role::Pose, 40.0);
        let pose_entries = catalog.entries().iter().filter(|e| e.scope == Scope::Pose).count();
        assert_eq!(readings.len(), pose_entries);
        assert!(readings.iter().all(|r| r.timestamp_ms == 40.0));
        assert_eq!(find(&readings, "neck_flexion").unwrap().degrees, 0.0);
        assert_eq!(find(&readings, "lumbar_flexion").unwrap().degrees, 0.0);
        assert_eq!(find(&readings, "left_wrist_flexion").unwrap().degrees, 0.0);
    }

    #[test]
    fn missing_landmark_skips_only_dependents() {
        let mut set = upright_pose();
        set.set(pose::LEFT_WRIST, None);
        let readings = STANDARD_CATALOG.evaluate(&set, Role::Pose, 0.0);

        assert!(find(&readings, "left_wrist_flexion").is_none());
        assert!(find(&readings, "left_pronation").is_none());
        assert!(find(&readings, "left_elbow_angle").is_none());
        assert!(find(&readings, "right_wrist_flexion").is_some());
        assert!(find(&readings, "neck_flexion").is_some());
    }

    #[test]
    fn degenerate_geometry_is_isolated() {
        let mut set = upright_pose();
        // nose on top of the left shoulder: the neck ray has no direction
        set.set(pose::NOSE, set.get(pose::LEFT_SHOULDER).copied());
        let readings = STANDARD_CATALOG.evaluate(&set, Role::Pose, 0.0);

        assert!(find(&readings, "neck_flexion").is_none());
        assert!(find(&readings, "neck_rotation").is_none());
        assert!(find(&readings, "lumbar_flexion").is_some());
    }

    #[test]
    fn empty_set_yields_nothing() {
        let readings = STANDARD_CATALOG.evaluate(&LandmarkSet::empty(Layout::Pose), Role::Pose, 0.0);
        assert!(readings.is_empty());
    }

    #[test]
    fn hand_entries_follow_assigned_side() {
        let assignment = HandAssignment {
            hand_index: 0,
            side: Side::Right,
            distance: 0.0,
            parent: ParentLimb {
                side: Side::Right,
                elbow: None,
                wrist: Landmark::new(0.5, 0.5, 0.0),
            },
        };
        let mut raw = [[0.5, 0.5, 0.0]; hand::COUNT];
        raw[hand::INDEX_TIP] = [0.6, 0.6, 0.0];
        raw[hand::MIDDLE_TIP] = [0.6, 0.4, 0.0];
        raw[hand::THUMB_TIP] = [0.5, 0.4, 0.0];
        let hand_set = LandmarkSet::from_raw(Layout::Hand, &raw).unwrap();

        let readings = STANDARD_CATALOG.evaluate(&hand_set, Role::Hand { assignment: &assignment }, 5.0);
        assert_eq!(readings.len(), 9);
        assert!(readings.iter().all(|r| r.name.starts_with("right_hand_")));
        assert_eq!(find(&readings, "right_hand_wrist_flexion").unwrap().degrees, 45.0);
        assert_eq!(find(&readings, "right_hand_wrist_extension").unwrap().degrees, 0.0);
        assert_eq!(find(&readings, "right_hand_ulnar_deviation").unwrap().degrees, 45.0);
        assert_eq!(find(&readings, "right_hand_radial_deviation").unwrap().degrees, 0.0);
        assert_eq!(find(&readings, "right_hand_supination").unwrap().degrees, 20.0);
    }

    #[test]
    fn pose_role_rejects_hand_layout() {
        let hand_set = LandmarkSet::from_raw(Layout::Hand, &[[0.5, 0.5, 0.0]; hand::COUNT]).unwrap();
        assert!(STANDARD_CATALOG.evaluate(&hand_set, Role::Pose, 0.0).is_empty());
    }
}
