// src/geometry.rs - Joint-angle math over normalized landmark positions
//
// Image coordinates throughout: y grows downward, so "up" is negative y.
// A None from a joint function means coincident points, never a missing input.

use nalgebra::Vector2;
use serde::Serialize;

use crate::landmark::Landmark;

pub const COMBINED_WRIST_LIMIT: f64 = 60.0;

/// Offset subtracted from the thumb direction so a relaxed forearm reads ~0°.
pub const PRONATION_OFFSET: f64 = 20.0;

/// Law-of-cosines angle at `vertex` between the rays `vertex→a` and
/// `vertex→c`, in `[0, 180]`.
///
/// Returns `None` when either ray has zero length. Floating error that pushes
/// the cosine outside `[-1, 1]` is clamped away.
pub fn angle_at_vertex(a: Vector2<f64>, vertex: Vector2<f64>, c: Vector2<f64>) -> Option<f64> {
    let ab_sq = (a - vertex).norm_squared();
    let cb_sq = (c - vertex).norm_squared();
    if ab_sq == 0.0 || cb_sq == 0.0 {
        return None;
    }
    let ac_sq = (a - c).norm_squared();

    let cos = ((ab_sq + cb_sq - ac_sq) / (2.0 * ab_sq.sqrt() * cb_sq.sqrt())).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

pub fn angle_between_vectors(v1: Vector2<f64>, v2: Vector2<f64>) -> f64 {
    let mag1 = v1.norm();
    let mag2 = v2.norm();
    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }
    let cos = (v1.dot(&v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Angle from `v1` to `v2`, negative when the 2D cross product is negative.
///
/// With `y` pointing down, rotating from `(1, 0)` towards `(0, 1)` (visually
/// clockwise) is positive.
pub fn signed_angle_between_vectors(v1: Vector2<f64>, v2: Vector2<f64>) -> f64 {
    let cross = v1.perp(&v2);
    let unsigned = angle_between_vectors(v1, v2);
    if cross < 0.0 {
        -unsigned
    } else {
        unsigned
    }
}

pub fn direction_angle(from: Vector2<f64>, to: Vector2<f64>) -> Option<f64> {
    let d = to - from;
    if d.x == 0.0 && d.y == 0.0 {
        return None;
    }
    Some(d.y.atan2(d.x).to_degrees())
}

// Halves round up, so -0.005 becomes 0.0 rather than -0.01.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// How a raw geometric angle is remapped so the anatomically neutral posture
/// reads 0°.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeutralZero {
    /// `max(0, |angle| − 90)`: neutral is a vertical ray, flexion tips past it.
    PastVertical,
    /// `max(0, 90 − |angle|)`: neutral is a vertical ray, extension falls short of it.
    ShortOfVertical,
    /// `max(0, 90 − angle)`: neutral is a right angle.
    ShortOfRightAngle,
    /// `max(0, 180 − angle)`: neutral is a straight line.
    ShortOfStraight,
    /// `|180 − angle|`: distance from a straight line in either direction.
    OffStraight,
}

impl NeutralZero {
    pub fn apply(&self, angle: f64) -> f64 {
        match self {
            NeutralZero::PastVertical => (angle.abs() - 90.0).max(0.0),
            NeutralZero::ShortOfVertical => (90.0 - angle.abs()).max(0.0),
            NeutralZero::ShortOfRightAngle => (90.0 - angle).max(0.0),
            NeutralZero::ShortOfStraight => (180.0 - angle).max(0.0),
            NeutralZero::OffStraight => (180.0 - angle).abs(),
        }
    }
}

fn directional(from: &Landmark, to: &Landmark, remap: NeutralZero) -> Option<f64> {
    direction_angle(from.xy(), to.xy()).map(|angle| round2(remap.apply(angle)))
}

fn triangle(a: &Landmark, vertex: &Landmark, c: &Landmark, remap: NeutralZero) -> Option<f64> {
    angle_at_vertex(a.xy(), vertex.xy(), c.xy()).map(|angle| round2(remap.apply(angle)))
}

// ---------------------------------------------------------------------------
// Neck
// ---------------------------------------------------------------------------

pub fn neck_flexion(shoulder: &Landmark, nose: &Landmark) -> Option<f64> {
    directional(shoulder, nose, NeutralZero::PastVertical)
}

pub fn neck_extension(ear: &Landmark, shoulder: &Landmark) -> Option<f64> {
    directional(shoulder, ear, NeutralZero::ShortOfVertical)
}

/// Angle at the nose subtended by the two shoulders, remapped from 90°.
pub fn neck_rotation(nose: &Landmark, left_shoulder: &Landmark, right_shoulder: &Landmark) -> Option<f64> {
    triangle(left_shoulder, nose, right_shoulder, NeutralZero::ShortOfRightAngle)
}

pub fn neck_lateral_bending(
    nose: &Landmark,
    left_shoulder: &Landmark,
    right_shoulder: &Landmark,
) -> Option<f64> {
    triangle(left_shoulder, nose, right_shoulder, NeutralZero::ShortOfRightAngle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NeckDirection {
    Left,
    Right,
    Center,
}

/// Which shoulder the nose has moved past, judged along `x` only.
///
/// Works whether or not the feed is mirrored: "past the left shoulder" means
/// on the far side of it from the right shoulder. Coincident shoulders are
/// read as a mirrored view, left shoulder on the image left.
pub fn neck_direction(nose: &Landmark, left_shoulder: &Landmark, right_shoulder: &Landmark) -> NeckDirection {
    let outward = if left_shoulder.x > right_shoulder.x { 1.0 } else { -1.0 };
    if (nose.x - left_shoulder.x) * outward > 0.0 {
        NeckDirection::Left
    } else if (right_shoulder.x - nose.x) * outward > 0.0 {
        NeckDirection::Right
    } else {
        NeckDirection::Center
    }
}

// ---------------------------------------------------------------------------
// Lumbar
// ---------------------------------------------------------------------------

/// Bend at the hip between the shoulder and knee; a straight trunk reads 0.
pub fn lumbar_flexion(hip: &Landmark, shoulder: &Landmark, knee: &Landmark) -> Option<f64> {
    triangle(shoulder, hip, knee, NeutralZero::ShortOfStraight)
}

pub fn lumbar_extension(hip: &Landmark, shoulder: &Landmark, knee: &Landmark) -> Option<f64> {
    triangle(shoulder, hip, knee, NeutralZero::OffStraight)
}

pub fn lumbar_lateral(nose: &Landmark, hip: &Landmark) -> Option<f64> {
    directional(hip, nose, NeutralZero::PastVertical)
}

/// Signed twist of the shoulder line about the mid-hip, in `[-180, 180)`.
///
/// Measured as the direction of mid-hip→right shoulder minus the direction of
/// mid-hip→left shoulder. No neutral-zero remap is applied.
pub fn lumbar_rotation(
    left_shoulder: &Landmark,
    right_shoulder: &Landmark,
    left_hip: &Landmark,
    right_hip: &Landmark,
) -> Option<f64> {
    let mid_hip = (left_hip.xy() + right_hip.xy()) / 2.0;
    let left = direction_angle(mid_hip, left_shoulder.xy())?.to_radians();
    let right = direction_angle(mid_hip, right_shoulder.xy())?.to_radians();

    let pi = std::f64::consts::PI;
    let difference = (right - left + pi).rem_euclid(2.0 * pi) - pi;
    Some(round2(difference.to_degrees()))
}

// ---------------------------------------------------------------------------
// Wrist and forearm (pose landmarks only)
// ---------------------------------------------------------------------------

pub fn wrist_flexion(wrist: &Landmark, index: &Landmark) -> Option<f64> {
    directional(wrist, index, NeutralZero::PastVertical)
}

pub fn wrist_extension(wrist: &Landmark, index: &Landmark) -> Option<f64> {
    directional(wrist, index, NeutralZero::ShortOfVertical)
}

/// Angle at the index knuckle between pinky and wrist, remapped from 90°.
/// Which way the hand deviates is left to the caller.
pub fn ulnar_deviation(index: &Landmark, pinky: &Landmark, wrist: &Landmark) -> Option<f64> {
    triangle(pinky, index, wrist, NeutralZero::ShortOfRightAngle)
}

pub fn radial_deviation(index: &Landmark, pinky: &Landmark, wrist: &Landmark) -> Option<f64> {
    ulnar_deviation(index, pinky, wrist)
}

/// Angle at the elbow between wrist and index finger, remapped from 90°.
pub fn pronation(elbow: &Landmark, wrist: &Landmark, index: &Landmark) -> Option<f64> {
    triangle(wrist, elbow, index, NeutralZero::ShortOfRightAngle)
}

pub fn supination(elbow: &Landmark, wrist: &Landmark, index: &Landmark) -> Option<f64> {
    pronation(elbow, wrist, index)
}

// 180 is a straight arm
pub fn elbow_angle(shoulder: &Landmark, elbow: &Landmark, wrist: &Landmark) -> Option<f64> {
    angle_at_vertex(shoulder.xy(), elbow.xy(), wrist.xy()).map(round2)
}

// ---------------------------------------------------------------------------
// Combined pose wrist + hand landmarks
// ---------------------------------------------------------------------------

fn horizontal() -> Vector2<f64> {
    Vector2::x()
}

fn upward() -> Vector2<f64> {
    -Vector2::y()
}

/// Signed angle of pose wrist→hand index tip from horizontal, clamped to
/// ±[`COMBINED_WRIST_LIMIT`]. Positive is flexion (hand below horizontal).
pub fn combined_wrist_angle(pose_wrist: &Landmark, index_tip: &Landmark) -> f64 {
    let angle = signed_angle_between_vectors(horizontal(), index_tip.xy() - pose_wrist.xy());
    round2(angle.clamp(-COMBINED_WRIST_LIMIT, COMBINED_WRIST_LIMIT))
}

/// Signed angle of pose wrist→middle fingertip from horizontal.
/// The positive part is reported as radial deviation, the negative part as ulnar.
pub fn radial_ulnar(pose_wrist: &Landmark, middle_tip: &Landmark) -> f64 {
    round2(signed_angle_between_vectors(horizontal(), middle_tip.xy() - pose_wrist.xy()))
}

/// Signed angle of pose wrist→thumb tip from straight up, less
/// [`PRONATION_OFFSET`]. Positive is pronation, negative supination.
pub fn pronation_supination(pose_wrist: &Landmark, thumb_tip: &Landmark) -> f64 {
    let angle = signed_angle_between_vectors(upward(), thumb_tip.xy() - pose_wrist.xy());
    round2(angle - PRONATION_OFFSET)
}

pub fn positive_part(value: f64) -> f64 {
    value.max(0.0)
}

pub fn negative_magnitude(value: f64) -> f64 {
    if value < 0.0 {
        value.abs()
    } else {
        0.0
    }
}
