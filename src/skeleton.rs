// src/skeleton.rs - Landmark names, connections and display colors
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

use crate::landmark::{hand, pose};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 128, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
}

pub const FALLBACK_COLOR: Rgb = Rgb::WHITE;

pub const LEFT_LIMB_COLOR: Rgb = Rgb(0, 255, 0);
pub const RIGHT_LIMB_COLOR: Rgb = Rgb(0, 0, 255);
pub const AXIAL_COLOR: Rgb = Rgb(255, 0, 0);

pub const HAND_CONNECTION_COLOR: Rgb = Rgb::WHITE;
pub const HAND_JOINT_COLOR: Rgb = Rgb::RED;

/// Skeleton tint while the subject is fully inside the capture region.
pub const INSIDE_REGION_COLOR: Rgb = Rgb::GREEN;
pub const OUTSIDE_REGION_COLOR: Rgb = Rgb::BLUE;
pub const REGION_FRAME_COLOR: Rgb = Rgb::RED;

pub const POSE_LANDMARK_NAMES: [&str; pose::COUNT] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8), (9, 10),
    (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21), (17, 19),
    (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (hand::WRIST, hand::THUMB_CMC), (hand::THUMB_CMC, hand::THUMB_MCP),
    (hand::THUMB_MCP, hand::THUMB_IP), (hand::THUMB_IP, hand::THUMB_TIP),
    (hand::WRIST, hand::INDEX_MCP), (hand::INDEX_MCP, hand::INDEX_PIP),
    (hand::INDEX_PIP, hand::INDEX_DIP), (hand::INDEX_DIP, hand::INDEX_TIP),
    (hand::INDEX_MCP, hand::MIDDLE_MCP), (hand::MIDDLE_MCP, hand::MIDDLE_PIP),
    (hand::MIDDLE_PIP, hand::MIDDLE_DIP), (hand::MIDDLE_DIP, hand::MIDDLE_TIP),
    (hand::MIDDLE_MCP, hand::RING_MCP), (hand::RING_MCP, hand::RING_PIP),
    (hand::RING_PIP, hand::RING_DIP), (hand::RING_DIP, hand::RING_TIP),
    (hand::RING_MCP, hand::PINKY_MCP), (hand::WRIST, hand::PINKY_MCP),
    (hand::PINKY_MCP, hand::PINKY_PIP), (hand::PINKY_PIP, hand::PINKY_DIP),
    (hand::PINKY_DIP, hand::PINKY_TIP),
];

// Keyed by anatomical name, not by position, so adding a name never shifts
// the color of another landmark.
static LANDMARK_COLORS: Lazy<HashMap<&'static str, Rgb>> = Lazy::new(|| {
    HashMap::from([
        ("nose", Rgb(255, 0, 0)),
        ("left_eye", Rgb(255, 0, 255)),
        ("right_eye", Rgb(170, 0, 255)),
        ("left_ear", Rgb(255, 0, 85)),
        ("right_ear", Rgb(255, 0, 170)),
        ("left_shoulder", Rgb(85, 255, 0)),
        ("right_shoulder", Rgb(255, 170, 0)),
        ("left_elbow", Rgb(0, 255, 0)),
        ("right_elbow", Rgb(255, 255, 0)),
        ("left_wrist", Rgb(0, 255, 85)),
        ("right_wrist", Rgb(170, 255, 0)),
        ("left_pinky", Rgb(0, 255, 0)),
        ("right_pinky", Rgb(0, 0, 255)),
        ("left_index", Rgb(0, 255, 0)),
        ("right_index", Rgb(0, 0, 255)),
        ("left_thumb", Rgb(0, 255, 0)),
        ("right_thumb", Rgb(0, 0, 255)),
        ("left_hip", Rgb(0, 85, 255)),
        ("right_hip", Rgb(0, 255, 170)),
        ("left_knee", Rgb(0, 0, 255)),
        ("right_knee", Rgb(0, 255, 255)),
        ("left_ankle", Rgb(85, 0, 255)),
        ("right_ankle", Rgb(0, 170, 255)),
        ("left_heel", Rgb(85, 0, 255)),
        ("right_heel", Rgb(85, 0, 255)),
        ("left_foot_index", Rgb(85, 0, 255)),
        ("right_foot_index", Rgb(85, 0, 255)),
    ])
});

pub fn pose_landmark_name(index: usize) -> Option<&'static str> {
    POSE_LANDMARK_NAMES.get(index).copied()
}

pub fn color_for_name(name: &str) -> Rgb {
    LANDMARK_COLORS.get(name).copied().unwrap_or(FALLBACK_COLOR)
}

/// Display color of a pose landmark index; unknown indices get the fallback.
pub fn pose_landmark_color(index: usize) -> Rgb {
    pose_landmark_name(index).map_or(FALLBACK_COLOR, color_for_name)
}

/// Limbs take the color of their side, anything crossing the midline (or on
/// the face) is drawn as axial.
pub fn pose_connection_color(from: usize, to: usize) -> Rgb {
    match (side_of(from), side_of(to)) {
        (Some(true), Some(true)) => LEFT_LIMB_COLOR,
        (Some(false), Some(false)) => RIGHT_LIMB_COLOR,
        _ => AXIAL_COLOR,
    }
}

// Some(true) = left, Some(false) = right, None = midline / unknown.
fn side_of(index: usize) -> Option<bool> {
    let name = pose_landmark_name(index)?;
    if index <= pose::MOUTH_RIGHT {
        return None;
    }
    if name.starts_with("left_") {
        Some(true)
    } else if name.starts_with("right_") {
        Some(false)
    } else {
        None
    }
}
