// src/overlay.rs - egui skeleton overlay built from each frame snapshot
use egui::{Color32, Painter, Pos2, Rect, Rounding, Shape, Stroke};

use crate::analysis::{CaptureRegion, FrameSnapshot, ReferenceResolution};
use crate::capture::{Frame, FrameRenderer};
use crate::landmark::{Landmark, LandmarkSet};
use crate::skeleton::{
    self, Rgb, HAND_CONNECTIONS, HAND_CONNECTION_COLOR, HAND_JOINT_COLOR, INSIDE_REGION_COLOR,
    OUTSIDE_REGION_COLOR, POSE_CONNECTIONS, REGION_FRAME_COLOR,
};

pub fn to_color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub line_width: f32,
    pub joint_radius: f32,
    pub ring_radius: f32,
    pub hand_joint_radius: f32,
    pub region_width: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_width: 2.0,
            joint_radius: 5.0,
            ring_radius: 7.0,
            hand_joint_radius: 3.0,
            region_width: 3.0,
        }
    }
}

/// Keeps the display list for the most recent snapshot. A GUI host paints
/// it each repaint with [`SkeletonOverlay::paint`].
pub struct SkeletonOverlay {
    style: OverlayStyle,
    region: CaptureRegion,
    resolution: ReferenceResolution,
    shapes: Vec<Shape>,
}

fn project(rect: Rect, landmark: &Landmark) -> Pos2 {
    Pos2::new(
        rect.left() + landmark.x as f32 * rect.width(),
        rect.top() + landmark.y as f32 * rect.height(),
    )
}

impl SkeletonOverlay {
    pub fn new(region: CaptureRegion, resolution: ReferenceResolution) -> Self {
        Self {
            style: OverlayStyle::default(),
            region,
            resolution,
            shapes: Vec::new(),
        }
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Capture region scaled from reference pixels into `rect`.
    pub fn region_rect(&self, rect: Rect) -> Rect {
        let sx = rect.width() / self.resolution.width as f32;
        let sy = rect.height() / self.resolution.height as f32;
        Rect::from_min_size(
            Pos2::new(
                rect.left() + self.region.left as f32 * sx,
                rect.top() + self.region.top as f32 * sy,
            ),
            egui::vec2(self.region.width as f32 * sx, self.region.height as f32 * sy),
        )
    }

    pub fn build_shapes(&self, rect: Rect, snapshot: &FrameSnapshot) -> Vec<Shape> {
        let mut shapes = Vec::new();

        if !snapshot.inside_capture_region {
            shapes.push(Shape::rect_stroke(
                self.region_rect(rect),
                Rounding::ZERO,
                Stroke::new(self.style.region_width, to_color32(REGION_FRAME_COLOR)),
            ));
        }

        if let Some(pose) = &snapshot.pose {
            self.pose_shapes(rect, pose, snapshot.inside_capture_region, &mut shapes);
        }
        for hand in &snapshot.hand_sets {
            self.hand_shapes(rect, hand, &mut shapes);
        }
        shapes
    }

    fn pose_shapes(&self, rect: Rect, pose: &LandmarkSet, inside: bool, shapes: &mut Vec<Shape>) {
        for &(from, to) in POSE_CONNECTIONS.iter() {
            if let (Some(a), Some(b)) = (pose.get(from), pose.get(to)) {
                let color = to_color32(skeleton::pose_connection_color(from, to));
                shapes.push(Shape::line_segment(
                    [project(rect, a), project(rect, b)],
                    Stroke::new(self.style.line_width, color),
                ));
            }
        }

        let ring = to_color32(if inside { INSIDE_REGION_COLOR } else { OUTSIDE_REGION_COLOR });
        for (index, landmark) in pose.iter_present() {
            let pos = project(rect, landmark);
            shapes.push(Shape::circle_filled(
                pos,
                self.style.joint_radius,
                to_color32(skeleton::pose_landmark_color(index)),
            ));
            shapes.push(Shape::circle_stroke(pos, self.style.ring_radius, Stroke::new(self.style.line_width, ring)));
        }
    }

    fn hand_shapes(&self, rect: Rect, hand: &LandmarkSet, shapes: &mut Vec<Shape>) {
        let line = Stroke::new(self.style.line_width, to_color32(HAND_CONNECTION_COLOR));
        for &(from, to) in HAND_CONNECTIONS.iter() {
            if let (Some(a), Some(b)) = (hand.get(from), hand.get(to)) {
                shapes.push(Shape::line_segment([project(rect, a), project(rect, b)], line));
            }
        }
        for (_, landmark) in hand.iter_present() {
            shapes.push(Shape::circle_filled(
                project(rect, landmark),
                self.style.hand_joint_radius,
                to_color32(HAND_JOINT_COLOR),
            ));
        }
    }

    pub fn paint(&self, painter: &Painter) {
        painter.extend(self.shapes.iter().cloned());
    }
}

impl FrameRenderer for SkeletonOverlay {
    fn render(&mut self, frame: &Frame, snapshot: &FrameSnapshot) {
        let rect = Rect::from_min_size(Pos2::ZERO, egui::vec2(frame.width() as f32, frame.height() as f32));
        self.shapes = self.build_shapes(rect, snapshot);
    }

    fn clear(&mut self) {
        self.shapes.clear();
    }
}
