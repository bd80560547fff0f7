// src/feedback.rs - Host-side posture prompts derived from consecutive snapshots
use serde::Serialize;
use std::fmt;

use crate::analysis::FrameSnapshot;
use crate::landmark::Side;

/// Above this the arm is considered locked out.
pub const ELBOW_OVEREXTENDED_DEG: f64 = 160.0;
pub const ELBOW_TOO_BENT_DEG: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElbowPosture {
    Overextended,
    Comfortable,
    TooBent,
}

pub fn elbow_posture(degrees: f64) -> ElbowPosture {
    if degrees > ELBOW_OVEREXTENDED_DEG {
        ElbowPosture::Overextended
    } else if degrees < ELBOW_TOO_BENT_DEG {
        ElbowPosture::TooBent
    } else {
        ElbowPosture::Comfortable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Feedback {
    EnteredRegion,
    LeftRegion,
    Elbow {
        side: Side,
        posture: ElbowPosture,
        degrees: f64,
    },
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::EnteredRegion => write!(f, "Great! That's the spot!"),
            Feedback::LeftRegion => write!(f, "Step back into the frame so your whole body is visible"),
            Feedback::Elbow { side, posture, degrees } => match posture {
                ElbowPosture::Overextended => {
                    write!(f, "Your {} arm is overextended ({:.0}°)", side.prefix(), degrees)
                }
                ElbowPosture::TooBent => write!(f, "Your {} arm is too bent ({:.0}°)", side.prefix(), degrees),
                ElbowPosture::Comfortable => write!(f, "Your {} arm is in a comfortable range", side.prefix()),
            },
        }
    }
}

/// Turns per-frame state into edge-triggered prompts, so a prompt is raised
/// once when a condition starts rather than on every frame.
#[derive(Debug, Default)]
pub struct FeedbackTracker {
    was_inside: bool,
    elbows: [Option<ElbowPosture>; 2],
}

fn slot(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

impl FeedbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, snapshot: &FrameSnapshot) -> Vec<Feedback> {
        let mut prompts = Vec::new();

        let inside = snapshot.subject_present && snapshot.inside_capture_region;
        match (self.was_inside, inside) {
            (false, true) => prompts.push(Feedback::EnteredRegion),
            (true, false) => prompts.push(Feedback::LeftRegion),
            _ => {}
        }
        self.was_inside = inside;

        for side in [Side::Left, Side::Right] {
            let name = format!("{}_elbow_angle", side.prefix());
            let current = snapshot.degrees(&name).map(|deg| (elbow_posture(deg), deg));
            let previous = self.elbows[slot(side)];

            if let Some((posture, degrees)) = current {
                if posture != ElbowPosture::Comfortable && previous != Some(posture) {
                    prompts.push(Feedback::Elbow { side, posture, degrees });
                }
            }
            self.elbows[slot(side)] = current.map(|(posture, _)| posture);
        }

        prompts
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
