// src/lib.rs - Ergonomic joint-angle analytics over pose and hand landmark streams
pub mod analysis;
pub mod capture;
pub mod catalog;
pub mod config;
pub mod correspondence;
pub mod export;
pub mod feedback;
pub mod geometry;
pub mod landmark;
pub mod overlay;
pub mod simulation;
pub mod skeleton;
pub mod video;

pub use analysis::{CaptureRegion, FrameAnalyzer, FrameSnapshot, ReferenceResolution};
pub use capture::{CaptureEvent, CaptureSession, CaptureState, DeviceError, DeviceErrorKind};
pub use catalog::{JointCatalog, Reading, STANDARD_CATALOG};
pub use config::TrackerConfig;
pub use geometry::NeckDirection;
pub use landmark::{Landmark, LandmarkSet, Layout, Side};
