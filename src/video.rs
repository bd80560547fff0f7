// src/video.rs - Frame sources: webcam via nokhwa, synthetic frames, still images
use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::capture::{CameraSource, DeviceError, FrameStream};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Sorts a device failure into the two kinds the lifecycle reports.
pub fn classify_camera_error(message: &str) -> DeviceError {
    let lower = message.to_lowercase();
    let denied = ["permission", "denied", "not authorized", "unauthorized", "not permitted"];
    if denied.iter().any(|needle| lower.contains(needle)) {
        DeviceError::PermissionDenied(message.to_string())
    } else {
        DeviceError::NoDevice(message.to_string())
    }
}

// ---------------------------------------------------------------------------
// Webcam
// ---------------------------------------------------------------------------

pub struct NokhwaCamera {
    index: u32,
    mirror: bool,
}

impl NokhwaCamera {
    pub fn new(index: u32) -> Self {
        Self { index, mirror: true }
    }

    /// Frames are mirrored by default so the preview reads like a selfie view.
    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }
}

#[async_trait(?Send)]
impl CameraSource for NokhwaCamera {
    type Stream = NokhwaStream;

    async fn acquire(&mut self) -> Result<NokhwaStream, DeviceError> {
        debug!(index = self.index, "opening camera");
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| classify_camera_error(&e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| classify_camera_error(&e.to_string()))?;

        let resolution = camera.resolution();
        info!(
            index = self.index,
            width = resolution.width(),
            height = resolution.height(),
            fps = camera.frame_rate(),
            "camera stream open"
        );
        Ok(NokhwaStream {
            camera,
            mirror: self.mirror,
        })
    }
}

pub struct NokhwaStream {
    camera: Camera,
    mirror: bool,
}

impl FrameStream for NokhwaStream {
    fn next_frame(&mut self) -> Result<DynamicImage> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| anyhow::anyhow!("Failed to capture frame: {}", e))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| anyhow::anyhow!("Failed to decode frame: {}", e))?;

        let (width, height) = (decoded.width(), decoded.height());
        let img: RgbImage = ImageBuffer::from_raw(width, height, decoded.into_raw())
            .context("Decoded frame does not match its reported size")?;

        let img = if self.mirror {
            image::imageops::flip_horizontal(&img)
        } else {
            img
        };
        Ok(DynamicImage::ImageRgb8(img))
    }

    fn release(mut self) {
        if let Err(e) = self.camera.stop_stream() {
            warn!("failed to stop camera stream: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic frames
// ---------------------------------------------------------------------------

/// Flat grey frames for running the pipeline without a device.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait(?Send)]
impl CameraSource for SyntheticCamera {
    type Stream = SyntheticStream;

    async fn acquire(&mut self) -> Result<SyntheticStream, DeviceError> {
        if self.width == 0 || self.height == 0 {
            return Err(DeviceError::NoDevice("synthetic source has zero size".to_string()));
        }
        Ok(SyntheticStream {
            frame: DynamicImage::ImageRgb8(RgbImage::from_pixel(self.width, self.height, Rgb([48, 48, 48]))),
        })
    }
}

pub struct SyntheticStream {
    frame: DynamicImage,
}

impl FrameStream for SyntheticStream {
    fn next_frame(&mut self) -> Result<DynamicImage> {
        Ok(self.frame.clone())
    }

    fn release(self) {}
}

// ---------------------------------------------------------------------------
// Still images
// ---------------------------------------------------------------------------

/// Cycles through the images in a directory, in file-name order.
pub struct ImageDirectoryCamera {
    dir: PathBuf,
}

impl ImageDirectoryCamera {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[async_trait(?Send)]
impl CameraSource for ImageDirectoryCamera {
    type Stream = ImageDirectoryStream;

    async fn acquire(&mut self) -> Result<ImageDirectoryStream, DeviceError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                DeviceError::PermissionDenied(format!("{}: {}", self.dir.display(), e))
            }
            _ => DeviceError::NoDevice(format!("{}: {}", self.dir.display(), e)),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(DeviceError::NoDevice(format!(
                "no images found in {}",
                self.dir.display()
            )));
        }
        info!(count = paths.len(), dir = %self.dir.display(), "image source ready");
        Ok(ImageDirectoryStream { paths, next: 0 })
    }
}

pub struct ImageDirectoryStream {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageDirectoryStream {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameStream for ImageDirectoryStream {
    fn next_frame(&mut self) -> Result<DynamicImage> {
        let path = self
            .paths
            .get(self.next)
            .context("Image source has no frames")?;
        self.next = (self.next + 1) % self.paths.len();
        image::open(path).with_context(|| format!("Failed to load image {}", path.display()))
    }

    fn release(self) {}
}

// ---------------------------------------------------------------------------
// Runtime selection
// ---------------------------------------------------------------------------

/// Whichever source the configuration picked.
pub enum VideoSource {
    Camera(NokhwaCamera),
    Synthetic(SyntheticCamera),
    Images(ImageDirectoryCamera),
}

pub enum VideoStream {
    Camera(NokhwaStream),
    Synthetic(SyntheticStream),
    Images(ImageDirectoryStream),
}

#[async_trait(?Send)]
impl CameraSource for VideoSource {
    type Stream = VideoStream;

    async fn acquire(&mut self) -> Result<VideoStream, DeviceError> {
        Ok(match self {
            VideoSource::Camera(camera) => VideoStream::Camera(camera.acquire().await?),
            VideoSource::Synthetic(synthetic) => VideoStream::Synthetic(synthetic.acquire().await?),
            VideoSource::Images(images) => VideoStream::Images(images.acquire().await?),
        })
    }
}

impl FrameStream for VideoStream {
    fn next_frame(&mut self) -> Result<DynamicImage> {
        match self {
            VideoStream::Camera(stream) => stream.next_frame(),
            VideoStream::Synthetic(stream) => stream.next_frame(),
            VideoStream::Images(stream) => stream.next_frame(),
        }
    }

    fn release(self) {
        match self {
            VideoStream::Camera(stream) => stream.release(),
            VideoStream::Synthetic(stream) => stream.release(),
            VideoStream::Images(stream) => stream.release(),
        }
    }
}
