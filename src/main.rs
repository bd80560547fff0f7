// src/main.rs - Headless runner: capture, analyze, prompt and record a session
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ergo_tracker::capture::{CaptureSession, Frame, FrameClock, FrameRenderer};
use ergo_tracker::config::{SourceKind, TrackerConfig};
use ergo_tracker::export::SessionRecorder;
use ergo_tracker::feedback::FeedbackTracker;
use ergo_tracker::overlay::SkeletonOverlay;
use ergo_tracker::simulation::SimulatedDetector;
use ergo_tracker::video::{ImageDirectoryCamera, NokhwaCamera, SyntheticCamera, VideoSource};
use ergo_tracker::{FrameSnapshot, STANDARD_CATALOG};

/// Everything the host does with a finished snapshot.
struct HostRenderer {
    overlay: SkeletonOverlay,
    feedback: FeedbackTracker,
    recorder: Option<SessionRecorder>,
}

impl FrameRenderer for HostRenderer {
    fn render(&mut self, frame: &Frame, snapshot: &FrameSnapshot) {
        self.overlay.render(frame, snapshot);
        for prompt in self.feedback.observe(snapshot) {
            info!("{}", prompt);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(snapshot) {
                warn!("session recording stopped: {:#}", e);
                self.recorder = None;
            }
        }
        debug!(
            frame = frame.sequence,
            readings = snapshot.readings.len(),
            shapes = self.overlay.shapes().len(),
            "frame rendered"
        );
    }

    fn clear(&mut self) {
        self.overlay.clear();
        self.feedback.reset();
    }
}

fn open_source(config: &TrackerConfig) -> Result<VideoSource> {
    Ok(match config.source {
        SourceKind::Camera => VideoSource::Camera(NokhwaCamera::new(config.camera_index)),
        SourceKind::Synthetic => VideoSource::Synthetic(SyntheticCamera::new(
            config.reference_resolution.width as u32,
            config.reference_resolution.height as u32,
        )),
        SourceKind::Images => {
            let dir = config
                .image_dir
                .as_ref()
                .context("The images source needs an image_dir")?;
            VideoSource::Images(ImageDirectoryCamera::new(dir))
        }
    })
}

fn list_cameras() {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => {
            for (i, camera) in cameras.iter().enumerate() {
                debug!("camera [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => debug!("failed to query cameras: {}", e),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => TrackerConfig::load(&path).with_context(|| format!("Failed to load config {}", path))?,
        None => TrackerConfig::default(),
    };
    if config.source == SourceKind::Camera {
        list_cameras();
    }

    let recorder = config
        .record_session
        .then(|| SessionRecorder::new(&config.output_directory, None, &STANDARD_CATALOG));
    let renderer = HostRenderer {
        overlay: SkeletonOverlay::new(config.capture_region, config.reference_resolution),
        feedback: FeedbackTracker::new(),
        recorder,
    };

    // No landmark model ships with the runner; the simulated subject stands in.
    let detector = SimulatedDetector::new().with_wander(true);

    let mut session = CaptureSession::new(
        open_source(&config)?,
        detector,
        renderer,
        FrameClock::new(config.frame_interval()),
        config.analyzer(),
    );

    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "capture event");
        }
    });

    session.start().await.context("Failed to start capture")?;

    let stop = session.stop_handle();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            interrupt.request_stop();
        }
    });
    if let Some(secs) = config.max_duration_secs {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            info!(secs, "time limit reached, stopping");
            stop.request_stop();
        });
    }

    session.run().await;

    if let Some(recorder) = session.renderer_mut().recorder.as_mut() {
        if recorder.frame_count() == 0 {
            warn!("no frames were recorded");
            return Ok(());
        }
        let csv = recorder.export_csv()?;
        let report = recorder.generate_report()?;
        recorder.export_summary_json()?;
        info!(csv = %csv.display(), report = %report.display(), "session saved");
    }
    Ok(())
}
