// src/capture.rs - Capture lifecycle: start/stop, the detect loop and its collaborators
//
// One tick runs pose detection, then hand detection, then analysis, then
// rendering, and only then schedules the next tick. Ticks never overlap.

use async_trait::async_trait;
use image::DynamicImage;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, info, warn};

use crate::analysis::{FrameAnalyzer, FrameSnapshot};
use crate::landmark::LandmarkSet;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("camera access was denied: {0}")]
    PermissionDenied(String),
    #[error("no usable camera device: {0}")]
    NoDevice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceErrorKind {
    PermissionDenied,
    NoDevice,
}

impl DeviceError {
    pub fn kind(&self) -> DeviceErrorKind {
        match self {
            DeviceError::PermissionDenied(_) => DeviceErrorKind::PermissionDenied,
            DeviceError::NoDevice(_) => DeviceErrorKind::NoDevice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureState {
    Idle,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureEvent {
    Started,
    Stopped,
    Error(DeviceErrorKind),
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    pub sequence: u64,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

pub trait FrameStream {
    fn next_frame(&mut self) -> anyhow::Result<DynamicImage>;

    /// Stops the device tracks. Called exactly once when the session stops.
    fn release(self)
    where
        Self: Sized;
}

#[async_trait(?Send)]
pub trait CameraSource {
    type Stream: FrameStream;

    async fn acquire(&mut self) -> Result<Self::Stream, DeviceError>;
}

/// Pose and hand landmark detection. `timestamp_ms` is strictly increasing
/// across calls and identical for the pose and hand calls of one frame.
#[async_trait(?Send)]
pub trait LandmarkDetector {
    /// Zero or one pose; an empty frame is `Ok(None)`, not an error.
    async fn detect_pose(&mut self, frame: &Frame, timestamp_ms: f64) -> anyhow::Result<Option<LandmarkSet>>;

    /// Any number of hands, unordered and without side labels.
    async fn detect_hands(&mut self, frame: &Frame, timestamp_ms: f64) -> anyhow::Result<Vec<LandmarkSet>>;
}

pub trait FrameRenderer {
    fn render(&mut self, frame: &Frame, snapshot: &FrameSnapshot);

    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// Host frame clock driving the detect loop.
#[async_trait(?Send)]
pub trait TickScheduler {
    fn schedule_next_tick(&mut self) -> TickHandle;

    /// Cancelling a handle that is not pending is a no-op.
    fn cancel_tick(&mut self, handle: TickHandle);

    /// Resolves when `handle` is due; `false` if it is not (or no longer)
    /// pending. Dropping the returned future must leave `handle` pending.
    async fn wait_for_tick(&mut self, handle: TickHandle) -> bool;
}

pub struct FrameClock {
    interval: Duration,
    next_id: u64,
    pending: Option<(TickHandle, tokio::time::Instant)>,
}

impl FrameClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_id: 0,
            pending: None,
        }
    }
}

#[async_trait(?Send)]
impl TickScheduler for FrameClock {
    fn schedule_next_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending = Some((handle, tokio::time::Instant::now() + self.interval));
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if matches!(self.pending, Some((pending, _)) if pending == handle) {
            self.pending = None;
        }
    }

    async fn wait_for_tick(&mut self, handle: TickHandle) -> bool {
        let deadline = match self.pending {
            Some((pending, deadline)) if pending == handle => deadline,
            _ => return false,
        };
        tokio::time::sleep_until(deadline).await;
        self.pending = None;
        true
    }
}

/// Scheduler whose ticks are due as soon as they are awaited. Handy for
/// hosts that pace the loop themselves, and for tests.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Option<TickHandle>,
    scheduled: u64,
    cancelled: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    /// Number of cancellations that actually removed a pending tick.
    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

#[async_trait(?Send)]
impl TickScheduler for ManualScheduler {
    fn schedule_next_tick(&mut self) -> TickHandle {
        self.next_id += 1;
        self.scheduled += 1;
        let handle = TickHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_tick(&mut self, handle: TickHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }

    async fn wait_for_tick(&mut self, handle: TickHandle) -> bool {
        if self.pending == Some(handle) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Stop signalling and timestamps
// ---------------------------------------------------------------------------

/// Cloneable handle for requesting a stop from outside the session, for
/// example from a detector still in flight or a Ctrl-C handler.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    async fn notified(&self) {
        self.notify.notified().await
    }
}

/// Milliseconds since the session started, forced strictly increasing.
#[derive(Debug)]
pub struct TimestampClock {
    origin: Instant,
    last: Option<f64>,
}

impl Default for TimestampClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            last: None,
        }
    }
}

impl TimestampClock {
    pub fn next_timestamp(&mut self) -> f64 {
        let elapsed = self.origin.elapsed().as_secs_f64() * 1000.0;
        let ts = match self.last {
            Some(last) if elapsed <= last => last + 1.0,
            _ => elapsed,
        };
        self.last = Some(ts);
        ts
    }
}

/// What a single call to [`CaptureSession::tick`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// The frame could not be read; the next tick is still scheduled.
    FrameSkipped,
    /// A detector result arrived after a stop request and was dropped.
    Discarded,
    NotRunning,
}

enum Wake {
    Tick(bool),
    StopSignal,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct CaptureSession<C, D, R, S>
where
    C: CameraSource,
{
    camera: C,
    detector: D,
    renderer: R,
    scheduler: S,
    analyzer: FrameAnalyzer,
    state: CaptureState,
    stream: Option<C::Stream>,
    pending_tick: Option<TickHandle>,
    stop: StopHandle,
    clock: TimestampClock,
    frames_read: u64,
    latest: Option<FrameSnapshot>,
    events: broadcast::Sender<CaptureEvent>,
}

impl<C, D, R, S> CaptureSession<C, D, R, S>
where
    C: CameraSource,
    D: LandmarkDetector,
    R: FrameRenderer,
    S: TickScheduler,
{
    pub fn new(camera: C, detector: D, renderer: R, scheduler: S, analyzer: FrameAnalyzer) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            camera,
            detector,
            renderer,
            scheduler,
            analyzer,
            state: CaptureState::Idle,
            stream: None,
            pending_tick: None,
            stop: StopHandle::default(),
            clock: TimestampClock::default(),
            frames_read: 0,
            latest: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == CaptureState::Running && !self.stop.is_stop_requested()
    }

    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending_tick
    }

    pub fn latest_snapshot(&self) -> Option<&FrameSnapshot> {
        self.latest.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    fn emit(&self, event: CaptureEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Acquires the camera and schedules the first tick.
    ///
    /// Starting a running session does nothing. On a device failure the
    /// session stays idle and an [`CaptureEvent::Error`] is emitted.
    pub async fn start(&mut self) -> Result<(), DeviceError> {
        if self.state != CaptureState::Idle {
            debug!(state = ?self.state, "start ignored");
            return Ok(());
        }

        self.stop.reset();
        self.state = CaptureState::Starting;
        debug!("acquiring camera stream");

        let stream = match self.camera.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("camera acquisition failed: {}", e);
                self.state = CaptureState::Idle;
                self.emit(CaptureEvent::Error(e.kind()));
                return Err(e);
            }
        };

        if self.stop.is_stop_requested() {
            debug!("stop requested while starting, releasing stream");
            stream.release();
            self.state = CaptureState::Idle;
            self.emit(CaptureEvent::Stopped);
            return Ok(());
        }

        self.stream = Some(stream);
        self.clock = TimestampClock::default();
        self.frames_read = 0;
        self.latest = None;
        self.state = CaptureState::Running;
        self.pending_tick = Some(self.scheduler.schedule_next_tick());
        info!("capture started");
        self.emit(CaptureEvent::Started);
        Ok(())
    }

    /// Requests a stop and, unless a tick is mid-flight, completes it.
    ///
    /// Safe to call any number of times and in any state.
    pub fn stop(&mut self) {
        self.stop.request_stop();
        if self.state == CaptureState::Running {
            self.finish_stop();
        }
    }

    fn finish_stop(&mut self) {
        if self.state != CaptureState::Running {
            return;
        }
        self.state = CaptureState::Stopping;

        if let Some(handle) = self.pending_tick.take() {
            self.scheduler.cancel_tick(handle);
        }
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
        self.renderer.clear();

        self.state = CaptureState::Idle;
        info!(frames = self.frames_read, "capture stopped");
        self.emit(CaptureEvent::Stopped);
    }

    fn schedule_or_stop(&mut self) {
        if self.is_running() {
            self.pending_tick = Some(self.scheduler.schedule_next_tick());
        } else {
            self.finish_stop();
        }
    }

    pub async fn tick(&mut self) -> TickOutcome {
        if self.state != CaptureState::Running {
            return TickOutcome::NotRunning;
        }
        // This tick is the scheduled one, whoever called it.
        if let Some(handle) = self.pending_tick.take() {
            self.scheduler.cancel_tick(handle);
        }

        if self.stop.is_stop_requested() {
            self.finish_stop();
            return TickOutcome::NotRunning;
        }

        let Some(stream) = self.stream.as_mut() else {
            self.finish_stop();
            return TickOutcome::NotRunning;
        };
        let image = match stream.next_frame() {
            Ok(image) => image,
            Err(e) => {
                warn!("failed to read frame: {:#}", e);
                self.schedule_or_stop();
                return TickOutcome::FrameSkipped;
            }
        };
        self.frames_read += 1;
        let frame = Frame {
            image,
            sequence: self.frames_read,
        };
        let timestamp_ms = self.clock.next_timestamp();

        let pose = match self.detector.detect_pose(&frame, timestamp_ms).await {
            Ok(pose) => pose,
            Err(e) => {
                warn!("pose detection failed: {:#}", e);
                None
            }
        };
        if !self.is_running() {
            debug!(timestamp_ms, "discarding stale pose result");
            self.finish_stop();
            return TickOutcome::Discarded;
        }

        let hands = match self.detector.detect_hands(&frame, timestamp_ms).await {
            Ok(hands) => hands,
            Err(e) => {
                warn!("hand detection failed: {:#}", e);
                Vec::new()
            }
        };
        if !self.is_running() {
            debug!(timestamp_ms, "discarding stale hand result");
            self.finish_stop();
            return TickOutcome::Discarded;
        }

        let snapshot = self.analyzer.analyze(pose.as_ref(), &hands, timestamp_ms);
        self.renderer.render(&frame, &snapshot);
        self.latest = Some(snapshot);

        self.schedule_or_stop();
        TickOutcome::Rendered
    }

    pub async fn run(&mut self) {
        let stop = self.stop.clone();

        while self.state == CaptureState::Running {
            if stop.is_stop_requested() {
                self.finish_stop();
                break;
            }
            let Some(handle) = self.pending_tick else {
                self.finish_stop();
                break;
            };

            let wake = tokio::select! {
                fired = self.scheduler.wait_for_tick(handle) => Wake::Tick(fired),
                _ = stop.notified() => Wake::StopSignal,
            };

            match wake {
                Wake::Tick(true) => {
                    self.tick().await;
                }
                Wake::Tick(false) => {
                    debug!(?handle, "tick no longer pending");
                    self.finish_stop();
                }
                // Loop re-checks the flag; a stale permit just costs one pass.
                Wake::StopSignal => {}
            }
        }
    }
}
