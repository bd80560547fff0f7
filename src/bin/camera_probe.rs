// src/bin/camera_probe.rs - Checks that a camera can be opened and read
use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ergo_tracker::capture::{CameraSource, FrameStream};
use ergo_tracker::video::NokhwaCamera;
use ergo_tracker::DeviceErrorKind;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let index: u32 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 0,
    };

    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => {
            info!("found {} camera(s)", cameras.len());
            for (i, camera) in cameras.iter().enumerate() {
                info!("  [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => error!("failed to query cameras: {}", e),
    }

    let mut stream = match NokhwaCamera::new(index).acquire().await {
        Ok(stream) => stream,
        Err(e) => {
            error!("failed to open camera {}: {}", index, e);
            match e.kind() {
                DeviceErrorKind::PermissionDenied => {
                    error!("grant camera access to this terminal and try again")
                }
                DeviceErrorKind::NoDevice => {
                    error!("check that a camera is connected and not in use by another app")
                }
            }
            return Err(e.into());
        }
    };

    let result = stream.next_frame();
    stream.release();
    let frame = result?;
    info!(
        width = frame.width(),
        height = frame.height(),
        "frame captured, camera access working"
    );
    Ok(())
}
