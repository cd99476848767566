use crate::config::CameraConfig;
use crate::error::Result;
use crate::frame::Frame;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-frame delivery target for the analysis stream.
///
/// Frames arrive sequentially on a dedicated capture context, at most one
/// in-flight call per sink. The frame reference is only valid for the duration
/// of the call; implementations must copy anything they keep.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &Frame, rotation_hint: i32);
}

/// Notification target for the preview stream.
///
/// The provider renders preview pixels to the surface directly; this callback
/// only signals availability, with the per-frame rotation hint in degrees.
pub trait PreviewSink: Send + Sync {
    fn on_preview_frame(&self, rotation_hint: i32);
}

/// Output characteristics requested from the provider for both the preview
/// and the analysis stream.
#[derive(Debug, Clone)]
pub struct StreamTargets {
    /// Aspect ratio (numerator, denominator)
    pub aspect_ratio: (u32, u32),
    /// Resolution (width, height)
    pub resolution: (u32, u32),
    /// Frames per second
    pub fps: u32,
}

impl StreamTargets {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            aspect_ratio: config.target_aspect_ratio,
            resolution: config.target_resolution,
            fps: config.fps,
        }
    }
}

/// Handle to a bound camera stream.
///
/// `stop` unbinds future deliveries and waits for the capture task to wind
/// down; an analyzer call already in flight is allowed to complete. Binding
/// is acquired and released through this handle only.
pub struct StreamHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn new(cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { cancel, task }
    }

    pub async fn stop(self) {
        debug!("Stopping camera stream");
        self.cancel.cancel();

        match tokio::time::timeout(Duration::from_secs(3), self.task).await {
            Ok(Ok(())) => debug!("Capture task completed"),
            Ok(Err(e)) => warn!("Capture task ended abnormally: {}", e),
            Err(_) => warn!("Capture task did not complete within timeout"),
        }
    }
}

/// External camera provider the session controller binds against.
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Bind exactly one preview sink and one analysis sink to the capture
    /// pipeline and start frame delivery.
    async fn bind(
        &self,
        targets: StreamTargets,
        preview: Arc<dyn PreviewSink>,
        analyzer: Arc<dyn FrameSink>,
    ) -> Result<StreamHandle>;
}
