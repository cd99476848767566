use super::provider::{CameraProvider, FrameSink, PreviewSink, StreamHandle, StreamTargets};
use crate::error::Result;
use crate::frame::Frame;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// Synthetic camera provider generating planar 4:2:0 frames at the configured
/// rate on its own task.
///
/// Frames are delivered sequentially, so a sink never sees more than one
/// in-flight call. Each frame's U plane starts with the frame id encoded as a
/// native-endian `i32`, which makes downstream results deterministic.
pub struct MockCameraProvider {
    frame_counter: Arc<AtomicU64>,
}

impl MockCameraProvider {
    pub fn new() -> Self {
        Self {
            frame_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    fn synthesize_frame(frame_id: u64, width: u32, height: u32) -> Frame {
        let (luma_len, chroma_len) = Frame::expected_i420_sizes(width, height);

        let luma = vec![16u8; luma_len];
        let mut chroma_u = vec![128u8; chroma_len];
        let probe = (frame_id as i32).to_ne_bytes();
        let prefix = probe.len().min(chroma_u.len());
        chroma_u[..prefix].copy_from_slice(&probe[..prefix]);
        let chroma_v = vec![128u8; chroma_len];

        Frame::new(
            frame_id,
            SystemTime::now(),
            width,
            height,
            luma,
            chroma_u,
            chroma_v,
        )
    }
}

impl Default for MockCameraProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraProvider for MockCameraProvider {
    async fn bind(
        &self,
        targets: StreamTargets,
        preview: Arc<dyn PreviewSink>,
        analyzer: Arc<dyn FrameSink>,
    ) -> Result<StreamHandle> {
        info!(
            "Binding mock camera stream ({}x{} @ {}fps, aspect {}:{})",
            targets.resolution.0,
            targets.resolution.1,
            targets.fps,
            targets.aspect_ratio.0,
            targets.aspect_ratio.1
        );

        let cancel = CancellationToken::new();
        let capture_cancel = cancel.clone();
        let frame_counter = Arc::clone(&self.frame_counter);

        let task = tokio::spawn(async move {
            let (width, height) = targets.resolution;
            let frame_interval = Duration::from_millis((1000 / targets.fps.max(1) as u64).max(1));
            let mut interval_timer = tokio::time::interval(frame_interval);

            info!("Mock capture loop started");

            loop {
                tokio::select! {
                    _ = capture_cancel.cancelled() => break,
                    _ = interval_timer.tick() => {
                        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
                        let frame = MockCameraProvider::synthesize_frame(frame_id, width, height);

                        preview.on_preview_frame(0);
                        analyzer.on_frame(&frame, 0);

                        trace!(
                            "Delivered mock frame {} ({}x{})",
                            frame_id,
                            width,
                            height
                        );
                    }
                }
            }

            info!("Mock capture loop stopped");
        });

        Ok(StreamHandle::new(cancel, task))
    }
}
