use super::provider::{CameraProvider, FrameSink, PreviewSink, StreamHandle, StreamTargets};
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::Frame;
use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// GStreamer-backed camera provider delivering planar I420 frames.
pub struct GstCameraProvider {
    config: CameraConfig,
    frame_counter: Arc<AtomicU64>,
}

impl GstCameraProvider {
    pub fn new(config: CameraConfig) -> Result<Self> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        info!(
            "Initialized GStreamer camera provider for device {}",
            config.index
        );

        Ok(Self {
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    fn build_pipeline_string(&self, targets: &StreamTargets) -> String {
        let (width, height) = targets.resolution;

        format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             videoconvert ! \
             video/x-raw,format=I420,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=4 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=4 drop=true emit-signals=false",
            self.config.index, width, height, targets.fps
        )
    }

    fn frame_from_sample(
        sample: gstreamer::Sample,
        frame_counter: &Arc<AtomicU64>,
    ) -> Result<Frame> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::CaptureStream {
            details: "No caps in sample".to_string(),
        })?;

        let video_info = VideoInfo::from_caps(caps).map_err(|e| CameraError::CaptureStream {
            details: format!("Failed to get video info: {}", e),
        })?;

        let width = video_info.width();
        let height = video_info.height();

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to map buffer: {}", e),
            })?;

        let (luma, chroma_u, chroma_v) = split_i420_planes(map.as_slice(), width, height)?;

        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
        Ok(Frame::new(
            frame_id,
            SystemTime::now(),
            width,
            height,
            luma,
            chroma_u,
            chroma_v,
        ))
    }
}

/// Split a contiguous I420 buffer into its three planes.
fn split_i420_planes(data: &[u8], width: u32, height: u32) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let (luma_len, chroma_len) = Frame::expected_i420_sizes(width, height);
    let needed = luma_len + 2 * chroma_len;

    if data.len() < needed {
        return Err(CameraError::CaptureStream {
            details: format!(
                "I420 buffer holds {} bytes, expected {} for {}x{}",
                data.len(),
                needed,
                width,
                height
            ),
        }
        .into());
    }

    let luma = data[..luma_len].to_vec();
    let chroma_u = data[luma_len..luma_len + chroma_len].to_vec();
    let chroma_v = data[luma_len + chroma_len..needed].to_vec();
    Ok((luma, chroma_u, chroma_v))
}

#[async_trait]
impl CameraProvider for GstCameraProvider {
    async fn bind(
        &self,
        targets: StreamTargets,
        preview: Arc<dyn PreviewSink>,
        analyzer: Arc<dyn FrameSink>,
    ) -> Result<StreamHandle> {
        let pipeline_desc = self.build_pipeline_string(&targets);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Bind {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Bind {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Bind {
                details: "Failed to get appsink element".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Bind {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let _ = tx.send(sample);
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::Bind {
                details: format!("Failed to start pipeline: {}", e),
            })?;

        info!("GStreamer pipeline started");

        let cancel = CancellationToken::new();
        let capture_cancel = cancel.clone();
        let frame_counter = Arc::clone(&self.frame_counter);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = capture_cancel.cancelled() => break,
                    sample = rx.recv() => {
                        let Some(sample) = sample else {
                            warn!("GStreamer sample channel closed");
                            break;
                        };

                        match GstCameraProvider::frame_from_sample(sample, &frame_counter) {
                            Ok(frame) => {
                                preview.on_preview_frame(0);
                                analyzer.on_frame(&frame, 0);
                                trace!(
                                    "Delivered frame {} ({}x{})",
                                    frame.id,
                                    frame.width,
                                    frame.height
                                );
                            }
                            Err(e) => {
                                error!("Error processing GStreamer sample: {}", e);
                            }
                        }
                    }
                }
            }

            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop GStreamer pipeline cleanly: {}", e);
            }
            debug!("GStreamer capture loop stopped");
        });

        Ok(StreamHandle::new(cancel, task))
    }
}
