mod mock;
mod provider;
mod session;
#[cfg(test)]
mod tests;

#[cfg(all(target_os = "linux", feature = "camera"))]
mod gst;

pub use mock::MockCameraProvider;
pub use provider::{CameraProvider, FrameSink, PreviewSink, StreamHandle, StreamTargets};
pub use session::{CameraSessionController, CameraSessionControllerBuilder, CameraSessionState};

#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gst::GstCameraProvider;
