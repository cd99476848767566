pub mod analyzer;
pub mod app;
pub mod camera;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod frame;
pub mod orientation;
pub mod permission;
pub mod preview;
pub mod transform;

pub use analyzer::{AnalysisResult, FrameAnalyzer};
pub use app::ViewfinderApp;
pub use camera::{
    CameraProvider, CameraSessionController, CameraSessionControllerBuilder, CameraSessionState,
    FrameSink, MockCameraProvider, PreviewSink, StreamHandle, StreamTargets,
};
pub use config::ViewfinderConfig;
pub use display::{DisplaySink, StdoutDisplay};
pub use error::{Result, ViewfinderError};
pub use events::{EventBus, ViewfinderEvent};
pub use frame::{Frame, Plane, PlaneKind};
pub use orientation::DisplayOrientation;
pub use permission::{
    MockPermissionBackend, PermissionBackend, PermissionState, RequestToken, StaticPermissions,
};
pub use preview::{HeadlessSurface, PreviewController, PreviewSurface, UiState};
pub use transform::{PreviewTransformCalculator, Transform2D};

#[cfg(all(target_os = "linux", feature = "camera"))]
pub use camera::GstCameraProvider;
