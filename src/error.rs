use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewfinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    #[error("Preview error: {0}")]
    Preview(#[from] PreviewError),

    #[error("System error: {message}")]
    System { message: String },
}

#[derive(Error, Debug)]
pub enum PermissionError {
    #[error("Required permissions not granted: {missing:?}")]
    Denied { missing: Vec<String> },

    #[error("Permission request failed: {details}")]
    RequestFailed { details: String },
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to bind camera stream: {details}")]
    Bind { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Capture stream error: {details}")]
    CaptureStream { details: String },
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Malformed frame: chroma plane holds {plane_len} bytes, need at least {needed}")]
    MalformedFrame { plane_len: usize, needed: usize },
}

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Unrepresentable display rotation code: {code}")]
    UnrepresentableRotation { code: i32 },
}

impl ViewfinderError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ViewfinderError>;
