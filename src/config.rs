use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ViewfinderConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub permission: PermissionConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Target capture resolution (width, height) requested from the provider
    #[serde(default = "default_target_resolution")]
    pub target_resolution: (u32, u32),

    /// Target aspect ratio (numerator, denominator) requested from the provider
    #[serde(default = "default_target_aspect_ratio")]
    pub target_aspect_ratio: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PreviewConfig {
    /// Initial preview surface size (width, height) before the first layout
    #[serde(default = "default_surface_size")]
    pub surface_size: (u32, u32),

    /// Display rotation code reported by the hosting surface (degrees)
    #[serde(default = "default_rotation_code")]
    pub rotation_code: i32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PermissionConfig {
    /// Permission ids the camera session requires before it may start
    #[serde(default = "default_required_permissions")]
    pub required: Vec<String>,

    /// Permission ids granted up front by the embedding environment
    #[serde(default)]
    pub pre_granted: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

fn default_camera_index() -> u32 {
    0
}

fn default_target_resolution() -> (u32, u32) {
    (640, 640)
}

fn default_target_aspect_ratio() -> (u32, u32) {
    (1, 1)
}

fn default_camera_fps() -> u32 {
    30
}

fn default_surface_size() -> (u32, u32) {
    (640, 640)
}

fn default_rotation_code() -> i32 {
    0
}

fn default_required_permissions() -> Vec<String> {
    vec!["camera".to_string()]
}

fn default_event_bus_capacity() -> usize {
    100
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            target_resolution: default_target_resolution(),
            target_aspect_ratio: default_target_aspect_ratio(),
            fps: default_camera_fps(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            surface_size: default_surface_size(),
            rotation_code: default_rotation_code(),
        }
    }
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            required: default_required_permissions(),
            pre_granted: Vec::new(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for ViewfinderConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            preview: PreviewConfig::default(),
            permission: PermissionConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

impl ViewfinderConfig {
    /// Load configuration from a TOML file with `VIEWFINDER_` environment
    /// overrides. A missing file yields the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("VIEWFINDER").separator("__"))
            .build()?;

        let config: ViewfinderConfig = settings.try_deserialize()?;
        config.validate()?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.camera.fps == 0 {
            return Err(crate::error::ViewfinderError::system(
                "camera.fps must be greater than zero",
            ));
        }

        let (width, height) = self.camera.target_resolution;
        if width == 0 || height == 0 {
            return Err(crate::error::ViewfinderError::system(
                "camera.target_resolution dimensions must be non-zero",
            ));
        }

        let (num, den) = self.camera.target_aspect_ratio;
        if num == 0 || den == 0 {
            return Err(crate::error::ViewfinderError::system(
                "camera.target_aspect_ratio terms must be non-zero",
            ));
        }

        if self.permission.required.is_empty() {
            return Err(crate::error::ViewfinderError::system(
                "permission.required must name at least one permission",
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(crate::error::ViewfinderError::system(
                "system.event_bus_capacity must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Serialize the default configuration to TOML, for `--print-config`.
    pub fn default_toml() -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ViewfinderConfig::default();
        assert_eq!(config.camera.target_resolution, (640, 640));
        assert_eq!(config.camera.target_aspect_ratio, (1, 1));
        assert_eq!(config.permission.required, vec!["camera".to_string()]);
        assert!(config.permission.pre_granted.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_fps() {
        let mut config = ViewfinderConfig::default();
        config.camera.fps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_required_permissions() {
        let mut config = ViewfinderConfig::default();
        config.permission.required.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_degenerate_aspect_ratio() {
        let mut config = ViewfinderConfig::default();
        config.camera.target_aspect_ratio = (1, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = ViewfinderConfig::load_from_file("/nonexistent/viewfinder.toml").unwrap();
        assert_eq!(config.camera.fps, 30);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[camera]\nindex = 2\nfps = 15\n\n[permission]\npre_granted = [\"camera\"]"
        )
        .unwrap();

        let config = ViewfinderConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.camera.fps, 15);
        assert_eq!(config.camera.target_resolution, (640, 640));
        assert_eq!(config.permission.pre_granted, vec!["camera".to_string()]);
    }

    #[test]
    fn test_default_toml_round_trips() {
        let rendered = ViewfinderConfig::default_toml().unwrap();
        let parsed: ViewfinderConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(
            parsed.camera.target_resolution,
            ViewfinderConfig::default().camera.target_resolution
        );
    }
}
