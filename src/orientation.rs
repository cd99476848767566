use crate::error::PreviewError;
use serde::{Deserialize, Serialize};

/// Physical display rotation, one of four fixed orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayOrientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl DisplayOrientation {
    /// Get the rotation angle in degrees
    pub fn degrees(&self) -> u16 {
        match self {
            DisplayOrientation::Deg0 => 0,
            DisplayOrientation::Deg90 => 90,
            DisplayOrientation::Deg180 => 180,
            DisplayOrientation::Deg270 => 270,
        }
    }

    /// Map a platform rotation code to an orientation.
    ///
    /// Total over the four fixed codes; any other value is unrepresentable and
    /// is rejected rather than coerced.
    pub fn from_rotation_code(code: i32) -> Result<Self, PreviewError> {
        match code {
            0 => Ok(DisplayOrientation::Deg0),
            90 => Ok(DisplayOrientation::Deg90),
            180 => Ok(DisplayOrientation::Deg180),
            270 => Ok(DisplayOrientation::Deg270),
            _ => Err(PreviewError::UnrepresentableRotation { code }),
        }
    }
}
