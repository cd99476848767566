use std::sync::Arc;
use std::time::SystemTime;

/// Identifies one channel of a planar image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneKind {
    /// Luminance plane (Y)
    Luma,
    /// First chrominance plane (U)
    ChromaU,
    /// Second chrominance plane (V)
    ChromaV,
}

/// One independently addressable byte buffer of a planar frame.
///
/// Buffers are shared with the producing camera provider, which may hand the
/// same allocation to several consumers within one delivery.
#[derive(Debug, Clone)]
pub struct Plane {
    data: Arc<Vec<u8>>,
}

impl Plane {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub fn from_shared(data: Arc<Vec<u8>>) -> Self {
        Self { data }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An immutable planar video frame: Y, U and V planes plus pixel dimensions.
///
/// A frame is owned by the camera provider for the duration of one analyzer
/// invocation; consumers receive it by reference and must not hold plane data
/// past that call, since the provider may recycle the buffers immediately
/// afterwards.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when the frame was captured
    pub timestamp: SystemTime,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    luma: Plane,
    chroma_u: Plane,
    chroma_v: Plane,
}

impl Frame {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        width: u32,
        height: u32,
        luma: Vec<u8>,
        chroma_u: Vec<u8>,
        chroma_v: Vec<u8>,
    ) -> Self {
        Self {
            id,
            timestamp,
            width,
            height,
            luma: Plane::new(luma),
            chroma_u: Plane::new(chroma_u),
            chroma_v: Plane::new(chroma_v),
        }
    }

    pub fn plane(&self, kind: PlaneKind) -> &Plane {
        match kind {
            PlaneKind::Luma => &self.luma,
            PlaneKind::ChromaU => &self.chroma_u,
            PlaneKind::ChromaV => &self.chroma_v,
        }
    }

    pub fn luma(&self) -> &[u8] {
        self.luma.bytes()
    }

    pub fn chroma_u(&self) -> &[u8] {
        self.chroma_u.bytes()
    }

    pub fn chroma_v(&self) -> &[u8] {
        self.chroma_v.bytes()
    }

    /// Expected plane sizes (luma, per-chroma) for 4:2:0 subsampled data.
    pub fn expected_i420_sizes(width: u32, height: u32) -> (usize, usize) {
        let luma = width as usize * height as usize;
        let chroma = (width as usize / 2) * (height as usize / 2);
        (luma, chroma)
    }

    /// Validate plane sizes against 4:2:0 subsampling expectations.
    pub fn validate_i420_size(&self) -> bool {
        let (luma, chroma) = Self::expected_i420_sizes(self.width, self.height);
        self.luma.len() == luma && self.chroma_u.len() == chroma && self.chroma_v.len() == chroma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planar_frame(width: u32, height: u32) -> Frame {
        let (luma, chroma) = Frame::expected_i420_sizes(width, height);
        Frame::new(
            1,
            SystemTime::now(),
            width,
            height,
            vec![16u8; luma],
            vec![128u8; chroma],
            vec![128u8; chroma],
        )
    }

    #[test]
    fn test_plane_accessors() {
        let frame = Frame::new(
            7,
            SystemTime::now(),
            4,
            4,
            vec![1u8; 16],
            vec![2u8; 4],
            vec![3u8; 4],
        );

        assert_eq!(frame.id, 7);
        assert_eq!(frame.luma(), frame.plane(PlaneKind::Luma).bytes());
        assert_eq!(frame.chroma_u()[0], 2);
        assert_eq!(frame.chroma_v()[0], 3);
        assert_eq!(frame.plane(PlaneKind::ChromaU).len(), 4);
    }

    #[test]
    fn test_i420_size_validation() {
        let valid = planar_frame(640, 640);
        assert!(valid.validate_i420_size());

        let invalid = Frame::new(
            2,
            SystemTime::now(),
            640,
            640,
            vec![0u8; 100],
            vec![0u8; 100],
            vec![0u8; 100],
        );
        assert!(!invalid.validate_i420_size());
    }

    #[test]
    fn test_expected_i420_sizes() {
        assert_eq!(Frame::expected_i420_sizes(640, 640), (409600, 102400));
        assert_eq!(Frame::expected_i420_sizes(4, 2), (8, 2));
    }

    #[test]
    fn test_planes_are_independent() {
        // A frame with mismatched plane sizes is still representable; each
        // plane is its own buffer.
        let frame = Frame::new(
            3,
            SystemTime::now(),
            640,
            640,
            vec![0u8; 10],
            vec![0u8; 2],
            Vec::new(),
        );
        assert_eq!(frame.luma().len(), 10);
        assert_eq!(frame.chroma_u().len(), 2);
        assert!(frame.plane(PlaneKind::ChromaV).is_empty());
    }
}
