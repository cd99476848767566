use crate::camera::FrameSink;
use crate::error::{AnalyzerError, Result};
use crate::frame::Frame;
use tokio::sync::watch;
use tracing::{trace, warn};

/// Number of chroma bytes the probe reads from the start of the U plane.
const PROBE_BYTES: usize = 4;

/// Scalar result extracted from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisResult {
    pub frame_id: u64,
    pub value: i32,
}

/// Per-frame analyzer reading a native-endian `i32` probe from the first
/// chrominance plane.
///
/// Each call is independent and stateless. Results are published through a
/// latest-wins channel: a result the display has not yet consumed is simply
/// overwritten by the next one, with no queueing and no blocking on either
/// side.
pub struct FrameAnalyzer {
    output: watch::Sender<Option<AnalysisResult>>,
}

impl FrameAnalyzer {
    pub fn new() -> (Self, watch::Receiver<Option<AnalysisResult>>) {
        let (output, receiver) = watch::channel(None);
        (Self { output }, receiver)
    }

    /// Analyze one frame and publish its result.
    ///
    /// The U plane must hold at least four readable bytes at offset zero;
    /// shorter planes fail this single invocation without affecting the
    /// stream.
    pub fn analyze(&self, frame: &Frame) -> Result<AnalysisResult> {
        let chroma = frame.chroma_u();
        if chroma.len() < PROBE_BYTES {
            return Err(AnalyzerError::MalformedFrame {
                plane_len: chroma.len(),
                needed: PROBE_BYTES,
            }
            .into());
        }

        let value = i32::from_ne_bytes([chroma[0], chroma[1], chroma[2], chroma[3]]);
        let result = AnalysisResult {
            frame_id: frame.id,
            value,
        };

        self.output.send_replace(Some(result));
        trace!("Frame {} probe value {}", frame.id, value);
        Ok(result)
    }

    /// Additional receiver on the latest-wins result channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<AnalysisResult>> {
        self.output.subscribe()
    }
}

impl FrameSink for FrameAnalyzer {
    fn on_frame(&self, frame: &Frame, _rotation_hint: i32) {
        // A short chroma plane spoils only this frame, never the session.
        if let Err(e) = self.analyze(frame) {
            warn!("Skipping frame {}: {}", frame.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ViewfinderError;
    use std::time::SystemTime;

    fn frame_with_chroma_u(id: u64, chroma_u: Vec<u8>) -> Frame {
        Frame::new(
            id,
            SystemTime::now(),
            640,
            640,
            vec![0u8; 16],
            chroma_u,
            vec![0u8; 16],
        )
    }

    #[test]
    fn test_probe_reads_native_endian_int() {
        let (analyzer, _rx) = FrameAnalyzer::new();
        let mut chroma = 42i32.to_ne_bytes().to_vec();
        chroma.extend_from_slice(&[0xAA; 12]);

        let result = analyzer.analyze(&frame_with_chroma_u(1, chroma)).unwrap();
        assert_eq!(result.value, 42);
        assert_eq!(result.frame_id, 1);
    }

    #[test]
    fn test_result_depends_only_on_chroma_u_prefix() {
        let (analyzer, _rx) = FrameAnalyzer::new();
        let chroma = (-7i32).to_ne_bytes().to_vec();

        let first = Frame::new(
            1,
            SystemTime::now(),
            640,
            640,
            vec![0u8; 16],
            chroma.clone(),
            vec![0u8; 16],
        );
        let second = Frame::new(
            2,
            SystemTime::now(),
            640,
            640,
            vec![0xFFu8; 64],
            chroma,
            vec![0x55u8; 64],
        );

        assert_eq!(
            analyzer.analyze(&first).unwrap().value,
            analyzer.analyze(&second).unwrap().value
        );
    }

    #[test]
    fn test_short_chroma_plane_is_malformed() {
        let (analyzer, _rx) = FrameAnalyzer::new();
        let result = analyzer.analyze(&frame_with_chroma_u(1, vec![1, 2, 3]));

        match result {
            Err(ViewfinderError::Analyzer(AnalyzerError::MalformedFrame {
                plane_len,
                needed,
            })) => {
                assert_eq!(plane_len, 3);
                assert_eq!(needed, 4);
            }
            other => panic!("expected malformed frame error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_frame_keeps_previous_result() {
        let (analyzer, rx) = FrameAnalyzer::new();
        analyzer
            .analyze(&frame_with_chroma_u(1, 9i32.to_ne_bytes().to_vec()))
            .unwrap();

        analyzer.on_frame(&frame_with_chroma_u(2, vec![0]), 0);

        assert_eq!(rx.borrow().unwrap().value, 9);
        assert_eq!(rx.borrow().unwrap().frame_id, 1);
    }

    #[test]
    fn test_latest_wins_overwrites_unconsumed_result() {
        let (analyzer, mut rx) = FrameAnalyzer::new();

        analyzer
            .analyze(&frame_with_chroma_u(1, 1i32.to_ne_bytes().to_vec()))
            .unwrap();
        analyzer
            .analyze(&frame_with_chroma_u(2, 2i32.to_ne_bytes().to_vec()))
            .unwrap();

        // Only the second frame's result is observable; the first was never
        // queued anywhere.
        let latest = *rx.borrow_and_update();
        assert_eq!(latest.unwrap().value, 2);
        assert_eq!(latest.unwrap().frame_id, 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_exactly_four_bytes_is_sufficient() {
        let (analyzer, _rx) = FrameAnalyzer::new();
        let result = analyzer
            .analyze(&frame_with_chroma_u(1, i32::MIN.to_ne_bytes().to_vec()))
            .unwrap();
        assert_eq!(result.value, i32::MIN);
    }
}
