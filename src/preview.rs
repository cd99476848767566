use crate::analyzer::AnalysisResult;
use crate::camera::PreviewSink;
use crate::orientation::DisplayOrientation;
use crate::transform::{PreviewTransformCalculator, Transform2D};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Mutable view-facing state, injected rather than ambient so the transform
/// and analysis paths are testable without any real surface.
#[derive(Debug, Default)]
pub struct UiState {
    inner: Mutex<UiStateInner>,
}

#[derive(Debug, Default, Clone, Copy)]
struct UiStateInner {
    transform: Option<Transform2D>,
    last_result: Option<AnalysisResult>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transform(&self, transform: Transform2D) {
        self.inner.lock().transform = Some(transform);
    }

    /// The transform currently applied to the preview surface, if any.
    pub fn transform(&self) -> Option<Transform2D> {
        self.inner.lock().transform
    }

    pub fn set_last_result(&self, result: AnalysisResult) {
        self.inner.lock().last_result = Some(result);
    }

    /// The most recent analysis result shown to the user, if any.
    pub fn last_result(&self) -> Option<AnalysisResult> {
        self.inner.lock().last_result
    }
}

/// Rendering surface the preview output is attached to.
///
/// All calls happen on the UI context.
pub trait PreviewSurface: Send + Sync {
    /// Current laid-out size (width, height) in pixels.
    fn size(&self) -> (u32, u32);

    /// Apply an upright-correcting transform to the rendered output.
    fn set_transform(&self, transform: Transform2D);

    /// Re-attach the surface when the preview output first becomes available.
    fn attach(&self);
}

/// Keeps the preview surface upright across layout and rotation changes.
///
/// Unrepresentable rotation codes drop the event and leave the previously
/// applied transform in effect.
pub struct PreviewController {
    surface: Arc<dyn PreviewSurface>,
    ui: Arc<UiState>,
    laid_out_tx: watch::Sender<bool>,
    laid_out_rx: watch::Receiver<bool>,
    attached: AtomicBool,
}

impl PreviewController {
    pub fn new(surface: Arc<dyn PreviewSurface>, ui: Arc<UiState>) -> Self {
        let (laid_out_tx, laid_out_rx) = watch::channel(false);
        Self {
            surface,
            ui,
            laid_out_tx,
            laid_out_rx,
            attached: AtomicBool::new(false),
        }
    }

    /// Recompute and apply the preview transform. Invoked on every layout or
    /// rotation change of the surface, not only once.
    pub fn on_layout_change(&self, rotation_code: i32) {
        // Any layout event means the surface has been measured, even one whose
        // rotation code turns out to be unusable.
        self.laid_out_tx.send_replace(true);

        let orientation = match DisplayOrientation::from_rotation_code(rotation_code) {
            Ok(orientation) => orientation,
            Err(e) => {
                debug!("Ignoring layout event: {}", e);
                return;
            }
        };

        let (width, height) = self.surface.size();
        let transform = PreviewTransformCalculator::compute_transform(width, height, orientation);
        self.surface.set_transform(transform);
        self.ui.set_transform(transform);
        debug!(
            "Applied preview transform for {}x{} at {} degrees",
            width,
            height,
            orientation.degrees()
        );
    }

    /// Whether the surface has completed at least one layout pass.
    pub fn laid_out(&self) -> bool {
        *self.laid_out_rx.borrow()
    }

    /// Wait until the surface has been laid out at least once. Camera binding
    /// defers on this, since the view's dimensions are unknown before then.
    pub async fn wait_laid_out(&self) {
        let mut rx = self.laid_out_rx.clone();
        // The sender lives in self, so the channel cannot close under us.
        let _ = rx.wait_for(|laid_out| *laid_out).await;
    }
}

impl PreviewSink for PreviewController {
    fn on_preview_frame(&self, rotation_hint: i32) {
        // Re-attach exactly once when the preview output first becomes
        // available, then refresh the transform for the current rotation.
        if !self.attached.swap(true, Ordering::SeqCst) {
            self.surface.attach();
            info!("Preview output available; surface attached");
            self.on_layout_change(rotation_hint);
        }
    }
}

/// Surface implementation with no rendering target behind it.
///
/// Records the applied transform and attach calls; used headless and in tests.
pub struct HeadlessSurface {
    size: Mutex<(u32, u32)>,
    transform: Mutex<Option<Transform2D>>,
    attach_count: Mutex<u32>,
}

impl HeadlessSurface {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            size: Mutex::new(size),
            transform: Mutex::new(None),
            attach_count: Mutex::new(0),
        }
    }

    /// Simulate a host layout pass resizing the surface.
    pub fn set_size(&self, size: (u32, u32)) {
        *self.size.lock() = size;
    }

    pub fn applied_transform(&self) -> Option<Transform2D> {
        *self.transform.lock()
    }

    pub fn attach_count(&self) -> u32 {
        *self.attach_count.lock()
    }
}

impl PreviewSurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        *self.size.lock()
    }

    fn set_transform(&self, transform: Transform2D) {
        *self.transform.lock() = Some(transform);
    }

    fn attach(&self) {
        *self.attach_count.lock() += 1;
    }
}
