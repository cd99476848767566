use crate::analyzer::{AnalysisResult, FrameAnalyzer};
use crate::camera::{
    CameraProvider, CameraSessionController, CameraSessionState, StreamTargets,
};
use crate::config::ViewfinderConfig;
use crate::display::{run_display, DisplaySink};
use crate::error::Result;
use crate::events::EventBus;
use crate::permission::{PermissionBackend, PermissionState};
use crate::preview::{PreviewController, PreviewSurface, UiState};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Wires the camera session, preview controller, analyzer and display
/// together and owns their lifetimes.
///
/// The embedding host supplies the external collaborators: camera provider,
/// permission backend, preview surface and display sink.
pub struct ViewfinderApp {
    config: ViewfinderConfig,
    event_bus: Arc<EventBus>,
    ui: Arc<UiState>,
    preview: Arc<PreviewController>,
    permissions: Arc<dyn PermissionBackend>,
    display: Arc<dyn DisplaySink>,
    controller: CameraSessionController,
    results: Option<watch::Receiver<Option<AnalysisResult>>>,
    display_task: Option<JoinHandle<()>>,
    event_task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl ViewfinderApp {
    pub fn new(
        config: ViewfinderConfig,
        provider: Arc<dyn CameraProvider>,
        permissions: Arc<dyn PermissionBackend>,
        surface: Arc<dyn PreviewSurface>,
        display: Arc<dyn DisplaySink>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let ui = Arc::new(UiState::new());
        let preview = Arc::new(PreviewController::new(surface, Arc::clone(&ui)));
        let (analyzer, results) = FrameAnalyzer::new();

        let controller = CameraSessionController::builder()
            .required_permissions(config.permission.required.clone())
            .permissions(Arc::clone(&permissions))
            .provider(provider)
            .preview(Arc::clone(&preview))
            .analyzer(Arc::new(analyzer))
            .targets(StreamTargets::from_config(&config.camera))
            .event_bus(Arc::clone(&event_bus))
            .build()?;

        Ok(Self {
            config,
            event_bus,
            ui,
            preview,
            permissions,
            display,
            controller,
            results: Some(results),
            display_task: None,
            event_task: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn ui(&self) -> Arc<UiState> {
        Arc::clone(&self.ui)
    }

    pub fn session_state(&self) -> CameraSessionState {
        self.controller.state()
    }

    /// Report a layout or rotation change of the preview surface.
    pub fn on_layout_change(&self, rotation_code: i32) {
        self.preview.on_layout_change(rotation_code);
    }

    /// Start the pipeline: display task, initial layout pass, then the
    /// permission-gated camera session.
    pub async fn start(&mut self) -> Result<()> {
        let mut events = self.event_bus.subscribe();
        self.event_task = Some(tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                info!("{}", event.description());
            }
        }));

        if let Some(results) = self.results.take() {
            self.display_task = Some(tokio::spawn(run_display(
                results,
                Arc::clone(&self.display),
                Arc::clone(&self.ui),
                self.cancel.clone(),
            )));
        }

        // The host performs the initial layout pass before the session binds;
        // binding waits on it.
        self.preview
            .on_layout_change(self.config.preview.rotation_code);

        self.controller.start().await?;

        // With no interactive prompt available, answer a pending permission
        // request from the backend's current grants.
        if self.controller.state() == CameraSessionState::AwaitingPermission {
            if let Some(token) = self.controller.pending_request() {
                let granted: HashSet<String> = self
                    .controller
                    .required_permissions()
                    .iter()
                    .filter(|p| self.permissions.check(p) == PermissionState::Granted)
                    .cloned()
                    .collect();
                self.controller.on_permission_result(token, &granted).await?;
            }
        }

        Ok(())
    }

    /// Run until a shutdown signal arrives, then tear down.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;
        info!("Viewfinder running");

        wait_for_shutdown_signal().await;
        self.shutdown().await
    }

    /// Deterministic teardown: unbind the camera stream, then stop the
    /// display and event tasks.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down");
        self.controller.stop().await;
        self.cancel.cancel();

        if let Some(task) = self.display_task.take() {
            if tokio::time::timeout(Duration::from_secs(1), task)
                .await
                .is_err()
            {
                warn!("Display task did not complete within timeout");
            }
        }

        if let Some(task) = self.event_task.take() {
            task.abort();
        }

        info!("Shutdown complete");
        Ok(())
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
