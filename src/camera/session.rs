use super::provider::{CameraProvider, FrameSink, PreviewSink, StreamTargets};
use crate::analyzer::FrameAnalyzer;
use crate::error::{PermissionError, Result, ViewfinderError};
use crate::events::{EventBus, ViewfinderEvent};
use crate::permission::{PermissionBackend, PermissionState, RequestToken};
use crate::preview::PreviewController;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Camera session lifecycle states.
///
/// Transitions are one-directional except out of `AwaitingPermission`, which
/// resolves to `Starting` or `Failed` when the single permission request
/// round-trip completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraSessionState {
    Uninitialized,
    AwaitingPermission,
    Starting,
    Streaming,
    Failed,
}

/// Permission-gated owner of the camera session.
///
/// `start` checks the required permission set and either binds the preview and
/// analysis sinks to the provider or issues one asynchronous permission
/// request. The host answers that request through `on_permission_result`.
/// A denied round-trip or a failed bind is terminal; the controller does not
/// retry.
pub struct CameraSessionController {
    required_permissions: Vec<String>,
    permissions: Arc<dyn PermissionBackend>,
    provider: Arc<dyn CameraProvider>,
    preview: Arc<PreviewController>,
    analyzer: Arc<FrameAnalyzer>,
    targets: StreamTargets,
    event_bus: Arc<EventBus>,
    state: CameraSessionState,
    pending_request: Option<RequestToken>,
    stream: Option<super::provider::StreamHandle>,
}

impl CameraSessionController {
    pub fn builder() -> CameraSessionControllerBuilder {
        CameraSessionControllerBuilder::new()
    }

    pub fn state(&self) -> CameraSessionState {
        self.state
    }

    /// Token of the permission request currently awaiting its result.
    pub fn pending_request(&self) -> Option<RequestToken> {
        self.pending_request
    }

    pub fn required_permissions(&self) -> &[String] {
        &self.required_permissions
    }

    fn set_state(&mut self, to: CameraSessionState) {
        let from = self.state;
        self.state = to;
        debug!("Session state {:?} -> {:?}", from, to);
        self.event_bus.publish(ViewfinderEvent::SessionStateChanged {
            from,
            to,
            timestamp: SystemTime::now(),
        });
    }

    fn missing_permissions(&self) -> Vec<String> {
        self.required_permissions
            .iter()
            .filter(|p| self.permissions.check(p) != PermissionState::Granted)
            .cloned()
            .collect()
    }

    /// Start the camera session.
    ///
    /// A no-op while a start is already in progress, the stream is live, or
    /// the session has already failed.
    pub async fn start(&mut self) -> Result<()> {
        match self.state {
            CameraSessionState::Starting | CameraSessionState::Streaming => {
                debug!("start() ignored; session already {:?}", self.state);
                return Ok(());
            }
            CameraSessionState::AwaitingPermission => {
                debug!("start() ignored; permission request already in flight");
                return Ok(());
            }
            CameraSessionState::Failed => {
                warn!("start() ignored; session has failed and is not restarted");
                return Ok(());
            }
            CameraSessionState::Uninitialized => {}
        }

        let missing = self.missing_permissions();
        if missing.is_empty() {
            return self.begin_streaming().await;
        }

        let token = RequestToken::new();
        self.pending_request = Some(token);
        self.set_state(CameraSessionState::AwaitingPermission);
        info!("Requesting missing permissions: {:?}", missing);
        self.permissions
            .request(&self.required_permissions, token)
            .await
    }

    /// Deliver the result of a permission request.
    ///
    /// Invoked by the host exactly once per request; a result carrying an
    /// unknown or already-settled token has no effect.
    pub async fn on_permission_result(
        &mut self,
        token: RequestToken,
        granted: &HashSet<String>,
    ) -> Result<()> {
        match self.pending_request {
            Some(pending) if pending == token => {
                self.pending_request = None;
            }
            _ => {
                debug!(
                    "Ignoring permission result for unknown or settled token {:?}",
                    token
                );
                return Ok(());
            }
        }

        let missing: Vec<String> = self
            .required_permissions
            .iter()
            .filter(|p| !granted.contains(*p))
            .cloned()
            .collect();

        self.event_bus.publish(ViewfinderEvent::PermissionResult {
            granted: missing.is_empty(),
            missing: missing.clone(),
            timestamp: SystemTime::now(),
        });

        if missing.is_empty() {
            info!("All required permissions granted");
            return self.begin_streaming().await;
        }

        error!("Permissions denied by the user: {:?}", missing);
        self.set_state(CameraSessionState::Failed);
        Err(PermissionError::Denied { missing }.into())
    }

    /// Bind the preview and analysis sinks to the provider.
    ///
    /// Deferred until the preview surface has completed its first layout pass,
    /// since the view's dimensions are unknown before then.
    async fn begin_streaming(&mut self) -> Result<()> {
        self.set_state(CameraSessionState::Starting);
        self.preview.wait_laid_out().await;

        let preview = Arc::clone(&self.preview) as Arc<dyn PreviewSink>;
        let analyzer = Arc::clone(&self.analyzer) as Arc<dyn FrameSink>;

        match self
            .provider
            .bind(self.targets.clone(), preview, analyzer)
            .await
        {
            Ok(handle) => {
                self.stream = Some(handle);
                self.set_state(CameraSessionState::Streaming);
                self.event_bus.publish(ViewfinderEvent::StreamBound {
                    timestamp: SystemTime::now(),
                });
                info!("Camera session streaming");
                Ok(())
            }
            Err(e) => {
                error!("Failed to bind camera stream: {}", e);
                self.event_bus.publish(ViewfinderEvent::SystemError {
                    component: "camera".to_string(),
                    error: e.to_string(),
                });
                self.set_state(CameraSessionState::Failed);
                Err(e)
            }
        }
    }

    /// Tear the session down.
    ///
    /// Unbinds future frame deliveries; an analysis call already in flight is
    /// allowed to complete.
    pub async fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop().await;
            info!("Camera session stopped");
        } else {
            debug!("stop() with no bound stream");
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state == CameraSessionState::Streaming
    }
}

/// Builder for the session controller.
pub struct CameraSessionControllerBuilder {
    required_permissions: Vec<String>,
    permissions: Option<Arc<dyn PermissionBackend>>,
    provider: Option<Arc<dyn CameraProvider>>,
    preview: Option<Arc<PreviewController>>,
    analyzer: Option<Arc<FrameAnalyzer>>,
    targets: Option<StreamTargets>,
    event_bus: Option<Arc<EventBus>>,
}

impl CameraSessionControllerBuilder {
    pub fn new() -> Self {
        Self {
            required_permissions: Vec::new(),
            permissions: None,
            provider: None,
            preview: None,
            analyzer: None,
            targets: None,
            event_bus: None,
        }
    }

    pub fn required_permissions(mut self, permissions: Vec<String>) -> Self {
        self.required_permissions = permissions;
        self
    }

    pub fn permissions(mut self, backend: Arc<dyn PermissionBackend>) -> Self {
        self.permissions = Some(backend);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CameraProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn preview(mut self, preview: Arc<PreviewController>) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<FrameAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn targets(mut self, targets: StreamTargets) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<CameraSessionController> {
        if self.required_permissions.is_empty() {
            return Err(ViewfinderError::system(
                "At least one required permission must be specified",
            ));
        }

        Ok(CameraSessionController {
            required_permissions: self.required_permissions,
            permissions: self
                .permissions
                .ok_or_else(|| ViewfinderError::system("Permission backend must be specified"))?,
            provider: self
                .provider
                .ok_or_else(|| ViewfinderError::system("Camera provider must be specified"))?,
            preview: self
                .preview
                .ok_or_else(|| ViewfinderError::system("Preview controller must be specified"))?,
            analyzer: self
                .analyzer
                .ok_or_else(|| ViewfinderError::system("Frame analyzer must be specified"))?,
            targets: self
                .targets
                .ok_or_else(|| ViewfinderError::system("Stream targets must be specified"))?,
            event_bus: self
                .event_bus
                .ok_or_else(|| ViewfinderError::system("Event bus must be specified"))?,
            state: CameraSessionState::Uninitialized,
            pending_request: None,
            stream: None,
        })
    }
}

impl Default for CameraSessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
