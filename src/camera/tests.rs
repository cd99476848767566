use super::*;
use crate::analyzer::{AnalysisResult, FrameAnalyzer};
use crate::error::{CameraError, PermissionError, ViewfinderError};
use crate::events::EventBus;
use crate::permission::MockPermissionBackend;
use crate::preview::{HeadlessSurface, PreviewController, PreviewSurface, UiState};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Provider that accepts every bind and counts them.
struct CountingProvider {
    bind_count: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bind_count: AtomicUsize::new(0),
        })
    }

    fn bind_count(&self) -> usize {
        self.bind_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraProvider for CountingProvider {
    async fn bind(
        &self,
        _targets: StreamTargets,
        _preview: Arc<dyn PreviewSink>,
        _analyzer: Arc<dyn FrameSink>,
    ) -> crate::error::Result<StreamHandle> {
        self.bind_count.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let wait_cancel = cancel.clone();
        let task = tokio::spawn(async move { wait_cancel.cancelled().await });
        Ok(StreamHandle::new(cancel, task))
    }
}

/// Provider whose bind always fails, as when the hardware is busy.
struct FailingProvider;

#[async_trait]
impl CameraProvider for FailingProvider {
    async fn bind(
        &self,
        _targets: StreamTargets,
        _preview: Arc<dyn PreviewSink>,
        _analyzer: Arc<dyn FrameSink>,
    ) -> crate::error::Result<StreamHandle> {
        Err(CameraError::Bind {
            details: "hardware busy".to_string(),
        }
        .into())
    }
}

struct Harness {
    backend: Arc<MockPermissionBackend>,
    surface: Arc<HeadlessSurface>,
    preview: Arc<PreviewController>,
    results: watch::Receiver<Option<AnalysisResult>>,
    controller: CameraSessionController,
}

fn harness_with_provider(provider: Arc<dyn CameraProvider>) -> Harness {
    let backend = Arc::new(MockPermissionBackend::new());
    let surface = Arc::new(HeadlessSurface::new((640, 640)));
    let ui = Arc::new(UiState::new());
    let preview = Arc::new(PreviewController::new(
        Arc::clone(&surface) as Arc<dyn PreviewSurface>,
        ui,
    ));
    let (analyzer, results) = FrameAnalyzer::new();

    let controller = CameraSessionController::builder()
        .required_permissions(vec!["camera".to_string()])
        .permissions(Arc::clone(&backend) as Arc<dyn crate::permission::PermissionBackend>)
        .provider(provider)
        .preview(Arc::clone(&preview))
        .analyzer(Arc::new(analyzer))
        .targets(StreamTargets {
            aspect_ratio: (1, 1),
            resolution: (64, 64),
            fps: 100,
        })
        .event_bus(Arc::new(EventBus::new(16)))
        .build()
        .expect("harness controller builds");

    Harness {
        backend,
        surface,
        preview,
        results,
        controller,
    }
}

fn granted_camera() -> HashSet<String> {
    ["camera".to_string()].into_iter().collect()
}

#[tokio::test]
async fn test_pre_granted_start_streams_without_request() {
    let provider = CountingProvider::new();
    let mut harness = harness_with_provider(Arc::clone(&provider) as Arc<dyn CameraProvider>);
    harness.backend.grant("camera");
    harness.preview.on_layout_change(0);

    assert_eq!(
        harness.controller.state(),
        CameraSessionState::Uninitialized
    );
    harness.controller.start().await.unwrap();

    assert_eq!(harness.controller.state(), CameraSessionState::Streaming);
    assert_eq!(harness.backend.request_count(), 0);
    assert_eq!(provider.bind_count(), 1);

    harness.controller.stop().await;
}

#[tokio::test]
async fn test_missing_permission_issues_exactly_one_request() {
    let provider = CountingProvider::new();
    let mut harness = harness_with_provider(provider as Arc<dyn CameraProvider>);
    harness.preview.on_layout_change(0);

    harness.controller.start().await.unwrap();

    assert_eq!(
        harness.controller.state(),
        CameraSessionState::AwaitingPermission
    );
    assert_eq!(harness.backend.request_count(), 1);
    assert!(harness.controller.pending_request().is_some());

    // A second start while the request is in flight must not issue another.
    harness.controller.start().await.unwrap();
    assert_eq!(harness.backend.request_count(), 1);
}

#[tokio::test]
async fn test_grant_result_transitions_to_streaming() {
    let provider = CountingProvider::new();
    let mut harness = harness_with_provider(Arc::clone(&provider) as Arc<dyn CameraProvider>);
    harness.preview.on_layout_change(0);

    harness.controller.start().await.unwrap();
    let token = harness.controller.pending_request().unwrap();

    harness
        .controller
        .on_permission_result(token, &granted_camera())
        .await
        .unwrap();

    assert_eq!(harness.controller.state(), CameraSessionState::Streaming);
    assert_eq!(provider.bind_count(), 1);

    harness.controller.stop().await;
}

#[tokio::test]
async fn test_denied_result_fails_session_once() {
    let provider = CountingProvider::new();
    let mut harness = harness_with_provider(Arc::clone(&provider) as Arc<dyn CameraProvider>);
    harness.preview.on_layout_change(0);

    harness.controller.start().await.unwrap();
    let token = harness.controller.pending_request().unwrap();

    let result = harness
        .controller
        .on_permission_result(token, &HashSet::new())
        .await;

    match result {
        Err(ViewfinderError::Permission(PermissionError::Denied { missing })) => {
            assert_eq!(missing, vec!["camera".to_string()]);
        }
        other => panic!("expected permission denial, got {:?}", other),
    }
    assert_eq!(harness.controller.state(), CameraSessionState::Failed);

    // A spurious second callback with the same token has no further effect.
    harness
        .controller
        .on_permission_result(token, &granted_camera())
        .await
        .unwrap();
    assert_eq!(harness.controller.state(), CameraSessionState::Failed);
    assert_eq!(provider.bind_count(), 0);
}

#[tokio::test]
async fn test_reentrant_start_while_streaming_is_noop() {
    let provider = CountingProvider::new();
    let mut harness = harness_with_provider(Arc::clone(&provider) as Arc<dyn CameraProvider>);
    harness.backend.grant("camera");
    harness.preview.on_layout_change(0);

    harness.controller.start().await.unwrap();
    harness.controller.start().await.unwrap();

    assert_eq!(harness.controller.state(), CameraSessionState::Streaming);
    assert_eq!(provider.bind_count(), 1);

    harness.controller.stop().await;
}

#[tokio::test]
async fn test_bind_failure_fails_session() {
    let mut harness = harness_with_provider(Arc::new(FailingProvider) as Arc<dyn CameraProvider>);
    harness.backend.grant("camera");
    harness.preview.on_layout_change(0);

    let result = harness.controller.start().await;

    assert!(matches!(
        result,
        Err(ViewfinderError::Camera(CameraError::Bind { .. }))
    ));
    assert_eq!(harness.controller.state(), CameraSessionState::Failed);

    // No automatic retry: a later start does not touch the provider again.
    harness.controller.start().await.unwrap();
    assert_eq!(harness.controller.state(), CameraSessionState::Failed);
}

#[tokio::test]
async fn test_result_with_unknown_token_is_ignored() {
    let provider = CountingProvider::new();
    let mut harness = harness_with_provider(Arc::clone(&provider) as Arc<dyn CameraProvider>);
    harness.preview.on_layout_change(0);

    harness.controller.start().await.unwrap();

    harness
        .controller
        .on_permission_result(crate::permission::RequestToken::new(), &granted_camera())
        .await
        .unwrap();

    assert_eq!(
        harness.controller.state(),
        CameraSessionState::AwaitingPermission
    );
    assert_eq!(provider.bind_count(), 0);
}

#[tokio::test]
async fn test_streaming_session_delivers_analysis_results() {
    let provider = Arc::new(MockCameraProvider::new());
    let mut harness = harness_with_provider(provider as Arc<dyn CameraProvider>);
    harness.backend.grant("camera");
    harness.preview.on_layout_change(0);

    harness.controller.start().await.unwrap();
    assert!(harness.controller.is_streaming());

    harness
        .results
        .changed()
        .await
        .expect("analyzer stays alive while streaming");
    let result = harness.results.borrow_and_update().unwrap();
    assert!(result.value >= 0);

    // The mock provider's first preview frame re-attached the surface.
    assert_eq!(harness.surface.attach_count(), 1);

    harness.controller.stop().await;
}

#[tokio::test]
async fn test_builder_requires_all_parts() {
    let result = CameraSessionController::builder()
        .required_permissions(vec!["camera".to_string()])
        .build();
    assert!(result.is_err());

    let result = CameraSessionController::builder().build();
    assert!(matches!(result, Err(ViewfinderError::System { .. })));
}
