use crate::analyzer::AnalysisResult;
use crate::preview::UiState;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Text sink the latest probe value is rendered to.
pub trait DisplaySink: Send + Sync {
    fn show(&self, text: &str);
}

/// Writes each value to standard output, one line per update.
pub struct StdoutDisplay;

impl DisplaySink for StdoutDisplay {
    fn show(&self, text: &str) {
        println!("{}", text);
    }
}

/// Drain the analyzer's latest-wins channel into the display sink.
///
/// Runs on the UI context and never blocks waiting for a frame: it only wakes
/// when a newer result exists, and always renders the most recent one. Results
/// superseded between wakeups are never observed.
pub async fn run_display(
    mut results: watch::Receiver<Option<AnalysisResult>>,
    sink: Arc<dyn DisplaySink>,
    ui: Arc<UiState>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = results.changed() => {
                if changed.is_err() {
                    // Analyzer dropped; nothing further will arrive.
                    break;
                }
                let latest = *results.borrow_and_update();
                if let Some(result) = latest {
                    ui.set_last_result(result);
                    sink.show(&result.value.to_string());
                }
            }
        }
    }
    debug!("Display task stopped");
}
