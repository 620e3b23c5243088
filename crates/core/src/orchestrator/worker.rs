//! Background batch execution.
//!
//! A batch runs on its own tokio task so the caller stays responsive; events
//! stream over a bounded channel and the results come back through the handle.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;
use uuid::Uuid;

use crate::cancel::CancelFlag;
use crate::converter::Converter;

use super::runner::ConversionOrchestrator;
use super::types::{BatchEvent, BatchRequest, ConversionResult};

/// Spawns batches onto the tokio runtime.
pub struct BatchWorker;

impl BatchWorker {
    /// Starts `request` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<C: Converter + 'static>(
        orchestrator: Arc<ConversionOrchestrator<C>>,
        request: BatchRequest,
    ) -> BatchHandle {
        let batch_id = Uuid::new_v4().to_string();
        let cancel = CancelFlag::new();
        let (tx, rx) = mpsc::channel(orchestrator.config().event_buffer.max(1));

        info!(
            batch_id = %batch_id,
            files = request.inputs.len(),
            "Spawning batch worker"
        );

        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            orchestrator
                .batch_convert_with_events(&request, &task_cancel, tx)
                .await
        });

        BatchHandle {
            batch_id,
            events: rx,
            cancel,
            join,
        }
    }
}

/// Handle to a running batch.
pub struct BatchHandle {
    /// Identifier of the spawned batch.
    pub batch_id: String,
    /// Lifecycle and progress events. Closes when the batch finishes.
    pub events: mpsc::Receiver<BatchEvent>,
    cancel: CancelFlag,
    join: JoinHandle<Vec<ConversionResult>>,
}

impl BatchHandle {
    /// Requests cancellation; the running encode is stopped and remaining files are skipped.
    pub fn cancel(&self) {
        info!(batch_id = %self.batch_id, "Cancelling batch");
        self.cancel.cancel();
    }

    /// A flag that cancels this batch when set, e.g. from a signal handler.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Whether the background task has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the batch and returns one result per input.
    ///
    /// Events not yet received are discarded.
    pub async fn wait(self) -> Result<Vec<ConversionResult>, JoinError> {
        let BatchHandle { events, join, .. } = self;
        // Dropping the receiver keeps a full channel from stalling the batch
        drop(events);
        join.await
    }
}
