//! Request log writer.
//!
//! Records are queued to one background task and written in arrival order,
//! so no response waits on a store transaction. When the queue is full the
//! record is dropped with a warning.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, oneshot};

use common::AuditRecord;
use storage::FeatureStore;

/// Records buffered ahead of the writer
const QUEUE_DEPTH: usize = 1024;

enum AuditMessage {
    Record(AuditRecord),
    Flush(oneshot::Sender<()>),
}

pub struct AuditLog {
    sender: mpsc::Sender<AuditMessage>,
}

impl AuditLog {
    /// Start the writer task. Must be called inside a Tokio runtime.
    ///
    /// The writer holds the store weakly: once the owning state is dropped,
    /// the store closes without waiting for the task to notice.
    pub fn spawn(store: &Arc<dyn FeatureStore>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(write_loop(Arc::downgrade(store), receiver));
        Self { sender }
    }

    /// Queue a record without waiting for it to be written.
    pub fn record(&self, record: AuditRecord) {
        if let Err(e) = self.sender.try_send(AuditMessage::Record(record)) {
            tracing::warn!(error = %e, "Request log queue unavailable, record dropped");
        }
    }

    /// Wait until every record queued before this call has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(AuditMessage::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }
}

async fn write_loop(store: Weak<dyn FeatureStore>, mut receiver: mpsc::Receiver<AuditMessage>) {
    while let Some(message) = receiver.recv().await {
        match message {
            AuditMessage::Record(record) => {
                let Some(store) = store.upgrade() else {
                    break;
                };
                match tokio::task::spawn_blocking(move || store.log(&record)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Failed to write request log record"),
                    Err(e) => tracing::warn!(error = %e, "Request log write task failed"),
                }
            }
            AuditMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Request log writer stopped");
}
