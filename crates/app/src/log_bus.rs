//! In-process terminal log backed by a tokio broadcast channel.

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::{Stream, StreamExt as _};

use plotter_domain::command_record::CommandRecord;

/// Terminal log bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the record is simply dropped). Cloning shares the same channel.
#[derive(Clone)]
pub struct LogBus {
    sender: broadcast::Sender<CommandRecord>,
}

impl LogBus {
    /// Create a new log bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Append a record for every current subscriber.
    pub fn publish(&self, record: CommandRecord) {
        tracing::trace!(direction = ?record.direction, text = %record.text, "terminal log");
        // broadcast::send fails only when there are zero receivers,
        // so the error is ignored.
        let _ = self.sender.send(record);
    }

    /// Subscribe to records on this bus.
    ///
    /// Returns a receiver that will get all records published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommandRecord> {
        self.sender.subscribe()
    }

    /// Subscribe as a stream. Records lost because the consumer lagged
    /// behind are skipped with a warning.
    pub fn stream(&self) -> impl Stream<Item = CommandRecord> + Send + use<> {
        BroadcastStream::new(self.subscribe()).filter_map(|result| match result {
            Ok(record) => Some(record),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "terminal log subscriber lagged, records were dropped");
                None
            }
        })
    }
}
