use tracing::debug;

use crate::{
    driver::Connection,
    exchange::Synchronization,
    exec::{
        iter::{IteratorCloser, RowIterator},
        janitor::Janitor,
    },
};

/// Releases the resources of a streamed result once its exchange is done.
///
/// It is the only owner of the connection the stream was read from. Whether
/// the exchange completes or fails, the iterator is closed first (a no-op if
/// it was already exhausted), then the connection.
pub struct CompletionBinding {
    iter: IteratorCloser,
    connection: Janitor,
}

impl CompletionBinding {
    /// Binds the cleanup of the given iterator and connection.
    pub fn new(iter: &RowIterator, connection: Box<dyn Connection>) -> CompletionBinding {
        CompletionBinding {
            iter: iter.closer(),
            connection: Janitor::with_connection(connection),
        }
    }

    fn release(mut self, outcome: &'static str) {
        debug!(outcome, "releasing streamed result");
        self.iter.close();
        self.connection.close_connection();
    }
}

impl Synchronization for CompletionBinding {
    fn on_complete(self: Box<Self>) {
        (*self).release("complete");
    }

    fn on_failure(self: Box<Self>) {
        (*self).release("failure");
    }
}
