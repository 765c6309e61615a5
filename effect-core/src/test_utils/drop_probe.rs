//! DropProbe — observes when a handler stream or effect source is dropped.

use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;

/// Counts how many [`DropGuard`]s handed out by this probe have been dropped.
///
/// Place a guard inside a stream and the probe tells you when the stream
/// was dropped, whether it finished or was cancelled. Clones share the
/// same count.
#[derive(Clone)]
pub struct DropProbe {
    dropped: Arc<watch::Sender<usize>>,
}

impl DropProbe {
    /// Create a probe with nothing dropped yet.
    pub fn new() -> Self {
        let (dropped, _) = watch::channel(0);
        Self {
            dropped: Arc::new(dropped),
        }
    }

    /// Hand out a guard that bumps the count when dropped.
    pub fn guard(&self) -> DropGuard {
        DropGuard {
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Number of guards dropped so far.
    pub fn dropped(&self) -> usize {
        *self.dropped.borrow()
    }

    /// Whether any guard has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.dropped() > 0
    }

    /// Wait until at least one guard has been dropped.
    pub async fn wait_dropped(&self) {
        let mut rx = self.dropped.subscribe();
        // The sender lives as long as `self`, so this only returns once the
        // count moves.
        let _ = rx.wait_for(|count| *count > 0).await;
    }
}

impl Default for DropProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Bumps its [`DropProbe`]'s count when dropped.
pub struct DropGuard {
    dropped: Arc<watch::Sender<usize>>,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.dropped.send_modify(|count| *count += 1);
    }
}

/// Wrap `stream` so that `probe` observes when it is dropped.
///
/// The wrapper holds its own guard, not the borrow of `probe`, so it is
/// `'static` whenever `stream` is.
pub fn probed<S>(stream: S, probe: &DropProbe) -> impl Stream<Item = S::Item> + use<S>
where
    S: Stream,
{
    let guard = probe.guard();
    async_stream::stream! {
        let _guard = guard;
        let mut stream = std::pin::pin!(stream);
        while let Some(item) = stream.next().await {
            yield item;
        }
    }
}
