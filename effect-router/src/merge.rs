//! Fan-in: the merged event stream handed to the consumer.

use crate::branch::Routed;
use effect_core::{Effect, RouterError};
use futures::Stream;
use futures::stream::FusedStream;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// The merged events of one router application.
///
/// Events from one branch arrive in the order that branch produced them.
/// Events from different branches interleave in arrival order. The stream
/// ends once the source and every branch have finished.
///
/// The first [`RouterError`] from any branch is the stream's last item.
/// When it arrives the source is cancelled and every branch input is
/// closed, but branches still relay the events of effects they had already
/// received, so nothing sent before the failing effect is lost. The error
/// is yielded once they have all finished. Any later failure is discarded.
///
/// Dropping the stream, or calling [`RoutedEvents::cancel`], cancels the
/// source and every branch without waiting for them.
pub struct RoutedEvents<F: Effect, E> {
    events: mpsc::Receiver<Routed<F, E>>,
    stop_source: CancellationToken,
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    failure: Option<RouterError<F>>,
    terminated: bool,
}

impl<F: Effect, E> RoutedEvents<F, E> {
    /// `stop_source` must be a child of `cancel`.
    pub(crate) fn new(
        events: mpsc::Receiver<Routed<F, E>>,
        stop_source: CancellationToken,
        cancel: CancellationToken,
        tasks: JoinSet<()>,
    ) -> Self {
        Self {
            events,
            stop_source,
            cancel,
            tasks,
            failure: None,
            terminated: false,
        }
    }

    /// Stop routing. The source and all branches are cancelled, pending
    /// events and any held failure are discarded, and the stream yields
    /// nothing further.
    pub fn cancel(&mut self) {
        if !self.terminated {
            tracing::debug!("routed events cancelled by consumer");
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.terminated = true;
        self.failure = None;
        self.cancel.cancel();
        self.tasks.abort_all();
        self.events.close();
    }
}

impl<F: Effect, E> Stream for RoutedEvents<F, E> {
    type Item = Result<E, RouterError<F>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.events.poll_recv(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(Ok(event))),
                Some(Err(err)) if this.failure.is_some() => {
                    tracing::debug!(error = %err, "discarding failure after the first");
                }
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "routed events failed, draining branches");
                    this.stop_source.cancel();
                    this.failure = Some(err);
                }
                None => {
                    let failure = this.failure.take();
                    tracing::trace!(failed = failure.is_some(), "routed events completed");
                    this.shutdown();
                    return Poll::Ready(failure.map(Err));
                }
            }
        }
    }
}

// Never pin-projected.
impl<F: Effect, E> Unpin for RoutedEvents<F, E> {}

impl<F: Effect, E> FusedStream for RoutedEvents<F, E> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<F: Effect, E> Drop for RoutedEvents<F, E> {
    fn drop(&mut self) {
        // The JoinSet aborts its tasks on drop; the token also stops any
        // branch mid-send before the abort lands.
        self.cancel.cancel();
    }
}

impl<F: Effect, E> fmt::Debug for RoutedEvents<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedEvents")
            .field("running_tasks", &self.tasks.len())
            .field("failed", &self.failure.is_some())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}
