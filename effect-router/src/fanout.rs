//! Broadcast pump: offers every source effect to every branch.

use crate::branch::{Branch, Selector};
use effect_core::Effect;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// The pump's end of one branch input.
pub(crate) struct Outlet<F> {
    branch: Arc<str>,
    selector: Selector,
    stops_source: bool,
    sender: Option<mpsc::UnboundedSender<F>>,
}

impl<F: Effect> Outlet<F> {
    pub(crate) fn new<E: Send + 'static>(
        branch: &Branch<F, E>,
        sender: mpsc::UnboundedSender<F>,
    ) -> Self {
        Self {
            branch: branch.name().into(),
            selector: branch.selector().clone(),
            stops_source: branch.stops_source(),
            sender: Some(sender),
        }
    }

    /// Still attached and keeps this effect.
    fn wants(&self, effect: &F) -> bool {
        self.sender.is_some() && self.selector.accepts(effect)
    }

    fn is_detached(&self) -> bool {
        self.sender.is_none()
    }

    fn send(&mut self, effect: F) {
        let Some(sender) = &self.sender else { return };
        if sender.send(effect).is_err() {
            tracing::trace!(branch = %self.branch, "branch dropped its input, detaching");
            self.sender = None;
        }
    }
}

/// Feed every effect from `effects` to each branch that keeps it, in source
/// order.
///
/// Branch inputs are unbounded, so a handler that stops polling never holds
/// back the source or another branch. The pump stops when the source ends,
/// when `stop` is cancelled, right after feeding a source-stopping branch,
/// or once every branch has dropped its input. Returning drops the source
/// and closes every branch input.
pub(crate) async fn broadcast<F, S>(
    effects: S,
    mut outlets: Vec<Outlet<F>>,
    stop: CancellationToken,
) where
    F: Effect,
    S: Stream<Item = F>,
{
    let mut effects = std::pin::pin!(effects);
    let mut relayed = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::trace!(relayed, "effect source cancelled");
                return;
            }
            next = effects.next() => next,
        };
        let Some(effect) = next else {
            tracing::trace!(relayed, "effect source completed");
            return;
        };
        tracing::trace!(effect_type = %effect.effect_type(), "relaying effect");

        let Some(last) = outlets.iter().rposition(|outlet| outlet.wants(&effect)) else {
            tracing::trace!(effect_type = %effect.effect_type(), "no branch keeps effect");
            continue;
        };
        let mut stopping = false;
        for outlet in outlets[..last].iter_mut() {
            if outlet.wants(&effect) {
                stopping |= outlet.stops_source;
                outlet.send(effect.clone());
            }
        }
        stopping |= outlets[last].stops_source;
        outlets[last].send(effect);
        relayed += 1;

        if stopping {
            tracing::trace!(relayed, "source-stopping branch fed, stopping source");
            return;
        }
        if outlets.iter().all(Outlet::is_detached) {
            tracing::trace!(relayed, "every branch detached, stopping source");
            return;
        }
    }
}
