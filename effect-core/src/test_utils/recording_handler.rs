//! RecordingHandler — maps every effect to one event and remembers what it saw.

use super::DropProbe;
use crate::error::BoxError;
use crate::handler::{EffectStream, EventStream, Handler};
use futures::StreamExt;
use std::sync::{Arc, Mutex};

/// A handler that emits `map(effect)` for each effect it receives.
///
/// Records every effect for inspection with `.seen()`, and exposes a
/// [`DropProbe`] that fires when its event stream is dropped. With
/// [`RecordingHandler::stall_after`] it stops making progress after a
/// number of events, standing in for a handler with work in flight.
///
/// Clones share the recorded effects and the probe, so keep one clone for
/// assertions and register the other.
pub struct RecordingHandler<F, E> {
    map: Arc<dyn Fn(F) -> E + Send + Sync>,
    seen: Arc<Mutex<Vec<F>>>,
    probe: DropProbe,
    stall_after: Option<usize>,
}

impl<F: Clone, E> RecordingHandler<F, E> {
    /// Create a handler that maps each effect through `map`.
    pub fn new(map: impl Fn(F) -> E + Send + Sync + 'static) -> Self {
        Self {
            map: Arc::new(map),
            seen: Arc::new(Mutex::new(Vec::new())),
            probe: DropProbe::new(),
            stall_after: None,
        }
    }

    /// Hang forever after emitting `events` events.
    pub fn stall_after(mut self, events: usize) -> Self {
        self.stall_after = Some(events);
        self
    }

    /// Return a snapshot of every effect received so far.
    pub fn seen(&self) -> Vec<F> {
        self.seen.lock().unwrap().clone()
    }

    /// The probe that fires when an event stream from this handler is dropped.
    pub fn probe(&self) -> &DropProbe {
        &self.probe
    }
}

impl<F, E> Clone for RecordingHandler<F, E> {
    fn clone(&self) -> Self {
        Self {
            map: Arc::clone(&self.map),
            seen: Arc::clone(&self.seen),
            probe: self.probe.clone(),
            stall_after: self.stall_after,
        }
    }
}

impl<F, E> Handler<F, E> for RecordingHandler<F, E>
where
    F: Clone + Send + 'static,
    E: Send + 'static,
{
    fn handle(&self, effects: EffectStream<F>) -> EventStream<E> {
        let map = Arc::clone(&self.map);
        let seen = Arc::clone(&self.seen);
        let guard = self.probe.guard();
        let stall_after = self.stall_after;

        Box::pin(async_stream::stream! {
            let _guard = guard;
            let mut effects = effects;
            let mut produced = 0;
            while let Some(effect) = effects.next().await {
                seen.lock().unwrap().push(effect.clone());
                yield Ok::<E, BoxError>(map(effect));
                produced += 1;
                if stall_after == Some(produced) {
                    futures::future::pending::<()>().await;
                }
            }
        })
    }
}
