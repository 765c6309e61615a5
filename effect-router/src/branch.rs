//! Handler branches: run the transform over the effects the pump routed
//! here and relay the events into the merge channel.

use crate::classify::matches;
use effect_core::{Effect, EffectStream, EffectTypeSet, Registration, RouterError};
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One item of a branch's output.
pub(crate) type Routed<F, E> = Result<E, RouterError<F>>;

type Transform<F, E> =
    Arc<dyn Fn(EffectStream<F>) -> BoxStream<'static, Routed<F, E>> + Send + Sync>;

/// Which effects a branch keeps.
#[derive(Debug, Clone)]
pub(crate) enum Selector {
    /// Effects that are instances of any of these types.
    Only(EffectTypeSet),
    /// Effects that are instances of none of these types.
    Except(EffectTypeSet),
}

impl Selector {
    pub(crate) fn accepts<F: Effect>(&self, effect: &F) -> bool {
        match self {
            Selector::Only(types) => matches(effect, types),
            Selector::Except(types) => !matches(effect, types),
        }
    }
}

/// A selector plus the transform applied to whatever it keeps.
pub(crate) struct Branch<F: Effect, E> {
    name: Arc<str>,
    selector: Selector,
    transform: Transform<F, E>,
    stops_source: bool,
}

impl<F: Effect, E> Clone for Branch<F, E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            selector: self.selector.clone(),
            transform: Arc::clone(&self.transform),
            stops_source: self.stops_source,
        }
    }
}

impl<F, E> Branch<F, E>
where
    F: Effect,
    E: Send + 'static,
{
    pub(crate) fn new(
        name: impl Into<Arc<str>>,
        selector: Selector,
        transform: impl Fn(EffectStream<F>) -> BoxStream<'static, Routed<F, E>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            selector,
            transform: Arc::new(transform),
            stops_source: false,
        }
    }

    /// Mark this branch as terminal for the broadcast: once it has been fed
    /// an effect, the pump pulls nothing more from the source.
    pub(crate) fn stopping_source(mut self) -> Self {
        self.stops_source = true;
        self
    }

    /// The branch for a registered handler. Handler errors pass through
    /// unchanged as [`RouterError::Handler`].
    pub(crate) fn registered(registration: &Registration<F, E>) -> Self {
        let handler = Arc::clone(registration.handler());
        Self::new(
            registration.name(),
            Selector::Only(registration.types().clone()),
            move |effects| {
                handler
                    .handle(effects)
                    .map(|event| event.map_err(RouterError::Handler))
                    .boxed()
            },
        )
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn selector(&self) -> &Selector {
        &self.selector
    }

    pub(crate) fn stops_source(&self) -> bool {
        self.stops_source
    }

    /// Run the branch to completion, reporting a handler panic as the
    /// branch's final item.
    pub(crate) async fn drive(
        self,
        input: mpsc::UnboundedReceiver<F>,
        output: mpsc::Sender<Routed<F, E>>,
        cancel: CancellationToken,
    ) {
        let name = Arc::clone(&self.name);
        let relay = AssertUnwindSafe(self.relay(input, output.clone(), cancel.clone()));
        if let Err(panic) = relay.catch_unwind().await {
            let message = panic_message(&*panic);
            tracing::error!(branch = %name, %message, "branch handler panicked");
            let failure = Err(RouterError::Panicked {
                branch: name.to_string(),
                message,
            });
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = output.send(failure) => {}
            }
        }
    }

    async fn relay(
        self,
        mut input: mpsc::UnboundedReceiver<F>,
        output: mpsc::Sender<Routed<F, E>>,
        cancel: CancellationToken,
    ) {
        // The pump only forwards what the selector accepts.
        let accepted = async_stream::stream! {
            while let Some(effect) = input.recv().await {
                yield effect;
            }
        };
        let mut events = (self.transform)(accepted.boxed());

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::trace!(branch = %self.name, "branch cancelled");
                    return;
                }
                next = events.next() => next,
            };
            let Some(item) = next else {
                tracing::trace!(branch = %self.name, "branch completed");
                return;
            };

            let failed = item.is_err();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                sent = output.send(item) => {
                    if sent.is_err() {
                        // Merged stream is gone.
                        return;
                    }
                }
            }
            if failed {
                tracing::debug!(branch = %self.name, "branch failed");
                return;
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
