//! The effect router: an immutable configuration snapshot plus `apply`.

use crate::branch::Branch;
use crate::config::RouterConfig;
use crate::fanout::{self, Outlet};
use crate::guard;
use crate::merge::RoutedEvents;
use effect_core::{
    BoxError, Effect, EffectStream, EffectTypeSet, EventStream, Handler, Registration,
};
use futures::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Routes each effect to the handler registered for its type and merges
/// the handlers' events.
///
/// Built once from a fixed set of registrations, then applied to any
/// number of effect streams. Applications are independent of each other.
/// Cloning is cheap and clones share the same configuration.
pub struct EffectRouter<F: Effect, E> {
    branches: Arc<[Branch<F, E>]>,
    handled: EffectTypeSet,
    config: RouterConfig,
}

impl<F, E> EffectRouter<F, E>
where
    F: Effect,
    E: Send + 'static,
{
    /// Create a router from the set of handled types and the registrations
    /// that handle them.
    ///
    /// Effects outside `handled` and outside every registration fail the
    /// routed stream with [`RouterError::UnknownEffect`](effect_core::RouterError::UnknownEffect).
    /// Registrations are copied; nothing done to the inputs afterwards
    /// changes the router.
    ///
    /// Overlapping registrations are allowed, and an effect matching both
    /// reaches both handlers. Overlaps, declared types with no registration,
    /// and registered types missing from `handled` are logged as warnings.
    pub fn new(
        handled: impl Into<EffectTypeSet>,
        registrations: impl IntoIterator<Item = Registration<F, E>>,
    ) -> Self {
        let declared = handled.into();
        let registrations: Vec<Registration<F, E>> = registrations.into_iter().collect();
        audit(&declared, &registrations);

        // The guard must exclude everything any branch accepts.
        let handled = registrations
            .iter()
            .fold(declared, |handled, registration| {
                handled.union(registration.types())
            });

        let mut branches: Vec<Branch<F, E>> =
            registrations.iter().map(Branch::registered).collect();
        branches.push(guard::unhandled(handled.clone()));

        tracing::debug!(
            registrations = registrations.len(),
            %handled,
            "effect router configured"
        );

        Self {
            branches: branches.into(),
            handled,
            config: RouterConfig::default(),
        }
    }

    /// Replace the channel configuration.
    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// The channel configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Every type some registration claims. Anything else reaches the guard.
    pub fn handled_types(&self) -> &EffectTypeSet {
        &self.handled
    }

    /// Route `effects` and return the merged events.
    ///
    /// Spawns one task per branch plus the broadcast pump. They all stop
    /// when the returned stream ends, fails, or is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn apply<S>(&self, effects: S) -> RoutedEvents<F, E>
    where
        S: Stream<Item = F> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let stop_source = cancel.child_token();
        let (events_tx, events_rx) = mpsc::channel(self.config.output_channel_capacity());
        let mut tasks = JoinSet::new();
        let mut outlets = Vec::with_capacity(self.branches.len());

        for branch in self.branches.iter() {
            let (input_tx, input_rx) = mpsc::unbounded_channel();
            outlets.push(Outlet::new(branch, input_tx));
            tracing::trace!(branch = branch.name(), "starting branch");
            tasks.spawn(
                branch
                    .clone()
                    .drive(input_rx, events_tx.clone(), cancel.clone()),
            );
        }
        // Branches hold the only senders, so the merged stream ends once
        // they have all finished.
        drop(events_tx);

        tasks.spawn(fanout::broadcast(effects, outlets, stop_source.clone()));
        tracing::debug!(branches = self.branches.len(), "effect router applied");

        RoutedEvents::new(events_rx, stop_source, cancel, tasks)
    }
}

/// A router is itself a handler, so routers nest. Failures of the inner
/// router reach the outer one as boxed handler errors.
impl<F, E> Handler<F, E> for EffectRouter<F, E>
where
    F: Effect,
    E: Send + 'static,
{
    fn handle(&self, effects: EffectStream<F>) -> EventStream<E> {
        self.apply(effects)
            .map(|event| event.map_err(|err| Box::new(err) as BoxError))
            .boxed()
    }
}

impl<F: Effect, E> Clone for EffectRouter<F, E> {
    fn clone(&self) -> Self {
        Self {
            branches: Arc::clone(&self.branches),
            handled: self.handled.clone(),
            config: self.config.clone(),
        }
    }
}

impl<F: Effect, E> fmt::Debug for EffectRouter<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRouter")
            .field("branches", &self.branches.len())
            .field("handled", &self.handled)
            .field("config", &self.config)
            .finish()
    }
}

/// Log configuration hazards. None of them are rejected.
fn audit<F, E>(declared: &EffectTypeSet, registrations: &[Registration<F, E>]) {
    for (i, first) in registrations.iter().enumerate() {
        for second in &registrations[i + 1..] {
            let shared = first.types().intersection(second.types());
            if !shared.is_empty() {
                tracing::warn!(
                    first = first.name(),
                    second = second.name(),
                    types = %shared,
                    "registrations overlap, matching effects reach both handlers"
                );
            }
        }
    }

    let registered = registrations
        .iter()
        .fold(EffectTypeSet::new(), |registered, registration| {
            registered.union(registration.types())
        });

    let orphaned = declared.difference(&registered);
    if !orphaned.is_empty() {
        tracing::warn!(
            types = %orphaned,
            "handled types have no registration, their effects are dropped"
        );
    }

    let undeclared = registered.difference(declared);
    if !declared.is_empty() && !undeclared.is_empty() {
        tracing::warn!(
            types = %undeclared,
            "registered types missing from the handled set"
        );
    }
}
