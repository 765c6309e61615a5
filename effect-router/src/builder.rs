//! Builder for routers with per-effect handler shorthands.

use crate::config::RouterConfig;
use crate::router::EffectRouter;
use effect_core::{
    BoxError, Effect, EffectStream, EffectTypeSet, EventStream, Handler, Registration,
};
use futures::StreamExt;
use std::sync::Arc;

/// Collects registrations and builds an [`EffectRouter`].
///
/// The router's handled set is the union of every registration's types, so
/// the only way to reach the unhandled-effect guard is to send an effect no
/// registration claims.
///
/// Beyond [`add_handler`](Self::add_handler), which takes a full stream
/// transformer, the shorthands cover the common per-effect cases:
///
/// | Method | Per effect | Events |
/// |--------|-----------|--------|
/// | [`add_function`](Self::add_function) | `Fn(F) -> E` | one |
/// | [`add_try_function`](Self::add_try_function) | `Fn(F) -> Result<E, BoxError>` | one, or a failure |
/// | [`add_consumer`](Self::add_consumer) | `Fn(F)` | none |
/// | [`add_action`](Self::add_action) | `Fn()` | none |
pub struct RouterBuilder<F: Effect, E> {
    registrations: Vec<Registration<F, E>>,
    config: RouterConfig,
}

impl<F, E> RouterBuilder<F, E>
where
    F: Effect,
    E: Send + 'static,
{
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            config: RouterConfig::default(),
        }
    }

    /// Register a stream-transforming handler for `types`.
    pub fn add_handler(
        &mut self,
        types: impl Into<EffectTypeSet>,
        handler: impl Handler<F, E> + 'static,
    ) -> &mut Self {
        self.add_registration(Registration::new(types, handler))
    }

    /// Add a prepared registration.
    pub fn add_registration(&mut self, registration: Registration<F, E>) -> &mut Self {
        self.registrations.push(registration);
        self
    }

    /// Map each effect of `types` to one event.
    pub fn add_function(
        &mut self,
        types: impl Into<EffectTypeSet>,
        function: impl Fn(F) -> E + Send + Sync + 'static,
    ) -> &mut Self {
        self.add_try_function(types, move |effect| Ok(function(effect)))
    }

    /// Map each effect of `types` to one event, or fail the routed stream.
    pub fn add_try_function(
        &mut self,
        types: impl Into<EffectTypeSet>,
        function: impl Fn(F) -> Result<E, BoxError> + Send + Sync + 'static,
    ) -> &mut Self {
        let function = Arc::new(function);
        self.add_handler(
            types,
            move |effects: EffectStream<F>| -> EventStream<E> {
                let function = Arc::clone(&function);
                effects.map(move |effect| function(effect)).boxed()
            },
        )
    }

    /// Run `consumer` for each effect of `types`. Produces no events.
    pub fn add_consumer(
        &mut self,
        types: impl Into<EffectTypeSet>,
        consumer: impl Fn(F) + Send + Sync + 'static,
    ) -> &mut Self {
        let consumer = Arc::new(consumer);
        self.add_handler(
            types,
            move |effects: EffectStream<F>| -> EventStream<E> {
                let consumer = Arc::clone(&consumer);
                effects
                    .filter_map(move |effect| {
                        consumer(effect);
                        futures::future::ready(None::<Result<E, BoxError>>)
                    })
                    .boxed()
            },
        )
    }

    /// Run `action` for each effect of `types`, ignoring the effect's value.
    /// Produces no events.
    pub fn add_action(
        &mut self,
        types: impl Into<EffectTypeSet>,
        action: impl Fn() + Send + Sync + 'static,
    ) -> &mut Self {
        self.add_consumer(types, move |_| action())
    }

    /// Set the channel configuration of the built router.
    pub fn config(&mut self, config: RouterConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Build a router from a snapshot of the current registrations.
    pub fn build(&self) -> EffectRouter<F, E> {
        let handled = self
            .registrations
            .iter()
            .fold(EffectTypeSet::new(), |handled, registration| {
                handled.union(registration.types())
            });
        EffectRouter::new(handled, self.registrations.clone()).with_config(self.config.clone())
    }
}

impl<F, E> Default for RouterBuilder<F, E>
where
    F: Effect,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
