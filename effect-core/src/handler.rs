//! Handlers and their registrations.

use crate::effect::EffectTypeSet;
use crate::error::BoxError;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

/// The stream of effects a handler receives.
pub type EffectStream<F> = BoxStream<'static, F>;

/// The stream of events a handler produces. An `Err` item ends the
/// routed stream.
pub type EventStream<E> = BoxStream<'static, Result<E, BoxError>>;

/// Turns a stream of effects into a stream of events.
///
/// `handle` is called once per router application with only the effects
/// the handler's registration accepts, in source order. When the input
/// ends the handler should finish what it has in flight and end its own
/// stream; a failure elsewhere in the router ends every handler's input
/// early. The returned stream is dropped when the routed stream is
/// cancelled, so any work a handler spawns should be tied to the stream's
/// lifetime.
///
/// Implemented for every `Fn(EffectStream<F>) -> EventStream<E>`:
///
/// ```
/// use effect_core::{EffectStream, EventStream, Handler};
/// use futures::StreamExt;
///
/// fn lengths() -> impl Handler<String, usize> {
///     |effects: EffectStream<String>| -> EventStream<usize> {
///         effects.map(|s| Ok(s.len())).boxed()
///     }
/// }
/// ```
pub trait Handler<F, E>: Send + Sync {
    /// Transform the accepted effects into events.
    fn handle(&self, effects: EffectStream<F>) -> EventStream<E>;
}

impl<F, E, T> Handler<F, E> for T
where
    T: Fn(EffectStream<F>) -> EventStream<E> + Send + Sync,
{
    fn handle(&self, effects: EffectStream<F>) -> EventStream<E> {
        self(effects)
    }
}

/// A handler paired with the effect types it is responsible for.
///
/// Registration order carries no priority. Type sets across registrations
/// are expected not to overlap; when they do, an effect reaches every
/// matching handler.
pub struct Registration<F, E> {
    name: String,
    types: EffectTypeSet,
    handler: Arc<dyn Handler<F, E>>,
}

impl<F, E> Registration<F, E> {
    /// Register `handler` for `types`. The registration is named after its
    /// types until [`Registration::named`] says otherwise.
    pub fn new(types: impl Into<EffectTypeSet>, handler: impl Handler<F, E> + 'static) -> Self {
        Self::from_arc(types, Arc::new(handler))
    }

    /// Register a handler that is already shared.
    pub fn from_arc(types: impl Into<EffectTypeSet>, handler: Arc<dyn Handler<F, E>>) -> Self {
        let types = types.into();
        let name = types
            .iter()
            .map(|ty| ty.as_str())
            .collect::<Vec<_>>()
            .join("|");
        Self {
            name,
            types,
            handler,
        }
    }

    /// Set the name used for this registration's branch in logs and errors.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The registration's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The effect types this registration accepts.
    pub fn types(&self) -> &EffectTypeSet {
        &self.types
    }

    /// The registered handler.
    pub fn handler(&self) -> &Arc<dyn Handler<F, E>> {
        &self.handler
    }
}

impl<F, E> Clone for Registration<F, E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            types: self.types.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<F, E> fmt::Debug for Registration<F, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}
