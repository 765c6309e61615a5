//! # effect-core — Protocol types for type-routed effect dispatch
//!
//! This crate defines the vocabulary shared by effect producers, effect
//! handlers, and the router that connects them.
//!
//! | Concept | Type | What it is |
//! |---------|------|-----------|
//! | Effect | [`Effect`] | A request for a side effect, tagged for routing |
//! | Type tag | [`EffectType`], [`EffectTypeSet`] | What a handler claims to handle |
//! | Handler | [`Handler`] | Turns a stream of effects into a stream of events |
//! | Registration | [`Registration`] | A handler paired with its type set |
//! | Failure | [`RouterError`] | Terminal failure of a routed event stream |
//!
//! ## Classification
//!
//! Effects are not classified by reflection. Each effect reports its own
//! [`EffectType`] plus the supertypes it belongs to, so a handler registered
//! for a supertype receives every effect declaring that supertype. Matching
//! is a plain set lookup.
//!
//! ## Handlers are stream transformers
//!
//! A [`Handler`] receives the whole filtered sub-stream for one application
//! of the router, not one effect at a time. That lets a handler batch,
//! debounce, or run effects concurrently without the router knowing. Any
//! `Fn(EffectStream<F>) -> EventStream<E>` closure is a handler.

#![deny(missing_docs)]

pub mod effect;
pub mod error;
pub mod handler;

#[cfg(feature = "test-utils")]
pub mod test_utils;

// Re-exports for convenience
pub use effect::{Effect, EffectType, EffectTypeSet};
pub use error::{BoxError, RouterError};
pub use handler::{EffectStream, EventStream, Handler, Registration};
