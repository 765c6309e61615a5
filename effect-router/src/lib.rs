//! Type-based effect router.
//!
//! An [`EffectRouter`] takes one stream of heterogeneous effects, hands each
//! effect to the handler registered for its type, and merges every
//! handler's events into one [`RoutedEvents`] stream.
//!
//! Each application spawns one Tokio task per branch plus a broadcast pump
//! that offers every effect to every branch, in source order, and queues it
//! for each branch whose registration claims it. A synthetic guard branch
//! claims everything else and fails the stream with
//! [`RouterError::UnknownEffect`]. The first failure from any branch stops
//! the source; the other branches finish relaying what they already
//! received, then the failure ends the merged stream. Dropping the merged
//! stream cancels everything at once.
//!
//! ```no_run
//! use effect_core::{Effect, EffectType};
//! use effect_router::RouterBuilder;
//! use futures::StreamExt;
//!
//! #[derive(Debug, Clone)]
//! enum Cmd {
//!     Save(String),
//!     Beep,
//! }
//!
//! impl Effect for Cmd {
//!     fn effect_type(&self) -> EffectType {
//!         match self {
//!             Cmd::Save(_) => EffectType::new("save"),
//!             Cmd::Beep => EffectType::new("beep"),
//!         }
//!     }
//! }
//!
//! # async fn run() {
//! let router = RouterBuilder::<Cmd, String>::new()
//!     .add_function("save", |cmd| format!("saved {cmd:?}"))
//!     .add_action("beep", || print!("\x07"))
//!     .build();
//!
//! let mut events = router.apply(futures::stream::iter(vec![Cmd::Save("a".into()), Cmd::Beep]));
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event);
//! }
//! # }
//! ```

#![deny(missing_docs)]

mod branch;
mod builder;
pub mod classify;
mod config;
mod fanout;
mod guard;
mod merge;
mod router;

pub use builder::RouterBuilder;
pub use classify::matches;
pub use config::RouterConfig;
pub use merge::RoutedEvents;
pub use router::EffectRouter;

pub use effect_core::{
    BoxError, Effect, EffectStream, EffectType, EffectTypeSet, EventStream, Handler, Registration,
    RouterError,
};
