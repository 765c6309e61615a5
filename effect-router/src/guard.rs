//! The unhandled-effect guard.

use crate::branch::{Branch, Selector};
use effect_core::{Effect, EffectTypeSet, RouterError};
use futures::StreamExt;

/// Name the guard branch goes by in logs.
pub(crate) const GUARD_BRANCH: &str = "unhandled";

/// A branch claiming every effect outside `handled` and failing on the
/// first one it sees.
///
/// `handled` must cover every registered type, so an effect any handler
/// accepts never reaches the guard. The guard stops the source: nothing
/// after an unknown effect is broadcast.
pub(crate) fn unhandled<F, E>(handled: EffectTypeSet) -> Branch<F, E>
where
    F: Effect,
    E: Send + 'static,
{
    Branch::<F, E>::new(GUARD_BRANCH, Selector::Except(handled), |effects| {
        effects
            .map(|effect| {
                tracing::error!(
                    effect_type = %effect.effect_type(),
                    ?effect,
                    "no handler registered for effect"
                );
                Err(RouterError::UnknownEffect(effect))
            })
            .boxed()
    })
    .stopping_source()
}
