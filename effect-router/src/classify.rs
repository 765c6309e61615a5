//! Effect classification by type tag.

use effect_core::{Effect, EffectTypeSet};

/// Whether `effect` is an instance of any type in `types`.
///
/// An effect matches a type if it is that type or declares it among its
/// supertypes. Pure, no side effects.
pub fn matches<F: Effect>(effect: &F, types: &EffectTypeSet) -> bool {
    types.contains(&effect.effect_type())
        || effect.supertypes().iter().any(|ty| types.contains(ty))
}
