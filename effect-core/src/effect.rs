//! Effects and the type tags used to route them.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Runtime type descriptor of an effect.
///
/// Just a name underneath. Two tags are the same type iff their names are
/// equal, so pick names that are unique across the effect hierarchy
/// (`"playback.play"` rather than `"play"`).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EffectType(Cow<'static, str>);

impl EffectType {
    /// Create a tag from a static name. Usable in `const` items.
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a tag from a name built at runtime.
    pub fn named(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Borrow the tag name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EffectType {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EffectType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// A value requesting a side effect.
///
/// Effects are immutable values that the router clones once per branch, so
/// they should be cheap to clone (wrap large payloads in `Arc`).
///
/// ```
/// use effect_core::{Effect, EffectType};
///
/// const MEDIA: EffectType = EffectType::new("media");
/// const PLAYBACK_SUPERTYPES: &[EffectType] = &[MEDIA];
///
/// #[derive(Debug, Clone)]
/// enum Playback {
///     Play(String),
///     Pause,
/// }
///
/// impl Effect for Playback {
///     fn effect_type(&self) -> EffectType {
///         match self {
///             Playback::Play(_) => EffectType::new("media.play"),
///             Playback::Pause => EffectType::new("media.pause"),
///         }
///     }
///
///     fn supertypes(&self) -> &[EffectType] {
///         PLAYBACK_SUPERTYPES
///     }
/// }
///
/// assert!(Playback::Pause.is_instance_of(&MEDIA));
/// ```
pub trait Effect: Clone + fmt::Debug + Send + Sync + 'static {
    /// The concrete type of this effect.
    fn effect_type(&self) -> EffectType;

    /// Every supertype this effect belongs to, in any order.
    ///
    /// Include transitive ancestors: the router does not walk a hierarchy,
    /// it only looks at this list.
    fn supertypes(&self) -> &[EffectType] {
        &[]
    }

    /// True if this effect's type is `ty` or one of its supertypes is.
    fn is_instance_of(&self, ty: &EffectType) -> bool {
        self.effect_type() == *ty || self.supertypes().contains(ty)
    }
}

/// A set of effect types. Unique, order-irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectTypeSet(BTreeSet<EffectType>);

impl EffectTypeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Add a type. Returns false if it was already present.
    pub fn insert(&mut self, ty: impl Into<EffectType>) -> bool {
        self.0.insert(ty.into())
    }

    /// Whether `ty` is in the set. Exact tag comparison, no subtyping.
    pub fn contains(&self, ty: &EffectType) -> bool {
        self.0.contains(ty)
    }

    /// Number of types in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectType> {
        self.0.iter()
    }

    /// The union of this set and `other`.
    pub fn union(&self, other: &EffectTypeSet) -> EffectTypeSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Types present in both sets.
    pub fn intersection(&self, other: &EffectTypeSet) -> EffectTypeSet {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Types in this set that are not in `other`.
    pub fn difference(&self, other: &EffectTypeSet) -> EffectTypeSet {
        Self(self.0.difference(&other.0).cloned().collect())
    }
}

impl fmt::Display for EffectTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(ty.as_str())?;
        }
        f.write_str("}")
    }
}

impl<T: Into<EffectType>> FromIterator<T> for EffectTypeSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<EffectType>> Extend<T> for EffectTypeSet {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl From<EffectType> for EffectTypeSet {
    fn from(ty: EffectType) -> Self {
        Self(BTreeSet::from([ty]))
    }
}

impl From<&'static str> for EffectTypeSet {
    fn from(name: &'static str) -> Self {
        EffectType::new(name).into()
    }
}

impl<T: Into<EffectType>, const N: usize> From<[T; N]> for EffectTypeSet {
    fn from(types: [T; N]) -> Self {
        types.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a EffectTypeSet {
    type Item = &'a EffectType;
    type IntoIter = std::collections::btree_set::Iter<'a, EffectType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
