//! Utils for merging things

/// Trait for merging a new layer of config
pub trait ApplyLayer
where
    Self: Sized,
{
    /// The much more Option-ridden version of this config
    /// that can be repeatedly layered with options
    type Layer;

    /// Merges this value with another layer of itself, preferring the new layer
    fn apply_layer(&mut self, layer: Self::Layer);
}

/// Extension trait to provide apply_opt
pub trait ApplyOptExt
where
    Self: Sized,
{
    /// Merges an `Option<T>` with an `Option<T>`
    ///
    /// Overwrites the lhs if the rhs is Some
    fn apply_opt(&mut self, layer: Self);
}
impl<T> ApplyOptExt for Option<T> {
    fn apply_opt(&mut self, layer: Self) {
        if let Some(val) = layer {
            *self = Some(val);
        }
    }
}

/// Values where "empty" means "I didn't set this"
///
/// A config that writes `env: {}` or `name: ""` gets the same
/// treatment as one that leaves the key out entirely.
pub trait NonEmptyExt
where
    Self: Sized,
{
    /// `None` if the value is empty
    fn non_empty(self) -> Option<Self>;
}

impl NonEmptyExt for String {
    fn non_empty(self) -> Option<Self> {
        (!self.trim().is_empty()).then_some(self)
    }
}

impl NonEmptyExt for camino::Utf8PathBuf {
    fn non_empty(self) -> Option<Self> {
        (!self.as_str().trim().is_empty()).then_some(self)
    }
}

impl<T> NonEmptyExt for Vec<T> {
    fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl<K, V> NonEmptyExt for std::collections::BTreeMap<K, V> {
    fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}
