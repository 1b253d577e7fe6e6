use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
};

/// Keyed collection of per-run or per-group values, e.g. a run's [`CounterSet`](crate::CounterSet) or the
/// elapsed-time summaries returned by [`grouped_elapsed_summary`](crate::grouped_elapsed_summary).
///
/// Map operations come through [`Deref`]; the newtype exists so the crate can add its own accessors.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Wrapper<T>(pub T);

impl<T> Deref for Wrapper<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Wrapper<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Wrapper<BTreeMap<K, V>> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: Ord + Clone, V> Wrapper<BTreeMap<K, V>> {
    /// Same keys, each value replaced by `f` applied to it.
    pub fn map_values<V1>(&self, mut f: impl FnMut(&V) -> V1) -> Wrapper<BTreeMap<K, V1>> {
        Wrapper(self.iter().map(|(k, v)| (k.clone(), f(v))).collect())
    }
}
