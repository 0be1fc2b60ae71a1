use alloc::{collections::BTreeMap, format};
use core::fmt::Debug;

use crate::protocols::LocalError;

pub(crate) trait MapValues<K, V> {
    fn map_values_ref<F, T>(&self, f: F) -> BTreeMap<K, T>
    where
        K: Clone,
        F: Fn(&V) -> T;
}

impl<K: Ord, V> MapValues<K, V> for BTreeMap<K, V> {
    fn map_values_ref<F, T>(&self, f: F) -> BTreeMap<K, T>
    where
        K: Clone,
        F: Fn(&V) -> T,
    {
        self.iter().map(|(key, value)| (key.clone(), f(value))).collect()
    }
}

pub(crate) trait SafeGet<K, V> {
    fn safe_get(&self, container: &str, key: &K) -> Result<&V, LocalError>;
}

impl<K: Ord + Debug, V> SafeGet<K, V> for BTreeMap<K, V> {
    fn safe_get(&self, container: &str, key: &K) -> Result<&V, LocalError> {
        self.get(key)
            .ok_or_else(|| LocalError::new(format!("Key {key:?} not found in {container}")))
    }
}
