use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Remembers the last value seen per key and reports only changes
///
/// Keys absent from an observation are forgotten, so a key that comes back
/// later is reported again.
#[derive(Debug, Clone)]
pub struct DiffTracker<K, V> {
    last: HashMap<K, V>,
}

impl<K, V> Default for DiffTracker<K, V> {
    fn default() -> Self {
        Self {
            last: HashMap::new(),
        }
    }
}

impl<K, V> DiffTracker<K, V>
where
    K: Eq + Hash + Clone,
    V: PartialEq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current values and return those that differ from last time
    pub fn observe<I>(&mut self, current: I) -> Vec<(K, V)>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut active = HashSet::new();
        let mut updates = Vec::new();

        for (key, value) in current {
            active.insert(key.clone());
            if self.last.get(&key) != Some(&value) {
                self.last.insert(key.clone(), value.clone());
                updates.push((key, value));
            }
        }

        self.last.retain(|key, _| active.contains(key));
        updates
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.last.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.last.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
