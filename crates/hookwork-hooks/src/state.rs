use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;

use hookwork_core::Signal;

use crate::remember_signal;

#[derive(Clone)]
pub struct BooleanState {
    value: Signal<bool>,
}

impl BooleanState {
    pub fn value(&self) -> bool {
        self.value.get()
    }

    pub fn set(&self, v: bool) {
        self.value.set(v);
    }

    pub fn set_true(&self) {
        self.set(true);
    }

    pub fn set_false(&self) {
        self.set(false);
    }

    pub fn toggle(&self) {
        self.value.update(|v| *v = !*v);
    }
}

pub fn use_boolean(initial: bool) -> BooleanState {
    BooleanState {
        value: remember_signal(|| initial),
    }
}

/// Current value plus a function flipping it.
pub fn use_toggle(initial: bool) -> (bool, Rc<dyn Fn()>) {
    let state = use_boolean(initial);
    let value = state.value();
    (value, Rc::new(move || state.toggle()))
}

/// Copy-on-write map: every write publishes a fresh snapshot, so snapshots
/// handed out earlier never change underneath their holders.
pub struct MapState<K: 'static, V: 'static> {
    map: Signal<Rc<HashMap<K, V>>>,
}

impl<K, V> Clone for MapState<K, V> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> MapState<K, V> {
    pub fn snapshot(&self) -> Rc<HashMap<K, V>> {
        self.map.get()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.map.with(|m| m.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.map.with(|m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.write(|m| m.insert(key, value))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.write(|m| m.remove(key))
    }

    pub fn clear(&self) {
        self.write(|m| m.clear());
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        let mut next = self.map.with(|m| HashMap::clone(m));
        let out = f(&mut next);
        self.map.set(Rc::new(next));
        out
    }
}

pub fn use_map<K, V>(initial: impl IntoIterator<Item = (K, V)>) -> MapState<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    MapState {
        map: remember_signal(|| Rc::new(initial.into_iter().collect())),
    }
}

/// Copy-on-write set, see [`MapState`].
pub struct SetState<T: 'static> {
    set: Signal<Rc<HashSet<T>>>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
        }
    }
}

impl<T: Eq + Hash + Clone> SetState<T> {
    pub fn snapshot(&self) -> Rc<HashSet<T>> {
        self.set.get()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.set.with(|s| s.contains(value))
    }

    pub fn len(&self) -> usize {
        self.set.with(|s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&self, value: T) -> bool {
        self.write(|s| s.insert(value))
    }

    pub fn remove(&self, value: &T) -> bool {
        self.write(|s| s.remove(value))
    }

    pub fn clear(&self) {
        self.write(|s| s.clear());
    }

    fn write<R>(&self, f: impl FnOnce(&mut HashSet<T>) -> R) -> R {
        let mut next = self.set.with(|s| HashSet::clone(s));
        let out = f(&mut next);
        self.set.set(Rc::new(next));
        out
    }
}

pub fn use_set<T>(initial: impl IntoIterator<Item = T>) -> SetState<T>
where
    T: Eq + Hash + 'static,
{
    SetState {
        set: remember_signal(|| Rc::new(initial.into_iter().collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwork_core::Composition;

    #[test]
    fn boolean_writes_invalidate() {
        let mut comp = Composition::new();
        let state = comp.compose(|| use_boolean(false));
        assert!(!state.value());

        state.toggle();
        assert!(comp.is_dirty());
        let again = comp.compose(|| use_boolean(false));
        assert!(again.value());

        again.set_false();
        again.set_true();
        assert!(state.value());
    }

    #[test]
    fn toggle_flips_across_passes() {
        let mut comp = Composition::new();
        let (value, toggle) = comp.compose(|| use_toggle(true));
        assert!(value);
        toggle();
        let (value, toggle) = comp.compose(|| use_toggle(true));
        assert!(!value);
        toggle();
        assert!(comp.compose(|| use_toggle(true)).0);
    }

    #[test]
    fn map_is_copy_on_write() {
        let mut comp = Composition::new();
        let map = comp.compose(|| use_map([("a", 1)]));
        let before = map.snapshot();

        assert_eq!(map.insert("b", 2), None);
        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(map.remove(&"missing"), None);
        assert!(comp.is_dirty());

        assert_eq!(before.len(), 1);
        assert_eq!(map.get(&"a"), Some(10));
        assert_eq!(map.len(), 2);

        map.clear();
        assert!(map.is_empty());
        assert_eq!(comp.compose(|| use_map([("z", 0)])).len(), 0);
    }

    #[test]
    fn set_reports_membership_changes() {
        let mut comp = Composition::new();
        let set = comp.compose(|| use_set(["x"]));
        assert!(set.insert("y"));
        assert!(!set.insert("y"));
        assert!(set.remove(&"x"));
        assert!(!set.remove(&"x"));
        assert!(set.contains(&"y"));
        set.clear();
        assert!(set.is_empty());
    }
}
