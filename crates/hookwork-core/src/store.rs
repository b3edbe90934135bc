//! # External stores and selections
//!
//! A [`StoreSource`] is the narrow view the adapter has of some external mutable
//! state: a way to subscribe to change notifications, a way to read the current
//! snapshot, and a way to read the snapshot used before a live store is
//! available. [`SelectedStore`] subscribes to a source, projects every snapshot
//! through a [`Selector`], and only publishes a new selection when it differs
//! from the previous one under the selector's equality (shallow by default).
//!
//! ```rust
//! use hookwork_core::*;
//!
//! let store = Store::new(Value::from(serde_json::json!({
//!     "user": { "name": "A" },
//!     "count": 1,
//! })));
//! let selected = derive_selection(store.source(), Selector::paths([("label", "user.name")]));
//! assert_eq!(selected.selection().get("label"), Some(&Value::from("A")));
//!
//! store.set_path("count", Value::from(2)).unwrap();
//! assert_eq!(selected.change_count(), 0);
//!
//! store.set_path("user.name", Value::from("B")).unwrap();
//! assert_eq!(selected.change_count(), 1);
//! assert_eq!(selected.selection().get("label"), Some(&Value::from("B")));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::ser::{Serialize, SerializeMap, Serializer};
use smallvec::SmallVec;

use crate::effects::Dispose;
use crate::equality::{Same, ShallowEq};
use crate::error::Result;
use crate::signal::{Signal, SubId};
use crate::value::Value;

/// Minimal external store: a value plus change listeners, notified in
/// registration order on every write.
pub struct Store<S: 'static> {
    state: Signal<S>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<S: 'static> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            state: Signal::new(initial),
        }
    }

    pub fn get(&self) -> S
    where
        S: Clone,
    {
        self.state.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.state.with(f)
    }

    pub fn set(&self, next: S) {
        self.state.set(next);
    }

    pub fn update(&self, f: impl FnOnce(&mut S))
    where
        S: Clone,
    {
        self.state.update(f);
    }

    /// Registers `on_change` and returns the action that removes it.
    pub fn subscribe(&self, on_change: impl Fn() + 'static) -> Dispose {
        let id = self.state.subscribe(move |_| on_change());
        let state = self.state.clone();
        Dispose::new(move || {
            state.unsubscribe(id);
        })
    }

    pub fn listener_count(&self) -> usize {
        self.state.subscriber_count()
    }

    /// Live source whose server snapshot is the current state.
    pub fn source(&self) -> StoreSource<S>
    where
        S: Clone,
    {
        let subscribe = self.clone();
        let snapshot = self.clone();
        let server = self.clone();
        StoreSource::new(
            move |on_change| subscribe.subscribe(move || on_change()),
            move || snapshot.get(),
            move || server.get(),
        )
    }
}

impl Store<Value> {
    /// Copy-on-write update of one path; untouched subtrees keep their identity.
    pub fn set_path(&self, path: &str, value: Value) -> Result<()> {
        let mut next = self.get();
        next.set_path(path, value)?;
        self.set(next);
        Ok(())
    }
}

type SubscribeFn = dyn Fn(Rc<dyn Fn()>) -> Dispose;

/// Subscribe / snapshot / server-snapshot triple describing an external store.
pub struct StoreSource<S> {
    subscribe: Rc<SubscribeFn>,
    snapshot: Rc<dyn Fn() -> S>,
    server_snapshot: Rc<dyn Fn() -> S>,
}

impl<S> Clone for StoreSource<S> {
    fn clone(&self) -> Self {
        Self {
            subscribe: self.subscribe.clone(),
            snapshot: self.snapshot.clone(),
            server_snapshot: self.server_snapshot.clone(),
        }
    }
}

impl<S> StoreSource<S> {
    pub fn new(
        subscribe: impl Fn(Rc<dyn Fn()>) -> Dispose + 'static,
        get_snapshot: impl Fn() -> S + 'static,
        get_server_snapshot: impl Fn() -> S + 'static,
    ) -> Self {
        Self {
            subscribe: Rc::new(subscribe),
            snapshot: Rc::new(get_snapshot),
            server_snapshot: Rc::new(get_server_snapshot),
        }
    }

    pub fn subscribe(&self, on_change: Rc<dyn Fn()>) -> Dispose {
        (self.subscribe)(on_change)
    }

    pub fn snapshot(&self) -> S {
        (self.snapshot)()
    }

    pub fn server_snapshot(&self) -> S {
        (self.server_snapshot)()
    }

    /// Whether both describe the same store: clones of one source are the same,
    /// two calls to [`Store::source`] are not.
    pub fn same_as(&self, other: &Self) -> bool {
        same_fn(&self.subscribe, &other.subscribe)
            && same_fn(&self.snapshot, &other.snapshot)
            && same_fn(&self.server_snapshot, &other.server_snapshot)
    }
}

fn same_fn<F: ?Sized>(a: &Rc<F>, b: &Rc<F>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Projection of a snapshot onto named dotted paths. Missing paths hold `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection(BTreeMap<String, Option<Value>>);

impl Selection {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).and_then(Option::as_ref)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

impl FromIterator<(String, Option<Value>)> for Selection {
    fn from_iter<I: IntoIterator<Item = (String, Option<Value>)>>(iter: I) -> Self {
        Selection(iter.into_iter().collect())
    }
}

impl ShallowEq for Selection {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(k, a)| other.0.get(k).is_some_and(|b| a.is_same(b)))
    }
}

impl Serialize for Selection {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error> {
        let mut out = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            out.serialize_entry(k, v)?;
        }
        out.end()
    }
}

type Segments = SmallVec<[String; 4]>;

/// How a snapshot becomes a selection, and when two selections count as equal.
pub struct Selector<S, T> {
    project: Rc<dyn Fn(&S) -> T>,
    equal: Rc<dyn Fn(&T, &T) -> bool>,
    paths: Option<Rc<[(String, String)]>>,
}

impl<S, T> Clone for Selector<S, T> {
    fn clone(&self) -> Self {
        Self {
            project: self.project.clone(),
            equal: self.equal.clone(),
            paths: self.paths.clone(),
        }
    }
}

impl<S, T: ShallowEq + 'static> Selector<S, T> {
    /// Function form, compared with shallow equality.
    pub fn new(project: impl Fn(&S) -> T + 'static) -> Self {
        Self::with_equality(project, |a: &T, b: &T| a.shallow_eq(b))
    }
}

impl<S, T> Selector<S, T> {
    /// Function form with a caller-chosen equality, e.g. `PartialEq` for deep comparison.
    pub fn with_equality(
        project: impl Fn(&S) -> T + 'static,
        equal: impl Fn(&T, &T) -> bool + 'static,
    ) -> Self {
        Self {
            project: Rc::new(project),
            equal: Rc::new(equal),
            paths: None,
        }
    }

    pub fn select(&self, state: &S) -> T {
        (self.project)(state)
    }

    pub fn equal(&self, a: &T, b: &T) -> bool {
        (self.equal)(a, b)
    }

    /// Whether both select the same thing. Path selectors compare their path
    /// maps; function selectors compare closure identity, so callers keep one
    /// by cloning or remembering it.
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.paths, &other.paths) {
            (Some(a), Some(b)) => a == b,
            (None, None) => same_fn(&self.project, &other.project) && same_fn(&self.equal, &other.equal),
            _ => false,
        }
    }
}

impl Selector<Value, Selection> {
    /// Path-mapping form: each output key reads the value at its dotted path.
    pub fn paths<I, K, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let path_map: Rc<[(String, String)]> = paths
            .into_iter()
            .map(|(k, p)| (k.into(), p.as_ref().to_owned()))
            .collect();
        let compiled: Vec<(String, Segments)> = path_map
            .iter()
            .map(|(k, p)| (k.clone(), p.split('.').map(str::to_owned).collect()))
            .collect();
        let mut selector = Self::new(move |state: &Value| {
            compiled
                .iter()
                .map(|(key, segments)| {
                    let leaf = state.get_segments(segments.iter().map(String::as_str));
                    (key.clone(), leaf.cloned())
                })
                .collect()
        });
        selector.paths = Some(path_map);
        selector
    }
}

struct Adapter<S: 'static, T: 'static> {
    source: StoreSource<S>,
    selector: Selector<S, T>,
    current: Signal<T>,
    unsubscribe: RefCell<Option<Dispose>>,
    recomputes: Cell<u64>,
    changes: Cell<u64>,
}

impl<S: 'static, T: 'static> Adapter<S, T> {
    fn on_store_change(&self) {
        let state = self.source.snapshot();
        self.publish(self.selector.select(&state));
    }

    fn publish(&self, next: T) {
        self.recomputes.set(self.recomputes.get() + 1);
        let unchanged = self.current.with(|prev| self.selector.equal(prev, &next));
        if unchanged {
            log::trace!("store selection unchanged; render suppressed");
            return;
        }
        log::trace!("store selection changed");
        self.changes.set(self.changes.get() + 1);
        self.current.set(next);
    }

    fn attach(self: &Rc<Self>) {
        let weak: Weak<Self> = Rc::downgrade(self);
        let dispose = self.source.subscribe(Rc::new(move || {
            if let Some(adapter) = weak.upgrade() {
                adapter.on_store_change();
            }
        }));
        *self.unsubscribe.borrow_mut() = Some(dispose);
    }
}

impl<S: 'static, T: 'static> Drop for Adapter<S, T> {
    fn drop(&mut self) {
        if let Some(d) = self.unsubscribe.get_mut().take() {
            d.run();
        }
    }
}

/// A live (or pre-hydration) selection over an external store.
///
/// Every store notification recomputes the selection once and compares it once
/// with the last published one; listeners registered with [`on_change`] only
/// hear about selections that differ. Dropping the last handle unsubscribes.
///
/// [`on_change`]: SelectedStore::on_change
pub struct SelectedStore<S: 'static, T: 'static> {
    inner: Rc<Adapter<S, T>>,
}

impl<S, T> Clone for SelectedStore<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: 'static, T: 'static> SelectedStore<S, T> {
    fn build(source: StoreSource<S>, selector: Selector<S, T>, state: S) -> Self {
        let initial = selector.select(&state);
        Self {
            inner: Rc::new(Adapter {
                source,
                selector,
                current: Signal::new(initial),
                unsubscribe: RefCell::new(None),
                recomputes: Cell::new(1),
                changes: Cell::new(0),
            }),
        }
    }

    /// Reads the live snapshot eagerly, then subscribes.
    pub fn subscribe(source: StoreSource<S>, selector: Selector<S, T>) -> Self {
        let state = source.snapshot();
        let this = Self::build(source, selector, state);
        this.inner.attach();
        this
    }

    /// Selection from the server snapshot, with no subscription until [`hydrate`].
    ///
    /// [`hydrate`]: SelectedStore::hydrate
    pub fn from_server(source: StoreSource<S>, selector: Selector<S, T>) -> Self {
        let state = source.server_snapshot();
        Self::build(source, selector, state)
    }

    /// Switches a pre-hydration selection to the live store. Reads the live
    /// snapshot (publishing it if it differs) and subscribes. No-op when already live.
    pub fn hydrate(&self) {
        if self.is_live() {
            return;
        }
        self.inner.attach();
        self.inner.on_store_change();
    }

    /// Whether this adapter was built from `source` and `selector`.
    pub fn is_for(&self, source: &StoreSource<S>, selector: &Selector<S, T>) -> bool {
        self.inner.source.same_as(source) && self.inner.selector.same_as(selector)
    }

    pub fn is_live(&self) -> bool {
        self.inner
            .unsubscribe
            .borrow()
            .as_ref()
            .is_some_and(|d| !d.is_spent())
    }

    /// Stops listening to the store. Runs the store's unsubscribe action exactly once.
    pub fn unsubscribe(&self) {
        let d = self.inner.unsubscribe.borrow().clone();
        if let Some(d) = d {
            d.run();
        }
    }

    pub fn selection(&self) -> T
    where
        T: Clone,
    {
        self.inner.current.get()
    }

    pub fn with_selection<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.current.with(f)
    }

    /// `listener` runs with each new selection that differs from the previous one.
    pub fn on_change(&self, listener: impl Fn(&T) + 'static) -> SubId {
        self.inner.current.subscribe(listener)
    }

    pub fn remove_listener(&self, id: SubId) -> bool {
        self.inner.current.unsubscribe(id)
    }

    /// Number of selector evaluations, including the initial read.
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.get()
    }

    /// Number of published changes (renders) since creation.
    pub fn change_count(&self) -> u64 {
        self.inner.changes.get()
    }
}

/// Subscribes `selector` to a live store. See [`SelectedStore`].
pub fn derive_selection<S: 'static, T: 'static>(
    source: StoreSource<S>,
    selector: Selector<S, T>,
) -> SelectedStore<S, T> {
    SelectedStore::subscribe(source, selector)
}
