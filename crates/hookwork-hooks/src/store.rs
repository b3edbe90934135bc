use std::cell::RefCell;
use std::rc::Rc;

use hookwork_core::{
    SelectedStore, Selector, StoreSource, current_invalidator, disposable_effect, on_unmount,
    remember,
};

type Slot<S, T> = Rc<RefCell<Option<SelectedStore<S, T>>>>;

/// Current selection of an external store; recomposes the caller when it changes.
///
/// The store is subscribed on the first pass and unsubscribed on unmount. A
/// pass that brings a different source or selector (see [`Selector::same_as`])
/// drops the old subscription and selects from the current snapshot instead.
pub fn use_store<S: 'static, T: Clone + 'static>(
    source: &StoreSource<S>,
    selector: Selector<S, T>,
) -> T {
    let slot = remember(|| Slot::<S, T>::default());
    let selected = reuse_or_replace(&slot, source, &selector, || {
        let selected = SelectedStore::subscribe(source.clone(), selector.clone());
        if let Some(inv) = current_invalidator() {
            selected.on_change(move |_| inv.invalidate());
        }
        selected
    });

    disposable_effect((), {
        let slot = (*slot).clone();
        move || {
            on_unmount(move || {
                let last = slot.borrow_mut().take();
                if let Some(selected) = last {
                    selected.unsubscribe();
                }
            })
        }
    });

    selected.selection()
}

/// Selection of the store's server snapshot, for passes that run before a live
/// store exists. Never subscribes.
pub fn use_server_store<S: 'static, T: Clone + 'static>(
    source: &StoreSource<S>,
    selector: Selector<S, T>,
) -> T {
    let slot = remember(|| Slot::<S, T>::default());
    reuse_or_replace(&slot, source, &selector, || {
        SelectedStore::from_server(source.clone(), selector.clone())
    })
    .selection()
}

fn reuse_or_replace<S: 'static, T: 'static>(
    slot: &Slot<S, T>,
    source: &StoreSource<S>,
    selector: &Selector<S, T>,
    build: impl FnOnce() -> SelectedStore<S, T>,
) -> SelectedStore<S, T> {
    let kept = slot.borrow().clone().filter(|s| s.is_for(source, selector));
    if let Some(selected) = kept {
        return selected;
    }
    let previous = slot.borrow_mut().take();
    if let Some(previous) = previous {
        log::debug!("store hook inputs changed; resubscribing");
        previous.unsubscribe();
    }
    let selected = build();
    *slot.borrow_mut() = Some(selected.clone());
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwork_core::{Composition, Selection, Store, Value};
    use serde_json::json;

    fn label(sel: &Selection) -> Option<&str> {
        sel.get("label").and_then(Value::as_str)
    }

    #[test]
    fn renders_only_on_tracked_changes() {
        let _ = env_logger::builder().is_test(true).try_init();
        let store = Store::new(Value::from(json!({ "user": { "name": "A" }, "count": 1 })));
        let source = store.source();
        let mut comp = Composition::new();
        let mut frames = Vec::new();

        let mut render = |comp: &mut Composition| {
            let sel = comp.compose(|| use_store(&source, Selector::paths([("label", "user.name")])));
            frames.push(label(&sel).map(str::to_owned));
        };

        render(&mut comp);
        store.set(Value::from(json!({ "user": { "name": "A" }, "count": 2 })));
        if comp.is_dirty() {
            render(&mut comp);
        }
        store.set(Value::from(json!({ "user": { "name": "B" }, "count": 2 })));
        if comp.is_dirty() {
            render(&mut comp);
        }

        assert_eq!(comp.render_count(), 2);
        assert_eq!(frames, vec![Some("A".to_owned()), Some("B".to_owned())]);
    }

    #[test]
    fn unmount_unsubscribes() {
        let store = Store::new(3u32);
        let source = store.source();
        let mut comp = Composition::new();

        let doubled = comp.compose(|| use_store(&source, Selector::new(|n: &u32| n * 2)));
        assert_eq!(doubled, 6);
        assert_eq!(store.listener_count(), 1);

        comp.compose(|| use_store(&source, Selector::new(|n: &u32| n * 2)));
        assert_eq!(store.listener_count(), 1);

        comp.dispose();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn changed_paths_select_again() {
        let store = Store::new(Value::from(json!({ "user": { "name": "A" }, "count": 1 })));
        let source = store.source();
        let mut comp = Composition::new();

        let first = comp.compose(|| use_store(&source, Selector::paths([("v", "user.name")])));
        let same = comp.compose(|| use_store(&source, Selector::paths([("v", "user.name")])));
        let second = comp.compose(|| use_store(&source, Selector::paths([("v", "count")])));

        assert_eq!(first.get("v"), Some(&Value::from("A")));
        assert_eq!(same, first);
        assert_eq!(second.get("v"), Some(&Value::from(1)));
        assert_eq!(store.listener_count(), 1);

        store.set_path("user.name", Value::from("B")).unwrap();
        assert!(!comp.is_dirty());
        store.set_path("count", Value::from(2)).unwrap();
        assert!(comp.is_dirty());
    }

    #[test]
    fn switching_source_moves_the_subscription() {
        let a = Store::new(1i32);
        let b = Store::new(10i32);
        let (src_a, src_b) = (a.source(), b.source());
        let doubled = Selector::new(|n: &i32| n * 2);
        let mut comp = Composition::new();

        assert_eq!(comp.compose(|| use_store(&src_a, doubled.clone())), 2);
        assert_eq!(comp.compose(|| use_store(&src_b, doubled.clone())), 20);
        assert_eq!((a.listener_count(), b.listener_count()), (0, 1));

        a.set(5);
        assert!(!comp.is_dirty());
        b.set(11);
        assert!(comp.is_dirty());

        comp.dispose();
        assert_eq!(b.listener_count(), 0);
    }

    #[test]
    fn server_store_ignores_live_updates() {
        let store = Store::new(1i32);
        let source = StoreSource::new(
            {
                let store = store.clone();
                move |on_change: std::rc::Rc<dyn Fn()>| store.subscribe(move || on_change())
            },
            {
                let store = store.clone();
                move || store.get()
            },
            || -1,
        );
        let mut comp = Composition::new();

        let first = comp.compose(|| use_server_store(&source, Selector::new(|n: &i32| *n)));
        store.set(5);
        assert!(!comp.is_dirty());
        let second = comp.compose(|| use_server_store(&source, Selector::new(|n: &i32| *n)));

        assert_eq!((first, second), (-1, -1));
        assert_eq!(store.listener_count(), 0);
    }
}
