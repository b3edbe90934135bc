use std::cell::RefCell;
use std::rc::Rc;

use crate::{Dispose, on_unmount, remember, scoped_effect};

struct EffectSlot<K> {
    key: Option<K>,
    cleanup: Option<Dispose>,
}

impl<K> EffectSlot<K> {
    fn stop(slot: &RefCell<Self>) {
        let cleanup = slot.borrow_mut().cleanup.take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
    }
}

/// Starts `effect` on the first pass and again whenever `key` changes.
///
/// The previous generation's cleanup always runs before the next one starts.
/// The last cleanup runs when the enclosing composition is disposed.
pub fn disposable_effect<K: PartialEq + 'static>(key: K, effect: impl FnOnce() -> Dispose) {
    let slot = remember(|| {
        let slot = Rc::new(RefCell::new(EffectSlot::<K> {
            key: None,
            cleanup: None,
        }));
        let unmounted = Rc::clone(&slot);
        scoped_effect(move || on_unmount(move || EffectSlot::<K>::stop(&unmounted)));
        slot
    });

    if slot.borrow().key.as_ref() == Some(&key) {
        return;
    }
    EffectSlot::<K>::stop(&slot);
    let cleanup = effect();
    let mut slot = slot.borrow_mut();
    slot.key = Some(key);
    slot.cleanup = Some(cleanup);
}
