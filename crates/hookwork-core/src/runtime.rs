use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::scope::Scope;

thread_local! {
    pub static COMPOSER: RefCell<Composer> = RefCell::new(Composer::default());
    static INVALIDATOR: RefCell<Option<Invalidator>> = const { RefCell::new(None) };
}

/// Remembered slots of one composition.
#[derive(Default)]
pub struct Composer {
    pub slots: Vec<Box<dyn Any>>,
    pub cursor: usize,
    pub keyed_slots: HashMap<String, Box<dyn Any>>,
}

/// Handle that marks a composition as needing another pass.
///
/// Hooks capture it while composing and call it later, from timers or store
/// notifications, when something they render has changed.
#[derive(Clone)]
pub struct Invalidator(Rc<dyn Fn()>);

impl Invalidator {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn invalidate(&self) {
        (self.0)()
    }
}

/// The invalidator of the composition currently running, if any.
pub fn current_invalidator() -> Option<Invalidator> {
    INVALIDATOR.with(|i| i.borrow().clone())
}

/// Invalidates the composition currently running. No-op outside of composition.
pub fn request_recompose() {
    if let Some(inv) = current_invalidator() {
        inv.invalidate();
    }
}

/// Installs a composition's slots and invalidator for the duration of one pass.
pub struct ComposeGuard<'a> {
    slots: &'a mut Composer,
    prev_invalidator: Option<Invalidator>,
}

impl<'a> ComposeGuard<'a> {
    pub fn begin(slots: &'a mut Composer, invalidator: Invalidator) -> Self {
        slots.cursor = 0;
        COMPOSER.with(|c| std::mem::swap(&mut *c.borrow_mut(), slots));
        let prev_invalidator = INVALIDATOR.with(|i| i.borrow_mut().replace(invalidator));
        ComposeGuard {
            slots,
            prev_invalidator,
        }
    }
}

impl Drop for ComposeGuard<'_> {
    fn drop(&mut self) {
        COMPOSER.with(|c| std::mem::swap(&mut *c.borrow_mut(), self.slots));
        let prev = self.prev_invalidator.take();
        INVALIDATOR.with(|i| *i.borrow_mut() = prev);
    }
}

/// A unit of UI whose body is re-run on demand.
///
/// Slots persist across passes; the root scope lives until the composition is
/// disposed, which runs every registered cleanup (unmount).
pub struct Composition {
    slots: Composer,
    scope: Scope,
    dirty: Rc<Cell<bool>>,
    renders: u64,
    invalidator: Invalidator,
}

impl Composition {
    pub fn new() -> Self {
        Self::with_listener(|| {})
    }

    /// `on_invalidate` runs every time something asks for a recompose, e.g. to
    /// schedule a frame.
    pub fn with_listener(on_invalidate: impl Fn() + 'static) -> Self {
        let dirty = Rc::new(Cell::new(false));
        let invalidator = Invalidator::new({
            let dirty = dirty.clone();
            move || {
                dirty.set(true);
                on_invalidate();
            }
        });
        Self {
            slots: Composer::default(),
            scope: Scope::new(),
            dirty,
            renders: 0,
            invalidator,
        }
    }

    pub fn compose<R>(&mut self, content: impl FnOnce() -> R) -> R {
        self.dirty.set(false);
        let guard = ComposeGuard::begin(&mut self.slots, self.invalidator.clone());
        let out = self.scope.run(content);
        drop(guard);
        self.renders += 1;
        out
    }

    /// Re-runs `content` if the composition was invalidated since the last pass.
    pub fn recompose_if_dirty<R>(&mut self, content: impl FnOnce() -> R) -> Option<R> {
        self.dirty.get().then(|| self.compose(content))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn dispose(self) {
        self.scope.dispose();
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot-based remember (sequential composition only)
pub fn remember<T: 'static>(init: impl FnOnce() -> T) -> Rc<T> {
    let existing = COMPOSER.with(|c| {
        let mut c = c.borrow_mut();
        let cursor = c.cursor;
        c.cursor += 1;
        match c.slots.get(cursor) {
            None => {
                // Reserve the position so hooks called from `init` land after it.
                c.slots.push(Box::new(()));
                Err(cursor)
            }
            Some(slot) => match slot.downcast_ref::<Rc<T>>() {
                Some(rc) => Ok(rc.clone()),
                None => {
                    log::warn!(
                        "remember: slot {} type changed; replacing. \
                         If this is due to conditional composition, prefer remember_with_key.",
                        cursor
                    );
                    Err(cursor)
                }
            },
        }
    });

    match existing {
        Ok(rc) => rc,
        Err(cursor) => {
            // init may itself call hooks, so it runs without the composer borrowed.
            let rc: Rc<T> = Rc::new(init());
            COMPOSER.with(|c| c.borrow_mut().slots[cursor] = Box::new(rc.clone()));
            rc
        }
    }
}

/// Key-based remember
pub fn remember_with_key<T: 'static>(key: impl Into<String>, init: impl FnOnce() -> T) -> Rc<T> {
    let key = key.into();
    let existing = COMPOSER.with(|c| {
        let c = c.borrow();
        let slot = c.keyed_slots.get(&key)?;
        let rc = slot.downcast_ref::<Rc<T>>().cloned();
        if rc.is_none() {
            log::warn!(
                "remember_with_key: key '{}' reused with a different type; replacing.",
                key
            );
        }
        rc
    });
    if let Some(rc) = existing {
        return rc;
    }

    let rc: Rc<T> = Rc::new(init());
    COMPOSER.with(|c| {
        c.borrow_mut().keyed_slots.insert(key, Box::new(rc.clone()));
    });
    rc
}
