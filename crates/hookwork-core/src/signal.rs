use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

pub type SubId = u64;

type Subscriber<T> = Rc<dyn Fn(&T)>;

/// Observable value. Clones are handles to the same cell.
pub struct Signal<T: 'static>(Rc<Inner<T>>);

struct Inner<T> {
    value: RefCell<Rc<T>>,
    subs: RefCell<SmallVec<[(SubId, Subscriber<T>); 2]>>,
    next_sub: Cell<SubId>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(Inner {
            value: RefCell::new(Rc::new(value)),
            subs: RefCell::new(SmallVec::new()),
            next_sub: Cell::new(0),
        }))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        T::clone(&*self.current())
    }

    /// Reads the value without holding the cell, so `f` may write to the signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.current())
    }

    pub fn set(&self, v: T) {
        *self.0.value.borrow_mut() = Rc::new(v);
        self.notify();
    }

    /// In-place update; copies the value first only while a reader still holds it.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F)
    where
        T: Clone,
    {
        {
            let mut value = self.0.value.borrow_mut();
            f(Rc::make_mut(&mut *value));
        }
        self.notify();
    }

    /// Subscribers run in registration order. They may read, write and
    /// (un)subscribe; a write from a subscriber notifies everyone again before
    /// the current round continues.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> SubId {
        let id = self.0.next_sub.get();
        self.0.next_sub.set(id + 1);
        self.0.subs.borrow_mut().push((id, Rc::new(f)));
        id
    }

    pub fn unsubscribe(&self, id: SubId) -> bool {
        let mut subs = self.0.subs.borrow_mut();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subs.borrow().len()
    }

    fn current(&self) -> Rc<T> {
        Rc::clone(&self.0.value.borrow())
    }

    fn notify(&self) {
        let subs: SmallVec<[Subscriber<T>; 4]> =
            self.0.subs.borrow().iter().map(|(_, s)| s.clone()).collect();
        let value = self.current();
        for s in subs {
            s(&*value);
        }
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}
