use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::Dispose;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
}

/// Tree of cleanups. Disposing (or dropping the last handle) runs children first,
/// then this scope's disposers in registration order.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    children: RefCell<Vec<Scope>>,
}

/// Restores the previously current scope, also when the body unwinds.
struct Entered(Option<Weak<ScopeInner>>);

impl Drop for Entered {
    fn drop(&mut self) {
        let prev = self.0.take();
        CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with this scope as the current one.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let weak = Rc::downgrade(&self.inner);
        let _entered = Entered(CURRENT_SCOPE.with(|current| current.borrow_mut().replace(weak)));
        f()
    }

    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    /// A scope disposed together with (and before) this one.
    pub fn child(&self) -> Scope {
        let child = Scope::new();
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    pub fn dispose(self) {
        self.inner.cleanup();
    }
}

impl ScopeInner {
    fn cleanup(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        children.into_iter().for_each(Scope::dispose);

        let disposers = std::mem::take(&mut *self.disposers.borrow_mut());
        for disposer in disposers {
            disposer();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.cleanup();
    }
}

pub fn current_scope() -> Option<Scope> {
    let weak = CURRENT_SCOPE.with(|current| current.borrow().clone())?;
    weak.upgrade().map(|inner| Scope { inner })
}

/// Runs `f` now and registers its cleanup with the current scope.
pub fn scoped_effect<F>(f: F)
where
    F: FnOnce() -> Dispose,
{
    let cleanup = f();
    match current_scope() {
        Some(scope) => scope.add_disposer(move || cleanup.run()),
        None => log::debug!("scoped_effect outside of a scope; cleanup will not run automatically"),
    }
}
