use std::cell::RefCell;
use std::rc::Rc;

type Cleanup = Box<dyn FnOnce()>;

/// Run-once cleanup. Clones share the action; whichever handle runs first
/// consumes it and later runs do nothing.
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Cleanup>>>);

impl Dispose {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(cleanup)))))
    }

    pub fn run(&self) {
        let cleanup = self.0.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }

    pub fn is_spent(&self) -> bool {
        self.0.borrow().is_none()
    }
}

/// The cleanup an effect body hands back; it runs on unmount or restart.
pub fn on_unmount(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}
