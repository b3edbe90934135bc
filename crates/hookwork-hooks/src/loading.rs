use std::cell::RefCell;
use std::rc::Rc;

use hookwork_core::{Signal, disposable_effect, on_unmount, remember};

use crate::remember_signal;

type Loader<T, E> = Box<dyn FnMut() -> Result<T, E>>;

/// Loading flag, last result and last error of a fallible callback.
///
/// Returned by [`use_is_loading`] (run on demand) and [`use_async`] (run on mount).
///
/// A success replaces `results` and leaves `error` alone; a failure does the
/// opposite.
pub struct LoadingState<T: 'static, E: 'static> {
    is_loading: Signal<bool>,
    results: Signal<Option<T>>,
    error: Signal<Option<E>>,
    loader: Rc<RefCell<Option<Loader<T, E>>>>,
}

impl<T, E> Clone for LoadingState<T, E> {
    fn clone(&self) -> Self {
        Self {
            is_loading: self.is_loading.clone(),
            results: self.results.clone(),
            error: self.error.clone(),
            loader: self.loader.clone(),
        }
    }
}

impl<T: Clone, E: Clone> LoadingState<T, E> {
    pub fn is_loading(&self) -> bool {
        self.is_loading.get()
    }

    pub fn results(&self) -> Option<T> {
        self.results.get()
    }

    pub fn error(&self) -> Option<E> {
        self.error.get()
    }
}

impl<T, E> LoadingState<T, E> {
    /// Runs the most recently composed callback.
    pub fn call(&self) {
        let mut loader = self.loader.borrow_mut();
        let Some(load) = loader.as_mut() else {
            return;
        };
        self.is_loading.set(true);
        match load() {
            Ok(v) => self.results.set(Some(v)),
            Err(e) => {
                log::debug!("use_is_loading callback failed");
                self.error.set(Some(e));
            }
        }
        self.is_loading.set(false);
    }

    /// Observe the loading flag, e.g. to show progress while `call` runs.
    pub fn on_loading_change(&self, f: impl Fn(&bool) + 'static) {
        self.is_loading.subscribe(f);
    }
}

pub fn use_is_loading<T: 'static, E: 'static>(
    callback: impl FnMut() -> Result<T, E> + 'static,
) -> LoadingState<T, E> {
    let loader = remember(|| RefCell::new(None::<Loader<T, E>>));
    *loader.borrow_mut() = Some(Box::new(callback));

    LoadingState {
        is_loading: remember_signal(|| false),
        results: remember_signal(|| None),
        error: remember_signal(|| None),
        loader: Rc::clone(&loader),
    }
}

/// Runs `loader` once, on the first pass, and exposes its outcome.
///
/// Later passes never run it again. Storing the outcome asks the composition
/// for another pass, in which `results` or `error` is visible.
pub fn use_async<T: 'static, E: 'static>(
    loader: impl FnMut() -> Result<T, E> + 'static,
) -> LoadingState<T, E> {
    let state = use_is_loading(loader);
    disposable_effect((), {
        let state = state.clone();
        move || {
            state.call();
            on_unmount(|| {})
        }
    });
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwork_core::Composition;
    use std::cell::Cell;

    #[test]
    fn success_then_failure() {
        let mut comp = Composition::new();
        let attempt = Rc::new(Cell::new(0));
        let state = comp.compose(|| {
            let attempt = attempt.clone();
            use_is_loading(move || {
                attempt.set(attempt.get() + 1);
                if attempt.get() == 1 { Ok(42) } else { Err("offline".to_string()) }
            })
        });
        assert_eq!(state.results(), None);

        let flags = Rc::new(RefCell::new(Vec::new()));
        state.on_loading_change({
            let flags = flags.clone();
            move |v| flags.borrow_mut().push(*v)
        });

        state.call();
        assert_eq!(state.results(), Some(42));
        assert_eq!(state.error(), None);
        assert!(comp.is_dirty());

        state.call();
        assert_eq!(state.results(), Some(42));
        assert_eq!(state.error(), Some("offline".to_string()));
        assert!(!state.is_loading());
        assert_eq!(flags.borrow().as_slice(), &[true, false, true, false]);
    }

    #[test]
    fn async_loader_runs_once_on_mount() {
        let mut comp = Composition::new();
        let runs = Rc::new(Cell::new(0));
        let pass = |comp: &mut Composition| {
            let runs = runs.clone();
            comp.compose(move || {
                use_async(move || {
                    runs.set(runs.get() + 1);
                    Ok::<_, String>(runs.get() * 10)
                })
            })
        };

        let first = pass(&mut comp);
        assert_eq!(first.results(), Some(10));
        assert!(!first.is_loading());
        assert!(comp.is_dirty());

        for _ in 0..3 {
            let again = pass(&mut comp);
            assert_eq!(again.results(), Some(10));
        }
        assert_eq!(runs.get(), 1);
        assert!(!comp.is_dirty());
    }

    #[test]
    fn async_loader_failure_is_kept() {
        let mut comp = Composition::new();
        let state = comp.compose(|| use_async(|| Err::<u8, _>("unreachable host")));
        assert_eq!(state.error(), Some("unreachable host"));
        assert_eq!(state.results(), None);
    }

    #[test]
    fn latest_callback_wins() {
        let mut comp = Composition::new();
        let render = |comp: &mut Composition, v: i32| {
            comp.compose(move || use_is_loading(move || Ok::<_, ()>(v)))
        };
        render(&mut comp, 1);
        let state = render(&mut comp, 2);
        state.call();
        assert_eq!(state.results(), Some(2));
    }
}
