//! # Hooks
//!
//! Composition-bound helpers built on `hookwork-core`. Each hook is called on
//! every pass of a [`Composition`](hookwork_core::Composition), keeps its state
//! in remembered slots, and asks the composition to recompose when something it
//! returned has changed.
//!
//! ```rust
//! use hookwork_core::*;
//! use hookwork_hooks::*;
//!
//! let store = Store::new(Value::from(serde_json::json!({ "user": { "name": "A" }, "count": 1 })));
//! let source = store.source();
//! let mut comp = Composition::new();
//!
//! let render = |comp: &mut Composition| {
//!     comp.compose(|| use_store(&source, Selector::paths([("label", "user.name")])))
//! };
//! let first = render(&mut comp);
//! assert_eq!(first.get("label"), Some(&Value::from("A")));
//!
//! store.set_path("count", Value::from(2)).unwrap();
//! assert!(!comp.is_dirty());
//!
//! store.set_path("user.name", Value::from("B")).unwrap();
//! assert!(comp.is_dirty());
//! assert_eq!(render(&mut comp).get("label"), Some(&Value::from("B")));
//! ```

pub mod interval;
pub mod loading;
pub mod state;
pub mod store;

pub use interval::use_animation_interval;
pub use loading::{LoadingState, use_async, use_is_loading};
pub use state::{BooleanState, MapState, SetState, use_boolean, use_map, use_set, use_toggle};
pub use store::{use_server_store, use_store};

use hookwork_core::{Signal, current_invalidator, remember};

/// A remembered signal whose writes invalidate the composition that created it.
pub(crate) fn remember_signal<T: 'static>(init: impl FnOnce() -> T) -> Signal<T> {
    let sig = remember(|| {
        let sig = Signal::new(init());
        if let Some(inv) = current_invalidator() {
            sig.subscribe(move |_| inv.invalidate());
        }
        sig
    });
    (*sig).clone()
}
