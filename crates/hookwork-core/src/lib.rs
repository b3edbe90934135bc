//! # Scheduling and store selection
//!
//! Hookwork is the small reactive core behind a set of UI state hooks. Most of
//! those hooks are plain state wrappers; two pieces carry real timing and
//! equality semantics and live here:
//!
//! - [`animation_interval`] / [`FrameScheduler`]: a periodic callback locked to
//!   the frame clock, correcting drift by snapping to the nearest interval
//!   boundary after every firing.
//! - [`derive_selection`] / [`SelectedStore`]: a subscription to an external
//!   store that projects each snapshot through a [`Selector`] and only
//!   publishes selections that differ under one-level shallow equality.
//!
//! Both are single threaded and callback driven. Timers and frames come from a
//! [`FrameHost`]; [`EventLoop`] is the one shipped here, and with a
//! [`TestClock`] it runs in virtual time:
//!
//! ```rust
//! use hookwork_core::*;
//! use web_time::Duration;
//!
//! let ev = EventLoop::with_clock(LoopConfig::default(), TestClock::new());
//! let store = Store::new(Value::from(serde_json::json!({ "ticks": 0 })));
//! let ticks = derive_selection(store.source(), Selector::paths([("ticks", "ticks")]));
//!
//! let token = FrameScheduler::new(ev.host()).schedule(Duration::from_millis(100), {
//!     let store = store.clone();
//!     move |_| {
//!         let n = store.with(|s| s.get("ticks").and_then(Value::as_f64).unwrap_or(0.0));
//!         store.set_path("ticks", Value::from(n + 1.0)).unwrap();
//!     }
//! });
//!
//! ev.run_for(Duration::from_millis(520));
//! token.cancel();
//! assert_eq!(ticks.selection().get("ticks"), Some(&Value::from(5.0)));
//! ```
//!
//! ## Signals, scopes and compositions
//!
//! The rest of the crate is the runtime the hooks sit on:
//!
//! - `Signal<T>`: observable value with ordered subscribers.
//! - `Scope` / `Dispose`: cleanup trees, run on unmount.
//! - `remember*`: slot storage bound to a [`Composition`], which re-runs its
//!   body when something it rendered asks for a recompose.
//!
//! ```rust
//! use hookwork_core::*;
//!
//! let mut comp = Composition::new();
//! let count = comp.compose(|| {
//!     let count = remember(|| signal(0));
//!     let inv = current_invalidator().unwrap();
//!     count.subscribe(move |_| inv.invalidate());
//!     (*count).clone()
//! });
//!
//! count.set(1);
//! assert!(comp.is_dirty());
//! ```

pub mod clock;
pub mod effects;
pub mod effects_ext;
pub mod equality;
pub mod error;
pub mod host;
pub mod interval;
pub mod prelude;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod store;
pub mod value;

pub use effects::*;
pub use effects_ext::*;
pub use prelude::*;
pub use runtime::*;
pub use signal::*;
