pub use crate::clock::{Clock, SystemClock, TestClock};
pub use crate::effects::{Dispose, on_unmount};
pub use crate::effects_ext::disposable_effect;
pub use crate::equality::{Same, ShallowEq, shallow};
pub use crate::error::{Error, Result};
pub use crate::host::{EventLoop, FrameHost, FrameId, LoopConfig, TimerId};
pub use crate::interval::{CancellationToken, FrameScheduler, animation_interval, next_target};
pub use crate::runtime::{
    ComposeGuard, Composition, Invalidator, current_invalidator, remember, remember_with_key,
    request_recompose,
};
pub use crate::scope::{Scope, current_scope, scoped_effect};
pub use crate::signal::{Signal, SubId, signal};
pub use crate::store::{SelectedStore, Selection, Selector, Store, StoreSource, derive_selection};
pub use crate::value::Value;
