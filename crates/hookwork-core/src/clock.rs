use std::sync::Arc;

use parking_lot::Mutex;
use web_time::{Duration, Instant};

/// Monotonic time source for an [`EventLoop`](crate::host::EventLoop).
///
/// `sleep_until` is how the loop waits for its next deadline: the system clock
/// blocks the thread, a test clock just jumps forward.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
    fn sleep_until(&self, deadline: Instant);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// A test clock you can drive deterministically.
///
/// Clones share the same time, so a test can keep a handle while the loop owns
/// another one.
#[derive(Clone)]
pub struct TestClock {
    t: Arc<Mutex<Instant>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::at(Instant::now())
    }

    pub fn at(t: Instant) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.t.lock() += by;
    }

    /// Moves the clock to `t`. Time never goes backwards; earlier instants are ignored.
    pub fn set(&self, t: Instant) {
        let mut cur = self.t.lock();
        if t > *cur {
            *cur = t;
        }
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.t.lock()
    }

    fn sleep_until(&self, deadline: Instant) {
        self.set(deadline);
    }
}
