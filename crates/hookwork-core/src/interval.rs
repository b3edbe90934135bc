//! # Frame-aligned intervals
//!
//! `animation_interval` runs a callback every `interval`, firing on frame
//! boundaries and locked to the schedule `start + k * interval`. After each
//! firing the elapsed time is snapped to the *nearest* interval boundary before
//! the next target is computed, so lateness from timers or frame alignment is
//! absorbed instead of carried forward.
//!
//! Each firing goes through two hops: a coarse timer gets close to the target,
//! then a frame request lands the callback on an actual frame.
//!
//! ```rust
//! use hookwork_core::*;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use web_time::Duration;
//!
//! let ev = EventLoop::with_clock(
//!     LoopConfig::with_frame_interval(Duration::from_millis(10)),
//!     TestClock::new(),
//! );
//! let ticks = Rc::new(Cell::new(0));
//! let token = FrameScheduler::new(ev.host()).schedule(Duration::from_millis(100), {
//!     let ticks = ticks.clone();
//!     move |_| ticks.set(ticks.get() + 1)
//! });
//!
//! ev.run_for(Duration::from_millis(350));
//! assert_eq!(ticks.get(), 3);
//!
//! token.cancel();
//! ev.run_for(Duration::from_millis(1000));
//! assert_eq!(ticks.get(), 3);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use web_time::Duration;

use crate::host::FrameHost;

/// Cooperative cancellation flag shared between a session and its owner.
///
/// Cancelling only prevents future firings; a callback already running finishes.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Next target firing time for a session that started at `start` and fired at `frame_time`.
///
/// Elapsed time is rounded to the nearest multiple of `interval`, so a firing
/// slightly before or after a boundary schedules the boundary that follows it.
pub fn next_target(start: Duration, frame_time: Duration, interval: Duration) -> Duration {
    let step = interval.as_secs_f64();
    let elapsed = frame_time.as_secs_f64() - start.as_secs_f64();
    let rounded = if step > 0.0 {
        (elapsed / step).round() * step
    } else {
        elapsed
    };
    Duration::from_secs_f64((start.as_secs_f64() + rounded + step).max(0.0))
}

struct Session<F> {
    host: Rc<dyn FrameHost>,
    interval: Duration,
    start: Duration,
    token: CancellationToken,
    callback: RefCell<F>,
}

impl<F: FnMut(Duration) + 'static> Session<F> {
    fn arm(self: &Rc<Self>, time: Duration) {
        let target = next_target(self.start, time, self.interval);
        let delay = target.saturating_sub(self.host.now());
        let session = Rc::clone(self);
        self.host.set_timeout(
            delay,
            Box::new(move || {
                if session.token.is_cancelled() {
                    log::trace!("interval session cancelled before frame request");
                    return;
                }
                let next = Rc::clone(&session);
                session
                    .host
                    .request_frame(Box::new(move |frame_time| next.fire(frame_time)));
            }),
        );
    }

    fn fire(self: &Rc<Self>, frame_time: Duration) {
        if self.token.is_cancelled() {
            log::trace!("interval session cancelled");
            return;
        }
        log::trace!("interval firing at {:?}", frame_time);
        (self.callback.borrow_mut())(frame_time);
        self.arm(frame_time);
    }
}

/// Starts an unbounded, cancellable sequence of frame-aligned callbacks.
///
/// The reference start is the host's frame clock (zero if no frame has been
/// presented yet), or its wall clock when the host has no frame clock. The first
/// firing targets `start + interval`. A non-positive interval degenerates to
/// back-to-back frames.
pub fn animation_interval<F>(
    host: Rc<dyn FrameHost>,
    interval: Duration,
    token: CancellationToken,
    callback: F,
) where
    F: FnMut(Duration) + 'static,
{
    let start = if host.has_frame_clock() {
        host.frame_time().unwrap_or(Duration::ZERO)
    } else {
        host.now()
    };
    log::debug!("interval session every {:?} from {:?}", interval, start);

    let session = Rc::new(Session {
        host,
        interval,
        start,
        token,
        callback: RefCell::new(callback),
    });
    session.arm(start);
}

/// Convenience front for [`animation_interval`] that owns the host handle and
/// hands back a fresh token per session.
#[derive(Clone)]
pub struct FrameScheduler {
    host: Rc<dyn FrameHost>,
}

impl FrameScheduler {
    pub fn new(host: Rc<dyn FrameHost>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Rc<dyn FrameHost> {
        &self.host
    }

    pub fn schedule(
        &self,
        interval: Duration,
        callback: impl FnMut(Duration) + 'static,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        animation_interval(self.host.clone(), interval, token.clone(), callback);
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use crate::host::{EventLoop, LoopConfig};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn recorder() -> (Rc<RefCell<Vec<Duration>>>, impl FnMut(Duration) + 'static) {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let sink = fired.clone();
        (fired, move |t| sink.borrow_mut().push(t))
    }

    fn test_loop(frame: Duration) -> EventLoop {
        let _ = env_logger::builder().is_test(true).try_init();
        EventLoop::with_clock(LoopConfig::with_frame_interval(frame), TestClock::new())
    }

    #[test]
    fn snaps_to_nearest_boundary() {
        let interval = ms(1000);
        assert_eq!(next_target(ms(0), ms(1050), interval), ms(2000));
        assert_eq!(next_target(ms(0), ms(1980), interval), ms(3000));
        assert_eq!(next_target(ms(0), ms(3010), interval), ms(4000));
    }

    #[test]
    fn first_target_is_one_interval_after_start() {
        assert_eq!(next_target(ms(250), ms(250), ms(100)), ms(350));
    }

    #[test]
    fn early_firing_rounds_up_to_the_boundary_it_precedes() {
        // 1490 is nearer to 1000 than to 2000, 1510 is nearer to 2000.
        assert_eq!(next_target(ms(0), ms(1490), ms(1000)), ms(2000));
        assert_eq!(next_target(ms(0), ms(1510), ms(1000)), ms(3000));
    }

    #[test]
    fn firings_stay_on_grid() {
        let ev = test_loop(ms(16));
        let (fired, cb) = recorder();
        let _token = FrameScheduler::new(ev.host()).schedule(ms(100), cb);

        ev.run_for(ms(5050));

        let fired = fired.borrow();
        assert_eq!(fired.len(), 50);
        for (k, t) in fired.iter().enumerate() {
            let nominal = ms(100 * (k as u64 + 1));
            assert!(*t >= nominal, "firing {k} at {t:?} before {nominal:?}");
            assert!(*t - nominal < ms(16), "firing {k} at {t:?} drifted");
        }
    }

    #[test]
    fn timer_lateness_does_not_accumulate() {
        let ev = EventLoop::with_clock(
            LoopConfig::with_frame_interval(ms(16)).timer_slack(ms(7)),
            TestClock::new(),
        );
        let (fired, cb) = recorder();
        let _token = FrameScheduler::new(ev.host()).schedule(ms(100), cb);

        ev.run_for(ms(10_050));

        let fired = fired.borrow();
        assert_eq!(fired.len(), 100);
        for (k, t) in fired.iter().enumerate() {
            let nominal = ms(100 * (k as u64 + 1));
            assert!(*t - nominal < ms(23), "firing {k} at {t:?} drifted");
        }
    }

    #[test]
    fn one_pending_primitive_per_session() {
        let ev = test_loop(ms(10));
        let (_fired, cb) = recorder();
        let _token = FrameScheduler::new(ev.host()).schedule(ms(50), cb);

        for _ in 0..100 {
            assert_eq!(ev.pending_timers() + ev.pending_frames(), 1);
            ev.run_for(ms(3));
        }
    }

    #[test]
    fn cancel_stops_future_firings() {
        let ev = test_loop(ms(10));
        let (fired, cb) = recorder();
        let token = FrameScheduler::new(ev.host()).schedule(ms(100), cb);

        ev.run_for(ms(250));
        assert_eq!(fired.borrow().len(), 2);

        token.cancel();
        token.cancel();
        ev.run_for(ms(1000));
        assert_eq!(fired.borrow().len(), 2);
        assert_eq!(ev.pending_timers() + ev.pending_frames(), 0);
    }

    #[test]
    fn cancel_while_frame_is_pending() {
        let ev = EventLoop::with_clock(
            LoopConfig::with_frame_interval(ms(16)).timer_slack(ms(3)),
            TestClock::new(),
        );
        let (fired, cb) = recorder();
        let token = FrameScheduler::new(ev.host()).schedule(ms(100), cb);

        let mut steps = 0;
        while ev.pending_frames() == 0 {
            assert!(steps < 500, "timer hop never requested a frame");
            ev.run_for(ms(1));
            steps += 1;
        }
        assert_eq!(ev.pending_timers(), 0);

        token.cancel();
        ev.run_for(ms(1000));
        assert!(fired.borrow().is_empty());
        assert_eq!(ev.pending_timers() + ev.pending_frames(), 0);
    }

    #[test]
    fn cancel_from_inside_callback_finishes_current_firing() {
        let ev = test_loop(ms(10));
        let token = CancellationToken::new();
        let calls = Rc::new(Cell::new(0));
        animation_interval(ev.host(), ms(100), token.clone(), {
            let calls = calls.clone();
            let token = token.clone();
            move |_| {
                calls.set(calls.get() + 1);
                if calls.get() == 3 {
                    token.cancel();
                }
            }
        });

        ev.run_for(ms(2000));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn start_follows_presented_frame_clock() {
        let ev = test_loop(ms(16));
        ev.request_frame(Box::new(|_| {}));
        ev.run_for(ms(20));
        assert_eq!(ev.frame_time(), Some(ms(16)));

        let (fired, cb) = recorder();
        let _token = FrameScheduler::new(ev.host()).schedule(ms(100), cb);
        ev.run_for(ms(120));

        // Anchored at 16ms: first target 116ms, landing on the 128ms frame.
        assert_eq!(fired.borrow().as_slice(), &[ms(128)]);
    }

    #[test]
    fn falls_back_to_wall_clock_without_frame_clock() {
        let ev = EventLoop::with_clock(
            LoopConfig::with_frame_interval(ms(16)).without_frame_clock(),
            TestClock::new(),
        );
        ev.run_for(ms(30));
        assert_eq!(ev.frame_time(), None);

        let (fired, cb) = recorder();
        let _token = FrameScheduler::new(ev.host()).schedule(ms(100), cb);
        ev.run_for(ms(150));

        // Anchored at 30ms: first target 130ms, landing on the 144ms frame.
        assert_eq!(fired.borrow().as_slice(), &[ms(144)]);
    }

    #[test]
    fn sessions_do_not_share_timers() {
        let ev = test_loop(ms(10));
        let scheduler = FrameScheduler::new(ev.host());
        let (a, cb_a) = recorder();
        let (b, cb_b) = recorder();
        let token_a = scheduler.schedule(ms(100), cb_a);
        let _token_b = scheduler.schedule(ms(150), cb_b);

        assert_eq!(ev.pending_timers(), 2);
        ev.run_for(ms(310));
        token_a.cancel();
        ev.run_for(ms(300));

        assert_eq!(a.borrow().len(), 3);
        assert_eq!(b.borrow().len(), 4);
    }
}
