//! # Host primitives
//!
//! The frame scheduler never talks to a platform directly. It goes through
//! [`FrameHost`], which offers the three primitives a rendering host has:
//!
//! - a monotonic wall clock (`now`),
//! - an optional frame clock (`frame_time`), advanced once per rendered frame,
//! - a coarse one-shot timer (`set_timeout`) and a frame-aligned callback
//!   (`request_frame`).
//!
//! [`EventLoop`] is the host shipped with the crate. It is single threaded and
//! ticks frames on a fixed grid, which is what an environment without a
//! rendering engine substitutes for vsync. Driven by a [`TestClock`] it is fully
//! deterministic:
//!
//! ```rust
//! use hookwork_core::*;
//! use web_time::Duration;
//!
//! let clock = TestClock::new();
//! let ev = EventLoop::with_clock(LoopConfig::default(), clock);
//! ev.set_timeout(Duration::from_millis(5), Box::new(|| {}));
//! assert_eq!(ev.pending_timers(), 1);
//! ev.run_for(Duration::from_millis(10));
//! assert_eq!(ev.pending_timers(), 0);
//! assert_eq!(ev.now(), Duration::from_millis(10));
//! ```
//!
//! [`TestClock`]: crate::clock::TestClock

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use web_time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

new_key_type! {
    pub struct TimerId;
    pub struct FrameId;
}

/// Primitives a host runtime lends to the frame scheduler.
///
/// All times are offsets from the host's time origin.
pub trait FrameHost {
    /// Monotonic wall clock.
    fn now(&self) -> Duration;

    /// Whether this host exposes a frame clock at all. Hosts without one make the
    /// scheduler fall back to `now()` for its reference time.
    fn has_frame_clock(&self) -> bool {
        true
    }

    /// Timestamp of the current frame, or `None` before the first frame.
    fn frame_time(&self) -> Option<Duration>;

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;
    fn clear_timeout(&self, id: TimerId);

    /// Runs `callback` with the frame timestamp on the next frame.
    fn request_frame(&self, callback: Box<dyn FnOnce(Duration)>) -> FrameId;
    fn cancel_frame(&self, id: FrameId);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopConfig {
    /// Spacing of the frame grid.
    pub frame_interval: Duration,
    /// When false the loop still ticks frames but reports no frame clock.
    pub frame_clock: bool,
    /// Extra lateness added to every coarse timer.
    pub timer_slack: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::with_rate(60.0)
    }
}

impl LoopConfig {
    pub const FRAME_HZ_VAR: &'static str = "HOOKWORK_FRAME_HZ";

    /// Frames at `hz` per second. A rate that is not finite and positive, or too
    /// small to express as an interval, falls back to 60.
    pub fn with_rate(hz: f64) -> Self {
        let frame_interval = Some(hz)
            .filter(|hz| hz.is_finite() && *hz > 0.0)
            .and_then(|hz| Duration::try_from_secs_f64(1.0 / hz).ok())
            .unwrap_or_else(|| {
                log::warn!("unusable frame rate {hz}; using 60 Hz");
                Duration::from_secs_f64(1.0 / 60.0)
            });
        Self {
            frame_interval,
            frame_clock: true,
            timer_slack: Duration::ZERO,
        }
    }

    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            ..Self::default()
        }
    }

    pub fn without_frame_clock(self) -> Self {
        Self {
            frame_clock: false,
            ..self
        }
    }

    pub fn timer_slack(self, timer_slack: Duration) -> Self {
        Self {
            timer_slack,
            ..self
        }
    }

    /// Default config, with the frame rate taken from `HOOKWORK_FRAME_HZ` if set.
    pub fn from_env() -> Result<Self> {
        match std::env::var(Self::FRAME_HZ_VAR) {
            Ok(raw) => {
                let hz = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|hz| hz.is_finite() && *hz > 0.0)
                    .ok_or_else(|| Error::InvalidFrameRate {
                        var: Self::FRAME_HZ_VAR,
                        value: raw.clone(),
                    })?;
                Ok(Self::with_rate(hz))
            }
            Err(_) => Ok(Self::default()),
        }
    }
}

struct Timer {
    deadline: Duration,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

struct FrameRequest {
    seq: u64,
    callback: Box<dyn FnOnce(Duration)>,
}

#[derive(Default)]
struct LoopState {
    timers: SlotMap<TimerId, Timer>,
    frames: SlotMap<FrameId, FrameRequest>,
    seq: u64,
    last_frame: Option<Duration>,
}

enum Due {
    Timer(TimerId, Duration),
    Frame(Duration),
}

impl Due {
    fn at(&self) -> Duration {
        match self {
            Due::Timer(_, t) | Due::Frame(t) => *t,
        }
    }
}

struct LoopInner {
    clock: Box<dyn Clock>,
    origin: Instant,
    config: LoopConfig,
    state: RefCell<LoopState>,
}

/// Single-threaded timer and frame loop. Cloning yields another handle to the same loop.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    pub fn new(config: LoopConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: LoopConfig, clock: impl Clock) -> Self {
        let origin = clock.now();
        Self {
            inner: Rc::new(LoopInner {
                clock: Box::new(clock),
                origin,
                config,
                state: RefCell::new(LoopState::default()),
            }),
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.inner.config
    }

    /// This loop as a shared host handle.
    pub fn host(&self) -> Rc<dyn FrameHost> {
        Rc::new(self.clone())
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.state.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.state.borrow().frames.len()
    }

    /// Dispatches every timer and frame due within `span`, then leaves the clock at
    /// `now + span`. Against the system clock this blocks for the whole span.
    pub fn run_for(&self, span: Duration) {
        let deadline = self.now() + span;
        while let Some(due) = self.next_due() {
            if due.at() > deadline {
                break;
            }
            self.inner.clock.sleep_until(self.inner.origin + due.at());
            match due {
                Due::Timer(id, _) => self.fire_timer(id),
                Due::Frame(t) => self.fire_frame(t),
            }
        }
        self.inner.clock.sleep_until(self.inner.origin + deadline);
    }

    fn frame_nanos(&self) -> u64 {
        (self.inner.config.frame_interval.as_nanos() as u64).max(1)
    }

    fn next_frame_at(&self, state: &LoopState) -> Duration {
        let step = self.frame_nanos();
        let now = self.now().as_nanos() as u64;
        let mut at = Duration::from_nanos(now.div_ceil(step) * step);
        if let Some(last) = state.last_frame
            && at <= last
        {
            at = last + Duration::from_nanos(step);
        }
        at
    }

    fn next_due(&self) -> Option<Due> {
        let state = self.inner.state.borrow();
        let timer = state
            .timers
            .iter()
            .min_by_key(|(_, t)| (t.deadline, t.seq))
            .map(|(id, t)| Due::Timer(id, t.deadline));
        let frame = (!state.frames.is_empty()).then(|| Due::Frame(self.next_frame_at(&state)));
        match (timer, frame) {
            // Timers due at a frame boundary run before that frame.
            (Some(t), Some(f)) if f.at() < t.at() => Some(f),
            (Some(t), _) => Some(t),
            (None, f) => f,
        }
    }

    fn fire_timer(&self, id: TimerId) {
        let timer = self.inner.state.borrow_mut().timers.remove(id);
        if let Some(timer) = timer {
            (timer.callback)();
        }
    }

    fn fire_frame(&self, at: Duration) {
        let mut batch: Vec<FrameRequest> = {
            let mut state = self.inner.state.borrow_mut();
            state.last_frame = Some(at);
            state.frames.drain().map(|(_, f)| f).collect()
        };
        batch.sort_by_key(|f| f.seq);
        log::trace!("frame at {:?}: {} callback(s)", at, batch.len());
        for req in batch {
            (req.callback)(at);
        }
    }

    fn next_seq(state: &mut LoopState) -> u64 {
        state.seq += 1;
        state.seq
    }
}

impl FrameHost for EventLoop {
    fn now(&self) -> Duration {
        self.inner
            .clock
            .now()
            .saturating_duration_since(self.inner.origin)
    }

    fn has_frame_clock(&self) -> bool {
        self.inner.config.frame_clock
    }

    fn frame_time(&self) -> Option<Duration> {
        if !self.inner.config.frame_clock {
            return None;
        }
        // The frame clock starts with the first presented frame and then follows the grid.
        self.inner.state.borrow().last_frame?;
        let step = self.frame_nanos();
        let now = self.now().as_nanos() as u64;
        Some(Duration::from_nanos(now / step * step))
    }

    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        let deadline = self.now() + delay + self.inner.config.timer_slack;
        let mut state = self.inner.state.borrow_mut();
        let seq = Self::next_seq(&mut state);
        state.timers.insert(Timer {
            deadline,
            seq,
            callback,
        })
    }

    fn clear_timeout(&self, id: TimerId) {
        self.inner.state.borrow_mut().timers.remove(id);
    }

    fn request_frame(&self, callback: Box<dyn FnOnce(Duration)>) -> FrameId {
        let mut state = self.inner.state.borrow_mut();
        let seq = Self::next_seq(&mut state);
        state.frames.insert(FrameRequest { seq, callback })
    }

    fn cancel_frame(&self, id: FrameId) {
        self.inner.state.borrow_mut().frames.remove(id);
    }
}
