use std::rc::Rc;

use hookwork_core::{CancellationToken, FrameHost, animation_interval, disposable_effect, on_unmount};
use web_time::Duration;

/// Runs `callback` every `interval` on frame boundaries while the caller stays composed.
///
/// A new session replaces the old one whenever `interval` or the callback's
/// identity (the `Rc` allocation) changes; the old session is cancelled first.
/// Unmounting cancels the running session.
pub fn use_animation_interval(
    host: &Rc<dyn FrameHost>,
    interval: Duration,
    callback: Rc<dyn Fn(Duration)>,
) {
    let key = (interval, Rc::as_ptr(&callback).cast::<()>() as usize);
    let host = host.clone();
    disposable_effect(key, move || {
        let token = CancellationToken::new();
        animation_interval(host, interval, token.clone(), move |t| callback(t));
        on_unmount(move || {
            log::trace!("animation interval unmounted");
            token.cancel();
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwork_core::{Composition, EventLoop, LoopConfig, TestClock};
    use std::cell::RefCell;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn setup() -> (EventLoop, Rc<dyn FrameHost>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let ev = EventLoop::with_clock(LoopConfig::with_frame_interval(ms(10)), TestClock::new());
        let host = ev.host();
        (ev, host)
    }

    fn tagged(log: &Rc<RefCell<Vec<(&'static str, Duration)>>>, tag: &'static str) -> Rc<dyn Fn(Duration)> {
        let log = log.clone();
        Rc::new(move |t| log.borrow_mut().push((tag, t)))
    }

    #[test]
    fn runs_while_composed_and_stops_on_unmount() {
        let (ev, host) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb = tagged(&log, "a");
        let mut comp = Composition::new();

        comp.compose(|| use_animation_interval(&host, ms(100), cb.clone()));
        ev.run_for(ms(250));
        comp.compose(|| use_animation_interval(&host, ms(100), cb.clone()));
        ev.run_for(ms(100));
        assert_eq!(log.borrow().len(), 3);

        comp.dispose();
        ev.run_for(ms(500));
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn interval_change_replaces_session() {
        let (ev, host) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let cb = tagged(&log, "a");
        let mut comp = Composition::new();

        comp.compose(|| use_animation_interval(&host, ms(100), cb.clone()));
        ev.run_for(ms(150));
        comp.compose(|| use_animation_interval(&host, ms(40), cb.clone()));
        ev.run_for(ms(100));

        // One 100ms firing, then the 40ms session anchored at the 150ms frame.
        let times: Vec<Duration> = log.borrow().iter().map(|(_, t)| *t).collect();
        assert_eq!(times, vec![ms(100), ms(190), ms(230)]);
    }

    #[test]
    fn new_callback_identity_replaces_session() {
        let (ev, host) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = tagged(&log, "first");
        let second = tagged(&log, "second");
        let mut comp = Composition::new();

        comp.compose(|| use_animation_interval(&host, ms(100), first.clone()));
        ev.run_for(ms(150));
        comp.compose(|| use_animation_interval(&host, ms(100), second.clone()));
        ev.run_for(ms(200));

        let tags: Vec<&str> = log.borrow().iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, vec!["first", "second", "second"]);
        assert_eq!(ev.pending_timers() + ev.pending_frames(), 1);
    }
}
