//! Ticks a counter in a JSON store from a frame-locked interval and re-renders
//! a selection of it whenever the ticked field changes.
//!
//! `HOOKWORK_FRAME_HZ` overrides the frame rate, `RUST_LOG=debug` shows the
//! scheduler's bookkeeping.

use std::rc::Rc;

use hookwork_core::*;
use hookwork_hooks::{use_animation_interval, use_store};
use serde_json::json;
use web_time::Duration;

const TICK: Duration = Duration::from_millis(250);
const SLICE: Duration = Duration::from_millis(100);
const SLICES: usize = 20;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = LoopConfig::from_env()?;
    log::info!("frame interval {:?}", config.frame_interval);
    let ev = EventLoop::new(config);
    let host = ev.host();

    let store = Store::new(Value::from(json!({
        "ticks": 0,
        "title": "ticker",
        "last_frame_ms": null,
    })));
    let source = store.source();

    let app = || {
        let on_tick = remember(|| {
            let store = store.clone();
            Rc::new(move |t: Duration| {
                let n = store.with(|s| s.get("ticks").and_then(Value::as_f64).unwrap_or(0.0));
                let writes = store
                    .set_path("ticks", Value::from(n + 1.0))
                    .and_then(|_| store.set_path("last_frame_ms", Value::from(t.as_millis() as u64)));
                if let Err(e) = writes {
                    log::warn!("tick not recorded: {e}");
                }
            }) as Rc<dyn Fn(Duration)>
        });
        use_animation_interval(&host, TICK, (*on_tick).clone());

        use_store(
            &source,
            Selector::paths([("ticks", "ticks"), ("title", "title"), ("missing", "a.b.c")]),
        )
    };

    let mut comp = Composition::new();
    let first = comp.compose(app);
    println!("{}", serde_json::to_string(&first)?);

    for _ in 0..SLICES {
        ev.run_for(SLICE);
        if let Some(sel) = comp.recompose_if_dirty(app) {
            println!("{}", serde_json::to_string(&sel)?);
        }
    }

    let renders = comp.render_count();
    comp.dispose();
    log::info!(
        "rendered {} times, {} timers and {} frames left",
        renders,
        ev.pending_timers(),
        ev.pending_frames()
    );
    Ok(())
}
