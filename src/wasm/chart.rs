use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::Window;

use super::{dom, sky, Background, BackgroundSlot};
use crate::celestial::{ChartOptions, LibraryWait, PollOutcome, SimClock};
use crate::starfield::StarfieldConfig;

const LIBRARY_GLOBAL: &str = "Celestial";
const TICK_MS: i32 = 100;
/// Simulated seconds per real second.
const SPEEDUP: f64 = 60.0;

#[derive(Clone, Copy)]
enum Timer {
    Timeout(i32),
    Interval(i32),
}

/// Drives the third-party celestial chart, or hands over to the canvas
/// starfield when the library never loads.
pub(crate) struct Chart {
    stopped: Cell<bool>,
    timer: Cell<Option<Timer>>,
    clock: Cell<SimClock>,
    tick: RefCell<Option<Closure<dyn FnMut()>>>,
}

pub(crate) fn start(slot: &BackgroundSlot, options: ChartOptions, fallback: StarfieldConfig) {
    let chart = Rc::new(Chart {
        stopped: Cell::new(false),
        timer: Cell::new(None),
        clock: Cell::new(SimClock::new(js_sys::Date::now(), SPEEDUP, TICK_MS)),
        tick: RefCell::new(None),
    });
    *slot.borrow_mut() = Some(Background::Chart(Rc::clone(&chart)));
    chart.poll(slot.clone(), options, fallback, LibraryWait::default());
}

fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let func: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let array = Array::new();
    for arg in args {
        array.push(arg);
    }
    func.apply(target, &array)
}

impl Chart {
    fn poll(
        self: &Rc<Self>,
        slot: BackgroundSlot,
        options: ChartOptions,
        fallback: StarfieldConfig,
        mut wait: LibraryWait,
    ) {
        if self.stopped.get() {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        match wait.poll(dom::has_global(&window, LIBRARY_GLOBAL)) {
            PollOutcome::Ready => {
                if let Err(e) = self.display(&window, &options) {
                    log::error!("celestial chart failed, using canvas starfield: {:?}", e);
                    self.fall_back(&slot, fallback);
                }
            }
            PollOutcome::Retry => {
                let delay = wait.interval_ms;
                let chart = Rc::clone(self);
                let retry = Closure::once_into_js(move || chart.poll(slot, options, fallback, wait));
                match window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(retry.unchecked_ref(), delay)
                {
                    Ok(id) => self.timer.set(Some(Timer::Timeout(id))),
                    Err(e) => log::error!("could not schedule celestial poll: {:?}", e),
                }
            }
            PollOutcome::GiveUp => {
                log::warn!(
                    "{LIBRARY_GLOBAL} not available after {} attempts, using canvas starfield",
                    wait.attempts()
                );
                self.fall_back(&slot, fallback);
            }
        }
    }

    fn fall_back(&self, slot: &BackgroundSlot, fallback: StarfieldConfig) {
        self.stop();
        sky::start_into(slot, fallback);
    }

    fn display(self: &Rc<Self>, window: &Window, options: &ChartOptions) -> Result<(), JsValue> {
        let library = Reflect::get(window, &JsValue::from_str(LIBRARY_GLOBAL))?;
        let json = options
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        call(&library, "display", &[js_sys::JSON::parse(&json)?])?;
        self.clock
            .set(SimClock::new(js_sys::Date::now(), SPEEDUP, TICK_MS));

        let weak = Rc::downgrade(self);
        let tick = Closure::wrap(Box::new(move || {
            let Some(chart) = weak.upgrade() else {
                return;
            };
            let mut clock = chart.clock.get();
            let date = js_sys::Date::new(&JsValue::from_f64(clock.tick()));
            chart.clock.set(clock);
            if let Err(e) =
                call(&library, "date", &[date.into()]).and_then(|_| call(&library, "redraw", &[]))
            {
                log::warn!("celestial redraw failed: {:?}", e);
            }
        }) as Box<dyn FnMut()>);
        let id = window.set_interval_with_callback_and_timeout_and_arguments_0(
            tick.as_ref().unchecked_ref(),
            TICK_MS,
        )?;
        self.timer.set(Some(Timer::Interval(id)));
        *self.tick.borrow_mut() = Some(tick);
        log::info!("celestial chart running ({})", options.projection);
        Ok(())
    }

    pub(crate) fn stop(&self) {
        self.stopped.set(true);
        if let (Some(timer), Some(window)) = (self.timer.take(), web_sys::window()) {
            match timer {
                Timer::Timeout(id) => window.clear_timeout_with_handle(id),
                Timer::Interval(id) => window.clear_interval_with_handle(id),
            }
        }
        self.tick.borrow_mut().take();
    }
}
