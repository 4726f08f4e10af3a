use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, CanvasRenderingContext2d, HtmlCanvasElement};

use super::{dom, Background, BackgroundSlot};
use crate::frame::FrameGate;
use crate::starfield::{StarfieldConfig, Starfield};

pub(crate) const CANVAS_ID: &str = "sky";

/// Canvas 2D starfield behind the page content.
pub(crate) struct Sky {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    field: RefCell<Starfield>,
    gate: RefCell<FrameGate>,
    // `frame` holds the animation-frame closure so that the loop can keep
    // handing the same callback to `request_animation_frame`.
    frame: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    on_resize: RefCell<Option<Closure<dyn FnMut()>>>,
}

/// Starts the starfield and parks it in `slot`. Failures are logged; the page
/// simply keeps its CSS background.
pub(crate) fn start_into(slot: &BackgroundSlot, config: StarfieldConfig) {
    match start(config) {
        Ok(sky) => *slot.borrow_mut() = Some(Background::Canvas(sky)),
        Err(e) => log::error!("starfield disabled: {:?}", e),
    }
}

pub(crate) fn start(config: StarfieldConfig) -> Result<Rc<Sky>, JsValue> {
    let window = window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let canvas = document
        .get_element_by_id(CANVAS_ID)
        .ok_or("background canvas not found")?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or("2D canvas not supported")?
        .dyn_into()?;

    let (w, h) = dom::window_size(&window)?;
    canvas.set_width(w as u32);
    canvas.set_height(h as u32);
    let sky = Rc::new(Sky {
        canvas,
        ctx,
        field: RefCell::new(Starfield::new(config, w, h, dom::random_seed())),
        gate: RefCell::new(FrameGate::new()),
        frame: RefCell::new(None),
        on_resize: RefCell::new(None),
    });

    let weak = Rc::downgrade(&sky);
    let on_resize = Closure::wrap(Box::new(move || {
        if let Some(sky) = weak.upgrade() {
            if let Err(e) = sky.fit_window() {
                log::warn!("starfield resize failed: {:?}", e);
            }
        }
    }) as Box<dyn FnMut()>);
    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;
    *sky.on_resize.borrow_mut() = Some(on_resize);

    let weak = Rc::downgrade(&sky);
    let mut origin: Option<f64> = None;
    *sky.frame.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
        let Some(sky) = weak.upgrade() else {
            return;
        };
        if !sky.gate.borrow_mut().begin_frame() {
            return;
        }
        let t0 = *origin.get_or_insert(now);
        sky.draw((now - t0) / 1000.0);

        // schedule next
        if let Err(e) = sky.schedule() {
            log::error!("starfield stopped: {:?}", e);
        }
    }) as Box<dyn FnMut(f64)>));

    sky.schedule()?;
    log::info!("starfield running with {} stars", sky.field.borrow().stars().len());
    Ok(sky)
}

impl Sky {
    fn schedule(&self) -> Result<(), JsValue> {
        let frame = self.frame.borrow();
        let callback = frame.as_ref().ok_or("frame callback dropped")?;
        let handle = window()
            .ok_or("no window")?
            .request_animation_frame(callback.as_ref().unchecked_ref())?;
        self.gate.borrow_mut().scheduled(handle);
        Ok(())
    }

    fn fit_window(&self) -> Result<(), JsValue> {
        let (w, h) = dom::window_size(&window().ok_or("no window")?)?;
        self.canvas.set_width(w as u32);
        self.canvas.set_height(h as u32);
        self.field.borrow_mut().resize(w, h);
        Ok(())
    }

    fn draw(&self, t: f64) {
        let field = self.field.borrow();
        let (w, h) = field.size();
        let ctx = &self.ctx;
        ctx.set_global_alpha(1.0);
        ctx.set_fill_style_str(&field.config().background);
        ctx.fill_rect(0.0, 0.0, w, h);

        ctx.set_fill_style_str("#ffffff");
        for star in field.sprites(t) {
            ctx.set_global_alpha(star.alpha);
            ctx.begin_path();
            if ctx.arc(star.x, star.y, star.radius, 0.0, TAU).is_ok() {
                ctx.fill();
            }
        }
        ctx.set_global_alpha(1.0);
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        !self.gate.borrow().is_stopped() && self.frame.borrow().is_some()
    }

    /// Cancels the queued frame and detaches the resize listener.
    pub(crate) fn stop(&self) {
        let pending = self.gate.borrow_mut().stop();
        let Some(window) = window() else {
            return;
        };
        if let Some(handle) = pending {
            if let Err(e) = window.cancel_animation_frame(handle) {
                log::warn!("cancelAnimationFrame failed: {:?}", e);
            }
        }
        if let Some(on_resize) = self.on_resize.borrow_mut().take() {
            let _ = window
                .remove_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref());
        }
        self.frame.borrow_mut().take();
    }
}
