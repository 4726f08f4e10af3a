#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

pub mod celestial;
pub mod config;
pub mod frame;
pub mod starfield;
pub mod video;

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::prelude::*;
    use web_sys::PageTransitionEvent;

    use crate::config::{Renderer, SiteConfig};

    mod chart;
    mod dom;
    mod loader;
    mod sky;

    /// Whatever is painting the background right now.
    pub(crate) enum Background {
        Canvas(Rc<sky::Sky>),
        Chart(Rc<chart::Chart>),
    }

    impl Background {
        fn stop(&self) {
            match self {
                Background::Canvas(sky) => sky.stop(),
                Background::Chart(chart) => chart.stop(),
            }
        }
    }

    pub(crate) type BackgroundSlot = Rc<RefCell<Option<Background>>>;

    /// Everything started for this page that must be released on unload.
    struct Page {
        videos: RefCell<Option<Rc<loader::VideoLoader>>>,
        background: BackgroundSlot,
    }

    impl Page {
        /// Tears down unless the page is only entering the back/forward cache.
        /// Returns whether teardown ran.
        fn on_pagehide(&self, persisted: bool) -> bool {
            if persisted {
                log::debug!("page kept in back/forward cache, staying alive");
                return false;
            }
            log::info!("page unloading, tearing down");
            let videos = self.videos.borrow_mut().take();
            if let Some(loader) = videos {
                loader.teardown();
            }
            let current = self.background.borrow_mut().take();
            if let Some(bg) = current {
                bg.stop();
            }
            true
        }
    }

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).ok();

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let config = match document.get_element_by_id(sky::CANVAS_ID) {
            Some(canvas) => dom::site_config(&canvas).unwrap_or_else(|e| {
                log::warn!("ignoring page configuration: {e}");
                SiteConfig::default()
            }),
            None => SiteConfig::default(),
        };

        let videos = match loader::VideoLoader::start(&document, config.loader.clone()) {
            Ok(loader) => Some(loader),
            Err(e) => {
                log::error!("video loader failed to start: {:?}", e);
                None
            }
        };

        let background: BackgroundSlot = Rc::new(RefCell::new(None));
        match config.renderer {
            Renderer::Canvas => sky::start_into(&background, config.starfield.clone()),
            Renderer::Celestial => chart::start(&background, config.chart.clone(), config.starfield.clone()),
        }

        let page = Page {
            videos: RefCell::new(videos),
            background,
        };
        let teardown = Closure::wrap(Box::new(move |event: PageTransitionEvent| {
            page.on_pagehide(event.persisted());
        }) as Box<dyn FnMut(PageTransitionEvent)>);
        window.add_event_listener_with_callback("pagehide", teardown.as_ref().unchecked_ref())?;
        teardown.forget();

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use wasm_bindgen_test::*;

        use crate::starfield::StarfieldConfig;
        use crate::video::LoaderConfig;

        wasm_bindgen_test_configure!(run_in_browser);

        fn page_with_sky() -> (Page, Rc<loader::VideoLoader>, Rc<sky::Sky>, web_sys::Element) {
            let document = web_sys::window().unwrap().document().unwrap();
            let canvas = document.create_element("canvas").unwrap();
            canvas.set_id(sky::CANVAS_ID);
            document.body().unwrap().append_child(&canvas).unwrap();

            let loader = loader::VideoLoader::new(LoaderConfig::default());
            let sky = sky::start(StarfieldConfig::default()).unwrap();
            let page = Page {
                videos: RefCell::new(Some(Rc::clone(&loader))),
                background: Rc::new(RefCell::new(Some(Background::Canvas(Rc::clone(&sky))))),
            };
            (page, loader, sky, canvas)
        }

        #[wasm_bindgen_test]
        fn bfcache_pagehide_keeps_page_alive() {
            let (page, loader, sky, canvas) = page_with_sky();

            assert!(!page.on_pagehide(true));
            assert!(page.videos.borrow().is_some());
            assert!(page.background.borrow().is_some());
            assert!(!loader.is_torn_down());
            assert!(sky.is_running());

            page.on_pagehide(false);
            canvas.remove();
        }

        #[wasm_bindgen_test]
        fn unloading_pagehide_tears_everything_down() {
            let (page, loader, sky, canvas) = page_with_sky();

            assert!(page.on_pagehide(false));
            assert!(page.videos.borrow().is_none());
            assert!(page.background.borrow().is_none());
            assert!(loader.is_torn_down());
            assert!(!sky.is_running());

            assert!(page.on_pagehide(false));
            canvas.remove();
        }
    }
}
