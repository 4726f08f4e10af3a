use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Document, Element, HtmlVideoElement, IntersectionObserver, IntersectionObserverEntry,
    IntersectionObserverInit,
};

use super::dom;
use crate::video::{parse_index, Effect, LoaderConfig, LoaderError, LoaderSession, ReadyState, Strategy};

const VIDEO_SELECTOR: &str = "video[data-src]";
const CARD_SELECTOR: &str = ".video-card";

type ObserverCallback = Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>;

#[derive(Clone, Copy)]
enum Overlay {
    Spinner,
    Error,
    Prompt,
    Hidden,
}

/// Drives the lazy videos on the page. Platform events are turned into
/// [`LoaderSession`] transitions and the resulting effects are applied here.
pub(crate) struct VideoLoader {
    session: RefCell<LoaderSession>,
    videos: RefCell<BTreeMap<usize, HtmlVideoElement>>,
    cards: RefCell<Vec<(Element, usize)>>,
    load_observer: RefCell<Option<IntersectionObserver>>,
    visibility_observer: RefCell<Option<IntersectionObserver>>,
    // One click handler per video with a live play button; replaced on retry.
    prompts: RefCell<BTreeMap<usize, Closure<dyn FnMut()>>>,
}

impl VideoLoader {
    pub(crate) fn new(config: LoaderConfig) -> Rc<Self> {
        Rc::new(Self {
            session: RefCell::new(LoaderSession::new(config)),
            videos: RefCell::new(BTreeMap::new()),
            cards: RefCell::new(Vec::new()),
            load_observer: RefCell::new(None),
            visibility_observer: RefCell::new(None),
            prompts: RefCell::new(BTreeMap::new()),
        })
    }

    pub(crate) fn start(document: &Document, config: LoaderConfig) -> Result<Rc<Self>, JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let loader = Self::new(config);

        let nodes = document.query_selector_all(VIDEO_SELECTOR)?;
        for position in 0..nodes.length() {
            let Some(video) = nodes
                .get(position)
                .and_then(|n| n.dyn_into::<HtmlVideoElement>().ok())
            else {
                continue;
            };
            if let Err(e) = loader.register(&video, position as usize) {
                log::warn!("skipping lazy video: {e}");
            }
        }
        if loader.session.borrow().is_empty() {
            return Ok(loader);
        }

        match Strategy::select(dom::has_intersection_observer(&window)) {
            Strategy::Observe => loader.observe()?,
            Strategy::EagerLoadAll => {
                log::info!("IntersectionObserver unavailable, loading every video now");
                let batches = loader.session.borrow_mut().eager_load_all();
                for (index, effects) in batches {
                    loader.apply(index, effects);
                }
            }
        }
        log::info!("lazy loader watching {} videos", loader.session.borrow().len());
        Ok(loader)
    }

    fn register(self: &Rc<Self>, video: &HtmlVideoElement, position: usize) -> Result<(), LoaderError> {
        let index = match video.get_attribute("data-index") {
            Some(raw) => parse_index(&raw)?,
            None => {
                // Lookups from observer callbacks go through the attribute.
                let _ = video.set_attribute("data-index", &position.to_string());
                position
            }
        };
        let src = video.get_attribute("data-src").unwrap_or_default();
        self.session.borrow_mut().register(index, &src)?;
        self.videos.borrow_mut().insert(index, video.clone());
        if let Err(e) = self.subscribe(video, index) {
            log::warn!("video {index}: could not subscribe to media events: {:?}", e);
        }
        Ok(())
    }

    /// Media events are subscribed exactly once per element; the session
    /// ignores anything that does not fit the current state.
    fn subscribe(self: &Rc<Self>, video: &HtmlVideoElement, index: usize) -> Result<(), JsValue> {
        let handlers: [(&str, fn(&mut LoaderSession, usize) -> Vec<Effect>); 2] = [
            ("loadeddata", LoaderSession::on_loaded_data),
            ("error", LoaderSession::on_load_error),
        ];
        for (event, transition) in handlers {
            let weak = Rc::downgrade(self);
            let callback = Closure::wrap(Box::new(move || {
                if let Some(loader) = weak.upgrade() {
                    loader.dispatch(index, |s| transition(s, index));
                }
            }) as Box<dyn FnMut()>);
            video.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
            callback.forget();
        }
        Ok(())
    }

    fn observe(self: &Rc<Self>) -> Result<(), JsValue> {
        let config = self.session.borrow().config().clone();

        let weak = Rc::downgrade(self);
        let on_load: ObserverCallback = Closure::wrap(Box::new(
            move |entries: js_sys::Array, _: IntersectionObserver| {
                let Some(loader) = weak.upgrade() else {
                    return;
                };
                for entry in entries.iter() {
                    let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                        continue;
                    };
                    let Some(index) = video_index(&entry.target()) else {
                        continue;
                    };
                    let (hit, ratio) = (entry.is_intersecting(), entry.intersection_ratio());
                    loader.dispatch(index, |s| s.on_intersection(index, hit, ratio));
                }
            },
        ) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);
        let init = IntersectionObserverInit::new();
        init.set_root_margin(&config.root_margin);
        init.set_threshold(&JsValue::from_f64(config.load_threshold));
        let load_observer =
            IntersectionObserver::new_with_options(on_load.as_ref().unchecked_ref(), &init)?;
        on_load.forget();

        let weak = Rc::downgrade(self);
        let on_visibility: ObserverCallback = Closure::wrap(Box::new(
            move |entries: js_sys::Array, _: IntersectionObserver| {
                let Some(loader) = weak.upgrade() else {
                    return;
                };
                for entry in entries.iter() {
                    let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                        continue;
                    };
                    loader.card_visibility(&entry);
                }
            },
        ) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);
        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from_f64(config.visibility_threshold));
        let visibility_observer =
            IntersectionObserver::new_with_options(on_visibility.as_ref().unchecked_ref(), &init)?;
        on_visibility.forget();

        for video in self.videos.borrow().values() {
            load_observer.observe(video);
        }
        *self.load_observer.borrow_mut() = Some(load_observer);
        *self.visibility_observer.borrow_mut() = Some(visibility_observer);
        Ok(())
    }

    fn card_visibility(self: &Rc<Self>, entry: &IntersectionObserverEntry) {
        self.card_ratio(&entry.target(), entry.intersection_ratio());
    }

    /// Feeds a card's visible ratio to every video inside that card.
    fn card_ratio(self: &Rc<Self>, card: &Element, ratio: f64) {
        let indices: Vec<usize> = self
            .cards
            .borrow()
            .iter()
            .filter(|(el, _)| el == card)
            .map(|(_, index)| *index)
            .collect();
        for index in indices {
            let Some(ready) = self.videos.borrow().get(&index).map(|v| v.ready_state()) else {
                continue;
            };
            self.dispatch(index, |s| s.on_visibility(index, ratio, ReadyState::from(ready)));
        }
    }

    fn dispatch(self: &Rc<Self>, index: usize, transition: impl FnOnce(&mut LoaderSession) -> Vec<Effect>) {
        let effects = transition(&mut self.session.borrow_mut());
        self.apply(index, effects);
    }

    fn apply(self: &Rc<Self>, index: usize, effects: Vec<Effect>) {
        if effects.is_empty() {
            return;
        }
        let Some(video) = self.videos.borrow().get(&index).cloned() else {
            return;
        };
        for effect in effects {
            if let Err(e) = self.run(index, &video, effect) {
                log::warn!("video {index}: {:?}", e);
            }
        }
    }

    fn run(self: &Rc<Self>, index: usize, video: &HtmlVideoElement, effect: Effect) -> Result<(), JsValue> {
        match effect {
            Effect::StopObserving => {
                if let Some(observer) = self.load_observer.borrow().as_ref() {
                    observer.unobserve(video);
                }
            }
            Effect::ShowSpinner => {
                set_overlay(video, Overlay::Spinner)?;
            }
            Effect::BeginLoad { src } => {
                video.set_src(&src);
                video.load();
            }
            Effect::MarkLoaded => video.class_list().add_1("loaded")?,
            Effect::RequestPlay => self.request_play(index, video, false),
            Effect::Resume => self.request_play(index, video, true),
            Effect::ShowErrorGlyph => {
                set_overlay(video, Overlay::Error)?;
            }
            Effect::ShowPlayButton => self.show_play_button(index, video)?,
            Effect::ClearOverlay => {
                set_overlay(video, Overlay::Hidden)?;
            }
            Effect::WatchVisibility => self.watch_visibility(index, video),
            Effect::Pause => video.pause()?,
            Effect::DisconnectAll => self.disconnect(),
        }
        Ok(())
    }

    fn request_play(self: &Rc<Self>, index: usize, video: &HtmlVideoElement, resume: bool) {
        let promise = match video.play() {
            Ok(promise) => promise,
            Err(e) => {
                log::debug!("video {index}: play() threw {:?}", e);
                if !resume {
                    self.dispatch(index, |s| s.on_play_rejected(index));
                }
                return;
            }
        };
        let weak = Rc::downgrade(self);
        spawn_local(async move {
            let outcome = JsFuture::from(promise).await;
            let Some(loader) = weak.upgrade() else {
                return;
            };
            match (outcome, resume) {
                (Ok(_), false) => loader.dispatch(index, |s| s.on_play_resolved(index)),
                (Err(e), false) => {
                    log::debug!("video {index}: autoplay rejected: {:?}", e);
                    loader.dispatch(index, |s| s.on_play_rejected(index));
                }
                (Err(e), true) => log::debug!("video {index}: resume rejected: {:?}", e),
                (Ok(_), true) => {}
            }
        });
    }

    fn show_play_button(self: &Rc<Self>, index: usize, video: &HtmlVideoElement) -> Result<(), JsValue> {
        let Some(overlay) = set_overlay(video, Overlay::Prompt)? else {
            return Ok(());
        };
        let document = overlay.owner_document().ok_or("overlay is detached")?;
        let button = document.create_element("button")?;
        button.set_class_name("play-button");
        button.set_attribute("type", "button")?;
        button.set_attribute("aria-label", "Play video")?;
        button.set_text_content(Some("\u{25B6}"));

        let weak = Rc::downgrade(self);
        let on_click = Closure::wrap(Box::new(move || {
            if let Some(loader) = weak.upgrade() {
                loader.dispatch(index, |s| s.on_manual_play(index));
            }
        }) as Box<dyn FnMut()>);
        button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
        overlay.append_child(&button)?;
        self.prompts.borrow_mut().insert(index, on_click);
        Ok(())
    }

    fn watch_visibility(&self, index: usize, video: &HtmlVideoElement) {
        let observer = self.visibility_observer.borrow();
        let Some(observer) = observer.as_ref() else {
            return;
        };
        let card = video
            .closest(CARD_SELECTOR)
            .ok()
            .flatten()
            .unwrap_or_else(|| video.clone().into());
        observer.observe(&card);
        self.cards.borrow_mut().push((card, index));
    }

    fn disconnect(&self) {
        for slot in [&self.load_observer, &self.visibility_observer] {
            if let Some(observer) = slot.borrow_mut().take() {
                observer.disconnect();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_torn_down(&self) -> bool {
        self.session.borrow().is_torn_down()
    }

    pub(crate) fn teardown(&self) {
        let effects = self.session.borrow_mut().teardown();
        if effects.contains(&Effect::DisconnectAll) {
            self.disconnect();
        }
        self.cards.borrow_mut().clear();
        self.videos.borrow_mut().clear();
        self.prompts.borrow_mut().clear();
    }
}

fn video_index(target: &Element) -> Option<usize> {
    parse_index(&target.get_attribute("data-index")?).ok()
}

/// Switches the overlay sibling into `kind` and returns it, or `None` when the
/// markup has no overlay after the video.
fn set_overlay(video: &HtmlVideoElement, kind: Overlay) -> Result<Option<Element>, JsValue> {
    let Some(overlay) = video.next_element_sibling() else {
        return Ok(None);
    };
    let classes = overlay.class_list();
    classes.remove_4("loading", "error", "blocked", "hidden")?;
    overlay.set_inner_html("");
    match kind {
        Overlay::Spinner => classes.add_1("loading")?,
        Overlay::Error => {
            classes.add_1("error")?;
            overlay.set_text_content(Some("\u{26A0}"));
        }
        Overlay::Prompt => classes.add_1("blocked")?,
        Overlay::Hidden => classes.add_1("hidden")?,
    }
    Ok(Some(overlay))
}
