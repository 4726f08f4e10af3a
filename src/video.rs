//! Lazy video loading as an explicit state machine.
//!
//! Nothing in here touches the DOM. The browser adapter feeds platform events
//! into a [`LoaderSession`] and executes the [`Effect`]s it returns.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("video {0} has no data-src")]
    MissingSource(usize),
    #[error("video index {0} registered twice")]
    DuplicateIndex(usize),
    #[error("invalid data-index {0:?}")]
    InvalidIndex(String),
}

/// Mirrors `HTMLMediaElement.readyState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl From<u16> for ReadyState {
    fn from(raw: u16) -> Self {
        match raw {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoaderConfig {
    /// Margin around the viewport for the load observer, CSS syntax.
    pub root_margin: String,
    /// Minimum visible fraction before a video starts loading.
    pub load_threshold: f64,
    /// Visible fraction of the card below which playback pauses.
    pub visibility_threshold: f64,
    pub resume_ready_state: ReadyState,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root_margin: "50px".to_string(),
            load_threshold: 0.1,
            visibility_threshold: 0.5,
            resume_ready_state: ReadyState::HaveFutureData,
        }
    }
}

/// How videos get loaded, picked once at start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Observe,
    EagerLoadAll,
}

impl Strategy {
    pub fn select(has_intersection_observer: bool) -> Self {
        if has_intersection_observer {
            Strategy::Observe
        } else {
            Strategy::EagerLoadAll
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoState {
    Unloaded,
    Loading,
    Loaded,
    Playing,
    Paused,
    Errored,
    AutoplayBlocked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    StopObserving,
    ShowSpinner,
    BeginLoad { src: String },
    MarkLoaded,
    RequestPlay,
    ShowErrorGlyph,
    ShowPlayButton,
    ClearOverlay,
    WatchVisibility,
    Pause,
    Resume,
    DisconnectAll,
}

#[derive(Clone, Debug)]
pub struct VideoEntry {
    pub index: usize,
    pub src: String,
    pub state: VideoState,
    watching: bool,
}

impl VideoEntry {
    pub fn new(index: usize, src: impl Into<String>) -> Self {
        Self {
            index,
            src: src.into(),
            state: VideoState::Unloaded,
            watching: false,
        }
    }
}

/// Parses the `data-index` attribute of a lazy video.
pub fn parse_index(raw: &str) -> Result<usize, LoaderError> {
    raw.trim()
        .parse()
        .map_err(|_| LoaderError::InvalidIndex(raw.to_string()))
}

/// Per-page loader context: entries, the seen-set guarding `load_video`, and
/// the set of videos whose data arrived.
#[derive(Debug, Default)]
pub struct LoaderSession {
    config: LoaderConfig,
    entries: BTreeMap<usize, VideoEntry>,
    seen: HashSet<usize>,
    loaded: HashSet<usize>,
    torn_down: bool,
}

impl LoaderSession {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn register(&mut self, index: usize, src: &str) -> Result<(), LoaderError> {
        if src.trim().is_empty() {
            return Err(LoaderError::MissingSource(index));
        }
        if self.entries.contains_key(&index) {
            return Err(LoaderError::DuplicateIndex(index));
        }
        self.entries.insert(index, VideoEntry::new(index, src.trim()));
        Ok(())
    }

    pub fn state(&self, index: usize) -> Option<VideoState> {
        self.entries.get(&index).map(|e| e.state)
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.loaded.contains(&index)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    fn entry_mut(&mut self, index: usize) -> Option<&mut VideoEntry> {
        if self.torn_down {
            return None;
        }
        let entry = self.entries.get_mut(&index);
        if entry.is_none() {
            debug!("ignoring event for unknown video {index}");
        }
        entry
    }

    pub fn on_intersection(&mut self, index: usize, intersecting: bool, ratio: f64) -> Vec<Effect> {
        let threshold = self.config.load_threshold;
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        if entry.state != VideoState::Unloaded || !intersecting || ratio < threshold {
            return Vec::new();
        }
        let mut effects = vec![Effect::StopObserving];
        effects.extend(self.load_video(index));
        effects
    }

    /// Starts loading `index`. Only the first call for an index has effects.
    pub fn load_video(&mut self, index: usize) -> Vec<Effect> {
        if self.torn_down || !self.seen.insert(index) {
            return Vec::new();
        }
        let Some(entry) = self.entries.get_mut(&index) else {
            self.seen.remove(&index);
            debug!("load requested for unknown video {index}");
            return Vec::new();
        };
        entry.state = VideoState::Loading;
        debug!("loading video {index} from {}", entry.src);
        vec![
            Effect::ShowSpinner,
            Effect::BeginLoad {
                src: entry.src.clone(),
            },
        ]
    }

    pub fn on_loaded_data(&mut self, index: usize) -> Vec<Effect> {
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        if entry.state != VideoState::Loading {
            return Vec::new();
        }
        entry.state = VideoState::Loaded;
        self.loaded.insert(index);
        vec![Effect::MarkLoaded, Effect::RequestPlay]
    }

    pub fn on_load_error(&mut self, index: usize) -> Vec<Effect> {
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        if entry.state != VideoState::Loading {
            return Vec::new();
        }
        entry.state = VideoState::Errored;
        warn!("video {index} failed to load from {}", entry.src);
        vec![Effect::ShowErrorGlyph]
    }

    pub fn on_play_resolved(&mut self, index: usize) -> Vec<Effect> {
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        if entry.state != VideoState::Loaded {
            return Vec::new();
        }
        entry.state = VideoState::Playing;
        let mut effects = vec![Effect::ClearOverlay];
        if !entry.watching {
            entry.watching = true;
            effects.push(Effect::WatchVisibility);
        }
        effects
    }

    pub fn on_play_rejected(&mut self, index: usize) -> Vec<Effect> {
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        if entry.state != VideoState::Loaded {
            return Vec::new();
        }
        entry.state = VideoState::AutoplayBlocked;
        info!("autoplay blocked for video {index}, offering play button");
        vec![Effect::ShowPlayButton]
    }

    pub fn on_manual_play(&mut self, index: usize) -> Vec<Effect> {
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        if entry.state != VideoState::AutoplayBlocked {
            return Vec::new();
        }
        entry.state = VideoState::Loaded;
        vec![Effect::ClearOverlay, Effect::RequestPlay]
    }

    pub fn on_visibility(&mut self, index: usize, ratio: f64, ready: ReadyState) -> Vec<Effect> {
        let threshold = self.config.visibility_threshold;
        let min_ready = self.config.resume_ready_state;
        let Some(entry) = self.entry_mut(index) else {
            return Vec::new();
        };
        match entry.state {
            VideoState::Playing if ratio < threshold => {
                entry.state = VideoState::Paused;
                vec![Effect::Pause]
            }
            VideoState::Paused if ratio >= threshold && ready >= min_ready => {
                entry.state = VideoState::Playing;
                vec![Effect::Resume]
            }
            _ => Vec::new(),
        }
    }

    /// Fallback when the browser cannot observe intersections.
    pub fn eager_load_all(&mut self) -> Vec<(usize, Vec<Effect>)> {
        let pending: Vec<usize> = self
            .entries
            .values()
            .filter(|e| e.state == VideoState::Unloaded)
            .map(|e| e.index)
            .collect();
        pending
            .into_iter()
            .map(|index| (index, self.load_video(index)))
            .collect()
    }

    pub fn teardown(&mut self) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }
        self.torn_down = true;
        self.entries.clear();
        self.seen.clear();
        self.loaded.clear();
        vec![Effect::DisconnectAll]
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_follows_capability() {
        assert_eq!(Strategy::select(true), Strategy::Observe);
        assert_eq!(Strategy::select(false), Strategy::EagerLoadAll);
    }

    #[test]
    fn ready_state_clamps_unknown_values() {
        assert_eq!(ReadyState::from(3), ReadyState::HaveFutureData);
        assert_eq!(ReadyState::from(9), ReadyState::HaveEnoughData);
    }

    #[test]
    fn parse_index_rejects_garbage() {
        assert_eq!(parse_index(" 4 "), Ok(4));
        assert_eq!(
            parse_index("four"),
            Err(LoaderError::InvalidIndex("four".into()))
        );
    }

    #[test]
    fn register_validates_input() {
        let mut session = LoaderSession::default();
        assert_eq!(session.register(0, "  "), Err(LoaderError::MissingSource(0)));
        session.register(0, "a.mp4").unwrap();
        assert_eq!(
            session.register(0, "b.mp4"),
            Err(LoaderError::DuplicateIndex(0))
        );
    }

    #[test]
    fn shallow_intersection_does_not_load() {
        let mut session = LoaderSession::default();
        session.register(1, "a.mp4").unwrap();
        assert!(session.on_intersection(1, true, 0.05).is_empty());
        assert!(session.on_intersection(1, false, 0.0).is_empty());
        assert_eq!(session.state(1), Some(VideoState::Unloaded));
    }
}
