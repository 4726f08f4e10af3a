//! Options and timing for the optional celestial-chart background.
//!
//! The chart library itself is loaded by a `<script>` tag; this module only
//! decides what to hand it and how long to wait for it.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub container: String,
    pub projection: String,
    pub transform: String,
    /// Observer latitude and longitude in degrees.
    pub geopos: [f64; 2],
    pub follow: String,
    pub interactive: bool,
    pub controls: bool,
    pub background: Background,
    pub stars: StarOptions,
    pub dsos: Toggle,
    pub constellations: ConstellationOptions,
    pub mw: Toggle,
    pub lines: LineOptions,
    pub planets: Toggle,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    pub fill: String,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarOptions {
    pub show: bool,
    pub limit: f64,
    pub colors: bool,
    pub names: bool,
    pub proper: bool,
    pub desig: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Toggle {
    pub show: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConstellationOptions {
    pub names: bool,
    pub lines: bool,
    pub bounds: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineOptions {
    pub graticule: Toggle,
    pub equatorial: Toggle,
    pub ecliptic: Toggle,
    pub galactic: Toggle,
    pub supergalactic: Toggle,
}

impl Default for ChartOptions {
    fn default() -> Self {
        let hidden = Toggle { show: false };
        Self {
            container: "celestial-map".to_string(),
            projection: "stereographic".to_string(),
            transform: "equatorial".to_string(),
            geopos: [40.7, -74.0],
            follow: "zenith".to_string(),
            interactive: false,
            controls: false,
            background: Background {
                fill: "#05060f".to_string(),
                opacity: 1.0,
            },
            stars: StarOptions {
                show: true,
                limit: 5.0,
                colors: true,
                names: false,
                proper: false,
                desig: false,
            },
            dsos: hidden,
            constellations: ConstellationOptions {
                names: false,
                lines: false,
                bounds: false,
            },
            mw: hidden,
            lines: LineOptions {
                graticule: hidden,
                equatorial: hidden,
                ecliptic: hidden,
                galactic: hidden,
                supergalactic: hidden,
            },
            planets: hidden,
        }
    }
}

impl ChartOptions {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Ready,
    Retry,
    GiveUp,
}

/// Bounded polling for a library that may never show up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LibraryWait {
    pub max_attempts: u32,
    pub interval_ms: i32,
    attempts: u32,
}

impl Default for LibraryWait {
    fn default() -> Self {
        Self::new(20, 100)
    }
}

impl LibraryWait {
    pub fn new(max_attempts: u32, interval_ms: i32) -> Self {
        Self {
            max_attempts,
            interval_ms,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn poll(&mut self, found: bool) -> PollOutcome {
        if found {
            return PollOutcome::Ready;
        }
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            PollOutcome::GiveUp
        } else {
            PollOutcome::Retry
        }
    }
}

/// Simulated clock driving the chart's sky rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimClock {
    now_ms: f64,
    speedup: f64,
    pub tick_ms: i32,
}

impl SimClock {
    pub fn new(start_ms: f64, speedup: f64, tick_ms: i32) -> Self {
        Self {
            now_ms: start_ms,
            speedup,
            tick_ms,
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn tick(&mut self) -> f64 {
        self.now_ms += self.speedup * f64::from(self.tick_ms);
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_serialize_with_library_keys() {
        let json: serde_json::Value =
            serde_json::from_str(&ChartOptions::default().to_json().unwrap()).unwrap();
        assert_eq!(json["projection"], "stereographic");
        assert_eq!(json["stars"]["limit"], 5.0);
        assert_eq!(json["constellations"]["lines"], false);
        assert_eq!(json["mw"]["show"], false);
        assert_eq!(json["geopos"][1], -74.0);
        assert_eq!(json["interactive"], false);
    }

    #[test]
    fn library_wait_gives_up_after_max_attempts() {
        let mut wait = LibraryWait::new(3, 50);
        assert_eq!(wait.poll(false), PollOutcome::Retry);
        assert_eq!(wait.poll(false), PollOutcome::Retry);
        assert_eq!(wait.poll(false), PollOutcome::GiveUp);
        assert_eq!(wait.attempts(), 3);
    }

    #[test]
    fn library_wait_ready_as_soon_as_found() {
        let mut wait = LibraryWait::default();
        assert_eq!(wait.poll(false), PollOutcome::Retry);
        assert_eq!(wait.poll(true), PollOutcome::Ready);
    }

    #[test]
    fn clock_advances_by_speedup() {
        let mut clock = SimClock::new(1_000.0, 60.0, 100);
        assert_eq!(clock.tick(), 7_000.0);
        assert_eq!(clock.now_ms(), 7_000.0);
    }
}
