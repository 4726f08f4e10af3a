//! Starfield particle model for the background canvas.

use std::f64::consts::TAU;

use log::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct StarfieldConfig {
    pub count: usize,
    pub min_size: f64,
    pub max_size: f64,
    pub min_opacity: f64,
    pub max_opacity: f64,
    /// Twinkle angular speed range, radians per second.
    pub twinkle_speed: (f64, f64),
    /// Drift speed in CSS pixels per second.
    pub drift_speed: f64,
    pub background: String,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            count: 300,
            min_size: 0.5,
            max_size: 2.0,
            min_opacity: 0.2,
            max_opacity: 1.0,
            twinkle_speed: (0.5, 2.0),
            drift_speed: 4.0,
            background: "#05060f".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub opacity: f64,
    pub phase: f64,
    pub twinkle: f64,
    pub vx: f64,
    pub vy: f64,
}

/// What the renderer needs to paint one star.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarSprite {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub alpha: f64,
}

pub struct Starfield {
    config: StarfieldConfig,
    width: f64,
    height: f64,
    stars: Vec<Star>,
    rng: fastrand::Rng,
}

fn lerp(rng: &mut fastrand::Rng, lo: f64, hi: f64) -> f64 {
    lo + (hi - lo) * rng.f64()
}

impl Starfield {
    pub fn new(config: StarfieldConfig, width: f64, height: f64, seed: u64) -> Self {
        let mut field = Self {
            config,
            width: 0.0,
            height: 0.0,
            stars: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
        };
        field.resize(width, height);
        field
    }

    pub fn config(&self) -> &StarfieldConfig {
        &self.config
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Throws the current stars away and scatters a fresh set over the new
    /// bounds.
    pub fn resize(&mut self, width: f64, height: f64) {
        let (width, height) = (width.max(0.0), height.max(0.0));
        self.width = width;
        self.height = height;
        let cfg = &self.config;
        let rng = &mut self.rng;
        self.stars = (0..cfg.count)
            .map(|_| {
                let heading = rng.f64() * TAU;
                let speed = cfg.drift_speed * (0.5 + rng.f64());
                Star {
                    x: rng.f64() * width,
                    y: rng.f64() * height,
                    size: lerp(rng, cfg.min_size, cfg.max_size),
                    opacity: lerp(rng, cfg.min_opacity, cfg.max_opacity),
                    phase: rng.f64() * TAU,
                    twinkle: lerp(rng, cfg.twinkle_speed.0, cfg.twinkle_speed.1),
                    vx: heading.cos() * speed,
                    vy: heading.sin() * speed,
                }
            })
            .collect();
        debug!(
            "starfield regenerated: {} stars in {}x{}",
            self.stars.len(),
            self.width,
            self.height
        );
    }

    fn wrap(value: f64, extent: f64) -> f64 {
        if extent.is_nan() || extent <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        let v = value.rem_euclid(extent);
        // rem_euclid can round up to `extent` for tiny negative inputs
        if v >= extent {
            0.0
        } else {
            v
        }
    }

    pub fn sprite(&self, star: &Star, t: f64) -> StarSprite {
        let twinkle = 0.5 + 0.5 * (star.phase + star.twinkle * t).sin();
        StarSprite {
            x: Self::wrap(star.x + star.vx * t, self.width),
            y: Self::wrap(star.y + star.vy * t, self.height),
            radius: star.size,
            alpha: (star.opacity * twinkle).clamp(0.0, 1.0),
        }
    }

    /// Sprites for time `t` (seconds since the animation started).
    pub fn sprites(&self, t: f64) -> impl Iterator<Item = StarSprite> + '_ {
        self.stars.iter().map(move |s| self.sprite(s, t))
    }
}
