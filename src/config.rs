//! Page configuration read from `data-*` attributes on the background canvas.

use thiserror::Error;

use crate::celestial::ChartOptions;
use crate::starfield::StarfieldConfig;
use crate::video::LoaderConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("data-{key}: cannot parse {value:?}")]
    Invalid { key: String, value: String },
    #[error("unknown renderer {0:?}")]
    UnknownRenderer(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Renderer {
    #[default]
    Canvas,
    Celestial,
}

impl std::str::FromStr for Renderer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canvas" | "" => Ok(Renderer::Canvas),
            "celestial" => Ok(Renderer::Celestial),
            other => Err(ConfigError::UnknownRenderer(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SiteConfig {
    pub renderer: Renderer,
    pub starfield: StarfieldConfig,
    pub chart: ChartOptions,
    pub loader: LoaderConfig,
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

/// Like [`parse`] but refuses NaN and infinities, which `f64::from_str` accepts.
fn parse_finite(key: &str, value: &str) -> Result<f64, ConfigError> {
    let v: f64 = parse(key, value)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(invalid(key, value))
    }
}

fn parse_size(key: &str, value: &str) -> Result<f64, ConfigError> {
    let v = parse_finite(key, value)?;
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(invalid(key, value))
    }
}

impl SiteConfig {
    /// Applies overrides given as `(key, value)` pairs, with keys written the
    /// way they appear after `data-` (e.g. `star-count`). Unknown keys are
    /// skipped.
    pub fn from_dataset<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut cfg = SiteConfig::default();
        for (key, value) in pairs {
            match key {
                "renderer" => cfg.renderer = value.parse()?,
                "star-count" => cfg.starfield.count = parse(key, value)?,
                "star-min-size" => cfg.starfield.min_size = parse_size(key, value)?,
                "star-max-size" => cfg.starfield.max_size = parse_size(key, value)?,
                "drift-speed" => cfg.starfield.drift_speed = parse_finite(key, value)?,
                "latitude" => cfg.chart.geopos[0] = parse_finite(key, value)?,
                "longitude" => cfg.chart.geopos[1] = parse_finite(key, value)?,
                _ => {}
            }
        }
        if cfg.starfield.min_size > cfg.starfield.max_size {
            std::mem::swap(&mut cfg.starfield.min_size, &mut cfg.starfield.max_size);
        }
        Ok(cfg)
    }
}
