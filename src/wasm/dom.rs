use js_sys::Reflect;
use wasm_bindgen::JsValue;
use web_sys::{Element, Window};

use crate::config::{ConfigError, SiteConfig};

/// Collects the element's `data-*` attributes into a [`SiteConfig`].
pub(crate) fn site_config(el: &Element) -> Result<SiteConfig, ConfigError> {
    let pairs: Vec<(String, String)> = el
        .get_attribute_names()
        .iter()
        .filter_map(|name| name.as_string())
        .filter_map(|name| {
            let value = el.get_attribute(&name)?;
            Some((name.strip_prefix("data-")?.to_string(), value))
        })
        .collect();
    SiteConfig::from_dataset(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

pub(crate) fn has_global(window: &Window, name: &str) -> bool {
    Reflect::get(window, &JsValue::from_str(name))
        .map(|v| !v.is_undefined() && !v.is_null())
        .unwrap_or(false)
}

pub(crate) fn has_intersection_observer(window: &Window) -> bool {
    has_global(window, "IntersectionObserver")
}

pub(crate) fn window_size(window: &Window) -> Result<(f64, f64), JsValue> {
    let w = window.inner_width()?.as_f64().ok_or("innerWidth is not a number")?;
    let h = window.inner_height()?.as_f64().ok_or("innerHeight is not a number")?;
    Ok((w, h))
}

pub(crate) fn random_seed() -> u64 {
    (js_sys::Math::random() * u64::MAX as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    use crate::config::{ConfigError, Renderer};

    wasm_bindgen_test_configure!(run_in_browser);

    fn canvas(attrs: &[(&str, &str)]) -> Element {
        let document = web_sys::window().unwrap().document().unwrap();
        let el = document.create_element("canvas").unwrap();
        for (name, value) in attrs {
            el.set_attribute(name, value).unwrap();
        }
        el
    }

    #[wasm_bindgen_test]
    fn site_config_reads_data_attributes_only() {
        let el = canvas(&[
            ("id", "sky"),
            ("class", "star-count"),
            ("data-renderer", "celestial"),
            ("data-star-count", "150"),
            ("data-longitude", "2.35"),
        ]);
        let cfg = site_config(&el).unwrap();
        assert_eq!(cfg.renderer, Renderer::Celestial);
        assert_eq!(cfg.starfield.count, 150);
        assert_eq!(cfg.chart.geopos[1], 2.35);
    }

    #[wasm_bindgen_test]
    fn site_config_surfaces_bad_values() {
        let el = canvas(&[("data-drift-speed", "NaN")]);
        assert!(matches!(site_config(&el), Err(ConfigError::Invalid { .. })));
    }

    #[wasm_bindgen_test]
    fn has_global_ignores_missing_names() {
        let window = web_sys::window().unwrap();
        assert!(has_global(&window, "Math"));
        assert!(!has_global(&window, "NoSuchCelestialLibrary"));
    }

    #[wasm_bindgen_test]
    fn window_size_is_positive() {
        let (w, h) = window_size(&web_sys::window().unwrap()).unwrap();
        assert!(w > 0.0 && h > 0.0);
    }
}
