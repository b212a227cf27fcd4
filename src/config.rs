use js_sys::{Array, Reflect};
use log::{debug, warn};
use wasm_bindgen::JsValue;

pub const CATALOG_ENDPOINT: &str = "/api/pokemon";
pub const GET_TIERLIST_ENDPOINT: &str = "/get_tierlist";
pub const SAVE_TIERLIST_ENDPOINT: &str = "/save_tierlist";
pub const LOGOUT_ENDPOINT: &str = "/logout";

pub const PLACEHOLDER_SPRITE: &str = "/static/images/placeholder.png";
pub const FINISHED_SPRITE: &str = "/static/Poké_Ball_icon.svg.png";

/// Category used when the host page names none; the catalog endpoint treats it as "every generation".
pub const ALL_CATEGORIES: &str = "0";

const DEFAULT_TIERS: &[&str] = &["S", "A", "B", "C", "D", "F"];
const TIER_ID_PREFIX: &str = "tier-";

const CATEGORY_GLOBAL: &str = "CURRENT_GENERATION";
const AUTH_GLOBAL: &str = "USER_LOGGED_IN";
const TIER_ORDER_GLOBAL: &str = "TIER_ORDER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierSpec {
    pub id: String,
    pub label: String,
}

impl TierSpec {
    pub fn from_label(label: &str) -> Self {
        Self {
            id: format!("{}{}", TIER_ID_PREFIX, label),
            label: label.to_owned(),
        }
    }
}

pub fn default_tiers() -> Vec<TierSpec> {
    DEFAULT_TIERS.iter().map(|label| TierSpec::from_label(label)).collect()
}

/// Settings the hosting page hands to the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub category: String,
    pub authenticated: bool,
    pub tiers: Vec<TierSpec>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            category: ALL_CATEGORIES.to_owned(),
            authenticated: false,
            tiers: default_tiers(),
        }
    }
}

impl PageConfig {
    pub fn from_window() -> Self {
        let category = page_global(CATEGORY_GLOBAL)
            .and_then(|value| category_from_js(&value))
            .or_else(|| {
                web_sys::window()
                    .and_then(|window| window.location().pathname().ok())
                    .and_then(|path| category_from_path(&path))
            })
            .unwrap_or_else(|| {
                debug!("No category on page, using {}", ALL_CATEGORIES);
                ALL_CATEGORIES.to_owned()
            });

        let authenticated = page_global(AUTH_GLOBAL)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);

        let tiers = page_global(TIER_ORDER_GLOBAL)
            .and_then(|value| tier_labels_from_js(&value))
            .and_then(|labels| tiers_from_labels(&labels))
            .unwrap_or_else(default_tiers);

        Self {
            category,
            authenticated,
            tiers,
        }
    }

    pub fn tier_ids(&self) -> Vec<String> {
        self.tiers.iter().map(|tier| tier.id.clone()).collect()
    }
}

/// Parses `/gen/{n}` style paths.
pub fn category_from_path(path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    match (segments.next(), segments.next()) {
        (Some("gen"), Some(value)) if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) => {
            Some(value.to_owned())
        }
        _ => None,
    }
}

/// Builds a tier order from labels, dropping blanks and repeats. `None` if nothing usable is left.
pub fn tiers_from_labels(labels: &[String]) -> Option<Vec<TierSpec>> {
    let mut tiers: Vec<TierSpec> = Vec::with_capacity(labels.len());
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            continue;
        }
        let spec = TierSpec::from_label(trimmed);
        if tiers.iter().any(|existing| existing.id == spec.id) {
            warn!("Ignoring repeated tier '{}' in tier order", trimmed);
            continue;
        }
        tiers.push(spec);
    }

    if tiers.is_empty() {
        None
    } else {
        Some(tiers)
    }
}

fn page_global(name: &str) -> Option<JsValue> {
    let window = web_sys::window()?;
    Reflect::get(&window, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn category_from_js(value: &JsValue) -> Option<String> {
    if let Some(number) = value.as_f64() {
        if number.is_finite() && number >= 0.0 {
            return Some(format!("{}", number.trunc() as u64));
        }
        return None;
    }
    value
        .as_string()
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

fn tier_labels_from_js(value: &JsValue) -> Option<Vec<String>> {
    if !Array::is_array(value) {
        warn!("{} is not an array, using default tiers", TIER_ORDER_GLOBAL);
        return None;
    }
    Some(
        Array::from(value)
            .iter()
            .filter_map(|entry| entry.as_string())
            .collect(),
    )
}
