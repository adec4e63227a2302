// src/config.rs
use crate::core::gfx::BackendType;
use crate::error::ConfigError;
use crate::reels::tween::Ease;
use configparser::ini::Ini;
use log::{info, warn};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

pub const CONFIG_PATH: &str = "reelspin.ini";
const DEFAULT_PALETTE_PATH: &str = "assets/reels/palette.json";

/// Engine-facing view of the `[Reels]` section.
#[derive(Clone, Debug, PartialEq)]
pub struct ReelConfig {
    pub reel_count: usize,
    pub symbols_per_reel: usize,
    pub symbol_size: f32,
    pub reel_width: f32,
    pub visible_rows: usize,
    /// Slots every reel travels at minimum.
    pub base_advance: f64,
    /// Extra slots per reel index, so later reels travel further.
    pub per_reel_advance: f64,
    /// Upper bound (inclusive) of the random extra slots per reel.
    pub max_extra_slots: u32,
    pub base_time_ms: f64,
    /// Added per reel index and per extra slot.
    pub extra_factor_ms: f64,
    pub ease: Ease,
    pub blur_multiplier: f64,
    /// Frame rate the blur multiplier is tuned for.
    pub reference_fps: f64,
    pub max_delta_ms: f64,
    pub seed: Option<u64>,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            reel_count: 5,
            symbols_per_reel: 4,
            symbol_size: 150.0,
            reel_width: 160.0,
            visible_rows: 3,
            base_advance: 10.0,
            per_reel_advance: 5.0,
            max_extra_slots: 2,
            base_time_ms: 2500.0,
            extra_factor_ms: 600.0,
            ease: Ease::BackOut(0.5),
            blur_multiplier: 8.0,
            reference_fps: 60.0,
            max_delta_ms: 100.0,
            seed: None,
        }
    }
}

impl ReelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reel_count == 0 {
            return Err(ConfigError::NoReels(self.reel_count));
        }
        if self.symbols_per_reel == 0 {
            return Err(ConfigError::NoSymbols(self.symbols_per_reel));
        }
        if !(self.symbol_size.is_finite() && self.symbol_size > 0.0) {
            return Err(ConfigError::InvalidSymbolSize(self.symbol_size));
        }
        let non_negative = [
            ("BaseAdvance", self.base_advance),
            ("PerReelAdvance", self.per_reel_advance),
            ("BaseTimeMs", self.base_time_ms),
            ("ExtraFactorMs", self.extra_factor_ms),
            ("BlurMultiplier", self.blur_multiplier),
        ];
        for (key, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::InvalidValue { key, reason: format!("{v} is not a finite, non-negative number") });
            }
        }
        if !(self.reference_fps.is_finite() && self.reference_fps > 0.0) {
            return Err(ConfigError::InvalidValue { key: "ReferenceFps", reason: format!("{} must be positive", self.reference_fps) });
        }
        if !(self.max_delta_ms.is_finite() && self.max_delta_ms > 0.0) {
            return Err(ConfigError::InvalidValue { key: "MaxDeltaMs", reason: format!("{} must be positive", self.max_delta_ms) });
        }
        Ok(())
    }

    #[inline(always)]
    pub fn reference_frame_ms(&self) -> f64 {
        1000.0 / self.reference_fps
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub video_renderer: BackendType,
    pub vsync: bool,
    pub windowed: bool,
    pub display_width: u32,
    pub display_height: u32,
    /// Frames simulated by the headless backend before it exits.
    pub headless_frames: u32,
    pub palette_path: PathBuf,
    pub reels: ReelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video_renderer: BackendType::OpenGL,
            vsync: true,
            windowed: true,
            display_width: 1024,
            display_height: 768,
            headless_frames: 600,
            palette_path: PathBuf::from(DEFAULT_PALETTE_PATH),
            reels: ReelConfig::default(),
        }
    }
}

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

fn default_ini() -> Ini {
    let d = Config::default();
    let r = &d.reels;
    let mut conf = Ini::new();
    let mut put = |section: &str, key: &str, value: String| {
        conf.set(section, key, Some(value));
    };
    put("Options", "VideoRenderer", d.video_renderer.to_string().to_lowercase());
    put("Options", "Vsync", "1".to_string());
    put("Options", "Windowed", "1".to_string());
    put("Options", "DisplayWidth", d.display_width.to_string());
    put("Options", "DisplayHeight", d.display_height.to_string());
    put("Options", "HeadlessFrames", d.headless_frames.to_string());
    put("Reels", "ReelCount", r.reel_count.to_string());
    put("Reels", "SymbolsPerReel", r.symbols_per_reel.to_string());
    put("Reels", "SymbolSize", r.symbol_size.to_string());
    put("Reels", "ReelWidth", r.reel_width.to_string());
    put("Reels", "VisibleRows", r.visible_rows.to_string());
    put("Reels", "BaseAdvance", r.base_advance.to_string());
    put("Reels", "PerReelAdvance", r.per_reel_advance.to_string());
    put("Reels", "MaxExtraSlots", r.max_extra_slots.to_string());
    put("Reels", "BaseTimeMs", r.base_time_ms.to_string());
    put("Reels", "ExtraFactorMs", r.extra_factor_ms.to_string());
    put("Reels", "Ease", "backout".to_string());
    put("Reels", "BackoutAmount", "0.5".to_string());
    put("Reels", "BlurMultiplier", r.blur_multiplier.to_string());
    put("Reels", "ReferenceFps", r.reference_fps.to_string());
    put("Reels", "MaxDeltaMs", r.max_delta_ms.to_string());
    put("Reels", "Seed", String::new());
    put("Assets", "Palette", DEFAULT_PALETTE_PATH.to_string());
    conf
}

fn parse_or<T: FromStr>(conf: &Ini, section: &str, key: &str, default: T) -> T {
    match conf.get(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for [{}] {}; using default.", raw, section, key);
            default
        }),
        _ => default,
    }
}

fn parse_bool(conf: &Ini, section: &str, key: &str, default: bool) -> bool {
    match conf.get(section, key).as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        Some("") | None => default,
        Some(other) => {
            warn!("Invalid boolean '{}' for [{}] {}; using default.", other, section, key);
            default
        }
    }
}

/// Build a config from parsed INI contents. Missing or malformed keys fall back to defaults.
pub fn from_ini(conf: &Ini) -> Config {
    let d = Config::default();
    let dr = &d.reels;

    let video_renderer = parse_or(conf, "Options", "VideoRenderer", d.video_renderer);
    let backout_amount = parse_or(conf, "Reels", "BackoutAmount", 0.5_f64);
    let ease = match conf.get("Reels", "Ease") {
        Some(name) => Ease::from_name(&name, backout_amount).unwrap_or_else(|| {
            warn!("Unknown ease '{}'; using backout.", name);
            Ease::BackOut(backout_amount)
        }),
        None => Ease::BackOut(backout_amount),
    };
    let seed = conf
        .get("Reels", "Seed")
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| match s.trim().parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Invalid seed '{}'; seeding from the OS instead.", s);
                None
            }
        });

    Config {
        video_renderer,
        vsync: parse_bool(conf, "Options", "Vsync", d.vsync),
        windowed: parse_bool(conf, "Options", "Windowed", d.windowed),
        display_width: parse_or(conf, "Options", "DisplayWidth", d.display_width),
        display_height: parse_or(conf, "Options", "DisplayHeight", d.display_height),
        headless_frames: parse_or(conf, "Options", "HeadlessFrames", d.headless_frames),
        palette_path: conf.get("Assets", "Palette").map(PathBuf::from).unwrap_or(d.palette_path.clone()),
        reels: ReelConfig {
            reel_count: parse_or(conf, "Reels", "ReelCount", dr.reel_count),
            symbols_per_reel: parse_or(conf, "Reels", "SymbolsPerReel", dr.symbols_per_reel),
            symbol_size: parse_or(conf, "Reels", "SymbolSize", dr.symbol_size),
            reel_width: parse_or(conf, "Reels", "ReelWidth", dr.reel_width),
            visible_rows: parse_or(conf, "Reels", "VisibleRows", dr.visible_rows),
            base_advance: parse_or(conf, "Reels", "BaseAdvance", dr.base_advance),
            per_reel_advance: parse_or(conf, "Reels", "PerReelAdvance", dr.per_reel_advance),
            max_extra_slots: parse_or(conf, "Reels", "MaxExtraSlots", dr.max_extra_slots),
            base_time_ms: parse_or(conf, "Reels", "BaseTimeMs", dr.base_time_ms),
            extra_factor_ms: parse_or(conf, "Reels", "ExtraFactorMs", dr.extra_factor_ms),
            ease,
            blur_multiplier: parse_or(conf, "Reels", "BlurMultiplier", dr.blur_multiplier),
            reference_fps: parse_or(conf, "Reels", "ReferenceFps", dr.reference_fps),
            max_delta_ms: parse_or(conf, "Reels", "MaxDeltaMs", dr.max_delta_ms),
            seed,
        },
    }
}

/// Load `reelspin.ini`, writing a default one first if it does not exist.
pub fn load() {
    load_from(Path::new(CONFIG_PATH));
}

pub fn load_from(path: &Path) {
    if !path.exists() {
        info!("Config file not found, creating default '{}'.", path.display());
        if let Err(e) = default_ini().write(path) {
            warn!("Failed to write default config '{}': {}", path.display(), e);
        }
    }

    let mut conf = Ini::new();
    let loaded = match conf.load(path) {
        Ok(_) => from_ini(&conf),
        Err(e) => {
            warn!("Failed to load '{}' ({}); using defaults.", path.display(), e);
            Config::default()
        }
    };
    info!(
        "Config: renderer={} reels={}x{} ease={}",
        loaded.video_renderer, loaded.reels.reel_count, loaded.reels.symbols_per_reel, loaded.reels.ease
    );
    *CONFIG.lock().unwrap() = loaded;
}

/// Returns a copy of the currently loaded config.
pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini(text: &str) -> Ini {
        let mut conf = Ini::new();
        conf.read(text.to_string()).unwrap();
        conf
    }

    #[test]
    fn defaults_match_reference_reels() {
        let r = ReelConfig::default();
        assert_eq!((r.reel_count, r.symbols_per_reel), (5, 4));
        assert_eq!((r.base_advance, r.per_reel_advance, r.max_extra_slots), (10.0, 5.0, 2));
        assert_eq!((r.base_time_ms, r.extra_factor_ms), (2500.0, 600.0));
        assert_eq!(r.ease, Ease::BackOut(0.5));
        assert!(r.validate().is_ok());
    }

    #[test]
    fn reads_sections_case_insensitively() {
        let c = from_ini(&ini(
            "[Options]\nVideoRenderer=headless\nVsync=0\n[Reels]\nReelCount=3\nEase=linear\nSeed=42\n",
        ));
        assert_eq!(c.video_renderer, BackendType::Headless);
        assert!(!c.vsync);
        assert_eq!(c.reels.reel_count, 3);
        assert_eq!(c.reels.ease, Ease::Linear);
        assert_eq!(c.reels.seed, Some(42));
    }

    #[test]
    fn malformed_values_fall_back() {
        let c = from_ini(&ini("[Reels]\nReelCount=many\nSymbolSize=\nEase=wobble\nBackoutAmount=0.8\n"));
        assert_eq!(c.reels.reel_count, 5);
        assert_eq!(c.reels.symbol_size, 150.0);
        assert_eq!(c.reels.ease, Ease::BackOut(0.8));
        assert_eq!(c.reels.seed, None);
    }

    #[test]
    fn validation_rejects_empty_reels() {
        let mut r = ReelConfig { reel_count: 0, ..ReelConfig::default() };
        assert_eq!(r.validate(), Err(ConfigError::NoReels(0)));
        r.reel_count = 5;
        r.symbols_per_reel = 0;
        assert_eq!(r.validate(), Err(ConfigError::NoSymbols(0)));
        r.symbols_per_reel = 4;
        r.symbol_size = -1.0;
        assert_eq!(r.validate(), Err(ConfigError::InvalidSymbolSize(-1.0)));
        r.symbol_size = 150.0;
        r.reference_fps = 0.0;
        assert!(matches!(r.validate(), Err(ConfigError::InvalidValue { key: "ReferenceFps", .. })));
    }
}
