//! Thread-shared engine state: settings, the active scene handle, and an
//! opaque scratch store scenes use to persist data across frames.
//!
//! `State` is cheap to clone (it's a handle around an `Arc`) and is the one
//! object both the render thread and any external caller (a future HTTP
//! layer, a CLI, a test) touch concurrently. Every mutation goes through a
//! short-lived lock; nothing here is held across a scene's `update`/`draw`
//! call except the active-scene mutex itself, which the engine locks only
//! for the duration of that tick's lifecycle calls.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;
use crate::palette::PaletteStore;
use crate::persistence;
use crate::scene::Scene;

/// A point-in-time snapshot of the tunable runtime settings. Cloning is
/// cheap and intentional: the render loop snapshots settings once per tick
/// rather than holding the settings lock across a scene's `update`/`draw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub brightness: u8,
    pub speed: f64,
    pub selected_palette: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self { brightness: 100, speed: 1.0, selected_palette: crate::palette::DEFAULT_PALETTE_ID.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("unknown setting key {0:?}")]
    UnknownKey(String),
    #[error("invalid value for setting {key:?}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("no palette named {0:?}")]
    UnknownPalette(String),
}

struct Inner {
    settings: Settings,
    data: HashMap<String, serde_json::Value>,
    config_path: PathBuf,
}

/// Shared engine state. Clone is shallow (`Arc` underneath); every clone
/// refers to the same settings, active scene, and scratch data.
#[derive(Clone)]
pub struct State {
    inner: Arc<Mutex<Inner>>,
    scene: Arc<Mutex<Option<Box<dyn Scene>>>>,
    palettes: Arc<Mutex<PaletteStore>>,
}

impl State {
    /// Loads settings from `<data_root>/config.json` (defaults if absent or
    /// malformed) and palettes from `<data_root>/palettes.json`.
    pub fn load(data_root: &Path) -> Self {
        let config_path = data_root.join("config.json");
        let settings: Settings = persistence::load_or_default(&config_path, Settings::default());
        let palettes = PaletteStore::load(data_root);

        Self {
            inner: Arc::new(Mutex::new(Inner { settings, data: HashMap::new(), config_path })),
            scene: Arc::new(Mutex::new(None)),
            palettes: Arc::new(Mutex::new(palettes)),
        }
    }

    /// A snapshot of the current settings.
    pub fn get_settings(&self) -> Settings {
        self.inner.lock().expect("state mutex poisoned").settings.clone()
    }

    /// Validates, clamps, applies, and persists a single setting.
    ///
    /// Recognized keys: `brightness` (integer, clamped to `0..=100`),
    /// `speed` (float, clamped to `0.1..=2.0`), `selected_palette` (must name an existing
    /// palette). Any other key is rejected rather than silently ignored.
    pub fn update_setting(&self, key: &str, value: serde_json::Value) -> Result<(), StateError> {
        let mut guard = self.inner.lock().expect("state mutex poisoned");
        match key {
            "brightness" => {
                let raw = value.as_u64().ok_or_else(|| StateError::InvalidValue {
                    key: key.to_string(),
                    reason: "expected an integer".to_string(),
                })?;
                guard.settings.brightness = raw.min(100) as u8;
            }
            "speed" => {
                let raw = value.as_f64().ok_or_else(|| StateError::InvalidValue {
                    key: key.to_string(),
                    reason: "expected a number".to_string(),
                })?;
                guard.settings.speed = raw.clamp(0.1, 2.0);
            }
            "selected_palette" => {
                let name = value.as_str().ok_or_else(|| StateError::InvalidValue {
                    key: key.to_string(),
                    reason: "expected a string".to_string(),
                })?;
                if self.palettes.lock().expect("palette mutex poisoned").get(name).is_none() {
                    return Err(StateError::UnknownPalette(name.to_string()));
                }
                guard.settings.selected_palette = name.to_string();
            }
            other => return Err(StateError::UnknownKey(other.to_string())),
        }

        if let Err(e) = persistence::save(&guard.config_path, &guard.settings) {
            log::warn!("failed to persist config.json: {e}");
        }
        Ok(())
    }

    /// The colors of the currently selected palette. Falls back to the
    /// default palette's colors if the selected id no longer resolves (a
    /// palette can be deleted out from under a setting that still names
    /// it).
    pub fn get_palette_colors(&self) -> Vec<Color> {
        let selected = self.get_settings().selected_palette;
        let store = self.palettes.lock().expect("palette mutex poisoned");
        store
            .get(&selected)
            .or_else(|| store.get(crate::palette::DEFAULT_PALETTE_ID))
            .map(|p| p.colors.clone())
            .unwrap_or_default()
    }

    /// Direct access to the palette store, for listing/editing palettes.
    pub fn palettes(&self) -> Arc<Mutex<PaletteStore>> {
        Arc::clone(&self.palettes)
    }

    /// Stores an opaque value under `key` in the scratch data store. Scenes
    /// use this to remember state across ticks without the engine needing
    /// to know anything about it (e.g. a clock scene caching the last
    /// rendered minute).
    pub fn set_data(&self, key: &str, value: serde_json::Value) {
        self.inner.lock().expect("state mutex poisoned").data.insert(key.to_string(), value);
    }

    pub fn get_data(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().expect("state mutex poisoned").data.get(key).cloned()
    }

    /// The `filename` tag of the currently active scene, if any. Used by
    /// the asset store's deferred thumbnail capture to confirm a scene is
    /// still active before it overwrites a thumbnail.
    pub fn active_scene_filename(&self) -> Option<String> {
        self.scene.lock().expect("scene mutex poisoned").as_ref().and_then(|s| s.filename().map(String::from))
    }

    /// The shared active-scene handle. The engine locks this for the
    /// duration of each tick's lifecycle calls; nothing else should hold it
    /// longer than a single method call.
    pub fn scene_handle(&self) -> Arc<Mutex<Option<Box<dyn Scene>>>> {
        Arc::clone(&self.scene)
    }

    /// Replaces the active scene. Calls `exit` on the outgoing scene (if
    /// any) and `enter` on the incoming one, both guarded against panics:
    /// a faulting `exit`/`enter` is logged and otherwise ignored, since a
    /// scene swap must always succeed.
    pub fn set_scene(&self, mut new_scene: Box<dyn Scene>) {
        let mut guard = self.scene.lock().expect("scene mutex poisoned");

        if let Some(mut old) = guard.take() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| old.exit(self)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("scene exit failed: {e}"),
                Err(_) => log::error!("scene exit panicked"),
            }
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| new_scene.enter(self)));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("scene enter failed: {e}"),
            Err(_) => log::error!("scene enter panicked"),
        }

        *guard = Some(new_scene);
    }

    /// Clears the active scene, calling `exit` on it first (panic-guarded,
    /// same as [`set_scene`](Self::set_scene)).
    pub fn clear_scene(&self) {
        let mut guard = self.scene.lock().expect("scene mutex poisoned");
        if let Some(mut old) = guard.take() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| old.exit(self)));
            if let Err(_) = result {
                log::error!("scene exit panicked");
            } else if let Ok(Err(e)) = result {
                log::warn!("scene exit failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Surface;
    use crate::scene::SceneError;
    use std::time::Duration;
    use tempfile::tempdir;

    struct Recorder {
        entered: Arc<Mutex<bool>>,
        exited: Arc<Mutex<bool>>,
    }

    impl Scene for Recorder {
        fn enter(&mut self, _state: &State) -> Result<(), SceneError> {
            *self.entered.lock().unwrap() = true;
            Ok(())
        }
        fn update(&mut self, _state: &State, _dt: Duration) -> Result<(), SceneError> {
            Ok(())
        }
        fn draw(&mut self, _state: &State, _surface: &mut Surface) -> Result<(), SceneError> {
            Ok(())
        }
        fn exit(&mut self, _state: &State) -> Result<(), SceneError> {
            *self.exited.lock().unwrap() = true;
            Ok(())
        }
    }

    #[test]
    fn settings_default_to_spec_constants() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        let s = state.get_settings();
        assert_eq!(s.brightness, 100);
        assert_eq!(s.speed, 1.0);
        assert_eq!(s.selected_palette, "aurora");
    }

    #[test]
    fn update_setting_rejects_unknown_key() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        let err = state.update_setting("bogus", serde_json::json!(1)).unwrap_err();
        assert!(matches!(err, StateError::UnknownKey(k) if k == "bogus"));
    }

    #[test]
    fn update_setting_clamps_brightness_and_persists() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        state.update_setting("brightness", serde_json::json!(500)).unwrap();
        assert_eq!(state.get_settings().brightness, 100);

        let reloaded = State::load(dir.path());
        assert_eq!(reloaded.get_settings().brightness, 100);
    }

    #[test]
    fn update_setting_clamps_speed_to_range() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        state.update_setting("speed", serde_json::json!(10.0)).unwrap();
        assert_eq!(state.get_settings().speed, 2.0);
        state.update_setting("speed", serde_json::json!(0.0001)).unwrap();
        assert_eq!(state.get_settings().speed, 0.1);
    }

    #[test]
    fn update_setting_rejects_unknown_palette() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        let err = state.update_setting("selected_palette", serde_json::json!("nope")).unwrap_err();
        assert!(matches!(err, StateError::UnknownPalette(p) if p == "nope"));
    }

    #[test]
    fn set_scene_calls_exit_then_enter() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());

        let entered1 = Arc::new(Mutex::new(false));
        let exited1 = Arc::new(Mutex::new(false));
        state.set_scene(Box::new(Recorder { entered: entered1.clone(), exited: exited1.clone() }));
        assert!(*entered1.lock().unwrap());

        let entered2 = Arc::new(Mutex::new(false));
        let exited2 = Arc::new(Mutex::new(false));
        state.set_scene(Box::new(Recorder { entered: entered2.clone(), exited: exited2.clone() }));
        assert!(*exited1.lock().unwrap());
        assert!(*entered2.lock().unwrap());
    }

    #[test]
    fn get_palette_colors_returns_selected_palette() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        let colors = state.get_palette_colors();
        assert_eq!(colors.len(), crate::palette::PALETTE_SIZE);
    }
}
