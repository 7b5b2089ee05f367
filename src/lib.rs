#![forbid(unsafe_code)]

//! # ledmatrix-engine
//!
//! A real-time rendering engine for small RGB LED matrix panels: a fixed-rate
//! render loop drives a [`Scene`] against a [`Device`], with runtime settings,
//! named palettes, playlists, and an on-disk asset library layered on top.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ledmatrix_engine::prelude::*;
//! use ledmatrix_engine::device::null::NullDevice;
//!
//! let config = EngineConfig::builder().dimensions(32, 32).target_fps(60).build().unwrap();
//! let state = State::load(&config.data_root);
//!
//! let mut scripts = ScriptSource::new();
//! scripts.register("blank", |w, h| {
//!     struct Blank;
//!     impl Scene for Blank {
//!         fn update(&mut self, _s: &State, _dt: Duration) -> Result<(), SceneError> { Ok(()) }
//!         fn draw(&mut self, _s: &State, surface: &mut Surface) -> Result<(), SceneError> {
//!             surface.clear();
//!             Ok(())
//!         }
//!     }
//!     let _ = (w, h);
//!     Box::new(Blank)
//! });
//! state.set_scene(scripts.build("blank", config.width, config.height).unwrap());
//!
//! let device = Box::new(NullDevice::new(config.width, config.height, config.initial_brightness));
//! let handle = Engine::new(config, device, state).run_threaded();
//! std::thread::sleep(Duration::from_millis(50));
//! handle.stop();
//! ```
//!
//! ## Concepts
//! - [`Device`] / [`Surface`] — the panel abstraction scenes draw into
//! - [`Scene`] — the unit of rendered content; [`sources::script::ScriptSource`]
//!   and [`sources::clip::ClipSource`] build scenes from a name or a GIF file
//! - [`playlist::PlaylistScene`] — cycles through a [`playlist::Playlist`] as a single `Scene`
//! - [`State`] — shared settings, active-scene handle, and palette lookup
//! - [`Engine`] / [`EngineHandle`] / [`EngineStatus`] — the render loop and its controls
//! - [`asset::AssetStore`] — uploads, renames, deletes, and thumbnails scene files
//!
//! ## Modules
//! - [`config`] — [`EngineConfig`] and its builder
//! - [`device`] — the device/surface contract and the [`device::null::NullDevice`] backend
//! - [`scene`] — the [`Scene`] trait
//! - [`sources`] — scene construction from a name (`script`) or a GIF (`clip`)
//! - [`state`] — shared runtime state
//! - [`palette`] — named color palettes
//! - [`playlist`] — playlists as a composable scene
//! - [`asset`] — scene file lifecycle (upload/rename/delete/thumbnail)
//! - [`engine`] — the render loop
//! - [`color`] — the `#RRGGBB` color type used throughout
//! - [`persistence`] — atomic JSON load/save helper shared by every store

pub mod asset;
pub mod color;
pub mod config;
pub mod device;
pub mod engine;
pub mod palette;
pub mod persistence;
pub mod playlist;
pub mod scene;
pub mod sources;
pub mod state;

pub use asset::{AssetError, AssetKind, AssetStore, SceneMetadata};
pub use color::Color;
pub use config::{EngineConfig, EngineConfigError};
pub use device::{Device, DeviceError, Surface};
pub use engine::{Engine, EngineError, EngineHandle, EngineStatus};
pub use palette::{Palette, PaletteError, PaletteStore};
pub use playlist::{Playlist, PlaylistItem, PlaylistItemKind, PlaylistScene, PlaylistStore};
pub use scene::{Scene, SceneError};
pub use sources::clip::ClipSource;
pub use sources::script::ScriptSource;
pub use state::{State, StateError};

/// Re-exports the types most embedding applications need, for a single
/// glob import.
pub mod prelude {
    pub use crate::{
        Color, Device, Engine, EngineConfig, EngineHandle, EngineStatus, Palette, Playlist,
        PlaylistItem, PlaylistScene, Scene, SceneError, ScriptSource, State, Surface,
    };
}
