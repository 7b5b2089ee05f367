//! The scene lifecycle contract.
//!
//! A `Scene` is the unit of content the engine renders: a single visual
//! program (plasma, clock, a GIF clip) or a [`Playlist`](crate::playlist)
//! that itself wraps a sequence of other scenes. The engine never
//! downcasts or otherwise special-cases the active scene; everything it
//! needs is expressed through this trait.

use std::time::Duration;

use thiserror::Error;

use crate::device::Surface;
use crate::state::State;

/// A scene-lifecycle fault. Scenes are not required to return this — a
/// panic inside any lifecycle method is caught by the engine too — but
/// returning it is cheaper than panicking and lets a scene report a fault
/// without unwinding.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene failed to initialize: {0}")]
    EnterFailed(String),
    #[error("scene update failed: {0}")]
    UpdateFailed(String),
    #[error("scene draw failed: {0}")]
    DrawFailed(String),
}

/// The four points in a scene's life the engine calls into.
///
/// Implementors do not need `Sync`: the engine only ever touches the
/// active scene from its own render thread, under the scene-handle mutex
/// (see [`State`]).
pub trait Scene: Send {
    /// Called once, immediately after the scene becomes active. Scenes that
    /// need to reset internal state (playlists resetting their index,
    /// clips reloading frames) do so here rather than in `new`, since a
    /// scene instance may be re-entered after being swapped out.
    fn enter(&mut self, state: &State) -> Result<(), SceneError> {
        let _ = state;
        Ok(())
    }

    /// Called once per tick, before `draw`. `dt` is wall-clock elapsed time
    /// since the previous tick, scaled by the current speed setting and
    /// capped at the engine's `dt_cap` (see `EngineConfig`).
    fn update(&mut self, state: &State, dt: Duration) -> Result<(), SceneError>;

    /// Called once per tick, after `update`. Draws into `surface`.
    fn draw(&mut self, state: &State, surface: &mut Surface) -> Result<(), SceneError>;

    /// Called once, immediately before the scene stops being active
    /// (replaced by another scene, or the engine stopping). Default no-op.
    fn exit(&mut self, state: &State) -> Result<(), SceneError> {
        let _ = state;
        Ok(())
    }

    /// The source file or identifier this scene was loaded from, if any.
    /// Used for diagnostics and for the "currently playing" status surface;
    /// has no behavioral effect inside the engine.
    fn filename(&self) -> Option<&str> {
        None
    }
}
