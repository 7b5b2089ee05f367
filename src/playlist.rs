//! A playlist: a sequence of scenes played in order, each for a configured
//! duration, looping back to the start indefinitely.
//!
//! `PlaylistScene` is not special-cased by the engine — it implements
//! [`Scene`] like anything else, so "play a single scene" and "play a
//! playlist" are the same operation as far as `State::set_scene` and the
//! render loop are concerned.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::Surface;
use crate::scene::{Scene, SceneError};
use crate::sources::clip::ClipSource;
use crate::sources::script::ScriptSource;
use crate::state::State;

/// The default per-item duration used when a [`PlaylistItem`] doesn't
/// specify one.
pub const DEFAULT_ITEM_DURATION: Duration = Duration::from_secs(10);

/// The duration substituted for an item that fails to load, so a single
/// broken entry doesn't stall the whole playlist — it gets a short slot
/// and the advance loop retries soon.
pub const FAILED_ITEM_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistItemKind {
    Script,
    Clip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(rename = "type")]
    pub kind: PlaylistItemKind,
    pub filename: String,
    /// Seconds this item plays for. Absent means [`DEFAULT_ITEM_DURATION`].
    pub duration: Option<u64>,
    /// Optional palette override for this item; not yet consulted by the
    /// engine (scenes read the playlist-wide selected palette through
    /// `State`), carried through for forward compatibility with the
    /// persisted format.
    pub palette: Option<String>,
}

impl PlaylistItem {
    pub fn duration(&self) -> Duration {
        self.duration.map(Duration::from_secs).unwrap_or(DEFAULT_ITEM_DURATION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Playlist {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub items: Vec<PlaylistItem>,
    /// Per-playlist settings overrides, opaque to this crate (forward
    /// compatible with whatever the out-of-scope HTTP surface puts here).
    #[serde(default)]
    pub settings: serde_json::Value,
    pub default_palette: Option<String>,
    pub default_duration: Option<u64>,
}

/// `data/playlists.json` is a single JSON object keyed by playlist id.
type PlaylistsDoc = std::collections::HashMap<String, Playlist>;

/// CRUD store for persisted playlists, mirroring [`crate::palette::PaletteStore`]'s
/// shape: an in-memory map backed by a single JSON document, saved
/// synchronously on every mutation.
pub struct PlaylistStore {
    playlists: PlaylistsDoc,
    path: std::path::PathBuf,
}

impl PlaylistStore {
    pub fn load(data_root: &std::path::Path) -> Self {
        let path = data_root.join("playlists.json");
        let playlists: PlaylistsDoc = crate::persistence::load_or_default(&path, PlaylistsDoc::default());
        Self { playlists, path }
    }

    pub fn list(&self) -> Vec<&Playlist> {
        let mut out: Vec<&Playlist> = self.playlists.values().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn get(&self, id: &str) -> Option<&Playlist> {
        self.playlists.get(id)
    }

    /// Inserts or replaces a playlist. Assigns a fresh id via [`uuid::Uuid::new_v4`]
    /// if `playlist.id` is empty.
    pub fn upsert(&mut self, mut playlist: Playlist) -> String {
        if playlist.id.is_empty() {
            playlist.id = uuid::Uuid::new_v4().to_string();
        }
        let id = playlist.id.clone();
        self.playlists.insert(id.clone(), playlist);
        self.persist();
        id
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.playlists.remove(id).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Rewrites every [`PlaylistItem::filename`] equal to `old` to `new`,
    /// across every stored playlist. Returns the number of playlists that
    /// had at least one item updated. Used by the asset store's rename
    /// cascade.
    pub fn update_scene_filename(&mut self, old: &str, new: &str) -> usize {
        let mut updated = 0;
        for playlist in self.playlists.values_mut() {
            let mut touched = false;
            for item in playlist.items.iter_mut() {
                if item.filename == old {
                    item.filename = new.to_string();
                    touched = true;
                }
            }
            if touched {
                updated += 1;
            }
        }
        if updated > 0 {
            self.persist();
        }
        updated
    }

    fn persist(&self) {
        if let Err(e) = crate::persistence::save(&self.path, &self.playlists) {
            log::warn!("failed to persist playlists.json: {e}");
        }
    }
}

/// A [`Scene`] that cycles through a [`Playlist`], advancing to the next
/// item once the current one's duration has elapsed. Mirrors the
/// playlist's own `advance()` algorithm: index starts at -1 and is
/// incremented (wrapping) before each item is resolved.
pub struct PlaylistScene {
    playlist: Playlist,
    scripts: ScriptSource,
    clips_root: std::path::PathBuf,
    width: u32,
    height: u32,
    index: i64,
    child: Option<Box<dyn Scene>>,
    time_in_scene: Duration,
    current_duration: Duration,
}

impl PlaylistScene {
    pub fn new(
        playlist: Playlist,
        scripts: ScriptSource,
        clips_root: impl Into<std::path::PathBuf>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            playlist,
            scripts,
            clips_root: clips_root.into(),
            width,
            height,
            index: -1,
            child: None,
            time_in_scene: Duration::ZERO,
            current_duration: DEFAULT_ITEM_DURATION,
        }
    }

    fn load(&self, item: &PlaylistItem) -> Result<Box<dyn Scene>, SceneError> {
        match item.kind {
            PlaylistItemKind::Script => self
                .scripts
                .build(&item.filename, self.width, self.height)
                .map_err(|e| SceneError::EnterFailed(e.to_string())),
            PlaylistItemKind::Clip => {
                let full = self.clips_root.join(&item.filename);
                ClipSource::load(&full, self.width, self.height)
                    .map(|c| Box::new(c) as Box<dyn Scene>)
                    .map_err(|e| SceneError::EnterFailed(e.to_string()))
            }
        }
    }

    /// 1. Advances the index (wrapping). 2. Resolves the new item; on
    /// failure, clears the child, sets a short retry duration, logs, and
    /// returns without touching `time_in_scene`. 3. Exits the previous
    /// child, if any. 4. Installs and enters the new child. 5. Resets
    /// `time_in_scene` and records the new item's duration.
    fn advance(&mut self, state: &State) {
        if self.playlist.items.is_empty() {
            if let Some(mut previous) = self.child.take() {
                if let Err(e) = previous.exit(state) {
                    log::warn!("playlist: outgoing scene exit failed: {e}");
                }
            }
            return;
        }

        let len = self.playlist.items.len() as i64;
        self.index = (self.index + 1).rem_euclid(len);
        let item = self.playlist.items[self.index as usize].clone();

        let previous = self.child.take();

        match self.load(&item) {
            Ok(mut new_child) => {
                if let Some(mut previous) = previous {
                    if let Err(e) = previous.exit(state) {
                        log::warn!("playlist: outgoing scene exit failed: {e}");
                    }
                }
                if let Err(e) = new_child.enter(state) {
                    log::warn!("playlist: scene enter failed: {e}");
                }
                self.time_in_scene = Duration::ZERO;
                self.current_duration = item.duration();
                self.child = Some(new_child);
            }
            Err(e) => {
                log::warn!("playlist: failed to load item {} ({}): {e}", self.index, item.filename);
                if let Some(mut previous) = previous {
                    if let Err(e) = previous.exit(state) {
                        log::warn!("playlist: outgoing scene exit failed: {e}");
                    }
                }
                self.child = None;
                self.current_duration = FAILED_ITEM_DURATION;
            }
        }
    }
}

impl Scene for PlaylistScene {
    fn enter(&mut self, state: &State) -> Result<(), SceneError> {
        self.index = -1;
        self.advance(state);
        Ok(())
    }

    fn update(&mut self, state: &State, dt: Duration) -> Result<(), SceneError> {
        self.time_in_scene += dt;
        if self.time_in_scene >= self.current_duration {
            self.advance(state);
        }

        if let Some(child) = self.child.as_mut() {
            child.update(state, dt)?;
        }
        Ok(())
    }

    fn draw(&mut self, state: &State, surface: &mut Surface) -> Result<(), SceneError> {
        if let Some(child) = self.child.as_mut() {
            child.draw(state, surface)?;
        } else {
            surface.clear();
        }
        Ok(())
    }

    fn exit(&mut self, state: &State) -> Result<(), SceneError> {
        if let Some(mut child) = self.child.take() {
            child.exit(state)?;
        }
        Ok(())
    }

    fn filename(&self) -> Option<&str> {
        Some(self.playlist.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Instant;
    impl Scene for Instant {
        fn update(&mut self, _state: &State, _dt: Duration) -> Result<(), SceneError> {
            Ok(())
        }
        fn draw(&mut self, _state: &State, surface: &mut Surface) -> Result<(), SceneError> {
            surface.fill(1, 2, 3);
            Ok(())
        }
    }

    #[test]
    fn store_upsert_assigns_id_when_empty_and_persists() {
        let dir = tempdir().unwrap();
        let mut store = PlaylistStore::load(dir.path());
        let id = store.upsert(Playlist { name: "demo".into(), ..Default::default() });
        assert!(!id.is_empty());
        assert_eq!(store.get(&id).unwrap().name, "demo");

        let reloaded = PlaylistStore::load(dir.path());
        assert_eq!(reloaded.get(&id).unwrap().name, "demo");
    }

    #[test]
    fn store_delete_removes_playlist() {
        let dir = tempdir().unwrap();
        let mut store = PlaylistStore::load(dir.path());
        let id = store.upsert(Playlist { name: "demo".into(), ..Default::default() });
        assert!(store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.delete(&id));
    }

    #[test]
    fn update_scene_filename_rewrites_every_matching_item() {
        let dir = tempdir().unwrap();
        let mut store = PlaylistStore::load(dir.path());
        store.upsert(Playlist {
            id: "p1".into(),
            name: "one".into(),
            items: vec![item("a.py", None), item("b.py", None)],
            settings: serde_json::Value::Null,
            default_palette: None,
            default_duration: None,
        });
        store.upsert(Playlist {
            id: "p2".into(),
            name: "two".into(),
            items: vec![item("c.py", None)],
            settings: serde_json::Value::Null,
            default_palette: None,
            default_duration: None,
        });

        let updated = store.update_scene_filename("a.py", "z.py");
        assert_eq!(updated, 1);
        assert_eq!(store.get("p1").unwrap().items[0].filename, "z.py");
        assert_eq!(store.get("p1").unwrap().items[1].filename, "b.py");
        assert_eq!(store.get("p2").unwrap().items[0].filename, "c.py");
    }

    fn build_instant(_w: u32, _h: u32) -> Box<dyn Scene> {
        Box::new(Instant)
    }

    fn item(name: &str, duration: Option<u64>) -> PlaylistItem {
        PlaylistItem { kind: PlaylistItemKind::Script, filename: name.into(), duration, palette: None }
    }

    #[test]
    fn item_duration_falls_back_to_default() {
        let i = item("a", None);
        assert_eq!(i.duration(), DEFAULT_ITEM_DURATION);
        let i = item("a", Some(3));
        assert_eq!(i.duration(), Duration::from_secs(3));
    }

    #[test]
    fn advances_through_items_starting_from_index_zero_and_wraps() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        let mut scripts = ScriptSource::new();
        scripts.register("a", build_instant as _);
        scripts.register("b", build_instant as _);

        let playlist = Playlist {
            id: "p".into(),
            name: "demo".into(),
            items: vec![item("a", Some(1)), item("b", Some(1))],
            settings: serde_json::Value::Null,
            default_palette: None,
            default_duration: None,
        };
        let mut scene = PlaylistScene::new(playlist, scripts, dir.path(), 4, 4);
        scene.enter(&state).unwrap();
        assert_eq!(scene.index, 0);

        scene.update(&state, Duration::from_secs(2)).unwrap();
        assert_eq!(scene.index, 1);

        scene.update(&state, Duration::from_secs(2)).unwrap();
        assert_eq!(scene.index, 0);
    }

    #[test]
    fn failed_item_gets_short_retry_slot_and_playlist_continues() {
        let dir = tempdir().unwrap();
        let state = State::load(dir.path());
        let scripts = ScriptSource::new();
        let playlist = Playlist {
            id: "p".into(),
            name: "demo".into(),
            items: vec![item("missing", Some(5))],
            settings: serde_json::Value::Null,
            default_palette: None,
            default_duration: None,
        };
        let mut scene = PlaylistScene::new(playlist, scripts, dir.path(), 4, 4);
        scene.enter(&state).unwrap();
        assert_eq!(scene.current_duration, FAILED_ITEM_DURATION);
        assert!(scene.child.is_none());
    }
}
