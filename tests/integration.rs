//! Cross-module scenarios that don't fit naturally into one unit test
//! module: the asset-rename cascade touching both the asset store and the
//! playlist store, and a playlist scene actually cycling under a running
//! engine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ledmatrix_engine::asset::AssetStore;
use ledmatrix_engine::device::null::NullDevice;
use ledmatrix_engine::playlist::{Playlist, PlaylistItem, PlaylistItemKind, PlaylistScene, PlaylistStore};
use ledmatrix_engine::{Engine, EngineConfig, Scene, SceneError, ScriptSource, State, Surface};
use tempfile::tempdir;

struct Flash;
impl Scene for Flash {
    fn update(&mut self, _state: &State, _dt: Duration) -> Result<(), SceneError> {
        Ok(())
    }
    fn draw(&mut self, _state: &State, surface: &mut Surface) -> Result<(), SceneError> {
        surface.fill(42, 42, 42);
        Ok(())
    }
}

fn build_flash(_width: u32, _height: u32) -> Box<dyn Scene> {
    Box::new(Flash)
}

#[test]
fn renaming_an_asset_cascades_into_every_playlist_item() {
    let data = tempdir().unwrap();
    let assets = tempdir().unwrap();

    let playlists = Arc::new(Mutex::new(PlaylistStore::load(data.path())));
    playlists.lock().unwrap().upsert(Playlist {
        id: "daily".into(),
        name: "Daily rotation".into(),
        items: vec![PlaylistItem {
            kind: PlaylistItemKind::Script,
            filename: "intro.scene".into(),
            duration: None,
            palette: None,
        }],
        settings: serde_json::Value::Null,
        default_palette: None,
        default_duration: None,
    });

    let mut store = AssetStore::load(assets.path(), data.path(), 8, 8, Arc::clone(&playlists));
    store.upload("intro.scene", b"payload").unwrap();

    store.rename("intro.scene", "welcome").unwrap();

    let playlist = playlists.lock().unwrap().get("daily").unwrap().clone();
    assert_eq!(playlist.items[0].filename, "welcome.scene");
    assert!(store.get_metadata("welcome.scene").is_some());
    assert!(store.get_metadata("intro.scene").is_none());

    // Reloading from disk sees the same cascade, proving it was persisted
    // and not just held in memory.
    let reloaded_playlists = PlaylistStore::load(data.path());
    assert_eq!(reloaded_playlists.get("daily").unwrap().items[0].filename, "welcome.scene");
}

#[test]
fn playlist_scene_runs_under_a_live_engine_and_reports_fps() {
    let dir = tempdir().unwrap();
    let state = State::load(dir.path());

    let mut scripts = ScriptSource::new();
    scripts.register("flash", build_flash as _);

    let playlist = Playlist {
        id: "loop".into(),
        name: "loop".into(),
        items: vec![
            PlaylistItem { kind: PlaylistItemKind::Script, filename: "flash".into(), duration: Some(1), palette: None },
            PlaylistItem { kind: PlaylistItemKind::Script, filename: "flash".into(), duration: Some(1), palette: None },
        ],
        settings: serde_json::Value::Null,
        default_palette: None,
        default_duration: None,
    };

    let scene = PlaylistScene::new(playlist, scripts, dir.path(), 4, 4);
    state.set_scene(Box::new(scene));

    let config = EngineConfig::builder().dimensions(4, 4).target_fps(200).build().unwrap();
    let device = Box::new(NullDevice::new(4, 4, 100));
    let handle = Engine::new(config, device, state.clone()).run_threaded();

    std::thread::sleep(Duration::from_millis(150));
    let fps = handle.get_current_fps();
    handle.stop();

    assert!(fps > 0.0);
    assert_eq!(state.active_scene_filename().as_deref(), Some("loop"), "PlaylistScene reports its own name");
}
