//! Scene-file lifecycle: upload, rename, delete, thumbnails, and metadata.
//!
//! `AssetStore` owns the `scenes/{scripts,clips,thumbnails}` tree and
//! `data/library.json`. It has no opinion on whether an uploaded script
//! file can actually be instantiated — that's [`ScriptSource`](crate::sources::script::ScriptSource)'s
//! compile-time registry's job — it only manages the file, its metadata
//! entry, and its thumbnail as a unit.

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::codecs::gif::{GifDecoder, GifEncoder};
use image::{AnimationDecoder, Frame, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineStatus;
use crate::persistence;
use crate::playlist::PlaylistStore;
use crate::state::State;

/// Extension used for compiled-scene-equivalent "script" assets. This
/// crate has no scripting runtime (scenes are a compile-time registry, see
/// `sources::script`), so uploaded script assets are inert payloads
/// managed purely for lifecycle/metadata purposes, under a neutral
/// extension.
pub const SCRIPT_EXTENSION: &str = "scene";

/// Extension for GIF clip assets.
pub const CLIP_EXTENSION: &str = "gif";

/// Default upload size cap.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Thumbnails are rendered at this multiple of device resolution.
pub const THUMBNAIL_SCALE: u32 = 2;

/// Delay before an automatic thumbnail capture fires for a newly-activated
/// script scene with no thumbnail yet.
pub const DEFERRED_THUMBNAIL_DELAY: Duration = Duration::from_secs(15);

/// The preview frame upscale factor, mirrored here so the deferred
/// thumbnail capture can downscale back to device resolution (see
/// `engine::preview`).
const PREVIEW_SCALE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Clip,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("filename {0:?} is invalid: must not contain '..', '/', or '\\\\'")]
    InvalidFilename(String),
    #[error("unsupported file type for {0:?}: only .{SCRIPT_EXTENSION} and .{CLIP_EXTENSION} are accepted")]
    UnsupportedExtension(String),
    #[error("upload of {filename:?} is {size} bytes, over the {max} byte limit")]
    TooLarge { filename: String, size: u64, max: u64 },
    #[error("no asset named {0:?}")]
    NotFound(String),
    #[error("an asset named {0:?} already exists")]
    DestinationExists(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode GIF {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

fn io_err(path: &Path, source: std::io::Error) -> AssetError {
    AssetError::Io { path: path.display().to_string(), source }
}

/// Metadata for one scene file, keyed by filename in `data/library.json`.
/// `extra` round-trips any keys this crate doesn't know about, so an
/// embedding application can layer its own fields onto an entry without
/// this crate needing to model them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SceneMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

type LibraryDoc = HashMap<String, SceneMetadata>;

/// Rejects filenames containing path-traversal or separator components.
pub fn validate_filename(name: &str) -> Result<(), AssetError> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(AssetError::InvalidFilename(name.to_string()));
    }
    Ok(())
}

/// Classifies a filename as a script or clip asset by extension, or
/// rejects it as unsupported.
pub fn classify(filename: &str) -> Result<AssetKind, AssetError> {
    let ext = Path::new(filename).extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        SCRIPT_EXTENSION => Ok(AssetKind::Script),
        CLIP_EXTENSION => Ok(AssetKind::Clip),
        _ => Err(AssetError::UnsupportedExtension(filename.to_string())),
    }
}

/// Derives a display title from a filename: strip the extension, replace
/// `_` with spaces, title-case each word.
pub fn derive_title(filename: &str) -> String {
    let stem = Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
    stem.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Atomically writes `bytes` to `path` (temp file, then rename),
/// best-effort removing the partial file if the write fails partway.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AssetError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("upload")
    ));
    if let Err(e) = fs::write(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(&tmp, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        io_err(path, e)
    })
}

/// Owns `scenes/{scripts,clips,thumbnails}` and `data/library.json`.
///
/// Holds a handle to the [`PlaylistStore`] so [`rename`](Self::rename) can
/// cascade a filename change into every playlist item that references it.
pub struct AssetStore {
    scripts_dir: PathBuf,
    clips_dir: PathBuf,
    thumbnails_dir: PathBuf,
    library_path: PathBuf,
    library: LibraryDoc,
    width: u32,
    height: u32,
    max_upload_bytes: u64,
    playlists: Arc<Mutex<PlaylistStore>>,
}

impl AssetStore {
    /// Loads `data/library.json` and ensures the asset directory tree
    /// exists under `assets_root` (`scripts/`, `clips/`, `thumbnails/`).
    /// Directory-creation failures are logged, not fatal — the store still
    /// functions for operations that don't need the missing directory.
    pub fn load(
        assets_root: &Path,
        data_root: &Path,
        width: u32,
        height: u32,
        playlists: Arc<Mutex<PlaylistStore>>,
    ) -> Self {
        let scripts_dir = assets_root.join("scripts");
        let clips_dir = assets_root.join("clips");
        let thumbnails_dir = assets_root.join("thumbnails");
        for dir in [&scripts_dir, &clips_dir, &thumbnails_dir] {
            if let Err(e) = fs::create_dir_all(dir) {
                log::warn!("failed to create asset directory {}: {e}", dir.display());
            }
        }

        let library_path = data_root.join("library.json");
        let library: LibraryDoc = persistence::load_or_default(&library_path, LibraryDoc::default());

        Self {
            scripts_dir,
            clips_dir,
            thumbnails_dir,
            library_path,
            library,
            width,
            height,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            playlists,
        }
    }

    fn dir_for(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Script => &self.scripts_dir,
            AssetKind::Clip => &self.clips_dir,
        }
    }

    /// Locates which asset directory currently holds `filename`.
    fn locate(&self, filename: &str) -> Option<PathBuf> {
        let script_path = self.scripts_dir.join(filename);
        if script_path.exists() {
            return Some(script_path);
        }
        let clip_path = self.clips_dir.join(filename);
        if clip_path.exists() {
            return Some(clip_path);
        }
        None
    }

    fn thumbnail_path(&self, filename: &str) -> PathBuf {
        self.thumbnails_dir.join(format!("{filename}.png"))
    }

    /// Validates, classifies, and writes a new asset. GIF clips are
    /// resized per-frame to device resolution (preserving each frame's
    /// authored delay) and a `THUMBNAIL_SCALE`x device-resolution thumbnail
    /// is extracted from the first frame. Initializes a metadata entry
    /// with a title derived from `filename`, preserving any other fields
    /// already present under that key.
    pub fn upload(&mut self, filename: &str, bytes: &[u8]) -> Result<(), AssetError> {
        validate_filename(filename)?;
        let kind = classify(filename)?;

        let size = bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(AssetError::TooLarge { filename: filename.to_string(), size, max: self.max_upload_bytes });
        }

        let dest = self.dir_for(kind).join(filename);

        match kind {
            AssetKind::Script => {
                write_atomic(&dest, bytes)?;
            }
            AssetKind::Clip => {
                let (resized_gif, thumbnail_png) = self.process_gif_upload(filename, bytes)?;
                write_atomic(&dest, &resized_gif)?;
                if let Err(e) = self.write_thumbnail(filename, &thumbnail_png) {
                    log::warn!("failed to write thumbnail for {filename}: {e}");
                }
            }
        }

        let entry = self.library.entry(filename.to_string()).or_default();
        entry.title = derive_title(filename);
        self.persist_library();

        Ok(())
    }

    /// Decodes `bytes` as a GIF, resizes every frame to device resolution
    /// (preserving per-frame delay), and re-encodes it. Also renders a
    /// `THUMBNAIL_SCALE`x device-resolution PNG thumbnail from the first
    /// frame.
    fn process_gif_upload(&self, filename: &str, bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>), AssetError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .map_err(|e| AssetError::Decode { path: filename.to_string(), source: e })?;
        let gif_frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| AssetError::Decode { path: filename.to_string(), source: e })?;

        let mut resized_frames = Vec::with_capacity(gif_frames.len());
        let mut first_frame_thumbnail = None;

        for frame in &gif_frames {
            let rgba = frame.buffer();
            let resized = image::imageops::resize(rgba, self.width, self.height, image::imageops::FilterType::Lanczos3);
            resized_frames.push(Frame::from_parts(resized, 0, 0, frame.delay()));

            if first_frame_thumbnail.is_none() {
                let thumb = image::imageops::resize(
                    rgba,
                    self.width * THUMBNAIL_SCALE,
                    self.height * THUMBNAIL_SCALE,
                    image::imageops::FilterType::Lanczos3,
                );
                first_frame_thumbnail = Some(thumb);
            }
        }

        let mut gif_buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut gif_buf);
            for frame in resized_frames {
                encoder
                    .encode_frame(frame)
                    .map_err(|e| AssetError::Decode { path: filename.to_string(), source: e })?;
            }
        }

        let mut thumb_buf = Vec::new();
        if let Some(thumb) = first_frame_thumbnail {
            image::DynamicImage::ImageRgba8(thumb)
                .to_rgb8()
                .write_to(&mut Cursor::new(&mut thumb_buf), ImageFormat::Png)
                .map_err(|e| AssetError::Decode { path: filename.to_string(), source: e })?;
        }

        Ok((gif_buf, thumb_buf))
    }

    fn write_thumbnail(&mut self, filename: &str, png_bytes: &[u8]) -> Result<(), AssetError> {
        write_atomic(&self.thumbnail_path(filename), png_bytes)
    }

    /// Renames an asset: the file itself, its thumbnail if present, its
    /// metadata key (payload preserved unchanged), and every
    /// [`PlaylistItem`](crate::playlist::PlaylistItem) referencing the old
    /// filename.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), AssetError> {
        validate_filename(new)?;

        let old_ext = Path::new(old).extension().and_then(|e| e.to_str());
        let new_ext = Path::new(new).extension().and_then(|e| e.to_str());
        let new = if old_ext.is_some() && old_ext != new_ext {
            format!("{new}.{}", old_ext.unwrap())
        } else {
            new.to_string()
        };

        let src = self.locate(old).ok_or_else(|| AssetError::NotFound(old.to_string()))?;
        let dir = src.parent().expect("asset path always has a parent").to_path_buf();
        let dest = dir.join(&new);
        if dest.exists() {
            return Err(AssetError::DestinationExists(new.clone()));
        }

        fs::rename(&src, &dest).map_err(|e| io_err(&src, e))?;

        let thumb_src = self.thumbnail_path(old);
        if thumb_src.exists() {
            let thumb_dest = self.thumbnail_path(&new);
            if thumb_dest.exists() {
                let _ = fs::remove_file(&thumb_dest);
            }
            if let Err(e) = fs::rename(&thumb_src, &thumb_dest) {
                log::warn!("failed to rename thumbnail {} -> {}: {e}", thumb_src.display(), thumb_dest.display());
            }
        }

        if let Some(meta) = self.library.remove(old) {
            self.library.insert(new.clone(), meta);
        }
        self.persist_library();

        let updated = self.playlists.lock().expect("playlist mutex poisoned").update_scene_filename(old, &new);
        if updated > 0 {
            log::info!("renamed {old} -> {new}, updated {updated} playlist(s)");
        }

        Ok(())
    }

    /// Removes an asset, its thumbnail, and its metadata entry.
    pub fn delete(&mut self, filename: &str) -> Result<(), AssetError> {
        let src = self.locate(filename).ok_or_else(|| AssetError::NotFound(filename.to_string()))?;
        fs::remove_file(&src).map_err(|e| io_err(&src, e))?;

        let thumb = self.thumbnail_path(filename);
        if thumb.exists() {
            if let Err(e) = fs::remove_file(&thumb) {
                log::warn!("failed to remove thumbnail for {filename}: {e}");
            }
        }

        self.library.remove(filename);
        self.persist_library();
        Ok(())
    }

    /// Returns the stored thumbnail PNG bytes for `filename`, if any.
    pub fn thumbnail(&self, filename: &str) -> Option<Vec<u8>> {
        fs::read(self.thumbnail_path(filename)).ok()
    }

    pub fn get_metadata(&self, filename: &str) -> Option<&SceneMetadata> {
        self.library.get(filename)
    }

    pub fn list_metadata(&self) -> &HashMap<String, SceneMetadata> {
        &self.library
    }

    fn persist_library(&self) {
        if let Err(e) = persistence::save(&self.library_path, &self.library) {
            log::warn!("failed to persist library.json: {e}");
        }
    }

    /// Schedules a deferred thumbnail capture: after
    /// [`DEFERRED_THUMBNAIL_DELAY`], if `filename` is still the active
    /// scene and still has no thumbnail, downscales the engine's current
    /// preview frame (captured at `PREVIEW_SCALE`x) back to device
    /// resolution and stores it as the thumbnail. Cancels silently (does
    /// nothing) if the active scene changed in the meantime.
    pub fn schedule_thumbnail_capture(
        store: Arc<Mutex<AssetStore>>,
        state: State,
        status: EngineStatus,
        filename: String,
    ) -> JoinHandle<()> {
        Self::schedule_thumbnail_capture_after(store, state, status, filename, DEFERRED_THUMBNAIL_DELAY)
    }

    fn schedule_thumbnail_capture_after(
        store: Arc<Mutex<AssetStore>>,
        state: State,
        status: EngineStatus,
        filename: String,
        delay: Duration,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            thread::sleep(delay);

            if state.active_scene_filename().as_deref() != Some(filename.as_str()) {
                return;
            }

            let already_has_thumbnail = store.lock().expect("asset mutex poisoned").thumbnail(&filename).is_some();
            if already_has_thumbnail {
                return;
            }

            let Some(preview_png) = status.get_preview_frame() else {
                log::debug!("no preview frame available yet for deferred thumbnail of {filename}");
                return;
            };

            let preview_img = match image::load_from_memory(&preview_png) {
                Ok(img) => img,
                Err(e) => {
                    log::debug!("failed to decode preview frame for deferred thumbnail of {filename}: {e}");
                    return;
                }
            };

            let mut guard = store.lock().expect("asset mutex poisoned");
            if guard.thumbnail(&filename).is_some() {
                return;
            }
            let (w, h) = (guard.width, guard.height);
            debug_assert_eq!(preview_img.width(), w * PREVIEW_SCALE);
            let downscaled = preview_img.resize_exact(w, h, image::imageops::FilterType::Nearest).to_rgb8();

            let mut png_bytes = Vec::new();
            if downscaled.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png).is_err() {
                log::debug!("failed to encode deferred thumbnail for {filename}");
                return;
            }

            if let Err(e) = guard.write_thumbnail(&filename, &png_bytes) {
                log::warn!("failed to store deferred thumbnail for {filename}: {e}");
            }
        })
    }
}
