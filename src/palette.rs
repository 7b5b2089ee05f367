//! Named six-color palettes.
//!
//! Scenes that want a coherent, user-swappable color scheme look up colors
//! through [`State::get_palette_colors`](crate::state::State::get_palette_colors)
//! rather than hard-coding them. Eight built-in palettes ship with the
//! engine; users may add their own through [`PaletteStore::upsert`], stored
//! in `data/palettes.json`. Built-ins cannot be edited or deleted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Color;
use crate::persistence;

/// A named, fixed-size set of colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub id: String,
    pub name: String,
    pub colors: Vec<Color>,
}

/// The fixed palette size every palette, built-in or user-defined, must have.
pub const PALETTE_SIZE: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("palette {0:?} is built in and cannot be modified or deleted")]
    BuiltinReadOnly(String),
    #[error("palette {id:?} must have exactly {expected} colors, got {actual}")]
    WrongColorCount { id: String, expected: usize, actual: usize },
    #[error("no palette named {0:?}")]
    NotFound(String),
}

fn builtin_palettes() -> Vec<Palette> {
    fn p(id: &str, name: &str, hex: [&str; 6]) -> Palette {
        Palette {
            id: id.to_string(),
            name: name.to_string(),
            colors: hex.iter().map(|h| Color::from_hex(h).expect("builtin hex is well-formed")).collect(),
        }
    }

    vec![
        p("aurora", "Aurora", ["#172347", "#025385", "#0EF3C5", "#04E2B7", "#038298", "#015268"]),
        p("sunset", "Sunset", ["#FF6B6B", "#FF8E53", "#FFA07A", "#FFB347", "#FFD700", "#FF6347"]),
        p("ocean", "Ocean", ["#001F3F", "#0074D9", "#39CCCC", "#7FDBFF", "#B3E5FC", "#E0F7FA"]),
        p("forest", "Forest", ["#1B4332", "#2D6A4F", "#40916C", "#52B788", "#74C69D", "#95D5B2"]),
        p("neon", "Neon", ["#FF00FF", "#00FFFF", "#FF00AA", "#AA00FF", "#00FFAA", "#FFAA00"]),
        p("fire", "Fire", ["#8B0000", "#DC143C", "#FF4500", "#FF6347", "#FF8C00", "#FFA500"]),
        p("ice", "Ice", ["#000080", "#0000CD", "#4169E1", "#87CEEB", "#B0E0E6", "#E0F6FF"]),
        p("autumn", "Autumn", ["#8B4513", "#A0522D", "#CD853F", "#DEB887", "#F4A460", "#FFD700"]),
    ]
}

/// Default palette id selected for new installs.
pub const DEFAULT_PALETTE_ID: &str = "aurora";

/// `data/palettes.json` is a single JSON object keyed by palette id,
/// `{<id>: {id, name, colors}}` — user palettes only, matching the
/// persistence layout's external contract.
type PalettesDoc = HashMap<String, Palette>;

/// Holds the built-in palettes plus whatever user palettes have been
/// persisted to `data/palettes.json`.
pub struct PaletteStore {
    builtins: HashMap<String, Palette>,
    user: HashMap<String, Palette>,
    path: PathBuf,
}

impl PaletteStore {
    /// Loads user palettes from `<data_root>/palettes.json`. Built-ins are
    /// always present regardless of what's on disk.
    pub fn load(data_root: &Path) -> Self {
        let path = data_root.join("palettes.json");
        let user: PalettesDoc = persistence::load_or_default(&path, PalettesDoc::default());
        let builtins = builtin_palettes().into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { builtins, user, path }
    }

    /// All palettes, built-ins first, in a stable order.
    pub fn list(&self) -> Vec<&Palette> {
        let mut out: Vec<&Palette> = builtin_palettes_order().iter().filter_map(|id| self.builtins.get(*id)).collect();
        let mut user: Vec<&Palette> = self.user.values().collect();
        user.sort_by(|a, b| a.id.cmp(&b.id));
        out.extend(user);
        out
    }

    pub fn get(&self, id: &str) -> Option<&Palette> {
        self.builtins.get(id).or_else(|| self.user.get(id))
    }

    /// Inserts or replaces a user palette. Rejects palettes whose id
    /// collides with a built-in, or whose color count isn't exactly
    /// [`PALETTE_SIZE`].
    pub fn upsert(&mut self, palette: Palette) -> Result<(), PaletteError> {
        if self.builtins.contains_key(&palette.id) {
            return Err(PaletteError::BuiltinReadOnly(palette.id));
        }
        if palette.colors.len() != PALETTE_SIZE {
            return Err(PaletteError::WrongColorCount {
                id: palette.id,
                expected: PALETTE_SIZE,
                actual: palette.colors.len(),
            });
        }
        self.user.insert(palette.id.clone(), palette);
        self.persist();
        Ok(())
    }

    /// Removes a user palette. Built-ins cannot be deleted.
    pub fn delete(&mut self, id: &str) -> Result<(), PaletteError> {
        if self.builtins.contains_key(id) {
            return Err(PaletteError::BuiltinReadOnly(id.to_string()));
        }
        if self.user.remove(id).is_none() {
            return Err(PaletteError::NotFound(id.to_string()));
        }
        self.persist();
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = persistence::save(&self.path, &self.user) {
            log::warn!("failed to persist palettes.json: {e}");
        }
    }
}

fn builtin_palettes_order() -> &'static [&'static str] {
    &["aurora", "sunset", "ocean", "forest", "neon", "fire", "ice", "autumn"]
}
