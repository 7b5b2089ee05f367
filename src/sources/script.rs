//! Compile-time registry of named scene constructors.
//!
//! Dynamic discovery of scene code units (scanning a directory and loading
//! whatever is found at runtime) has no safe, idiomatic Rust analogue, and
//! concrete scene implementations are a separate concern from this crate
//! regardless — so `ScriptSource` answers "how does a scene get built from
//! a name" with a plain registry: the embedding application registers its
//! scene types by name at startup, and the engine/playlist look them up
//! the same way either way.

use std::collections::HashMap;

use thiserror::Error;

use crate::scene::Scene;

/// Builds a scene instance for the matrix's dimensions.
pub type SceneConstructor = fn(width: u32, height: u32) -> Box<dyn Scene>;

#[derive(Debug, Error)]
pub enum ScriptSourceError {
    #[error("no scene registered under name {0:?}")]
    NotRegistered(String),
}

/// A name -> constructor table. Cheap to clone; typically built once at
/// startup and shared by the engine and the playlist scene.
#[derive(Clone, Default)]
pub struct ScriptSource {
    constructors: HashMap<String, SceneConstructor>,
}

impl ScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scene constructor under `name`, replacing any prior
    /// registration with the same name.
    pub fn register(&mut self, name: impl Into<String>, ctor: SceneConstructor) -> &mut Self {
        self.constructors.insert(name.into(), ctor);
        self
    }

    /// Names of every registered scene, in no particular order.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Constructs a fresh scene instance for `name`.
    pub fn build(&self, name: &str, width: u32, height: u32) -> Result<Box<dyn Scene>, ScriptSourceError> {
        let ctor = self.constructors.get(name).ok_or_else(|| ScriptSourceError::NotRegistered(name.to_string()))?;
        Ok(ctor(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Surface;
    use crate::scene::SceneError;
    use crate::state::State;
    use std::time::Duration;

    struct Blank;
    impl Scene for Blank {
        fn update(&mut self, _state: &State, _dt: Duration) -> Result<(), SceneError> {
            Ok(())
        }
        fn draw(&mut self, _state: &State, surface: &mut Surface) -> Result<(), SceneError> {
            surface.clear();
            Ok(())
        }
    }

    fn build_blank(_w: u32, _h: u32) -> Box<dyn Scene> {
        Box::new(Blank)
    }

    #[test]
    fn build_unregistered_name_errors() {
        let source = ScriptSource::new();
        assert!(matches!(source.build("nope", 8, 8), Err(ScriptSourceError::NotRegistered(n)) if n == "nope"));
    }

    #[test]
    fn register_then_build_succeeds() {
        let mut source = ScriptSource::new();
        source.register("blank", build_blank as SceneConstructor);
        assert!(source.is_registered("blank"));
        assert!(source.build("blank", 8, 8).is_ok());
    }
}
