//! Tunables and their JSON persistence.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::binding::Presentation;

/// Marker prefixed to every promoted name unless overridden.
pub const DEFAULT_NAME_PREFIX: &str = "Giant ";

/// Default uniform mesh scale of a promoted creature.
pub const DEFAULT_SCALE: f32 = 2.25;

/// Factor applied to health, shield and experience on promotion.
pub const GIANT_STAT_MULTIPLIER: f32 = 4.0;

/// Giants lumber.
pub const GIANT_SPEED_MULTIPLIER: f32 = 0.85;

/// Errors raised while loading or saving tunables.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("tunables I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid tunables JSON.
    #[error("invalid tunables file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The three user-facing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    /// Prepended to every promoted creature's name.
    pub name_prefix: String,
    /// Uniform visual scale of promoted creatures.
    pub scale: f32,
    /// Promote every eligible creature.
    pub cheat_mode: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            scale: DEFAULT_SCALE,
            cheat_mode: false,
        }
    }
}

impl Tunables {
    /// Load tunables from a JSON file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no tunables file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Save tunables as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialisation or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// The presentation effects these tunables produce.
    #[must_use]
    pub fn presentation(&self) -> Presentation {
        Presentation {
            scale: Vec3::splat(self.scale),
            speed_multiplier: GIANT_SPEED_MULTIPLIER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("giant_tunables_{}_{name}.json", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let t = Tunables::default();
        assert_eq!(t.name_prefix, "Giant ");
        assert!((t.scale - 2.25).abs() < f32::EPSILON);
        assert!(!t.cheat_mode);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let t = Tunables::load(&temp_path("missing")).unwrap();
        assert_eq!(t, Tunables::default());
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("save");
        let t = Tunables {
            name_prefix: "Huge ".to_string(),
            scale: 3.0,
            cheat_mode: true,
        };
        t.save(&path).unwrap();
        let loaded = Tunables::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, t);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let t: Tunables = serde_json::from_str(r#"{"cheat_mode": true}"#).unwrap();
        assert!(t.cheat_mode);
        assert_eq!(t.name_prefix, DEFAULT_NAME_PREFIX);
    }

    #[test]
    fn test_presentation_scale() {
        let p = Tunables::default().presentation();
        assert_eq!(p.scale, Vec3::splat(2.25));
    }
}
