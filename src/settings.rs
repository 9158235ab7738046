//! Settings file support
//!
//! An optional TOML file adjusts what the command line does not cover:
//! directory and model naming, the worker count, renderer commands and the
//! template directory. Every table is optional and only the keys present
//! override the defaults.
//!
//! ```toml
//! templates_dir = "my_templates"
//!
//! [naming]
//! marker_dir_prefix = "tag_"
//!
//! [batch]
//! workers = 4
//!
//! [renderers.aruco]
//! command = ["python3", "make_aruco.py", "{dictionary}", "{id}", "{pixels}"]
//!
//! [renderers.alvar]
//! builtin = "bit-grid"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::config::Naming;
use crate::render::{CommandSpec, MarkerType, RendererKind, TextureFactory};

/// Worker count used when neither settings nor flags choose one
pub const DEFAULT_WORKERS: usize = 10;

/// `builtin = "..."` name of the original ArUco dictionary renderer
pub const ARUCO_ORIGINAL_RENDERER: &str = "aruco-original";
/// `builtin = "..."` name of the raw ID bit renderer
pub const BIT_GRID_RENDERER: &str = "bit-grid";

/// Errors that can occur when loading or parsing settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid renderer for {marker_type}: {message}")]
    InvalidRenderer {
        marker_type: MarkerType,
        message: String,
    },
    #[error("Worker count must be at least 1")]
    InvalidWorkers,
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Load templates from here instead of the embedded set
    pub templates_dir: Option<PathBuf>,
    pub workers: usize,
    pub naming: Naming,
    pub renderers: TextureFactory,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            templates_dir: None,
            workers: DEFAULT_WORKERS,
            naming: Naming::default(),
            renderers: TextureFactory::default(),
        }
    }
}

/// TOML structure for deserializing settings
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSettings {
    templates_dir: Option<PathBuf>,
    naming: Option<Naming>,
    batch: Option<TomlBatch>,
    renderers: Option<TomlRenderers>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBatch {
    workers: Option<usize>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRenderers {
    aruco: Option<TomlRenderer>,
    alvar: Option<TomlRenderer>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRenderer {
    builtin: Option<String>,
    command: Option<Vec<String>>,
}

impl TomlRenderer {
    fn into_kind(self, marker_type: MarkerType) -> Result<RendererKind, SettingsError> {
        let invalid = |message: String| SettingsError::InvalidRenderer {
            marker_type,
            message,
        };
        match (self.builtin, self.command) {
            (Some(name), None) if name == ARUCO_ORIGINAL_RENDERER => {
                Ok(RendererKind::ArucoOriginal)
            }
            (Some(name), None) if name == BIT_GRID_RENDERER => Ok(RendererKind::BitGrid),
            (Some(name), None) => Err(invalid(format!(
                "unknown builtin '{}', expected '{}' or '{}'",
                name, ARUCO_ORIGINAL_RENDERER, BIT_GRID_RENDERER
            ))),
            (None, Some(argv)) => CommandSpec::from_argv(&argv)
                .map(RendererKind::Command)
                .ok_or_else(|| invalid("command must name a program".to_string())),
            (Some(_), Some(_)) => Err(invalid(
                "set either 'builtin' or 'command', not both".to_string(),
            )),
            (None, None) => Err(invalid("set 'builtin' or 'command'".to_string())),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// A relative `templates_dir` is taken relative to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let mut settings = Self::from_str(&content)?;

        if let (Some(dir), Some(base)) = (&settings.templates_dir, path.parent()) {
            if dir.is_relative() {
                settings.templates_dir = Some(base.join(dir));
            }
        }
        Ok(settings)
    }

    /// Load settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let parsed: TomlSettings = toml::from_str(content)?;
        let mut settings = Settings::default();

        settings.templates_dir = parsed.templates_dir;
        if let Some(naming) = parsed.naming {
            settings.naming = naming;
        }
        if let Some(workers) = parsed.batch.and_then(|b| b.workers) {
            if workers == 0 {
                return Err(SettingsError::InvalidWorkers);
            }
            settings.workers = workers;
        }
        if let Some(renderers) = parsed.renderers {
            for (marker_type, renderer) in [
                (MarkerType::Aruco, renderers.aruco),
                (MarkerType::Alvar, renderers.alvar),
            ] {
                if let Some(renderer) = renderer {
                    settings.renderers = settings
                        .renderers
                        .with_renderer(marker_type, renderer.into_kind(marker_type)?);
                }
            }
        }

        Ok(settings)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
