//! Marker Model Generator - batch creation of fiducial marker simulator models
//!
//! This library turns a marker ID specification into one model directory per
//! marker: a model config, a model description with box or plane geometry,
//! a material script and the marker texture.
//!
//! # Example
//!
//! ```rust
//! use marker_model_generator::ids::parse_ids;
//!
//! let ids = parse_ids("7,10,23").unwrap();
//! assert_eq!(ids.len(), 3);
//! assert_eq!(ids.padding_width(), 2);
//! ```
//!
//! ```rust,no_run
//! use marker_model_generator::{generate, GeneratorConfig, OutputLayout};
//!
//! let config = GeneratorConfig::new().with_layout(OutputLayout::new("/tmp/markers"));
//! let report = generate("0-9", &config, &mut std::io::stdout()).unwrap();
//! assert!(report.is_success());
//! ```

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod ids;
pub mod progress;
pub mod render;
pub mod settings;
pub mod template;

pub use batch::{BatchGenerator, BatchOptions, BatchReport};
pub use builder::{MarkerArtifact, MarkerBuilder, TaskError, TaskErrorKind};
pub use config::{Geometry, MarkerSpec, Naming, OutputLayout};
pub use error::FormatError;
pub use ids::{parse_ids, MarkerId, MarkerIdSet};
pub use render::{MarkerRenderer, MarkerType, RendererKind, TextureFactory};
pub use settings::{Settings, SettingsError};
pub use template::{TemplateBundle, TemplateError};

use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can stop a batch
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Malformed ID specification
    #[error("{0}")]
    Format(#[from] FormatError),

    /// Templates could not be loaded; nothing was written
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Marker parameters cannot produce a model
    #[error("invalid marker parameters: {0}")]
    InvalidSpec(String),

    #[error("no marker IDs to generate")]
    BatchEmpty,

    /// Console output could not be written
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// At least one marker failed; the others were still built
    #[error("{} marker(s) failed: {}", .0.len(), format_task_errors(.0))]
    TaskFailures(Vec<TaskError>),
}

fn format_task_errors(errors: &[TaskError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration for a complete generation run
#[derive(Debug, Clone, Default)]
pub struct GeneratorConfig {
    /// Parameters shared by every marker
    pub spec: MarkerSpec,
    /// Output directory and naming
    pub layout: OutputLayout,
    /// Worker pool and reporting mode
    pub batch: BatchOptions,
    /// Template directory; the embedded templates when unset
    pub templates_dir: Option<PathBuf>,
    /// Renderer per marker type
    pub renderers: TextureFactory,
}

impl GeneratorConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spec(mut self, spec: MarkerSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_batch(mut self, batch: BatchOptions) -> Self {
        self.batch = batch;
        self
    }

    pub fn with_templates_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.templates_dir = dir;
        self
    }

    pub fn with_renderers(mut self, renderers: TextureFactory) -> Self {
        self.renderers = renderers;
        self
    }

    /// Apply a settings file: naming, worker count, renderers and templates
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.layout.naming = settings.naming;
        self.batch = self.batch.with_workers(settings.workers);
        self.renderers = settings.renderers;
        if settings.templates_dir.is_some() {
            self.templates_dir = settings.templates_dir;
        }
        self
    }
}

/// Parse an ID specification and generate every marker in it
///
/// Fails before writing anything when the IDs, the marker parameters, the
/// renderer choice or the templates are invalid. Per-marker failures are
/// returned in the report.
pub fn generate(
    ids: &str,
    config: &GeneratorConfig,
    out: &mut dyn Write,
) -> Result<BatchReport, GenerateError> {
    let ids = parse_ids(ids)?;
    generate_set(&ids, config, out)
}

/// Generate every marker in an already parsed ID set
pub fn generate_set(
    ids: &MarkerIdSet,
    config: &GeneratorConfig,
    out: &mut dyn Write,
) -> Result<BatchReport, GenerateError> {
    if ids.is_empty() {
        return Err(GenerateError::BatchEmpty);
    }
    config.spec.validate().map_err(GenerateError::InvalidSpec)?;
    config
        .renderers
        .validate(&config.spec, ids.max())
        .map_err(GenerateError::InvalidSpec)?;
    let templates = TemplateBundle::load(config.templates_dir.as_deref())?;
    log::debug!("using templates from {:?}", templates.source());

    BatchGenerator::new(&config.spec, &config.layout, &templates, &config.renderers)
        .with_options(config.batch.clone())
        .run(ids, out)
}
