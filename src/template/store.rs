//! Template store: the three immutable templates shared by every marker task

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::document::{Document, DocumentError};

/// File name of the model configuration template
pub const CONFIG_TEMPLATE: &str = "model.config";
/// File name of the model description template
pub const MODEL_TEMPLATE: &str = "model.sdf";
/// File name of the material script template
pub const MATERIAL_TEMPLATE: &str = "marker.material";

/// Placeholder in the material script replaced by the texture identifier
pub const TEXTURE_ID_TOKEN: &str = "texture_id_name";
/// Placeholder in the material script replaced by the texture file name
pub const TEXTURE_FILE_TOKEN: &str = "texture_file_name";

/// Nodes of the config template that get filled in per marker
pub const CONFIG_NODES: &[&str] = &["name", "version", "sdf", "author/name"];

/// Nodes of the model template that get filled in per marker
pub const MODEL_NODES: &[&str] = &[
    "model",
    "model/link/pose",
    "model/link/collision/geometry",
    "model/link/visual/geometry",
    "model/link/visual/material/script",
    "model/link/visual/material/script/name",
];

const EMBEDDED_CONFIG: &str = include_str!("../../templates/model.config");
const EMBEDDED_MODEL: &str = include_str!("../../templates/model.sdf");
const EMBEDDED_MATERIAL: &str = include_str!("../../templates/marker.material");

/// Errors that can occur while loading templates
///
/// Any of these aborts the batch before a single marker is built.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template file does not exist
    #[error("template file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Template file exists but could not be read
    #[error("error reading template file {}: {message}", path.display())]
    FileReadError { path: PathBuf, message: String },

    /// Template is not a well-formed document, or lacks a node the builder fills in
    #[error("invalid template {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: DocumentError,
    },

    /// Material script lacks one of the substitution tokens
    #[error("template {name} is missing placeholder '{token}'")]
    MissingPlaceholder { name: String, token: String },
}

/// Where a bundle was loaded from
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    Embedded,
    Directory(PathBuf),
}

/// The config, model and material templates, loaded once per batch
///
/// The bundle only hands out shared references or fresh copies, so a
/// marker task can never edit the originals other tasks read from.
#[derive(Debug, Clone)]
pub struct TemplateBundle {
    config: Document,
    model: Document,
    material: String,
    source: TemplateSource,
}

impl TemplateBundle {
    /// Templates compiled into the binary
    pub fn embedded() -> Result<Self, TemplateError> {
        Self::from_parts(EMBEDDED_CONFIG, EMBEDDED_MODEL, EMBEDDED_MATERIAL, TemplateSource::Embedded)
    }

    /// Load `model.config`, `model.sdf` and `marker.material` from a directory
    pub fn from_dir(dir: &Path) -> Result<Self, TemplateError> {
        let config = read_template(&dir.join(CONFIG_TEMPLATE))?;
        let model = read_template(&dir.join(MODEL_TEMPLATE))?;
        let material = read_template(&dir.join(MATERIAL_TEMPLATE))?;
        Self::from_parts(
            &config,
            &model,
            &material,
            TemplateSource::Directory(dir.to_path_buf()),
        )
    }

    /// Use templates from `dir` when given, the embedded set otherwise
    pub fn load(dir: Option<&Path>) -> Result<Self, TemplateError> {
        match dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::embedded(),
        }
    }

    /// Parse and validate template text
    pub fn from_parts(
        config_xml: &str,
        model_xml: &str,
        material: &str,
        source: TemplateSource,
    ) -> Result<Self, TemplateError> {
        let config = parse_document(CONFIG_TEMPLATE, config_xml, CONFIG_NODES)?;
        let model = parse_document(MODEL_TEMPLATE, model_xml, MODEL_NODES)?;

        for token in [TEXTURE_ID_TOKEN, TEXTURE_FILE_TOKEN] {
            if !material.contains(token) {
                return Err(TemplateError::MissingPlaceholder {
                    name: MATERIAL_TEMPLATE.to_string(),
                    token: token.to_string(),
                });
            }
        }

        Ok(Self {
            config,
            model,
            material: material.to_string(),
            source,
        })
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn config_template(&self) -> &Document {
        &self.config
    }

    pub fn model_template(&self) -> &Document {
        &self.model
    }

    pub fn material_template(&self) -> &str {
        &self.material
    }

    /// A private deep copy of the config template
    pub fn config_document(&self) -> Document {
        self.config.clone()
    }

    /// A private deep copy of the model template
    pub fn model_document(&self) -> Document {
        self.model.clone()
    }

    /// Material script with both placeholders substituted
    ///
    /// Only the first occurrence of each token is replaced.
    pub fn material_script(&self, texture_id: &str, texture_file: &str) -> String {
        self.material
            .replacen(TEXTURE_ID_TOKEN, texture_id, 1)
            .replacen(TEXTURE_FILE_TOKEN, texture_file, 1)
    }
}

fn read_template(path: &Path) -> Result<String, TemplateError> {
    if !path.is_file() {
        return Err(TemplateError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| TemplateError::FileReadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_document(name: &str, xml: &str, required: &[&str]) -> Result<Document, TemplateError> {
    let invalid = |source| TemplateError::Invalid {
        name: name.to_string(),
        source,
    };
    let doc = Document::parse(xml).map_err(invalid)?;
    doc.require_all(required).map_err(invalid)?;
    Ok(doc)
}
