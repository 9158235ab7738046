//! Template system for marker model files
//!
//! This module loads the three templates a marker model is made from and
//! provides the document tree they are edited through:
//!
//! - `model.config`: model metadata (name, version, author)
//! - `model.sdf`: model description with empty geometry slots
//! - `marker.material`: material script text with two placeholders
//!
//! # Example
//!
//! ```rust
//! use marker_model_generator::template::TemplateBundle;
//!
//! let bundle = TemplateBundle::embedded().unwrap();
//! let mut model = bundle.model_document();
//! model.require_mut("model/link/pose").unwrap().set_text("0.0 0.0 0.0 0.0 0.0 0.0");
//! ```

pub mod document;
mod store;

pub use document::{Declaration, Document, DocumentError, Element, Node};
pub use store::{
    TemplateBundle, TemplateError, TemplateSource, CONFIG_NODES, CONFIG_TEMPLATE,
    MATERIAL_TEMPLATE, MODEL_NODES, MODEL_TEMPLATE, TEXTURE_FILE_TOKEN, TEXTURE_ID_TOKEN,
};
