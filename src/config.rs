//! Marker parameters and output layout

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ids::MarkerId;
use crate::render::MarkerType;

/// File name of the generated model configuration
pub const MODEL_CONFIG_FILE: &str = "model.config";
/// File name of the generated model description
pub const MODEL_SDF_FILE: &str = "model.sdf";
/// File name of the generated material script
pub const MATERIAL_FILE: &str = "marker.material";
/// Material script directory, relative to a marker directory
pub const SCRIPTS_DIR: &str = "materials/scripts";
/// Texture directory, relative to a marker directory
pub const TEXTURES_DIR: &str = "materials/textures";

/// Reference ratio between texture pixels and marker size: 2000 px per 0.14 m
pub const PIXELS_PER_REFERENCE: f64 = 2000.0;
pub const REFERENCE_SIZE_M: f64 = 0.14;

/// Shape the marker texture is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Geometry {
    /// A thin box resting on the ground plane
    Box,
    /// A flat plane with an upward normal
    Plane,
}

/// Parameters shared by every marker in a batch
///
/// Lengths are in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub marker_type: MarkerType,
    /// ArUco dictionary number; `None` leaves the choice to the renderer
    pub dictionary: Option<u32>,
    pub geometry: Geometry,
    /// Edge length of the printed marker
    pub size: f64,
    /// Box height; ignored for planes
    pub thickness: f64,
    /// Uniform border added around the marker
    pub border_size: f64,
    pub model_version: f64,
    pub sdf_version: f64,
    pub author: String,
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            marker_type: MarkerType::Aruco,
            dictionary: None,
            geometry: Geometry::Box,
            size: 0.09,
            thickness: 0.001,
            border_size: 0.0,
            model_version: 1.0,
            sdf_version: 1.5,
            author: "User".to_string(),
        }
    }
}

impl MarkerSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker_type(mut self, marker_type: MarkerType) -> Self {
        self.marker_type = marker_type;
        self
    }

    pub fn with_dictionary(mut self, dictionary: u32) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_border_size(mut self, border_size: f64) -> Self {
        self.border_size = border_size;
        self
    }

    pub fn with_versions(mut self, model_version: f64, sdf_version: f64) -> Self {
        self.model_version = model_version;
        self.sdf_version = sdf_version;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Reject sizes that cannot produce a model
    ///
    /// `size > 2 * border_size` is not checked; the border grows the model
    /// outward instead of eating into the marker.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(format!("marker size must be positive, got {}", self.size));
        }
        if self.geometry == Geometry::Box && !(self.thickness.is_finite() && self.thickness > 0.0)
        {
            return Err(format!("box thickness must be positive, got {}", self.thickness));
        }
        if !(self.border_size.is_finite() && self.border_size >= 0.0) {
            return Err(format!(
                "border size must not be negative, got {}",
                self.border_size
            ));
        }
        Ok(())
    }

    /// Edge length of the model, border included
    pub fn model_size(&self) -> f64 {
        self.size + 2.0 * self.border_size
    }

    /// Pixel edge length requested from the renderer
    pub fn texture_pixels(&self) -> u32 {
        (PIXELS_PER_REFERENCE * (self.size / REFERENCE_SIZE_M)) as u32
    }

    /// Border width in pixels for a rendered image of the given height
    pub fn border_pixels(&self, image_height: u32) -> u32 {
        (self.border_size * (f64::from(image_height) / self.size)) as u32
    }
}

/// Names used for generated directories and models
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Naming {
    /// Prefix of each marker directory, followed by the unpadded ID
    pub marker_dir_prefix: String,
    /// Prefix of each model name, followed by the zero-padded ID
    pub model_name_prefix: String,
    /// Prefix of each material texture identifier
    pub texture_name_prefix: String,
    pub root_dir_name: String,
    pub tag_images_dir_name: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            marker_dir_prefix: "alvar_marker_".to_string(),
            model_name_prefix: "ALVAR marker ID-".to_string(),
            texture_name_prefix: "alvar_marker_id_".to_string(),
            root_dir_name: "alvar_markers".to_string(),
            tag_images_dir_name: "alvar_marker_images".to_string(),
        }
    }
}

/// Where generated models are written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayout {
    pub output_dir: PathBuf,
    /// Nest all models under [`Naming::root_dir_name`]
    pub create_root_dir: bool,
    /// Also copy every texture into [`Naming::tag_images_dir_name`]
    pub copy_tag_images: bool,
    pub naming: Naming,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./"),
            create_root_dir: true,
            copy_tag_images: false,
            naming: Naming::default(),
        }
    }
}

impl OutputLayout {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_root_dir(mut self, create_root_dir: bool) -> Self {
        self.create_root_dir = create_root_dir;
        self
    }

    pub fn with_tag_images(mut self, copy_tag_images: bool) -> Self {
        self.copy_tag_images = copy_tag_images;
        self
    }

    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    /// Directory that holds the marker directories
    pub fn base_dir(&self) -> PathBuf {
        if self.create_root_dir {
            self.output_dir.join(&self.naming.root_dir_name)
        } else {
            self.output_dir.clone()
        }
    }

    pub fn marker_dir_name(&self, id: MarkerId) -> String {
        format!("{}{}", self.naming.marker_dir_prefix, id)
    }

    pub fn marker_dir(&self, id: MarkerId) -> PathBuf {
        self.base_dir().join(self.marker_dir_name(id))
    }

    pub fn tag_images_dir(&self) -> Option<PathBuf> {
        self.copy_tag_images
            .then(|| self.base_dir().join(&self.naming.tag_images_dir_name))
    }

    pub fn model_name(&self, id: MarkerId, padding: usize) -> String {
        format!("{}{}", self.naming.model_name_prefix, id.padded(padding))
    }

    pub fn texture_id(&self, id: MarkerId) -> String {
        format!("{}{}", self.naming.texture_name_prefix, id)
    }

    /// `model://` URI of a directory inside a marker directory
    pub fn model_uri(&self, id: MarkerId, relative: &str) -> String {
        format!("model://{}/{}/", self.marker_dir_name(id), relative)
    }
}

/// Format a number the way model files expect
///
/// Integral values keep one decimal place (`1.0`); everything else uses the
/// shortest representation that round-trips (`0.0005`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Join a relative path onto a directory, used for display in errors
pub(crate) fn join(dir: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(dir.to_path_buf(), |path, part| path.join(part))
}
