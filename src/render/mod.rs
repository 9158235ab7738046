//! Marker texture rendering
//!
//! The builder asks a [`MarkerRenderer`] for a marker image and never looks
//! at its pixels; it only adds a border and writes the file. The shipped
//! [`TextureFactory`] dispatches on [`MarkerType`] to a fixed table of
//! renderer kinds: the built-in original ArUco dictionary, a built-in bit
//! grid, or an external marker command.

pub mod aruco;
pub mod bitgrid;
pub mod border;
pub mod command;

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;

use crate::config::MarkerSpec;
use crate::ids::MarkerId;

pub use aruco::{render_aruco_original, ARUCO_ORIGINAL_DICTIONARY, ARUCO_ORIGINAL_MAX_ID};
pub use bitgrid::render_bit_grid;
pub use border::{apply_border, BORDER_COLOR};
pub use command::CommandSpec;

/// Marker family a texture is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MarkerType {
    Aruco,
    Alvar,
}

impl fmt::Display for MarkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerType::Aruco => write!(f, "aruco"),
            MarkerType::Alvar => write!(f, "alvar"),
        }
    }
}

/// Errors that can occur while producing a marker image
#[derive(Debug, Error)]
pub enum RendererError {
    /// Requested edge length cannot hold the marker pattern
    #[error("marker image of {pixels} px is too small to draw")]
    TooSmall { pixels: u32 },

    /// ID has no codeword in the renderer's dictionary
    #[error("marker ID {id} is outside the dictionary (largest ID is {max})")]
    UnsupportedId { id: MarkerId, max: u16 },

    /// External command could not be started
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External command ran but reported failure
    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// External command left no image behind
    #[error("renderer produced no PNG image in {}", dir.display())]
    NoOutput { dir: PathBuf },

    /// Rendered image could not be decoded
    #[error("failed to read rendered image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to scan {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One texture request from the builder
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub marker_type: MarkerType,
    pub id: MarkerId,
    /// Edge length of the square marker image, border excluded
    pub pixel_size: u32,
    /// Physical edge length in meters
    pub size: f64,
    /// Dictionary asked for on the command line, if any
    pub dictionary: Option<u32>,
    /// Directory the texture will be written to; command renderers run here
    pub work_dir: &'a Path,
}

/// A rendered marker and the file name it should be stored under
#[derive(Debug, Clone)]
pub struct RenderedMarker {
    pub image: RgbImage,
    pub file_name: String,
}

/// Source of marker images
pub trait MarkerRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedMarker, RendererError>;
}

/// How one marker type is rendered
#[derive(Debug, Clone, PartialEq)]
pub enum RendererKind {
    /// Draw codewords of the original ArUco dictionary (number 16)
    ArucoOriginal,
    /// Draw the raw ID bits; not readable by ArUco detectors
    BitGrid,
    /// Run an external marker generator
    Command(CommandSpec),
}

/// Dispatch table from marker type to renderer
#[derive(Debug, Clone, PartialEq)]
pub struct TextureFactory {
    pub aruco: RendererKind,
    pub alvar: RendererKind,
}

impl Default for TextureFactory {
    fn default() -> Self {
        Self {
            aruco: RendererKind::ArucoOriginal,
            alvar: RendererKind::Command(CommandSpec::alvar_create_marker()),
        }
    }
}

impl TextureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(mut self, marker_type: MarkerType, kind: RendererKind) -> Self {
        *self.kind_mut(marker_type) = kind;
        self
    }

    pub fn kind(&self, marker_type: MarkerType) -> &RendererKind {
        match marker_type {
            MarkerType::Aruco => &self.aruco,
            MarkerType::Alvar => &self.alvar,
        }
    }

    /// Reject a batch the configured renderer cannot draw faithfully
    ///
    /// Built-in renderers cannot draw arbitrary ArUco dictionaries, so an
    /// explicit dictionary they do not provide is an error rather than being
    /// ignored.
    pub fn validate(&self, spec: &MarkerSpec, max_id: Option<MarkerId>) -> Result<(), String> {
        match (self.kind(spec.marker_type), spec.dictionary) {
            (RendererKind::ArucoOriginal, Some(dict)) if dict != ARUCO_ORIGINAL_DICTIONARY => {
                Err(format!(
                    "the built-in ArUco renderer only draws dictionary {}, got {}; \
                     configure [renderers.aruco] command for other dictionaries",
                    ARUCO_ORIGINAL_DICTIONARY, dict
                ))
            }
            (RendererKind::ArucoOriginal, _) => match max_id {
                Some(id) if id.value() > ARUCO_ORIGINAL_MAX_ID => Err(format!(
                    "marker ID {} is outside ArUco dictionary {} (largest ID is {})",
                    id, ARUCO_ORIGINAL_DICTIONARY, ARUCO_ORIGINAL_MAX_ID
                )),
                _ => Ok(()),
            },
            (RendererKind::BitGrid, Some(dict)) if spec.marker_type == MarkerType::Aruco => {
                Err(format!(
                    "the bit-grid renderer draws no ArUco dictionary, got dictionary {}",
                    dict
                ))
            }
            _ => Ok(()),
        }
    }

    fn kind_mut(&mut self, marker_type: MarkerType) -> &mut RendererKind {
        match marker_type {
            MarkerType::Aruco => &mut self.aruco,
            MarkerType::Alvar => &mut self.alvar,
        }
    }
}

impl MarkerRenderer for TextureFactory {
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedMarker, RendererError> {
        match self.kind(request.marker_type) {
            RendererKind::ArucoOriginal => Ok(RenderedMarker {
                image: render_aruco_original(request.id, request.pixel_size)?,
                file_name: format!("marker{}.png", request.id),
            }),
            RendererKind::BitGrid => Ok(RenderedMarker {
                image: render_bit_grid(request.id, request.pixel_size)?,
                file_name: format!("marker{}.png", request.id),
            }),
            RendererKind::Command(spec) => spec.run(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let factory = TextureFactory::default();
        assert_eq!(factory.kind(MarkerType::Aruco), &RendererKind::ArucoOriginal);
        assert!(matches!(
            factory.kind(MarkerType::Alvar),
            RendererKind::Command(_)
        ));
    }

    #[test]
    fn test_with_renderer_overrides_one_entry() {
        let factory = TextureFactory::new().with_renderer(MarkerType::Alvar, RendererKind::BitGrid);
        assert_eq!(factory.kind(MarkerType::Alvar), &RendererKind::BitGrid);
        assert_eq!(factory.kind(MarkerType::Aruco), &RendererKind::ArucoOriginal);
    }

    fn request(dir: &Path, marker_type: MarkerType) -> RenderRequest<'_> {
        RenderRequest {
            marker_type,
            id: MarkerId(42),
            pixel_size: 70,
            size: 0.09,
            dictionary: None,
            work_dir: dir,
        }
    }

    #[test]
    fn test_builtin_dispatch_names_file_by_id() {
        let dir = std::env::temp_dir();
        let factory = TextureFactory::default().with_renderer(MarkerType::Alvar, RendererKind::BitGrid);

        let aruco = factory.render(&request(&dir, MarkerType::Aruco)).expect("Should render");
        assert_eq!(aruco.file_name, "marker42.png");
        assert_eq!(aruco.image.dimensions(), (70, 70));

        let grid = factory.render(&request(&dir, MarkerType::Alvar)).expect("Should render");
        assert_eq!(grid.file_name, "marker42.png");
        assert_ne!(aruco.image, grid.image);
    }

    #[test]
    fn test_builtin_aruco_accepts_its_own_dictionary() {
        let factory = TextureFactory::default();
        let max = Some(MarkerId(1023));
        assert!(factory.validate(&MarkerSpec::new(), max).is_ok());
        assert!(factory
            .validate(&MarkerSpec::new().with_dictionary(ARUCO_ORIGINAL_DICTIONARY), max)
            .is_ok());
    }

    #[test]
    fn test_builtin_aruco_rejects_other_dictionaries() {
        let factory = TextureFactory::default();
        for dict in [0, 7, 15] {
            let err = factory
                .validate(&MarkerSpec::new().with_dictionary(dict), Some(MarkerId(1)))
                .unwrap_err();
            assert!(err.contains("only draws dictionary 16"), "{err}");
        }
    }

    #[test]
    fn test_builtin_aruco_rejects_ids_outside_dictionary() {
        let factory = TextureFactory::default();
        let err = factory
            .validate(&MarkerSpec::new(), Some(MarkerId(1024)))
            .unwrap_err();
        assert!(err.contains("1024"));
    }

    #[test]
    fn test_bit_grid_rejects_explicit_aruco_dictionary() {
        let factory = TextureFactory::default().with_renderer(MarkerType::Aruco, RendererKind::BitGrid);
        assert!(factory.validate(&MarkerSpec::new(), Some(MarkerId(4000))).is_ok());
        assert!(factory
            .validate(&MarkerSpec::new().with_dictionary(7), Some(MarkerId(1)))
            .is_err());
    }

    #[test]
    fn test_command_renderer_takes_any_dictionary() {
        let factory = TextureFactory::default().with_renderer(
            MarkerType::Aruco,
            RendererKind::Command(CommandSpec::new("gen", ["{dictionary}"])),
        );
        let spec = MarkerSpec::new().with_dictionary(7);
        assert!(factory.validate(&spec, Some(MarkerId(4000))).is_ok());
    }
}
