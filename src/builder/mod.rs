//! Single-marker builder
//!
//! Produces the complete model directory for one marker ID:
//!
//! ```text
//! <base>/<marker_dir_prefix><id>/
//!     model.config
//!     model.sdf
//!     materials/scripts/marker.material
//!     materials/textures/<texture file>
//! ```
//!
//! A builder only reads the shared spec, layout and templates; every edit
//! happens on a private copy, so many builds can run side by side.

mod error;
mod geometry;

pub use error::{TaskError, TaskErrorKind};

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::{
    format_float, join, MarkerSpec, OutputLayout, MATERIAL_FILE, MODEL_CONFIG_FILE,
    MODEL_SDF_FILE, SCRIPTS_DIR, TEXTURES_DIR,
};
use crate::ids::MarkerId;
use crate::render::{apply_border, MarkerRenderer, RenderRequest, BORDER_COLOR};
use crate::template::{Document, DocumentError, Element, TemplateBundle};

/// Everything written for one marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerArtifact {
    pub id: MarkerId,
    /// Zero-padded model name
    pub name: String,
    pub directory: PathBuf,
    pub config_file: PathBuf,
    pub model_file: PathBuf,
    pub material_file: PathBuf,
    pub texture_file: PathBuf,
    /// Copy of the texture in the shared tag images directory
    pub tag_image: Option<PathBuf>,
}

/// Builds marker models from shared, read-only inputs
pub struct MarkerBuilder<'a> {
    spec: &'a MarkerSpec,
    layout: &'a OutputLayout,
    templates: &'a TemplateBundle,
    renderer: &'a dyn MarkerRenderer,
    padding: usize,
}

impl<'a> MarkerBuilder<'a> {
    /// `padding` is the zero-padding width shared by the whole batch
    pub fn new(
        spec: &'a MarkerSpec,
        layout: &'a OutputLayout,
        templates: &'a TemplateBundle,
        renderer: &'a dyn MarkerRenderer,
        padding: usize,
    ) -> Self {
        Self {
            spec,
            layout,
            templates,
            renderer,
            padding,
        }
    }

    /// Write the full model directory for `id`
    ///
    /// Fails with a path conflict if the marker directory already exists.
    /// A failure part way leaves what was written so far in place.
    pub fn build(&self, id: MarkerId) -> Result<MarkerArtifact, TaskError> {
        let directory = self.layout.marker_dir(id);
        let scripts_dir = join(&directory, SCRIPTS_DIR);
        let textures_dir = join(&directory, TEXTURES_DIR);

        self.create_marker_dir(id, &directory)?;
        for dir in [&scripts_dir, &textures_dir] {
            fs::create_dir_all(dir).map_err(|e| TaskError::io(id, "create directory", dir, e))?;
        }
        let tag_images_dir = self.layout.tag_images_dir();
        if let Some(dir) = &tag_images_dir {
            // Shared by all tasks; create_dir_all tolerates concurrent creation
            fs::create_dir_all(dir).map_err(|e| TaskError::io(id, "create directory", dir, e))?;
        }

        let config_file = directory.join(MODEL_CONFIG_FILE);
        let config = self
            .model_config(id)
            .map_err(|e| TaskError::new(id, e))?;
        config
            .write_to(&config_file)
            .map_err(|e| TaskError::new(id, e))?;
        log::debug!("marker {}: wrote {}", id, config_file.display());

        let model_file = directory.join(MODEL_SDF_FILE);
        let model = self
            .model_description(id)
            .map_err(|e| TaskError::new(id, e))?;
        model
            .write_to(&model_file)
            .map_err(|e| TaskError::new(id, e))?;
        log::debug!("marker {}: wrote {}", id, model_file.display());

        let (texture_file, tag_image) =
            self.write_texture(id, &textures_dir, tag_images_dir.as_deref())?;
        log::debug!("marker {}: wrote {}", id, texture_file.display());

        let texture_name = texture_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let material_file = scripts_dir.join(MATERIAL_FILE);
        let script = self
            .templates
            .material_script(&self.layout.texture_id(id), &texture_name);
        fs::write(&material_file, script)
            .map_err(|e| TaskError::io(id, "write", &material_file, e))?;

        Ok(MarkerArtifact {
            id,
            name: self.layout.model_name(id, self.padding),
            directory,
            config_file,
            model_file,
            material_file,
            texture_file,
            tag_image,
        })
    }

    fn create_marker_dir(&self, id: MarkerId, directory: &Path) -> Result<(), TaskError> {
        if let Some(parent) = directory.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TaskError::io(id, "create directory", parent, e))?;
        }
        fs::create_dir(directory).map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => TaskError::path_conflict(id, directory),
            _ => TaskError::io(id, "create directory", directory, e),
        })
    }

    /// Config template filled in with name, versions and author
    pub fn model_config(&self, id: MarkerId) -> Result<Document, DocumentError> {
        let mut config = self.templates.config_document();

        config
            .require_mut("name")?
            .set_text(self.layout.model_name(id, self.padding));
        config
            .require_mut("version")?
            .set_text(format_float(self.spec.model_version));
        config
            .require_mut("sdf")?
            .set_attribute("version", format_float(self.spec.sdf_version));
        config
            .require_mut("author/name")?
            .set_text(self.spec.author.as_str());

        Ok(config)
    }

    /// Model template with geometry, pose and material references for `id`
    pub fn model_description(&self, id: MarkerId) -> Result<Document, DocumentError> {
        let mut model = self.templates.model_document();
        let geometry = self.spec.geometry;

        model
            .root_mut()
            .set_attribute("version", format_float(self.spec.sdf_version));
        model
            .require_mut("model")?
            .set_attribute("name", self.layout.model_name(id, self.padding));
        model
            .require_mut("model/link/pose")?
            .set_text(geometry.link_pose(self.spec.thickness));

        // Each slot gets its own element so later edits cannot leak across
        let shape = geometry.element(self.spec.model_size(), self.spec.thickness);
        model
            .require_mut("model/link/collision/geometry")?
            .append(shape.clone());
        model
            .require_mut("model/link/visual/geometry")?
            .append(shape);

        let script = model.require_mut("model/link/visual/material/script")?;
        script.append(Element::new("uri").with_text(self.layout.model_uri(id, SCRIPTS_DIR)));
        script.append(Element::new("uri").with_text(self.layout.model_uri(id, TEXTURES_DIR)));
        model
            .require_mut("model/link/visual/material/script/name")?
            .set_text(self.layout.texture_id(id));

        Ok(model)
    }

    /// Render, border and save the texture, plus the optional tag image copy
    fn write_texture(
        &self,
        id: MarkerId,
        textures_dir: &Path,
        tag_images_dir: Option<&Path>,
    ) -> Result<(PathBuf, Option<PathBuf>), TaskError> {
        let request = RenderRequest {
            marker_type: self.spec.marker_type,
            id,
            pixel_size: self.spec.texture_pixels(),
            size: self.spec.size,
            dictionary: self.spec.dictionary,
            work_dir: textures_dir,
        };
        let rendered = self
            .renderer
            .render(&request)
            .map_err(|e| TaskError::new(id, e))?;

        let image = if self.spec.border_size > 0.0 {
            let pixels = self.spec.border_pixels(rendered.image.height());
            apply_border(&rendered.image, pixels, BORDER_COLOR)
        } else {
            rendered.image
        };

        let texture_file = textures_dir.join(&rendered.file_name);
        image.save(&texture_file).map_err(|source| {
            TaskError::new(
                id,
                TaskErrorKind::Texture {
                    path: texture_file.clone(),
                    source,
                },
            )
        })?;

        let tag_image = match tag_images_dir {
            Some(dir) => {
                let copy = dir.join(&rendered.file_name);
                fs::copy(&texture_file, &copy)
                    .map_err(|e| TaskError::io(id, "copy texture to", &copy, e))?;
                Some(copy)
            }
            None => None,
        };

        Ok((texture_file, tag_image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Geometry;
    use crate::render::{RenderedMarker, RendererError, TextureFactory};
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    /// Renders a flat black square without touching the disk
    struct SolidRenderer;

    impl MarkerRenderer for SolidRenderer {
        fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedMarker, RendererError> {
            Ok(RenderedMarker {
                image: RgbImage::from_pixel(request.pixel_size, request.pixel_size, Rgb([0, 0, 0])),
                file_name: format!("solid{}.png", request.id),
            })
        }
    }

    struct FailingRenderer;

    impl MarkerRenderer for FailingRenderer {
        fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedMarker, RendererError> {
            Err(RendererError::NoOutput {
                dir: request.work_dir.to_path_buf(),
            })
        }
    }

    fn text_of<'d>(doc: &'d Document, path: &str) -> Option<&'d str> {
        doc.find(path).and_then(Element::text)
    }

    #[test]
    fn test_model_config_fields() {
        let spec = MarkerSpec::new().with_versions(2.0, 1.6).with_author("Lab");
        let layout = OutputLayout::default();
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 3);

        let config = builder.model_config(MarkerId(7)).expect("config");
        assert_eq!(text_of(&config, "name"), Some("ALVAR marker ID-007"));
        assert_eq!(text_of(&config, "version"), Some("2.0"));
        assert_eq!(
            config.find("sdf").and_then(|e| e.attribute("version")),
            Some("1.6")
        );
        assert_eq!(text_of(&config, "author/name"), Some("Lab"));
    }

    #[test]
    fn test_box_model_description() {
        let spec = MarkerSpec::default();
        let layout = OutputLayout::default();
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 2);

        let model = builder.model_description(MarkerId(7)).expect("model");
        assert_eq!(model.root().attribute("version"), Some("1.5"));
        assert_eq!(
            model.find("model").and_then(|e| e.attribute("name")),
            Some("ALVAR marker ID-07")
        );
        assert_eq!(
            text_of(&model, "model/link/pose"),
            Some("0.0 0.0 0.0005 0.0 0.0 0.0")
        );
        assert_eq!(
            text_of(&model, "model/link/collision/geometry/box/size"),
            Some("0.09 0.09 0.001")
        );
        assert_eq!(
            model.find("model/link/collision/geometry/box"),
            model.find("model/link/visual/geometry/box")
        );

        let script = model
            .find("model/link/visual/material/script")
            .expect("script");
        let uris: Vec<_> = script
            .children()
            .filter(|e| e.name() == "uri")
            .filter_map(Element::text)
            .collect();
        assert_eq!(
            uris,
            vec![
                "model://alvar_marker_7/materials/scripts/",
                "model://alvar_marker_7/materials/textures/"
            ]
        );
        assert_eq!(
            text_of(&model, "model/link/visual/material/script/name"),
            Some("alvar_marker_id_7")
        );
    }

    #[test]
    fn test_plane_model_description_includes_border() {
        let spec = MarkerSpec::new()
            .with_geometry(Geometry::Plane)
            .with_size(0.1)
            .with_border_size(0.05);
        let layout = OutputLayout::default();
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 1);

        let model = builder.model_description(MarkerId(3)).expect("model");
        assert_eq!(
            text_of(&model, "model/link/pose"),
            Some("0.0 0.0 0.0 0.0 0.0 0.0")
        );
        assert_eq!(
            text_of(&model, "model/link/visual/geometry/plane/normal"),
            Some("0 0 1")
        );
        assert_eq!(
            text_of(&model, "model/link/visual/geometry/plane/size"),
            Some("0.2 0.2")
        );
        assert!(model.find("model/link/collision/geometry/box").is_none());
    }

    #[test]
    fn test_templates_untouched_after_build() {
        let spec = MarkerSpec::default();
        let layout = OutputLayout::default();
        let templates = TemplateBundle::embedded().expect("templates");
        let pristine = templates.model_template().clone();
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 1);

        builder.model_description(MarkerId(1)).expect("model");
        assert_eq!(templates.model_template(), &pristine);
    }

    #[test]
    fn test_build_writes_all_files() {
        let out = tempfile::tempdir().expect("tempdir");
        let spec = MarkerSpec::new().with_size(0.0014);
        let layout = OutputLayout::new(out.path()).with_tag_images(true);
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 2);

        let artifact = builder.build(MarkerId(7)).expect("build");
        let dir = out.path().join("alvar_markers").join("alvar_marker_7");
        assert_eq!(artifact.directory, dir);
        assert_eq!(artifact.name, "ALVAR marker ID-07");
        assert!(dir.join("model.config").is_file());
        assert!(dir.join("model.sdf").is_file());
        assert!(dir.join("materials/scripts/marker.material").is_file());
        assert_eq!(
            artifact.texture_file,
            dir.join("materials/textures/solid7.png")
        );
        assert!(artifact.texture_file.is_file());
        assert_eq!(
            artifact.tag_image,
            Some(out.path().join("alvar_markers/alvar_marker_images/solid7.png"))
        );

        let script = fs::read_to_string(&artifact.material_file).expect("read");
        assert!(script.starts_with("material alvar_marker_id_7\n"));
        assert!(script.contains("texture solid7.png\n"));
    }

    #[test]
    fn test_border_is_applied_to_texture() {
        let out = tempfile::tempdir().expect("tempdir");
        let spec = MarkerSpec::new().with_size(0.014).with_border_size(0.0014);
        let pixels = spec.texture_pixels();
        let border = spec.border_pixels(pixels);
        assert!(border > 0);
        let layout = OutputLayout::new(out.path());
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 1);

        let artifact = builder.build(MarkerId(1)).expect("build");
        let texture = image::open(&artifact.texture_file).expect("png").to_rgb8();
        let edge = pixels + 2 * border;
        assert_eq!(texture.dimensions(), (edge, edge));
        assert_eq!(*texture.get_pixel(0, 0), BORDER_COLOR);
        assert_eq!(*texture.get_pixel(edge / 2, edge / 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_existing_directory_is_conflict() {
        let out = tempfile::tempdir().expect("tempdir");
        let spec = MarkerSpec::new().with_size(0.0014);
        let layout = OutputLayout::new(out.path());
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &SolidRenderer, 1);

        let existing = layout.marker_dir(MarkerId(4));
        fs::create_dir_all(&existing).expect("mkdir");
        fs::write(existing.join("notes.txt"), "keep me").expect("write");

        let err = builder.build(MarkerId(4)).unwrap_err();
        assert!(err.is_path_conflict());
        assert_eq!(err.id, MarkerId(4));

        let entries: Vec<_> = fs::read_dir(&existing)
            .expect("read_dir")
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["notes.txt"]);
        assert_eq!(
            fs::read_to_string(existing.join("notes.txt")).expect("read"),
            "keep me"
        );
    }

    #[test]
    fn test_renderer_failure_is_task_error() {
        let out = tempfile::tempdir().expect("tempdir");
        let spec = MarkerSpec::default();
        let layout = OutputLayout::new(out.path());
        let templates = TemplateBundle::embedded().expect("templates");
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &FailingRenderer, 1);

        let err = builder.build(MarkerId(9)).unwrap_err();
        assert_eq!(err.id, MarkerId(9));
        assert!(matches!(err.kind, TaskErrorKind::Renderer(_)));
    }

    #[test]
    fn test_builtin_texture_name() {
        let out = tempfile::tempdir().expect("tempdir");
        let spec = MarkerSpec::new().with_size(0.0014);
        let layout = OutputLayout::new(out.path()).with_root_dir(false);
        let templates = TemplateBundle::embedded().expect("templates");
        let factory = TextureFactory::default();
        let builder = MarkerBuilder::new(&spec, &layout, &templates, &factory, 2);

        let artifact = builder.build(MarkerId(23)).expect("build");
        assert_eq!(
            artifact.texture_file,
            out.path().join("alvar_marker_23/materials/textures/marker23.png")
        );
    }
}
