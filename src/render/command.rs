//! External marker generator commands
//!
//! Arguments may contain placeholders that are filled in per request:
//! `{id}`, `{pixels}`, `{size_cm}` and `{dictionary}`. Without an explicit
//! dictionary, `{dictionary}` becomes [`DEFAULT_COMMAND_DICTIONARY`]. The command runs in
//! the marker's texture directory; the first PNG it leaves there (by file
//! name) becomes the texture.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{RenderRequest, RenderedMarker, RendererError};
use crate::config::format_float;

/// Dictionary passed to commands when none was asked for (OpenCV `DICT_5X5_1000`)
pub const DEFAULT_COMMAND_DICTIONARY: u32 = 7;

/// A program and its argument template
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split `["program", "arg", ...]`; `None` when the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// `rosrun ar_track_alvar createMarker -ucm -s {size_cm} {id}`
    pub fn alvar_create_marker() -> Self {
        Self::new(
            "rosrun",
            ["ar_track_alvar", "createMarker", "-ucm", "-s", "{size_cm}", "{id}"],
        )
    }

    /// Arguments with placeholders substituted for one request
    pub fn expand_args(&self, request: &RenderRequest<'_>) -> Vec<String> {
        let id = request.id.to_string();
        let pixels = request.pixel_size.to_string();
        let size_cm = format_float(request.size * 100.0);
        let dictionary = request
            .dictionary
            .unwrap_or(DEFAULT_COMMAND_DICTIONARY)
            .to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{id}", &id)
                    .replace("{pixels}", &pixels)
                    .replace("{size_cm}", &size_cm)
                    .replace("{dictionary}", &dictionary)
            })
            .collect()
    }

    pub(crate) fn run(&self, request: &RenderRequest<'_>) -> Result<RenderedMarker, RendererError> {
        let args = self.expand_args(request);
        log::debug!(
            "marker {}: running {} {}",
            request.id,
            self.program,
            args.join(" ")
        );

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(request.work_dir)
            .output()
            .map_err(|source| RendererError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RendererError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let path = first_png(request.work_dir)?.ok_or_else(|| RendererError::NoOutput {
            dir: request.work_dir.to_path_buf(),
        })?;
        let image = image::open(&path)
            .map_err(|source| RendererError::Image {
                path: path.clone(),
                source,
            })?
            .to_rgb8();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(RenderedMarker { image, file_name })
    }
}

/// First `*.png` in a directory by file name
fn first_png(dir: &Path) -> Result<Option<PathBuf>, RendererError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RendererError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut pngs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    pngs.sort();

    Ok(pngs.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MarkerId;
    use crate::render::MarkerType;

    fn request(dir: &Path) -> RenderRequest<'_> {
        RenderRequest {
            marker_type: MarkerType::Alvar,
            id: MarkerId(12),
            pixel_size: 1285,
            size: 0.09,
            dictionary: None,
            work_dir: dir,
        }
    }

    #[test]
    fn test_expand_placeholders() {
        let dir = std::env::temp_dir();
        let spec = CommandSpec::new(
            "gen",
            ["--id={id}", "{pixels}", "{size_cm}", "-d", "{dictionary}"],
        );
        assert_eq!(
            spec.expand_args(&request(&dir)),
            vec!["--id=12", "1285", "9.0", "-d", "7"]
        );
    }

    #[test]
    fn test_explicit_dictionary_expands() {
        let dir = std::env::temp_dir();
        let spec = CommandSpec::new("gen", ["{dictionary}"]);
        let request = RenderRequest {
            dictionary: Some(0),
            ..request(&dir)
        };
        assert_eq!(spec.expand_args(&request), vec!["0"]);
    }

    /// A 20x20 PNG outside the work directory for commands to copy
    #[cfg(unix)]
    fn seed_png(dir: &Path) -> PathBuf {
        let path = dir.join("seed.png");
        image::RgbImage::from_pixel(20, 20, image::Rgb([0, 0, 0]))
            .save(&path)
            .expect("save seed");
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_command_output_becomes_texture() {
        let seed_dir = tempfile::tempdir().expect("tempdir");
        let work = tempfile::tempdir().expect("tempdir");
        let seed = seed_png(seed_dir.path());
        let spec = CommandSpec::new(
            "cp",
            [seed.to_string_lossy().into_owned(), "MarkerData_{id}.png".to_string()],
        );

        let rendered = spec.run(&request(work.path())).expect("Should render");
        assert_eq!(rendered.file_name, "MarkerData_12.png");
        assert_eq!(rendered.image.dimensions(), (20, 20));
        assert!(work.path().join("MarkerData_12.png").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_is_reported() {
        let work = tempfile::tempdir().expect("tempdir");
        let spec = CommandSpec::new("false", Vec::<String>::new());
        let err = spec.run(&request(work.path())).unwrap_err();
        assert!(matches!(err, RendererError::CommandFailed { ref program, .. } if program == "false"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_without_png_is_no_output() {
        let work = tempfile::tempdir().expect("tempdir");
        let spec = CommandSpec::new("true", Vec::<String>::new());
        let err = spec.run(&request(work.path())).unwrap_err();
        assert!(matches!(err, RendererError::NoOutput { ref dir } if dir == work.path()));
    }

    #[test]
    fn test_alvar_default() {
        let dir = std::env::temp_dir();
        let spec = CommandSpec::alvar_create_marker();
        assert_eq!(spec.program, "rosrun");
        assert_eq!(
            spec.expand_args(&request(&dir)),
            vec!["ar_track_alvar", "createMarker", "-ucm", "-s", "9.0", "12"]
        );
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["python3".to_string(), "make.py".to_string(), "{id}".to_string()];
        let spec = CommandSpec::from_argv(&argv).expect("non-empty");
        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args, vec!["make.py", "{id}"]);
        assert_eq!(CommandSpec::from_argv(&[]), None);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let spec = CommandSpec::new("definitely-not-a-marker-generator", Vec::<String>::new());
        let err = spec.run(&request(dir.path())).unwrap_err();
        assert!(matches!(err, RendererError::Spawn { .. }));
    }

    #[test]
    fn test_first_png_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.png"), b"").expect("write");
        std::fs::write(dir.path().join("a.PNG"), b"").expect("write");
        std::fs::write(dir.path().join("0.txt"), b"").expect("write");

        let found = first_png(dir.path()).expect("scan").expect("a png");
        assert_eq!(found.file_name().and_then(|n| n.to_str()), Some("a.PNG"));
    }

    #[test]
    fn test_no_png_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(first_png(dir.path()).expect("scan"), None);
    }
}
