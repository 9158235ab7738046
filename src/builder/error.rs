//! Per-marker task errors

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::MarkerId;
use crate::render::RendererError;
use crate::template::DocumentError;

/// Why building one marker failed
#[derive(Debug, Error)]
pub enum TaskErrorKind {
    /// Target directory already exists; nothing was written into it
    #[error("output directory {} already exists", path.display())]
    PathConflict { path: PathBuf },

    /// Filesystem operation failed
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    /// Template copy could not be edited or written
    #[error("{0}")]
    Document(#[from] DocumentError),

    /// Marker image could not be produced
    #[error("{0}")]
    Renderer(#[from] RendererError),

    /// Texture could not be encoded
    #[error("failed to write texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// A failed marker task, tagged with the marker it was building
#[derive(Debug, Error)]
#[error("marker {id}: {kind}")]
pub struct TaskError {
    pub id: MarkerId,
    pub kind: TaskErrorKind,
}

impl TaskError {
    pub fn new(id: MarkerId, kind: impl Into<TaskErrorKind>) -> Self {
        Self {
            id,
            kind: kind.into(),
        }
    }

    /// Create a path conflict error
    pub fn path_conflict(id: MarkerId, path: impl Into<PathBuf>) -> Self {
        Self::new(id, TaskErrorKind::PathConflict { path: path.into() })
    }

    /// Create an I/O error with the action and path that failed
    pub fn io(id: MarkerId, action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::new(
            id,
            TaskErrorKind::Io {
                action,
                path: path.into(),
                source,
            },
        )
    }

    pub fn is_path_conflict(&self) -> bool {
        matches!(self.kind, TaskErrorKind::PathConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_conflict_display() {
        let err = TaskError::path_conflict(MarkerId(7), "/out/alvar_marker_7");
        assert_eq!(
            err.to_string(),
            "marker 7: output directory /out/alvar_marker_7 already exists"
        );
        assert!(err.is_path_conflict());
    }

    #[test]
    fn test_renderer_error_converts() {
        let err = TaskError::new(MarkerId(3), RendererError::TooSmall { pixels: 2 });
        assert!(err.to_string().contains("marker 3"));
        assert!(err.to_string().contains("too small"));
        assert!(!err.is_path_conflict());
    }
}
