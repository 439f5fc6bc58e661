// Error types shared by the grid, mesh and I/O stages
use std::path::PathBuf;
use thiserror::Error;

use crate::solid::SolidDefect;

pub type Result<T> = std::result::Result<T, TerrainError>;

#[derive(Debug, Error)]
pub enum TerrainError {
    /// Sample buffer does not match the declared dimensions
    #[error("invalid grid: {len} samples for {width}x{height}")]
    InvalidGrid {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error(
        "selected window goes outside raster bounds (raster {raster_width}x{raster_height}, \
         window {x},{y} {width}x{height})"
    )]
    WindowOutOfBounds {
        raster_width: usize,
        raster_height: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("grid dimensions differ: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A solid needs at least one top quad
    #[error("grid of {width}x{height} is too small to triangulate (need at least 2x2)")]
    GridTooSmall { width: usize, height: usize },

    /// The heightfield must stay above the z = 0 base for the solid to close outward
    #[error("surface reaches below the base plane (min {min}, max {max}); raise --zero above 0")]
    SurfaceBelowBase { min: f32, max: f32 },

    #[error("unsupported output format: {0:?} (expected .stl or .png)")]
    UnsupportedOutput(PathBuf),

    #[error("no raster driver for {0:?}")]
    UnsupportedRaster(PathBuf),

    #[error("cannot read raster {path:?}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("solid failed validation with {count} defect(s), first: {first}")]
    InvalidSolid { count: usize, first: SolidDefect },

    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path:?}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("viewer {program:?} failed: {reason}")]
    Viewer { program: String, reason: String },
}

impl TerrainError {
    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}
