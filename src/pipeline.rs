// Raster to STL/PNG conversion pipeline
use std::path::{Path, PathBuf};
use std::process::Command;

use bevy::log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::grid::SampleGrid;
use crate::heightmap_image;
use crate::mesh_builder::SolidMeshBuilder;
use crate::raster::{RasterRegistry, Window};
use crate::stl;

/// Output kind, chosen by the output file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Stl,
    Png,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("stl") => Ok(Self::Stl),
            Some("png") => Ok(Self::Png),
            _ => Err(TerrainError::UnsupportedOutput(path.to_path_buf())),
        }
    }
}

/// Everything one conversion run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub input: PathBuf,
    /// Second raster subtracted from the input before any other transform
    pub diff_against: Option<PathBuf>,
    pub window: Window,
    /// Lowest height after zeroing
    pub zero: f32,
    /// Vertical scale, applied after zeroing
    pub scale: f32,
    pub output: PathBuf,
    /// Open the written STL in `viewer`
    pub visualize: bool,
    pub viewer: String,
}

/// Apply the grid transforms in pipeline order: diff, zero, then scale
pub fn transform(
    grid: &mut SampleGrid,
    diff_against: Option<&SampleGrid>,
    zero: f32,
    scale: f32,
) -> Result<()> {
    if let Some(other) = diff_against {
        info!("Subtracting second grid");
        grid.diff(other)?;
    }

    info!("Setting minimum height value to {}", zero);
    grid.zero(zero);

    if scale != 1.0 {
        info!("Adjusting vertical scale by factor of {}", scale);
        grid.scale(scale);
    }
    Ok(())
}

/// Load the input (and the diff raster, if any) and apply the transforms
pub fn prepare_grid(registry: &RasterRegistry, options: &PipelineOptions) -> Result<SampleGrid> {
    let mut grid = registry.read_window(&options.input, options.window)?;
    let other = options
        .diff_against
        .as_deref()
        .map(|path| registry.read_window(path, options.window))
        .transpose()?;

    transform(&mut grid, other.as_ref(), options.zero, options.scale)?;
    Ok(grid)
}

/// Run one conversion and return the format that was written
pub fn run(registry: &RasterRegistry, options: &PipelineOptions) -> Result<OutputFormat> {
    let format = OutputFormat::from_path(&options.output)?;
    let grid = prepare_grid(registry, options)?;
    write_output(&grid, format, &options.output)?;

    if format == OutputFormat::Stl && options.visualize {
        launch_viewer(&options.viewer, &options.output)?;
    }
    Ok(format)
}

/// Convert the grid and write it to `path`
pub fn write_output(grid: &SampleGrid, format: OutputFormat, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Stl => {
            info!("Converting to STL file {:?}", path);
            let solid = SolidMeshBuilder::new(grid).build()?;
            stl::save(&solid, path)?;
            info!("Wrote {} triangles", solid.len());
        }
        OutputFormat::Png => {
            info!("Converting to PNG file {:?}", path);
            let image = heightmap_image::render(grid);
            heightmap_image::save_png(&image, path)?;
        }
    }
    Ok(())
}

/// Open `path` in an external viewer and wait for it to exit
pub fn launch_viewer(program: &str, path: &Path) -> Result<()> {
    info!("Launching visualisation with {}", program);
    let status = Command::new(program)
        .arg(path)
        .status()
        .map_err(|e| TerrainError::Viewer {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(TerrainError::Viewer {
            program: program.to_string(),
            reason: format!("exited with {}", status),
        })
    }
}
