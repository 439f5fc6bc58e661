// Command-line configuration
use std::path::PathBuf;

use bevy::prelude::Resource;
use clap::{ArgAction, Parser};

use crate::pipeline::PipelineOptions;
use crate::raster::Window;

/// Convert an elevation raster (GeoTIFF or SRTM .hgt) into a printable STL
/// solid or a 16-bit grayscale PNG
#[derive(Parser, Debug, Clone, Resource)]
#[command(name = "terrain_solid", version, disable_help_flag = true)]
pub struct Args {
    /// Input raster file
    pub input: PathBuf,

    /// Window x coordinate
    #[arg(short = 'x', default_value_t = 0)]
    pub x: usize,

    /// Window y coordinate
    #[arg(short = 'y', default_value_t = 0)]
    pub y: usize,

    /// Window width (0 = to the edge)
    #[arg(short = 'w', long = "width", default_value_t = 0)]
    pub width: usize,

    /// Window height (0 = to the edge)
    #[arg(short = 'h', long = "height", default_value_t = 0)]
    pub height: usize,

    /// Scale vertically
    #[arg(short = 's', long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub scale: f32,

    /// Translate the model so that this is the lowest height
    #[arg(short = 'z', long, default_value_t = 10.0, allow_negative_numbers = true)]
    pub zero: f32,

    /// A second raster to subtract from the input
    #[arg(short = 'd', long)]
    pub diff: Option<PathBuf>,

    /// Open the STL in the viewer once written
    #[arg(short = 'v', long)]
    pub visualize: bool,

    /// Output file, .stl or .png
    #[arg(short = 'o', long, default_value = "out.stl")]
    pub output: PathBuf,

    /// Viewer program used with --visualize
    #[arg(long, default_value = "f3d")]
    pub viewer: String,

    /// Log debug output
    #[arg(long)]
    pub verbose: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Args {
    pub fn window(&self) -> Window {
        Window::new(self.x, self.y, self.width, self.height)
    }

    pub fn to_options(&self) -> PipelineOptions {
        PipelineOptions {
            input: self.input.clone(),
            diff_against: self.diff.clone(),
            window: self.window(),
            zero: self.zero,
            scale: self.scale,
            output: self.output.clone(),
            visualize: self.visualize,
            viewer: self.viewer.clone(),
        }
    }
}
