// Heightfield to solid mesh / height image conversion
pub mod config;
pub mod error;
pub mod grid;
pub mod heightmap_image;
pub mod mesh_builder;
pub mod output;
pub mod pipeline;
pub mod raster;
pub mod solid;
pub mod stl;

pub use error::{Result, TerrainError};
pub use grid::SampleGrid;
pub use solid::Solid;
