// Grayscale height image rendering
use std::path::Path;

use bevy::log::debug;
use image::{ImageBuffer, ImageFormat, Luma};

use crate::error::{Result, TerrainError};
use crate::grid::SampleGrid;
use crate::output::write_atomically;

/// 16-bit single channel height image
pub type HeightImage = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Level used for every pixel of a flat grid, where min == max
pub const FLAT_LEVEL: u16 = 32768;

/// Rescale the grid linearly into the full 16-bit range. Pixel (x, y) is
/// sample (x, y); rows are not flipped.
pub fn render(grid: &SampleGrid) -> HeightImage {
    let stats = grid.stats();
    // f64 keeps the range finite for extreme f32 samples
    let (min, range) = (stats.min as f64, stats.max as f64 - stats.min as f64);
    debug!(
        "Rescaling image with height min {} and max {}",
        stats.min, stats.max
    );

    ImageBuffer::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        let sample = grid.get(x as usize, y as usize);
        let level = if range > 0.0 {
            ((sample as f64 - min) / range * 65535.0) as u16
        } else {
            FLAT_LEVEL
        };
        Luma([level])
    })
}

/// Write the image as 16-bit grayscale PNG
pub fn save_png(image: &HeightImage, path: &Path) -> Result<()> {
    write_atomically(path, |writer| {
        image
            .write_to(writer, ImageFormat::Png)
            .map_err(|source| TerrainError::Encode {
                path: path.to_path_buf(),
                source,
            })
    })
}
