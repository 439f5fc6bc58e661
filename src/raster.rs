// Raster decoding: driver registry, windows and no-data handling
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::OnceLock;

use bevy::log::{debug, info};
use byteorder::{BigEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::{Result, TerrainError};
use crate::grid::SampleGrid;

/// GDAL stores the no-data value as an ASCII tag
const GDAL_NODATA_TAG: u16 = 42113;

/// SRTM marks voids with the most negative i16
const HGT_VOID: i16 = i16::MIN;

/// Rectangle of raster cells to read. A zero width or height extends the
/// window to the edge of the raster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// Resolve zero extents against the raster size and check the bounds
    pub fn resolve(&self, raster_width: usize, raster_height: usize) -> Result<Window> {
        let out_of_bounds = || TerrainError::WindowOutOfBounds {
            raster_width,
            raster_height,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        };

        let right = self.x.checked_add(self.width).ok_or_else(out_of_bounds)?;
        let bottom = self.y.checked_add(self.height).ok_or_else(out_of_bounds)?;
        if right > raster_width || bottom > raster_height {
            return Err(out_of_bounds());
        }

        let width = if self.width == 0 { raster_width - self.x } else { self.width };
        let height = if self.height == 0 { raster_height - self.y } else { self.height };
        if width == 0 || height == 0 {
            return Err(out_of_bounds());
        }

        Ok(Window::new(self.x, self.y, width, height))
    }
}

/// First band of a decoded raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<f32>,
    pub no_data: Option<f32>,
}

impl RasterBand {
    /// Copy a window out of the band into a sample grid
    pub fn read_window(&self, window: Window) -> Result<SampleGrid> {
        let window = window.resolve(self.width, self.height)?;

        let mut samples = Vec::with_capacity(window.width * window.height);
        for row in window.y..window.y + window.height {
            let start = row * self.width + window.x;
            samples.extend_from_slice(&self.samples[start..start + window.width]);
        }

        SampleGrid::from_raster(samples, window.width, window.height, self.no_data)
    }
}

/// Decoder for one raster file format
pub trait RasterDriver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lowercase file extensions handled by this driver
    fn extensions(&self) -> &'static [&'static str];

    fn decode(&self, path: &Path) -> Result<RasterBand>;
}

/// GeoTIFF elevation rasters. Only the first channel is read.
pub struct GeoTiffDriver;

impl RasterDriver for GeoTiffDriver {
    fn name(&self) -> &'static str {
        "GeoTIFF"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tif", "tiff"]
    }

    fn decode(&self, path: &Path) -> Result<RasterBand> {
        let unavailable = |e: tiff::TiffError| TerrainError::source_unavailable(path, e);

        let file = File::open(path).map_err(|e| TerrainError::source_unavailable(path, e))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(unavailable)?;

        let (width, height) = decoder.dimensions().map_err(unavailable)?;
        let channels = match decoder.colortype().map_err(unavailable)? {
            ColorType::GrayA(_) => 2,
            ColorType::RGB(_) => 3,
            ColorType::RGBA(_) => 4,
            _ => 1,
        };
        let no_data = decoder
            .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA_TAG))
            .ok()
            .and_then(|value| value.trim_matches(char::from(0)).trim().parse::<f32>().ok());

        let samples: Vec<f32> = match decoder.read_image().map_err(unavailable)? {
            DecodingResult::U8(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::U16(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::U32(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::U64(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::I8(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::I16(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::I32(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::I64(data) => data.iter().map(|&v| v as f32).collect(),
            DecodingResult::F32(data) => data,
            DecodingResult::F64(data) => data.iter().map(|&v| v as f32).collect(),
        };
        let samples: Vec<f32> = if channels > 1 {
            samples.into_iter().step_by(channels).collect()
        } else {
            samples
        };

        let (width, height) = (width as usize, height as usize);
        if samples.len() != width * height {
            return Err(TerrainError::source_unavailable(
                path,
                format!("decoded {} samples for {}x{} raster", samples.len(), width, height),
            ));
        }

        debug!(
            "Decoded GeoTIFF {:?}: {}x{}, {} channel(s), no-data {:?}",
            path, width, height, channels, no_data
        );
        Ok(RasterBand {
            width,
            height,
            samples,
            no_data,
        })
    }
}

/// Raw SRTM tiles: a square grid of big-endian i16 heights in meters.
///
/// Rows run north to south, columns west to east. SRTM1 tiles are 3601
/// samples wide, SRTM3 tiles 1201.
pub struct HgtDriver;

impl HgtDriver {
    fn parse(data: &[u8]) -> std::result::Result<RasterBand, String> {
        let count = data.len() / 2;
        let size = (count as f64).sqrt().round() as usize;
        if data.len() % 2 != 0 || size == 0 || size * size != count {
            return Err(format!("{} bytes is not a square grid of i16 samples", data.len()));
        }

        let mut cursor = Cursor::new(data);
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let height = cursor
                .read_i16::<BigEndian>()
                .map_err(|e| format!("failed to parse height data: {}", e))?;
            samples.push(height as f32);
        }

        Ok(RasterBand {
            width: size,
            height: size,
            samples,
            no_data: Some(HGT_VOID as f32),
        })
    }
}

impl RasterDriver for HgtDriver {
    fn name(&self) -> &'static str {
        "SRTM HGT"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["hgt"]
    }

    fn decode(&self, path: &Path) -> Result<RasterBand> {
        let data = std::fs::read(path).map_err(|e| TerrainError::source_unavailable(path, e))?;
        Self::parse(&data).map_err(|reason| TerrainError::source_unavailable(path, reason))
    }
}

/// Set of raster drivers, selected by file extension
pub struct RasterRegistry {
    drivers: Vec<Box<dyn RasterDriver>>,
}

static REGISTRY: OnceLock<RasterRegistry> = OnceLock::new();

/// Register the built-in drivers. Safe to call more than once; every call
/// returns the same registry.
pub fn initialize() -> &'static RasterRegistry {
    REGISTRY.get_or_init(|| {
        let registry = RasterRegistry::with_default_drivers();
        info!("Registered raster drivers: {}", registry.driver_names().join(", "));
        registry
    })
}

impl RasterRegistry {
    pub fn new(drivers: Vec<Box<dyn RasterDriver>>) -> Self {
        Self { drivers }
    }

    pub fn with_default_drivers() -> Self {
        Self::new(vec![Box::new(GeoTiffDriver), Box::new(HgtDriver)])
    }

    pub fn driver_names(&self) -> Vec<&'static str> {
        self.drivers.iter().map(|driver| driver.name()).collect()
    }

    /// Find the driver for a path's extension
    pub fn driver_for(&self, path: &Path) -> Result<&dyn RasterDriver> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        self.drivers
            .iter()
            .find(|driver| driver.extensions().iter().any(|ext| *ext == extension))
            .map(|driver| &**driver)
            .ok_or_else(|| TerrainError::UnsupportedRaster(path.to_path_buf()))
    }

    /// Decode `path` and read `window` of its first band
    pub fn read_window(&self, path: &Path, window: Window) -> Result<SampleGrid> {
        let driver = self.driver_for(path)?;
        let band = driver.decode(path)?;
        let grid = band.read_window(window)?;

        info!(
            "Read {} window {}x{}+{}+{} of {:?} ({} samples)",
            driver.name(),
            grid.width(),
            grid.height(),
            window.x,
            window.y,
            path,
            grid.len()
        );
        Ok(grid)
    }
}
