// Closed solid generation for heightfields
use bevy::log::debug;
use bevy::math::Vec3;

use crate::error::{Result, TerrainError};
use crate::grid::SampleGrid;
use crate::solid::{Solid, Triangle};

/// Builds a closed solid from a sample grid: the heightfield on top, four skirt
/// walls dropping to the base plane and a flat base at z = 0.
pub struct SolidMeshBuilder<'a> {
    grid: &'a SampleGrid,
}

impl<'a> SolidMeshBuilder<'a> {
    pub fn new(grid: &'a SampleGrid) -> Self {
        Self { grid }
    }

    /// Number of triangles in a solid whose border never touches the base
    /// plane. Zero for grids too small to triangulate.
    pub fn expected_triangles(width: usize, height: usize) -> usize {
        if width < 2 || height < 2 {
            return 0;
        }
        let (cols, rows) = (width - 1, height - 1);
        2 * cols * rows + 4 * cols + 4 * rows + 2
    }

    /// Triangulate, recompute normals and validate
    pub fn build(&self) -> Result<Solid> {
        let (width, height) = (self.grid.width(), self.grid.height());
        if width < 2 || height < 2 {
            return Err(TerrainError::GridTooSmall { width, height });
        }

        // Samples may touch the base but not cross it
        let stats = self.grid.stats();
        if stats.min < 0.0 || !(stats.max > 0.0) {
            return Err(TerrainError::SurfaceBelowBase {
                min: stats.min,
                max: stats.max,
            });
        }

        let mut solid = Solid::with_capacity(Self::expected_triangles(width, height));
        self.append_top(&mut solid);
        self.append_skirts(&mut solid);
        self.append_base(&mut solid);

        solid.recalculate_normals();
        solid.validate()?;

        debug!(
            "Built solid with {} triangles from {}x{} grid",
            solid.len(),
            width,
            height
        );
        Ok(solid)
    }

    /// Map a raster cell to mesh (x, y).
    ///
    /// Raster rows grow downwards (north to south) while mesh y grows towards
    /// the back, so row 0 ends up at y = height - 1.
    fn mesh_xy(&self, col: usize, row: usize) -> (f32, f32) {
        (col as f32, (self.grid.height() - 1 - row) as f32)
    }

    /// Vertex on the heightfield surface
    fn surface(&self, col: usize, row: usize) -> Vec3 {
        let (x, y) = self.mesh_xy(col, row);
        Vec3::new(x, y, self.grid.get(col, row))
    }

    /// Vertex below `surface(col, row)` on the base plane
    fn base(&self, col: usize, row: usize) -> Vec3 {
        let (x, y) = self.mesh_xy(col, row);
        Vec3::new(x, y, 0.0)
    }

    fn append_top(&self, solid: &mut Solid) {
        for row in 0..self.grid.height() - 1 {
            for col in 0..self.grid.width() - 1 {
                append_quad(
                    solid,
                    self.surface(col, row),
                    self.surface(col + 1, row),
                    self.surface(col, row + 1),
                    self.surface(col + 1, row + 1),
                );
            }
        }
    }

    fn append_skirts(&self, solid: &mut Solid) {
        let last_col = self.grid.width() - 1;
        let last_row = self.grid.height() - 1;

        for col in 0..last_col {
            // Front, seen from -y
            append_wall(
                solid,
                self.surface(col, last_row),
                self.surface(col + 1, last_row),
                self.base(col, last_row),
                self.base(col + 1, last_row),
            );
            // Back, seen from +y
            append_wall(
                solid,
                self.surface(col + 1, 0),
                self.surface(col, 0),
                self.base(col + 1, 0),
                self.base(col, 0),
            );
        }

        for row in 0..last_row {
            // Left, seen from -x
            append_wall(
                solid,
                self.surface(0, row),
                self.surface(0, row + 1),
                self.base(0, row),
                self.base(0, row + 1),
            );
            // Right, seen from +x
            append_wall(
                solid,
                self.surface(last_col, row + 1),
                self.surface(last_col, row),
                self.base(last_col, row + 1),
                self.base(last_col, row),
            );
        }
    }

    fn append_base(&self, solid: &mut Solid) {
        let last_col = self.grid.width() - 1;
        let last_row = self.grid.height() - 1;

        // Seen from below, so x runs right to left
        append_quad(
            solid,
            self.base(last_col, 0),
            self.base(0, 0),
            self.base(last_col, last_row),
            self.base(0, last_row),
        );
    }
}

/// Append a quad given its corners as seen from outside the solid
fn append_quad(solid: &mut Solid, tl: Vec3, tr: Vec3, bl: Vec3, br: Vec3) {
    solid.append_triangle(Triangle::new([tl, bl, tr]));
    solid.append_triangle(Triangle::new([tr, bl, br]));
}

/// Like `append_quad`, but drops triangles that collapse where the surface
/// meets the base plane
fn append_wall(solid: &mut Solid, tl: Vec3, tr: Vec3, bl: Vec3, br: Vec3) {
    for triangle in [Triangle::new([tl, bl, tr]), Triangle::new([tr, bl, br])] {
        if !triangle.is_degenerate() {
            solid.append_triangle(triangle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bumpy_grid() -> SampleGrid {
        SampleGrid::new(
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.5, 1.2, 1.0, 1.0, 1.0, 1.0, 1.0],
            4,
            3,
        )
        .unwrap()
    }

    #[test]
    fn test_triangle_count() {
        let grid = bumpy_grid();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();
        // 12 top + 12 front/back + 8 left/right + 2 base
        assert_eq!(solid.len(), 34);
        assert_eq!(solid.len(), SolidMeshBuilder::expected_triangles(4, 3));

        let large = SampleGrid::new(vec![2.0; 7 * 5], 7, 5).unwrap();
        let solid = SolidMeshBuilder::new(&large).build().unwrap();
        assert_eq!(solid.len(), 2 * 6 * 4 + 4 * 6 + 4 * 4 + 2);
    }

    #[test]
    fn test_bounds_match_footprint() {
        let grid = bumpy_grid();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();
        let (min, max) = solid.bounds().unwrap();
        assert_eq!(min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Vec3::new(3.0, 2.0, 1.5));
    }

    #[test]
    fn test_top_surface_follows_flipped_rows() {
        let grid = bumpy_grid();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();
        let top = &solid.triangles()[..12];

        for triangle in top {
            for v in triangle.vertices {
                let col = v.x as usize;
                let row = grid.height() - 1 - v.y as usize;
                assert_eq!(v.z, grid.get(col, row));
            }
        }

        // Raster (1, 1) sits in the middle row, so it keeps y = 1
        assert!(top
            .iter()
            .flat_map(|t| t.vertices)
            .any(|v| v == Vec3::new(1.0, 1.0, 1.5)));
    }

    #[test]
    fn test_row_zero_is_back() {
        let grid = SampleGrid::new(vec![5.0, 5.0, 1.0, 1.0], 2, 2).unwrap();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();
        for v in solid.triangles()[..2].iter().flat_map(|t| t.vertices) {
            let expected = if v.y == 1.0 { 5.0 } else { 1.0 };
            assert_eq!(v.z, expected);
        }
    }

    #[test]
    fn test_base_lies_on_plane() {
        let grid = bumpy_grid();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();
        let base = &solid.triangles()[solid.len() - 2..];
        for triangle in base {
            assert!(triangle.vertices.iter().all(|v| v.z == 0.0));
            assert_eq!(triangle.normal, Vec3::NEG_Z);
        }
        let area: f32 = base.iter().map(Triangle::area).sum();
        assert_eq!(area, 6.0);
    }

    #[test]
    fn test_normals_point_outward() {
        let grid = SampleGrid::new(vec![2.0; 9], 3, 3).unwrap();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();

        // Flat top at z = 2 over a 2x2 footprint
        assert!((solid.signed_volume() - 8.0).abs() < 1e-4);
        for triangle in &solid.triangles()[..8] {
            assert_eq!(triangle.normal, Vec3::Z);
        }

        let center = Vec3::new(1.0, 1.0, 1.0);
        for triangle in solid.triangles() {
            let [a, b, c] = triangle.vertices;
            let centroid = (a + b + c) / 3.0;
            assert!(triangle.normal.dot(centroid - center) > 0.0);
        }
    }

    #[test]
    fn test_collapsed_walls_are_skipped() {
        // Border samples on the base plane leave nothing to wall off
        let grid = SampleGrid::new(vec![0.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0], 3, 3).unwrap();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();
        assert_eq!(solid.len(), 8 + 2);
        assert!(solid.validate().is_ok());
    }

    #[test]
    fn test_rejects_surface_below_base() {
        let mut grid = SampleGrid::new(vec![2.0; 9], 3, 3).unwrap();
        grid.zero(-4.0);
        assert!(matches!(
            SolidMeshBuilder::new(&grid).build(),
            Err(TerrainError::SurfaceBelowBase { min, .. }) if min == -4.0
        ));

        let flat = SampleGrid::new(vec![0.0; 4], 2, 2).unwrap();
        assert!(matches!(
            SolidMeshBuilder::new(&flat).build(),
            Err(TerrainError::SurfaceBelowBase { .. })
        ));
    }

    #[test]
    fn test_flipped_top_face_fails_validation() {
        let grid = bumpy_grid();
        let solid = SolidMeshBuilder::new(&grid).build().unwrap();

        let mut flipped = Solid::new();
        for (index, triangle) in solid.triangles().iter().enumerate() {
            let [a, b, c] = triangle.vertices;
            let vertices = if index == 0 { [a, c, b] } else { [a, b, c] };
            flipped.append_triangle(Triangle::new(vertices));
        }
        flipped.recalculate_normals();
        assert!(matches!(
            flipped.validate(),
            Err(TerrainError::InvalidSolid { .. })
        ));
    }

    #[test]
    fn test_expected_triangles_below_minimum() {
        assert_eq!(SolidMeshBuilder::expected_triangles(0, 0), 0);
        assert_eq!(SolidMeshBuilder::expected_triangles(1, 5), 0);
        assert_eq!(SolidMeshBuilder::expected_triangles(2, 2), 2 + 4 + 4 + 2);
    }

    #[test]
    fn test_rejects_too_small_grid() {
        let row = SampleGrid::new(vec![1.0, 2.0, 3.0], 3, 1).unwrap();
        assert!(matches!(
            SolidMeshBuilder::new(&row).build(),
            Err(TerrainError::GridTooSmall { width: 3, height: 1 })
        ));

        let column = SampleGrid::new(vec![1.0, 2.0], 1, 2).unwrap();
        assert!(SolidMeshBuilder::new(&column).build().is_err());
    }
}
