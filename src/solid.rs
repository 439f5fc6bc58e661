// Triangle soup representing a closed solid
use bevy::math::{DVec3, Vec3};
use thiserror::Error;

use crate::error::{Result, TerrainError};

/// Triangles with less area than this are considered degenerate
pub const MIN_TRIANGLE_AREA: f32 = 1e-9;

/// Cosine tolerance between a stored normal and the one implied by winding
const NORMAL_TOLERANCE: f32 = 1e-4;

/// Largest vector area of a closed surface, relative to its total area
const CLOSURE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub normal: Vec3,
    pub vertices: [Vec3; 3],
}

impl Triangle {
    /// Create a triangle with an unset normal
    pub fn new(vertices: [Vec3; 3]) -> Self {
        Self {
            normal: Vec3::ZERO,
            vertices,
        }
    }

    fn cross(&self) -> Vec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a)
    }

    /// Unit normal following the right-hand rule over the vertex order
    pub fn face_normal(&self) -> Vec3 {
        self.cross().normalize_or_zero()
    }

    pub fn area(&self) -> f32 {
        0.5 * self.cross().length()
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.area() > MIN_TRIANGLE_AREA)
    }
}

/// Problem found while validating a solid
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolidDefect {
    #[error("triangle {0} has non-finite coordinates")]
    NonFinite(usize),
    #[error("triangle {0} is degenerate")]
    Degenerate(usize),
    #[error("triangle {0} normal disagrees with its winding")]
    NormalMismatch(usize),
    /// Area-weighted normals do not cancel out: a face is flipped or missing
    #[error("faces are not consistently oriented around a closed surface")]
    InconsistentOrientation,
    #[error("solid is inside out (enclosed volume is not positive)")]
    InsideOut,
}

#[derive(Debug, Clone, Default)]
pub struct Solid {
    triangles: Vec<Triangle>,
}

impl Solid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn append_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Replace every normal with the one implied by its vertex winding
    pub fn recalculate_normals(&mut self) {
        for triangle in &mut self.triangles {
            triangle.normal = triangle.face_normal();
        }
    }

    /// List every defect: non-finite vertices, degenerate triangles, normals
    /// that disagree with the winding, then (for otherwise sound triangles)
    /// faces that do not all point outward
    pub fn defects(&self) -> Vec<SolidDefect> {
        let mut defects = Vec::new();
        for (index, triangle) in self.triangles.iter().enumerate() {
            if !triangle.vertices.iter().all(|v| v.is_finite()) {
                defects.push(SolidDefect::NonFinite(index));
            } else if triangle.is_degenerate() {
                defects.push(SolidDefect::Degenerate(index));
            } else if !triangle.normal.is_normalized()
                || triangle.normal.dot(triangle.face_normal()) < 1.0 - NORMAL_TOLERANCE
            {
                defects.push(SolidDefect::NormalMismatch(index));
            }
        }
        if !defects.is_empty() {
            return defects;
        }

        // A closed surface has zero vector area, even with T-junctions
        let (vector_area, total_area) = self.triangles.iter().fold(
            (DVec3::ZERO, 0.0f64),
            |(sum, total), t| {
                let [a, b, c] = t.vertices.map(|v| v.as_dvec3());
                let cross = (b - a).cross(c - a);
                (sum + cross * 0.5, total + cross.length() * 0.5)
            },
        );
        if vector_area.length() > CLOSURE_TOLERANCE * total_area.max(1.0) {
            defects.push(SolidDefect::InconsistentOrientation);
        }
        if !(self.signed_volume() > 0.0) {
            defects.push(SolidDefect::InsideOut);
        }
        defects
    }

    pub fn validate(&self) -> Result<()> {
        let defects = self.defects();
        match defects.first() {
            None => Ok(()),
            Some(&first) => Err(TerrainError::InvalidSolid {
                count: defects.len(),
                first,
            }),
        }
    }

    /// Axis-aligned bounds as (min, max), or `None` for an empty solid
    #[cfg(test)]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut vertices = self.triangles.iter().flat_map(|t| t.vertices);
        let first = vertices.next()?;
        Some(vertices.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }

    /// Signed enclosed volume. Positive when the triangles wind outward.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.vertices.map(|v| v.as_dvec3());
                a.dot(b.cross(c))
            })
            .sum::<f64>()
            / 6.0
    }
}
