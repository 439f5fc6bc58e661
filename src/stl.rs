// Binary STL output
use std::io::Write;
use std::path::Path;

use bevy::math::Vec3;
use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Result, TerrainError};
use crate::output::write_atomically;
use crate::solid::Solid;

const HEADER_LEN: usize = 80;

/// Must not start with "solid", which readers take for ASCII STL
const HEADER: &[u8] = b"binary STL generated by terrain_solid";

/// Size in bytes of a binary STL holding `triangles` facets
#[cfg(test)]
pub fn encoded_len(triangles: usize) -> usize {
    HEADER_LEN + 4 + triangles * 50
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> std::io::Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)
}

/// Encode a solid as binary STL: 80-byte header, little-endian facet count,
/// then normal, three vertices and a zero attribute word per facet
pub fn write_binary<W: Write>(solid: &Solid, writer: &mut W) -> std::io::Result<()> {
    let mut header = [0u8; HEADER_LEN];
    header[..HEADER.len()].copy_from_slice(HEADER);
    writer.write_all(&header)?;

    let count = u32::try_from(solid.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "too many triangles for binary STL",
        )
    })?;
    writer.write_u32::<LittleEndian>(count)?;

    for triangle in solid.triangles() {
        write_vec3(writer, triangle.normal)?;
        for &vertex in &triangle.vertices {
            write_vec3(writer, vertex)?;
        }
        writer.write_u16::<LittleEndian>(0)?;
    }
    Ok(())
}

/// Write a validated solid to `path`
pub fn save(solid: &Solid, path: &Path) -> Result<()> {
    write_atomically(path, |writer| {
        write_binary(solid, writer).map_err(|e| TerrainError::write(path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solid::Triangle;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    fn single_facet() -> Solid {
        let mut solid = Solid::new();
        solid.append_triangle(Triangle::new([Vec3::ZERO, Vec3::X, Vec3::Y]));
        solid.recalculate_normals();
        solid
    }

    #[test]
    fn test_binary_layout() {
        let mut bytes = Vec::new();
        write_binary(&single_facet(), &mut bytes).unwrap();
        assert_eq!(bytes.len(), encoded_len(1));
        assert!(!bytes.starts_with(b"solid"));

        let mut cursor = Cursor::new(&bytes[HEADER_LEN..]);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 1);

        let mut floats = [0f32; 12];
        for value in &mut floats {
            *value = cursor.read_f32::<LittleEndian>().unwrap();
        }
        // normal, then (0,0,0) (1,0,0) (0,1,0)
        assert_eq!(
            floats,
            [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
        assert_eq!(cursor.read_u16::<LittleEndian>().unwrap(), 0);
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.stl");
        save(&single_facet(), &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, encoded_len(1));
    }
}
