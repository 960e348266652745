//! STL decoding (binary and ASCII).

use crate::scene::Geometry;
use glam::Vec3;
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::float,
    sequence::{preceded, tuple},
    IResult,
};

const HEADER_LEN: usize = 80;
const TRIANGLE_RECORD_LEN: u64 = 50;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StlError {
    #[error("file too small for a binary STL header ({len} bytes)")]
    TooShort { len: usize },
    #[error("binary STL truncated: {count} triangles need {expected} bytes, got {actual}")]
    Truncated {
        count: u32,
        expected: u64,
        actual: usize,
    },
    #[error("malformed ASCII STL near {context:?}")]
    Ascii { context: String },
    #[error("STL contains no triangles")]
    EmptyMesh,
    #[error("triangle {index} has a non-finite coordinate")]
    NonFiniteVertex { index: usize },
}

/// Decoded triangle soup, one stored normal per face.
#[derive(Debug, Clone, PartialEq)]
pub struct StlMesh {
    pub name: Option<String>,
    pub triangles: Vec<[Vec3; 3]>,
    pub normals: Vec<Vec3>,
}

impl StlMesh {
    pub fn into_geometry(self) -> Geometry {
        Geometry::new(self.triangles, self.normals)
    }
}

/// Detects the flavour and decodes. Data starting with `solid` is tried as
/// ASCII first; binary files are allowed to start with `solid` too.
pub fn decode(data: &[u8]) -> Result<StlMesh, StlError> {
    let mesh = match ascii_text(data) {
        Some(text) => match parse_ascii(text) {
            Ok(mesh) => mesh,
            Err(ascii_err) => parse_binary(data).map_err(|_| ascii_err)?,
        },
        None => parse_binary(data)?,
    };
    validate(mesh)
}

fn ascii_text(data: &[u8]) -> Option<&str> {
    let trimmed = data.trim_ascii_start();
    if !trimmed.starts_with(b"solid") {
        return None;
    }
    std::str::from_utf8(data).ok()
}

fn validate(mesh: StlMesh) -> Result<StlMesh, StlError> {
    if mesh.triangles.is_empty() {
        return Err(StlError::EmptyMesh);
    }
    if let Some(index) = mesh
        .triangles
        .iter()
        .position(|tri| tri.iter().any(|v| !v.is_finite()))
    {
        return Err(StlError::NonFiniteVertex { index });
    }
    Ok(mesh)
}

pub fn parse_binary(data: &[u8]) -> Result<StlMesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooShort { len: data.len() });
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]);
    let expected = (HEADER_LEN as u64 + 4) + count as u64 * TRIANGLE_RECORD_LEN;
    if (data.len() as u64) < expected {
        return Err(StlError::Truncated {
            count,
            expected,
            actual: data.len(),
        });
    }

    let header = String::from_utf8_lossy(&data[..HEADER_LEN])
        .trim_end_matches('\0')
        .trim()
        .to_string();

    let mut triangles = Vec::with_capacity(count as usize);
    let mut normals = Vec::with_capacity(count as usize);
    for record in data[HEADER_LEN + 4..]
        .chunks_exact(TRIANGLE_RECORD_LEN as usize)
        .take(count as usize)
    {
        normals.push(read_vec3(&record[0..12]));
        triangles.push([
            read_vec3(&record[12..24]),
            read_vec3(&record[24..36]),
            read_vec3(&record[36..48]),
        ]);
    }

    Ok(StlMesh {
        name: (!header.is_empty()).then_some(header),
        triangles,
        normals,
    })
}

fn read_vec3(bytes: &[u8]) -> Vec3 {
    let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    Vec3::new(f(0), f(4), f(8))
}

pub fn parse_ascii(text: &str) -> Result<StlMesh, StlError> {
    match solid(text) {
        Ok((_, (name, facets))) => {
            let (triangles, normals): (Vec<[Vec3; 3]>, Vec<Vec3>) = facets.into_iter().unzip();
            Ok(StlMesh {
                name,
                triangles,
                normals,
            })
        }
        Err(err) => {
            let context = match &err {
                nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
                nom::Err::Incomplete(_) => "",
            };
            Err(StlError::Ascii {
                context: context.chars().take(40).collect(),
            })
        }
    }
}

type Facet = ([Vec3; 3], Vec3);

fn solid(input: &str) -> IResult<&str, (Option<String>, Vec<Facet>)> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, name) = not_line_ending(input)?;
    let (input, facets) = many0(facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let name = name.trim();
    Ok((input, ((!name.is_empty()).then(|| name.to_string()), facets)))
}

fn facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, a) = vertex(input)?;
    let (input, b) = vertex(input)?;
    let (input, c) = vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((input, ([a, b, c], normal)))
}

fn vertex(input: &str) -> IResult<&str, Vec3> {
    preceded(preceded(multispace0, tag("vertex")), vector3)(input)
}

fn vector3(input: &str) -> IResult<&str, Vec3> {
    let (input, (_, x, _, y, _, z)) =
        tuple((multispace1, float, multispace1, float, multispace1, float))(input)?;
    Ok((input, Vec3::new(x, y, z)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::scene::{face_normal, Geometry};
    use glam::Vec3;

    /// Binary STL of an axis-aligned cube, 12 triangles.
    pub fn cube_binary(size: f32) -> Vec<u8> {
        let cube = Geometry::cuboid(Vec3::splat(size));
        let mut out = Vec::with_capacity(84 + cube.triangle_count() * 50);
        let mut header = [0u8; 80];
        header[..4].copy_from_slice(b"cube");
        out.extend_from_slice(&header);
        out.extend_from_slice(&(cube.triangle_count() as u32).to_le_bytes());
        for tri in cube.triangles() {
            for v in std::iter::once(face_normal(tri)).chain(tri.iter().copied()) {
                out.extend_from_slice(&v.x.to_le_bytes());
                out.extend_from_slice(&v.y.to_le_bytes());
                out.extend_from_slice(&v.z.to_le_bytes());
            }
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        out
    }

    pub const ASCII_TRIANGLE: &str = "solid tri\n\
        facet normal 0 0 1\n\
          outer loop\n\
            vertex 0 0 0\n\
            vertex 1 0 0\n\
            vertex 0 1.5e0 0\n\
          endloop\n\
        endfacet\n\
        endsolid tri\n";
}

#[cfg(test)]
mod tests {
    use super::fixtures::{cube_binary, ASCII_TRIANGLE};
    use super::*;

    #[test]
    fn decodes_binary_cube() {
        let mesh = decode(&cube_binary(2.0)).unwrap();
        assert_eq!(mesh.triangles.len(), 12);
        assert_eq!(mesh.name.as_deref(), Some("cube"));
        let geometry = mesh.into_geometry();
        assert_eq!(geometry.bounds().max, Vec3::splat(1.0));
    }

    #[test]
    fn decodes_ascii_facets() {
        let mesh = decode(ASCII_TRIANGLE.as_bytes()).unwrap();
        assert_eq!(mesh.name.as_deref(), Some("tri"));
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0][2], Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(mesh.normals[0], Vec3::Z);
    }

    #[test]
    fn binary_with_solid_header_falls_back_to_binary() {
        let mut data = cube_binary(1.0);
        data[..6].copy_from_slice(b"solid ");
        let mesh = decode(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 12);
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let data = cube_binary(1.0);
        let err = decode(&data[..data.len() - 10]).unwrap_err();
        assert!(matches!(err, StlError::Truncated { count: 12, .. }));
    }

    #[test]
    fn tiny_input_is_too_short() {
        assert_eq!(decode(b"abc").unwrap_err(), StlError::TooShort { len: 3 });
    }

    #[test]
    fn malformed_ascii_reports_ascii_error() {
        let broken = ASCII_TRIANGLE.replace("endloop", "endlop");
        let err = decode(broken.as_bytes()).unwrap_err();
        assert!(matches!(err, StlError::Ascii { .. }), "got {err:?}");
    }

    #[test]
    fn zero_triangles_is_empty_mesh() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(decode(&data).unwrap_err(), StlError::EmptyMesh);
        assert_eq!(
            decode(b"solid empty\nendsolid empty\n").unwrap_err(),
            StlError::EmptyMesh
        );
    }

    #[test]
    fn non_finite_vertex_is_rejected() {
        let mut data = cube_binary(1.0);
        // First vertex x of the second triangle.
        let offset = 84 + 50 + 12;
        data[offset..offset + 4].copy_from_slice(&f32::NAN.to_le_bytes());
        assert_eq!(
            decode(&data).unwrap_err(),
            StlError::NonFiniteVertex { index: 1 }
        );
    }
}
