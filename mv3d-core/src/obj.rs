/// Wavefront OBJ parser: indexed face lists, Newell face normals, and
/// material-group batching
use std::collections::HashMap;

use log::warn;
use nom::{
    bytes::complete::take_while,
    character::complete::{digit1, multispace0, multispace1},
    combinator::map_res,
    multi::many1,
    number::complete::float,
    IResult,
};
use thiserror::Error;

use crate::mesh::MaterialGroup;

/// Group name for triangles emitted before any `usemtl` line
pub const DEFAULT_GROUP: &str = "default";

/// How the parser reacts to malformed lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Abort on the first malformed line
    Strict,
    /// Log a warning and skip the line
    Lenient,
}

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("malformed line {line}: {text:?}")]
    Malformed { line: usize, text: String },
    #[error("line {line}: vertex index {index} out of range (mesh has {count} positions)")]
    IndexOutOfRange {
        line: usize,
        index: u32,
        count: usize,
    },
    #[error("line {line}: vertex index {index} does not fit 16-bit index storage")]
    IndexOverflow { line: usize, index: u32 },
}

/// Raw parser output, prior to normal synthesis and normalization
#[derive(Debug, Default)]
pub struct ObjData {
    /// Flat 3xN positions in declaration order
    pub positions: Vec<f32>,
    /// Fan-triangulated corner indices, grouped by material
    pub indices: Vec<u16>,
    /// Material groups in first-seen order, each a contiguous index range
    pub material_groups: Vec<(String, MaterialGroup)>,
    /// Summed face normals per referenced vertex; vertices no face touches
    /// are absent
    pub normal_accumulators: HashMap<usize, [f32; 3]>,
}

pub fn parse_obj(text: &str, policy: ParsePolicy) -> Result<ObjData, ObjError> {
    let mut positions: Vec<f32> = Vec::new();
    let mut accumulators: HashMap<usize, [f32; 3]> = HashMap::new();
    // Index runs per material, in first-seen order. Runs are concatenated
    // after the last line so each recorded group range stays contiguous even
    // when a material is re-selected after unrelated faces.
    let mut runs: Vec<(String, Vec<u16>)> = Vec::new();
    let mut current_material = DEFAULT_GROUP.to_string();

    for (number, raw) in text.lines().enumerate() {
        let line = number + 1;
        let mut tokens = raw.split_whitespace();
        let Some(marker) = tokens.next() else { continue };
        let rest = raw.trim_start().strip_prefix(marker).unwrap_or("");

        match marker {
            "v" => match parse_vector3(rest) {
                Ok((remainder, (x, y, z))) if remainder.trim().is_empty() => {
                    positions.extend_from_slice(&[x, y, z])
                }
                _ => recover(policy, malformed(line, raw))?,
            },
            "usemtl" => match tokens.next() {
                Some(name) => {
                    current_material = name.to_string();
                    // Open the group now so a trailing usemtl still records
                    // a zero-count entry
                    run_for(&mut runs, name);
                }
                None => recover(policy, malformed(line, raw))?,
            },
            "f" => match parse_face(rest, positions.len() / 3, line, raw) {
                Ok(face) => emit_face(
                    &face,
                    &positions,
                    &mut accumulators,
                    run_for(&mut runs, &current_material),
                ),
                Err(err) => recover(policy, err)?,
            },
            // Unrecognized markers (vt, vn, o, g, s, comments...) are skipped
            _ => {}
        }
    }

    let mut indices = Vec::new();
    let mut material_groups = Vec::with_capacity(runs.len());
    for (name, run) in runs {
        let group = MaterialGroup {
            start_index: indices.len() as u32,
            index_count: run.len() as u32,
        };
        material_groups.push((name, group));
        indices.extend(run);
    }

    Ok(ObjData {
        positions,
        indices,
        material_groups,
        normal_accumulators: accumulators,
    })
}

fn malformed(line: usize, raw: &str) -> ObjError {
    ObjError::Malformed {
        line,
        text: raw.trim().to_string(),
    }
}

fn recover(policy: ParsePolicy, err: ObjError) -> Result<(), ObjError> {
    match policy {
        ParsePolicy::Strict => Err(err),
        ParsePolicy::Lenient => {
            warn!("{err}, skipping");
            Ok(())
        }
    }
}

fn run_for<'a>(runs: &'a mut Vec<(String, Vec<u16>)>, name: &str) -> &'a mut Vec<u16> {
    let position = match runs.iter().position(|(n, _)| n == name) {
        Some(position) => position,
        None => {
            runs.push((name.to_string(), Vec::new()));
            runs.len() - 1
        }
    };
    &mut runs[position].1
}

/// Validate and convert the 1-based indices of one face line.
fn parse_face(
    rest: &str,
    position_count: usize,
    line: usize,
    raw: &str,
) -> Result<Vec<usize>, ObjError> {
    // The whole line must tokenize; leftover junk would silently drop what
    // the source declares as further face vertices
    let indices = match parse_face_indices(rest) {
        Ok((remainder, indices)) if remainder.trim().is_empty() && indices.len() >= 3 => indices,
        _ => return Err(malformed(line, raw)),
    };

    let mut face = Vec::with_capacity(indices.len());
    for index in indices {
        if index == 0 || index as usize > position_count {
            return Err(ObjError::IndexOutOfRange {
                line,
                index,
                count: position_count,
            });
        }
        let zero_based = index as usize - 1;
        if zero_based > u16::MAX as usize {
            return Err(ObjError::IndexOverflow { line, index });
        }
        face.push(zero_based);
    }
    Ok(face)
}

/// Accumulate the face normal into every referenced vertex and emit the
/// fan triangulation into the active material run.
fn emit_face(
    face: &[usize],
    positions: &[f32],
    accumulators: &mut HashMap<usize, [f32; 3]>,
    run: &mut Vec<u16>,
) {
    let normal = newell_normal(face, positions);

    // Every face vertex receives the contribution, not just the corners of
    // the emitted triangles; this is what averages normals across all
    // adjacent faces.
    for &vertex in face {
        let entry = accumulators.entry(vertex).or_insert([0.0; 3]);
        entry[0] += normal[0];
        entry[1] += normal[1];
        entry[2] += normal[2];
    }

    // Fan triangulation from the first face vertex: k-2 triangles
    for i in 1..face.len() - 1 {
        run.push(face[0] as u16);
        run.push(face[i] as u16);
        run.push(face[i + 1] as u16);
    }
}

/// Newell-method polygon normal, robust for concave and non-planar faces.
/// Degenerate faces yield the zero vector, which the synthesizer leaves
/// untouched.
fn newell_normal(face: &[usize], positions: &[f32]) -> [f32; 3] {
    let mut normal = [0.0f32; 3];
    for i in 0..face.len() {
        let a = face[i] * 3;
        let b = face[(i + 1) % face.len()] * 3;
        let (x1, y1, z1) = (positions[a], positions[a + 1], positions[a + 2]);
        let (x2, y2, z2) = (positions[b], positions[b + 1], positions[b + 2]);
        normal[0] += (y1 - y2) * (z1 + z2);
        normal[1] += (z1 - z2) * (x1 + x2);
        normal[2] += (x1 - x2) * (y1 + y2);
    }

    let length =
        (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
    if length > 0.0 {
        normal = [
            normal[0] / length,
            normal[1] / length,
            normal[2] / length,
        ];
    }
    normal
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

fn parse_face_indices(input: &str) -> IResult<&str, Vec<u32>> {
    many1(parse_index_group)(input)
}

/// One `v`, `v/vt`, `v//vn`, or `v/vt/vn` group; only the position index is
/// consumed.
fn parse_index_group(input: &str) -> IResult<&str, u32> {
    let (input, _) = multispace0(input)?;
    let (input, index) = map_res(digit1, str::parse::<u32>)(input)?;
    let (input, _) = take_while(|c: char| c == '/' || c.is_ascii_digit())(input)?;
    Ok((input, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

    #[test]
    fn test_square_positions_and_triangles() {
        let obj = parse_obj(SQUARE, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.positions.len(), 12);
        assert_eq!(obj.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_square_newell_normal_points_along_positive_z() {
        let obj = parse_obj(SQUARE, ParsePolicy::Strict).unwrap();
        for vertex in 0..4 {
            let accumulated = obj.normal_accumulators[&vertex];
            assert!((accumulated[0]).abs() < 1e-6);
            assert!((accumulated[1]).abs() < 1e-6);
            assert!((accumulated[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fan_triangulation_emits_k_minus_2_triangles() {
        let text = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 2 0\nv -1 1 0\nf 1 2 3 4 5 6\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.indices.len() / 3, 4);
        // Every emitted triangle shares the face's first vertex
        for triangle in obj.indices.chunks_exact(3) {
            assert_eq!(triangle[0], 0);
        }
    }

    #[test]
    fn test_slash_delimited_groups_use_position_index_only() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1/7/9 2//4 3/5\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_material_groups_open_and_count() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\nf 1 3 2\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.material_groups.len(), 1);
        let (name, group) = &obj.material_groups[0];
        assert_eq!(name, "red");
        assert_eq!(group.start_index, 0);
        assert_eq!(group.index_count, 6);
    }

    #[test]
    fn test_reentered_material_group_stays_contiguous() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
                    usemtl red\nf 1 2 3\n\
                    usemtl blue\nf 1 3 2\n\
                    usemtl red\nf 2 1 3\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.material_groups.len(), 2);

        let (_, red) = &obj.material_groups[0];
        let (_, blue) = &obj.material_groups[1];
        assert_eq!(red.index_count, 6);
        assert_eq!(blue.index_count, 3);
        // Red's range covers both of its faces despite blue in between
        assert_eq!(red.start_index, 0);
        assert_eq!(blue.start_index, 6);
        assert_eq!(obj.indices[..6], [0, 1, 2, 1, 0, 2]);
        assert_eq!(obj.indices[6..], [0, 2, 1]);
    }

    #[test]
    fn test_faces_before_usemtl_fall_into_default_group() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.material_groups.len(), 1);
        assert_eq!(obj.material_groups[0].0, DEFAULT_GROUP);
        assert_eq!(obj.material_groups[0].1.index_count, 3);
    }

    #[test]
    fn test_trailing_usemtl_records_empty_group() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\nusemtl unused\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.material_groups.len(), 2);
        assert_eq!(obj.material_groups[1].1.index_count, 0);
        assert_eq!(obj.material_groups[1].1.start_index, 3);
    }

    #[test]
    fn test_unrecognized_markers_skipped() {
        let text = "# comment\no square\nvn 0 0 1\nvt 0 0\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.positions.len(), 9);
        assert_eq!(obj.indices.len(), 3);
    }

    #[test]
    fn test_strict_reports_line_number_and_text() {
        let text = "v 0 0 0\nv 1 0 oops\n";
        let err = parse_obj(text, ParsePolicy::Strict).unwrap_err();
        match err {
            ObjError::Malformed { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "v 1 0 oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lenient_skips_malformed_lines() {
        let text = "v 0 0 0\nv 1 0 oops\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let obj = parse_obj(text, ParsePolicy::Lenient).unwrap();
        assert_eq!(obj.positions.len(), 9);
        assert_eq!(obj.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_strict_rejects_trailing_junk_on_face_line() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3 x\n";
        let err = parse_obj(text, ParsePolicy::Strict).unwrap_err();
        match err {
            ObjError::Malformed { line, text } => {
                assert_eq!(line, 4);
                assert_eq!(text, "f 1 2 3 x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_strict_rejects_trailing_junk_on_position_line() {
        let text = "v 1 2 3 junk\n";
        assert!(matches!(
            parse_obj(text, ParsePolicy::Strict),
            Err(ObjError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_lenient_skips_lines_with_trailing_junk() {
        let text = "v 1 2 3 junk\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3 x\nf 1 2 3\n";
        let obj = parse_obj(text, ParsePolicy::Lenient).unwrap();
        assert_eq!(obj.positions.len(), 9);
        assert_eq!(obj.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_face_index_out_of_range() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2 5\n";
        let err = parse_obj(text, ParsePolicy::Strict).unwrap_err();
        match err {
            ObjError::IndexOutOfRange { line, index, count } => {
                assert_eq!(line, 3);
                assert_eq!(index, 5);
                assert_eq!(count, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_face_with_fewer_than_three_indices_is_malformed() {
        let text = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        assert!(matches!(
            parse_obj(text, ParsePolicy::Strict),
            Err(ObjError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn test_degenerate_face_accumulates_zero_vector() {
        // All three corners identical: the Newell sum has zero magnitude
        let text = "v 1 1 1\nf 1 1 1\n";
        let obj = parse_obj(text, ParsePolicy::Strict).unwrap();
        assert_eq!(obj.normal_accumulators[&0], [0.0, 0.0, 0.0]);
    }
}
