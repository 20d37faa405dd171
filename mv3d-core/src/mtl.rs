/// Wavefront MTL material table parser
use std::collections::HashMap;
use std::str::SplitWhitespace;

use crate::mesh::Material;

/// Parse a material library into named records.
///
/// `newmtl` opens a record with defaults; `Ka`/`Kd`/`Ks` triples, the `Ns`
/// shininess scalar, and the `d`/`Tr` opacity scalar (both spellings write
/// the same field) overwrite the open record. Malformed property lines leave
/// the field at its previous value, property lines before any `newmtl` are
/// dropped, and unknown markers are ignored. Material parsing never fails;
/// the worst outcome is an empty table and default-shaded rendering.
pub fn parse_mtl(text: &str) -> HashMap<String, Material> {
    let mut materials: HashMap<String, Material> = HashMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let Some(marker) = tokens.next() else { continue };

        if marker == "newmtl" {
            if let Some(name) = tokens.next() {
                materials.insert(name.to_string(), Material::newmtl_defaults());
                current = Some(name.to_string());
            }
            continue;
        }

        let Some(record) = current.as_ref().and_then(|name| materials.get_mut(name)) else {
            continue;
        };

        match marker {
            "Ka" => {
                if let Some(triple) = parse_triple(tokens) {
                    record.ambient = triple;
                }
            }
            "Kd" => {
                if let Some(triple) = parse_triple(tokens) {
                    record.diffuse = triple;
                }
            }
            "Ks" => {
                if let Some(triple) = parse_triple(tokens) {
                    record.specular = triple;
                }
            }
            "Ns" => {
                if let Some(value) = parse_scalar(tokens) {
                    record.shininess = value;
                }
            }
            "d" | "Tr" => {
                if let Some(value) = parse_scalar(tokens) {
                    record.opacity = value;
                }
            }
            _ => {}
        }
    }

    materials
}

fn parse_triple(mut tokens: SplitWhitespace) -> Option<[f32; 3]> {
    let r = tokens.next()?.parse().ok()?;
    let g = tokens.next()?.parse().ok()?;
    let b = tokens.next()?.parse().ok()?;
    Some([r, g, b])
}

fn parse_scalar(mut tokens: SplitWhitespace) -> Option<f32> {
    tokens.next()?.parse().ok()
}
