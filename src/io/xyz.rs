//! Plain and extended XYZ, possibly with several frames.

use super::{Format, ParseError};
use crate::atoms::Atoms;
use nalgebra::Vector3;

fn err(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::new(Format::Xyz, line, reason)
}

pub(super) fn parse(content: &str) -> Result<Vec<Atoms>, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut frames = Vec::new();
    let mut at = 0;
    while at < lines.len() {
        if lines[at].trim().is_empty() {
            at += 1;
            continue;
        }
        let natoms: usize = lines[at]
            .trim()
            .parse()
            .map_err(|_| err(at + 1, format!("invalid number of atoms '{}'", lines[at].trim())))?;
        let comment = lines
            .get(at + 1)
            .ok_or_else(|| err(at + 2, "missing comment line"))?;
        let header = parse_comment(comment).map_err(|reason| err(at + 2, reason))?;

        let first = at + 2;
        if lines.len() < first + natoms {
            return Err(err(
                lines.len(),
                format!("expected {natoms} atoms, found {}", lines.len() - first),
            ));
        }
        let mut symbols = Vec::with_capacity(natoms);
        let mut positions = Vec::with_capacity(natoms);
        for (k, line) in lines[first..first + natoms].iter().enumerate() {
            let line_no = first + k + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let symbol = fields
                .get(header.species_col)
                .ok_or_else(|| err(line_no, "missing species"))?;
            let mut xyz = [0.0; 3];
            for (d, value) in xyz.iter_mut().enumerate() {
                let field = fields
                    .get(header.pos_col + d)
                    .ok_or_else(|| err(line_no, "missing coordinate"))?;
                *value = field
                    .parse()
                    .map_err(|_| err(line_no, format!("invalid coordinate '{field}'")))?;
            }
            symbols.push(symbol.to_string());
            positions.push(Vector3::from(xyz));
        }

        let mut atoms = Atoms::new(symbols, positions);
        if let Some(rows) = header.lattice {
            atoms = atoms.with_cell(rows, header.pbc.unwrap_or([true; 3]));
        }
        frames.push(atoms);
        at = first + natoms;
    }
    Ok(frames)
}

/// What the extended XYZ comment line tells about the frame.
#[derive(Debug, PartialEq)]
struct Header {
    lattice: Option<[[f64; 3]; 3]>,
    pbc: Option<[bool; 3]>,
    species_col: usize,
    pos_col: usize,
}

fn parse_comment(comment: &str) -> Result<Header, String> {
    let mut header = Header {
        lattice: None,
        pbc: None,
        species_col: 0,
        pos_col: 1,
    };
    for (key, value) in key_values(comment) {
        match key.to_ascii_lowercase().as_str() {
            "lattice" => {
                let v = super::floats(&value, 9)
                    .ok_or_else(|| format!("Lattice needs 9 numbers, got '{value}'"))?;
                header.lattice = Some([[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]]);
            }
            "pbc" => {
                let flags: Vec<bool> = value
                    .split_whitespace()
                    .map(parse_bool)
                    .collect::<Option<_>>()
                    .ok_or_else(|| format!("invalid pbc '{value}'"))?;
                header.pbc = match flags.as_slice() {
                    [a, b, c] => Some([*a, *b, *c]),
                    _ => return Err(format!("pbc needs 3 flags, got '{value}'")),
                };
            }
            "properties" => {
                let (species, pos) = property_columns(&value)?;
                header.species_col = species;
                header.pos_col = pos;
            }
            _ => {}
        }
    }
    Ok(header)
}

/// Splits `key=value` pairs; values may be double quoted.
fn key_values(comment: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = comment.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| !c.is_whitespace() && *c != '=') {
            key.push(c);
        }
        if key.is_empty() && chars.peek().is_none() {
            break;
        }
        if chars.next_if_eq(&'=').is_none() {
            // bare word, not a key=value pair
            continue;
        }
        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                value.push(c);
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                value.push(c);
            }
        }
        pairs.push((key, value));
    }
    pairs
}

fn parse_bool(token: &str) -> Option<bool> {
    match token {
        "T" | "t" | "True" | "true" | "1" => Some(true),
        "F" | "f" | "False" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Column of the species and first position field from a
/// `Properties=name:type:count:...` specification.
fn property_columns(props: &str) -> Result<(usize, usize), String> {
    let fields: Vec<&str> = props.split(':').collect();
    if fields.len() % 3 != 0 {
        return Err(format!("malformed Properties '{props}'"));
    }
    let mut species = None;
    let mut pos = None;
    let mut column = 0;
    for prop in fields.chunks(3) {
        let count: usize = prop[2]
            .parse()
            .map_err(|_| format!("malformed Properties '{props}'"))?;
        match prop[0].to_ascii_lowercase().as_str() {
            "species" => species = Some(column),
            "pos" => pos = Some(column),
            _ => {}
        }
        column += count;
    }
    match (species, pos) {
        (Some(s), Some(p)) => Ok((s, p)),
        _ => Err(format!("Properties '{props}' lacks species or pos")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_xyz() {
        let frames = parse("2\nwater fragment\nO 0.0 0.0 0.1\nH 0.0 0.7 -0.5\n").unwrap();
        assert_eq!(frames.len(), 1);
        let atoms = &frames[0];
        assert_eq!(atoms.symbols, vec!["O", "H"]);
        assert_eq!(atoms.positions[1], Vector3::new(0.0, 0.7, -0.5));
        assert!(atoms.cell.is_none());
        assert!(!atoms.is_periodic());
    }

    #[test]
    fn test_extended_xyz_frames() {
        let content = "\
1
Lattice=\"3.0 0.0 0.0 0.0 3.0 0.0 0.0 0.0 3.0\" Properties=species:S:1:pos:R:3:forces:R:3 pbc=\"T T F\" energy=-1.5
Ar 0.5 0.5 0.5 0.0 0.0 0.0
1
Lattice=\"4.0 0.0 0.0 0.0 4.0 0.0 0.0 0.0 4.0\" Properties=id:I:1:species:S:1:pos:R:3
7 Ar 1.0 1.0 1.0
";
        let frames = parse(content).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].pbc, [true, true, false]);
        assert_eq!(frames[0].cell.unwrap()[0], [3.0, 0.0, 0.0]);
        // pbc defaults to periodic when a lattice is given
        assert_eq!(frames[1].pbc, [true; 3]);
        assert_eq!(frames[1].symbols, vec!["Ar"]);
        assert_eq!(frames[1].positions[0], Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_key_values() {
        let pairs = key_values("a=1 flag b=\"x y\"  c=z");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x y".to_string()),
                ("c".to_string(), "z".to_string()),
            ]
        );
        assert!(key_values("   ").is_empty());
    }

    #[test]
    fn test_errors_carry_line() {
        let e = parse("3\n\nH 0 0 0\n").unwrap_err();
        assert_eq!(e.format, Format::Xyz);
        assert!(e.reason.contains("expected 3 atoms"));

        let e = parse("1\n\nH 0 zero 0\n").unwrap_err();
        assert_eq!(e.line, 3);

        let e = parse("two\n").unwrap_err();
        assert_eq!(e.line, 1);
    }

    #[test]
    fn test_properties_without_positions() {
        let err = property_columns("species:S:1:charge:R:1").unwrap_err();
        assert_eq!(err, "Properties 'species:S:1:charge:R:1' lacks species or pos");

        let e = parse("1\nProperties=species:S:1:charge:R:1\nAr 0.5\n").unwrap_err();
        assert_eq!(e.line, 2);
        assert!(e.reason.contains("lacks species or pos"));
        assert!(property_columns("species:S:x").is_err());
    }
}
