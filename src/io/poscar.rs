//! VASP POSCAR / CONTCAR, VASP 4 and 5 layouts.

use super::{Format, ParseError, floats};
use crate::atoms::Atoms;
use nalgebra::{Matrix3, Vector3};

fn err(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::new(Format::Poscar, line, reason)
}

pub(super) fn parse(content: &str) -> Result<Atoms, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let line = |k: usize| nth_line(&lines, k);

    let comment = line(0)?;
    let scale_field = line(1)?
        .split_whitespace()
        .next()
        .ok_or_else(|| err(2, "missing scale factor"))?;
    let scale: f64 = scale_field
        .parse()
        .map_err(|_| err(2, format!("invalid scale factor '{scale_field}'")))?;

    let mut rows = [[0.0; 3]; 3];
    for (k, row) in rows.iter_mut().enumerate() {
        let v = floats(line(2 + k)?, 3).ok_or_else(|| err(3 + k, "lattice vector needs 3 numbers"))?;
        row.copy_from_slice(&v);
    }
    // a negative scale factor is the target cell volume
    let factor = if scale < 0.0 {
        let volume = Matrix3::from_fn(|i, j| rows[i][j]).determinant().abs();
        if volume == 0.0 {
            return Err(err(3, "lattice vectors are degenerate"));
        }
        (-scale / volume).cbrt()
    } else {
        scale
    };
    for row in rows.iter_mut() {
        for x in row.iter_mut() {
            *x *= factor;
        }
    }

    // VASP 5 puts species names above the counts
    let mut at = 5;
    let first_tokens: Vec<&str> = line(at)?.split_whitespace().collect();
    let names: Vec<String> = if first_tokens.iter().all(|t| t.parse::<usize>().is_err()) {
        at += 1;
        first_tokens.iter().map(|t| clean_species(t)).collect()
    } else {
        comment.split_whitespace().map(clean_species).collect()
    };
    let counts: Vec<usize> = line(at)?
        .split_whitespace()
        .map(|t| t.parse().map_err(|_| err(at + 1, format!("invalid atom count '{t}'"))))
        .collect::<Result<_, _>>()?;
    if counts.is_empty() {
        return Err(err(at + 1, "missing atom counts"));
    }
    if names.len() < counts.len() {
        return Err(err(at + 1, "species names are missing for some counts"));
    }
    at += 1;

    if line(at)?.starts_with(['s', 'S']) {
        at += 1;
    }
    let cartesian = line(at)?.starts_with(['c', 'C', 'k', 'K']);
    at += 1;

    let h = Matrix3::from_fn(|i, j| rows[j][i]);
    let mut symbols = Vec::new();
    let mut positions = Vec::new();
    for (name, &count) in names.iter().zip(&counts) {
        for _ in 0..count {
            let v = floats(line(at)?, 3).ok_or_else(|| err(at + 1, "coordinate needs 3 numbers"))?;
            let p = Vector3::new(v[0], v[1], v[2]);
            positions.push(if cartesian { p * factor } else { h * p });
            symbols.push(name.clone());
            at += 1;
        }
    }
    Ok(Atoms::new(symbols, positions).with_cell(rows, [true; 3]))
}

fn nth_line<'a>(lines: &[&'a str], k: usize) -> Result<&'a str, ParseError> {
    lines
        .get(k)
        .map(|l| l.trim())
        .ok_or_else(|| err(k + 1, "unexpected end of file"))
}

/// Drops POTCAR suffixes such as `Fe_pv` or `O/`.
fn clean_species(token: &str) -> String {
    token
        .split(['_', '/'])
        .next()
        .unwrap_or(token)
        .to_string()
}
