//! Crystallographic Information Files. Each `data_` block holding atom
//! sites becomes one frame; symmetry operations are expanded into the full
//! unit cell.

use super::{Format, ParseError};
use crate::atoms::Atoms;
use nalgebra::{Matrix3, Vector3};
use std::collections::HashMap;

/// Fractional distance under which two symmetry copies are the same site.
const SITE_TOLERANCE: f64 = 1e-4;

fn err(line: usize, reason: impl Into<String>) -> ParseError {
    ParseError::new(Format::Cif, line, reason)
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    line: usize,
    /// Quoted strings and text fields are never keywords.
    quoted: bool,
}

fn tokenize(content: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lines = content.lines().enumerate().peekable();
    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        if let Some(rest) = raw.strip_prefix(';') {
            // text field up to the next line starting with ';'
            let mut text = rest.to_string();
            for (_, next) in lines.by_ref() {
                if next.starts_with(';') {
                    break;
                }
                text.push('\n');
                text.push_str(next);
            }
            tokens.push(Token {
                text: text.trim().to_string(),
                line: line_no,
                quoted: true,
            });
            continue;
        }

        let mut chars = raw.chars().peekable();
        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            let Some(&c) = chars.peek() else {
                break;
            };
            if c == '#' {
                break;
            }
            if c == '\'' || c == '"' {
                chars.next();
                let mut text = String::new();
                // a quote only closes when followed by whitespace or the end of line
                while let Some(q) = chars.next() {
                    if q == c && chars.peek().is_none_or(|n| n.is_whitespace()) {
                        break;
                    }
                    text.push(q);
                }
                tokens.push(Token {
                    text,
                    line: line_no,
                    quoted: true,
                });
            } else {
                let mut text = String::new();
                while let Some(w) = chars.next_if(|w| !w.is_whitespace()) {
                    text.push(w);
                }
                tokens.push(Token {
                    text,
                    line: line_no,
                    quoted: false,
                });
            }
        }
    }
    tokens
}

/// Items and loops of one data block, tags in lower case.
#[derive(Debug, Default)]
struct Block {
    name: String,
    line: usize,
    items: HashMap<String, (String, usize)>,
    loops: Vec<Loop>,
}

#[derive(Debug, Default)]
struct Loop {
    tags: Vec<String>,
    rows: Vec<Vec<String>>,
    line: usize,
}

impl Loop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }
}

impl Block {
    fn find_loop(&self, tag: &str) -> Option<&Loop> {
        self.loops.iter().find(|l| l.column(tag).is_some())
    }

    fn number(&self, tag: &str) -> Result<f64, ParseError> {
        let (text, line) = self
            .items
            .get(tag)
            .ok_or_else(|| err(self.line, format!("data_{} lacks {tag}", self.name)))?;
        parse_number(text).ok_or_else(|| err(*line, format!("invalid value '{text}' for {tag}")))
    }
}

fn is_keyword(tok: &Token) -> bool {
    !tok.quoted
        && (tok.text.starts_with('_')
            || tok.text.to_ascii_lowercase().starts_with("data_")
            || tok.text.eq_ignore_ascii_case("loop_"))
}

fn parse_blocks(content: &str) -> Result<Vec<Block>, ParseError> {
    let tokens = tokenize(content);
    let mut blocks: Vec<Block> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        let lower = tok.text.to_ascii_lowercase();
        if !tok.quoted && lower.starts_with("data_") {
            blocks.push(Block {
                name: tok.text[5..].to_string(),
                line: tok.line,
                ..Block::default()
            });
            i += 1;
            continue;
        }
        let Some(block) = blocks.last_mut() else {
            return Err(err(tok.line, "content before the first data_ block"));
        };
        if !tok.quoted && lower == "loop_" {
            let mut lp = Loop {
                line: tok.line,
                ..Loop::default()
            };
            i += 1;
            while i < tokens.len() && !tokens[i].quoted && tokens[i].text.starts_with('_') {
                lp.tags.push(tokens[i].text.to_ascii_lowercase());
                i += 1;
            }
            if lp.tags.is_empty() {
                return Err(err(lp.line, "loop_ without tags"));
            }
            let mut values = Vec::new();
            while i < tokens.len() && !is_keyword(&tokens[i]) {
                values.push(tokens[i].text.clone());
                i += 1;
            }
            if values.len() % lp.tags.len() != 0 {
                return Err(err(
                    lp.line,
                    format!("{} values do not fill {} loop columns", values.len(), lp.tags.len()),
                ));
            }
            lp.rows = values.chunks(lp.tags.len()).map(<[String]>::to_vec).collect();
            block.loops.push(lp);
        } else if !tok.quoted && tok.text.starts_with('_') {
            let value = tokens
                .get(i + 1)
                .filter(|v| !is_keyword(v))
                .ok_or_else(|| err(tok.line, format!("{} has no value", tok.text)))?;
            block
                .items
                .insert(lower, (value.text.clone(), value.line));
            i += 2;
        } else {
            return Err(err(tok.line, format!("unexpected token '{}'", tok.text)));
        }
    }
    Ok(blocks)
}

/// Numeric value with the standard uncertainty, e.g. `3.615(2)`, dropped.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.split('(').next()?;
    text.parse().ok()
}

/// Lattice vectors as rows from cell lengths and angles in degrees, with a
/// along x and b in the xy plane.
pub(crate) fn cellpar_to_rows(lengths: [f64; 3], angles: [f64; 3]) -> [[f64; 3]; 3] {
    let cos = |deg: f64| {
        if (deg - 90.0).abs() < 1e-10 {
            0.0
        } else {
            deg.to_radians().cos()
        }
    };
    let [a, b, c] = lengths;
    let (cos_alpha, cos_beta, cos_gamma) = (cos(angles[0]), cos(angles[1]), cos(angles[2]));
    let sin_gamma = if (angles[2] - 90.0).abs() < 1e-10 {
        1.0
    } else {
        angles[2].to_radians().sin()
    };
    let cy = (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
    let cz = (1.0 - cos_beta * cos_beta - cy * cy).max(0.0).sqrt();
    [
        [a, 0.0, 0.0],
        [b * cos_gamma, b * sin_gamma, 0.0],
        [c * cos_beta, c * cy, c * cz],
    ]
}

/// Affine map of fractional coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SymOp {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl SymOp {
    fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Parses operations written as `-x+1/2, y, z`.
    pub(crate) fn parse(text: &str) -> Option<SymOp> {
        let parts: Vec<&str> = text.split(',').collect();
        if parts.len() != 3 {
            return None;
        }
        let mut rotation = Matrix3::zeros();
        let mut translation = Vector3::zeros();
        for (row, part) in parts.iter().enumerate() {
            let (coeffs, constant) = parse_component(part)?;
            for (col, value) in coeffs.iter().enumerate() {
                rotation[(row, col)] = *value;
            }
            translation[row] = constant;
        }
        Some(SymOp {
            rotation,
            translation,
        })
    }

    fn apply(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * frac + self.translation
    }
}

fn parse_component(text: &str) -> Option<([f64; 3], f64)> {
    let text: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }
    let mut terms = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if (c == '+' || c == '-') && !current.is_empty() {
            terms.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    terms.push(current);

    let mut coeffs = [0.0; 3];
    let mut constant = 0.0;
    for term in terms {
        let (sign, body) = match term.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, term.strip_prefix('+').unwrap_or(&term)),
        };
        let axis = match body.chars().last()? {
            'x' => Some(0),
            'y' => Some(1),
            'z' => Some(2),
            _ => None,
        };
        match axis {
            Some(k) => {
                let factor = body[..body.len() - 1].trim_end_matches('*');
                let factor = if factor.is_empty() { 1.0 } else { parse_fraction(factor)? };
                coeffs[k] += sign * factor;
            }
            None => constant += sign * parse_fraction(body)?,
        }
    }
    Some((coeffs, constant))
}

fn parse_fraction(text: &str) -> Option<f64> {
    match text.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => text.parse().ok(),
    }
}

/// Chemical symbol from a type symbol or site label such as `Fe2+` or `O12`.
fn element_of(label: &str) -> String {
    let mut chars = label.chars().skip_while(|c| !c.is_ascii_alphabetic());
    let mut symbol = String::new();
    if let Some(first) = chars.next() {
        symbol.push(first.to_ascii_uppercase());
        if let Some(second) = chars.next().filter(|c| c.is_ascii_lowercase()) {
            symbol.push(second);
        }
    }
    symbol
}

const SYMOP_TAGS: [&str; 2] = [
    "_symmetry_equiv_pos_as_xyz",
    "_space_group_symop_operation_xyz",
];

fn block_to_atoms(block: &Block) -> Result<Atoms, ParseError> {
    let lengths = [
        block.number("_cell_length_a")?,
        block.number("_cell_length_b")?,
        block.number("_cell_length_c")?,
    ];
    let angles = [
        block.number("_cell_angle_alpha")?,
        block.number("_cell_angle_beta")?,
        block.number("_cell_angle_gamma")?,
    ];
    let rows = cellpar_to_rows(lengths, angles);
    let h = Matrix3::from_fn(|i, j| rows[j][i]);

    let mut ops = Vec::new();
    for tag in SYMOP_TAGS {
        if let Some(lp) = block.find_loop(tag) {
            let col = lp.column(tag).unwrap_or(0);
            for row in &lp.rows {
                let op = SymOp::parse(&row[col])
                    .ok_or_else(|| err(lp.line, format!("invalid symmetry operation '{}'", row[col])))?;
                ops.push(op);
            }
            break;
        }
    }
    if ops.is_empty() {
        ops.push(SymOp::identity());
    }

    let sites = block
        .find_loop("_atom_site_fract_x")
        .ok_or_else(|| err(block.line, format!("data_{} has no fractional atom sites", block.name)))?;
    let column = |tag: &str| {
        sites
            .column(tag)
            .ok_or_else(|| err(sites.line, format!("atom site loop lacks {tag}")))
    };
    let (cx, cy, cz) = (
        column("_atom_site_fract_x")?,
        column("_atom_site_fract_y")?,
        column("_atom_site_fract_z")?,
    );
    let species_col = sites
        .column("_atom_site_type_symbol")
        .or_else(|| sites.column("_atom_site_label"))
        .ok_or_else(|| err(sites.line, "atom site loop lacks a label or type symbol"))?;

    let mut symbols = Vec::new();
    let mut fracs: Vec<Vector3<f64>> = Vec::new();
    for row in &sites.rows {
        let coord = |c: usize| {
            parse_number(&row[c])
                .ok_or_else(|| err(sites.line, format!("invalid fractional coordinate '{}'", row[c])))
        };
        let site = Vector3::new(coord(cx)?, coord(cy)?, coord(cz)?);
        let symbol = element_of(&row[species_col]);
        for op in &ops {
            let image = op.apply(&site).map(|f| f - f.floor());
            let duplicate = fracs.iter().zip(&symbols).any(|(other, s): (&Vector3<f64>, &String)| {
                *s == symbol
                    && (image - other)
                        .map(|d| d - d.round())
                        .iter()
                        .all(|d| d.abs() < SITE_TOLERANCE)
            });
            if !duplicate {
                fracs.push(image);
                symbols.push(symbol.clone());
            }
        }
    }
    let positions = fracs.iter().map(|f| h * f).collect();
    Ok(Atoms::new(symbols, positions).with_cell(rows, [true; 3]))
}

pub(super) fn parse(content: &str) -> Result<Vec<Atoms>, ParseError> {
    parse_blocks(content)?
        .iter()
        .filter(|b| b.find_loop("_atom_site_fract_x").is_some())
        .map(block_to_atoms)
        .collect()
}
