//! Structure file readers. The format is chosen from the file name and,
//! failing that, from the content.

mod cif;
mod poscar;
mod xyz;

use crate::atoms::Atoms;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Plain or extended XYZ.
    Xyz,
    /// VASP POSCAR / CONTCAR.
    Poscar,
    Cif,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Xyz => write!(f, "XYZ"),
            Format::Poscar => write!(f, "POSCAR"),
            Format::Cif => write!(f, "CIF"),
        }
    }
}

impl Format {
    /// Format implied by the file name, if any.
    pub fn from_path(path: &Path) -> Option<Format> {
        let name = path.file_name()?.to_str()?;
        let upper = name.to_ascii_uppercase();
        if upper.starts_with("POSCAR") || upper.starts_with("CONTCAR") {
            return Some(Format::Poscar);
        }
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xyz" | "extxyz" => Some(Format::Xyz),
            "vasp" | "poscar" => Some(Format::Poscar),
            "cif" => Some(Format::Cif),
            _ => None,
        }
    }

    /// Guesses the format from the file content.
    pub fn sniff(content: &str) -> Option<Format> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        let first = lines.next()?;
        if content
            .lines()
            .any(|l| l.trim_start().starts_with("data_") || l.trim_start().starts_with("_cell_length_a"))
        {
            return Some(Format::Cif);
        }
        if first.parse::<usize>().is_ok() {
            return Some(Format::Xyz);
        }
        let scale = lines.next()?;
        let is_scale = scale
            .split_whitespace()
            .next()
            .is_some_and(|t| t.parse::<f64>().is_ok());
        let lattice_ok = lines.take(3).filter(|l| floats(l, 3).is_some()).count() == 3;
        (is_scale && lattice_ok).then_some(Format::Poscar)
    }
}

/// Error of a parser, located by line.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{format} line {line}: {reason}")]
pub struct ParseError {
    pub format: Format,
    /// 1-based, 0 when the error is not tied to a line.
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(format: Format, line: usize, reason: impl Into<String>) -> Self {
        Self {
            format,
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot infer the structure format of {}", path.display())]
    UnknownFormat { path: PathBuf },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Reads every frame of a structure file.
pub fn read_frames(path: impl AsRef<Path>) -> Result<Vec<Atoms>, ReadError> {
    read_with_format(path.as_ref()).map(|(_, frames)| frames)
}

/// Reads the last frame of a structure file.
pub fn read(path: impl AsRef<Path>) -> Result<Atoms, ReadError> {
    let path = path.as_ref();
    let (format, mut frames) = read_with_format(path)?;
    frames.pop().ok_or_else(|| ReadError::Parse {
        path: path.to_path_buf(),
        source: ParseError::new(format, 0, "no structure found"),
    })
}

fn read_with_format(path: &Path) -> Result<(Format, Vec<Atoms>), ReadError> {
    let content = fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = Format::from_path(path)
        .or_else(|| Format::sniff(&content))
        .ok_or_else(|| ReadError::UnknownFormat {
            path: path.to_path_buf(),
        })?;
    debug!(path = %path.display(), %format, "reading structure");
    let frames = read_str(&content, format).map_err(|source| ReadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((format, frames))
}

/// Parses every frame in `content`.
pub fn read_str(content: &str, format: Format) -> Result<Vec<Atoms>, ParseError> {
    let frames = match format {
        Format::Xyz => xyz::parse(content)?,
        Format::Poscar => vec![poscar::parse(content)?],
        Format::Cif => cif::parse(content)?,
    };
    if frames.is_empty() {
        return Err(ParseError::new(format, 0, "no structure found"));
    }
    Ok(frames)
}

/// Parses exactly `n` floats from the first `n` fields of `line`.
pub(crate) fn floats(line: &str, n: usize) -> Option<Vec<f64>> {
    let values: Vec<f64> = line
        .split_whitespace()
        .take(n)
        .map(|t| t.parse().ok())
        .collect::<Option<_>>()?;
    (values.len() == n).then_some(values)
}
