//! Reading matrices and trees, writing matrices and trees.
//!
//! FASTA parsing is delegated to `needletail` (gzip input is handled
//! transparently); Newick parsing and serialization are delegated to
//! `phylotree`. Output paths ending in `.gz` are gzip-compressed and `-`
//! writes to stdout.

use std::fs;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use needletail::parse_fastx_file;
use phylotree::tree::{Tree, TreeError};
use thiserror::Error;

use crate::matrix::CharacterMatrix;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse sequences from {path}: {source}")]
    Fasta {
        path: PathBuf,
        #[source]
        source: needletail::errors::ParseError,
    },

    #[error("no sequences found in {path}")]
    EmptyMatrix { path: PathBuf },

    #[error("no newick string found in {path}")]
    EmptyTree { path: PathBuf },

    #[error("failed to parse newick from {path}: {message}")]
    Newick { path: PathBuf, message: String },

    #[error("failed to serialize tree: {0}")]
    Tree(#[from] TreeError),
}

/// Read an aligned FASTA file into a matrix, one row per record, labels
/// taken from the full header line.
pub fn read_fasta_matrix<P: AsRef<Path>>(path: P) -> Result<CharacterMatrix, FileError> {
    let path = path.as_ref();
    let mut reader = parse_fastx_file(path).map_err(|source| FileError::Fasta {
        path: path.to_path_buf(),
        source,
    })?;

    let mut sequences = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|source| FileError::Fasta {
            path: path.to_path_buf(),
            source,
        })?;
        let label = String::from_utf8_lossy(record.id()).into_owned();
        sequences.push((label, record.seq().into_owned()));
    }
    if sequences.is_empty() {
        return Err(FileError::EmptyMatrix {
            path: path.to_path_buf(),
        });
    }
    Ok(CharacterMatrix::from_dna_sequences(sequences))
}

/// Read the first newick string from a file.
pub fn read_newick_tree<P: AsRef<Path>>(path: P) -> Result<Tree, FileError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let newick = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| FileError::EmptyTree {
            path: path.to_path_buf(),
        })?;
    Tree::from_newick(newick).map_err(|e| FileError::Newick {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Open `path` for writing. `-` is stdout; a `.gz` suffix gzip-compresses.
fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    let is_gz = path.to_string_lossy().ends_with(".gz");
    let file = File::create(path)?;
    if is_gz {
        let enc = GzEncoder::new(file, Compression::default());
        Ok(Box::new(BufWriter::new(enc)))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Write a matrix as FASTA to a file or stdout.
pub fn write_fasta_matrix<P: AsRef<Path>>(path: P, matrix: &CharacterMatrix) -> io::Result<()> {
    let mut out = open_output(path.as_ref())?;
    for (row, label) in matrix.taxa().iter().enumerate() {
        writeln!(&mut out, ">{label}")?;
        writeln!(&mut out, "{}", matrix.sequence_string(row))?;
    }
    out.flush()
}

/// Write a tree as a single newick line to a file or stdout.
pub fn write_newick_tree<P: AsRef<Path>>(path: P, tree: &Tree) -> Result<(), FileError> {
    let newick = tree.to_newick()?;
    let path = path.as_ref();
    let mut out = open_output(path).map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    writeln!(&mut out, "{newick}").map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    out.flush().map_err(|source| FileError::Io {
        path: path.to_path_buf(),
        source,
    })
}
