//! Aligned character-matrix model.
//!
//! A [`CharacterMatrix`] is an ordered set of taxa, each with one row of
//! [`Cell`]s. Columns are implied by position; all analysis code that walks
//! columns first confirms the rows agree in length via
//! [`CharacterMatrix::validate_aligned`].
//!
//! The matrix is read-only to the analysis modules: reductions such as
//! [`CharacterMatrix::keep_columns`] and [`CharacterMatrix::retain_taxa`]
//! produce new matrices and leave the source untouched.

use std::collections::BTreeSet;

/// One position in one sequence.
///
/// A cell is either a gap, a single definite state symbol, or an
/// ambiguity/polymorphism code (`N`, `R`, `?`, ...). Only `Symbol` cells
/// expose a symbol; ambiguous cells are skipped by column classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Gap,
    Symbol(u8),
    Ambiguous(u8),
}

impl Cell {
    /// Interpret a residue byte under DNA semantics, folding case.
    ///
    /// `-` is a gap; `A C G T U` are single states; everything else
    /// (IUPAC ambiguity codes, `?` missing data, stray bytes) is ambiguous.
    pub fn from_dna(byte: u8) -> Self {
        match byte.to_ascii_uppercase() {
            b'-' => Cell::Gap,
            b @ (b'A' | b'C' | b'G' | b'T' | b'U') => Cell::Symbol(b),
            b => Cell::Ambiguous(b),
        }
    }

    pub fn is_gap(self) -> bool {
        matches!(self, Cell::Gap)
    }

    /// The single state symbol, or `None` for gaps and ambiguous cells.
    pub fn symbol(self) -> Option<u8> {
        match self {
            Cell::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// The byte this cell is written back out as.
    pub fn to_byte(self) -> u8 {
        match self {
            Cell::Gap => b'-',
            Cell::Symbol(s) | Cell::Ambiguous(s) => s,
        }
    }
}

/// A row-length disagreement found while checking the matrix shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub row: usize,
    pub found: usize,
    pub expected: usize,
}

/// An ordered collection of equal-length character sequences, one per taxon.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterMatrix {
    taxa: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl CharacterMatrix {
    /// Build a matrix from pre-parsed rows. Rows are kept as given; shape is
    /// checked by the callers that require alignment, not here.
    pub fn new(taxa: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        assert_eq!(taxa.len(), rows.len(), "one label per row");
        CharacterMatrix { taxa, rows }
    }

    /// Build a matrix from labelled raw sequences under DNA semantics.
    pub fn from_dna_sequences<I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let (taxa, rows): (Vec<String>, Vec<Vec<Cell>>) = sequences
            .into_iter()
            .map(|(label, seq)| {
                let cells = seq.iter().map(|&b| Cell::from_dna(b)).collect::<Vec<_>>();
                (label, cells)
            })
            .unzip();
        CharacterMatrix { taxa, rows }
    }

    pub fn n_taxa(&self) -> usize {
        self.rows.len()
    }

    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.rows[row][column]
    }

    /// Number of columns, confirming that every row agrees on it.
    pub fn validate_aligned(&self) -> Result<usize, ShapeMismatch> {
        let expected = self.rows.first().map_or(0, Vec::len);
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(ShapeMismatch {
                    row,
                    found: cells.len(),
                    expected,
                });
            }
        }
        Ok(expected)
    }

    /// Project the matrix onto `retained` columns, in ascending index order.
    /// Taxa and row order are unchanged.
    pub fn keep_columns(&self, retained: &BTreeSet<usize>) -> CharacterMatrix {
        let rows = self
            .rows
            .iter()
            .map(|row| retained.iter().map(|&c| row[c]).collect())
            .collect();
        CharacterMatrix {
            taxa: self.taxa.clone(),
            rows,
        }
    }

    /// Keep only the rows whose taxon label is in `keep`, preserving row order.
    pub fn retain_taxa(&self, keep: &BTreeSet<String>) -> CharacterMatrix {
        let (taxa, rows): (Vec<String>, Vec<Vec<Cell>>) = self
            .taxa
            .iter()
            .zip(&self.rows)
            .filter(|(label, _)| keep.contains(*label))
            .map(|(label, row)| (label.clone(), row.clone()))
            .unzip();
        CharacterMatrix { taxa, rows }
    }

    /// Render one row back to its residue string.
    pub fn sequence_string(&self, row: usize) -> String {
        let bytes: Vec<u8> = self.rows[row].iter().map(|c| c.to_byte()).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[(&str, &str)]) -> CharacterMatrix {
        CharacterMatrix::from_dna_sequences(
            rows.iter()
                .map(|&(label, seq)| (label.to_string(), seq.as_bytes().to_vec())),
        )
    }

    #[test]
    fn dna_cell_semantics() {
        assert_eq!(Cell::from_dna(b'-'), Cell::Gap);
        assert_eq!(Cell::from_dna(b'a'), Cell::Symbol(b'A'));
        assert_eq!(Cell::from_dna(b'T'), Cell::Symbol(b'T'));
        assert_eq!(Cell::from_dna(b'n'), Cell::Ambiguous(b'N'));
        assert_eq!(Cell::from_dna(b'?'), Cell::Ambiguous(b'?'));

        assert!(Cell::Gap.is_gap());
        assert_eq!(Cell::Gap.symbol(), None);
        assert_eq!(Cell::Ambiguous(b'R').symbol(), None);
        assert_eq!(Cell::Symbol(b'G').symbol(), Some(b'G'));
    }

    #[test]
    fn validate_aligned_reports_offending_row() {
        let m = matrix(&[("t1", "ACGT"), ("t2", "ACG"), ("t3", "ACGT")]);
        assert_eq!(
            m.validate_aligned(),
            Err(ShapeMismatch {
                row: 1,
                found: 3,
                expected: 4
            })
        );

        let aligned = matrix(&[("t1", "ACGT"), ("t2", "AC-T")]);
        assert_eq!(aligned.validate_aligned(), Ok(4));
    }

    #[test]
    fn keep_columns_projects_in_ascending_order() {
        let m = matrix(&[("t1", "ACGT"), ("t2", "TGCA")]);
        let retained: BTreeSet<usize> = [3, 0].into_iter().collect();
        let reduced = m.keep_columns(&retained);

        assert_eq!(reduced.taxa(), m.taxa());
        assert_eq!(reduced.sequence_string(0), "AT");
        assert_eq!(reduced.sequence_string(1), "TA");
        // source untouched
        assert_eq!(m.sequence_string(0), "ACGT");
    }

    #[test]
    fn retain_taxa_preserves_row_order() {
        let m = matrix(&[("b", "AC"), ("a", "GT"), ("c", "-N")]);
        let keep: BTreeSet<String> = ["c".to_string(), "b".to_string()].into_iter().collect();
        let pruned = m.retain_taxa(&keep);

        assert_eq!(pruned.taxa(), &["b".to_string(), "c".to_string()]);
        assert_eq!(pruned.sequence_string(0), "AC");
        assert_eq!(pruned.sequence_string(1), "-N");
    }
}
