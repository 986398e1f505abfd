//! Scan for columns that could be clean synapomorphies of an ingroup.
//!
//! A column is a candidate when the single-state symbols shown by the
//! ingroup taxa and by the remaining taxa are both non-empty and do not
//! overlap. Gaps and ambiguous cells carry no signal and are ignored.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::matrix::{CharacterMatrix, ShapeMismatch};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynapoError {
    #[error("taxon label \"{0}\" was given more than once")]
    DuplicateLabel(String),

    #[error("could not find taxon label \"{0}\" in the matrix")]
    UnknownLabel(String),

    #[error("an ingroup holding every taxon leaves no outgroup to compare against")]
    IngroupIsEverything,

    #[error("rows of unequal length: row {row} has {found} columns, expected {expected}")]
    AlignmentShape {
        row: usize,
        found: usize,
        expected: usize,
    },
}

impl From<ShapeMismatch> for SynapoError {
    fn from(m: ShapeMismatch) -> Self {
        SynapoError::AlignmentShape {
            row: m.row,
            found: m.found,
            expected: m.expected,
        }
    }
}

/// One candidate column and the states seen on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynapoColumn {
    pub column: usize,
    pub ingroup_states: BTreeSet<u8>,
    pub outgroup_states: BTreeSet<u8>,
}

/// Resolve ingroup labels to a per-row membership mask. Labels must be
/// unique, each must match a matrix taxon (first match wins for duplicate
/// taxon labels), and at least one taxon must be left in the outgroup.
fn ingroup_mask(matrix: &CharacterMatrix, labels: &[String]) -> Result<Vec<bool>, SynapoError> {
    let mut requested = BTreeSet::new();
    for label in labels {
        if !requested.insert(label.as_str()) {
            return Err(SynapoError::DuplicateLabel(label.clone()));
        }
    }
    let mut mask = vec![false; matrix.n_taxa()];
    for (row, taxon) in matrix.taxa().iter().enumerate() {
        if requested.remove(taxon.as_str()) {
            mask[row] = true;
        }
    }
    if let Some(missing) = requested.into_iter().next() {
        return Err(SynapoError::UnknownLabel(missing.to_string()));
    }
    if mask.iter().all(|&in_group| in_group) {
        return Err(SynapoError::IngroupIsEverything);
    }
    Ok(mask)
}

/// Report every column whose ingroup and outgroup single-state symbols are
/// disjoint, with both sides non-empty.
pub fn find_potential_synapo_columns(
    matrix: &CharacterMatrix,
    ingroup_labels: &[String],
) -> Result<Vec<SynapoColumn>, SynapoError> {
    let mask = ingroup_mask(matrix, ingroup_labels)?;
    let n_columns = matrix.validate_aligned()?;

    let mut candidates = Vec::new();
    'columns: for column in 0..n_columns {
        let mut ingroup_states = BTreeSet::new();
        let mut outgroup_states = BTreeSet::new();
        for (row, &in_group) in mask.iter().enumerate() {
            let Some(symbol) = matrix.cell(row, column).symbol() else {
                continue;
            };
            if in_group {
                if outgroup_states.contains(&symbol) {
                    continue 'columns;
                }
                ingroup_states.insert(symbol);
            } else {
                if ingroup_states.contains(&symbol) {
                    continue 'columns;
                }
                outgroup_states.insert(symbol);
            }
        }
        if !ingroup_states.is_empty() && !outgroup_states.is_empty() {
            candidates.push(SynapoColumn {
                column,
                ingroup_states,
                outgroup_states,
            });
        }
    }
    Ok(candidates)
}
