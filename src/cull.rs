//! Paired-invariants culling of constant, gapless columns.
//!
//! The average pairwise sequence length is used as an estimator of the
//! equilibrium length of sequences evolving under the paired-invariants
//! model of McTavish, Steel, Holder (<http://de.arxiv.org/abs/1504.07124>).
//! Given a proportion of invariant sites `p_inv`, the estimate yields an
//! expected number of invariant columns; that many constant, gapless
//! columns are removed, spread across state symbols in proportion to each
//! symbol's share of the constant columns so the state frequencies of the
//! remaining constant columns are distorted as little as possible.
//!
//! The pipeline is classify -> estimate -> allocate -> select -> project,
//! and every step is deterministic: symbols are visited in ascending byte
//! order and column indices in ascending numeric order, so two runs over
//! the same input cull the same set of columns.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use thiserror::Error;

use crate::matrix::{Cell, CharacterMatrix, ShapeMismatch};

#[cfg(test)]
use itertools::Itertools;

/// Input-validation failures of the culling pipeline.
///
/// All of these are precondition violations: they are raised at the point
/// of detection and rerunning with the same input fails identically.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CullError {
    #[error("rows of unequal length: row {row} has {found} columns, expected {expected}")]
    AlignmentShape {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("pairwise statistics need at least 2 taxa, got {0}")]
    InsufficientTaxa(usize),

    #[error("the proportion of invariant sites must lie strictly between 0 and 1, got {0}")]
    InvalidProportion(f64),

    #[error("the matrix has no constant, gapless columns to cull")]
    DegenerateInput,
}

impl From<ShapeMismatch> for CullError {
    fn from(m: ShapeMismatch) -> Self {
        CullError::AlignmentShape {
            row: m.row,
            found: m.found,
            expected: m.expected,
        }
    }
}

/// Column classification of one matrix.
///
/// `by_symbol` partitions the constant, gapless column indices by their
/// shared state symbol. Every other column contributes its both-gapped
/// row-pair count to `total_both_gapped_pairs`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPartition {
    pub by_symbol: BTreeMap<u8, BTreeSet<usize>>,
    pub total_both_gapped_pairs: u64,
    pub n_columns: usize,
}

impl ColumnPartition {
    /// Total number of constant, gapless columns across all symbols.
    pub fn n_constant_gapless(&self) -> usize {
        self.by_symbol.values().map(BTreeSet::len).sum()
    }
}

/// Per-symbol share of the cull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CullCount {
    /// Number of columns to remove for this symbol.
    pub cull: usize,
    /// Number of constant, gapless columns this symbol had on input.
    pub available: usize,
}

/// What one column looks like on its own.
enum ColumnClass {
    /// No gaps, no ambiguity, one shared symbol.
    Constant(u8),
    /// Anything else; carries the gap count for pairwise bookkeeping.
    Other { gaps: u64 },
}

fn classify_one(rows: &[Vec<Cell>], column: usize) -> ColumnClass {
    let mut gaps = 0u64;
    let mut symbol: Option<u8> = None;
    let mut constant = true;
    for row in rows {
        match row[column] {
            Cell::Gap => {
                gaps += 1;
                constant = false;
            }
            Cell::Ambiguous(_) => constant = false,
            Cell::Symbol(s) => match symbol {
                None => symbol = Some(s),
                Some(first) if first != s => constant = false,
                Some(_) => {}
            },
        }
    }
    match (constant, symbol) {
        (true, Some(s)) => ColumnClass::Constant(s),
        _ => ColumnClass::Other { gaps },
    }
}

/// Partition the columns of `matrix` into constant-gapless (tagged by their
/// symbol) and everything else, accumulating the number of row pairs that
/// are both gaps at each non-constant column.
///
/// Columns are classified independently of one another, so the scan runs in
/// parallel; the aggregate is rebuilt in index order afterwards and is
/// identical across runs.
pub fn classify_columns(matrix: &CharacterMatrix) -> Result<ColumnPartition, CullError> {
    let n_columns = matrix.validate_aligned()?;
    let rows = matrix.rows();

    let classes: Vec<ColumnClass> = (0..n_columns)
        .into_par_iter()
        .map(|column| classify_one(rows, column))
        .collect();

    let mut partition = ColumnPartition {
        n_columns,
        ..ColumnPartition::default()
    };
    for (column, class) in classes.into_iter().enumerate() {
        match class {
            ColumnClass::Constant(symbol) => {
                partition.by_symbol.entry(symbol).or_default().insert(column);
            }
            ColumnClass::Other { gaps } => {
                partition.total_both_gapped_pairs += gaps * gaps.saturating_sub(1) / 2;
            }
        }
    }
    Ok(partition)
}

/// Estimate the expected free-to-vary sequence length from pairwise
/// comparison statistics.
///
/// Each column contributes to every row pair's effective aligned length
/// except the pairs where both members are gapped at that column. Averaging
/// the per-pair lengths over all `n*(n-1)/2` pairs gives the estimate; the
/// result stays a real number and is never rounded here.
pub fn estimate_equilibrium_length(
    n_columns: usize,
    n_taxa: usize,
    total_both_gapped_pairs: u64,
) -> Result<f64, CullError> {
    if n_taxa < 2 {
        return Err(CullError::InsufficientTaxa(n_taxa));
    }
    let total_pairs = (n_taxa as u64) * (n_taxa as u64 - 1) / 2;
    let sum_pairwise_lengths = n_columns as u64 * total_pairs - total_both_gapped_pairs;
    Ok(sum_pairwise_lengths as f64 / total_pairs as f64)
}

/// Distribute `estimated_invariant_columns` removals across symbols in
/// proportion to each symbol's share of the constant, gapless columns.
///
/// Rounding can leave the per-symbol sum short of the rounded target; the
/// shortfall is handed out one unit at a time in ascending symbol order,
/// saturating each symbol at its available count.
pub fn allocate_cull_counts(
    estimated_invariant_columns: f64,
    by_symbol: &BTreeMap<u8, BTreeSet<usize>>,
) -> Result<BTreeMap<u8, CullCount>, CullError> {
    let n_constant_gapless: usize = by_symbol.values().map(BTreeSet::len).sum();
    if n_constant_gapless == 0 {
        return Err(CullError::DegenerateInput);
    }
    let invariant_fraction = estimated_invariant_columns / n_constant_gapless as f64;
    let target = estimated_invariant_columns.round() as usize;

    let mut plan: BTreeMap<u8, CullCount> = by_symbol
        .iter()
        .map(|(&symbol, indices)| {
            let available = indices.len();
            let cull = ((invariant_fraction * available as f64).round() as usize).min(available);
            (symbol, CullCount { cull, available })
        })
        .collect();

    let allocated: usize = plan.values().map(|c| c.cull).sum();
    let mut shortfall = target.saturating_sub(allocated);
    for count in plan.values_mut() {
        if shortfall == 0 {
            break;
        }
        let extra = shortfall.min(count.available - count.cull);
        count.cull += extra;
        shortfall -= extra;
    }
    Ok(plan)
}

/// Turn a cull plan into concrete column indices: for each symbol, the
/// lowest-numbered indices of its set, in ascending order.
pub fn select_columns_to_cull(
    by_symbol: &BTreeMap<u8, BTreeSet<usize>>,
    plan: &BTreeMap<u8, CullCount>,
) -> BTreeSet<usize> {
    let mut culled = BTreeSet::new();
    for (symbol, count) in plan {
        if let Some(indices) = by_symbol.get(symbol) {
            culled.extend(indices.iter().copied().take(count.cull));
        }
    }
    culled
}

/// Everything a caller might want to report about one culling run.
#[derive(Debug, Clone)]
pub struct CullDiagnostics {
    pub estimated_equilibrium_length: f64,
    pub estimated_invariant_columns: f64,
    pub plan: BTreeMap<u8, CullCount>,
    pub culled: BTreeSet<usize>,
}

/// Remove an estimated number of invariant columns from `matrix`, assuming
/// it evolved under the paired-invariants model with invariant-site
/// proportion `p_inv`.
///
/// Returns the reduced matrix (all rows kept, culled columns dropped) plus
/// the diagnostics of the run. The input matrix is never mutated.
///
/// # Errors
/// [`CullError::InvalidProportion`] unless `0 < p_inv < 1`;
/// [`CullError::AlignmentShape`] for ragged rows;
/// [`CullError::InsufficientTaxa`] for fewer than two rows;
/// [`CullError::DegenerateInput`] when no constant, gapless column exists.
pub fn cull_invariant_columns(
    matrix: &CharacterMatrix,
    p_inv: f64,
) -> Result<(CharacterMatrix, CullDiagnostics), CullError> {
    if !(p_inv > 0.0 && p_inv < 1.0) {
        return Err(CullError::InvalidProportion(p_inv));
    }
    let partition = classify_columns(matrix)?;
    let estimated_equilibrium_length = estimate_equilibrium_length(
        partition.n_columns,
        matrix.n_taxa(),
        partition.total_both_gapped_pairs,
    )?;
    let estimated_invariant_columns = p_inv * estimated_equilibrium_length;

    let plan = allocate_cull_counts(estimated_invariant_columns, &partition.by_symbol)?;
    let culled = select_columns_to_cull(&partition.by_symbol, &plan);
    let retained: BTreeSet<usize> = (0..partition.n_columns)
        .filter(|column| !culled.contains(column))
        .collect();
    let reduced = matrix.keep_columns(&retained);

    Ok((
        reduced,
        CullDiagnostics {
            estimated_equilibrium_length,
            estimated_invariant_columns,
            plan,
            culled,
        },
    ))
}
