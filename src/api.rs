//! Python binding layer for the data-preparation utilities.
//!
//! Provides Python functions mirroring the command-line operations,
//! working from file paths so scripts can call straight into the crate.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::cull::cull_invariant_columns;
use crate::io::{read_fasta_matrix, read_newick_tree};
use crate::synapo::find_potential_synapo_columns;
use crate::tipcheck::compare_tip_labels;

fn value_error<E: std::fmt::Display>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Cull constant, gapless columns under the paired-invariants model.
///
/// Args:
///     char_mat_path: Path to an aligned FASTA file
///     p_inv: Proportion of invariant sites, strictly between 0 and 1
///
/// Returns:
///     A tuple of (taxa, sequences, estimated_equilibrium_length,
///     estimated_invariant_columns, plan) where plan is a list of
///     (state_symbol, culled, available) triples.
///
/// Raises:
///     ValueError: If the file cannot be read or any culling
///     precondition is violated.
#[pyfunction]
#[pyo3(signature = (char_mat_path, p_inv))]
fn cull_paired_invariants(
    char_mat_path: String,
    p_inv: f64,
) -> PyResult<(Vec<String>, Vec<String>, f64, f64, Vec<(String, usize, usize)>)> {
    let matrix = read_fasta_matrix(&char_mat_path).map_err(value_error)?;
    let (reduced, diagnostics) = cull_invariant_columns(&matrix, p_inv).map_err(value_error)?;

    let taxa = reduced.taxa().to_vec();
    let sequences = (0..reduced.n_taxa())
        .map(|row| reduced.sequence_string(row))
        .collect();
    let plan = diagnostics
        .plan
        .iter()
        .map(|(&symbol, count)| ((symbol as char).to_string(), count.cull, count.available))
        .collect();

    Ok((
        taxa,
        sequences,
        diagnostics.estimated_equilibrium_length,
        diagnostics.estimated_invariant_columns,
        plan,
    ))
}

/// Find columns that are candidate synapomorphies for an ingroup.
///
/// Args:
///     char_mat_path: Path to an aligned FASTA file
///     taxa: Taxon labels forming the ingroup
///
/// Returns:
///     A list of (column_index, ingroup_states, outgroup_states) triples.
///
/// Raises:
///     ValueError: On unreadable input or invalid ingroup labels.
#[pyfunction]
#[pyo3(signature = (char_mat_path, taxa))]
fn find_synapomorphies(
    char_mat_path: String,
    taxa: Vec<String>,
) -> PyResult<Vec<(usize, Vec<String>, Vec<String>)>> {
    let matrix = read_fasta_matrix(&char_mat_path).map_err(value_error)?;
    let columns = find_potential_synapo_columns(&matrix, &taxa).map_err(value_error)?;
    Ok(columns
        .into_iter()
        .map(|c| {
            let render = |states: &std::collections::BTreeSet<u8>| {
                states.iter().map(|&s| (s as char).to_string()).collect()
            };
            (
                c.column,
                render(&c.ingroup_states),
                render(&c.outgroup_states),
            )
        })
        .collect())
}

/// Check that tip labels in a tree and a matrix agree.
///
/// Args:
///     char_mat_path: Path to an aligned FASTA file
///     tree_path: Path to a newick tree file
///
/// Returns:
///     A tuple of (is_match, missing_from_tree, missing_from_matrix).
///
/// Raises:
///     ValueError: If either file cannot be read or parsed.
#[pyfunction]
#[pyo3(signature = (char_mat_path, tree_path))]
fn tip_label_match(
    char_mat_path: String,
    tree_path: String,
) -> PyResult<(bool, Vec<String>, Vec<String>)> {
    let matrix = read_fasta_matrix(&char_mat_path).map_err(value_error)?;
    let tree = read_newick_tree(&tree_path).map_err(value_error)?;
    let report = compare_tip_labels(&matrix, &tree);
    Ok((
        report.is_match(),
        report.missing_from_tree,
        report.missing_from_matrix,
    ))
}

/// Python module definition
#[pymodule]
fn phyloprep(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(cull_paired_invariants, m)?)?;
    m.add_function(wrap_pyfunction!(find_synapomorphies, m)?)?;
    m.add_function(wrap_pyfunction!(tip_label_match, m)?)?;
    Ok(())
}
