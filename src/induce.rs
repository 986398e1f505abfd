//! Prune a tree and a character matrix down to a shared taxon set.
//!
//! Topology editing is delegated to `phylotree`: requested leaves are kept,
//! every other leaf is pruned, internal nodes left childless are dropped and
//! unary nodes are compressed away. The matrix loses the rows of the pruned
//! taxa and nothing else.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use phylotree::tree::{NodeId, Tree, TreeError};
use thiserror::Error;

use crate::matrix::CharacterMatrix;

#[derive(Debug, Error)]
pub enum InduceError {
    #[error("taxon \"{0}\" not found among the tree tips")]
    UnknownTaxon(String),

    #[error("some matrix taxa are not in the tree, missing \"{0}\"")]
    MissingFromTree(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

fn named_leaves(tree: &Tree) -> Vec<(NodeId, String)> {
    tree.get_leaves()
        .into_iter()
        .filter_map(|id| {
            let name = tree.get(&id).ok()?.name.clone()?;
            Some((id, name))
        })
        .collect()
}

/// Confirm that every matrix taxon appears as a tree tip.
pub fn check_matrix_covered(matrix: &CharacterMatrix, tree: &Tree) -> Result<(), InduceError> {
    let tip_names: BTreeSet<String> = named_leaves(tree).into_iter().map(|(_, n)| n).collect();
    let missing: Vec<&str> = matrix
        .taxa()
        .iter()
        .filter(|label| !tip_names.contains(*label))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(InduceError::MissingFromTree(missing.join("\", \"")))
    }
}

/// Prune `tree` (and the rows of `matrix`, when one is given) down to
/// exactly the taxa in `keep`.
///
/// Every requested label must already be a tip of the tree; the first label
/// that is not produces [`InduceError::UnknownTaxon`].
pub fn induce_matrix_and_tree(
    matrix: Option<CharacterMatrix>,
    mut tree: Tree,
    keep: &BTreeSet<String>,
) -> Result<(Option<CharacterMatrix>, Tree), InduceError> {
    let leaves = named_leaves(&tree);
    let tip_names: BTreeSet<&str> = leaves.iter().map(|(_, n)| n.as_str()).collect();
    for label in keep {
        if !tip_names.contains(label.as_str()) {
            return Err(InduceError::UnknownTaxon(label.clone()));
        }
    }

    for (id, name) in &leaves {
        if !keep.contains(name) {
            tree.prune(id)?;
        }
    }
    // pruning tips can strand unnamed internal nodes with no children left
    loop {
        let stranded: Vec<NodeId> = tree
            .get_leaves()
            .into_iter()
            .filter(|id| {
                tree.get(id)
                    .map(|n| n.name.is_none() && n.parent.is_some())
                    .unwrap_or(false)
            })
            .collect();
        if stranded.is_empty() {
            break;
        }
        for id in stranded {
            tree.prune(&id)?;
        }
    }
    tree.compress()?;

    let matrix = matrix.map(|m| m.retain_taxa(keep));
    Ok((matrix, tree))
}

/// Sibling path carrying a filename prefix, e.g. `data/aln.fasta` ->
/// `data/pruned-aln.fasta`.
pub fn prefixed_sibling(path: &Path, prefix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{prefix}{name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    fn leaf_names(tree: &Tree) -> BTreeSet<String> {
        named_leaves(tree).into_iter().map(|(_, n)| n).collect()
    }

    #[test]
    fn prunes_tree_to_requested_taxa() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,(C:0.1,D:0.4):0.5);").unwrap();
        let (_, pruned) = induce_matrix_and_tree(None, tree, &keep(&["A", "C", "D"])).unwrap();
        assert_eq!(leaf_names(&pruned), keep(&["A", "C", "D"]));
    }

    #[test]
    fn prunes_matrix_rows_with_tree_tips() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,(C:0.1,D:0.4):0.5);").unwrap();
        let matrix = CharacterMatrix::from_dna_sequences(
            [("A", "ACGT"), ("B", "AC-T"), ("C", "ACGA"), ("D", "TCGT")]
                .into_iter()
                .map(|(l, s)| (l.to_string(), s.as_bytes().to_vec())),
        );

        let (matrix, pruned) =
            induce_matrix_and_tree(Some(matrix), tree, &keep(&["B", "D"])).unwrap();
        let matrix = matrix.unwrap();
        assert_eq!(matrix.taxa(), &["B".to_string(), "D".to_string()]);
        assert_eq!(matrix.sequence_string(0), "AC-T");
        assert_eq!(leaf_names(&pruned), keep(&["B", "D"]));
    }

    #[test]
    fn pruning_a_whole_cherry_leaves_no_stranded_nodes() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,(C:0.1,D:0.4):0.5);").unwrap();
        let (_, pruned) = induce_matrix_and_tree(None, tree, &keep(&["A", "B"])).unwrap();
        assert_eq!(leaf_names(&pruned), keep(&["A", "B"]));
    }

    #[test]
    fn unknown_taxon_is_rejected_by_name() {
        let tree = Tree::from_newick("(A:0.1,(B:0.2,C:0.3):0.1);").unwrap();
        let err = induce_matrix_and_tree(None, tree, &keep(&["A", "X"])).unwrap_err();
        assert!(matches!(err, InduceError::UnknownTaxon(label) if label == "X"));
    }

    #[test]
    fn matrix_taxa_must_be_tree_tips() {
        let tree = Tree::from_newick("(A:0.1,(B:0.2,C:0.3):0.1);").unwrap();
        let matrix = CharacterMatrix::from_dna_sequences(
            [("A", "AC"), ("Z", "GT")]
                .into_iter()
                .map(|(l, s)| (l.to_string(), s.as_bytes().to_vec())),
        );
        assert!(matches!(
            check_matrix_covered(&matrix, &tree),
            Err(InduceError::MissingFromTree(m)) if m.contains('Z')
        ));

        let covered = CharacterMatrix::from_dna_sequences(
            [("A", "AC"), ("B", "GT")]
                .into_iter()
                .map(|(l, s)| (l.to_string(), s.as_bytes().to_vec())),
        );
        assert!(check_matrix_covered(&covered, &tree).is_ok());
    }

    #[test]
    fn prefixed_sibling_keeps_directory() {
        assert_eq!(
            prefixed_sibling(Path::new("data/aln.fasta"), "pruned-"),
            PathBuf::from("data/pruned-aln.fasta")
        );
        assert_eq!(
            prefixed_sibling(Path::new("tree.nwk"), "pruned-"),
            PathBuf::from("pruned-tree.nwk")
        );
    }
}
