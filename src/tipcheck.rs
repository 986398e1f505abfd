//! Tip-label consistency between a tree and a character matrix.

use std::collections::BTreeSet;

use phylotree::tree::Tree;

use crate::matrix::CharacterMatrix;

/// Labels found on only one side of a tree/matrix pair, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipLabelReport {
    /// Matrix taxa with no matching tree tip.
    pub missing_from_tree: Vec<String>,
    /// Tree tips with no matching matrix row.
    pub missing_from_matrix: Vec<String>,
}

impl TipLabelReport {
    pub fn is_match(&self) -> bool {
        self.missing_from_tree.is_empty() && self.missing_from_matrix.is_empty()
    }
}

/// Compare the tip labels of `tree` with the taxa of `matrix`.
pub fn compare_tip_labels(matrix: &CharacterMatrix, tree: &Tree) -> TipLabelReport {
    let tip_names: BTreeSet<String> = tree
        .get_leaf_names()
        .into_iter()
        .flatten()
        .collect();
    let matrix_names: BTreeSet<String> = matrix.taxa().iter().cloned().collect();

    TipLabelReport {
        missing_from_tree: matrix_names.difference(&tip_names).cloned().collect(),
        missing_from_matrix: tip_names.difference(&matrix_names).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(labels: &[&str]) -> CharacterMatrix {
        CharacterMatrix::from_dna_sequences(
            labels
                .iter()
                .map(|l| (l.to_string(), b"ACGT".to_vec())),
        )
    }

    #[test]
    fn matching_labels_produce_an_empty_report() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,C:0.5);").unwrap();
        let report = compare_tip_labels(&matrix(&["C", "A", "B"]), &tree);
        assert!(report.is_match());
        assert_eq!(report, TipLabelReport::default());
    }

    #[test]
    fn differences_are_reported_on_both_sides() {
        let tree = Tree::from_newick("((A:0.1,B:0.2):0.3,D:0.5);").unwrap();
        let report = compare_tip_labels(&matrix(&["A", "B", "C"]), &tree);
        assert!(!report.is_match());
        assert_eq!(report.missing_from_tree, vec!["C".to_string()]);
        assert_eq!(report.missing_from_matrix, vec!["D".to_string()]);
    }
}
