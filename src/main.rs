use clap::{Parser, Subcommand};
use log::info;
use phyloprep::cull::cull_invariant_columns;
use phyloprep::induce::{check_matrix_covered, induce_matrix_and_tree, prefixed_sibling};
use phyloprep::io::{read_fasta_matrix, read_newick_tree, write_fasta_matrix, write_newick_tree};
use phyloprep::synapo::find_potential_synapo_columns;
use phyloprep::tipcheck::compare_tip_labels;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Phylogenetic data preparation: cull invariant columns under the
/// paired-invariants model, prune a tree and matrix to a taxon set, scan
/// for candidate synapomorphies, and check tip-label consistency.
#[derive(Parser, Debug)]
#[command(name = "phyloprep", version, about = "Phylogenetic data preparation utilities")]
struct Cli {
    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subsample constant, gapless columns as if generated under the
    /// paired-invariants model
    Cull {
        /// Path to the aligned character data (FASTA, .gz supported)
        #[arg(short = 'i', long = "char")]
        char_mat: PathBuf,

        /// Proportion of invariant sites, strictly between 0 and 1
        #[arg(long = "p-inv")]
        p_inv: f64,

        /// Output path for the reduced matrix ("-" for stdout, ".gz" compresses)
        #[arg(short = 'o', long = "output", default_value = "-")]
        output: PathBuf,
    },

    /// Prune a tree (and optionally a matrix) down to the listed taxa,
    /// writing "pruned-" siblings of the inputs
    Induce {
        /// Path to the aligned character data (FASTA)
        #[arg(long = "char")]
        char_mat: Option<PathBuf>,

        /// Path to the newick tree
        #[arg(long = "tree")]
        tree: PathBuf,

        /// Taxon labels to keep
        #[arg(required = true)]
        taxa: Vec<String>,
    },

    /// Report columns whose ingroup and outgroup states are disjoint
    Synapo {
        /// Path to the aligned character data (FASTA)
        #[arg(long = "char")]
        char_mat: PathBuf,

        /// Taxon labels forming the ingroup
        #[arg(required = true)]
        taxa: Vec<String>,
    },

    /// Check that tip labels in a tree and a matrix agree
    Tipcheck {
        /// Path to the aligned character data (FASTA)
        #[arg(long = "char")]
        char_mat: PathBuf,

        /// Path to the newick tree
        #[arg(long = "tree")]
        tree: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.quiet { "warn" } else { "info" }),
    )
    .init();

    match cli.command {
        Command::Cull {
            char_mat,
            p_inv,
            output,
        } => run_cull(&char_mat, p_inv, &output),
        Command::Induce {
            char_mat,
            tree,
            taxa,
        } => run_induce(char_mat.as_deref(), &tree, taxa),
        Command::Synapo { char_mat, taxa } => run_synapo(&char_mat, taxa),
        Command::Tipcheck { char_mat, tree } => run_tipcheck(&char_mat, &tree),
    }
}

fn read_matrix_or_exit(path: &Path) -> phyloprep::CharacterMatrix {
    match read_fasta_matrix(path) {
        Ok(matrix) => matrix,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}

fn run_cull(char_mat: &Path, p_inv: f64, output: &Path) {
    let t0 = Instant::now();
    let matrix = read_matrix_or_exit(char_mat);
    info!(
        "Read {} taxa from {:?} in {:.3}s",
        matrix.n_taxa(),
        char_mat,
        t0.elapsed().as_secs_f64()
    );

    let t1 = Instant::now();
    let (reduced, diagnostics) = match cull_invariant_columns(&matrix, p_inv) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(3);
        }
    };
    info!(
        "Estimated equilibrium length {:.4}, estimated invariant columns {:.4}",
        diagnostics.estimated_equilibrium_length, diagnostics.estimated_invariant_columns
    );
    for (symbol, count) in &diagnostics.plan {
        info!(
            "State {}: culling {} of {} constant gapless columns",
            *symbol as char, count.cull, count.available
        );
    }
    info!(
        "Culled {} columns in {:.3}s",
        diagnostics.culled.len(),
        t1.elapsed().as_secs_f64()
    );

    if let Err(e) = write_fasta_matrix(output, &reduced) {
        eprintln!("Failed to write output {output:?}: {e}");
        std::process::exit(4);
    }
}

fn run_induce(char_mat: Option<&Path>, tree_path: &Path, taxa: Vec<String>) {
    let keep: BTreeSet<String> = taxa.into_iter().collect();

    // refuse to clobber earlier runs before doing any work
    let out_tree = prefixed_sibling(tree_path, "pruned-");
    let mut out_paths = vec![out_tree.clone()];
    let out_char = char_mat.map(|p| prefixed_sibling(p, "pruned-"));
    if let Some(p) = &out_char {
        out_paths.push(p.clone());
    }
    for path in &out_paths {
        if path.exists() {
            eprintln!("{path:?} already exists! Move it before running this command.");
            std::process::exit(2);
        }
    }

    let matrix = char_mat.map(read_matrix_or_exit);
    let tree = match read_newick_tree(tree_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    if let Some(m) = &matrix {
        if let Err(e) = check_matrix_covered(m, &tree) {
            eprintln!("{e}");
            std::process::exit(3);
        }
    }

    let t0 = Instant::now();
    let (pruned_matrix, pruned_tree) = match induce_matrix_and_tree(matrix, tree, &keep) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(3);
        }
    };
    info!(
        "Pruned down to {} taxa in {:.3}s",
        keep.len(),
        t0.elapsed().as_secs_f64()
    );

    if let Err(e) = write_newick_tree(&out_tree, &pruned_tree) {
        eprintln!("Failed to write output {out_tree:?}: {e}");
        std::process::exit(4);
    }
    info!("Wrote {out_tree:?}");
    if let (Some(matrix), Some(out_char)) = (pruned_matrix, out_char) {
        if let Err(e) = write_fasta_matrix(&out_char, &matrix) {
            eprintln!("Failed to write output {out_char:?}: {e}");
            std::process::exit(4);
        }
        info!("Wrote {out_char:?}");
    }
}

fn run_synapo(char_mat: &Path, taxa: Vec<String>) {
    let matrix = read_matrix_or_exit(char_mat);
    let columns = match find_potential_synapo_columns(&matrix, &taxa) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(3);
        }
    };
    info!("{} candidate columns", columns.len());
    for candidate in columns {
        let render = |states: &BTreeSet<u8>| {
            states
                .iter()
                .map(|&s| (s as char).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "Column {}: in states = {{{}}}. out states = {{{}}}.",
            candidate.column,
            render(&candidate.ingroup_states),
            render(&candidate.outgroup_states)
        );
    }
}

fn run_tipcheck(char_mat: &Path, tree_path: &Path) {
    let matrix = read_matrix_or_exit(char_mat);
    let tree = match read_newick_tree(tree_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    let report = compare_tip_labels(&matrix, &tree);
    if report.is_match() {
        println!("Tips match");
        return;
    }
    if !report.missing_from_tree.is_empty() {
        eprintln!(
            "Some of the taxa in the matrix are not in the tree. Tree is missing \"{}\"",
            report.missing_from_tree.join("\", \"")
        );
    }
    if !report.missing_from_matrix.is_empty() {
        eprintln!(
            "Some of the taxa in the tree are not in the data matrix. Matrix is missing \"{}\"",
            report.missing_from_matrix.join("\", \"")
        );
    }
    std::process::exit(1);
}
