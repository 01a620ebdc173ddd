//! CLI command definitions (§6 External Interfaces).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Offline research-paper knowledge pipeline.
#[derive(Parser, Debug)]
#[command(name = "paperloom")]
#[command(version)]
#[command(about = "Topic taxonomy, section summarization, and retrieval-and-composition paper drafting")]
pub struct Cli {
    /// Path to a JSON/YAML/TOML config file. Falls back to built-in defaults
    /// (overridable by `PAPERLOOM_*` environment variables) if omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Topic taxonomy engine: proposal and three-round merge stabilization.
    GenTopics {
        #[command(subcommand)]
        action: GenTopicsAction,
    },

    /// Label every discovered paper with stable topic ids.
    LabelPapersWithStableTopics,

    /// Section matching and/or per-aspect summarization.
    ConcludePapers {
        /// Run only section matching, skipping summarization entirely.
        #[arg(long, default_value_t = false)]
        only_section_match: bool,

        /// Assume section matching is already done; go straight to summarization.
        #[arg(long, default_value_t = false)]
        skip_section_match: bool,

        /// Regenerate even if a persisted mapping/summary already exists.
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Ingest chunked source text into the five `paper_*` collections.
    LoadPapers {
        #[arg(long)]
        component_dir: Option<PathBuf>,
        #[arg(long)]
        label_dir: Option<PathBuf>,
    },

    /// Ingest aspect summaries into the ten `summary_*` collections.
    LoadConclusion {
        #[arg(long)]
        conclude_dir: Option<PathBuf>,
    },

    /// Draft a five-section paper from a natural-language brief.
    GenPaper {
        /// The user's research brief.
        requirement: String,

        /// Resume from this step (1-indexed), reusing prior steps' artifacts.
        #[arg(long)]
        step: Option<usize>,

        /// Output markdown path; defaults to `{paper_gen_dir}/generated_paper_{timestamp}.md`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GenTopicsAction {
    /// Reset (unless `--no-reset`), extract, and run all three merge rounds.
    Full {
        #[arg(long, default_value_t = false)]
        no_reset: bool,
    },
    /// Propose topics for every paper abstract into `gen_topic`.
    Extract,
    /// Run one merge round: generate suggestions, apply, renumber into `middle_topic`.
    GenerateMerge,
    /// Run the remaining two merge rounds, promoting `middle_topic` into the stable `topic` store.
    UpdateTopics,
    /// Print the current stable topic list.
    List,
}
