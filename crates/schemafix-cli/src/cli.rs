//! CLI argument definitions using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// schemafix: map, clean and fix tabular uploads against a canonical schema
#[derive(Parser)]
#[command(name = "schemafix")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding session checkpoints and learned fixes
    #[arg(long, global = true, default_value = ".schemafix")]
    pub state_dir: PathBuf,

    /// Canonical schema file (CSV or JSON); the built-in schema when omitted
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical schema
    Schema,

    /// Print how the columns of a file would map
    Map {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Capability used for semantic matching
        #[arg(long, default_value = "none")]
        llm: LlmChoice,

        /// Model to use with the capability
        #[arg(long)]
        model: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload, map, clean and suggest fixes; checkpoints after every stage
    Run {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE", required_unless_present = "resume")]
        file: Option<PathBuf>,

        /// Continue a checkpointed session instead of uploading a file
        #[arg(long, value_name = "SESSION", conflicts_with = "file")]
        resume: Option<String>,

        /// Capability used for semantic matching and fix suggestions
        #[arg(long, default_value = "none")]
        llm: LlmChoice,

        /// Model to use with the capability
        #[arg(long)]
        model: Option<String>,
    },

    /// Assign a source column to a canonical column, or unassign it
    MapEdit {
        #[arg(value_name = "SESSION")]
        session: String,

        /// Source column header
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Canonical column; omit to unassign
        #[arg(value_name = "CANONICAL")]
        canonical: Option<String>,
    },

    /// Accept, reject or promote the suggestions for one issue signature
    Fix {
        #[arg(value_name = "SESSION")]
        session: String,

        /// Suggestion id (sug_001) or signature id prefix
        #[arg(value_name = "SIGNATURE")]
        signature: String,

        #[arg(value_name = "DECISION")]
        decision: DecisionChoice,

        /// Value to write instead of the suggested one
        #[arg(long)]
        value: Option<String>,
    },

    /// Finalize a session and write the cleaned table
    Finalize {
        #[arg(value_name = "SESSION")]
        session: String,

        /// Output path for the cleaned data
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show session progress and open suggestions
    Status {
        /// Session id; lists checkpointed sessions when omitted
        #[arg(value_name = "SESSION")]
        session: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Archive finalized sessions and delete sessions idle for too long
    Cleanup {
        /// Sessions and archives untouched for this many hours are deleted
        #[arg(long, default_value_t = 24)]
        max_age_hours: i64,
    },

    /// List learned fixes
    Learned {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Capability backing semantic matching and suggestions
#[derive(Clone, Debug, Default)]
pub enum LlmChoice {
    /// Exact and fuzzy matching, deterministic repairs only
    #[default]
    None,
    /// Ollama local models (requires Ollama running)
    Ollama,
}

impl std::str::FromStr for LlmChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(LlmChoice::None),
            "ollama" | "local" => Ok(LlmChoice::Ollama),
            _ => Err(format!("Unknown capability: {}. Use: none or ollama.", s)),
        }
    }
}

impl std::fmt::Display for LlmChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmChoice::None => write!(f, "none"),
            LlmChoice::Ollama => write!(f, "ollama"),
        }
    }
}

/// Decision on a group of suggestions
#[derive(Clone, Copy, Debug)]
pub enum DecisionChoice {
    Accept,
    Reject,
    /// Accept and remember for future uploads
    Promote,
}

impl std::str::FromStr for DecisionChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accept" | "a" => Ok(DecisionChoice::Accept),
            "reject" | "r" => Ok(DecisionChoice::Reject),
            "promote" | "p" => Ok(DecisionChoice::Promote),
            _ => Err(format!(
                "Unknown decision: {}. Use: accept, reject or promote.",
                s
            )),
        }
    }
}

impl std::fmt::Display for DecisionChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionChoice::Accept => write!(f, "accept"),
            DecisionChoice::Reject => write!(f, "reject"),
            DecisionChoice::Promote => write!(f, "promote"),
        }
    }
}
