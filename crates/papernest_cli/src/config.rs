//! Command-line surface and runtime configuration.
//!
//! Every global option has an environment fallback so scripted runs can pin
//! the store and log locations once.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

const DEFAULT_DB_FILE_NAME: &str = "papernest.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "papernest", version, about = "Research reading-list projects")]
pub struct Cli {
    /// Project store location
    #[arg(long = "db", env = "PAPERNEST_DB_PATH", global = true)]
    pub db: Option<PathBuf>,

    /// Directory for rolling log files; logging stays off when unset
    #[arg(long = "log-dir", env = "PAPERNEST_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long = "log-level", env = "PAPERNEST_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discard the current project and start an empty one
    New {
        /// Project title
        #[arg(default_value = "")]
        title: String,
    },
    /// Write the project to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Replace the project with the content of a JSON file
    Import {
        /// Source file
        path: PathBuf,
    },
    /// Print groups and papers in display order
    Tree,
    /// Manage paper groups
    #[command(subcommand)]
    Group(GroupCommand),
    /// Manage papers
    #[command(subcommand)]
    Paper(PaperCommand),
}

#[derive(Debug, Subcommand)]
pub enum GroupCommand {
    /// Append a group at the end of its scope
    Create {
        name: String,
        /// Root group to nest under
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Delete a group, keeping its papers and subgroups
    Delete { id: Uuid },
    /// Rename a group
    Rename { id: Uuid, name: String },
    /// Reorder a group among its siblings
    Move(MoveGroupArgs),
    /// Flip the collapsed flag
    Toggle { id: Uuid },
}

#[derive(Debug, Args)]
pub struct MoveGroupArgs {
    pub id: Uuid,
    /// Sibling to insert before; appends when omitted
    #[arg(long)]
    pub before: Option<Uuid>,
}

#[derive(Debug, Subcommand)]
pub enum PaperCommand {
    /// Append a paper at the end of a group (or the ungrouped list)
    Add {
        title: String,
        #[arg(long)]
        group: Option<Uuid>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Move a paper into a group, before another paper or at the end
    Move(MovePaperArgs),
    /// Delete a paper
    Delete { id: Uuid },
}

#[derive(Debug, Args)]
pub struct MovePaperArgs {
    pub id: Uuid,
    /// Target group; the ungrouped list when omitted
    #[arg(long)]
    pub group: Option<Uuid>,
    /// Paper in the target scope to insert before
    #[arg(long)]
    pub before: Option<Uuid>,
}

impl Cli {
    /// Store path from `--db`, `PAPERNEST_DB_PATH` or the temp directory.
    pub fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
    }

    /// Log directory with a relative `--log-dir` resolved against the working directory.
    pub fn log_dir(&self) -> std::io::Result<Option<PathBuf>> {
        match self.log_dir.as_deref() {
            Some(dir) if dir.is_relative() => Ok(Some(std::env::current_dir()?.join(dir))),
            Some(dir) => Ok(Some(dir.to_path_buf())),
            None => Ok(None),
        }
    }

    /// Level to hand to the logger.
    pub fn log_level(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| papernest_core::default_log_level().to_string())
    }
}
