use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use typesplit::core::{EditSet, Engine, PlannedEdit, Selector};

#[derive(Parser)]
#[command(name = "typesplit")]
#[command(about = "Move C# type declarations into files named after them")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace scanned for the symbol index
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which type to act on
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct SelectorArgs {
    /// Name of the type
    #[arg(long = "type", conflicts_with_all = ["offset", "line"])]
    pub type_name: Option<String>,

    /// Byte offset inside the type
    #[arg(long, conflicts_with = "line")]
    pub offset: Option<usize>,

    /// 1-based line inside the type
    #[arg(long, requires = "column")]
    pub line: Option<usize>,

    /// 1-based column, used with --line
    #[arg(long, requires = "line")]
    pub column: Option<usize>,
}

impl SelectorArgs {
    fn selector(&self) -> Result<Selector> {
        match (&self.type_name, self.offset, self.line, self.column) {
            (Some(name), _, _, _) => Ok(Selector::Type(name.clone())),
            (_, Some(offset), _, _) => Ok(Selector::Offset(offset)),
            (_, _, Some(line), Some(column)) => Ok(Selector::Position { line, column }),
            _ => anyhow::bail!("Select a type with --type, --offset or --line and --column"),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the active configuration to Typesplit.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing Typesplit.toml
        #[arg(long)]
        force: bool,
    },

    /// List the top-level types of a file and the action offered for each
    List {
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the edits for a selection without writing them
    Plan {
        file: PathBuf,

        #[command(flatten)]
        selector: SelectorArgs,

        /// Print the edit set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute and write the edits for a selection
    Apply {
        file: PathBuf,

        #[command(flatten)]
        selector: SelectorArgs,

        /// Dry run - show what would be written
        #[arg(long)]
        dry_run: bool,
    },

    /// Move every type out of a file, renaming it after the last one left
    SplitAll {
        file: PathBuf,

        /// Dry run - show what would be written
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => {
                let dir = path.unwrap_or_else(|| PathBuf::from("."));
                let written = engine.init(&dir, force).await?;
                println!("Wrote {}", written.display());
                Ok(())
            }
            Commands::List { file, json } => {
                let listings = engine.list(&file).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&listings)?);
                    return Ok(());
                }

                for listing in listings {
                    let action = match (&listing.action, &listing.target_file) {
                        (Some(kind), Some(target)) => format!("{} -> {}", kind.title(), target),
                        _ => "-".to_string(),
                    };
                    let namespace = if listing.namespace.is_empty() { "<global>" } else { listing.namespace.as_str() };
                    println!("{:<10} {:<30} {:<30} {}", listing.kind, listing.identifier, namespace, action);
                }
                Ok(())
            }
            Commands::Plan { file, selector, json } => {
                let plan = engine.plan(&file, &selector.selector()?).await?;
                report(plan.as_ref(), json)
            }
            Commands::Apply { file, selector, dry_run } => {
                let plan = engine.apply(&file, &selector.selector()?, dry_run).await?;
                report(plan.as_ref(), false)
            }
            Commands::SplitAll { file, dry_run } => {
                let edits = engine.split_all(&file, dry_run).await?;
                for edits in &edits {
                    print_edits(edits);
                }
                Ok(())
            }
        }
    }
}

fn report(plan: Option<&PlannedEdit>, json: bool) -> Result<()> {
    let Some(plan) = plan else {
        println!("No refactoring offered for this selection");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan.edits)?);
    } else {
        print_edits(&plan.edits);
    }
    Ok(())
}

fn print_edits(edits: &EditSet) {
    match edits {
        EditSet::Move { original_file, new_file } => {
            println!("--- {} (new)", new_file.name);
            print!("{}", new_file.text);
            println!("--- {} (updated)", original_file.name);
            print!("{}", original_file.text);
        }
        EditSet::Rename { old_name, new_name, .. } => {
            println!("rename {} -> {}", old_name, new_name);
        }
    }
}
