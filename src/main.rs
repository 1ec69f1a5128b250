//! # Brain Store CLI (`brain`)
//!
//! Command-line access to the note store. The same configuration decides
//! the mode for every command, so `brain tree` lists whatever `brain serve`
//! would serve.
//!
//! ## Usage
//!
//! ```bash
//! brain --config ./config/brain.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `brain mode` | Print the selected mode (`remote` or `local`) |
//! | `brain tree [PATH]` | Print the note tree |
//! | `brain read <PATH>` | Print a note's metadata and body |
//! | `brain write <PATH>` | Write a note from a file or stdin |
//! | `brain delete <PATH>` | Delete a note |
//! | `brain serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Local notes directory
//! BRAIN_NOTES_DIR=~/notes brain tree
//!
//! # Remote repository
//! GITHUB_TOKEN=ghp_... GITHUB_OWNER=acme GITHUB_REPO=brain brain tree --json
//!
//! # Update a remote note using the revision from a prior read
//! brain read inbox/today.md --json | jq -r .revision_token
//! brain write inbox/today.md --file today.md --revision 3f2a...
//! ```

use anyhow::Context;
use brain_store::config;
use brain_store::error::StoreError;
use brain_store::models::{Document, FileNode, MetaValue};
use brain_store::server;
use brain_store::store::{select_mode, ContentStore};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Brain Store CLI: a markdown note store backed by GitHub or a local
/// directory.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Remote credentials come from `GITHUB_TOKEN`, `GITHUB_OWNER`, and
/// `GITHUB_REPO`.
#[derive(Parser)]
#[command(
    name = "brain",
    about = "Brain Store: markdown notes from a GitHub repository or a local directory",
    version,
    long_about = "Brain Store reads and writes a tree of markdown notes with YAML front-matter. \
    With GitHub credentials configured it works against one branch of a repository; otherwise \
    it works against a local notes directory."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/brain.toml`. A missing file means defaults
    /// plus environment overrides.
    #[arg(long, global = true, default_value = "./config/brain.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the selected mode.
    Mode,

    /// Print the note tree.
    ///
    /// Only markdown files and the directories above them are shown;
    /// hidden entries are skipped.
    Tree {
        /// Subtree to list, relative to the store root.
        #[arg(default_value = "")]
        path: String,

        /// Print the tree as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a note's metadata and body.
    Read {
        /// Note path, relative to the store root.
        path: String,

        /// Print the full document as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create or overwrite a note.
    ///
    /// The text is written as-is, front-matter included.
    Write {
        /// Note path, relative to the store root.
        path: String,

        /// Read the text from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Revision token from a prior read (remote mode).
        #[arg(long)]
        revision: Option<String>,
    },

    /// Delete a note.
    Delete {
        /// Note path, relative to the store root.
        path: String,

        /// Revision token from a prior read (remote mode).
        #[arg(long)]
        revision: Option<String>,
    },

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<StoreError>() {
            Some(store_err) => eprintln!("Error [{}]: {}", store_err.kind(), store_err),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` filters; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "brain_store=info,tower_http=info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Mode = cli.command {
        println!("{}", select_mode(&cfg.store));
        return Ok(());
    }

    let store = ContentStore::from_config(&cfg.store)?;

    match cli.command {
        // Handled above (before backend construction)
        Commands::Mode => {}
        Commands::Tree { path, json } => {
            let nodes = store.list_tree_at(&path).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else {
                print_tree(&nodes, 0);
            }
        }
        Commands::Read { path, json } => {
            let doc = store.read_file(&path).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                print_document(&path, &doc)?;
            }
        }
        Commands::Write {
            path,
            file,
            revision,
        } => {
            let text = read_input(file.as_ref())?;
            let result = match revision.as_deref() {
                Some(rev) => store.write_file_with_revision(&path, &text, rev).await?,
                None => store.write_file(&path, &text).await?,
            };
            let verb = if result.created { "Created" } else { "Updated" };
            println!("{} {}", verb, result.path);
            if let Some(token) = result.revision_token {
                println!("revision: {}", token);
            }
        }
        Commands::Delete { path, revision } => {
            let result = match revision.as_deref() {
                Some(rev) => store.delete_file_with_revision(&path, rev).await?,
                None => store.delete_file(&path).await?,
            };
            println!("Deleted {}", result.path);
        }
        Commands::Serve => {
            server::run_server(&cfg, store).await?;
        }
    }

    Ok(())
}

fn print_tree(nodes: &[FileNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        if node.is_dir() {
            println!("{}{}/", indent, node.name);
            print_tree(node.children(), depth + 1);
        } else {
            println!("{}{}", indent, node.name);
        }
    }
}

fn print_document(path: &str, doc: &Document) -> anyhow::Result<()> {
    println!("path: {}", path);
    println!("modified_at: {}", doc.modified_at);
    if let Some(token) = &doc.revision_token {
        println!("revision: {}", token);
    }
    for (key, value) in &doc.metadata {
        println!("{}: {}", key, display_value(value)?);
    }
    println!("---");
    print!("{}", doc.body);
    if !doc.body.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Strings print bare; everything else as compact JSON.
fn display_value(value: &MetaValue) -> anyhow::Result<String> {
    match value.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Ok(serde_json::to_string(value)?),
    }
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}
